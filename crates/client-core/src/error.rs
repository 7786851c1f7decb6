//! Error types and result codes for the client-core library
//!
//! Every operation on [`Session`](crate::Session) returns a [`SessionResult`]. The
//! application-facing surface of the plugin speaks integer result codes, so each
//! [`SessionError`] maps onto one stable code (see [`codes`]) and
//! [`ResultCodeExt::result_code`] projects any result into that integer.
//!
//! # Error Categories
//!
//! - **Validation errors** - detected locally before any engine round-trip
//!   (`ChannelNameEmpty`, `RenderNodeNull`, `InvalidConfig`, `EngineNotInitialized`)
//! - **Engine errors** - the engine rejected a request (`JoinChannelFailed`,
//!   `UnderlyingEngineError`)
//! - **Platform errors** - capability or permission missing on this target
//!   (`UnsupportedPlatform`, `PermissionDenied`)
//!
//! # Basic Pattern
//!
//! ```rust
//! use rtcall_client_core::{ResultCodeExt, SessionError, SessionResult, codes};
//!
//! let result: SessionResult<()> = Err(SessionError::ChannelNameEmpty);
//! assert_eq!(result.result_code(), codes::CHANNEL_NAME_EMPTY);
//!
//! let ok: SessionResult<()> = Ok(());
//! assert_eq!(ok.result_code(), codes::OK);
//! ```

use thiserror::Error;

use crate::engine::EngineCode;
use crate::permission::PermissionKind;

/// Integer result codes shared with the event payloads and the host application.
pub mod codes {
    pub const OK: i32 = 0;
    pub const ENGINE_NOT_INITIALIZED: i32 = 1001;
    pub const INVALID_CONFIG: i32 = 1002;
    pub const CHANNEL_NAME_EMPTY: i32 = 2001;
    pub const JOIN_CHANNEL_FAILED: i32 = 2002;
    pub const CAMERA_PERMISSION_DENIED: i32 = 3001;
    pub const MICROPHONE_PERMISSION_DENIED: i32 = 3002;
    pub const RENDER_NODE_NULL: i32 = 4001;
    pub const UNSUPPORTED_PLATFORM: i32 = 5001;
}

/// Result type alias for client-core operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Error kinds reported by the session facade
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The operation needs a live engine handle and there is none
    #[error("Engine not initialized")]
    EngineNotInitialized,

    /// Configuration rejected before reaching the engine
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Channel name is empty")]
    ChannelNameEmpty,

    /// The engine rejected a join, leave or reconnect
    #[error("Channel operation failed for '{channel}': engine code {engine_code}")]
    JoinChannelFailed { channel: String, engine_code: EngineCode },

    #[error("No previous channel to reconnect")]
    NoPreviousChannel,

    #[error("Permission denied: {kind}")]
    PermissionDenied { kind: PermissionKind },

    /// Render operation on a missing or unbound target
    #[error("Render node is null for user '{user_id}'")]
    RenderNodeNull { user_id: String },

    #[error("Not supported on this platform: {capability}")]
    UnsupportedPlatform { capability: String },

    /// Engine failure passed through verbatim
    #[error("Engine error code {code}")]
    UnderlyingEngineError { code: EngineCode },
}

impl SessionError {
    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a render node error for a user
    pub fn render_node_null(user_id: impl Into<String>) -> Self {
        Self::RenderNodeNull {
            user_id: user_id.into(),
        }
    }

    /// Create an unsupported platform error
    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            capability: capability.into(),
        }
    }

    /// Integer code reported to the host application and in `Error` events.
    ///
    /// Engine errors keep the engine's own code.
    pub fn code(&self) -> i32 {
        match self {
            SessionError::EngineNotInitialized => codes::ENGINE_NOT_INITIALIZED,
            SessionError::InvalidConfig { .. } => codes::INVALID_CONFIG,
            SessionError::ChannelNameEmpty => codes::CHANNEL_NAME_EMPTY,
            SessionError::JoinChannelFailed { .. } | SessionError::NoPreviousChannel => {
                codes::JOIN_CHANNEL_FAILED
            }
            SessionError::PermissionDenied { kind } => match kind {
                PermissionKind::Camera => codes::CAMERA_PERMISSION_DENIED,
                PermissionKind::Microphone => codes::MICROPHONE_PERMISSION_DENIED,
            },
            SessionError::RenderNodeNull { .. } => codes::RENDER_NODE_NULL,
            SessionError::UnsupportedPlatform { .. } => codes::UNSUPPORTED_PLATFORM,
            SessionError::UnderlyingEngineError { code } => *code,
        }
    }

    /// Check if the error was raised locally, before any engine call
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            SessionError::EngineNotInitialized
                | SessionError::InvalidConfig { .. }
                | SessionError::ChannelNameEmpty
                | SessionError::NoPreviousChannel
                | SessionError::RenderNodeNull { .. }
        )
    }

    /// Check if the engine itself reported the failure
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            SessionError::JoinChannelFailed { .. } | SessionError::UnderlyingEngineError { .. }
        )
    }

    /// Get error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            SessionError::EngineNotInitialized | SessionError::InvalidConfig { .. } => "engine",

            SessionError::ChannelNameEmpty
            | SessionError::JoinChannelFailed { .. }
            | SessionError::NoPreviousChannel => "channel",

            SessionError::PermissionDenied { .. } => "permission",

            SessionError::RenderNodeNull { .. } => "render",

            SessionError::UnsupportedPlatform { .. } => "platform",

            SessionError::UnderlyingEngineError { .. } => "media",
        }
    }
}

/// Projection of a [`SessionResult`] into the integer result code of the host API
pub trait ResultCodeExt {
    /// `0` on success, [`SessionError::code`] otherwise
    fn result_code(&self) -> i32;
}

impl<T> ResultCodeExt for SessionResult<T> {
    fn result_code(&self) -> i32 {
        match self {
            Ok(_) => codes::OK,
            Err(e) => e.code(),
        }
    }
}

/// Map a raw engine code into a result, passing non-zero codes through unchanged
pub(crate) fn engine_result(code: EngineCode) -> SessionResult<()> {
    if code == codes::OK {
        Ok(())
    } else {
        Err(SessionError::UnderlyingEngineError { code })
    }
}
