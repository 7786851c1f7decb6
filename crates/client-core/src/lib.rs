//! Client-core: session orchestration over an abstract RTC engine
//!
//! This crate gives an application one object, [`Session`], through which it drives a
//! real-time audio/video engine: bring the engine up, join and leave channels, publish
//! and subscribe media, bind render surfaces for remote video, and track camera and
//! microphone authorization.
//!
//! ## Layering
//! ```text
//! application -> Session -> {ChannelLedger, AvController, RenderRegistry, PermissionLedger}
//!                   |                 |               |
//!                   +---- RtcEngine <-+---------------+
//! engine threads -> EngineNotifier -> Session
//! ```
//!
//! Client-core focuses on:
//! - A synchronous, lock-protected control surface with integer result codes
//! - Exactly one [`SessionEvent`] per completed operation
//! - Frame delivery to caller-owned surfaces without touching the session lock
//!
//! The engine itself is behind the [`RtcEngine`] trait; [`LoopbackEngine`] is an
//! in-process implementation for tests and local runs.

pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod media;
pub mod permission;
pub mod render;
pub mod session;

// Public API exports
pub use channel::{ChannelLedger, Membership};
pub use config::SessionConfig;
pub use engine::{EngineCall, EngineCode, EngineHandle, EngineOp, LoopbackEngine, RtcEngine};
pub use error::{ResultCodeExt, SessionError, SessionResult, codes};
pub use events::{BroadcastEventSink, SessionEvent, SessionEventSink};
pub use media::{AvController, MAX_LOCAL_VOLUME, MIN_LOCAL_VOLUME, clamp_volume};
pub use permission::{
    AutoGrant, PermissionKind, PermissionLedger, PermissionPrompt, PermissionState, PromptOutcome,
};
pub use render::{
    FrameBuffer, PixelFormat, RenderPlacement, RenderRegistry, RenderSurface, RenderTargetInfo,
    VideoFrame,
};
pub use session::{EngineNotifier, Session, SessionBuilder, SessionState};

/// Client-core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_is_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
        assert_send_sync::<EngineNotifier>();
        assert!(!VERSION.is_empty());
    }
}
