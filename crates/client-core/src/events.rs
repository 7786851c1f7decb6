//! Event delivery for client-core operations
//!
//! Every completed operation, and every notification ingested from the engine, is
//! reported as exactly one [`SessionEvent`] to the sink registered at
//! [`Session::initialize`](crate::Session::initialize). Payloads are plain integers and
//! strings so an event can cross a thread, process or language boundary unchanged.
//!
//! # Event Types
//!
//! - **Engine events** - initialization result, teardown
//! - **Channel events** - join/leave results, remote users joining and leaving
//! - **Media events** - local publish results, remote subscription results
//! - **Permission events** - camera/microphone authorization results
//! - **Error events** - validation failures that never reached the engine
//!
//! # Usage Examples
//!
//! ## Closure Sink
//!
//! Any `Fn(SessionEvent) + Send + Sync` is a sink:
//!
//! ```rust
//! use std::sync::Arc;
//! use rtcall_client_core::events::{SessionEvent, SessionEventSink};
//!
//! let sink: Arc<dyn SessionEventSink> = Arc::new(|event: SessionEvent| {
//!     println!("session event: {:?}", event);
//! });
//! sink.on_event(SessionEvent::EngineDestroyed);
//! ```
//!
//! ## Broadcast Sink
//!
//! Sinks run inside the session's critical section and must not call back into the
//! session. [`BroadcastEventSink`] decouples delivery so consumers can react freely:
//!
//! ```rust
//! use rtcall_client_core::events::{BroadcastEventSink, SessionEvent, SessionEventSink};
//!
//! let sink = BroadcastEventSink::new(16);
//! let mut events = sink.subscribe();
//! sink.on_event(SessionEvent::RemoteUserJoined { user_id: "7".to_string() });
//! assert_eq!(
//!     events.try_recv().unwrap(),
//!     SessionEvent::RemoteUserJoined { user_id: "7".to_string() }
//! );
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{SessionError, codes};
use crate::permission::PermissionKind;

/// One outcome reported to the registered sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Result of engine bring-up
    EngineInitResult {
        /// `0` on success, otherwise the error or engine code
        code: i32,
        /// Human-readable outcome
        message: String,
    },
    /// Engine torn down; no further events follow until the next initialize
    EngineDestroyed,
    /// Result of a join or reconnect
    JoinChannelResult {
        code: i32,
        channel: String,
        user_id: String,
    },
    /// Result of a leave
    LeaveChannelResult { code: i32 },
    /// A remote user entered the channel
    RemoteUserJoined { user_id: String },
    /// A remote user left the channel
    RemoteUserLeft {
        user_id: String,
        /// Engine-specific reason, passed through verbatim
        reason: i32,
    },
    /// Local camera publish toggled
    LocalVideoPublished { code: i32 },
    /// Local microphone publish toggled
    LocalAudioPublished { code: i32 },
    /// Remote video subscription toggled
    RemoteVideoSubscribed { code: i32, user_id: String },
    /// Remote audio subscription toggled
    RemoteAudioSubscribed { code: i32, user_id: String },
    /// Camera or microphone authorization settled
    PermissionResult {
        kind: PermissionKind,
        /// `0` granted, `1` denied
        code: i32,
    },
    /// An operation failed before reaching the engine
    Error { code: i32, message: String },
}

impl SessionEvent {
    /// Build an `Error` event from a session error
    pub fn error(error: &SessionError) -> Self {
        SessionEvent::Error {
            code: error.code(),
            message: error.to_string(),
        }
    }

    /// Result code carried by the event, if any
    pub fn code(&self) -> Option<i32> {
        match self {
            SessionEvent::EngineInitResult { code, .. }
            | SessionEvent::JoinChannelResult { code, .. }
            | SessionEvent::LeaveChannelResult { code }
            | SessionEvent::LocalVideoPublished { code }
            | SessionEvent::LocalAudioPublished { code }
            | SessionEvent::RemoteVideoSubscribed { code, .. }
            | SessionEvent::RemoteAudioSubscribed { code, .. }
            | SessionEvent::PermissionResult { code, .. }
            | SessionEvent::Error { code, .. } => Some(*code),
            SessionEvent::EngineDestroyed
            | SessionEvent::RemoteUserJoined { .. }
            | SessionEvent::RemoteUserLeft { .. } => None,
        }
    }

    /// Check if the event reports a failure
    pub fn is_error(&self) -> bool {
        self.code().is_some_and(|code| code != codes::OK)
    }

    /// User the event relates to (if any)
    pub fn user_id(&self) -> Option<&str> {
        match self {
            SessionEvent::JoinChannelResult { user_id, .. }
            | SessionEvent::RemoteUserJoined { user_id }
            | SessionEvent::RemoteUserLeft { user_id, .. }
            | SessionEvent::RemoteVideoSubscribed { user_id, .. }
            | SessionEvent::RemoteAudioSubscribed { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    /// Stable short name, used as a logging field
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::EngineInitResult { .. } => "engine_init_result",
            SessionEvent::EngineDestroyed => "engine_destroyed",
            SessionEvent::JoinChannelResult { .. } => "join_channel_result",
            SessionEvent::LeaveChannelResult { .. } => "leave_channel_result",
            SessionEvent::RemoteUserJoined { .. } => "remote_user_joined",
            SessionEvent::RemoteUserLeft { .. } => "remote_user_left",
            SessionEvent::LocalVideoPublished { .. } => "local_video_published",
            SessionEvent::LocalAudioPublished { .. } => "local_audio_published",
            SessionEvent::RemoteVideoSubscribed { .. } => "remote_video_subscribed",
            SessionEvent::RemoteAudioSubscribed { .. } => "remote_audio_subscribed",
            SessionEvent::PermissionResult { .. } => "permission_result",
            SessionEvent::Error { .. } => "error",
        }
    }
}

/// Receiver of session events
///
/// Called from whichever thread completed the operation (application thread or an
/// engine callback thread) while the session holds its lock. Implementations must
/// return quickly and must not call back into the session.
pub trait SessionEventSink: Send + Sync {
    fn on_event(&self, event: SessionEvent);
}

impl<F> SessionEventSink for F
where
    F: Fn(SessionEvent) + Send + Sync,
{
    fn on_event(&self, event: SessionEvent) {
        self(event)
    }
}

/// Sink that fans events out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<SessionEvent>,
}

impl BroadcastEventSink {
    /// Create a sink buffering up to `capacity` events per lagging subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl SessionEventSink for BroadcastEventSink {
    fn on_event(&self, event: SessionEvent) {
        // No subscribers is not an error; the event is simply not observed.
        let _ = self.tx.send(event);
    }
}

/// Deliver one event to an optional sink
pub(crate) fn emit(sink: Option<&dyn SessionEventSink>, event: SessionEvent) {
    match sink {
        Some(sink) => {
            tracing::debug!(event = event.name(), code = ?event.code(), "Emitting session event");
            sink.on_event(event);
        }
        None => {
            tracing::trace!(event = event.name(), "No event sink registered, event dropped");
        }
    }
}
