//! Session orchestration
//!
//! [`Session`] is the single entry point for the application. It owns the engine
//! handle, routes each request to the channel ledger, AV controller, render registry or
//! permission ledger, and delivers every outcome to the sink registered at
//! [`Session::initialize`].
//!
//! # State Machine
//!
//! ```text
//! Uninitialized --initialize--> Initialized --join--> Connecting --ok--> Connected
//!       ^                            ^                     |                 |
//!       |                            +------- failure -----+                 |
//!       +---------- destroy          +------------------ leave --------------+
//! ```
//!
//! # Locking
//!
//! One mutex guards the state, the engine handle and the sink, and is held for the full
//! duration of every mutating call including the engine round-trip. Remote user
//! notifications take the same lock. Frames bypass it and go straight to the render
//! registry, which locks per user.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rtcall_client_core::{LoopbackEngine, Session, SessionEvent, SessionEventSink, SessionState};
//!
//! let session = Session::new(Box::new(LoopbackEngine::new()));
//! let sink: Arc<dyn SessionEventSink> = Arc::new(|event: SessionEvent| {
//!     println!("{:?}", event);
//! });
//!
//! session.initialize("app1", false, Some(sink)).unwrap();
//! session.join_channel("room1", "42", "").unwrap();
//! assert_eq!(session.state(), SessionState::Connected);
//!
//! session.leave_channel().unwrap();
//! session.destroy().unwrap();
//! assert_eq!(session.state(), SessionState::Uninitialized);
//! ```

mod builder;

pub use builder::SessionBuilder;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelLedger, Membership};
use crate::config::SessionConfig;
use crate::engine::{ENGINE_OK, EngineHandle, RtcEngine};
use crate::error::{SessionError, SessionResult, codes};
use crate::events::{SessionEvent, SessionEventSink, emit};
use crate::media::AvController;
use crate::permission::{PermissionKind, PermissionLedger, PermissionPrompt, PermissionState};
use crate::render::{RenderPlacement, RenderRegistry, RenderSurface, RenderTargetInfo, VideoFrame};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized = 0,
    Initialized = 1,
    Connecting = 2,
    Connected = 3,
}

impl SessionState {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Whether the engine is up
    pub fn is_initialized(&self) -> bool {
        !matches!(self, SessionState::Uninitialized)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initialized => "initialized",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

struct SessionCore {
    state: SessionState,
    engine: EngineHandle,
    sink: Option<Arc<dyn SessionEventSink>>,
}

impl SessionCore {
    fn sink(&self) -> Option<&dyn SessionEventSink> {
        self.sink.as_deref()
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "Session state transition");
            self.state = next;
        }
    }
}

struct SessionInner {
    core: Mutex<SessionCore>,
    channel: ChannelLedger,
    av: AvController,
    renderers: RenderRegistry,
    permissions: PermissionLedger,
}

/// Facade over one RTC engine
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a session over `engine` with the default permission prompt
    pub fn new(engine: Box<dyn RtcEngine>) -> Self {
        Self::with_parts(engine, PermissionLedger::default())
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub(crate) fn with_prompt(engine: Box<dyn RtcEngine>, prompt: Box<dyn PermissionPrompt>) -> Self {
        Self::with_parts(engine, PermissionLedger::new(prompt))
    }

    fn with_parts(engine: Box<dyn RtcEngine>, permissions: PermissionLedger) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                core: Mutex::new(SessionCore {
                    state: SessionState::Uninitialized,
                    engine: EngineHandle::new(engine),
                    sink: None,
                }),
                channel: ChannelLedger::new(),
                av: AvController::new(),
                renderers: RenderRegistry::new(),
                permissions,
            }),
        }
    }

    /// Handle for engine callback threads to feed notifications into this session
    pub fn notifier(&self) -> EngineNotifier {
        EngineNotifier {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ===== LIFECYCLE =====

    /// Bring the engine up and register the event sink
    ///
    /// Calling this again while initialized succeeds without touching the engine. The
    /// sink is retained only when initialization succeeds.
    pub fn initialize(
        &self,
        app_id: &str,
        debug_mode: bool,
        sink: Option<Arc<dyn SessionEventSink>>,
    ) -> SessionResult<()> {
        let mut core = self.inner.core.lock();
        if core.state.is_initialized() {
            tracing::debug!(state = %core.state, "Engine already initialized");
            emit(
                core.sink(),
                SessionEvent::EngineInitResult {
                    code: codes::OK,
                    message: "already initialized".to_string(),
                },
            );
            return Ok(());
        }

        let Some(sink) = sink else {
            tracing::warn!("Initialize called without an event sink");
            return Err(SessionError::invalid_config("sink", "no event sink registered"));
        };
        if app_id.is_empty() {
            let err = SessionError::invalid_config("app_id", "app id is empty");
            tracing::warn!(error = %err, "Rejecting engine initialization");
            emit(
                Some(sink.as_ref()),
                SessionEvent::EngineInitResult {
                    code: err.code(),
                    message: err.to_string(),
                },
            );
            return Err(err);
        }

        match core.engine.acquire(app_id, debug_mode) {
            Ok(()) => {
                core.transition(SessionState::Initialized);
                tracing::info!(debug_mode, "Engine initialized");
                emit(
                    Some(sink.as_ref()),
                    SessionEvent::EngineInitResult {
                        code: codes::OK,
                        message: "success".to_string(),
                    },
                );
                core.sink = Some(sink);
                Ok(())
            }
            Err(code) => {
                tracing::warn!(engine_code = code, "Engine initialization failed");
                emit(
                    Some(sink.as_ref()),
                    SessionEvent::EngineInitResult {
                        code,
                        message: "engine initialization failed".to_string(),
                    },
                );
                Err(SessionError::UnderlyingEngineError { code })
            }
        }
    }

    /// Validate `config`, then [`initialize`](Self::initialize) from it
    ///
    /// A rejected config is reported to `sink` and leaves the engine untouched.
    pub fn initialize_with_config(
        &self,
        config: &SessionConfig,
        sink: Option<Arc<dyn SessionEventSink>>,
    ) -> SessionResult<()> {
        if let Err(err) = config.validate() {
            tracing::warn!(error = %err, "Rejecting session config");
            emit(
                sink.as_deref(),
                SessionEvent::EngineInitResult {
                    code: err.code(),
                    message: err.to_string(),
                },
            );
            return Err(err);
        }
        self.initialize(&config.app_id, config.debug_mode, sink)
    }

    /// Tear the engine down and forget the sink. No-op when uninitialized.
    pub fn destroy(&self) -> SessionResult<()> {
        let mut core = self.inner.core.lock();
        if !core.state.is_initialized() {
            return Ok(());
        }

        let code = core.engine.release();
        if code != ENGINE_OK {
            tracing::warn!(engine_code = code, "Engine reported an error on destroy");
        }
        self.inner.channel.reset();
        core.transition(SessionState::Uninitialized);
        tracing::info!("Engine destroyed");
        emit(core.sink(), SessionEvent::EngineDestroyed);
        core.sink = None;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.inner.core.lock().state
    }

    // ===== CHANNEL =====

    /// Join `channel` as `user_id`. An empty `token` means none.
    pub fn join_channel(&self, channel: &str, user_id: &str, token: &str) -> SessionResult<()> {
        let mut core = self.inner.core.lock();
        if !core.state.is_initialized() {
            return Err(SessionError::EngineNotInitialized);
        }
        if channel.is_empty() {
            let err = SessionError::ChannelNameEmpty;
            emit(core.sink(), SessionEvent::error(&err));
            return Err(err);
        }

        core.transition(SessionState::Connecting);
        let result = self
            .inner
            .channel
            .join(core.engine.live(), core.sink(), channel, user_id, token);
        self.settle_connection(&mut core, &result);
        result
    }

    /// Leave the current channel. The session returns to `Initialized` either way.
    pub fn leave_channel(&self) -> SessionResult<()> {
        let mut core = self.inner.core.lock();
        if !core.state.is_initialized() {
            return Err(SessionError::EngineNotInitialized);
        }
        let result = self.inner.channel.leave(core.engine.live(), core.sink());
        core.transition(SessionState::Initialized);
        result
    }

    /// Re-join the last channel as the last local user, without a token
    pub fn reconnect(&self) -> SessionResult<()> {
        let mut core = self.inner.core.lock();
        if !core.state.is_initialized() {
            return Err(SessionError::EngineNotInitialized);
        }
        core.transition(SessionState::Connecting);
        let result = self.inner.channel.reconnect(core.engine.live(), core.sink());
        self.settle_connection(&mut core, &result);
        result
    }

    fn settle_connection(&self, core: &mut SessionCore, result: &SessionResult<()>) {
        match result {
            Ok(()) => core.transition(SessionState::Connected),
            Err(_) => {
                self.inner.channel.mark_disconnected();
                core.transition(SessionState::Initialized);
            }
        }
    }

    /// Users currently in the channel, local user included while connected
    pub fn online_users(&self) -> BTreeSet<String> {
        self.inner.channel.online_users()
    }

    pub fn membership(&self) -> Membership {
        self.inner.channel.snapshot()
    }

    /// Local user id, empty when no channel is recorded
    pub fn local_user_id(&self) -> String {
        self.inner.channel.snapshot().local_user_id
    }

    // ===== AUDIO / VIDEO =====

    pub fn enable_local_camera(&self, enable: bool) -> SessionResult<()> {
        let core = self.inner.core.lock();
        self.inner
            .av
            .enable_local_camera(core.engine.live(), core.sink(), enable)
    }

    pub fn enable_local_microphone(&self, enable: bool) -> SessionResult<()> {
        let core = self.inner.core.lock();
        self.inner
            .av
            .enable_local_microphone(core.engine.live(), core.sink(), enable)
    }

    pub fn switch_camera(&self) -> SessionResult<()> {
        let core = self.inner.core.lock();
        self.inner.av.switch_camera(core.engine.live())
    }

    /// Recording volume, clamped into `[0, 400]`
    pub fn set_local_volume(&self, volume: i32) -> SessionResult<()> {
        let core = self.inner.core.lock();
        self.inner.av.set_local_volume(core.engine.live(), volume)
    }

    pub fn subscribe_remote_video(&self, user_id: &str, subscribe: bool) -> SessionResult<()> {
        let core = self.inner.core.lock();
        self.inner
            .av
            .subscribe_remote_video(core.engine.live(), core.sink(), user_id, subscribe)
    }

    pub fn subscribe_remote_audio(&self, user_id: &str, subscribe: bool) -> SessionResult<()> {
        let core = self.inner.core.lock();
        self.inner
            .av
            .subscribe_remote_audio(core.engine.live(), core.sink(), user_id, subscribe)
    }

    // ===== RENDERING =====

    /// Bind a caller-owned surface to `user_id`
    pub fn init_renderer(
        &self,
        surface: Option<&Arc<dyn RenderSurface>>,
        user_id: &str,
    ) -> SessionResult<()> {
        self.inner.renderers.init_renderer(surface, user_id)
    }

    pub fn set_render_params(&self, user_id: &str, placement: RenderPlacement) -> SessionResult<()> {
        self.inner.renderers.set_render_params(user_id, placement)
    }

    pub fn destroy_renderer(&self, user_id: &str) -> SessionResult<()> {
        self.inner.renderers.destroy_renderer(user_id)
    }

    pub fn render_target(&self, user_id: &str) -> Option<RenderTargetInfo> {
        self.inner.renderers.target_info(user_id)
    }

    // ===== PERMISSIONS =====

    pub fn request_camera_permission(&self) -> SessionResult<PermissionState> {
        self.request_permission(PermissionKind::Camera)
    }

    pub fn request_microphone_permission(&self) -> SessionResult<PermissionState> {
        self.request_permission(PermissionKind::Microphone)
    }

    pub fn check_camera_permission(&self) -> PermissionState {
        self.inner.permissions.check(PermissionKind::Camera)
    }

    pub fn check_microphone_permission(&self) -> PermissionState {
        self.inner.permissions.check(PermissionKind::Microphone)
    }

    fn request_permission(&self, kind: PermissionKind) -> SessionResult<PermissionState> {
        let sink = self.inner.core.lock().sink.clone();
        self.inner.permissions.request(kind, sink.as_deref())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // try_lock: formatting may happen from inside a sink callback
        f.debug_struct("Session")
            .field("state", &self.inner.core.try_lock().map(|core| core.state))
            .field("membership", &self.membership())
            .field("renderers", &self.inner.renderers)
            .finish()
    }
}

/// Ingestion handle for notifications raised on engine threads
///
/// Holds the session weakly: once every [`Session`] clone is dropped, notifications
/// are ignored.
#[derive(Clone, Debug)]
pub struct EngineNotifier {
    inner: Weak<SessionInner>,
}

impl EngineNotifier {
    /// A remote user entered the channel. Ignored once the engine is destroyed.
    pub fn remote_user_joined(&self, user_id: &str) {
        let Some(inner) = self.inner.upgrade() else {
            tracing::trace!(user_id, "Session gone, remote join ignored");
            return;
        };
        let core = inner.core.lock();
        if !core.state.is_initialized() {
            tracing::debug!(user_id, "Engine not initialized, remote join ignored");
            return;
        }
        inner.channel.on_remote_user_joined(user_id, core.sink());
    }

    /// A remote user left the channel. Ignored once the engine is destroyed.
    pub fn remote_user_left(&self, user_id: &str, reason: i32) {
        let Some(inner) = self.inner.upgrade() else {
            tracing::trace!(user_id, "Session gone, remote leave ignored");
            return;
        };
        let core = inner.core.lock();
        if !core.state.is_initialized() {
            tracing::debug!(user_id, "Engine not initialized, remote leave ignored");
            return;
        }
        inner.channel.on_remote_user_left(user_id, reason, core.sink());
    }

    /// A decoded frame arrived. Returns whether it was presented.
    pub fn video_frame(&self, user_id: &str, frame: &VideoFrame) -> bool {
        match self.inner.upgrade() {
            Some(inner) => inner.renderers.on_video_frame(user_id, frame),
            None => false,
        }
    }

    /// The platform settled a deferred permission request
    pub fn permission_result(&self, kind: PermissionKind, granted: bool) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let sink = inner.core.lock().sink.clone();
        if let Err(err) = inner
            .permissions
            .on_permission_result(kind, granted, sink.as_deref())
        {
            tracing::debug!(error = %err, "Deferred permission settled as denied");
        }
    }

    /// Whether the session behind this notifier still exists
    pub fn is_attached(&self) -> bool {
        self.inner.strong_count() > 0
    }
}
