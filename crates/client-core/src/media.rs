//! Local publish and remote subscribe controls
//!
//! [`AvController`] holds no state of its own. Every call borrows the live engine from
//! the session, forwards one request, and reports the raw engine code.

use crate::engine::RtcEngine;
use crate::error::{SessionError, SessionResult, engine_result};
use crate::events::{SessionEvent, SessionEventSink, emit};

/// Lowest accepted local recording volume
pub const MIN_LOCAL_VOLUME: i32 = 0;
/// Highest accepted local recording volume (4x amplification)
pub const MAX_LOCAL_VOLUME: i32 = 400;

/// Clamp a requested volume into the range the engine accepts
pub fn clamp_volume(volume: i32) -> i32 {
    volume.clamp(MIN_LOCAL_VOLUME, MAX_LOCAL_VOLUME)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AvController;

impl AvController {
    pub fn new() -> Self {
        Self
    }

    /// Start or stop publishing the local camera
    pub fn enable_local_camera(
        &self,
        engine: Option<&dyn RtcEngine>,
        sink: Option<&dyn SessionEventSink>,
        enable: bool,
    ) -> SessionResult<()> {
        let engine = require_engine(engine, sink)?;
        let code = engine.enable_local_video(enable);
        tracing::info!(enable, engine_code = code, "Local camera toggled");
        emit(sink, SessionEvent::LocalVideoPublished { code });
        engine_result(code)
    }

    /// Start or stop publishing the local microphone
    pub fn enable_local_microphone(
        &self,
        engine: Option<&dyn RtcEngine>,
        sink: Option<&dyn SessionEventSink>,
        enable: bool,
    ) -> SessionResult<()> {
        let engine = require_engine(engine, sink)?;
        let code = engine.enable_local_audio(enable);
        tracing::info!(enable, engine_code = code, "Local microphone toggled");
        emit(sink, SessionEvent::LocalAudioPublished { code });
        engine_result(code)
    }

    /// Flip between front and back camera. Reports no event.
    pub fn switch_camera(&self, engine: Option<&dyn RtcEngine>) -> SessionResult<()> {
        let engine = engine.ok_or(SessionError::EngineNotInitialized)?;
        if !engine.supports_camera_switch() {
            return Err(SessionError::unsupported("switch_camera"));
        }
        engine_result(engine.switch_camera())
    }

    /// Set the recording volume, clamped into `[0, 400]`. Reports no event.
    pub fn set_local_volume(&self, engine: Option<&dyn RtcEngine>, volume: i32) -> SessionResult<()> {
        let engine = engine.ok_or(SessionError::EngineNotInitialized)?;
        let clamped = clamp_volume(volume);
        if clamped != volume {
            tracing::debug!(requested = volume, clamped, "Local volume clamped");
        }
        engine_result(engine.set_local_volume(clamped))
    }

    /// Receive or stop receiving a remote user's video
    pub fn subscribe_remote_video(
        &self,
        engine: Option<&dyn RtcEngine>,
        sink: Option<&dyn SessionEventSink>,
        user_id: &str,
        subscribe: bool,
    ) -> SessionResult<()> {
        let engine = require_engine(engine, sink)?;
        let code = engine.mute_remote_video_stream(user_id, !subscribe);
        tracing::debug!(user_id, subscribe, engine_code = code, "Remote video subscription");
        emit(
            sink,
            SessionEvent::RemoteVideoSubscribed {
                code,
                user_id: user_id.to_string(),
            },
        );
        engine_result(code)
    }

    /// Receive or stop receiving a remote user's audio
    pub fn subscribe_remote_audio(
        &self,
        engine: Option<&dyn RtcEngine>,
        sink: Option<&dyn SessionEventSink>,
        user_id: &str,
        subscribe: bool,
    ) -> SessionResult<()> {
        let engine = require_engine(engine, sink)?;
        let code = engine.mute_remote_audio_stream(user_id, !subscribe);
        tracing::debug!(user_id, subscribe, engine_code = code, "Remote audio subscription");
        emit(
            sink,
            SessionEvent::RemoteAudioSubscribed {
                code,
                user_id: user_id.to_string(),
            },
        );
        engine_result(code)
    }
}

fn require_engine<'a>(
    engine: Option<&'a dyn RtcEngine>,
    sink: Option<&dyn SessionEventSink>,
) -> SessionResult<&'a dyn RtcEngine> {
    match engine {
        Some(engine) => Ok(engine),
        None => {
            let err = SessionError::EngineNotInitialized;
            emit(sink, SessionEvent::error(&err));
            Err(err)
        }
    }
}
