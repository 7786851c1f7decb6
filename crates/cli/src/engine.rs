//! Engine with simulated network delay
//!
//! Wraps the in-process loopback engine and sleeps before every call, so the sandbox
//! exercises the session while each request takes as long as a slow network would.

use std::thread;
use std::time::Duration;

use rtcall_client_core::{EngineCode, LoopbackEngine, RtcEngine};

pub struct SimulatedEngine {
    inner: LoopbackEngine,
    latency: Duration,
}

impl SimulatedEngine {
    pub fn new(inner: LoopbackEngine, latency: Duration) -> Self {
        Self { inner, latency }
    }

    fn delay(&self) {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
    }
}

impl RtcEngine for SimulatedEngine {
    fn initialize(&self, app_id: &str, debug_mode: bool) -> EngineCode {
        self.delay();
        self.inner.initialize(app_id, debug_mode)
    }

    fn destroy(&self) -> EngineCode {
        self.inner.destroy()
    }

    fn join_channel(&self, channel: &str, user_id: &str, token: Option<&str>) -> EngineCode {
        self.delay();
        self.inner.join_channel(channel, user_id, token)
    }

    fn leave_channel(&self) -> EngineCode {
        self.delay();
        self.inner.leave_channel()
    }

    fn enable_local_video(&self, enabled: bool) -> EngineCode {
        self.delay();
        self.inner.enable_local_video(enabled)
    }

    fn enable_local_audio(&self, enabled: bool) -> EngineCode {
        self.delay();
        self.inner.enable_local_audio(enabled)
    }

    fn switch_camera(&self) -> EngineCode {
        self.inner.switch_camera()
    }

    fn set_local_volume(&self, volume: i32) -> EngineCode {
        self.inner.set_local_volume(volume)
    }

    fn mute_remote_video_stream(&self, user_id: &str, muted: bool) -> EngineCode {
        self.delay();
        self.inner.mute_remote_video_stream(user_id, muted)
    }

    fn mute_remote_audio_stream(&self, user_id: &str, muted: bool) -> EngineCode {
        self.delay();
        self.inner.mute_remote_audio_stream(user_id, muted)
    }

    fn supports_camera_switch(&self) -> bool {
        self.inner.supports_camera_switch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtcall_client_core::EngineOp;
    use std::time::Instant;

    #[test]
    fn test_delegates_and_delays() {
        let loopback = LoopbackEngine::new();
        let engine = SimulatedEngine::new(loopback.clone(), Duration::from_millis(20));

        let started = Instant::now();
        assert_eq!(engine.join_channel("room1", "42", None), 0);
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(loopback.count(EngineOp::JoinChannel), 1);
    }

    #[test]
    fn test_zero_latency_is_passthrough() {
        let loopback = LoopbackEngine::desktop();
        let engine = SimulatedEngine::new(loopback, Duration::ZERO);
        assert!(!engine.supports_camera_switch());
        assert_eq!(engine.set_local_volume(100), 0);
    }
}
