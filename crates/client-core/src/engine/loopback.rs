//! In-process engine that accepts every request
//!
//! `LoopbackEngine` stands in for a vendor SDK: it keeps a log of every call, lets the
//! caller script a result code per operation, and tracks the little state a real engine
//! would refuse requests on (initialized, in a channel). Clones share state, so a test
//! or the sandbox can keep a handle after moving one into a [`Session`](crate::Session).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ENGINE_OK, EngineCode, RtcEngine};

/// Engine operation selector used to script results and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    Initialize,
    Destroy,
    JoinChannel,
    LeaveChannel,
    EnableLocalVideo,
    EnableLocalAudio,
    SwitchCamera,
    SetLocalVolume,
    MuteRemoteVideo,
    MuteRemoteAudio,
}

/// One recorded engine call with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Initialize { app_id: String, debug_mode: bool },
    Destroy,
    JoinChannel {
        channel: String,
        user_id: String,
        token: Option<String>,
    },
    LeaveChannel,
    EnableLocalVideo(bool),
    EnableLocalAudio(bool),
    SwitchCamera,
    SetLocalVolume(i32),
    MuteRemoteVideo { user_id: String, muted: bool },
    MuteRemoteAudio { user_id: String, muted: bool },
}

impl EngineCall {
    pub fn op(&self) -> EngineOp {
        match self {
            EngineCall::Initialize { .. } => EngineOp::Initialize,
            EngineCall::Destroy => EngineOp::Destroy,
            EngineCall::JoinChannel { .. } => EngineOp::JoinChannel,
            EngineCall::LeaveChannel => EngineOp::LeaveChannel,
            EngineCall::EnableLocalVideo(_) => EngineOp::EnableLocalVideo,
            EngineCall::EnableLocalAudio(_) => EngineOp::EnableLocalAudio,
            EngineCall::SwitchCamera => EngineOp::SwitchCamera,
            EngineCall::SetLocalVolume(_) => EngineOp::SetLocalVolume,
            EngineCall::MuteRemoteVideo { .. } => EngineOp::MuteRemoteVideo,
            EngineCall::MuteRemoteAudio { .. } => EngineOp::MuteRemoteAudio,
        }
    }
}

#[derive(Debug)]
struct LoopbackState {
    calls: Vec<EngineCall>,
    results: HashMap<EngineOp, EngineCode>,
    one_shot: HashMap<EngineOp, EngineCode>,
    initialized: bool,
    channel: Option<String>,
    camera_switch: bool,
}

/// Recording, scriptable [`RtcEngine`]
#[derive(Debug, Clone)]
pub struct LoopbackEngine {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LoopbackState {
                calls: Vec::new(),
                results: HashMap::new(),
                one_shot: HashMap::new(),
                initialized: false,
                channel: None,
                camera_switch: true,
            })),
        }
    }

    /// Engine for a platform without front/back camera switching
    pub fn desktop() -> Self {
        let engine = Self::new();
        engine.set_camera_switch(false);
        engine
    }

    /// Return `code` from every future call of `op`
    pub fn set_result(&self, op: EngineOp, code: EngineCode) {
        self.state.lock().results.insert(op, code);
    }

    /// Return `code` from the next call of `op` only
    pub fn fail_next(&self, op: EngineOp, code: EngineCode) {
        self.state.lock().one_shot.insert(op, code);
    }

    pub fn set_camera_switch(&self, supported: bool) {
        self.state.lock().camera_switch = supported;
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.clone()
    }

    pub fn last_call(&self) -> Option<EngineCall> {
        self.state.lock().calls.last().cloned()
    }

    /// Number of calls received for `op`
    pub fn count(&self, op: EngineOp) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Channel the engine believes it is in
    pub fn current_channel(&self) -> Option<String> {
        self.state.lock().channel.clone()
    }

    fn record(&self, call: EngineCall) -> EngineCode {
        let mut state = self.state.lock();
        let op = call.op();
        state.calls.push(call);
        let code = match state.one_shot.remove(&op) {
            Some(code) => code,
            None => state.results.get(&op).copied().unwrap_or(ENGINE_OK),
        };
        if code == ENGINE_OK {
            match op {
                EngineOp::Initialize => state.initialized = true,
                EngineOp::Destroy => {
                    state.initialized = false;
                    state.channel = None;
                }
                EngineOp::LeaveChannel => state.channel = None,
                _ => {}
            }
        }
        code
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RtcEngine for LoopbackEngine {
    fn initialize(&self, app_id: &str, debug_mode: bool) -> EngineCode {
        self.record(EngineCall::Initialize {
            app_id: app_id.to_string(),
            debug_mode,
        })
    }

    fn destroy(&self) -> EngineCode {
        self.record(EngineCall::Destroy)
    }

    fn join_channel(&self, channel: &str, user_id: &str, token: Option<&str>) -> EngineCode {
        let code = self.record(EngineCall::JoinChannel {
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            token: token.map(str::to_string),
        });
        if code == ENGINE_OK {
            self.state.lock().channel = Some(channel.to_string());
        }
        code
    }

    fn leave_channel(&self) -> EngineCode {
        self.record(EngineCall::LeaveChannel)
    }

    fn enable_local_video(&self, enabled: bool) -> EngineCode {
        self.record(EngineCall::EnableLocalVideo(enabled))
    }

    fn enable_local_audio(&self, enabled: bool) -> EngineCode {
        self.record(EngineCall::EnableLocalAudio(enabled))
    }

    fn switch_camera(&self) -> EngineCode {
        self.record(EngineCall::SwitchCamera)
    }

    fn set_local_volume(&self, volume: i32) -> EngineCode {
        self.record(EngineCall::SetLocalVolume(volume))
    }

    fn mute_remote_video_stream(&self, user_id: &str, muted: bool) -> EngineCode {
        self.record(EngineCall::MuteRemoteVideo {
            user_id: user_id.to_string(),
            muted,
        })
    }

    fn mute_remote_audio_stream(&self, user_id: &str, muted: bool) -> EngineCode {
        self.record(EngineCall::MuteRemoteAudio {
            user_id: user_id.to_string(),
            muted,
        })
    }

    fn supports_camera_switch(&self) -> bool {
        self.state.lock().camera_switch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let engine = LoopbackEngine::new();
        engine.initialize("app1", true);
        engine.join_channel("room1", "42", None);
        engine.set_local_volume(120);

        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::Initialize {
                    app_id: "app1".to_string(),
                    debug_mode: true
                },
                EngineCall::JoinChannel {
                    channel: "room1".to_string(),
                    user_id: "42".to_string(),
                    token: None
                },
                EngineCall::SetLocalVolume(120),
            ]
        );
        assert_eq!(engine.current_channel().as_deref(), Some("room1"));
    }

    #[test]
    fn test_one_shot_result_then_persistent() {
        let engine = LoopbackEngine::new();
        engine.fail_next(EngineOp::JoinChannel, -17);
        assert_eq!(engine.join_channel("room1", "42", None), -17);
        assert_eq!(engine.current_channel(), None);
        assert_eq!(engine.join_channel("room1", "42", None), ENGINE_OK);

        engine.set_result(EngineOp::LeaveChannel, -1);
        assert_eq!(engine.leave_channel(), -1);
        assert_eq!(engine.leave_channel(), -1);
        assert_eq!(engine.count(EngineOp::LeaveChannel), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let engine = LoopbackEngine::desktop();
        let clone = engine.clone();
        clone.initialize("app1", false);
        assert!(engine.is_initialized());
        assert!(!engine.supports_camera_switch());
    }
}
