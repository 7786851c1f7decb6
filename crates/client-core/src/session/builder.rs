//! Fluent construction of a [`Session`]
//!
//! ```rust
//! use rtcall_client_core::{AutoGrant, LoopbackEngine, SessionBuilder};
//!
//! let session = SessionBuilder::new()
//!     .engine(LoopbackEngine::new())
//!     .permission_prompt(AutoGrant)
//!     .build()
//!     .expect("engine provided");
//! ```

use super::Session;
use crate::engine::RtcEngine;
use crate::error::{SessionError, SessionResult};
use crate::permission::{AutoGrant, PermissionPrompt};

/// Builder for [`Session`]
///
/// An engine is mandatory; the permission prompt defaults to [`AutoGrant`].
#[derive(Default)]
pub struct SessionBuilder {
    engine: Option<Box<dyn RtcEngine>>,
    prompt: Option<Box<dyn PermissionPrompt>>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(mut self, engine: impl RtcEngine + 'static) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    pub fn boxed_engine(mut self, engine: Box<dyn RtcEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn permission_prompt(mut self, prompt: impl PermissionPrompt + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    pub fn build(self) -> SessionResult<Session> {
        let engine = self
            .engine
            .ok_or_else(|| SessionError::invalid_config("engine", "no RTC engine provided"))?;
        let prompt = self.prompt.unwrap_or_else(|| Box::new(AutoGrant));
        Ok(Session::with_prompt(engine, prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LoopbackEngine;
    use crate::permission::{PermissionKind, PermissionState, PromptOutcome};

    struct DenyAll;

    impl PermissionPrompt for DenyAll {
        fn request(&self, _kind: PermissionKind) -> PromptOutcome {
            PromptOutcome::Denied
        }
    }

    #[test]
    fn test_build_requires_engine() {
        let err = SessionBuilder::new().build().unwrap_err();
        assert_eq!(err, SessionError::invalid_config("engine", "no RTC engine provided"));
    }

    #[test]
    fn test_custom_prompt_is_used() {
        let session = SessionBuilder::new()
            .engine(LoopbackEngine::new())
            .permission_prompt(DenyAll)
            .build()
            .unwrap();

        assert_eq!(session.request_camera_permission().unwrap_err().code(), 3001);
        assert_eq!(session.check_camera_permission(), PermissionState::Denied);
        assert_eq!(session.check_microphone_permission(), PermissionState::Granted);
    }

    #[test]
    fn test_boxed_engine() {
        let engine: Box<dyn RtcEngine> = Box::new(LoopbackEngine::desktop());
        let session = Session::builder().boxed_engine(engine).build().unwrap();
        assert!(!session.state().is_initialized());
    }
}
