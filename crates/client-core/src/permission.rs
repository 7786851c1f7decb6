//! Camera and microphone authorization state
//!
//! Each capability sits in one of three states. A request asks the installed
//! [`PermissionPrompt`], which either answers immediately or defers to the platform;
//! deferred requests settle later through
//! [`EngineNotifier::permission_result`](crate::EngineNotifier::permission_result).

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};
use crate::events::{SessionEvent, SessionEventSink, emit};

/// Capability guarded by a platform permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Camera = 0,
    Microphone = 1,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::Camera => write!(f, "camera"),
            PermissionKind::Microphone => write!(f, "microphone"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted = 0,
    Denied = 1,
    Pending = 2,
}

impl PermissionState {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Answer from a permission prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    Granted,
    Denied,
    /// The platform shows a dialog; the answer arrives later
    Deferred,
}

/// Platform hook deciding camera/microphone requests
pub trait PermissionPrompt: Send + Sync {
    fn request(&self, kind: PermissionKind) -> PromptOutcome;
}

/// Prompt for desktop targets, where no runtime authorization exists
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoGrant;

impl PermissionPrompt for AutoGrant {
    fn request(&self, _kind: PermissionKind) -> PromptOutcome {
        PromptOutcome::Granted
    }
}

#[derive(Debug, Clone, Copy)]
struct Grants {
    camera: PermissionState,
    microphone: PermissionState,
}

impl Grants {
    fn slot(&mut self, kind: PermissionKind) -> &mut PermissionState {
        match kind {
            PermissionKind::Camera => &mut self.camera,
            PermissionKind::Microphone => &mut self.microphone,
        }
    }

    fn get(&self, kind: PermissionKind) -> PermissionState {
        match kind {
            PermissionKind::Camera => self.camera,
            PermissionKind::Microphone => self.microphone,
        }
    }
}

/// Per-capability authorization ledger
pub struct PermissionLedger {
    grants: Mutex<Grants>,
    prompt: Box<dyn PermissionPrompt>,
}

impl PermissionLedger {
    pub fn new(prompt: Box<dyn PermissionPrompt>) -> Self {
        Self {
            grants: Mutex::new(Grants {
                camera: PermissionState::Granted,
                microphone: PermissionState::Granted,
            }),
            prompt,
        }
    }

    /// Ask the prompt for `kind` and record the answer
    ///
    /// The capability is `Pending` while the prompt runs. A deferred answer reports
    /// nothing yet and returns whatever the slot holds, which is already settled if
    /// the platform answered before the prompt returned.
    pub fn request(
        &self,
        kind: PermissionKind,
        sink: Option<&dyn SessionEventSink>,
    ) -> SessionResult<PermissionState> {
        *self.grants.lock().slot(kind) = PermissionState::Pending;

        let state = match self.prompt.request(kind) {
            PromptOutcome::Granted => PermissionState::Granted,
            PromptOutcome::Denied => PermissionState::Denied,
            PromptOutcome::Deferred => {
                let current = self.check(kind);
                tracing::debug!(%kind, state = ?current, "Permission request deferred to platform");
                return Ok(current);
            }
        };
        *self.grants.lock().slot(kind) = state;
        self.report(kind, state, sink)
    }

    /// Settle a deferred request
    pub fn on_permission_result(
        &self,
        kind: PermissionKind,
        granted: bool,
        sink: Option<&dyn SessionEventSink>,
    ) -> SessionResult<PermissionState> {
        let state = if granted {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        };
        *self.grants.lock().slot(kind) = state;
        self.report(kind, state, sink)
    }

    pub fn check(&self, kind: PermissionKind) -> PermissionState {
        self.grants.lock().get(kind)
    }

    fn report(
        &self,
        kind: PermissionKind,
        state: PermissionState,
        sink: Option<&dyn SessionEventSink>,
    ) -> SessionResult<PermissionState> {
        emit(
            sink,
            SessionEvent::PermissionResult {
                kind,
                code: state.code(),
            },
        );
        if state == PermissionState::Denied {
            tracing::warn!(%kind, "Permission denied");
            return Err(SessionError::PermissionDenied { kind });
        }
        tracing::info!(%kind, "Permission granted");
        Ok(state)
    }
}

impl Default for PermissionLedger {
    fn default() -> Self {
        Self::new(Box::new(AutoGrant))
    }
}

impl fmt::Debug for PermissionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionLedger")
            .field("grants", &*self.grants.lock())
            .finish_non_exhaustive()
    }
}
