//! Abstract RTC engine boundary
//!
//! The session never talks to a vendor SDK directly. It drives an implementation of
//! [`RtcEngine`], which reports every outcome as an integer [`EngineCode`] (zero means
//! success). Non-zero codes are opaque: the session maps them onto its own taxonomy only
//! where a specific kind exists and otherwise passes them through unmodified.
//!
//! The engine is owned exclusively by the session through an [`EngineHandle`], a scoped
//! resource that pairs every successful `initialize` with exactly one `destroy`.

pub mod loopback;

pub use loopback::{EngineCall, EngineOp, LoopbackEngine};

/// Raw engine result code, `0` on success
pub type EngineCode = i32;

/// Engine success code
pub const ENGINE_OK: EngineCode = 0;

/// Operations the session consumes from the underlying RTC engine
///
/// Calls are synchronous and bounded: an implementation returns as soon as the request
/// is accepted or rejected and delivers asynchronous outcomes (remote users, frames)
/// through an [`EngineNotifier`](crate::EngineNotifier) from its own threads.
pub trait RtcEngine: Send + Sync {
    fn initialize(&self, app_id: &str, debug_mode: bool) -> EngineCode;

    fn destroy(&self) -> EngineCode;

    /// `token` is `None` when the channel does not require one
    fn join_channel(&self, channel: &str, user_id: &str, token: Option<&str>) -> EngineCode;

    fn leave_channel(&self) -> EngineCode;

    fn enable_local_video(&self, enabled: bool) -> EngineCode;

    fn enable_local_audio(&self, enabled: bool) -> EngineCode;

    fn switch_camera(&self) -> EngineCode;

    /// Recording signal volume, already clamped to `[0, 400]`
    fn set_local_volume(&self, volume: i32) -> EngineCode;

    fn mute_remote_video_stream(&self, user_id: &str, muted: bool) -> EngineCode;

    fn mute_remote_audio_stream(&self, user_id: &str, muted: bool) -> EngineCode;

    /// Whether front/back camera switching exists on this platform
    fn supports_camera_switch(&self) -> bool {
        true
    }
}

/// Exclusively owned engine with an explicit acquire/release lifecycle
///
/// Managers only ever see the engine through [`EngineHandle::live`], which hands out a
/// borrow while the engine is initialized and `None` otherwise. Dropping a live handle
/// releases the engine.
pub struct EngineHandle {
    engine: Box<dyn RtcEngine>,
    live: bool,
}

impl EngineHandle {
    pub fn new(engine: Box<dyn RtcEngine>) -> Self {
        Self {
            engine,
            live: false,
        }
    }

    /// Bring the engine up. On failure the handle stays released.
    pub fn acquire(&mut self, app_id: &str, debug_mode: bool) -> Result<(), EngineCode> {
        if self.live {
            return Ok(());
        }
        let code = self.engine.initialize(app_id, debug_mode);
        if code != ENGINE_OK {
            return Err(code);
        }
        self.live = true;
        Ok(())
    }

    /// Tear the engine down. Returns the engine's destroy code; a released handle
    /// reports success without calling the engine.
    pub fn release(&mut self) -> EngineCode {
        if !self.live {
            return ENGINE_OK;
        }
        self.live = false;
        self.engine.destroy()
    }

    /// Borrow the engine while it is initialized
    pub fn live(&self) -> Option<&dyn RtcEngine> {
        if self.live {
            Some(self.engine.as_ref())
        } else {
            None
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if self.live {
            let code = self.release();
            tracing::debug!(engine_code = code, "Released engine on drop");
        }
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("engine", &"<rtc engine>")
            .field("live", &self.live)
            .finish()
    }
}
