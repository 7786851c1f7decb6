//! Per-user render targets and frame delivery
//!
//! The registry maps a user id to a caller-owned [`RenderSurface`] plus the last
//! accepted frame. Surfaces are held weakly: the application owns them and may drop one
//! at any time, after which frames for that user are discarded.
//!
//! Frame delivery runs on engine callback threads and is sharded per user, so a frame
//! for one user never waits on another user's frame or on channel operations.

use std::sync::{Arc, Weak};

use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Bytes per pixel of [`PixelFormat::Rgba`]
pub const RGBA_BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Unknown = 0,
    Rgba = 1,
}

/// Decoded frame handed over by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub width: i32,
    pub height: i32,
    pub format: PixelFormat,
    pub data: Bytes,
}

impl VideoFrame {
    pub fn rgba(width: i32, height: i32, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgba,
            data: data.into(),
        }
    }

    /// Payload length an RGBA frame of these dimensions must have
    pub fn expected_len(&self) -> Option<usize> {
        let width = usize::try_from(self.width).ok()?;
        let height = usize::try_from(self.height).ok()?;
        width
            .checked_mul(height)?
            .checked_mul(RGBA_BYTES_PER_PIXEL)
    }
}

/// Last frame retained for a user, rewritten in place on every accepted frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: i32,
    pub height: i32,
    pub format: Option<PixelFormat>,
    pub pixels: Vec<u8>,
}

impl FrameBuffer {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    fn overwrite(&mut self, frame: &VideoFrame) {
        self.width = frame.width;
        self.height = frame.height;
        self.format = Some(frame.format);
        self.pixels.clear();
        self.pixels.extend_from_slice(&frame.data);
    }

    fn release(&mut self) {
        *self = FrameBuffer::default();
    }
}

/// Position, size and opacity of a render target on screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderPlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub alpha: u8,
}

impl RenderPlacement {
    /// Placement with an out-of-range opacity clamped into `0..=255`
    pub fn new(x: f32, y: f32, width: f32, height: f32, alpha: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            alpha: alpha.clamp(0, u8::MAX as i32) as u8,
        }
    }
}

impl Default for RenderPlacement {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            alpha: u8::MAX,
        }
    }
}

/// Caller-owned drawing surface (a texture, sprite or window region)
pub trait RenderSurface: Send + Sync {
    fn set_placement(&self, placement: &RenderPlacement);

    fn present(&self, frame: &FrameBuffer);
}

struct RenderTarget {
    surface: Weak<dyn RenderSurface>,
    placement: RenderPlacement,
    last_frame: FrameBuffer,
}

/// Summary of one render target
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetInfo {
    pub user_id: String,
    pub placement: RenderPlacement,
    pub frame_width: i32,
    pub frame_height: i32,
    pub bound: bool,
}

/// Registry of render targets keyed by user id
#[derive(Default)]
pub struct RenderRegistry {
    targets: DashMap<String, RenderTarget>,
}

impl RenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `surface` to `user_id`, replacing any previous target and its frame
    pub fn init_renderer(
        &self,
        surface: Option<&Arc<dyn RenderSurface>>,
        user_id: &str,
    ) -> SessionResult<()> {
        let Some(surface) = surface else {
            tracing::warn!(user_id, "Render surface missing");
            return Err(SessionError::render_node_null(user_id));
        };
        self.targets.insert(
            user_id.to_string(),
            RenderTarget {
                surface: Arc::downgrade(surface),
                placement: RenderPlacement::default(),
                last_frame: FrameBuffer::default(),
            },
        );
        tracing::debug!(user_id, "Render target bound");
        Ok(())
    }

    /// Move or resize a target. Frame data is left untouched.
    pub fn set_render_params(&self, user_id: &str, placement: RenderPlacement) -> SessionResult<()> {
        let mut target = self
            .targets
            .get_mut(user_id)
            .ok_or_else(|| SessionError::render_node_null(user_id))?;
        let surface = target
            .surface
            .upgrade()
            .ok_or_else(|| SessionError::render_node_null(user_id))?;
        target.placement = placement;
        surface.set_placement(&placement);
        Ok(())
    }

    /// Forget a target. Idempotent; the surface itself is never touched.
    pub fn destroy_renderer(&self, user_id: &str) -> SessionResult<()> {
        if let Some((_, mut target)) = self.targets.remove(user_id) {
            target.last_frame.release();
            tracing::debug!(user_id, "Render target destroyed");
        }
        Ok(())
    }

    /// Deliver a decoded frame. Returns whether it was presented.
    ///
    /// Malformed frames and frames for users without a live surface are dropped.
    pub fn on_video_frame(&self, user_id: &str, frame: &VideoFrame) -> bool {
        if frame.data.is_empty() || frame.width <= 0 || frame.height <= 0 {
            tracing::trace!(user_id, "Dropping empty frame");
            return false;
        }
        if frame.format != PixelFormat::Rgba {
            tracing::warn!(user_id, format = ?frame.format, "Unsupported pixel format, frame dropped");
            return false;
        }
        if frame.expected_len() != Some(frame.data.len()) {
            tracing::trace!(
                user_id,
                width = frame.width,
                height = frame.height,
                len = frame.data.len(),
                "Frame size mismatch, dropped"
            );
            return false;
        }

        let Some(mut target) = self.targets.get_mut(user_id) else {
            tracing::trace!(user_id, "No render target, frame dropped");
            return false;
        };
        let Some(surface) = target.surface.upgrade() else {
            tracing::trace!(user_id, "Render surface gone, frame dropped");
            return false;
        };
        target.last_frame.overwrite(frame);
        surface.present(&target.last_frame);
        true
    }

    pub fn target_info(&self, user_id: &str) -> Option<RenderTargetInfo> {
        self.targets.get(user_id).map(|target| RenderTargetInfo {
            user_id: user_id.to_string(),
            placement: target.placement,
            frame_width: target.last_frame.width,
            frame_height: target.last_frame.height,
            bound: target.surface.strong_count() > 0,
        })
    }

    /// Copy of the last accepted frame for a user
    pub fn last_frame(&self, user_id: &str) -> Option<FrameBuffer> {
        self.targets
            .get(user_id)
            .filter(|target| !target.last_frame.is_empty())
            .map(|target| target.last_frame.clone())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }
}

impl std::fmt::Debug for RenderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderRegistry")
            .field("targets", &self.targets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct CountingSurface {
        presented: Mutex<Vec<(i32, i32)>>,
        placements: Mutex<Vec<RenderPlacement>>,
    }

    impl RenderSurface for CountingSurface {
        fn set_placement(&self, placement: &RenderPlacement) {
            self.placements.lock().push(*placement);
        }

        fn present(&self, frame: &FrameBuffer) {
            self.presented.lock().push((frame.width, frame.height));
        }
    }

    fn surface() -> (Arc<CountingSurface>, Arc<dyn RenderSurface>) {
        let concrete = Arc::new(CountingSurface::default());
        let erased: Arc<dyn RenderSurface> = concrete.clone();
        (concrete, erased)
    }

    fn rgba(width: i32, height: i32) -> VideoFrame {
        VideoFrame::rgba(width, height, vec![0u8; (width * height * 4) as usize])
    }

    #[test]
    fn test_init_requires_surface() {
        let registry = RenderRegistry::new();
        let err = registry.init_renderer(None, "7").unwrap_err();
        assert_eq!(err.code(), 4001);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_frame_presented_and_buffer_reused() {
        let registry = RenderRegistry::new();
        let (counting, erased) = surface();
        registry.init_renderer(Some(&erased), "7").unwrap();

        assert!(registry.on_video_frame("7", &rgba(4, 2)));
        let capacity = registry.targets.get("7").unwrap().last_frame.pixels.capacity();
        assert!(registry.on_video_frame("7", &rgba(4, 2)));
        assert_eq!(
            registry.targets.get("7").unwrap().last_frame.pixels.capacity(),
            capacity
        );

        assert_eq!(counting.presented.lock().as_slice(), &[(4, 2), (4, 2)]);
        let info = registry.target_info("7").unwrap();
        assert_eq!((info.frame_width, info.frame_height), (4, 2));
        assert!(info.bound);
    }

    #[traced_test]
    #[test]
    fn test_malformed_frames_dropped() {
        let registry = RenderRegistry::new();
        let (counting, erased) = surface();
        registry.init_renderer(Some(&erased), "7").unwrap();

        assert!(!registry.on_video_frame("7", &VideoFrame::rgba(4, 2, Bytes::new())));
        assert!(!registry.on_video_frame("7", &VideoFrame::rgba(0, 2, vec![0u8; 8])));
        assert!(!registry.on_video_frame("7", &VideoFrame::rgba(4, 2, vec![0u8; 31])));
        let mut yuv = rgba(4, 2);
        yuv.format = PixelFormat::Unknown;
        assert!(!registry.on_video_frame("7", &yuv));

        assert!(counting.presented.lock().is_empty());
        assert!(registry.last_frame("7").is_none());
        assert!(logs_contain("Unsupported pixel format"));
    }

    #[test]
    fn test_frame_without_target_is_silent() {
        let registry = RenderRegistry::new();
        assert!(!registry.on_video_frame("ghost", &rgba(2, 2)));
    }

    #[test]
    fn test_destroy_then_frame_is_noop() {
        let registry = RenderRegistry::new();
        let (counting, erased) = surface();
        registry.init_renderer(Some(&erased), "7").unwrap();
        registry.destroy_renderer("7").unwrap();
        registry.destroy_renderer("7").unwrap();

        assert!(!registry.on_video_frame("7", &rgba(2, 2)));
        assert!(counting.presented.lock().is_empty());
        // the registry never owned the surface
        assert_eq!(Arc::strong_count(&counting), 2);
    }

    #[test]
    fn test_params_on_dropped_surface() {
        let registry = RenderRegistry::new();
        let (counting, erased) = surface();
        registry.init_renderer(Some(&erased), "7").unwrap();

        registry
            .set_render_params("7", RenderPlacement::new(1.0, 2.0, 320.0, 240.0, 300))
            .unwrap();
        assert_eq!(counting.placements.lock()[0].alpha, 255);

        drop(erased);
        drop(counting);
        let err = registry
            .set_render_params("7", RenderPlacement::default())
            .unwrap_err();
        assert_eq!(err, SessionError::render_node_null("7"));
        assert!(!registry.on_video_frame("7", &rgba(2, 2)));
        assert_eq!(
            registry.set_render_params("nobody", RenderPlacement::default()),
            Err(SessionError::render_node_null("nobody"))
        );
    }

    #[test]
    fn test_reinit_clears_previous_frame() {
        let registry = RenderRegistry::new();
        let (_counting, erased) = surface();
        registry.init_renderer(Some(&erased), "7").unwrap();
        registry.on_video_frame("7", &rgba(2, 2));
        assert!(registry.last_frame("7").is_some());

        registry.init_renderer(Some(&erased), "7").unwrap();
        assert!(registry.last_frame("7").is_none());
    }

    #[test]
    fn test_expected_len_overflow() {
        let frame = VideoFrame::rgba(i32::MAX, i32::MAX, vec![0u8; 4]);
        // fits in 64-bit usize, still never equal to a 4-byte payload
        assert_ne!(frame.expected_len(), Some(4));
        assert_eq!(VideoFrame::rgba(-1, 2, Bytes::new()).expected_len(), None);
    }
}
