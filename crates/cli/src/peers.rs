//! Simulated remote participants
//!
//! A background thread plays the part of the engine's callback pool: remote users join
//! through the session's [`EngineNotifier`], push RGBA frames at a fixed rate, and leave
//! when the simulation stops. Frame loss is drawn at random per frame.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rtcall_client_core::{EngineNotifier, FrameBuffer, RenderPlacement, RenderSurface, VideoFrame};

pub const FRAME_WIDTH: i32 = 64;
pub const FRAME_HEIGHT: i32 = 36;

/// Reason code reported when a simulated peer quits
const LEAVE_REASON_QUIT: i32 = 0;

/// Surface that counts what reaches it
#[derive(Debug, Default)]
pub struct FrameCounter {
    presented: AtomicU64,
    placement: Mutex<Option<RenderPlacement>>,
}

impl FrameCounter {
    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    pub fn placement(&self) -> Option<RenderPlacement> {
        *self.placement.lock()
    }
}

impl RenderSurface for FrameCounter {
    fn set_placement(&self, placement: &RenderPlacement) {
        *self.placement.lock() = Some(*placement);
    }

    fn present(&self, _frame: &FrameBuffer) {
        self.presented.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerStats {
    pub sent: u64,
    pub dropped: u64,
    pub presented: u64,
}

pub struct PeerSimulator {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<PeerStats>>,
}

impl PeerSimulator {
    /// Start `peers` on a background thread, one frame per peer every `frame_interval`
    pub fn start(
        notifier: EngineNotifier,
        peers: Vec<String>,
        frame_loss: f64,
        frame_interval: Duration,
    ) -> anyhow::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let loss = frame_loss.clamp(0.0, 1.0);

        let handle = thread::Builder::new()
            .name("peer-simulator".to_string())
            .spawn(move || run_peers(notifier, peers, loss, frame_interval, flag))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the peers to leave and wait for the thread
    pub fn stop(mut self) -> PeerStats {
        self.stop.store(true, Ordering::SeqCst);
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                tracing::error!("Peer simulator thread panicked");
                PeerStats::default()
            }
            None => PeerStats::default(),
        }
    }
}

impl Drop for PeerSimulator {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn run_peers(
    notifier: EngineNotifier,
    peers: Vec<String>,
    loss: f64,
    frame_interval: Duration,
    stop: Arc<AtomicBool>,
) -> PeerStats {
    let mut rng = SmallRng::from_entropy();
    let mut stats = PeerStats::default();
    let mut tick: u8 = 0;

    for peer in &peers {
        tracing::info!(user_id = %peer, "Simulated peer joining");
        notifier.remote_user_joined(peer);
    }

    while !stop.load(Ordering::SeqCst) && notifier.is_attached() {
        tick = tick.wrapping_add(1);
        let frame = test_pattern(tick);
        for peer in &peers {
            stats.sent += 1;
            if loss > 0.0 && rng.gen_bool(loss) {
                stats.dropped += 1;
                continue;
            }
            if notifier.video_frame(peer, &frame) {
                stats.presented += 1;
            }
        }
        thread::sleep(frame_interval);
    }

    for peer in &peers {
        tracing::info!(user_id = %peer, "Simulated peer leaving");
        notifier.remote_user_left(peer, LEAVE_REASON_QUIT);
    }
    stats
}

/// Solid RGBA frame whose shade changes every tick
fn test_pattern(tick: u8) -> VideoFrame {
    let pixels = (FRAME_WIDTH * FRAME_HEIGHT) as usize;
    let mut data = Vec::with_capacity(pixels * 4);
    for _ in 0..pixels {
        data.extend_from_slice(&[tick, tick.wrapping_mul(3), 0x40, 0xFF]);
    }
    VideoFrame::rgba(FRAME_WIDTH, FRAME_HEIGHT, data)
}
