//! Shared helpers for client-core integration tests

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use rtcall_client_core::{
    FrameBuffer, LoopbackEngine, RenderPlacement, RenderSurface, Session, SessionEvent,
    SessionEventSink, VideoFrame,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("rtcall_client_core=debug")
        .with_test_writer()
        .try_init();
}

/// Sink that keeps every event it receives
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

impl SessionEventSink for RecordingSink {
    fn on_event(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}

/// Surface that counts presented frames
#[derive(Default)]
pub struct CountingSurface {
    presented: Mutex<usize>,
    last_size: Mutex<Option<(i32, i32)>>,
    placement: Mutex<Option<RenderPlacement>>,
}

impl CountingSurface {
    pub fn presented(&self) -> usize {
        *self.presented.lock()
    }

    pub fn last_size(&self) -> Option<(i32, i32)> {
        *self.last_size.lock()
    }

    pub fn placement(&self) -> Option<RenderPlacement> {
        *self.placement.lock()
    }
}

impl RenderSurface for CountingSurface {
    fn set_placement(&self, placement: &RenderPlacement) {
        *self.placement.lock() = Some(*placement);
    }

    fn present(&self, frame: &FrameBuffer) {
        *self.presented.lock() += 1;
        *self.last_size.lock() = Some((frame.width, frame.height));
    }
}

/// Initialized session over a loopback engine, with its recording sink
pub fn initialized_session() -> (Session, LoopbackEngine, Arc<RecordingSink>) {
    init_tracing();
    let engine = LoopbackEngine::new();
    let session = Session::new(Box::new(engine.clone()));
    let sink = RecordingSink::new();
    session
        .initialize("app1", true, Some(sink.clone()))
        .expect("initialize");
    sink.take();
    (session, engine, sink)
}

pub fn rgba_frame(width: i32, height: i32) -> VideoFrame {
    VideoFrame::rgba(width, height, vec![0x80u8; (width * height * 4) as usize])
}
