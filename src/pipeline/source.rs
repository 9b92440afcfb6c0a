use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::types::{CaptureMetadata, Frame};

/// Outcome of waiting a bounded time for the next frame.
#[derive(Debug)]
pub enum FrameWait {
    Ready(Frame),
    /// Nothing arrived in time; the stream may still be alive.
    Pending,
    Ended,
}

/// A live, continuously updating video source.
pub trait FrameSource: Send + 'static {
    fn metadata(&self) -> CaptureMetadata;

    /// Newest available frame. Blocks until one arrives; `None` once the
    /// stream has ended.
    fn current_frame(&mut self) -> Option<Frame>;

    /// Like [`current_frame`](Self::current_frame) but gives up after
    /// `timeout`. Sources that never block can keep the default.
    fn wait_frame(&mut self, timeout: Duration) -> FrameWait {
        let _ = timeout;
        match self.current_frame() {
            Some(frame) => FrameWait::Ready(frame),
            None => FrameWait::Ended,
        }
    }
}

/// Frame source fed by a producer thread through a channel.
pub struct ChannelSource {
    metadata: CaptureMetadata,
    frame_rx: Receiver<Frame>,
}

impl ChannelSource {
    pub fn new(metadata: CaptureMetadata, frame_rx: Receiver<Frame>) -> Self {
        Self { metadata, frame_rx }
    }
}

impl FrameSource for ChannelSource {
    fn metadata(&self) -> CaptureMetadata {
        self.metadata
    }

    fn current_frame(&mut self) -> Option<Frame> {
        let frame = self.frame_rx.recv().ok()?;
        Some(drain_to_latest(&self.frame_rx, frame))
    }

    fn wait_frame(&mut self, timeout: Duration) -> FrameWait {
        match self.frame_rx.recv_timeout(timeout) {
            Ok(frame) => FrameWait::Ready(drain_to_latest(&self.frame_rx, frame)),
            Err(RecvTimeoutError::Timeout) => FrameWait::Pending,
            Err(RecvTimeoutError::Disconnected) => FrameWait::Ended,
        }
    }
}

// Always draw "now": anything queued behind the first frame is newer.
fn drain_to_latest(frame_rx: &Receiver<Frame>, mut frame: Frame) -> Frame {
    while let Ok(newer) = frame_rx.try_recv() {
        frame = newer;
    }
    frame
}
