use anyhow::anyhow;

use super::{
    canvas::Canvas,
    detector::PoseDetector,
    render_loop::{LoopStats, RenderLoop, RenderOptions},
    source::FrameSource,
};
use crate::{error::PoseError, types::CaptureMetadata};

/// Progress of [`PoseSession::start`], in the order the stages run.
#[derive(Clone, Debug, PartialEq)]
pub enum StartupEvent {
    CameraStarting,
    CameraReady(CaptureMetadata),
    ModelLoading,
    ModelReady,
    Running,
}

/// Everything the demo owns once it is running: the capture metadata and the
/// render loop, which in turn owns the frame source and the detector.
#[derive(Debug)]
pub struct PoseSession {
    metadata: CaptureMetadata,
    render_loop: RenderLoop,
}

impl PoseSession {
    /// Camera first, then the model, then the loop. A failing stage returns
    /// straight away, so nothing after it runs.
    pub fn start<Src, D, C, L, P, E>(
        open_capture: C,
        load_model: L,
        options: RenderOptions,
        present: P,
        mut on_event: E,
    ) -> Result<Self, PoseError>
    where
        Src: FrameSource,
        D: PoseDetector,
        C: FnOnce() -> Result<Src, PoseError>,
        L: FnOnce() -> Result<D, PoseError>,
        P: FnMut(&Canvas) + Send + 'static,
        E: FnMut(StartupEvent),
    {
        on_event(StartupEvent::CameraStarting);
        let source = open_capture()?;
        let metadata = source.metadata();
        if metadata.width == 0 || metadata.height == 0 {
            return Err(PoseError::Capture(anyhow!(
                "camera reported an empty {}x{} stream",
                metadata.width,
                metadata.height
            )));
        }
        on_event(StartupEvent::CameraReady(metadata));

        on_event(StartupEvent::ModelLoading);
        let detector = load_model()?;
        on_event(StartupEvent::ModelReady);

        let canvas = Canvas::new(metadata.width, metadata.height);
        let render_loop = RenderLoop::spawn(source, detector, canvas, options, present);
        on_event(StartupEvent::Running);

        Ok(Self {
            metadata,
            render_loop,
        })
    }

    pub fn metadata(&self) -> CaptureMetadata {
        self.metadata
    }

    pub fn is_running(&self) -> bool {
        self.render_loop.is_running()
    }

    /// Stops the loop; the camera is released when the loop drops its source.
    pub fn stop(self) -> LoopStats {
        self.render_loop.stop()
    }
}
