use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Sender, bounded};
use nokhwa::{
    Buffer, Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraIndex, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType,
    },
};

use super::{
    rgba_converter::{self, PixelLayout},
    source::{ChannelSource, FrameSource, FrameWait},
};
use crate::{
    error::PoseError,
    types::{CaptureMetadata, Frame},
};

// Built-in macOS cameras often reject YUYV even though it is reported.
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats() -> [RequestedFormat<'static>; 4] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: CameraIndex,
    pub label: String,
}

pub fn available_cameras() -> Result<Vec<CameraDevice>> {
    let cameras = query(ApiBackend::Auto)?;
    Ok(cameras
        .into_iter()
        .map(|info| CameraDevice {
            index: info.index().clone(),
            label: format_camera_label(&info),
        })
        .collect())
}

fn format_camera_label(info: &CameraInfo) -> String {
    info.human_name()
}

#[derive(Debug)]
struct CameraStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A running camera. Dropping it stops the capture thread and releases the
/// device.
pub struct CameraCapture {
    // Drop order: receiver before the stream join.
    source: ChannelSource,
    _stream: CameraStream,
}

impl FrameSource for CameraCapture {
    fn metadata(&self) -> CaptureMetadata {
        self.source.metadata()
    }

    fn current_frame(&mut self) -> Option<Frame> {
        self.source.current_frame()
    }

    fn wait_frame(&mut self, timeout: Duration) -> FrameWait {
        self.source.wait_frame(timeout)
    }
}

fn build_camera(index: CameraIndex) -> Result<Camera> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.into()),
            },
            Err(err) => last_err = Some(err.into()),
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
}

/// Opens camera `index` (video only) and returns once the stream reports its
/// resolution and frame rate.
pub fn open_capture(index: u32) -> Result<CameraCapture, PoseError> {
    let (frame_tx, frame_rx) = bounded(1);
    let (ready_tx, ready_rx) = bounded::<Result<CaptureMetadata>>(1);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    let handle = thread::spawn(move || run_capture(index, stop_flag, ready_tx, frame_tx));
    let stream = CameraStream {
        stop,
        handle: Some(handle),
    };

    let metadata = ready_rx
        .recv()
        .map_err(|_| anyhow!("capture thread exited before reporting stream metadata"))
        .and_then(|ready| ready)
        .map_err(PoseError::Capture)?;

    log::info!(
        "camera {index} streaming {}x{} @ {} fps",
        metadata.width,
        metadata.height,
        metadata.frame_rate
    );

    Ok(CameraCapture {
        source: ChannelSource::new(metadata, frame_rx),
        _stream: stream,
    })
}

fn run_capture(
    index: u32,
    stop_flag: Arc<AtomicBool>,
    ready_tx: Sender<Result<CaptureMetadata>>,
    frame_tx: Sender<Frame>,
) {
    let mut camera = match build_camera(CameraIndex::Index(index)) {
        Ok(camera) => camera,
        Err(err) => {
            log::error!("failed to open camera {index}: {err:?}");
            let _ = ready_tx.send(Err(err.context(format!("failed to open camera {index}"))));
            return;
        }
    };

    let resolution = camera.resolution();
    let _ = ready_tx.send(Ok(CaptureMetadata {
        width: resolution.width_x,
        height: resolution.height_y,
        frame_rate: camera.frame_rate(),
    }));

    while !stop_flag.load(Ordering::Relaxed) {
        let frame_start = Instant::now();
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(err) => {
                log::warn!(
                    "camera frame read failed (after {:?}): {err:?}",
                    frame_start.elapsed()
                );
                continue;
            }
        };

        let frame = match convert_camera_frame(&buffer) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("failed to decode camera frame: {err:?}");
                continue;
            }
        };

        // Single slot: if the render loop has not picked up the last frame yet,
        // this one is dropped and the loop keeps drawing "now".
        if let Err(err) = frame_tx.try_send(frame) {
            if err.is_disconnected() {
                break;
            }
        }
    }

    if let Err(err) = camera.stop_stream() {
        log::warn!("failed to stop camera stream: {err:?}");
    }
    log::info!("camera {index} released");
}

fn convert_camera_frame(buffer: &Buffer) -> Result<Frame> {
    let resolution = buffer.resolution();
    let layout = match buffer.source_frame_format() {
        FrameFormat::NV12 => PixelLayout::Nv12,
        FrameFormat::YUYV => PixelLayout::Yuyv,
        FrameFormat::MJPEG => PixelLayout::Mjpeg,
        FrameFormat::RAWRGB => PixelLayout::Rgb,
        FrameFormat::RAWBGR => PixelLayout::Bgr,
        FrameFormat::GRAY => PixelLayout::Gray,
    };
    let rgba = rgba_converter::to_rgba(
        layout,
        buffer.buffer(),
        resolution.width_x,
        resolution.height_y,
    )?;
    Ok(Frame::new(rgba, resolution.width_x, resolution.height_y))
}
