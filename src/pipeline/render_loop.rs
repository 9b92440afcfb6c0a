use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use super::{
    canvas::Surface,
    detector::PoseDetector,
    skeleton::{OverlayStyle, draw_poses},
    source::{FrameSource, FrameWait},
};
use crate::{config::Config, error::PoseError, types::Frame};

/// Upper bound on how long the loop waits for a frame before it looks at the
/// stop flag again.
const FRAME_WAIT: Duration = Duration::from_millis(50);

#[derive(Clone, Debug)]
pub struct RenderOptions {
    pub style: OverlayStyle,
    /// Minimum spacing between iterations; zero runs flat out.
    pub refresh_interval: Duration,
}

impl RenderOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            style: OverlayStyle::new(config.overlay, config.score_threshold),
            refresh_interval: Duration::from_secs_f64(1.0 / config.refresh_hz.max(1) as f64),
        }
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            style: OverlayStyle::default(),
            refresh_interval: Duration::from_secs_f64(1.0 / 60.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    pub poses: usize,
    pub keypoints: usize,
    pub segments: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub rendered: u64,
    pub skipped: u64,
}

/// One iteration body: estimate, then clear, redraw the frame and overlay.
/// On estimation failure nothing is drawn.
pub fn render_frame<D, S>(
    detector: &mut D,
    frame: &Frame,
    surface: &mut S,
    style: &OverlayStyle,
) -> Result<FrameSummary, PoseError>
where
    D: PoseDetector + ?Sized,
    S: Surface + ?Sized,
{
    let poses = detector
        .estimate_poses(frame)
        .map_err(PoseError::Estimate)?;

    if log::log_enabled!(log::Level::Trace) {
        for pose in &poses {
            let visible: Vec<&str> = pose
                .keypoints
                .iter()
                .filter(|kp| style.is_visible(kp))
                .filter_map(|kp| kp.name.map(|name| name.as_str()))
                .collect();
            log::trace!("pose {:.2}: {}", pose.score, visible.join(", "));
        }
    }

    surface.clear();
    surface.draw_frame(frame);
    let overlay = draw_poses(surface, &poses, style);

    Ok(FrameSummary {
        poses: poses.len(),
        keypoints: overlay.keypoints,
        segments: overlay.segments,
    })
}

/// The per-frame loop running on its own thread until stopped or until the
/// source runs dry.
#[derive(Debug)]
pub struct RenderLoop {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<LoopStats>>,
}

impl RenderLoop {
    pub fn spawn<Src, D, S, P>(
        mut source: Src,
        mut detector: D,
        mut surface: S,
        options: RenderOptions,
        mut present: P,
    ) -> Self
    where
        Src: FrameSource,
        D: PoseDetector,
        S: Surface + Send + 'static,
        P: FnMut(&S) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            let mut stats = LoopStats::default();
            log::info!("render loop started");

            while !stop_flag.load(Ordering::Relaxed) {
                let frame = match source.wait_frame(FRAME_WAIT) {
                    FrameWait::Ready(frame) => frame,
                    FrameWait::Pending => {
                        log::debug!("no frame within {FRAME_WAIT:?}, still waiting");
                        continue;
                    }
                    FrameWait::Ended => {
                        log::info!("frame source ended");
                        break;
                    }
                };
                let started = Instant::now();

                match render_frame(&mut detector, &frame, &mut surface, &options.style) {
                    Ok(summary) => {
                        present(&surface);
                        stats.rendered += 1;
                        log::trace!(
                            "frame drawn in {:?}: {} poses, {} keypoints, {} segments",
                            started.elapsed(),
                            summary.poses,
                            summary.keypoints,
                            summary.segments
                        );
                    }
                    Err(err) => {
                        stats.skipped += 1;
                        log::warn!("skipping frame: {err}");
                    }
                }

                if let Some(rest) = options.refresh_interval.checked_sub(started.elapsed()) {
                    thread::sleep(rest);
                }
            }

            log::info!(
                "render loop stopped after {} frames ({} skipped)",
                stats.rendered,
                stats.skipped
            );
            stats
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signals the loop and waits for the current iteration to finish.
    pub fn stop(mut self) -> LoopStats {
        self.stop.store(true, Ordering::SeqCst);
        self.join_inner()
    }

    /// Waits for the loop to end on its own, i.e. for the source to run dry.
    pub fn join(mut self) -> LoopStats {
        self.join_inner()
    }

    fn join_inner(&mut self) -> LoopStats {
        let Some(handle) = self.handle.take() else {
            return LoopStats::default();
        };
        handle.join().unwrap_or_else(|_| {
            log::error!("render loop panicked");
            LoopStats::default()
        })
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{canvas::Canvas, skeleton::OverlayMode};
    use crate::types::{Keypoint, Pose};
    use anyhow::anyhow;

    struct Fixed(Vec<Pose>);

    impl PoseDetector for Fixed {
        fn estimate_poses(&mut self, _frame: &Frame) -> anyhow::Result<Vec<Pose>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl PoseDetector for Failing {
        fn estimate_poses(&mut self, _frame: &Frame) -> anyhow::Result<Vec<Pose>> {
            Err(anyhow!("tensor shape mismatch"))
        }
    }

    #[test]
    fn stale_markers_do_not_survive_next_frame() {
        let mut canvas = Canvas::new(300, 300);
        let style = OverlayStyle::default();
        let frame = Frame::filled(300, 300, [0, 0, 255, 255]);

        let mut first = Fixed(vec![Pose::from_keypoints(vec![Keypoint::new(
            50.0, 50.0, 0.9,
        )])]);
        render_frame(&mut first, &frame, &mut canvas, &style).unwrap();
        assert_eq!(canvas.pixel(50, 50), Some([255, 0, 0, 255]));

        let mut second = Fixed(vec![Pose::from_keypoints(vec![Keypoint::new(
            200.0, 200.0, 0.9,
        )])]);
        render_frame(&mut second, &frame, &mut canvas, &style).unwrap();
        assert_eq!(canvas.pixel(50, 50), Some([0, 0, 255, 255]));
        assert_eq!(canvas.pixel(200, 200), Some([255, 0, 0, 255]));
    }

    #[test]
    fn estimation_failure_maps_to_estimate_and_draws_nothing() {
        let mut canvas = Canvas::new(4, 4);
        let frame = Frame::filled(4, 4, [9, 9, 9, 255]);
        let err = render_frame(&mut Failing, &frame, &mut canvas, &OverlayStyle::default())
            .unwrap_err();
        assert!(matches!(err, PoseError::Estimate(_)));
        assert!(canvas.as_rgba().iter().all(|&b| b == 0));
    }

    #[test]
    fn options_follow_config() {
        let config = Config {
            refresh_hz: 30,
            score_threshold: 0.7,
            overlay: OverlayMode::Keypoints,
            ..Config::default()
        };
        let options = RenderOptions::from_config(&config);
        assert_eq!(options.style.mode, OverlayMode::Keypoints);
        assert_eq!(options.style.score_threshold, 0.7);
        assert!((options.refresh_interval.as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }
}
