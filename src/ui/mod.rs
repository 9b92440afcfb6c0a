use std::{
    mem,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, unbounded};
use gpui::{
    AnyElement, App, AppContext, Context, IntoElement, ObjectFit, ParentElement, Render,
    RenderImage, SharedString, Styled, StyledImage, TitlebarOptions, Window, WindowOptions, div,
    img, px,
};
use gpui_component::{
    ActiveTheme, Root, StyledExt,
    button::{Button, ButtonVariants},
    h_flex,
    tag::Tag,
    v_flex,
};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use pose_cam::{
    CaptureMetadata, Config, Frame, PoseError,
    model_download::DownloadEvent,
    pipeline::{OverlayMode, PoseSession, StartupEvent},
};

mod loading_view;
mod main_view;
mod render_util;
mod start_view;

/// No new surface for this long and the running view reports a stall.
const STALL_AFTER: Duration = Duration::from_secs(1);

pub fn launch_ui(app: &mut App, config: Config) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Pose Cam".into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| AppView::new(config));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    screen: Screen,
    config: Config,
    camera_label: String,
    startup_rx: Option<Receiver<StartupMessage>>,
    _startup_handle: Option<thread::JoinHandle<()>>,
    surface_rx: Receiver<Frame>,
    surface_tx: Sender<Frame>,
    session: Option<PoseSession>,
    metadata: Option<CaptureMetadata>,
    latest_image: Option<Arc<RenderImage>>,
    last_surface_at: Option<Instant>,
}

enum Screen {
    Start,
    Loading(LoadingState),
    Running,
    Failed(FailureState),
}

struct LoadingState {
    message: String,
    downloaded: u64,
    total: Option<u64>,
    downloading: bool,
}

impl LoadingState {
    fn new() -> Self {
        Self {
            message: "Starting...".to_string(),
            downloaded: 0,
            total: None,
            downloading: false,
        }
    }
}

struct FailureState {
    stage: &'static str,
    message: String,
}

enum StartupMessage {
    Stage(StartupEvent),
    Download(DownloadEvent),
    Started(PoseSession),
    Failed(PoseError),
}

impl AppView {
    fn new(config: Config) -> Self {
        let (surface_tx, surface_rx) = bounded(1);
        let camera_label = camera_label(config.camera_index);

        Self {
            screen: Screen::Start,
            config,
            camera_label,
            startup_rx: None,
            _startup_handle: None,
            surface_rx,
            surface_tx,
            session: None,
            metadata: None,
            latest_image: None,
            last_surface_at: None,
        }
    }

    /// Runs once: the start control is gone after the first click.
    fn start_session(&mut self) {
        if !matches!(self.screen, Screen::Start) {
            return;
        }

        let (tx, rx) = unbounded();
        self.startup_rx = Some(rx);
        self._startup_handle = Some(loading_view::spawn_startup(
            self.config.clone(),
            self.surface_tx.clone(),
            tx,
        ));
        self.screen = Screen::Loading(LoadingState::new());
    }

    fn poll_startup(&mut self) {
        let Some(rx) = self.startup_rx.take() else {
            return;
        };

        loop {
            match rx.try_recv() {
                Ok(StartupMessage::Stage(event)) => {
                    if let StartupEvent::CameraReady(metadata) = &event {
                        self.metadata = Some(*metadata);
                    }
                    if let Screen::Loading(state) = &mut self.screen {
                        state.message = loading_view::stage_message(&event);
                    }
                }
                Ok(StartupMessage::Download(event)) => {
                    if let Screen::Loading(state) = &mut self.screen {
                        loading_view::apply_download_event(state, event);
                    }
                }
                Ok(StartupMessage::Started(session)) => {
                    self.session = Some(session);
                    self.screen = Screen::Running;
                    return;
                }
                Ok(StartupMessage::Failed(err)) => {
                    log::error!("startup failed: {err}");
                    self.screen = Screen::Failed(FailureState {
                        stage: err.stage(),
                        message: err.to_string(),
                    });
                    return;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.screen = Screen::Failed(FailureState {
                        stage: "startup",
                        message: "startup thread exited unexpectedly".to_string(),
                    });
                    return;
                }
            }
        }

        self.startup_rx = Some(rx);
    }
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        self.poll_startup();

        let screen = mem::replace(&mut self.screen, Screen::Start);
        let view = match &screen {
            Screen::Start => self.render_start_view(cx),
            Screen::Loading(state) => self.render_loading_view(state, cx),
            Screen::Running => self.render_main(window, cx),
            Screen::Failed(state) => self.render_failure_view(state, cx),
        };
        self.screen = screen;
        view
    }
}

fn overlay_label(mode: OverlayMode) -> &'static str {
    match mode {
        OverlayMode::Keypoints => "keypoints",
        OverlayMode::Skeleton => "skeleton",
    }
}

#[cfg(feature = "camera-nokhwa")]
fn camera_label(index: u32) -> String {
    match pose_cam::pipeline::camera::available_cameras() {
        Ok(cameras) => cameras
            .get(index as usize)
            .map(|device| device.label.clone())
            .unwrap_or_else(|| format!("camera {index} (not found)")),
        Err(err) => {
            log::warn!("failed to enumerate cameras: {err:?}");
            format!("camera {index}")
        }
    }
}

#[cfg(not(feature = "camera-nokhwa"))]
fn camera_label(index: u32) -> String {
    format!("camera {index} (camera support disabled)")
}
