use super::{
    ActiveTheme, AnyElement, AppView, Context, DownloadEvent, FailureState, IntoElement,
    LoadingState, OverlayMode, ParentElement, PoseError, PoseSession, Sender, StartupEvent,
    StartupMessage, Styled, StyledExt, Tag, div, h_flex, thread, v_flex,
};
use pose_cam::{
    Config, Frame,
    pipeline::{Canvas, MoveNetLoader, RenderOptions},
};

impl AppView {
    pub(super) fn render_loading_view(
        &self,
        state: &LoadingState,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let theme = cx.theme();

        // The bare overlay mode starts silently on an empty surface.
        if self.config.overlay == OverlayMode::Keypoints {
            return div()
                .size_full()
                .bg(gpui::rgb(0x000000))
                .into_any_element();
        }

        let mut container = v_flex()
            .gap_3()
            .p_6()
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.group_box)
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(
                        div()
                            .text_color(theme.foreground)
                            .font_semibold()
                            .child("⟳ Loading..."),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child(self.camera_label.clone()),
                    ),
            )
            .child(
                div()
                    .text_color(theme.foreground)
                    .child(state.message.clone()),
            );

        if state.downloading {
            container = container.child(
                div()
                    .px_3()
                    .py_2()
                    .rounded_md()
                    .border_1()
                    .border_color(theme.border)
                    .bg(theme.muted)
                    .font_family(theme.mono_font_family.clone())
                    .text_color(theme.foreground)
                    .child(progress_bar_string(state.downloaded, state.total)),
            );
        }

        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .bg(theme.background)
            .child(container)
            .into_any_element()
    }

    pub(super) fn render_failure_view(
        &self,
        state: &FailureState,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        let theme = cx.theme();
        let title = match state.stage {
            "camera" => "✗ Camera unavailable",
            "model" => "✗ Pose model failed to load",
            _ => "✗ Startup failed",
        };

        let container = v_flex()
            .gap_3()
            .p_6()
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.group_box)
            .child(
                div()
                    .text_color(theme.accent)
                    .font_semibold()
                    .child(title),
            )
            .child(Tag::danger().rounded_full().child(state.message.clone()));

        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .bg(theme.background)
            .child(container)
            .into_any_element()
    }
}

pub(super) fn stage_message(event: &StartupEvent) -> String {
    match event {
        StartupEvent::CameraStarting => "Requesting camera access...".to_string(),
        StartupEvent::CameraReady(metadata) => format!(
            "Camera ready ({}x{} @ {} fps)",
            metadata.width, metadata.height, metadata.frame_rate
        ),
        StartupEvent::ModelLoading => "Loading pose model...".to_string(),
        StartupEvent::ModelReady => "Model ready, starting...".to_string(),
        StartupEvent::Running => "Running".to_string(),
    }
}

pub(super) fn apply_download_event(state: &mut LoadingState, event: DownloadEvent) {
    match event {
        DownloadEvent::AlreadyPresent => {}
        DownloadEvent::Started { total } => {
            state.downloading = true;
            state.total = total;
            state.message = "Downloading pose model...".to_string();
        }
        DownloadEvent::Progress { downloaded, total } => {
            state.downloaded = downloaded;
            state.total = total;
        }
        DownloadEvent::Finished => {
            state.downloading = false;
        }
    }
}

/// Runs the startup sequence off the UI thread and reports back over `tx`.
pub(super) fn spawn_startup(
    config: Config,
    surface_tx: Sender<Frame>,
    tx: Sender<StartupMessage>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let loader = MoveNetLoader::from_config(&config);
        let options = RenderOptions::from_config(&config);
        let download_tx = tx.clone();
        let stage_tx = tx.clone();

        let result = PoseSession::start(
            || open_camera(config.camera_index),
            || {
                loader.load_with_progress(|event| {
                    let _ = download_tx.send(StartupMessage::Download(event));
                })
            },
            options,
            move |canvas: &Canvas| {
                // Drop the surface if the window has not taken the last one.
                let _ = surface_tx.try_send(canvas.to_frame());
            },
            |event| {
                let _ = stage_tx.send(StartupMessage::Stage(event));
            },
        );

        let message = match result {
            Ok(session) => StartupMessage::Started(session),
            Err(err) => StartupMessage::Failed(err),
        };
        let _ = tx.send(message);
    })
}

#[cfg(feature = "camera-nokhwa")]
fn open_camera(index: u32) -> Result<pose_cam::pipeline::camera::CameraCapture, PoseError> {
    pose_cam::pipeline::camera::open_capture(index)
}

#[cfg(not(feature = "camera-nokhwa"))]
fn open_camera(_index: u32) -> Result<pose_cam::pipeline::ChannelSource, PoseError> {
    Err(PoseError::Capture(anyhow::anyhow!(
        "built without camera support"
    )))
}

fn progress_bar_string(downloaded: u64, total: Option<u64>) -> String {
    const BAR_LEN: usize = 30;
    match total {
        Some(total) if total > 0 => {
            let pct = (downloaded as f64 / total as f64).clamp(0.0, 1.0);
            let filled = ((pct * BAR_LEN as f64).round() as usize).min(BAR_LEN);
            format!(
                "[{}{}] {:>5.1}%",
                "=".repeat(filled),
                " ".repeat(BAR_LEN - filled),
                pct * 100.0
            )
        }
        _ => format!("[{:<BAR_LEN$}] {} KB", ">", downloaded / 1024),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bar_fills_proportionally() {
        let bar = progress_bar_string(50, Some(100));
        assert_eq!(bar.matches('=').count(), 15);
        assert!(bar.ends_with(" 50.0%"));
        assert_eq!(progress_bar_string(200, Some(100)).matches('=').count(), 30);
    }

    #[test]
    fn progress_bar_without_total_shows_bytes() {
        assert!(progress_bar_string(4096, None).ends_with("4 KB"));
    }

    #[test]
    fn download_events_toggle_progress() {
        let mut state = LoadingState::new();
        apply_download_event(&mut state, DownloadEvent::Started { total: Some(10) });
        assert!(state.downloading);
        apply_download_event(
            &mut state,
            DownloadEvent::Progress {
                downloaded: 4,
                total: Some(10),
            },
        );
        assert_eq!(state.downloaded, 4);
        apply_download_event(&mut state, DownloadEvent::Finished);
        assert!(!state.downloading);
    }
}
