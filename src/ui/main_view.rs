use super::render_util::frame_to_image;
use super::{
    ActiveTheme, AnyElement, AppView, Arc, Context, IntoElement, ObjectFit, ParentElement,
    RenderImage, STALL_AFTER, Styled, StyledImage, Tag, Window, div, h_flex, img, overlay_label,
    v_flex,
};
use std::time::Instant;

impl AppView {
    pub(super) fn render_main(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> AnyElement {
        // Only the newest surface is worth uploading.
        let mut newest = None;
        while let Ok(frame) = self.surface_rx.try_recv() {
            newest = Some(frame);
        }
        if let Some(frame) = newest {
            self.last_surface_at = Some(Instant::now());
            if let Some(image) = frame_to_image(&frame) {
                self.replace_latest_image(image, window, cx);
            }
        }

        let running = self
            .session
            .as_ref()
            .is_some_and(|session| session.is_running());
        let stalled = self
            .last_surface_at
            .is_none_or(|at| at.elapsed() > STALL_AFTER);

        let stream_text = self
            .metadata
            .map(|m| {
                format!(
                    "{} {}x{} @ {} fps",
                    self.camera_label, m.width, m.height, m.frame_rate
                )
            })
            .unwrap_or_else(|| self.camera_label.clone());

        let frame_view: AnyElement = if let Some(image) = &self.latest_image {
            img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element()
        } else {
            div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_sm()
                .text_color(gpui::rgb(0x8b95a5))
                .child("Waiting for the first frame...")
                .into_any_element()
        };

        let theme = cx.theme();
        let status = if running && !stalled {
            div()
                .text_xs()
                .text_color(theme.success)
                .child("● live")
                .into_any_element()
        } else if running {
            div()
                .text_xs()
                .text_color(theme.muted_foreground)
                .child("○ waiting for camera...")
                .into_any_element()
        } else {
            Tag::danger()
                .rounded_full()
                .child("render loop stopped")
                .into_any_element()
        };

        let info_row = h_flex()
            .justify_between()
            .items_center()
            .gap_2()
            .px_3()
            .py_2()
            .border_t_1()
            .border_color(theme.border)
            .bg(theme.group_box)
            .child(
                div()
                    .text_xs()
                    .text_color(theme.muted_foreground)
                    .child(stream_text),
            )
            .child(
                h_flex()
                    .gap_2()
                    .items_center()
                    .child(
                        div()
                            .text_xs()
                            .text_color(theme.muted_foreground)
                            .child(format!("overlay: {}", overlay_label(self.config.overlay))),
                    )
                    .child(status),
            );

        v_flex()
            .size_full()
            .bg(gpui::rgb(0x000000))
            .child(div().flex_1().overflow_hidden().child(frame_view))
            .child(info_row)
            .into_any_element()
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // The sprite atlas keeps every uploaded frame until it is dropped explicitly.
            cx.drop_image(old_image, Some(window));
        }
    }
}
