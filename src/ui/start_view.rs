use super::{
    ActiveTheme, AnyElement, AppView, Button, ButtonVariants, Context, IntoElement, ParentElement,
    SharedString, Styled, StyledExt, div, overlay_label, px, v_flex,
};

impl AppView {
    pub(super) fn render_start_view(&self, cx: &mut Context<'_, Self>) -> AnyElement {
        let start_button = Button::new(SharedString::from("start-button"))
            .primary()
            .label("▶ Start")
            .w_full()
            .mt_2()
            .on_click(cx.listener(|this, _, _, cx| {
                this.start_session();
                cx.notify();
            }));

        let theme = cx.theme();
        let container = v_flex()
            .gap_2()
            .p_6()
            .w(px(360.0))
            .rounded_lg()
            .border_1()
            .border_color(theme.border)
            .bg(theme.group_box)
            .child(
                div()
                    .text_color(theme.foreground)
                    .font_semibold()
                    .child("Pose Cam"),
            )
            .child(
                div()
                    .text_sm()
                    .text_color(theme.muted_foreground)
                    .child(format!("Camera: {}", self.camera_label)),
            )
            .child(
                div()
                    .text_sm()
                    .text_color(theme.muted_foreground)
                    .child(format!("Overlay: {}", overlay_label(self.config.overlay))),
            )
            .child(start_button);

        v_flex()
            .size_full()
            .items_center()
            .justify_center()
            .bg(theme.background)
            .child(container)
            .into_any_element()
    }
}
