use eframe::egui;

use super::DeltaViewApp;

impl eframe::App for DeltaViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_precompute();
        if !ctx.wants_keyboard_input() {
            if ctx.input(|i| i.key_pressed(egui::Key::R)) {
                if let Some(workspace) = self.workspace.as_mut() {
                    workspace.reset_view();
                }
            }
            if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
                self.scatter_gesture.reset();
            }
        }

        self.show_top_bar(ctx);
        self.show_side_panels(ctx);
        self.show_central(ctx);

        let was_dirty = self
            .workspace
            .as_ref()
            .is_some_and(|workspace| workspace.is_dirty());
        self.refresh_textures(ctx);
        if was_dirty || self.is_precomputing() {
            ctx.request_repaint();
        }
    }
}
