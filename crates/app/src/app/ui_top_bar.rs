use eframe::egui;

use super::DeltaViewApp;

impl DeltaViewApp {
    pub(super) fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open data folder...").clicked() {
                        self.open_data_folder_dialog(ctx);
                        ui.close();
                    }
                    if ui.button("Reload").clicked() {
                        self.load_workspace(ctx);
                        ui.close();
                    }
                    if ui.button("Open reference image...").clicked() {
                        self.open_reference_dialog(ctx);
                        ui.close();
                    }

                    ui.separator();
                    if ui.button("Open settings...").clicked() {
                        self.open_config_dialog(ctx);
                        ui.close();
                    }
                    if ui.button("Save settings...").clicked() {
                        self.save_config_dialog();
                        ui.close();
                    }
                });

                ui.menu_button("Statistics", |ui| {
                    let loaded = self.workspace.is_some();
                    let busy = self.is_precomputing();
                    if ui
                        .add_enabled(loaded && !busy, egui::Button::new("Precompute"))
                        .clicked()
                    {
                        self.start_precompute(ctx);
                        ui.close();
                    }
                    if ui
                        .add_enabled(busy, egui::Button::new("Cancel precompute"))
                        .clicked()
                    {
                        self.cancel_precompute();
                        ui.close();
                    }
                });

                ui.separator();
                ui.label("DeltaView");
                if let Some(workspace) = &self.workspace {
                    ui.weak(workspace.name());
                }
                ui.separator();
                ui.checkbox(&mut self.panels.show_side_panel, "Side panel");
                ui.checkbox(&mut self.panels.show_console, "Console");

                if let Some(progress) = self.precompute_progress() {
                    ui.separator();
                    ui.add(
                        egui::ProgressBar::new(progress)
                            .desired_width(160.0)
                            .show_percentage(),
                    );
                }
            });
        });
    }
}
