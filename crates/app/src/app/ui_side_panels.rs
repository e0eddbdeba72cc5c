use eframe::egui;
use tracing_subscriber::filter::LevelFilter;

use super::{DeltaViewApp, SideTab};

impl DeltaViewApp {
    pub(super) fn show_side_panels(&mut self, ctx: &egui::Context) {
        if !self.panels.show_side_panel && !self.panels.show_console {
            return;
        }

        egui::SidePanel::right("side_panels")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                if self.panels.show_side_panel {
                    ui.horizontal(|ui| {
                        ui.selectable_value(
                            &mut self.panels.tab,
                            SideTab::TransferFunctions,
                            "Transfer functions",
                        );
                        ui.selectable_value(&mut self.panels.tab, SideTab::Heatmaps, "Heatmaps");
                    });
                    ui.separator();

                    let max_height = if self.panels.show_console {
                        ui.available_height() * 0.7
                    } else {
                        f32::INFINITY
                    };
                    egui::ScrollArea::vertical()
                        .id_salt("side_tab_scroll")
                        .max_height(max_height)
                        .show(ui, |ui| match self.panels.tab {
                            SideTab::TransferFunctions => self.show_transfer_tab(ui),
                            SideTab::Heatmaps => self.show_heatmaps_tab(ui),
                        });
                }

                if self.panels.show_console {
                    egui::CollapsingHeader::new("Console")
                        .default_open(true)
                        .show(ui, |ui| {
                            let current = self.log_level.get();
                            ui.horizontal(|ui| {
                                egui::ComboBox::from_label("Log level")
                                    .selected_text(format!("{:?}", current))
                                    .show_ui(ui, |ui| {
                                        for level in [
                                            LevelFilter::ERROR,
                                            LevelFilter::WARN,
                                            LevelFilter::INFO,
                                            LevelFilter::DEBUG,
                                            LevelFilter::TRACE,
                                        ] {
                                            if ui
                                                .selectable_label(
                                                    current == level,
                                                    format!("{:?}", level),
                                                )
                                                .clicked()
                                            {
                                                self.set_log_level(level);
                                            }
                                        }
                                    });
                                if ui.button("Clear").clicked() {
                                    self.console.clear();
                                }
                            });

                            let dropped = self.console.dropped();
                            if dropped > 0 {
                                ui.weak(format!("{} older lines dropped", dropped));
                            }
                            let console_lines = self.console.snapshot();
                            egui::ScrollArea::vertical()
                                .id_salt("console_scroll")
                                .stick_to_bottom(true)
                                .show(ui, |ui| {
                                    for line in console_lines {
                                        ui.label(line);
                                    }
                                });
                        });
                }
            });
    }
}
