use egui::{self, RichText};

use crate::db::Database;
use crate::models::{default_shortcuts, AppSettings, ShortcutAction, ShortcutMap};
use crate::ui::{
    shortcuts::{capture_shortcut, conflicts},
    state::AppState,
    theme::{Colors, Icons},
};
use crate::utils::path::{display_path, get_database_path, get_settings_path};

pub struct SettingsView {
    organization_name: String,
    operator_name: String,
    canvas_width: f32,
    canvas_height: f32,
    shortcuts: ShortcutMap,
    /// Åtgärd som väntar på en ny tangentkombination
    capturing: Option<ShortcutAction>,
    needs_refresh: bool,
    status_message: Option<String>,
}

impl SettingsView {
    pub fn new() -> Self {
        Self {
            organization_name: String::new(),
            operator_name: String::new(),
            canvas_width: 1200.0,
            canvas_height: 800.0,
            shortcuts: default_shortcuts(),
            capturing: None,
            needs_refresh: true,
            status_message: None,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database, settings: &mut AppSettings) {
        if self.needs_refresh {
            self.refresh(db, settings);
            self.needs_refresh = false;
        }

        if let Some(action) = self.capturing {
            if let Some(shortcut) = capture_shortcut(ui.ctx()) {
                self.shortcuts.insert(action, shortcut);
                self.capturing = None;
            }
        }
        state.capturing_shortcut = self.capturing.is_some();

        let available_width = ui.available_width();
        let section_width = available_width * 0.8;
        let margin = (available_width - section_width) / 2.0;

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.heading(format!("{} Inställningar", Icons::SETTINGS));
            ui.add_space(16.0);

            ui.horizontal(|ui| {
                ui.add_space(margin);
                ui.vertical(|ui| {
                    ui.set_width(section_width);

                    Self::section(ui, "Utseende", |ui| {
                        ui.horizontal(|ui| {
                            ui.label("Mörkt läge:");
                            ui.checkbox(&mut state.dark_mode, "");
                        });
                    });

                    ui.add_space(16.0);

                    Self::section(ui, "Organisation", |ui| {
                        egui::Grid::new("org_settings_grid")
                            .num_columns(2)
                            .spacing([8.0, 8.0])
                            .show(ui, |ui| {
                                ui.label("Namn:");
                                ui.text_edit_singleline(&mut self.organization_name);
                                ui.end_row();

                                ui.label("Ditt namn:");
                                ui.text_edit_singleline(&mut self.operator_name)
                                    .on_hover_text("Registreras som skapare av nya fadderträd");
                                ui.end_row();
                            });
                    });

                    ui.add_space(16.0);

                    Self::section(ui, "Ritytan", |ui| {
                        ui.horizontal(|ui| {
                            ui.label("Bredd:");
                            ui.add(egui::DragValue::new(&mut self.canvas_width).range(400.0..=5000.0).speed(10.0));
                            ui.label("Höjd:");
                            ui.add(egui::DragValue::new(&mut self.canvas_height).range(300.0..=5000.0).speed(10.0));
                        });
                        ui.label(
                            RichText::new("Autolayout fördelar noderna över ritytans bredd.")
                                .small()
                                .color(Colors::TEXT_MUTED),
                        );
                    });

                    ui.add_space(16.0);

                    Self::section(ui, "Kortkommandon", |ui| {
                        self.show_shortcuts(ui);
                    });

                    ui.add_space(16.0);

                    Self::section(ui, "Lagring", |ui| {
                        ui.label(format!("Databas: {}", display_path(&get_database_path())));
                        ui.label(format!("Inställningar: {}", display_path(&get_settings_path())));
                    });

                    ui.add_space(16.0);

                    ui.horizontal(|ui| {
                        if ui.button(format!("{} Spara", Icons::SAVE)).clicked() {
                            self.save(state, db, settings);
                        }
                        if let Some(ref msg) = self.status_message {
                            ui.label(RichText::new(msg).color(Colors::SUCCESS));
                        }
                    });
                });
            });
        });
    }

    fn section(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
        egui::Frame::none()
            .fill(ui.visuals().extreme_bg_color)
            .rounding(8.0)
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.label(RichText::new(title).strong());
                ui.add_space(8.0);
                add_contents(ui);
            });
    }

    fn show_shortcuts(&mut self, ui: &mut egui::Ui) {
        let clashes = conflicts(&self.shortcuts);

        egui::Grid::new("shortcut_grid")
            .num_columns(2)
            .spacing([16.0, 6.0])
            .show(ui, |ui| {
                for action in ShortcutAction::ALL {
                    ui.label(action.label());

                    let text = if self.capturing == Some(*action) {
                        RichText::new("Tryck en tangent...").color(Colors::WARNING)
                    } else {
                        let display = self
                            .shortcuts
                            .get(action)
                            .map(|s| s.display())
                            .unwrap_or_else(|| "–".to_string());
                        let clash = clashes.iter().any(|(a, b)| a == action || b == action);
                        if clash {
                            RichText::new(display).monospace().color(Colors::ERROR)
                        } else {
                            RichText::new(display).monospace()
                        }
                    };

                    if ui.button(text).on_hover_text("Klicka för att ändra").clicked() {
                        self.capturing = Some(*action);
                    }
                    ui.end_row();
                }
            });

        if !clashes.is_empty() {
            ui.add_space(4.0);
            for (a, b) in &clashes {
                ui.label(
                    RichText::new(format!("{} och {} har samma kortkommando", a.label(), b.label()))
                        .small()
                        .color(Colors::ERROR),
                );
            }
        }

        if ui.small_button("Återställ standard").clicked() {
            self.shortcuts = default_shortcuts();
            self.capturing = None;
        }
    }

    fn refresh(&mut self, db: &Database, settings: &AppSettings) {
        self.organization_name = db
            .organizations()
            .get_default()
            .ok()
            .flatten()
            .map(|o| o.name)
            .unwrap_or_default();
        self.operator_name = settings.operator_name.clone();
        self.canvas_width = settings.canvas_width;
        self.canvas_height = settings.canvas_height;
        self.shortcuts = settings.shortcuts.clone();
        self.capturing = None;
    }

    fn save(&mut self, state: &mut AppState, db: &Database, settings: &mut AppSettings) {
        if !conflicts(&self.shortcuts).is_empty() {
            state.show_error("Två åtgärder har samma kortkommando");
            return;
        }

        if let Ok(Some(org)) = db.organizations().get_default() {
            let name = self.organization_name.trim();
            if let Some(id) = org.id.filter(|_| !name.is_empty() && name != org.name) {
                if let Err(e) = db.organizations().rename(id, name) {
                    state.show_error(&format!("Kunde inte byta namn: {}", e));
                    return;
                }
            }
        }

        settings.dark_mode = state.dark_mode;
        settings.operator_name = self.operator_name.trim().to_string();
        settings.canvas_width = self.canvas_width;
        settings.canvas_height = self.canvas_height;
        settings.shortcuts = self.shortcuts.clone();

        match settings.save() {
            Ok(()) => {
                state.shortcuts_to_apply = Some(self.shortcuts.clone());
                state.data_changed = true;
                self.status_message = Some("Inställningar sparade".to_string());
            }
            Err(e) => state.show_error(&format!("Kunde inte spara inställningar: {}", e)),
        }
    }

    pub fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }
}

impl Default for SettingsView {
    fn default() -> Self {
        Self::new()
    }
}
