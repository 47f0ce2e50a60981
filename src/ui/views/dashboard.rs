use egui::{self, Color32, RichText};

use crate::db::Database;
use crate::models::Form;
use crate::ui::{state::AppState, theme::{Colors, Icons}, View};
use crate::utils::date;

pub struct DashboardView {
    // Cachad statistik
    form_count: i64,
    submission_count: i64,
    tree_count: i64,
    current_forms: Vec<(Form, i64)>,
    organization_name: String,
    needs_refresh: bool,
}

impl DashboardView {
    pub fn new() -> Self {
        Self {
            form_count: 0,
            submission_count: 0,
            tree_count: 0,
            current_forms: Vec::new(),
            organization_name: String::new(),
            needs_refresh: true,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database) {
        if self.needs_refresh {
            self.refresh_stats(db);
            self.needs_refresh = false;
        }

        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                ui.heading(format!("{} Dashboard", Icons::DASHBOARD));
                if !self.organization_name.is_empty() {
                    ui.label(RichText::new(&self.organization_name).color(Colors::TEXT_SECONDARY));
                }
            });

            ui.add_space(16.0);

            // Statistikkort
            ui.horizontal(|ui| {
                self.stat_card(ui, Icons::FORM, "Formulär", &self.form_count.to_string(), Colors::PRIMARY);
                ui.add_space(8.0);
                self.stat_card(ui, Icons::PEOPLE, "Inskickade svar", &self.submission_count.to_string(), Colors::SUCCESS);
                ui.add_space(8.0);
                self.stat_card(ui, Icons::TREE, "Fadderträd", &self.tree_count.to_string(), Colors::INFO);
            });

            ui.add_space(24.0);

            ui.heading("Snabbåtgärder");
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                if ui.button(format!("{} Nytt formulär", Icons::ADD)).clicked() {
                    state.open_new_form();
                }

                if ui.button(format!("{} Alla formulär", Icons::FORM)).clicked() {
                    state.navigate(View::FormList);
                }

                if ui.button(format!("{} Fadderträd", Icons::TREE)).clicked() {
                    state.navigate(View::TreeList);
                }

                if ui.button(format!("{} Fyll i enkät", Icons::QUESTIONNAIRE)).clicked() {
                    state.questionnaire_code = None;
                    state.navigate(View::Questionnaire);
                }

                if ui.button(format!("{} Inställningar", Icons::SETTINGS)).clicked() {
                    state.navigate(View::Settings);
                }
            });

            ui.add_space(24.0);

            ui.heading("Aktuella formulär");
            ui.add_space(8.0);
            self.show_current_forms(ui, state);
        });
    }

    fn stat_card(&self, ui: &mut egui::Ui, icon: &str, label: &str, value: &str, color: Color32) {
        egui::Frame::none()
            .fill(ui.visuals().extreme_bg_color)
            .rounding(8.0)
            .inner_margin(16.0)
            .show(ui, |ui| {
                ui.set_min_width(150.0);
                ui.vertical(|ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(icon).size(24.0));
                        ui.label(RichText::new(label).color(Colors::TEXT_SECONDARY));
                    });
                    ui.add_space(8.0);
                    ui.label(RichText::new(value).size(28.0).strong().color(color));
                });
            });
    }

    fn show_current_forms(&self, ui: &mut egui::Ui, state: &mut AppState) {
        if self.current_forms.is_empty() {
            ui.label(
                RichText::new("Inga aktuella formulär. Skapa ditt första formulär!")
                    .color(Colors::TEXT_SECONDARY),
            );
            return;
        }

        let today = date::today();
        for (form, responses) in &self.current_forms {
            ui.horizontal(|ui| {
                ui.label(Icons::FORM);
                if ui.link(&form.title).clicked() {
                    if let Some(id) = form.id {
                        state.navigate_to_form(id);
                    }
                }
                ui.label(RichText::new(format!("{} svar", responses)).small().color(Colors::TEXT_MUTED));
                if let Some(deadline) = form.deadline {
                    ui.label(
                        RichText::new(format!("{} {}", Icons::CALENDAR, date::deadline_display(deadline, today)))
                            .small()
                            .color(Colors::TEXT_MUTED),
                    );
                }
            });
        }
    }

    fn refresh_stats(&mut self, db: &Database) {
        self.form_count = db.forms().count().unwrap_or(0);
        self.submission_count = db.submissions().count().unwrap_or(0);
        self.tree_count = db.trees().count().unwrap_or(0);
        self.organization_name = db
            .organizations()
            .get_default()
            .ok()
            .flatten()
            .map(|o| o.name)
            .unwrap_or_default();

        let forms = db.forms().find_current(date::today()).unwrap_or_default();
        self.current_forms = forms
            .into_iter()
            .take(8)
            .map(|form| {
                let responses = form
                    .id
                    .and_then(|id| db.submissions().count_by_form(id).ok())
                    .unwrap_or(0);
                (form, responses)
            })
            .collect();
    }

    pub fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::new()
    }
}
