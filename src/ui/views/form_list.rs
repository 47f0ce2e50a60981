use egui::{self, RichText};

use crate::db::Database;
use crate::models::Form;
use crate::ui::{
    state::{AppState, ConfirmAction, FormTab},
    theme::{Colors, Icons},
};
use crate::utils::date;

pub struct FormListView {
    /// Cache: formulär med antal svar och om de har ett träd
    forms_cache: Vec<FormRow>,
    cached_tab: FormTab,
    needs_refresh: bool,
}

struct FormRow {
    form: Form,
    responses: i64,
    has_tree: bool,
}

impl FormListView {
    pub fn new() -> Self {
        Self {
            forms_cache: Vec::new(),
            cached_tab: FormTab::Current,
            needs_refresh: true,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database) {
        if self.needs_refresh || self.cached_tab != state.form_tab {
            self.refresh(state.form_tab, db);
            self.needs_refresh = false;
        }

        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                ui.heading(format!("{} Formulär", Icons::FORM));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button(format!("{} Nytt formulär", Icons::ADD)).clicked() {
                        state.open_new_form();
                    }
                });
            });

            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.selectable_value(&mut state.form_tab, FormTab::Current, "Aktuella");
                ui.selectable_value(&mut state.form_tab, FormTab::Past, "Avslutade");
            });

            ui.separator();

            if self.forms_cache.is_empty() {
                ui.add_space(16.0);
                let text = match state.form_tab {
                    FormTab::Current => "Inga aktuella formulär",
                    FormTab::Past => "Inga avslutade formulär",
                };
                ui.label(RichText::new(text).color(Colors::TEXT_SECONDARY));
                return;
            }

            let today = date::today();

            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Grid::new("form_list_grid")
                    .num_columns(5)
                    .striped(true)
                    .spacing([16.0, 8.0])
                    .show(ui, |ui| {
                        ui.label(RichText::new("Titel").strong());
                        ui.label(RichText::new("Kod").strong());
                        ui.label(RichText::new("Deadline").strong());
                        ui.label(RichText::new("Svar").strong());
                        ui.label("");
                        ui.end_row();

                        for row in &self.forms_cache {
                            let Some(form_id) = row.form.id else {
                                continue;
                            };

                            ui.horizontal(|ui| {
                                if ui.link(&row.form.title).clicked() {
                                    state.navigate_to_form(form_id);
                                }
                                if row.has_tree {
                                    ui.label(Icons::TREE).on_hover_text("Har fadderträd");
                                }
                            });
                            ui.label(RichText::new(&row.form.code).monospace());
                            match row.form.deadline {
                                Some(deadline) => ui.label(date::deadline_display(deadline, today)),
                                None => ui.label(RichText::new("Ingen").color(Colors::TEXT_MUTED)),
                            };
                            ui.label(row.responses.to_string());

                            ui.horizontal(|ui| {
                                if ui.small_button(Icons::QUESTIONNAIRE).on_hover_text("Fyll i").clicked() {
                                    state.open_questionnaire(&row.form.code);
                                }
                                if ui.small_button(Icons::EDIT).on_hover_text("Redigera").clicked() {
                                    state.open_edit_form(form_id);
                                }
                                if ui.small_button(Icons::DELETE).on_hover_text("Radera").clicked() {
                                    state.show_confirm(
                                        &format!(
                                            "Radera '{}'? Frågor, svar och fadderträd raderas också.",
                                            row.form.title
                                        ),
                                        ConfirmAction::DeleteForm(form_id),
                                    );
                                }
                            });
                            ui.end_row();
                        }
                    });
            });
        });
    }

    fn refresh(&mut self, tab: FormTab, db: &Database) {
        let today = date::today();
        let forms = match tab {
            FormTab::Current => db.forms().find_current(today),
            FormTab::Past => db.forms().find_past(today),
        }
        .unwrap_or_default();

        self.forms_cache = forms
            .into_iter()
            .map(|form| {
                let id = form.id.unwrap_or_default();
                FormRow {
                    responses: db.submissions().count_by_form(id).unwrap_or(0),
                    has_tree: matches!(db.trees().find_by_form(id), Ok(Some(_))),
                    form,
                }
            })
            .collect();
        self.cached_tab = tab;
    }

    pub fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }
}

impl Default for FormListView {
    fn default() -> Self {
        Self::new()
    }
}
