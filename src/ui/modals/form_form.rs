use egui::{self, RichText};

use crate::db::Database;
use crate::models::Form;
use crate::ui::{
    state::AppState,
    theme::{Colors, Icons},
};
use crate::utils::{date, AppError};

/// Inmatningsfält för formulärdialogen
#[derive(Debug, Clone, Default)]
struct FormFormData {
    title: String,
    description: String,
    deadline: String,
    code: String,
}

impl FormFormData {
    fn from_form(form: &Form) -> Self {
        Self {
            title: form.title.clone(),
            description: form.description.clone().unwrap_or_default(),
            deadline: form.deadline.map(date::format_date).unwrap_or_default(),
            code: form.code.clone(),
        }
    }
}

pub struct FormFormModal {
    form_data: FormFormData,
    /// Formuläret som fälten laddats från
    loaded_id: Option<i64>,
    error_message: Option<String>,
}

impl FormFormModal {
    pub fn new() -> Self {
        Self {
            form_data: FormFormData::default(),
            loaded_id: None,
            error_message: None,
        }
    }

    /// Visar modalen och returnerar true om den ska stängas
    pub fn show(&mut self, ctx: &egui::Context, state: &mut AppState, db: &Database) -> bool {
        let mut should_close = false;

        // Ladda befintligt formulär om vi redigerar
        if let Some(form_id) = state.editing_form_id {
            if self.loaded_id != Some(form_id) {
                if let Ok(Some(form)) = db.forms().find_by_id(form_id) {
                    self.form_data = FormFormData::from_form(&form);
                    self.loaded_id = Some(form_id);
                }
            }
        }

        let editing = state.editing_form_id.is_some();
        let title = if editing { "Redigera formulär" } else { "Nytt formulär" };

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(420.0);

                egui::Grid::new("form_form_grid")
                    .num_columns(2)
                    .spacing([8.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Titel:");
                        ui.text_edit_singleline(&mut self.form_data.title);
                        ui.end_row();

                        ui.label("Beskrivning:");
                        ui.add(
                            egui::TextEdit::multiline(&mut self.form_data.description)
                                .desired_rows(3),
                        );
                        ui.end_row();

                        ui.label("Deadline:");
                        ui.horizontal(|ui| {
                            ui.add(
                                egui::TextEdit::singleline(&mut self.form_data.deadline)
                                    .desired_width(100.0),
                            );
                            ui.label(RichText::new("ÅÅÅÅ-MM-DD").small().color(Colors::TEXT_MUTED));
                        });
                        ui.end_row();

                        ui.label("Kod:");
                        if editing {
                            ui.label(RichText::new(&self.form_data.code).monospace());
                        } else {
                            ui.horizontal(|ui| {
                                ui.add(
                                    egui::TextEdit::singleline(&mut self.form_data.code)
                                        .desired_width(100.0),
                                );
                                ui.label(
                                    RichText::new("Tom = genereras")
                                        .small()
                                        .color(Colors::TEXT_MUTED),
                                );
                            });
                        }
                        ui.end_row();
                    });

                if let Some(ref error) = self.error_message {
                    ui.add_space(8.0);
                    ui.label(RichText::new(error).color(Colors::ERROR));
                }

                ui.add_space(16.0);

                ui.horizontal(|ui| {
                    if ui.button("Avbryt").clicked() {
                        self.reset();
                        should_close = true;
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button(format!("{} Spara", Icons::SAVE)).clicked() {
                            match self.save(state, db) {
                                Ok(form_id) => {
                                    self.reset();
                                    should_close = true;
                                    state.data_changed = true;
                                    state.show_success("Formulär sparat!");
                                    if !editing {
                                        state.navigate_to_form(form_id);
                                    }
                                }
                                Err(e) => {
                                    self.error_message = Some(e.to_string());
                                }
                            }
                        }
                    });
                });
            });

        should_close
    }

    fn save(&mut self, state: &AppState, db: &Database) -> anyhow::Result<i64> {
        let deadline = date::parse_optional_date(&self.form_data.deadline).map_err(AppError::Validation)?;
        let description = Some(self.form_data.description.trim().to_string()).filter(|s| !s.is_empty());

        match state.editing_form_id {
            Some(form_id) => {
                let mut form = db
                    .forms()
                    .find_by_id(form_id)?
                    .ok_or_else(|| AppError::not_found(format!("formulär {}", form_id)))?;
                form.title = self.form_data.title.clone();
                form.description = description;
                form.deadline = deadline;
                form.validate().map_err(|e| AppError::validation(e.to_string()))?;
                db.forms().update(&form)?;
                Ok(form_id)
            }
            None => {
                let org = db
                    .organizations()
                    .get_default()?
                    .ok_or_else(|| AppError::not_found("organisation"))?;
                let org_id = org.id.ok_or_else(|| AppError::other("Organisationen saknar id"))?;

                let mut form = Form::new(org_id, self.form_data.title.clone());
                form.description = description;
                form.deadline = deadline;
                form.code = self.form_data.code.clone();
                form.validate().map_err(|e| AppError::validation(e.to_string()))?;
                db.forms().create(&mut form)
            }
        }
    }

    pub fn reset(&mut self) {
        self.form_data = FormFormData::default();
        self.loaded_id = None;
        self.error_message = None;
    }
}

impl Default for FormFormModal {
    fn default() -> Self {
        Self::new()
    }
}
