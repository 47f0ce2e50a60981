use egui::{self, RichText};

use crate::db::Database;
use crate::models::{Question, QuestionOption, QuestionType};
use crate::ui::{
    state::AppState,
    theme::{Colors, Icons},
};
use crate::utils::AppError;

pub struct QuestionFormModal {
    prompt: String,
    description: String,
    question_type: QuestionType,
    /// (befintligt id, etikett)
    options: Vec<(Option<i64>, String)>,
    loaded_id: Option<i64>,
    error_message: Option<String>,
}

impl QuestionFormModal {
    pub fn new() -> Self {
        Self {
            prompt: String::new(),
            description: String::new(),
            question_type: QuestionType::default(),
            options: Vec::new(),
            loaded_id: None,
            error_message: None,
        }
    }

    /// Visar modalen och returnerar true om den ska stängas
    pub fn show(&mut self, ctx: &egui::Context, state: &mut AppState, db: &Database) -> bool {
        let mut should_close = false;

        if let Some(question_id) = state.editing_question_id {
            if self.loaded_id != Some(question_id) {
                if let Ok(Some(question)) = db.forms().find_question(question_id) {
                    self.load(&question);
                }
            }
        }

        let editing = state.editing_question_id.is_some();
        let title = if editing { "Redigera fråga" } else { "Ny fråga" };

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(440.0);

                egui::Grid::new("question_form_grid")
                    .num_columns(2)
                    .spacing([8.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Typ:");
                        // Typen kan inte ändras efter att frågan skapats
                        ui.add_enabled_ui(!editing, |ui| {
                            egui::ComboBox::from_id_salt("question_type")
                                .selected_text(self.question_type.display_name())
                                .show_ui(ui, |ui| {
                                    for t in QuestionType::all() {
                                        ui.selectable_value(&mut self.question_type, *t, t.display_name());
                                    }
                                });
                        });
                        ui.end_row();

                        let prompt_label = if self.question_type == QuestionType::SectionHeader {
                            "Rubrik:"
                        } else {
                            "Fråga:"
                        };
                        ui.label(prompt_label);
                        ui.text_edit_singleline(&mut self.prompt);
                        ui.end_row();

                        ui.label("Beskrivning:");
                        ui.add(egui::TextEdit::multiline(&mut self.description).desired_rows(2));
                        ui.end_row();
                    });

                if self.question_type.has_options() {
                    ui.add_space(8.0);
                    ui.label(RichText::new("Svarsalternativ").strong());
                    self.show_options(ui);
                }

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
                                Ok(()) => {
                                    self.reset();
                                    should_close = true;
                                    state.data_changed = true;
                                    state.show_success("Fråga sparad!");
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

    fn show_options(&mut self, ui: &mut egui::Ui) {
        let mut remove = None;
        let mut move_up = None;

        for (i, (_, label)) in self.options.iter_mut().enumerate() {
            ui.horizontal(|ui| {
                ui.label(format!("{}.", i + 1));
                ui.add(egui::TextEdit::singleline(label).desired_width(280.0));
                if i > 0 && ui.small_button("⬆").on_hover_text("Flytta upp").clicked() {
                    move_up = Some(i);
                }
                if ui.small_button(Icons::DELETE).on_hover_text("Ta bort").clicked() {
                    remove = Some(i);
                }
            });
        }

        if let Some(i) = move_up {
            self.options.swap(i - 1, i);
        }
        if let Some(i) = remove {
            self.options.remove(i);
        }

        if ui.button(format!("{} Lägg till alternativ", Icons::ADD)).clicked() {
            self.options.push((None, String::new()));
        }
    }

    fn load(&mut self, question: &Question) {
        self.prompt = question.prompt.clone();
        self.description = question.description.clone().unwrap_or_default();
        self.question_type = question.question_type;
        self.options = question
            .options
            .iter()
            .map(|o| (o.id, o.label.clone()))
            .collect();
        self.loaded_id = question.id;
    }

    fn build_options(&self) -> Vec<QuestionOption> {
        if !self.question_type.has_options() {
            return Vec::new();
        }
        self.options
            .iter()
            .enumerate()
            .map(|(i, (id, label))| QuestionOption {
                id: *id,
                question_id: 0,
                label: label.trim().to_string(),
                index: i as i32,
            })
            .collect()
    }

    fn save(&mut self, state: &AppState, db: &Database) -> anyhow::Result<()> {
        let description = Some(self.description.trim().to_string()).filter(|s| !s.is_empty());

        match state.editing_question_id {
            Some(question_id) => {
                let mut question = db
                    .forms()
                    .find_question(question_id)?
                    .ok_or_else(|| AppError::not_found(format!("fråga {}", question_id)))?;
                question.prompt = self.prompt.clone();
                question.description = description;
                question.options = self.build_options();
                db.forms().update_question(&mut question)
            }
            None => {
                let form_id = state
                    .selected_form_id
                    .ok_or_else(|| AppError::validation("Inget formulär valt"))?;
                let mut question = Question::new(form_id, self.prompt.clone(), self.question_type);
                question.description = description;
                question.options = self.build_options();
                db.forms().add_question(&mut question)?;
                Ok(())
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for QuestionFormModal {
    fn default() -> Self {
        Self::new()
    }
}
