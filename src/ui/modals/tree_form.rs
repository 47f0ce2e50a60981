use egui::{self, RichText};

use crate::db::Database;
use crate::models::{Question, QuestionType};
use crate::services::TreeEditorService;
use crate::ui::{
    state::AppState,
    theme::{Colors, Icons},
};
use crate::utils::AppError;

/// Skapa ett fadderträd för det valda formuläret
pub struct TreeFormModal {
    title: String,
    question_id: Option<i64>,
    /// Fritextfrågor som kan ge nodernas namn
    candidates: Vec<Question>,
    loaded_form: Option<i64>,
    error_message: Option<String>,
}

impl TreeFormModal {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            question_id: None,
            candidates: Vec::new(),
            loaded_form: None,
            error_message: None,
        }
    }

    /// Visar modalen och returnerar true om den ska stängas
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        state: &mut AppState,
        db: &Database,
        author_id: &str,
    ) -> bool {
        let mut should_close = false;

        if state.selected_form_id != self.loaded_form {
            self.load(state.selected_form_id, db);
        }

        egui::Window::new("Nytt fadderträd")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(400.0);

                egui::Grid::new("tree_form_grid")
                    .num_columns(2)
                    .spacing([8.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Titel:");
                        ui.text_edit_singleline(&mut self.title);
                        ui.end_row();

                        ui.label("Namnfråga:");
                        let selected = self
                            .candidates
                            .iter()
                            .find(|q| q.id == self.question_id)
                            .map(|q| q.prompt.clone())
                            .unwrap_or_else(|| "Välj fråga...".to_string());
                        egui::ComboBox::from_id_salt("tree_name_question")
                            .selected_text(selected)
                            .width(260.0)
                            .show_ui(ui, |ui| {
                                for q in &self.candidates {
                                    ui.selectable_value(&mut self.question_id, q.id, &q.prompt);
                                }
                            });
                        ui.end_row();
                    });

                ui.label(
                    RichText::new("Svaret på namnfrågan blir nodens namn i trädet.")
                        .small()
                        .color(Colors::TEXT_MUTED),
                );

                if self.candidates.is_empty() {
                    ui.add_space(4.0);
                    ui.label(
                        RichText::new("Formuläret saknar fritextfrågor")
                            .color(Colors::WARNING),
                    );
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
                        if ui.button(format!("{} Skapa", Icons::TREE)).clicked() {
                            match self.save(state, db, author_id) {
                                Ok(tree_id) => {
                                    self.reset();
                                    should_close = true;
                                    state.data_changed = true;
                                    state.show_success("Fadderträd skapat!");
                                    state.navigate_to_tree(tree_id);
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

    fn load(&mut self, form_id: Option<i64>, db: &Database) {
        self.loaded_form = form_id;
        self.candidates.clear();
        self.question_id = None;

        let Some(form_id) = form_id else {
            return;
        };
        if let Ok(Some(form)) = db.forms().find_by_id(form_id) {
            if self.title.is_empty() {
                self.title = form.title;
            }
        }
        if let Ok(questions) = db.forms().find_questions(form_id) {
            self.candidates = questions
                .into_iter()
                .filter(|q| q.question_type == QuestionType::FreeResponse)
                .collect();
            self.question_id = self.candidates.first().and_then(|q| q.id);
        }
    }

    fn save(&mut self, state: &AppState, db: &Database, author_id: &str) -> anyhow::Result<i64> {
        let form_id = state
            .selected_form_id
            .ok_or_else(|| AppError::validation("Inget formulär valt"))?;
        let question_id = self
            .question_id
            .ok_or_else(|| AppError::validation("Välj en namnfråga"))?;

        let tree = TreeEditorService::new(db).create_tree(form_id, question_id, &self.title, author_id)?;
        tree.id
            .ok_or_else(|| AppError::other("Trädet saknar id").into())
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for TreeFormModal {
    fn default() -> Self {
        Self::new()
    }
}
