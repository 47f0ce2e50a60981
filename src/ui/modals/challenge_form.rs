use egui::{self, RichText};

use crate::db::Database;
use crate::models::Challenge;
use crate::services::ScoringService;
use crate::ui::{
    state::AppState,
    theme::{Colors, Icons},
};
use crate::utils::{date, AppError};

pub struct ChallengeFormModal {
    prompt: String,
    point_value: String,
    deadline: String,
    loaded_id: Option<i64>,
    error_message: Option<String>,
}

impl ChallengeFormModal {
    pub fn new() -> Self {
        Self {
            prompt: String::new(),
            point_value: String::new(),
            deadline: String::new(),
            loaded_id: None,
            error_message: None,
        }
    }

    /// Visar modalen och returnerar true om den ska stängas
    pub fn show(&mut self, ctx: &egui::Context, state: &mut AppState, db: &Database) -> bool {
        let mut should_close = false;

        if let Some(challenge_id) = state.editing_challenge_id {
            if self.loaded_id != Some(challenge_id) {
                if let Ok(Some(challenge)) = db.challenges().find_by_id(challenge_id) {
                    self.prompt = challenge.prompt.clone();
                    self.point_value = challenge.point_value.map(|p| p.to_string()).unwrap_or_default();
                    self.deadline = challenge.deadline.map(date::format_date).unwrap_or_default();
                    self.loaded_id = Some(challenge_id);
                }
            }
        }

        let title = if state.editing_challenge_id.is_some() {
            "Redigera utmaning"
        } else {
            "Ny utmaning"
        };

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(400.0);

                egui::Grid::new("challenge_form_grid")
                    .num_columns(2)
                    .spacing([8.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Utmaning:");
                        ui.add(egui::TextEdit::multiline(&mut self.prompt).desired_rows(2));
                        ui.end_row();

                        ui.label("Poäng:");
                        ui.horizontal(|ui| {
                            ui.add(egui::TextEdit::singleline(&mut self.point_value).desired_width(60.0));
                            ui.label(RichText::new("Tom = inga poäng").small().color(Colors::TEXT_MUTED));
                        });
                        ui.end_row();

                        ui.label("Deadline:");
                        ui.horizontal(|ui| {
                            ui.add(egui::TextEdit::singleline(&mut self.deadline).desired_width(100.0));
                            ui.label(RichText::new("ÅÅÅÅ-MM-DD").small().color(Colors::TEXT_MUTED));
                        });
                        ui.end_row();
                    });

                if state.editing_challenge_id.is_some() {
                    ui.label(
                        RichText::new("Redan utdelade poäng påverkas inte av ändringar.")
                            .small()
                            .color(Colors::TEXT_MUTED),
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
                        if ui.button(format!("{} Spara", Icons::SAVE)).clicked() {
                            match self.save(state, db) {
                                Ok(()) => {
                                    self.reset();
                                    should_close = true;
                                    state.data_changed = true;
                                    state.show_success("Utmaning sparad!");
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

    fn parse_points(&self) -> Result<Option<i64>, AppError> {
        let s = self.point_value.trim();
        if s.is_empty() {
            return Ok(None);
        }
        s.parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::validation(format!("Ogiltigt poängvärde: {}", s)))
    }

    fn save(&mut self, state: &AppState, db: &Database) -> anyhow::Result<()> {
        let point_value = self.parse_points()?;
        let deadline = date::parse_optional_date(&self.deadline).map_err(AppError::Validation)?;
        let scoring = ScoringService::new(db);

        match state.editing_challenge_id {
            Some(challenge_id) => {
                let challenge = db
                    .challenges()
                    .find_by_id(challenge_id)?
                    .ok_or_else(|| AppError::not_found(format!("utmaning {}", challenge_id)))?;
                scoring.update_challenge(&Challenge {
                    prompt: self.prompt.trim().to_string(),
                    point_value,
                    deadline,
                    ..challenge
                })
            }
            None => {
                let tree_id = state
                    .selected_tree_id
                    .ok_or_else(|| AppError::validation("Inget träd valt"))?;
                scoring.create_challenge(tree_id, &self.prompt, point_value, deadline)?;
                Ok(())
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for ChallengeFormModal {
    fn default() -> Self {
        Self::new()
    }
}
