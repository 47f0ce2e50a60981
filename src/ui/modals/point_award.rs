use egui::{self, RichText};

use crate::db::Database;
use crate::models::Challenge;
use crate::services::ScoringService;
use crate::ui::{
    state::AppState,
    theme::{Colors, Icons},
};
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AwardMode {
    Challenge,
    Manual,
}

/// Dela ut poäng till ett big/little-par
pub struct PointAwardModal {
    mode: AwardMode,
    challenge_id: Option<i64>,
    manual_prompt: String,
    manual_points: String,
    challenges: Vec<Challenge>,
    pair_label: String,
    loaded_connection: Option<i64>,
    error_message: Option<String>,
}

impl PointAwardModal {
    pub fn new() -> Self {
        Self {
            mode: AwardMode::Challenge,
            challenge_id: None,
            manual_prompt: String::new(),
            manual_points: String::new(),
            challenges: Vec::new(),
            pair_label: String::new(),
            loaded_connection: None,
            error_message: None,
        }
    }

    /// Visar modalen och returnerar true om den ska stängas
    pub fn show(&mut self, ctx: &egui::Context, state: &mut AppState, db: &Database) -> bool {
        let mut should_close = false;

        if state.award_connection_id != self.loaded_connection {
            self.load(state, db);
        }

        egui::Window::new("Dela ut poäng")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(400.0);

                ui.label(RichText::new(&self.pair_label).strong());
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.mode, AwardMode::Challenge, format!("{} Utmaning", Icons::CHALLENGE));
                    ui.radio_value(&mut self.mode, AwardMode::Manual, format!("{} Manuellt", Icons::EDIT));
                });

                ui.add_space(8.0);

                egui::Grid::new("point_award_grid")
                    .num_columns(2)
                    .spacing([8.0, 8.0])
                    .show(ui, |ui| match self.mode {
                        AwardMode::Challenge => {
                            ui.label("Utmaning:");
                            let selected = self
                                .challenges
                                .iter()
                                .find(|c| c.id == self.challenge_id)
                                .map(|c| format!("{} ({})", c.prompt, c.points_display()))
                                .unwrap_or_else(|| "Välj utmaning...".to_string());
                            egui::ComboBox::from_id_salt("award_challenge")
                                .selected_text(selected)
                                .width(260.0)
                                .show_ui(ui, |ui| {
                                    for c in &self.challenges {
                                        ui.selectable_value(
                                            &mut self.challenge_id,
                                            c.id,
                                            format!("{} ({})", c.prompt, c.points_display()),
                                        );
                                    }
                                });
                            ui.end_row();
                        }
                        AwardMode::Manual => {
                            ui.label("Beskrivning:");
                            ui.text_edit_singleline(&mut self.manual_prompt);
                            ui.end_row();

                            ui.label("Poäng:");
                            ui.add(egui::TextEdit::singleline(&mut self.manual_points).desired_width(60.0));
                            ui.end_row();
                        }
                    });

                if self.mode == AwardMode::Challenge && self.challenges.is_empty() {
                    ui.label(RichText::new("Trädet har inga utmaningar ännu").color(Colors::TEXT_MUTED));
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
                        if ui.button(format!("{} Dela ut", Icons::POINTS)).clicked() {
                            match self.save(state, db) {
                                Ok(points) => {
                                    self.reset();
                                    should_close = true;
                                    state.data_changed = true;
                                    state.show_success(&format!("{} poäng utdelade", points));
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

    fn load(&mut self, state: &AppState, db: &Database) {
        self.loaded_connection = state.award_connection_id;
        self.challenges.clear();
        self.pair_label.clear();

        let Some(connection_id) = state.award_connection_id else {
            return;
        };
        let Some(tree_id) = state.selected_tree_id else {
            return;
        };

        if let Ok(views) = db.connections().find_views_by_tree(tree_id) {
            if let Some(view) = views.iter().find(|v| v.connection_id == connection_id) {
                self.pair_label = view.pair_label();
            }
        }
        if let Ok(challenges) = db.challenges().find_by_tree(tree_id) {
            self.challenges = challenges;
        }
    }

    fn save(&mut self, state: &AppState, db: &Database) -> anyhow::Result<i64> {
        let connection_id = state
            .award_connection_id
            .ok_or_else(|| AppError::validation("Inget par valt"))?;
        let scoring = ScoringService::new(db);

        let submission = match self.mode {
            AwardMode::Challenge => {
                let challenge_id = self
                    .challenge_id
                    .ok_or_else(|| AppError::validation("Välj en utmaning"))?;
                scoring.award_challenge(connection_id, challenge_id)?
            }
            AwardMode::Manual => {
                let points = self.manual_points.trim().parse::<i64>().map_err(|_| {
                    AppError::validation(format!("Ogiltigt poängvärde: {}", self.manual_points.trim()))
                })?;
                scoring.award_manual(connection_id, &self.manual_prompt, points)?
            }
        };
        Ok(submission.point)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for PointAwardModal {
    fn default() -> Self {
        Self::new()
    }
}
