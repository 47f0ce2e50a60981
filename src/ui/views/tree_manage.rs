use std::collections::HashMap;

use egui::{self, RichText};

use crate::db::Database;
use crate::models::{Challenge, ChallengeCompletion, ConnectionView, FamilyTree, PointSubmission};
use crate::services::{ExportFormat, ExportService, ReportType, ScoringService};
use crate::ui::{
    state::{AppState, ConfirmAction},
    theme::{Colors, Icons},
    View,
};
use crate::utils::date;

/// Par, utmaningar och poäng för ett träd
pub struct TreeManageView {
    tree: Option<FamilyTree>,
    leaderboard: Vec<ConnectionView>,
    challenges: Vec<(Challenge, ChallengeCompletion)>,
    ledger: Vec<PointSubmission>,
    loaded_tree_id: Option<i64>,
    needs_refresh: bool,
}

impl TreeManageView {
    pub fn new() -> Self {
        Self {
            tree: None,
            leaderboard: Vec::new(),
            challenges: Vec::new(),
            ledger: Vec::new(),
            loaded_tree_id: None,
            needs_refresh: true,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database) {
        let Some(tree_id) = state.selected_tree_id else {
            ui.label("Inget träd valt");
            return;
        };

        if self.needs_refresh || self.loaded_tree_id != Some(tree_id) {
            self.refresh(tree_id, db);
            self.needs_refresh = false;
        }

        let Some(tree) = self.tree.clone() else {
            ui.label(RichText::new("Trädet hittades inte").color(Colors::ERROR));
            if ui.button(format!("{} Tillbaka", Icons::ARROW_LEFT)).clicked() {
                state.navigate(View::TreeList);
            }
            return;
        };

        ui.horizontal(|ui| {
            if ui.button(Icons::ARROW_LEFT).on_hover_text("Tillbaka").clicked() {
                state.navigate(View::TreeList);
            }
            ui.heading(format!("{} {}", Icons::CHALLENGE, tree.title));

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(format!("{} Graf", Icons::TREE)).clicked() {
                    state.navigate_to_tree(tree_id);
                }
                if ui
                    .button(format!("{} Stäm av", Icons::REFRESH))
                    .on_hover_text("Räkna om poängsummorna från poängloggen")
                    .clicked()
                {
                    self.reconcile(tree_id, state, db);
                }
                if ui.button(format!("{} Exportera", Icons::EXPORT)).clicked() {
                    Self::export_leaderboard(&tree, state, db);
                }
            });
        });

        ui.add_space(8.0);

        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.columns(2, |columns| {
                self.show_leaderboard(&mut columns[0], state);
                self.show_challenges(&mut columns[1], state);
            });

            ui.add_space(16.0);
            ui.separator();
            self.show_ledger(ui, state);
        });
    }

    fn show_leaderboard(&self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.label(RichText::new(format!("{} Topplista", Icons::POINTS)).size(18.0).strong());
        ui.add_space(8.0);

        if self.leaderboard.is_empty() {
            ui.label(
                RichText::new("Inga par ännu. Koppla ihop medlemmar i grafen.")
                    .color(Colors::TEXT_SECONDARY),
            );
            return;
        }

        egui::Grid::new("leaderboard_grid")
            .num_columns(4)
            .striped(true)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                for (rank, pair) in self.leaderboard.iter().enumerate() {
                    ui.label(RichText::new(format!("{}.", rank + 1)).color(Colors::TEXT_MUTED));
                    ui.label(pair.pair_label());
                    ui.label(RichText::new(format!("{} p", pair.points)).strong().color(Colors::PRIMARY));
                    if ui.small_button(format!("{} Poäng", Icons::ADD)).clicked() {
                        state.open_point_award(pair.connection_id);
                    }
                    ui.end_row();
                }
            });
    }

    fn show_challenges(&self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("{} Utmaningar", Icons::CHALLENGE)).size(18.0).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(format!("{} Ny", Icons::ADD)).clicked() {
                    state.open_new_challenge();
                }
            });
        });
        ui.add_space(8.0);

        if self.challenges.is_empty() {
            ui.label(RichText::new("Inga utmaningar ännu").color(Colors::TEXT_SECONDARY));
            return;
        }

        let today = date::today();
        for (challenge, completion) in &self.challenges {
            let Some(challenge_id) = challenge.id else {
                continue;
            };

            egui::Frame::none()
                .fill(ui.visuals().extreme_bg_color)
                .rounding(6.0)
                .inner_margin(8.0)
                .show(ui, |ui| {
                    ui.set_min_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(&challenge.prompt).strong());
                        ui.label(RichText::new(challenge.points_display()).color(Colors::PRIMARY));

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button(Icons::DELETE).on_hover_text("Radera").clicked() {
                                state.show_confirm(
                                    &format!(
                                        "Radera utmaningen '{}'? Utdelade poäng finns kvar.",
                                        challenge.prompt
                                    ),
                                    ConfirmAction::DeleteChallenge(challenge_id),
                                );
                            }
                            if ui.small_button(Icons::EDIT).on_hover_text("Redigera").clicked() {
                                state.open_edit_challenge(challenge_id);
                            }
                        });
                    });

                    if let Some(deadline) = challenge.deadline {
                        ui.label(
                            RichText::new(format!("{} {}", Icons::CALENDAR, date::deadline_display(deadline, today)))
                                .small()
                                .color(Colors::TEXT_MUTED),
                        );
                    }

                    let fraction = completion.percentage() as f32 / 100.0;
                    ui.add(
                        egui::ProgressBar::new(fraction)
                            .desired_width(ui.available_width())
                            .text(format!(
                                "{} av {} par ({}%)",
                                completion.completed,
                                completion.total,
                                completion.percentage()
                            )),
                    );
                });
            ui.add_space(6.0);
        }
    }

    fn show_ledger(&self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.label(RichText::new("Poänglogg").size(18.0).strong());
        ui.add_space(8.0);

        if self.ledger.is_empty() {
            ui.label(RichText::new("Inga poäng utdelade ännu").color(Colors::TEXT_SECONDARY));
            return;
        }

        let pairs: HashMap<i64, String> = self
            .leaderboard
            .iter()
            .map(|p| (p.connection_id, p.pair_label()))
            .collect();

        egui::Grid::new("ledger_grid")
            .num_columns(5)
            .striped(true)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label(RichText::new("Tid").strong());
                ui.label(RichText::new("Par").strong());
                ui.label(RichText::new("Beskrivning").strong());
                ui.label(RichText::new("Poäng").strong());
                ui.label("");
                ui.end_row();

                for entry in &self.ledger {
                    let Some(entry_id) = entry.id else {
                        continue;
                    };
                    ui.label(RichText::new(entry.created_at.as_deref().unwrap_or("")).small());
                    ui.label(pairs.get(&entry.connection_id).map(String::as_str).unwrap_or("?"));
                    ui.horizontal(|ui| {
                        if entry.challenge_id.is_some() {
                            ui.label(Icons::CHALLENGE);
                        }
                        ui.label(&entry.prompt);
                    });
                    ui.label(format!("{:+}", entry.point));
                    if ui.small_button(Icons::DELETE).on_hover_text("Ta bort poäng").clicked() {
                        state.show_confirm(
                            &format!("Ta bort {} poäng för '{}'?", entry.point, entry.prompt),
                            ConfirmAction::DeletePointSubmission(entry_id),
                        );
                    }
                    ui.end_row();
                }
            });
    }

    fn reconcile(&mut self, tree_id: i64, state: &mut AppState, db: &Database) {
        match ScoringService::new(db).reconcile(tree_id) {
            Ok(0) => state.show_success("Poängsummorna stämmer"),
            Ok(fixed) => {
                state.show_warning(&format!("{} poängsummor rättade", fixed));
                self.needs_refresh = true;
            }
            Err(e) => state.show_error(&format!("Avstämning misslyckades: {}", e)),
        }
    }

    fn export_leaderboard(tree: &FamilyTree, state: &mut AppState, db: &Database) {
        let Some(tree_id) = tree.id else {
            return;
        };
        let report = ReportType::Leaderboard { tree_id };
        let format = ExportFormat::Csv;
        let filename = ExportService::generate_filename(&tree.title, report, format);

        let file_dialog = rfd::FileDialog::new()
            .set_file_name(&filename)
            .add_filter(format.display_name(), &[format.extension()]);

        if let Some(path) = file_dialog.save_file() {
            match ExportService::new(db).export_to_file(report, format, &path) {
                Ok(result) => state.show_success(&format!("{} sparad till {}", result.summary(), path.display())),
                Err(e) => state.show_error(&format!("Export misslyckades: {}", e)),
            }
        }
    }

    fn refresh(&mut self, tree_id: i64, db: &Database) {
        self.loaded_tree_id = Some(tree_id);
        self.tree = db.trees().find_by_id(tree_id).ok().flatten();

        let scoring = ScoringService::new(db);
        self.leaderboard = scoring.leaderboard(tree_id).unwrap_or_default();
        self.challenges = db
            .challenges()
            .find_by_tree(tree_id)
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                let completion = c
                    .id
                    .and_then(|id| scoring.completion(id).ok())
                    .unwrap_or(ChallengeCompletion { completed: 0, total: 0 });
                (c, completion)
            })
            .collect();
        self.ledger = db.challenges().find_points_by_tree(tree_id).unwrap_or_default();
    }

    pub fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }
}

impl Default for TreeManageView {
    fn default() -> Self {
        Self::new()
    }
}
