use egui::{self, RichText};
use tracing::error;

use crate::db::Database;
use crate::services::ScoringService;
use crate::ui::{
    state::{AppState, ConfirmAction},
    theme::{Colors, Icons},
    View,
};

pub struct ConfirmDialog;

impl ConfirmDialog {
    /// Visar bekräftelsedialog och returnerar true om åtgärden bekräftades
    pub fn show(ctx: &egui::Context, state: &mut AppState, db: &Database) -> Option<bool> {
        if !state.show_confirm_dialog {
            return None;
        }

        let mut result = None;

        egui::Window::new("Bekräfta")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(300.0);

                ui.vertical_centered(|ui| {
                    ui.label(RichText::new(Icons::DELETE).size(32.0).color(Colors::WARNING));
                    ui.add_space(8.0);
                    ui.label(&state.confirm_dialog_message);
                });

                ui.add_space(16.0);

                ui.horizontal(|ui| {
                    if ui.button("Avbryt").clicked() {
                        state.close_confirm();
                        result = Some(false);
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button(RichText::new("Radera").color(Colors::ERROR)).clicked() {
                            if let Some(action) = state.confirm_dialog_action.clone() {
                                Self::execute_action(&action, state, db);
                            }
                            state.close_confirm();
                            result = Some(true);
                        }
                    });
                });
            });

        result
    }

    fn execute_action(action: &ConfirmAction, state: &mut AppState, db: &Database) {
        let (outcome, done) = match action {
            ConfirmAction::DeleteForm(id) => (db.forms().delete(*id), "Formulär raderat"),
            ConfirmAction::DeleteQuestion(id) => (db.forms().delete_question(*id), "Fråga raderad"),
            ConfirmAction::DeleteSubmission(id) => (db.submissions().delete(*id), "Svar raderat"),
            ConfirmAction::DeleteTree(id) => (db.trees().delete(*id), "Fadderträd raderat"),
            ConfirmAction::DeleteChallenge(id) => {
                (ScoringService::new(db).delete_challenge(*id), "Utmaning raderad")
            }
            ConfirmAction::DeletePointSubmission(id) => {
                (ScoringService::new(db).delete_award(*id), "Poäng borttagna")
            }
        };

        match outcome {
            Ok(()) => {
                state.show_success(done);
                state.data_changed = true;
                match action {
                    ConfirmAction::DeleteForm(_) => {
                        state.selected_form_id = None;
                        state.navigate(View::FormList);
                    }
                    ConfirmAction::DeleteTree(_) => {
                        state.selected_tree_id = None;
                        state.navigate(View::TreeList);
                    }
                    _ => {}
                }
            }
            Err(e) => {
                error!("{:?} misslyckades: {:#}", action, e);
                state.show_error(&format!("Kunde inte radera: {}", e));
            }
        }
    }
}
