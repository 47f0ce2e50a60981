use crate::models::config::ShortcutMap;

/// Aktuell vy i applikationen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Dashboard,
    FormList,
    FormDetail,
    Questionnaire,
    TreeList,
    TreeGraph,
    TreeManage,
    Settings,
    SetupWizard,
}

/// Flik i formulärlistan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormTab {
    #[default]
    Current,
    Past,
}

/// Centraliserat applikationstillstånd
#[derive(Debug, Default)]
pub struct AppState {
    /// Aktuell vy
    pub current_view: View,

    pub form_tab: FormTab,

    /// Valt formulär (för detaljvy)
    pub selected_form_id: Option<i64>,

    /// Valt träd (för graf- och hanteringsvy)
    pub selected_tree_id: Option<i64>,

    /// Kod att öppna i enkätvyn
    pub questionnaire_code: Option<String>,

    /// Formulärdialog; None = nytt formulär
    pub show_form_form: bool,
    pub editing_form_id: Option<i64>,

    /// Frågedialog; None = ny fråga
    pub show_question_form: bool,
    pub editing_question_id: Option<i64>,

    /// Dialog för nytt träd
    pub show_tree_form: bool,

    /// Utmaningsdialog; None = ny utmaning
    pub show_challenge_form: bool,
    pub editing_challenge_id: Option<i64>,

    /// Poängdialog för en koppling
    pub show_point_award: bool,
    pub award_connection_id: Option<i64>,

    /// Visar bekräftelsedialog
    pub show_confirm_dialog: bool,
    pub confirm_dialog_message: String,
    pub confirm_dialog_action: Option<ConfirmAction>,

    /// Statusmeddelande
    pub status_message: Option<StatusMessage>,

    /// Dark mode
    pub dark_mode: bool,

    /// Inställningsvyn fångar en ny genväg
    pub capturing_shortcut: bool,
    /// Nya genvägar att applicera
    pub shortcuts_to_apply: Option<ShortcutMap>,

    /// Något har ändrats som påverkar listor och statistik
    pub data_changed: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigera till vy
    pub fn navigate(&mut self, view: View) {
        self.current_view = view;
    }

    pub fn navigate_to_form(&mut self, form_id: i64) {
        self.selected_form_id = Some(form_id);
        self.current_view = View::FormDetail;
    }

    pub fn navigate_to_tree(&mut self, tree_id: i64) {
        self.selected_tree_id = Some(tree_id);
        self.current_view = View::TreeGraph;
    }

    pub fn navigate_to_tree_manage(&mut self, tree_id: i64) {
        self.selected_tree_id = Some(tree_id);
        self.current_view = View::TreeManage;
    }

    pub fn open_questionnaire(&mut self, code: &str) {
        self.questionnaire_code = Some(code.to_string());
        self.current_view = View::Questionnaire;
    }

    pub fn open_new_form(&mut self) {
        self.editing_form_id = None;
        self.show_form_form = true;
    }

    pub fn open_edit_form(&mut self, form_id: i64) {
        self.editing_form_id = Some(form_id);
        self.show_form_form = true;
    }

    pub fn close_form_form(&mut self) {
        self.show_form_form = false;
        self.editing_form_id = None;
    }

    pub fn open_new_question(&mut self) {
        self.editing_question_id = None;
        self.show_question_form = true;
    }

    pub fn open_edit_question(&mut self, question_id: i64) {
        self.editing_question_id = Some(question_id);
        self.show_question_form = true;
    }

    pub fn close_question_form(&mut self) {
        self.show_question_form = false;
        self.editing_question_id = None;
    }

    pub fn open_new_challenge(&mut self) {
        self.editing_challenge_id = None;
        self.show_challenge_form = true;
    }

    pub fn open_edit_challenge(&mut self, challenge_id: i64) {
        self.editing_challenge_id = Some(challenge_id);
        self.show_challenge_form = true;
    }

    pub fn close_challenge_form(&mut self) {
        self.show_challenge_form = false;
        self.editing_challenge_id = None;
    }

    pub fn open_point_award(&mut self, connection_id: i64) {
        self.award_connection_id = Some(connection_id);
        self.show_point_award = true;
    }

    pub fn close_point_award(&mut self) {
        self.show_point_award = false;
        self.award_connection_id = None;
    }

    /// Visa bekräftelsedialog
    pub fn show_confirm(&mut self, message: &str, action: ConfirmAction) {
        self.confirm_dialog_message = message.to_string();
        self.confirm_dialog_action = Some(action);
        self.show_confirm_dialog = true;
    }

    /// Stäng bekräftelsedialog
    pub fn close_confirm(&mut self) {
        self.show_confirm_dialog = false;
        self.confirm_dialog_action = None;
    }

    /// Är någon dialog öppen?
    pub fn any_modal_open(&self) -> bool {
        self.show_form_form
            || self.show_question_form
            || self.show_tree_form
            || self.show_challenge_form
            || self.show_point_award
            || self.show_confirm_dialog
    }

    /// Stäng översta dialogen
    pub fn close_topmost_modal(&mut self) {
        if self.show_confirm_dialog {
            self.close_confirm();
        } else if self.show_point_award {
            self.close_point_award();
        } else if self.show_challenge_form {
            self.close_challenge_form();
        } else if self.show_question_form {
            self.close_question_form();
        } else if self.show_tree_form {
            self.show_tree_form = false;
        } else if self.show_form_form {
            self.close_form_form();
        }
    }

    /// Visa statusmeddelande
    pub fn show_status(&mut self, message: &str, status_type: StatusType) {
        self.status_message = Some(StatusMessage {
            text: message.to_string(),
            status_type,
            created_at: std::time::Instant::now(),
        });
    }

    /// Visa framgångsmeddelande
    pub fn show_success(&mut self, message: &str) {
        self.show_status(message, StatusType::Success);
    }

    /// Visa felmeddelande
    pub fn show_error(&mut self, message: &str) {
        self.show_status(message, StatusType::Error);
    }

    pub fn show_warning(&mut self, message: &str) {
        self.show_status(message, StatusType::Warning);
    }

    /// Rensa statusmeddelande om det är för gammalt
    pub fn clear_old_status(&mut self) {
        if let Some(ref status) = self.status_message {
            let limit = match status.status_type {
                StatusType::Error => 10,
                _ => 5,
            };
            if status.created_at.elapsed().as_secs() > limit {
                self.status_message = None;
            }
        }
    }
}

/// Typ av bekräftelseåtgärd
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteForm(i64),
    DeleteQuestion(i64),
    DeleteSubmission(i64),
    DeleteTree(i64),
    DeleteChallenge(i64),
    DeletePointSubmission(i64),
}

/// Statusmeddelande
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub status_type: StatusType,
    pub created_at: std::time::Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusType {
    Success,
    Error,
    Info,
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_topmost_modal_order() {
        let mut state = AppState::new();
        state.open_new_form();
        state.show_confirm("Radera?", ConfirmAction::DeleteForm(1));
        assert!(state.any_modal_open());

        state.close_topmost_modal();
        assert!(!state.show_confirm_dialog);
        assert!(state.show_form_form);

        state.close_topmost_modal();
        assert!(!state.any_modal_open());
    }

    #[test]
    fn test_navigation_helpers() {
        let mut state = AppState::new();
        state.navigate_to_tree(7);
        assert_eq!(state.current_view, View::TreeGraph);
        assert_eq!(state.selected_tree_id, Some(7));

        state.open_questionnaire("ABC123");
        assert_eq!(state.current_view, View::Questionnaire);
        assert_eq!(state.questionnaire_code.as_deref(), Some("ABC123"));
    }
}
