use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// En inskickad besvarad enkät
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: Option<i64>,
    pub form_id: i64,
    pub created_at: Option<String>,
}

/// Svar på en fråga i en inskickning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionResponse {
    pub id: Option<i64>,
    pub form_submission_id: i64,
    pub question_id: i64,
    pub text: Option<String>,
    /// Valda svarsalternativ (response_option_selection)
    pub selected_option_ids: Vec<i64>,
}

/// Inmatat svar innan det sparas
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Choice(i64),
    Choices(Vec<i64>),
}

impl Answer {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(t) => t.trim().is_empty(),
            Self::Choice(_) => false,
            Self::Choices(ids) => ids.is_empty(),
        }
    }
}

/// En inskickning med renderade svar per fråga (för listor och export)
#[derive(Debug, Clone, Default)]
pub struct SubmissionView {
    pub submission_id: i64,
    pub created_at: String,
    /// question_id -> svar som text
    pub answers: HashMap<i64, String>,
}

impl SubmissionView {
    pub fn answer(&self, question_id: i64) -> &str {
        self.answers
            .get(&question_id)
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_is_empty() {
        assert!(Answer::Text("   ".into()).is_empty());
        assert!(!Answer::Text("Anna".into()).is_empty());
        assert!(Answer::Choices(vec![]).is_empty());
        assert!(!Answer::Choice(3).is_empty());
    }

    #[test]
    fn test_submission_view_missing_answer() {
        let view = SubmissionView::default();
        assert_eq!(view.answer(42), "");
    }
}
