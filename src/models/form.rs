use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CODE_LENGTH: usize = 6;

/// Frågetyp, lagras som text i databasen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QuestionType {
    #[default]
    FreeResponse,
    MultipleChoice,
    SelectAll,
    SectionHeader,
}

impl QuestionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FreeResponse => "Fritext",
            Self::MultipleChoice => "Flerval (ett svar)",
            Self::SelectAll => "Flerval (flera svar)",
            Self::SectionHeader => "Sektionsrubrik",
        }
    }

    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::FreeResponse => "FREE_RESPONSE",
            Self::MultipleChoice => "MULTIPLE_CHOICE",
            Self::SelectAll => "SELECT_ALL",
            Self::SectionHeader => "SECTION_HEADER",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "FREE_RESPONSE" => Some(Self::FreeResponse),
            "MULTIPLE_CHOICE" => Some(Self::MultipleChoice),
            "SELECT_ALL" => Some(Self::SelectAll),
            "SECTION_HEADER" => Some(Self::SectionHeader),
            _ => None,
        }
    }

    /// Har frågetypen svarsalternativ?
    pub fn has_options(&self) -> bool {
        matches!(self, Self::MultipleChoice | Self::SelectAll)
    }

    /// Tar frågetypen emot svar överhuvudtaget?
    pub fn is_answerable(&self) -> bool {
        !matches!(self, Self::SectionHeader)
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::FreeResponse,
            Self::MultipleChoice,
            Self::SelectAll,
            Self::SectionHeader,
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Form {
    pub id: Option<i64>,
    pub organization_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub code: String,
    pub created_at: Option<String>,
}

impl Form {
    pub fn new(organization_id: i64, title: impl Into<String>) -> Self {
        Self {
            organization_id,
            title: title.into(),
            ..Default::default()
        }
    }

    /// Ett formulär är aktuellt om det saknar deadline eller deadline inte passerats
    pub fn is_current_on(&self, today: NaiveDate) -> bool {
        match self.deadline {
            Some(deadline) => deadline >= today,
            None => true,
        }
    }

    pub fn is_current(&self) -> bool {
        self.is_current_on(Utc::now().date_naive())
    }

    pub fn validate(&self) -> Result<(), FormValidationError> {
        if self.title.trim().is_empty() {
            return Err(FormValidationError::MissingTitle);
        }
        Ok(())
    }

    /// Generera en kort slumpad publik kod för formulärlänken
    pub fn generate_code() -> String {
        const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

        Uuid::new_v4()
            .as_bytes()
            .iter()
            .take(CODE_LENGTH)
            .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: Option<i64>,
    pub question_id: i64,
    pub label: String,
    pub index: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Question {
    pub id: Option<i64>,
    pub form_id: i64,
    pub prompt: String,
    pub question_type: QuestionType,
    pub index: i32,
    pub description: Option<String>,
    pub options: Vec<QuestionOption>,
}

impl Question {
    pub fn new(form_id: i64, prompt: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            form_id,
            prompt: prompt.into(),
            question_type,
            ..Default::default()
        }
    }

    /// Lägg till svarsalternativ (index sätts i ordning)
    pub fn with_options<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for label in labels {
            let index = self.options.len() as i32;
            self.options.push(QuestionOption {
                id: None,
                question_id: self.id.unwrap_or(0),
                label: label.into(),
                index,
            });
        }
        self
    }

    pub fn validate(&self) -> Result<(), QuestionValidationError> {
        if self.question_type.is_answerable() && self.prompt.trim().is_empty() {
            return Err(QuestionValidationError::MissingPrompt);
        }

        if self.question_type.has_options() {
            if self.options.is_empty() {
                return Err(QuestionValidationError::MissingOptions);
            }
            if self.options.iter().any(|o| o.label.trim().is_empty()) {
                return Err(QuestionValidationError::EmptyOption);
            }
        } else if !self.options.is_empty() {
            return Err(QuestionValidationError::UnexpectedOptions);
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormValidationError {
    #[error("Formuläret måste ha en titel")]
    MissingTitle,
}

#[derive(Debug, thiserror::Error)]
pub enum QuestionValidationError {
    #[error("Frågan måste ha en frågetext")]
    MissingPrompt,
    #[error("Flervalsfrågor kräver minst ett svarsalternativ")]
    MissingOptions,
    #[error("Svarsalternativ får inte vara tomma")]
    EmptyOption,
    #[error("Endast flervalsfrågor kan ha svarsalternativ")]
    UnexpectedOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_db_roundtrip() {
        for t in QuestionType::all() {
            assert_eq!(QuestionType::from_db_str(t.as_db_str()), Some(*t));
        }
        assert_eq!(QuestionType::from_db_str("RANKING"), None);
    }

    #[test]
    fn test_form_is_current() {
        let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        let mut form = Form::new(1, "Rekrytering");
        assert!(form.is_current_on(today));

        form.deadline = Some(today);
        assert!(form.is_current_on(today));

        form.deadline = NaiveDate::from_ymd_opt(2024, 8, 31);
        assert!(!form.is_current_on(today));
    }

    #[test]
    fn test_question_validation() {
        let free = Question::new(1, "Vad heter du?", QuestionType::FreeResponse);
        assert!(free.validate().is_ok());

        let header = Question::new(1, "", QuestionType::SectionHeader);
        assert!(header.validate().is_ok());

        let choice = Question::new(1, "Favoritfärg", QuestionType::MultipleChoice);
        assert!(matches!(
            choice.validate(),
            Err(QuestionValidationError::MissingOptions)
        ));

        let choice = choice.with_options(["Röd", "Blå"]);
        assert!(choice.validate().is_ok());
        assert_eq!(choice.options[1].index, 1);

        let bad = Question::new(1, "Namn", QuestionType::FreeResponse).with_options(["x"]);
        assert!(matches!(
            bad.validate(),
            Err(QuestionValidationError::UnexpectedOptions)
        ));
    }

    #[test]
    fn test_generate_code() {
        let code = Form::generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

        let codes: std::collections::HashSet<String> = (0..50).map(|_| Form::generate_code()).collect();
        assert!(codes.len() > 1);
    }
}
