use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Option<i64>,
    pub family_tree_id: i64,
    pub prompt: String,
    pub point_value: Option<i64>,
    pub deadline: Option<NaiveDate>,
}

impl Challenge {
    pub fn new(family_tree_id: i64, prompt: impl Into<String>, point_value: Option<i64>) -> Self {
        Self {
            family_tree_id,
            prompt: prompt.into(),
            point_value,
            ..Default::default()
        }
    }

    pub fn points_display(&self) -> String {
        match self.point_value {
            Some(p) => format!("{} p", p),
            None => "–".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ChallengeValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ChallengeValidationError::MissingPrompt);
        }
        if matches!(self.point_value, Some(p) if p < 0) {
            return Err(ChallengeValidationError::NegativePoints);
        }
        Ok(())
    }
}

/// Oföränderlig post för en poängtilldelning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointSubmission {
    pub id: Option<i64>,
    pub connection_id: i64,
    pub challenge_id: Option<i64>,
    /// Kopia av utmaningens text vid tilldelningen
    pub prompt: String,
    pub point: i64,
    pub created_at: Option<String>,
}

/// Hur många par som klarat en utmaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeCompletion {
    pub completed: i64,
    pub total: i64,
}

impl ChallengeCompletion {
    /// Andel i procent, avrundad
    pub fn percentage(&self) -> i64 {
        if self.total <= 0 {
            return 0;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as i64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChallengeValidationError {
    #[error("Utmaningen måste ha en beskrivning")]
    MissingPrompt,
    #[error("Poäng kan inte vara negativa")]
    NegativePoints,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_percentage() {
        assert_eq!(ChallengeCompletion { completed: 0, total: 0 }.percentage(), 0);
        assert_eq!(ChallengeCompletion { completed: 1, total: 3 }.percentage(), 33);
        assert_eq!(ChallengeCompletion { completed: 2, total: 3 }.percentage(), 67);
        assert_eq!(ChallengeCompletion { completed: 4, total: 4 }.percentage(), 100);
    }

    #[test]
    fn test_challenge_validation() {
        assert!(Challenge::new(1, "Fika tillsammans", Some(10)).validate().is_ok());
        assert!(Challenge::new(1, "Fika tillsammans", None).validate().is_ok());
        assert!(matches!(
            Challenge::new(1, "", Some(10)).validate(),
            Err(ChallengeValidationError::MissingPrompt)
        ));
        assert!(matches!(
            Challenge::new(1, "Fika", Some(-5)).validate(),
            Err(ChallengeValidationError::NegativePoints)
        ));
    }
}
