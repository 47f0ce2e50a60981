use serde::{Deserialize, Serialize};

/// Ett fadderträd kopplat till ett formulär
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyTree {
    pub id: Option<i64>,
    pub form_id: i64,
    /// Frågan vars svar blir nodernas namn
    pub question_id: i64,
    pub title: String,
    pub code: String,
    pub author_id: String,
    pub created_at: Option<String>,
}

impl FamilyTree {
    pub fn new(form_id: i64, question_id: i64, title: impl Into<String>) -> Self {
        Self {
            form_id,
            question_id,
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), TreeValidationError> {
        if self.title.trim().is_empty() {
            return Err(TreeValidationError::MissingTitle);
        }
        Ok(())
    }
}

/// En medlem (nod) i ett fadderträd
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeMember {
    pub id: Option<i64>,
    pub family_tree_id: i64,
    pub identifier: String,
    pub position_x: f32,
    pub position_y: f32,
    pub is_big: bool,
    pub form_submission_id: Option<i64>,
}

impl TreeMember {
    pub fn new(family_tree_id: i64, identifier: impl Into<String>) -> Self {
        Self {
            family_tree_id,
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position_x = x;
        self.position_y = y;
        self
    }
}

/// Riktad koppling big -> little
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Connection {
    pub id: Option<i64>,
    pub family_tree_id: i64,
    pub big_id: i64,
    pub little_id: i64,
    pub points: i64,
}

impl Connection {
    pub fn new(family_tree_id: i64, big_id: i64, little_id: i64) -> Self {
        Self {
            family_tree_id,
            big_id,
            little_id,
            ..Default::default()
        }
    }

    pub fn involves(&self, member_id: i64) -> bool {
        self.big_id == member_id || self.little_id == member_id
    }
}

/// Koppling med medlemmarnas namn (för listor och topplista)
#[derive(Debug, Clone)]
pub struct ConnectionView {
    pub connection_id: i64,
    pub big_id: i64,
    pub big_name: String,
    pub little_id: i64,
    pub little_name: String,
    pub points: i64,
}

impl ConnectionView {
    pub fn pair_label(&self) -> String {
        format!("{} → {}", self.big_name, self.little_name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TreeValidationError {
    #[error("Trädet måste ha en titel")]
    MissingTitle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_involves() {
        let c = Connection::new(1, 10, 20);
        assert!(c.involves(10));
        assert!(c.involves(20));
        assert!(!c.involves(30));
    }

    #[test]
    fn test_tree_validation() {
        assert!(FamilyTree::new(1, 2, "Höst 2024").validate().is_ok());
        assert!(matches!(
            FamilyTree::new(1, 2, "  ").validate(),
            Err(TreeValidationError::MissingTitle)
        ));
    }
}
