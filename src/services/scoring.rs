//! Utmaningar och poäng per big/little-par

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::db::Database;
use crate::models::{Challenge, ChallengeCompletion, ConnectionView, PointSubmission};
use crate::utils::AppError;

pub struct ScoringService<'a> {
    db: &'a Database,
}

impl<'a> ScoringService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create_challenge(
        &self,
        tree_id: i64,
        prompt: &str,
        point_value: Option<i64>,
        deadline: Option<NaiveDate>,
    ) -> Result<Challenge> {
        let mut challenge = Challenge::new(tree_id, prompt.trim(), point_value);
        challenge.deadline = deadline;
        self.db.challenges().create(&mut challenge)?;
        info!("Skapade utmaning '{}' i träd {}", challenge.prompt, tree_id);
        Ok(challenge)
    }

    pub fn update_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.db.challenges().update(challenge)
    }

    pub fn delete_challenge(&self, challenge_id: i64) -> Result<()> {
        self.db.challenges().delete(challenge_id)?;
        info!("Tog bort utmaning {}", challenge_id);
        Ok(())
    }

    /// Dela ut poäng för en utmaning. Utmaningens text och poäng kopieras
    /// till posten; saknar utmaningen poäng blir det 0.
    pub fn award_challenge(&self, connection_id: i64, challenge_id: i64) -> Result<PointSubmission> {
        let challenge = self
            .db
            .challenges()
            .find_by_id(challenge_id)?
            .ok_or_else(|| AppError::not_found(format!("utmaning {}", challenge_id)))?;

        let connection = self
            .db
            .connections()
            .find_by_id(connection_id)?
            .ok_or_else(|| AppError::not_found(format!("koppling {}", connection_id)))?;
        if connection.family_tree_id != challenge.family_tree_id {
            return Err(AppError::validation("Utmaningen hör till ett annat träd").into());
        }

        let mut submission = PointSubmission {
            connection_id,
            challenge_id: Some(challenge_id),
            prompt: challenge.prompt.clone(),
            point: challenge.point_value.unwrap_or(0),
            ..Default::default()
        };
        self.db
            .challenges()
            .insert_point_submission(&mut submission)
            .with_context(|| format!("Kunde inte dela ut poäng för '{}'", challenge.prompt))?;

        info!(
            "{} poäng till koppling {} för '{}'",
            submission.point, connection_id, submission.prompt
        );
        Ok(submission)
    }

    /// Dela ut poäng utan utmaning
    pub fn award_manual(&self, connection_id: i64, prompt: &str, point: i64) -> Result<PointSubmission> {
        if prompt.trim().is_empty() {
            return Err(AppError::validation("Ange en beskrivning för poängen").into());
        }

        let mut submission = PointSubmission {
            connection_id,
            challenge_id: None,
            prompt: prompt.trim().to_string(),
            point,
            ..Default::default()
        };
        self.db.challenges().insert_point_submission(&mut submission)?;

        info!("{} poäng till koppling {} ({})", point, connection_id, submission.prompt);
        Ok(submission)
    }

    pub fn delete_award(&self, point_submission_id: i64) -> Result<()> {
        let point = self.db.challenges().delete_point_submission(point_submission_id)?;
        info!("Tog bort poängpost {} ({} poäng)", point_submission_id, point);
        Ok(())
    }

    pub fn completion(&self, challenge_id: i64) -> Result<ChallengeCompletion> {
        self.db.challenges().completion(challenge_id)
    }

    /// Alla par i trädet, flest poäng först
    pub fn leaderboard(&self, tree_id: i64) -> Result<Vec<ConnectionView>> {
        self.db.connections().find_views_by_tree(tree_id)
    }

    pub fn reconcile(&self, tree_id: i64) -> Result<usize> {
        let fixed = self.db.challenges().reconcile(tree_id)?;
        if fixed > 0 {
            info!("Rättade poängsumman för {} par i träd {}", fixed, tree_id);
        }
        Ok(fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Connection, FamilyTree, Form, Organization, Question, QuestionType, TreeMember};

    struct Fixture {
        db: Database,
        tree_id: i64,
        connections: Vec<i64>,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let mut org = Organization::new("Org");
        let org_id = db.organizations().create(&mut org).unwrap();
        let mut form = Form::new(org_id, "Form");
        let form_id = db.forms().create(&mut form).unwrap();
        let mut q = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let question_id = db.forms().add_question(&mut q).unwrap();
        let mut tree = FamilyTree::new(form_id, question_id, "Träd");
        let tree_id = db.trees().create(&mut tree).unwrap();

        let mut ids = Vec::new();
        for name in ["Anna", "Bo", "Cia", "Dan"] {
            let mut m = TreeMember::new(tree_id, name);
            ids.push(db.trees().create_member(&mut m).unwrap());
        }
        let connections = vec![
            db.connections().create(&mut Connection::new(tree_id, ids[0], ids[1])).unwrap(),
            db.connections().create(&mut Connection::new(tree_id, ids[0], ids[2])).unwrap(),
            db.connections().create(&mut Connection::new(tree_id, ids[2], ids[3])).unwrap(),
        ];

        Fixture { db, tree_id, connections }
    }

    fn assert_totals_match_ledger(f: &Fixture) {
        for &id in &f.connections {
            let cached = f.db.connections().find_by_id(id).unwrap().unwrap().points;
            let ledger = f.db.challenges().ledger_sum(id).unwrap();
            assert_eq!(cached, ledger, "koppling {}", id);
        }
    }

    #[test]
    fn test_award_from_challenge_copies_prompt_and_points() {
        let f = setup();
        let service = ScoringService::new(&f.db);
        let challenge = service.create_challenge(f.tree_id, "Bowling", Some(15), None).unwrap();

        let award = service
            .award_challenge(f.connections[0], challenge.id.unwrap())
            .unwrap();

        assert_eq!(award.prompt, "Bowling");
        assert_eq!(award.point, 15);
        assert_eq!(award.challenge_id, challenge.id);
        assert_eq!(service.leaderboard(f.tree_id).unwrap()[0].points, 15);
    }

    #[test]
    fn test_challenge_without_points_awards_zero() {
        let f = setup();
        let service = ScoringService::new(&f.db);
        let challenge = service.create_challenge(f.tree_id, "Ta en selfie", None, None).unwrap();

        let award = service.award_challenge(f.connections[1], challenge.id.unwrap()).unwrap();

        assert_eq!(award.point, 0);
        let completion = service.completion(challenge.id.unwrap()).unwrap();
        assert_eq!(completion, ChallengeCompletion { completed: 1, total: 3 });
        assert_eq!(completion.percentage(), 33);
    }

    #[test]
    fn test_invalid_challenge_is_rejected() {
        let f = setup();
        let service = ScoringService::new(&f.db);

        let err = service.create_challenge(f.tree_id, "  ", Some(5), None).unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::Validation(_))));
        let err = service.create_challenge(f.tree_id, "Fika", Some(-1), None).unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::Validation(_))));
        assert!(f.db.challenges().find_by_tree(f.tree_id).unwrap().is_empty());
    }

    #[test]
    fn test_manual_award_needs_prompt() {
        let f = setup();
        let service = ScoringService::new(&f.db);
        assert!(service.award_manual(f.connections[0], "", 5).is_err());

        let award = service.award_manual(f.connections[0], "Bonus", 5).unwrap();
        assert_eq!(award.challenge_id, None);
        assert_totals_match_ledger(&f);
    }

    #[test]
    fn test_leaderboard_is_sorted_by_points() {
        let f = setup();
        let service = ScoringService::new(&f.db);
        service.award_manual(f.connections[2], "Bonus", 30).unwrap();
        service.award_manual(f.connections[1], "Bonus", 10).unwrap();

        let board = service.leaderboard(f.tree_id).unwrap();
        let points: Vec<i64> = board.iter().map(|c| c.points).collect();
        assert_eq!(points, vec![30, 10, 0]);
        assert_eq!(board[0].pair_label(), "Cia → Dan");
    }

    #[test]
    fn test_totals_equal_ledger_after_any_sequence() {
        let f = setup();
        let service = ScoringService::new(&f.db);
        let challenge = service.create_challenge(f.tree_id, "Quiz", Some(7), None).unwrap();
        let challenge_id = challenge.id.unwrap();

        // Deterministisk pseudoslump: skapa och ta bort om vartannat
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut live: Vec<i64> = Vec::new();
        for _ in 0..200 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;

            let connection_id = f.connections[(state % 3) as usize];
            match state % 5 {
                0 | 1 => live.push(service.award_challenge(connection_id, challenge_id).unwrap().id.unwrap()),
                2 => {
                    let point = (state % 41) as i64 - 20;
                    live.push(service.award_manual(connection_id, "Manuell", point).unwrap().id.unwrap());
                }
                _ => {
                    if !live.is_empty() {
                        let id = live.swap_remove((state as usize) % live.len());
                        service.delete_award(id).unwrap();
                    }
                }
            }
            assert_totals_match_ledger(&f);
        }

        assert_eq!(service.reconcile(f.tree_id).unwrap(), 0);
    }
}
