use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::lock;
use crate::models::{Challenge, ChallengeCompletion, PointSubmission};
use crate::utils::AppError;

pub struct ChallengeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChallengeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn find_by_tree(&self, tree_id: i64) -> Result<Vec<Challenge>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, family_tree_id, prompt, point_value, deadline
             FROM challenges WHERE family_tree_id = ?
             ORDER BY deadline IS NULL, deadline, id",
        )?;

        let challenges = stmt
            .query_map([tree_id], Self::row_to_challenge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(challenges)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Challenge>> {
        let conn = lock(&self.conn)?;
        let challenge = conn
            .query_row(
                "SELECT id, family_tree_id, prompt, point_value, deadline FROM challenges WHERE id = ?",
                [id],
                Self::row_to_challenge,
            )
            .optional()?;
        Ok(challenge)
    }

    pub fn create(&self, challenge: &mut Challenge) -> Result<i64> {
        challenge
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO challenges (family_tree_id, prompt, point_value, deadline)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                challenge.family_tree_id,
                challenge.prompt.trim(),
                challenge.point_value,
                challenge.deadline,
            ],
        )?;

        let id = conn.last_insert_rowid();
        challenge.id = Some(id);
        Ok(id)
    }

    /// Uppdatera utmaning. Redan utdelade poäng påverkas inte.
    pub fn update(&self, challenge: &Challenge) -> Result<()> {
        let id = challenge
            .id
            .ok_or_else(|| AppError::validation("Utmaningen saknar id"))?;
        challenge
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "UPDATE challenges SET prompt = ?1, point_value = ?2, deadline = ?3 WHERE id = ?4",
            params![challenge.prompt.trim(), challenge.point_value, challenge.deadline, id],
        )?;
        if rows == 0 {
            return Err(AppError::not_found(format!("utmaning {}", id)).into());
        }
        Ok(())
    }

    /// Radera utmaning; poängposterna behålls utan koppling till utmaningen
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute("DELETE FROM challenges WHERE id = ?", [id])?;
        Ok(())
    }

    // ------------------------------------------------------------
    // Poängliggare
    // ------------------------------------------------------------

    pub fn find_points_by_connection(&self, connection_id: i64) -> Result<Vec<PointSubmission>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, connection_id, challenge_id, prompt, point, created_at
             FROM point_submission WHERE connection_id = ? ORDER BY id DESC",
        )?;

        let points = stmt
            .query_map([connection_id], Self::row_to_point)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(points)
    }

    pub fn find_points_by_tree(&self, tree_id: i64) -> Result<Vec<PointSubmission>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.connection_id, p.challenge_id, p.prompt, p.point, p.created_at
             FROM point_submission p
             JOIN connections c ON c.id = p.connection_id
             WHERE c.family_tree_id = ?
             ORDER BY p.id DESC",
        )?;

        let points = stmt
            .query_map([tree_id], Self::row_to_point)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(points)
    }

    /// Lägg till en poängpost och öka kopplingens summa i samma transaktion
    pub fn insert_point_submission(&self, submission: &mut PointSubmission) -> Result<i64> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO point_submission (connection_id, challenge_id, prompt, point)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                submission.connection_id,
                submission.challenge_id,
                submission.prompt,
                submission.point,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let rows = tx.execute(
            "UPDATE connections SET points = points + ?1 WHERE id = ?2",
            params![submission.point, submission.connection_id],
        )?;
        if rows == 0 {
            return Err(AppError::not_found(format!("koppling {}", submission.connection_id)).into());
        }

        let created_at: String = tx.query_row(
            "SELECT created_at FROM point_submission WHERE id = ?",
            [id],
            |row| row.get(0),
        )?;
        tx.commit()?;

        submission.id = Some(id);
        submission.created_at = Some(created_at);
        Ok(id)
    }

    /// Radera en poängpost och minska kopplingens summa i samma transaktion.
    /// Returnerar den borttagna postens poäng.
    pub fn delete_point_submission(&self, id: i64) -> Result<i64> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let row: Option<(i64, i64)> = tx
            .query_row(
                "SELECT connection_id, point FROM point_submission WHERE id = ?",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (connection_id, point) =
            row.ok_or_else(|| AppError::not_found(format!("poängpost {}", id)))?;

        tx.execute("DELETE FROM point_submission WHERE id = ?", [id])?;
        tx.execute(
            "UPDATE connections SET points = points - ?1 WHERE id = ?2",
            params![point, connection_id],
        )?;
        tx.commit()?;

        Ok(point)
    }

    /// Summa av liggaren för en koppling
    pub fn ledger_sum(&self, connection_id: i64) -> Result<i64> {
        let conn = lock(&self.conn)?;
        let sum = conn.query_row(
            "SELECT COALESCE(SUM(point), 0) FROM point_submission WHERE connection_id = ?",
            [connection_id],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    /// Antal par som klarat utmaningen av alla par i trädet
    pub fn completion(&self, challenge_id: i64) -> Result<ChallengeCompletion> {
        let conn = lock(&self.conn)?;

        let tree_id: i64 = conn
            .query_row(
                "SELECT family_tree_id FROM challenges WHERE id = ?",
                [challenge_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| AppError::not_found(format!("utmaning {}", challenge_id)))?;

        let completed: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT connection_id) FROM point_submission WHERE challenge_id = ?",
            [challenge_id],
            |row| row.get(0),
        )?;
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM connections WHERE family_tree_id = ?",
            [tree_id],
            |row| row.get(0),
        )?;

        Ok(ChallengeCompletion { completed, total })
    }

    /// Räkna om alla kopplingars summor i ett träd från liggaren.
    /// Returnerar antalet rader som rättades.
    pub fn reconcile(&self, tree_id: i64) -> Result<usize> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let drifted: Vec<(i64, i64, i64)> = {
            let mut stmt = tx.prepare(
                "SELECT c.id, c.points, COALESCE(SUM(p.point), 0)
                 FROM connections c
                 LEFT JOIN point_submission p ON p.connection_id = c.id
                 WHERE c.family_tree_id = ?
                 GROUP BY c.id, c.points",
            )?;
            let rows = stmt
                .query_map([tree_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<rusqlite::Result<Vec<(i64, i64, i64)>>>()?;
            rows.into_iter().filter(|(_, cached, sum)| cached != sum).collect()
        };

        for (id, cached, sum) in &drifted {
            warn!("Koppling {} hade {} poäng, liggaren säger {}", id, cached, sum);
            tx.execute(
                "UPDATE connections SET points = ?1 WHERE id = ?2",
                params![sum, id],
            )?;
        }
        tx.commit()?;

        Ok(drifted.len())
    }

    fn row_to_challenge(row: &Row) -> rusqlite::Result<Challenge> {
        Ok(Challenge {
            id: row.get(0)?,
            family_tree_id: row.get(1)?,
            prompt: row.get(2)?,
            point_value: row.get(3)?,
            deadline: row.get(4)?,
        })
    }

    fn row_to_point(row: &Row) -> rusqlite::Result<PointSubmission> {
        Ok(PointSubmission {
            id: row.get(0)?,
            connection_id: row.get(1)?,
            challenge_id: row.get(2)?,
            prompt: row.get(3)?,
            point: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Connection as Edge, FamilyTree, Form, Organization, Question, QuestionType, TreeMember};

    fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let mut org = Organization::new("Org");
        let org_id = db.organizations().create(&mut org).unwrap();
        let mut form = Form::new(org_id, "Form");
        let form_id = db.forms().create(&mut form).unwrap();
        let mut q = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let question_id = db.forms().add_question(&mut q).unwrap();
        let mut tree = FamilyTree::new(form_id, question_id, "Träd");
        let tree_id = db.trees().create(&mut tree).unwrap();

        let mut big = TreeMember::new(tree_id, "Anna");
        let mut little = TreeMember::new(tree_id, "Bo");
        let big_id = db.trees().create_member(&mut big).unwrap();
        let little_id = db.trees().create_member(&mut little).unwrap();
        let connection_id = db
            .connections()
            .create(&mut Edge::new(tree_id, big_id, little_id))
            .unwrap();

        (db, tree_id, connection_id)
    }

    fn award(db: &Database, connection_id: i64, challenge_id: Option<i64>, point: i64) -> i64 {
        let mut p = PointSubmission {
            connection_id,
            challenge_id,
            prompt: "Fika".to_string(),
            point,
            ..Default::default()
        };
        db.challenges().insert_point_submission(&mut p).unwrap()
    }

    fn points(db: &Database, connection_id: i64) -> i64 {
        db.connections().find_by_id(connection_id).unwrap().unwrap().points
    }

    #[test]
    fn test_insert_and_delete_keep_total_in_sync() {
        let (db, _, connection_id) = setup();

        let a = award(&db, connection_id, None, 10);
        award(&db, connection_id, None, 5);
        assert_eq!(points(&db, connection_id), 15);

        assert_eq!(db.challenges().delete_point_submission(a).unwrap(), 10);
        assert_eq!(points(&db, connection_id), 5);
        assert_eq!(db.challenges().ledger_sum(connection_id).unwrap(), 5);
    }

    #[test]
    fn test_insert_for_missing_connection_rolls_back() {
        let (db, _, connection_id) = setup();
        let mut p = PointSubmission {
            connection_id: 9999,
            prompt: "X".to_string(),
            point: 3,
            ..Default::default()
        };

        assert!(db.challenges().insert_point_submission(&mut p).is_err());
        assert!(p.id.is_none());
        assert!(db.challenges().find_points_by_connection(9999).unwrap().is_empty());
        assert_eq!(points(&db, connection_id), 0);
    }

    #[test]
    fn test_delete_missing_point_submission_is_not_found() {
        let (db, _, _) = setup();
        let err = db.challenges().delete_point_submission(77).unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::NotFound(_))));
    }

    #[test]
    fn test_completion_counts_distinct_pairs() {
        let (db, tree_id, connection_id) = setup();
        let mut challenge = Challenge::new(tree_id, "Bowling", Some(20));
        let challenge_id = db.challenges().create(&mut challenge).unwrap();

        assert_eq!(db.challenges().completion(challenge_id).unwrap().percentage(), 0);

        award(&db, connection_id, Some(challenge_id), 20);
        award(&db, connection_id, Some(challenge_id), 20);

        let completion = db.challenges().completion(challenge_id).unwrap();
        assert_eq!(completion, ChallengeCompletion { completed: 1, total: 1 });
        assert_eq!(completion.percentage(), 100);
    }

    #[test]
    fn test_reconcile_repairs_drift() {
        let (db, tree_id, connection_id) = setup();
        award(&db, connection_id, None, 7);
        db.with_connection(|conn| {
            conn.execute("UPDATE connections SET points = 99 WHERE id = ?", [connection_id])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(db.challenges().reconcile(tree_id).unwrap(), 1);
        assert_eq!(points(&db, connection_id), 7);
        assert_eq!(db.challenges().reconcile(tree_id).unwrap(), 0);
    }

    #[test]
    fn test_deleting_challenge_keeps_awards() {
        let (db, tree_id, connection_id) = setup();
        let mut challenge = Challenge::new(tree_id, "Bowling", Some(20));
        let challenge_id = db.challenges().create(&mut challenge).unwrap();
        award(&db, connection_id, Some(challenge_id), 20);

        db.challenges().delete(challenge_id).unwrap();

        let ledger = db.challenges().find_points_by_connection(connection_id).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].challenge_id, None);
        assert_eq!(points(&db, connection_id), 20);
    }
}
