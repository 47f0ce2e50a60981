use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{FamilyTree, Form, TreeMember};
use crate::utils::AppError;

pub struct TreeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TreeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn find_all(&self) -> Result<Vec<FamilyTree>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, form_id, question_id, title, code, author_id, created_at
             FROM family_tree ORDER BY created_at DESC, id DESC",
        )?;

        let trees = stmt
            .query_map([], Self::row_to_tree)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trees)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<FamilyTree>> {
        let conn = lock(&self.conn)?;
        let tree = conn
            .query_row(
                "SELECT id, form_id, question_id, title, code, author_id, created_at
                 FROM family_tree WHERE id = ?",
                [id],
                Self::row_to_tree,
            )
            .optional()?;
        Ok(tree)
    }

    pub fn find_by_form(&self, form_id: i64) -> Result<Option<FamilyTree>> {
        let conn = lock(&self.conn)?;
        let tree = conn
            .query_row(
                "SELECT id, form_id, question_id, title, code, author_id, created_at
                 FROM family_tree WHERE form_id = ?",
                [form_id],
                Self::row_to_tree,
            )
            .optional()?;
        Ok(tree)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = lock(&self.conn)?;
        let count = conn.query_row("SELECT COUNT(*) FROM family_tree", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Skapa träd. Ett formulär kan ha högst ett träd; kontrollen görs i
    /// samma transaktion som insättningen.
    pub fn create(&self, tree: &mut FamilyTree) -> Result<i64> {
        tree.validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM family_tree WHERE form_id = ?)",
            [tree.form_id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(AppError::already_exists(format!(
                "Formuläret {} har redan ett fadderträd",
                tree.form_id
            ))
            .into());
        }

        let question_ok: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM question WHERE id = ?1 AND form_id = ?2)",
            params![tree.question_id, tree.form_id],
            |row| row.get(0),
        )?;
        if !question_ok {
            return Err(AppError::validation("Namnfrågan hör inte till formuläret").into());
        }

        if tree.code.trim().is_empty() {
            tree.code = Form::generate_code();
        }

        tx.execute(
            "INSERT INTO family_tree (form_id, question_id, title, code, author_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tree.form_id,
                tree.question_id,
                tree.title.trim(),
                tree.code,
                tree.author_id,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tree.id = Some(id);
        Ok(id)
    }

    /// Radera träd med medlemmar, kopplingar, utmaningar och poäng
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute("DELETE FROM family_tree WHERE id = ?", [id])?;
        Ok(())
    }

    // ------------------------------------------------------------
    // Medlemmar
    // ------------------------------------------------------------

    pub fn find_members(&self, tree_id: i64) -> Result<Vec<TreeMember>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, family_tree_id, identifier, position_x, position_y, is_big, form_submission_id
             FROM tree_member WHERE family_tree_id = ? ORDER BY id",
        )?;

        let members = stmt
            .query_map([tree_id], Self::row_to_member)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }

    pub fn find_member(&self, id: i64) -> Result<Option<TreeMember>> {
        let conn = lock(&self.conn)?;
        let member = conn
            .query_row(
                "SELECT id, family_tree_id, identifier, position_x, position_y, is_big, form_submission_id
                 FROM tree_member WHERE id = ?",
                [id],
                Self::row_to_member,
            )
            .optional()?;
        Ok(member)
    }

    pub fn create_member(&self, member: &mut TreeMember) -> Result<i64> {
        if member.identifier.trim().is_empty() {
            return Err(AppError::validation("Medlemmen måste ha ett namn").into());
        }

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO tree_member (family_tree_id, identifier, position_x, position_y, is_big, form_submission_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                member.family_tree_id,
                member.identifier.trim(),
                member.position_x,
                member.position_y,
                member.is_big,
                member.form_submission_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        member.id = Some(id);
        Ok(id)
    }

    pub fn update_position(&self, id: i64, x: f32, y: f32) -> Result<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "UPDATE tree_member SET position_x = ?1, position_y = ?2 WHERE id = ?3",
            params![x, y, id],
        )?;
        if rows == 0 {
            return Err(AppError::not_found(format!("medlem {}", id)).into());
        }
        Ok(())
    }

    /// Skriv flera positioner i en transaktion (automatisk layout)
    pub fn update_positions(&self, positions: &[(i64, f32, f32)]) -> Result<()> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "UPDATE tree_member SET position_x = ?1, position_y = ?2 WHERE id = ?3",
            )?;
            for (id, x, y) in positions {
                stmt.execute(params![x, y, id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn set_is_big(&self, id: i64, is_big: bool) -> Result<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "UPDATE tree_member SET is_big = ?1 WHERE id = ?2",
            params![is_big, id],
        )?;
        if rows == 0 {
            return Err(AppError::not_found(format!("medlem {}", id)).into());
        }
        Ok(())
    }

    /// Radera medlem; kopplingar och deras poäng följer med via CASCADE
    pub fn delete_member(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute("DELETE FROM tree_member WHERE id = ?", [id])?;
        Ok(())
    }

    /// Inskickningar som redan har en nod i trädet
    pub fn member_submission_ids(&self, tree_id: i64) -> Result<HashSet<i64>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT form_submission_id FROM tree_member
             WHERE family_tree_id = ? AND form_submission_id IS NOT NULL",
        )?;
        let ids = stmt
            .query_map([tree_id], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;
        Ok(ids)
    }

    fn row_to_tree(row: &Row) -> rusqlite::Result<FamilyTree> {
        Ok(FamilyTree {
            id: row.get(0)?,
            form_id: row.get(1)?,
            question_id: row.get(2)?,
            title: row.get(3)?,
            code: row.get(4)?,
            author_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn row_to_member(row: &Row) -> rusqlite::Result<TreeMember> {
        Ok(TreeMember {
            id: row.get(0)?,
            family_tree_id: row.get(1)?,
            identifier: row.get(2)?,
            position_x: row.get(3)?,
            position_y: row.get(4)?,
            is_big: row.get(5)?,
            form_submission_id: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Organization, Question, QuestionType};

    fn setup_form(db: &Database) -> (i64, i64) {
        let mut org = Organization::new("Org");
        let org_id = db.organizations().create(&mut org).unwrap();
        let mut form = Form::new(org_id, "Rekrytering");
        let form_id = db.forms().create(&mut form).unwrap();
        let mut q = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let question_id = db.forms().add_question(&mut q).unwrap();
        (form_id, question_id)
    }

    #[test]
    fn test_second_tree_for_form_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let (form_id, question_id) = setup_form(&db);

        let mut first = FamilyTree::new(form_id, question_id, "Träd 1");
        db.trees().create(&mut first).unwrap();

        let mut second = FamilyTree::new(form_id, question_id, "Träd 2");
        let err = db.trees().create(&mut second).unwrap_err();

        assert!(matches!(AppError::find(&err), Some(AppError::AlreadyExists(_))));
        assert!(second.id.is_none());
        assert_eq!(db.trees().count().unwrap(), 1);
        assert_eq!(db.trees().find_by_form(form_id).unwrap().unwrap().title, "Träd 1");
    }

    #[test]
    fn test_question_must_belong_to_form() {
        let db = Database::open_in_memory().unwrap();
        let (form_id, _) = setup_form(&db);

        let mut tree = FamilyTree::new(form_id, 9999, "Träd");
        let err = db.trees().create(&mut tree).unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::Validation(_))));
    }

    #[test]
    fn test_members_positions_and_big_flag() {
        let db = Database::open_in_memory().unwrap();
        let (form_id, question_id) = setup_form(&db);
        let mut tree = FamilyTree::new(form_id, question_id, "Träd");
        let tree_id = db.trees().create(&mut tree).unwrap();

        let mut anna = TreeMember::new(tree_id, "Anna").at(10.0, 20.0);
        let id = db.trees().create_member(&mut anna).unwrap();

        db.trees().update_position(id, 300.0, 150.0).unwrap();
        db.trees().set_is_big(id, true).unwrap();

        let loaded = db.trees().find_member(id).unwrap().unwrap();
        assert_eq!((loaded.position_x, loaded.position_y), (300.0, 150.0));
        assert!(loaded.is_big);

        let err = db.trees().update_position(4242, 0.0, 0.0).unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::NotFound(_))));
    }

    #[test]
    fn test_delete_tree_cascades_members() {
        let db = Database::open_in_memory().unwrap();
        let (form_id, question_id) = setup_form(&db);
        let mut tree = FamilyTree::new(form_id, question_id, "Träd");
        let tree_id = db.trees().create(&mut tree).unwrap();
        let mut m = TreeMember::new(tree_id, "Bo");
        let member_id = db.trees().create_member(&mut m).unwrap();

        db.trees().delete(tree_id).unwrap();

        assert!(db.trees().find_member(member_id).unwrap().is_none());
        assert!(db.trees().find_by_form(form_id).unwrap().is_none());
    }
}
