use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{Form, Question, QuestionOption, QuestionType};
use crate::utils::AppError;

const FORM_COLUMNS: &str = "id, organization_id, title, description, deadline, code, created_at";

pub struct FormRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FormRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    // ------------------------------------------------------------
    // Formulär
    // ------------------------------------------------------------

    /// Hämta alla formulär, nyast först
    pub fn find_all(&self) -> Result<Vec<Form>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM form ORDER BY created_at DESC, id DESC",
            FORM_COLUMNS
        ))?;

        let forms = stmt
            .query_map([], Self::row_to_form)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(forms)
    }

    /// Formulär utan deadline eller med deadline idag eller senare
    pub fn find_current(&self, today: NaiveDate) -> Result<Vec<Form>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM form
             WHERE deadline IS NULL OR deadline >= ?
             ORDER BY deadline IS NULL, deadline, id DESC",
            FORM_COLUMNS
        ))?;

        let forms = stmt
            .query_map([today], Self::row_to_form)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(forms)
    }

    /// Formulär vars deadline har passerat
    pub fn find_past(&self, today: NaiveDate) -> Result<Vec<Form>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM form WHERE deadline < ? ORDER BY deadline DESC, id DESC",
            FORM_COLUMNS
        ))?;

        let forms = stmt
            .query_map([today], Self::row_to_form)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(forms)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Form>> {
        let conn = lock(&self.conn)?;
        let form = conn
            .query_row(
                &format!("SELECT {} FROM form WHERE id = ?", FORM_COLUMNS),
                [id],
                Self::row_to_form,
            )
            .optional()?;
        Ok(form)
    }

    /// Slå upp formulär via publik kod (skiftlägesokänsligt)
    pub fn find_by_code(&self, code: &str) -> Result<Option<Form>> {
        let conn = lock(&self.conn)?;
        let form = conn
            .query_row(
                &format!("SELECT {} FROM form WHERE code = ?", FORM_COLUMNS),
                [code.trim().to_uppercase()],
                Self::row_to_form,
            )
            .optional()?;
        Ok(form)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = lock(&self.conn)?;
        let count = conn.query_row("SELECT COUNT(*) FROM form", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Skapa formulär; en kod genereras om den saknas
    pub fn create(&self, form: &mut Form) -> Result<i64> {
        let conn = lock(&self.conn)?;

        if form.code.trim().is_empty() {
            form.code = Self::unique_code(&conn)?;
        } else {
            form.code = form.code.trim().to_uppercase();
        }

        conn.execute(
            "INSERT INTO form (organization_id, title, description, deadline, code)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                form.organization_id,
                form.title.trim(),
                form.description,
                form.deadline,
                form.code,
            ],
        )?;

        let id = conn.last_insert_rowid();
        form.id = Some(id);
        Ok(id)
    }

    fn unique_code(conn: &Connection) -> Result<String> {
        for _ in 0..10 {
            let code = Form::generate_code();
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM form WHERE code = ?)",
                [&code],
                |row| row.get(0),
            )?;
            if !taken {
                return Ok(code);
            }
        }
        Err(AppError::other("Kunde inte generera en unik formulärkod").into())
    }

    /// Uppdatera titel, beskrivning och deadline
    pub fn update(&self, form: &Form) -> Result<()> {
        let id = form
            .id
            .ok_or_else(|| AppError::validation("Formuläret saknar id"))?;

        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "UPDATE form SET title = ?1, description = ?2, deadline = ?3 WHERE id = ?4",
            params![form.title.trim(), form.description, form.deadline, id],
        )?;

        if rows == 0 {
            return Err(AppError::not_found(format!("formulär {}", id)).into());
        }
        Ok(())
    }

    /// Radera formulär; frågor, inskickningar och träd försvinner via CASCADE
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute("DELETE FROM form WHERE id = ?", [id])?;
        Ok(())
    }

    // ------------------------------------------------------------
    // Frågor
    // ------------------------------------------------------------

    /// Hämta formulärets frågor i visningsordning, med svarsalternativ
    pub fn find_questions(&self, form_id: i64) -> Result<Vec<Question>> {
        let conn = lock(&self.conn)?;

        let mut stmt = conn.prepare(
            "SELECT id, form_id, prompt, type, \"index\", description
             FROM question WHERE form_id = ? ORDER BY \"index\", id",
        )?;
        let mut questions = stmt
            .query_map([form_id], Self::row_to_question)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT o.id, o.question_id, o.label, o.\"index\"
             FROM question_option o
             JOIN question q ON q.id = o.question_id
             WHERE q.form_id = ?
             ORDER BY o.\"index\", o.id",
        )?;
        let mut by_question: HashMap<i64, Vec<QuestionOption>> = HashMap::new();
        for option in stmt.query_map([form_id], Self::row_to_option)? {
            let option = option?;
            by_question.entry(option.question_id).or_default().push(option);
        }

        for question in &mut questions {
            if let Some(id) = question.id {
                question.options = by_question.remove(&id).unwrap_or_default();
            }
        }

        Ok(questions)
    }

    pub fn find_question(&self, id: i64) -> Result<Option<Question>> {
        let conn = lock(&self.conn)?;
        let question = conn
            .query_row(
                "SELECT id, form_id, prompt, type, \"index\", description FROM question WHERE id = ?",
                [id],
                Self::row_to_question,
            )
            .optional()?;

        let Some(mut question) = question else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, question_id, label, \"index\" FROM question_option
             WHERE question_id = ? ORDER BY \"index\", id",
        )?;
        question.options = stmt
            .query_map([id], Self::row_to_option)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(question))
    }

    /// Lägg till fråga sist i formuläret
    pub fn add_question(&self, question: &mut Question) -> Result<i64> {
        question
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let next_index: i32 = tx.query_row(
            "SELECT COALESCE(MAX(\"index\") + 1, 0) FROM question WHERE form_id = ?",
            [question.form_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO question (form_id, prompt, type, \"index\", description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                question.form_id,
                question.prompt.trim(),
                question.question_type.as_db_str(),
                next_index,
                question.description,
            ],
        )?;
        let id = tx.last_insert_rowid();

        for (i, option) in question.options.iter_mut().enumerate() {
            option.question_id = id;
            option.index = i as i32;
            tx.execute(
                "INSERT INTO question_option (question_id, label, \"index\") VALUES (?1, ?2, ?3)",
                params![id, option.label.trim(), option.index],
            )?;
            option.id = Some(tx.last_insert_rowid());
        }

        tx.commit()?;

        question.id = Some(id);
        question.index = next_index;
        Ok(id)
    }

    /// Uppdatera frågetext, beskrivning och svarsalternativ.
    /// Alternativ utan id skapas, alternativ som saknas i listan raderas.
    pub fn update_question(&self, question: &mut Question) -> Result<()> {
        let id = question
            .id
            .ok_or_else(|| AppError::validation("Frågan saknar id"))?;
        question
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE question SET prompt = ?1, description = ?2 WHERE id = ?3",
            params![question.prompt.trim(), question.description, id],
        )?;
        if rows == 0 {
            return Err(AppError::not_found(format!("fråga {}", id)).into());
        }

        let kept: Vec<i64> = question.options.iter().filter_map(|o| o.id).collect();
        let existing: Vec<i64> = {
            let mut stmt = tx.prepare("SELECT id FROM question_option WHERE question_id = ?")?;
            let ids = stmt
                .query_map([id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            ids
        };
        for removed in existing.iter().filter(|e| !kept.contains(*e)) {
            tx.execute("DELETE FROM question_option WHERE id = ?", [removed])?;
        }

        for (i, option) in question.options.iter_mut().enumerate() {
            option.question_id = id;
            option.index = i as i32;
            match option.id {
                Some(option_id) => {
                    tx.execute(
                        "UPDATE question_option SET label = ?1, \"index\" = ?2 WHERE id = ?3",
                        params![option.label.trim(), option.index, option_id],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO question_option (question_id, label, \"index\") VALUES (?1, ?2, ?3)",
                        params![id, option.label.trim(), option.index],
                    )?;
                    option.id = Some(tx.last_insert_rowid());
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    pub fn delete_question(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute("DELETE FROM question WHERE id = ?", [id])?;
        Ok(())
    }

    fn row_to_form(row: &Row) -> rusqlite::Result<Form> {
        Ok(Form {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            deadline: row.get(4)?,
            code: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn row_to_question(row: &Row) -> rusqlite::Result<Question> {
        let type_str: String = row.get(3)?;
        Ok(Question {
            id: row.get(0)?,
            form_id: row.get(1)?,
            prompt: row.get(2)?,
            question_type: QuestionType::from_db_str(&type_str).unwrap_or_default(),
            index: row.get(4)?,
            description: row.get(5)?,
            options: Vec::new(),
        })
    }

    fn row_to_option(row: &Row) -> rusqlite::Result<QuestionOption> {
        Ok(QuestionOption {
            id: row.get(0)?,
            question_id: row.get(1)?,
            label: row.get(2)?,
            index: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Organization;

    fn setup_db() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let mut org = Organization::new("Org");
        let org_id = db.organizations().create(&mut org).unwrap();
        (db, org_id)
    }

    #[test]
    fn test_create_and_find_by_code() {
        let (db, org_id) = setup_db();

        let mut form = Form::new(org_id, "Höstrekrytering");
        let id = db.forms().create(&mut form).unwrap();
        assert_eq!(form.code.len(), 6);

        let found = db.forms().find_by_code(&form.code.to_lowercase()).unwrap().unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.title, "Höstrekrytering");
        assert!(db.forms().find_by_code("NOPE00").unwrap().is_none());
    }

    #[test]
    fn test_current_and_past() {
        let (db, org_id) = setup_db();
        let today = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();

        let mut open = Form::new(org_id, "Öppen");
        db.forms().create(&mut open).unwrap();

        let mut closing = Form::new(org_id, "Stänger idag");
        closing.deadline = Some(today);
        db.forms().create(&mut closing).unwrap();

        let mut closed = Form::new(org_id, "Stängd");
        closed.deadline = NaiveDate::from_ymd_opt(2024, 8, 1);
        db.forms().create(&mut closed).unwrap();

        let current: Vec<String> = db
            .forms()
            .find_current(today)
            .unwrap()
            .into_iter()
            .map(|f| f.title)
            .collect();
        assert_eq!(current, vec!["Stänger idag", "Öppen"]);

        let past = db.forms().find_past(today).unwrap();
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].title, "Stängd");
    }

    #[test]
    fn test_update_missing_form_is_not_found() {
        let (db, org_id) = setup_db();
        let mut form = Form::new(org_id, "Saknas");
        form.id = Some(999);

        let err = db.forms().update(&form).unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::NotFound(_))));
    }

    #[test]
    fn test_questions_are_appended_in_order() {
        let (db, org_id) = setup_db();
        let mut form = Form::new(org_id, "Enkät");
        let form_id = db.forms().create(&mut form).unwrap();

        let mut q1 = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let mut q2 = Question::new(form_id, "Årskurs", QuestionType::MultipleChoice)
            .with_options(["Ettan", "Tvåan", "Trean"]);
        db.forms().add_question(&mut q1).unwrap();
        db.forms().add_question(&mut q2).unwrap();

        let questions = db.forms().find_questions(form_id).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].prompt, "Namn");
        assert_eq!(questions[0].index, 0);
        assert_eq!(questions[1].index, 1);
        let labels: Vec<&str> = questions[1].options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Ettan", "Tvåan", "Trean"]);
    }

    #[test]
    fn test_invalid_question_is_rejected_before_write() {
        let (db, org_id) = setup_db();
        let mut form = Form::new(org_id, "Enkät");
        let form_id = db.forms().create(&mut form).unwrap();

        let mut q = Question::new(form_id, "Välj", QuestionType::SelectAll);
        let err = db.forms().add_question(&mut q).unwrap_err();

        assert!(matches!(AppError::find(&err), Some(AppError::Validation(_))));
        assert!(db.forms().find_questions(form_id).unwrap().is_empty());
    }

    #[test]
    fn test_update_question_options() {
        let (db, org_id) = setup_db();
        let mut form = Form::new(org_id, "Enkät");
        let form_id = db.forms().create(&mut form).unwrap();

        let mut q = Question::new(form_id, "Färg", QuestionType::MultipleChoice)
            .with_options(["Röd", "Grön"]);
        let qid = db.forms().add_question(&mut q).unwrap();

        // Byt namn på första, ta bort andra, lägg till ny
        q.options.truncate(1);
        q.options[0].label = "Karmosin".into();
        q.options.push(QuestionOption {
            label: "Blå".into(),
            ..Default::default()
        });
        db.forms().update_question(&mut q).unwrap();

        let loaded = db.forms().find_question(qid).unwrap().unwrap();
        let labels: Vec<&str> = loaded.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Karmosin", "Blå"]);
    }

    #[test]
    fn test_delete_form_cascades_questions() {
        let (db, org_id) = setup_db();
        let mut form = Form::new(org_id, "Enkät");
        let form_id = db.forms().create(&mut form).unwrap();
        let mut q = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let qid = db.forms().add_question(&mut q).unwrap();

        db.forms().delete(form_id).unwrap();

        assert!(db.forms().find_by_id(form_id).unwrap().is_none());
        assert!(db.forms().find_question(qid).unwrap().is_none());
    }
}
