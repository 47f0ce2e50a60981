use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{Answer, FormSubmission, Question, QuestionResponse, SubmissionView};

pub struct SubmissionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SubmissionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Spara en inskickning med alla svar i en transaktion.
    /// Svaren ska redan vara validerade mot formulärets frågor.
    pub fn create(&self, form_id: i64, answers: &[(i64, Answer)]) -> Result<FormSubmission> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        tx.execute("INSERT INTO form_submission (form_id) VALUES (?)", [form_id])?;
        let submission_id = tx.last_insert_rowid();

        for (question_id, answer) in answers {
            let text = match answer {
                Answer::Text(t) => Some(t.trim().to_string()),
                Answer::Choice(_) | Answer::Choices(_) => None,
            };

            tx.execute(
                "INSERT INTO question_response (form_submission_id, question_id, text) VALUES (?1, ?2, ?3)",
                params![submission_id, question_id, text],
            )?;
            let response_id = tx.last_insert_rowid();

            let selected: &[i64] = match answer {
                Answer::Text(_) => &[],
                Answer::Choice(id) => std::slice::from_ref(id),
                Answer::Choices(ids) => ids,
            };
            for option_id in selected {
                tx.execute(
                    "INSERT OR IGNORE INTO response_option_selection (question_response_id, question_option_id)
                     VALUES (?1, ?2)",
                    params![response_id, option_id],
                )?;
            }
        }

        let created_at: String = tx.query_row(
            "SELECT created_at FROM form_submission WHERE id = ?",
            [submission_id],
            |row| row.get(0),
        )?;

        tx.commit()?;

        Ok(FormSubmission {
            id: Some(submission_id),
            form_id,
            created_at: Some(created_at),
        })
    }

    pub fn find_by_form(&self, form_id: i64) -> Result<Vec<FormSubmission>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, form_id, created_at FROM form_submission WHERE form_id = ? ORDER BY id",
        )?;

        let submissions = stmt
            .query_map([form_id], |row| {
                Ok(FormSubmission {
                    id: row.get(0)?,
                    form_id: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(submissions)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<FormSubmission>> {
        let conn = lock(&self.conn)?;
        let submission = conn
            .query_row(
                "SELECT id, form_id, created_at FROM form_submission WHERE id = ?",
                [id],
                |row| {
                    Ok(FormSubmission {
                        id: row.get(0)?,
                        form_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(submission)
    }

    /// Hämta svaren för en inskickning, inklusive valda alternativ
    pub fn find_responses(&self, submission_id: i64) -> Result<Vec<QuestionResponse>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, form_submission_id, question_id, text
             FROM question_response WHERE form_submission_id = ? ORDER BY id",
        )?;
        let mut responses = stmt
            .query_map([submission_id], |row| {
                Ok(QuestionResponse {
                    id: row.get(0)?,
                    form_submission_id: row.get(1)?,
                    question_id: row.get(2)?,
                    text: row.get(3)?,
                    selected_option_ids: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT s.question_response_id, s.question_option_id
             FROM response_option_selection s
             JOIN question_response r ON r.id = s.question_response_id
             WHERE r.form_submission_id = ?
             ORDER BY s.id",
        )?;
        let mut selections: HashMap<i64, Vec<i64>> = HashMap::new();
        for row in stmt.query_map([submission_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))? {
            let (response_id, option_id) = row?;
            selections.entry(response_id).or_default().push(option_id);
        }

        for response in &mut responses {
            if let Some(id) = response.id {
                response.selected_option_ids = selections.remove(&id).unwrap_or_default();
            }
        }

        Ok(responses)
    }

    /// Bygg vyer med svar som text för alla inskickningar till ett formulär.
    /// Flervalssvar renderas som alternativens etiketter, kommaseparerade.
    pub fn find_views(&self, form_id: i64, questions: &[Question]) -> Result<Vec<SubmissionView>> {
        let conn = lock(&self.conn)?;

        let mut views: Vec<SubmissionView> = Vec::new();
        let mut index_by_id: HashMap<i64, usize> = HashMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT id, created_at FROM form_submission WHERE form_id = ? ORDER BY id",
            )?;
            let rows = stmt.query_map([form_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
            for row in rows {
                let (id, created_at) = row?;
                index_by_id.insert(id, views.len());
                views.push(SubmissionView {
                    submission_id: id,
                    created_at,
                    answers: HashMap::new(),
                });
            }
        }

        // Fritextsvar
        {
            let mut stmt = conn.prepare(
                "SELECT r.form_submission_id, r.question_id, r.text
                 FROM question_response r
                 JOIN form_submission s ON s.id = r.form_submission_id
                 WHERE s.form_id = ? AND r.text IS NOT NULL",
            )?;
            let rows = stmt.query_map([form_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?))
            })?;
            for row in rows {
                let (submission_id, question_id, text) = row?;
                if let Some(&i) = index_by_id.get(&submission_id) {
                    views[i].answers.insert(question_id, text);
                }
            }
        }

        // Valda alternativ, i alternativens ordning
        let option_labels: HashMap<i64, (&str, i32)> = questions
            .iter()
            .flat_map(|q| q.options.iter())
            .filter_map(|o| o.id.map(|id| (id, (o.label.as_str(), o.index))))
            .collect();

        let mut chosen: HashMap<(i64, i64), Vec<(i32, &str)>> = HashMap::new();
        {
            let mut stmt = conn.prepare(
                "SELECT r.form_submission_id, r.question_id, sel.question_option_id
                 FROM response_option_selection sel
                 JOIN question_response r ON r.id = sel.question_response_id
                 JOIN form_submission s ON s.id = r.form_submission_id
                 WHERE s.form_id = ?",
            )?;
            let rows = stmt.query_map([form_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
            })?;
            for row in rows {
                let (submission_id, question_id, option_id) = row?;
                if let Some(&(label, index)) = option_labels.get(&option_id) {
                    chosen
                        .entry((submission_id, question_id))
                        .or_default()
                        .push((index, label));
                }
            }
        }

        for ((submission_id, question_id), mut labels) in chosen {
            labels.sort();
            let text = labels
                .into_iter()
                .map(|(_, label)| label)
                .collect::<Vec<_>>()
                .join(", ");
            if let Some(&i) = index_by_id.get(&submission_id) {
                views[i].answers.insert(question_id, text);
            }
        }

        Ok(views)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = lock(&self.conn)?;
        let count = conn.query_row("SELECT COUNT(*) FROM form_submission", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_by_form(&self, form_id: i64) -> Result<i64> {
        let conn = lock(&self.conn)?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM form_submission WHERE form_id = ?",
            [form_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute("DELETE FROM form_submission WHERE id = ?", [id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::models::{Answer, Form, Organization, Question, QuestionType};

    fn setup() -> (Database, i64, Vec<Question>) {
        let db = Database::open_in_memory().unwrap();
        let mut org = Organization::new("Org");
        let org_id = db.organizations().create(&mut org).unwrap();
        let mut form = Form::new(org_id, "Enkät");
        let form_id = db.forms().create(&mut form).unwrap();

        let mut name = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let mut hobbies = Question::new(form_id, "Intressen", QuestionType::SelectAll)
            .with_options(["Musik", "Sport", "Spel"]);
        db.forms().add_question(&mut name).unwrap();
        db.forms().add_question(&mut hobbies).unwrap();

        (db, form_id, vec![name, hobbies])
    }

    #[test]
    fn test_create_and_read_responses() {
        let (db, form_id, questions) = setup();
        let name_id = questions[0].id.unwrap();
        let hobby_id = questions[1].id.unwrap();
        let sport = questions[1].options[1].id.unwrap();

        let submission = db
            .submissions()
            .create(
                form_id,
                &[
                    (name_id, Answer::Text(" Anna ".into())),
                    (hobby_id, Answer::Choices(vec![sport])),
                ],
            )
            .unwrap();

        let responses = db.submissions().find_responses(submission.id.unwrap()).unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].text.as_deref(), Some("Anna"));
        assert_eq!(responses[1].selected_option_ids, vec![sport]);
        assert_eq!(db.submissions().count_by_form(form_id).unwrap(), 1);
    }

    #[test]
    fn test_views_render_choices_in_option_order() {
        let (db, form_id, questions) = setup();
        let hobby = &questions[1];
        let musik = hobby.options[0].id.unwrap();
        let spel = hobby.options[2].id.unwrap();

        db.submissions()
            .create(form_id, &[(hobby.id.unwrap(), Answer::Choices(vec![spel, musik]))])
            .unwrap();

        let questions = db.forms().find_questions(form_id).unwrap();
        let views = db.submissions().find_views(form_id, &questions).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].answer(hobby.id.unwrap()), "Musik, Spel");
        assert_eq!(views[0].answer(questions[0].id.unwrap()), "");
    }

    #[test]
    fn test_delete_submission_cascades_responses() {
        let (db, form_id, questions) = setup();
        let submission = db
            .submissions()
            .create(form_id, &[(questions[0].id.unwrap(), Answer::Text("Bo".into()))])
            .unwrap();
        let id = submission.id.unwrap();

        db.submissions().delete(id).unwrap();

        assert!(db.submissions().find_by_id(id).unwrap().is_none());
        assert!(db.submissions().find_responses(id).unwrap().is_empty());
    }
}
