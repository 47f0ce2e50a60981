//! Besvara formulär via formulärkod

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::db::Database;
use crate::models::{Answer, Form, FormSubmission, Question, QuestionType};
use crate::utils::{date, AppError};

/// Kontrollera svar mot formulärets frågor.
///
/// Obesvarade frågor är tillåtna och tomma svar räknas som obesvarade.
/// Returnerar svaren i frågornas ordning, redo att sparas.
pub fn validate_answers(
    form: &Form,
    questions: &[Question],
    answers: &HashMap<i64, Answer>,
    today: NaiveDate,
) -> Result<Vec<(i64, Answer)>, AppError> {
    if !form.is_current_on(today) {
        return Err(AppError::validation("Formuläret är stängt för svar"));
    }

    if let Some(unknown) = answers
        .keys()
        .find(|id| !questions.iter().any(|q| q.id == Some(**id)))
    {
        return Err(AppError::validation(format!(
            "Fråga {} hör inte till formuläret",
            unknown
        )));
    }

    let mut accepted = Vec::new();
    for question in questions {
        let Some(question_id) = question.id else {
            continue;
        };
        let Some(answer) = answers.get(&question_id) else {
            continue;
        };
        if answer.is_empty() {
            continue;
        }

        let is_option = |id: &i64| question.options.iter().any(|o| o.id == Some(*id));

        let normalized = match (question.question_type, answer) {
            (QuestionType::SectionHeader, _) => {
                return Err(AppError::validation(format!(
                    "'{}' är en rubrik och kan inte besvaras",
                    question.prompt
                )));
            }
            (QuestionType::FreeResponse, Answer::Text(text)) => Answer::Text(text.trim().to_string()),
            (QuestionType::MultipleChoice, Answer::Choice(id)) if is_option(id) => Answer::Choice(*id),
            (QuestionType::MultipleChoice, Answer::Choices(ids)) if ids.len() == 1 && is_option(&ids[0]) => {
                Answer::Choice(ids[0])
            }
            (QuestionType::SelectAll, Answer::Choices(ids)) if ids.iter().all(is_option) => {
                let mut ids = ids.clone();
                ids.sort_unstable();
                ids.dedup();
                Answer::Choices(ids)
            }
            (QuestionType::SelectAll, Answer::Choice(id)) if is_option(id) => Answer::Choices(vec![*id]),
            _ => {
                return Err(AppError::validation(format!(
                    "Ogiltigt svar på '{}'",
                    question.prompt
                )));
            }
        };

        accepted.push((question_id, normalized));
    }

    Ok(accepted)
}

pub struct QuestionnaireService<'a> {
    db: &'a Database,
}

impl<'a> QuestionnaireService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Öppna ett formulär via dess kod
    pub fn open(&self, code: &str) -> Result<(Form, Vec<Question>)> {
        let form = self
            .db
            .forms()
            .find_by_code(code)?
            .ok_or_else(|| AppError::not_found(format!("Inget formulär med koden {}", code.trim())))?;
        let questions = match form.id {
            Some(id) => self.db.forms().find_questions(id)?,
            None => Vec::new(),
        };
        Ok((form, questions))
    }

    pub fn submit(&self, form_id: i64, answers: &HashMap<i64, Answer>) -> Result<FormSubmission> {
        self.submit_on(form_id, answers, date::today())
    }

    /// Skicka in svar; inskickning, svar och val sparas i en transaktion
    pub fn submit_on(
        &self,
        form_id: i64,
        answers: &HashMap<i64, Answer>,
        today: NaiveDate,
    ) -> Result<FormSubmission> {
        let form = self
            .db
            .forms()
            .find_by_id(form_id)?
            .ok_or_else(|| AppError::not_found(format!("formulär {}", form_id)))?;
        let questions = self.db.forms().find_questions(form_id)?;

        let accepted = match validate_answers(&form, &questions, answers, today) {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Svar på formulär {} avvisades: {}", form_id, e);
                return Err(e.into());
            }
        };

        let submission = self.db.submissions().create(form_id, &accepted)?;
        info!(
            "Ny inskickning {:?} till '{}' ({} svar)",
            submission.id,
            form.title,
            accepted.len()
        );
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Organization;

    struct Fixture {
        db: Database,
        form: Form,
        name: Question,
        size: Question,
        food: Question,
        header: Question,
    }

    fn setup(deadline: Option<NaiveDate>) -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let mut org = Organization::new("Org");
        let org_id = db.organizations().create(&mut org).unwrap();
        let mut form = Form::new(org_id, "Ansökan");
        form.deadline = deadline;
        db.forms().create(&mut form).unwrap();
        let form_id = form.id.unwrap();

        let mut header = Question::new(form_id, "Om dig", QuestionType::SectionHeader);
        let mut name = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let mut size = Question::new(form_id, "Storlek", QuestionType::MultipleChoice)
            .with_options(["S", "M", "L"]);
        let mut food = Question::new(form_id, "Mat", QuestionType::SelectAll)
            .with_options(["Vegetarisk", "Glutenfri"]);
        for q in [&mut header, &mut name, &mut size, &mut food] {
            db.forms().add_question(q).unwrap();
        }

        Fixture { db, form, name, size, food, header }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn opt(q: &Question, i: usize) -> i64 {
        q.options[i].id.unwrap()
    }

    #[test]
    fn test_open_by_code_is_case_insensitive() {
        let f = setup(None);
        let service = QuestionnaireService::new(&f.db);

        let (form, questions) = service.open(&f.form.code.to_lowercase()).unwrap();
        assert_eq!(form.id, f.form.id);
        assert_eq!(questions.len(), 4);

        let err = service.open("ZZZZZZ").unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::NotFound(_))));
    }

    #[test]
    fn test_valid_answers_are_stored() {
        let f = setup(None);
        let answers = HashMap::from([
            (f.name.id.unwrap(), Answer::Text(" Anna ".into())),
            (f.size.id.unwrap(), Answer::Choice(opt(&f.size, 1))),
            (f.food.id.unwrap(), Answer::Choices(vec![opt(&f.food, 1), opt(&f.food, 0), opt(&f.food, 1)])),
        ]);

        let submission = QuestionnaireService::new(&f.db)
            .submit(f.form.id.unwrap(), &answers)
            .unwrap();

        let responses = f.db.submissions().find_responses(submission.id.unwrap()).unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[2].selected_option_ids.len(), 2);
    }

    #[test]
    fn test_unanswered_questions_are_allowed() {
        let f = setup(None);
        let submission = QuestionnaireService::new(&f.db)
            .submit(f.form.id.unwrap(), &HashMap::new())
            .unwrap();
        assert!(f.db.submissions().find_responses(submission.id.unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_choice_rules() {
        let f = setup(None);
        let today = day("2024-09-01");

        let foreign_option = opt(&f.food, 0);
        let cases = [
            (f.size.id.unwrap(), Answer::Choices(vec![opt(&f.size, 0), opt(&f.size, 1)])),
            (f.size.id.unwrap(), Answer::Choice(foreign_option)),
            (f.name.id.unwrap(), Answer::Choice(opt(&f.size, 0))),
            (f.header.id.unwrap(), Answer::Text("x".into())),
            (9999, Answer::Text("x".into())),
        ];

        for (question_id, answer) in cases {
            let answers = HashMap::from([(question_id, answer)]);
            let result = validate_answers(&f.form, &[f.header.clone(), f.name.clone(), f.size.clone(), f.food.clone()], &answers, today);
            assert!(matches!(result, Err(AppError::Validation(_))), "fråga {}", question_id);
        }
    }

    #[test]
    fn test_submission_after_deadline_is_rejected() {
        let f = setup(Some(day("2024-09-01")));
        let service = QuestionnaireService::new(&f.db);
        let answers = HashMap::from([(f.name.id.unwrap(), Answer::Text("Bo".into()))]);

        assert!(service.submit_on(f.form.id.unwrap(), &answers, day("2024-09-01")).is_ok());

        let err = service
            .submit_on(f.form.id.unwrap(), &answers, day("2024-09-02"))
            .unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::Validation(_))));
        assert_eq!(f.db.submissions().count_by_form(f.form.id.unwrap()).unwrap(), 1);
    }
}
