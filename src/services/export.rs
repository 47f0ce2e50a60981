//! Export-tjänst för inskickade svar och topplistor (CSV, JSON)

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::path::Path;

use crate::db::Database;
use crate::models::{Question, QuestionType, SubmissionView};
use crate::utils::AppError;

/// Kolumnrubrik för inskickningstiden
pub const SUBMITTED_HEADER: &str = "Inskickad";

/// Exportformat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Csv => "CSV",
        }
    }
}

/// Vad som exporteras
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    /// Alla inskickningar till ett formulär
    Submissions { form_id: i64 },
    /// Paren i ett fadderträd, sorterade efter poäng
    Leaderboard { tree_id: i64 },
}

impl ReportType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ReportType::Submissions { .. } => "Svar",
            ReportType::Leaderboard { .. } => "Topplista",
        }
    }

    pub fn filename_prefix(&self) -> &'static str {
        match self {
            ReportType::Submissions { .. } => "svar",
            ReportType::Leaderboard { .. } => "topplista",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnswerExport {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SubmissionExport {
    pub submission_id: i64,
    pub submitted_at: String,
    pub answers: Vec<AnswerExport>,
}

#[derive(Debug, Serialize)]
pub struct PairExport {
    pub big: String,
    pub little: String,
    pub points: i64,
}

/// Export-tjänst
pub struct ExportService<'a> {
    db: &'a Database,
}

impl<'a> ExportService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Generera filnamn för export
    pub fn generate_filename(title: &str, report_type: ReportType, format: ExportFormat) -> String {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let title = crate::utils::path::sanitize_filename(title);
        format!(
            "{}_{}_{}.{}",
            title,
            report_type.filename_prefix(),
            timestamp,
            format.extension()
        )
    }

    /// Exportera till fil
    pub fn export_to_file(
        &self,
        report_type: ReportType,
        format: ExportFormat,
        path: &Path,
    ) -> Result<ExportResult> {
        let (content, row_count) = self.render(report_type, format)?;

        std::fs::write(path, &content).context("Kunde inte skriva fil")?;

        Ok(ExportResult {
            report_type,
            format,
            row_count,
            file_size: content.len(),
        })
    }

    /// Rendera exporten som text, med antal rader
    pub fn render(&self, report_type: ReportType, format: ExportFormat) -> Result<(String, usize)> {
        match report_type {
            ReportType::Submissions { form_id } => {
                let questions = self.exported_questions(form_id)?;
                let all_questions = self.db.forms().find_questions(form_id)?;
                let views = self.db.submissions().find_views(form_id, &all_questions)?;
                let content = match format {
                    ExportFormat::Csv => Self::submissions_to_csv(&questions, &views),
                    ExportFormat::Json => {
                        let rows: Vec<SubmissionExport> = views
                            .iter()
                            .map(|v| Self::submission_export(&questions, v))
                            .collect();
                        serde_json::to_string_pretty(&rows).context("JSON serialisering misslyckades")?
                    }
                };
                Ok((content, views.len()))
            }
            ReportType::Leaderboard { tree_id } => {
                let pairs: Vec<PairExport> = self
                    .db
                    .connections()
                    .find_views_by_tree(tree_id)?
                    .into_iter()
                    .map(|c| PairExport {
                        big: c.big_name,
                        little: c.little_name,
                        points: c.points,
                    })
                    .collect();
                let content = match format {
                    ExportFormat::Csv => Self::pairs_to_csv(&pairs),
                    ExportFormat::Json => {
                        serde_json::to_string_pretty(&pairs).context("JSON serialisering misslyckades")?
                    }
                };
                Ok((content, pairs.len()))
            }
        }
    }

    /// Frågor som blir kolumner (rubriker utelämnas)
    fn exported_questions(&self, form_id: i64) -> Result<Vec<Question>> {
        if self.db.forms().find_by_id(form_id)?.is_none() {
            return Err(AppError::not_found(format!("formulär {}", form_id)).into());
        }
        Ok(self
            .db
            .forms()
            .find_questions(form_id)?
            .into_iter()
            .filter(|q| q.question_type != QuestionType::SectionHeader)
            .collect())
    }

    fn submission_export(questions: &[Question], view: &SubmissionView) -> SubmissionExport {
        SubmissionExport {
            submission_id: view.submission_id,
            submitted_at: view.created_at.clone(),
            answers: questions
                .iter()
                .map(|q| AnswerExport {
                    question: q.prompt.clone(),
                    answer: q.id.map(|id| view.answer(id).to_string()).unwrap_or_default(),
                })
                .collect(),
        }
    }

    /// Konvertera inskickningar till CSV
    pub fn submissions_to_csv(questions: &[Question], views: &[SubmissionView]) -> String {
        let mut csv = String::new();

        // Header
        let header: Vec<String> = std::iter::once(SUBMITTED_HEADER.to_string())
            .chain(questions.iter().map(|q| Self::csv_escape(&q.prompt)))
            .collect();
        csv.push_str(&header.join(","));
        csv.push('\n');

        // Rader
        for view in views {
            let row: Vec<String> = std::iter::once(Self::csv_escape(&view.created_at))
                .chain(questions.iter().map(|q| {
                    Self::csv_escape(q.id.map(|id| view.answer(id)).unwrap_or(""))
                }))
                .collect();
            csv.push_str(&row.join(","));
            csv.push('\n');
        }

        csv
    }

    fn pairs_to_csv(pairs: &[PairExport]) -> String {
        let mut csv = String::new();

        csv.push_str("Big,Little,Poäng\n");
        for p in pairs {
            csv.push_str(&format!(
                "{},{},{}\n",
                Self::csv_escape(&p.big),
                Self::csv_escape(&p.little),
                p.points,
            ));
        }

        csv
    }

    /// Escape CSV-värde
    pub fn csv_escape(value: &str) -> String {
        if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }
}

/// Resultat av export
#[derive(Debug)]
pub struct ExportResult {
    pub report_type: ReportType,
    pub format: ExportFormat,
    pub row_count: usize,
    pub file_size: usize,
}

impl ExportResult {
    pub fn summary(&self) -> String {
        format!(
            "{} exporterad som {}: {} rader, {} bytes",
            self.report_type.display_name(),
            self.format.display_name(),
            self.row_count,
            self.file_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, Form, Organization};

    /// Minimal CSV-läsare för att kontrollera escaping
    fn parse_csv_line(line: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match (c, in_quotes) {
                ('"', true) if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                ('"', true) => in_quotes = false,
                ('"', false) if field.is_empty() => in_quotes = true,
                (',', false) => fields.push(std::mem::take(&mut field)),
                (c, _) => field.push(c),
            }
        }
        fields.push(field);
        fields
    }

    fn setup() -> (Database, i64, Vec<Question>) {
        let db = Database::open_in_memory().unwrap();
        let mut org = Organization::new("Org");
        let org_id = db.organizations().create(&mut org).unwrap();
        let mut form = Form::new(org_id, "Ansökan");
        let form_id = db.forms().create(&mut form).unwrap();

        let mut header = Question::new(form_id, "Del 1", QuestionType::SectionHeader);
        let mut name = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let mut food = Question::new(form_id, "Mat, dryck", QuestionType::SelectAll)
            .with_options(["Kaffe", "Te"]);
        for q in [&mut header, &mut name, &mut food] {
            db.forms().add_question(q).unwrap();
        }

        (db, form_id, vec![header, name, food])
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(ExportService::csv_escape("hello"), "hello");
        assert_eq!(ExportService::csv_escape("hello,world"), "\"hello,world\"");
        assert_eq!(
            ExportService::csv_escape("say \"hello\""),
            "\"say \"\"hello\"\"\""
        );
    }

    #[test]
    fn test_escaped_fields_parse_back() {
        for original in ["A,B", "säger \"hej\"", "vanlig", "\"\",\""] {
            let escaped = ExportService::csv_escape(original);
            assert_eq!(parse_csv_line(&escaped), vec![original.to_string()]);
        }
    }

    #[test]
    fn test_submissions_csv_skips_section_headers() {
        let (db, form_id, questions) = setup();
        let kaffe = questions[2].options[0].id.unwrap();
        let te = questions[2].options[1].id.unwrap();
        db.submissions()
            .create(
                form_id,
                &[
                    (questions[1].id.unwrap(), Answer::Text("A,B".into())),
                    (questions[2].id.unwrap(), Answer::Choices(vec![kaffe, te])),
                ],
            )
            .unwrap();

        let (csv, rows) = ExportService::new(&db)
            .render(ReportType::Submissions { form_id }, ExportFormat::Csv)
            .unwrap();
        assert_eq!(rows, 1);

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(parse_csv_line(lines[0]), vec!["Inskickad", "Namn", "Mat, dryck"]);
        let row = parse_csv_line(lines[1]);
        assert_eq!(row.len(), 3);
        assert_eq!(row[1], "A,B");
        assert_eq!(row[2], "Kaffe, Te");
    }

    #[test]
    fn test_export_json_to_file() {
        let (db, form_id, questions) = setup();
        db.submissions()
            .create(form_id, &[(questions[1].id.unwrap(), Answer::Text("Bo".into()))])
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svar.json");

        let result = ExportService::new(&db)
            .export_to_file(ReportType::Submissions { form_id }, ExportFormat::Json, &path)
            .unwrap();

        assert_eq!(result.row_count, 1);
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["answers"][0]["question"], "Namn");
        assert_eq!(parsed[0]["answers"][0]["answer"], "Bo");
        assert_eq!(parsed[0]["answers"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_form_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = ExportService::new(&db)
            .render(ReportType::Submissions { form_id: 42 }, ExportFormat::Csv)
            .unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::NotFound(_))));
    }

    #[test]
    fn test_generate_filename() {
        let filename = ExportService::generate_filename(
            "Höst",
            ReportType::Submissions { form_id: 1 },
            ExportFormat::Csv,
        );
        assert!(filename.contains("_svar_"));
        assert!(filename.ends_with(".csv"));

        let filename = ExportService::generate_filename(
            "Träd",
            ReportType::Leaderboard { tree_id: 1 },
            ExportFormat::Json,
        );
        assert!(filename.contains("_topplista_"));
        assert!(filename.ends_with(".json"));
    }
}
