use egui::{self, RichText};
use egui_extras::{Column, TableBuilder};

use crate::db::Database;
use crate::models::{FamilyTree, Form, Question, QuestionType, SubmissionView};
use crate::services::{ExportFormat, ExportService, ReportType};
use crate::ui::{
    state::{AppState, ConfirmAction},
    theme::{Colors, Icons},
    View,
};
use crate::utils::date;

pub struct FormDetailView {
    form: Option<Form>,
    questions: Vec<Question>,
    submissions: Vec<SubmissionView>,
    tree: Option<FamilyTree>,
    loaded_form_id: Option<i64>,
    needs_refresh: bool,
}

impl FormDetailView {
    pub fn new() -> Self {
        Self {
            form: None,
            questions: Vec::new(),
            submissions: Vec::new(),
            tree: None,
            loaded_form_id: None,
            needs_refresh: true,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database) {
        let Some(form_id) = state.selected_form_id else {
            ui.label("Inget formulär valt");
            return;
        };

        if self.needs_refresh || self.loaded_form_id != Some(form_id) {
            self.load(form_id, db);
            self.needs_refresh = false;
        }

        let Some(form) = self.form.clone() else {
            ui.label(RichText::new("Formuläret hittades inte").color(Colors::ERROR));
            if ui.button(format!("{} Tillbaka", Icons::ARROW_LEFT)).clicked() {
                state.navigate(View::FormList);
            }
            return;
        };

        egui::ScrollArea::vertical().show(ui, |ui| {
            self.show_header(ui, state, &form);

            ui.add_space(16.0);
            ui.separator();

            self.show_questions(ui, state);

            ui.add_space(16.0);
            ui.separator();

            self.show_submissions(ui, state, db, &form);
        });
    }

    fn show_header(&self, ui: &mut egui::Ui, state: &mut AppState, form: &Form) {
        ui.horizontal(|ui| {
            if ui.button(Icons::ARROW_LEFT).on_hover_text("Tillbaka").clicked() {
                state.navigate(View::FormList);
            }
            ui.heading(&form.title);

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(form_id) = form.id {
                    if ui.button(format!("{} Redigera", Icons::EDIT)).clicked() {
                        state.open_edit_form(form_id);
                    }
                }
                if ui.button(format!("{} Fyll i", Icons::QUESTIONNAIRE)).clicked() {
                    state.open_questionnaire(&form.code);
                }
                match self.tree.as_ref().and_then(|t| t.id) {
                    Some(tree_id) => {
                        if ui.button(format!("{} Öppna fadderträd", Icons::TREE)).clicked() {
                            state.navigate_to_tree(tree_id);
                        }
                    }
                    None => {
                        if ui.button(format!("{} Skapa fadderträd", Icons::TREE)).clicked() {
                            state.show_tree_form = true;
                        }
                    }
                }
            });
        });

        ui.horizontal(|ui| {
            ui.label(RichText::new("Kod:").color(Colors::TEXT_SECONDARY));
            ui.label(RichText::new(&form.code).monospace().strong());
            if ui.small_button("📋").on_hover_text("Kopiera kod").clicked() {
                ui.ctx().copy_text(form.code.clone());
            }

            ui.separator();

            ui.label(RichText::new(Icons::CALENDAR).color(Colors::TEXT_SECONDARY));
            match form.deadline {
                Some(deadline) => {
                    let color = if form.is_current() { Colors::TEXT_SECONDARY } else { Colors::WARNING };
                    ui.label(RichText::new(date::deadline_display(deadline, date::today())).color(color));
                }
                None => {
                    ui.label(RichText::new("Ingen deadline").color(Colors::TEXT_MUTED));
                }
            }
        });

        if let Some(ref description) = form.description {
            ui.add_space(4.0);
            ui.label(description);
        }
    }

    fn show_questions(&self, ui: &mut egui::Ui, state: &mut AppState) {
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("Frågor ({})", self.questions.len())).size(18.0).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(format!("{} Ny fråga", Icons::ADD)).clicked() {
                    state.open_new_question();
                }
            });
        });

        ui.add_space(8.0);

        if self.questions.is_empty() {
            ui.label(RichText::new("Formuläret har inga frågor ännu").color(Colors::TEXT_SECONDARY));
            return;
        }

        let name_question = self.tree.as_ref().map(|t| t.question_id);

        for question in &self.questions {
            let Some(question_id) = question.id else {
                continue;
            };

            ui.horizontal(|ui| {
                if question.question_type == QuestionType::SectionHeader {
                    ui.label(RichText::new(&question.prompt).size(16.0).strong());
                } else {
                    ui.label(format!("{}.", question.index + 1));
                    ui.label(&question.prompt);
                    ui.label(
                        RichText::new(question.question_type.display_name())
                            .small()
                            .color(Colors::TEXT_MUTED),
                    );
                    if name_question == Some(question_id) {
                        ui.label(RichText::new(Icons::TREE).small())
                            .on_hover_text("Namnfråga för fadderträdet");
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button(Icons::DELETE).on_hover_text("Radera").clicked() {
                        state.show_confirm(
                            &format!("Radera frågan '{}'? Alla svar på den raderas.", question.prompt),
                            ConfirmAction::DeleteQuestion(question_id),
                        );
                    }
                    if ui.small_button(Icons::EDIT).on_hover_text("Redigera").clicked() {
                        state.open_edit_question(question_id);
                    }
                });
            });

            if question.question_type.has_options() {
                ui.indent(("options", question_id), |ui| {
                    let labels: Vec<&str> = question.options.iter().map(|o| o.label.as_str()).collect();
                    ui.label(RichText::new(labels.join(" · ")).small().color(Colors::TEXT_SECONDARY));
                });
            }
        }
    }

    fn show_submissions(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database, form: &Form) {
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("Svar ({})", self.submissions.len())).size(18.0).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if let Some(form_id) = form.id {
                    let report = ReportType::Submissions { form_id };
                    if ui.button(format!("{} JSON", Icons::EXPORT)).clicked() {
                        Self::do_export(state, db, &form.title, report, ExportFormat::Json);
                    }
                    if ui.button(format!("{} CSV", Icons::EXPORT)).clicked() {
                        Self::do_export(state, db, &form.title, report, ExportFormat::Csv);
                    }
                }
                if ui.button(Icons::REFRESH).on_hover_text("Uppdatera").clicked() {
                    self.needs_refresh = true;
                }
            });
        });

        ui.add_space(8.0);

        if self.submissions.is_empty() {
            ui.label(RichText::new("Inga svar ännu").color(Colors::TEXT_SECONDARY));
            return;
        }

        let columns: Vec<&Question> = self
            .questions
            .iter()
            .filter(|q| q.question_type.is_answerable())
            .collect();
        let mut delete_id = None;

        egui::ScrollArea::horizontal().show(ui, |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .vscroll(false)
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                .column(Column::auto().at_least(130.0))
                .columns(Column::initial(160.0).at_least(60.0).clip(true), columns.len())
                .column(Column::auto())
                .header(22.0, |mut header| {
                    header.col(|ui| {
                        ui.strong("Inskickad");
                    });
                    for q in &columns {
                        header.col(|ui| {
                            ui.strong(&q.prompt);
                        });
                    }
                    header.col(|_| {});
                })
                .body(|mut body| {
                    for view in &self.submissions {
                        body.row(20.0, |mut row| {
                            row.col(|ui| {
                                ui.label(RichText::new(&view.created_at).small());
                            });
                            for q in &columns {
                                row.col(|ui| {
                                    let answer = q.id.map(|id| view.answer(id)).unwrap_or("");
                                    ui.label(answer).on_hover_text(answer);
                                });
                            }
                            row.col(|ui| {
                                if ui.small_button(Icons::DELETE).on_hover_text("Radera svar").clicked() {
                                    delete_id = Some(view.submission_id);
                                }
                            });
                        });
                    }
                });
        });

        if let Some(id) = delete_id {
            state.show_confirm("Radera detta svar?", ConfirmAction::DeleteSubmission(id));
        }
    }

    fn do_export(state: &mut AppState, db: &Database, title: &str, report: ReportType, format: ExportFormat) {
        let filename = ExportService::generate_filename(title, report, format);

        let file_dialog = rfd::FileDialog::new()
            .set_file_name(&filename)
            .add_filter(format.display_name(), &[format.extension()]);

        if let Some(path) = file_dialog.save_file() {
            match ExportService::new(db).export_to_file(report, format, &path) {
                Ok(result) => {
                    state.show_success(&format!("{} sparad till {}", result.summary(), path.display()));
                }
                Err(e) => {
                    state.show_error(&format!("Export misslyckades: {}", e));
                }
            }
        }
    }

    fn load(&mut self, form_id: i64, db: &Database) {
        self.loaded_form_id = Some(form_id);
        self.form = db.forms().find_by_id(form_id).ok().flatten();
        self.questions = db.forms().find_questions(form_id).unwrap_or_default();
        self.submissions = db
            .submissions()
            .find_views(form_id, &self.questions)
            .unwrap_or_default();
        self.tree = db.trees().find_by_form(form_id).ok().flatten();
    }

    pub fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }
}

impl Default for FormDetailView {
    fn default() -> Self {
        Self::new()
    }
}
