use std::collections::{BTreeSet, HashMap};

use egui::{self, RichText};

use crate::db::Database;
use crate::models::{Answer, Form, Question, QuestionType};
use crate::services::QuestionnaireService;
use crate::ui::{
    state::AppState,
    theme::{Colors, Icons},
};
use crate::utils::date;

/// Inmatning för en fråga innan den blir ett Answer
#[derive(Debug, Clone, Default)]
struct AnswerInput {
    text: String,
    choice: Option<i64>,
    choices: BTreeSet<i64>,
}

impl AnswerInput {
    fn to_answer(&self, question_type: QuestionType) -> Option<Answer> {
        let answer = match question_type {
            QuestionType::FreeResponse => Answer::Text(self.text.clone()),
            QuestionType::MultipleChoice => Answer::Choice(self.choice?),
            QuestionType::SelectAll => Answer::Choices(self.choices.iter().copied().collect()),
            QuestionType::SectionHeader => return None,
        };
        (!answer.is_empty()).then_some(answer)
    }
}

/// Fyll i ett formulär via dess kod
pub struct QuestionnaireView {
    code_input: String,
    form: Option<(Form, Vec<Question>)>,
    inputs: HashMap<i64, AnswerInput>,
    error_message: Option<String>,
    submitted: bool,
}

impl QuestionnaireView {
    pub fn new() -> Self {
        Self {
            code_input: String::new(),
            form: None,
            inputs: HashMap::new(),
            error_message: None,
            submitted: false,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database) {
        // Kod från en annan vy
        if let Some(code) = state.questionnaire_code.take() {
            self.code_input = code;
            self.open(db);
        }

        ui.vertical(|ui| {
            ui.heading(format!("{} Fyll i enkät", Icons::QUESTIONNAIRE));
            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.label("Kod:");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.code_input)
                        .hint_text("t.ex. K7MQ2X")
                        .desired_width(120.0),
                );
                let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if ui.button("Öppna").clicked() || enter {
                    self.open(db);
                }
            });

            if let Some(ref error) = self.error_message {
                ui.add_space(8.0);
                ui.label(RichText::new(error).color(Colors::ERROR));
            }

            ui.add_space(8.0);
            ui.separator();

            if self.submitted {
                ui.add_space(16.0);
                ui.label(
                    RichText::new(format!("{} Tack! Ditt svar är inskickat.", Icons::CHECK))
                        .size(18.0)
                        .color(Colors::SUCCESS),
                );
                if ui.button("Fyll i igen").clicked() {
                    self.submitted = false;
                }
                return;
            }

            if self.form.is_some() {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.show_form(ui, state, db);
                });
            }
        });
    }

    fn show_form(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database) {
        let Some((form, questions)) = self.form.as_ref() else {
            return;
        };

        ui.label(RichText::new(&form.title).size(20.0).strong());
        if let Some(ref description) = form.description {
            ui.label(description);
        }
        if let Some(deadline) = form.deadline {
            let color = if form.is_current() { Colors::TEXT_SECONDARY } else { Colors::ERROR };
            ui.label(
                RichText::new(format!("{} Sista dag: {}", Icons::CALENDAR, date::format_date(deadline)))
                    .color(color),
            );
        }

        ui.add_space(12.0);

        for question in questions {
            let Some(question_id) = question.id else {
                continue;
            };
            let input = self.inputs.entry(question_id).or_default();
            Self::show_question(ui, question, question_id, input);
            ui.add_space(10.0);
        }

        ui.add_space(8.0);

        if ui.button(format!("{} Skicka in", Icons::CHECK)).clicked() {
            self.submit(state, db);
        }
    }

    fn show_question(ui: &mut egui::Ui, question: &Question, question_id: i64, input: &mut AnswerInput) {
        if question.question_type == QuestionType::SectionHeader {
            ui.add_space(6.0);
            ui.label(RichText::new(&question.prompt).size(17.0).strong());
            if let Some(ref description) = question.description {
                ui.label(RichText::new(description).color(Colors::TEXT_SECONDARY));
            }
            ui.separator();
            return;
        }

        ui.label(RichText::new(&question.prompt).strong());
        if let Some(ref description) = question.description {
            ui.label(RichText::new(description).small().color(Colors::TEXT_SECONDARY));
        }

        match question.question_type {
            QuestionType::FreeResponse => {
                ui.add(
                    egui::TextEdit::multiline(&mut input.text)
                        .id_salt(("answer", question_id))
                        .desired_rows(2)
                        .desired_width(400.0),
                );
            }
            QuestionType::MultipleChoice => {
                for option in &question.options {
                    if let Some(option_id) = option.id {
                        ui.radio_value(&mut input.choice, Some(option_id), &option.label);
                    }
                }
            }
            QuestionType::SelectAll => {
                for option in &question.options {
                    if let Some(option_id) = option.id {
                        let mut checked = input.choices.contains(&option_id);
                        if ui.checkbox(&mut checked, &option.label).changed() {
                            if checked {
                                input.choices.insert(option_id);
                            } else {
                                input.choices.remove(&option_id);
                            }
                        }
                    }
                }
            }
            QuestionType::SectionHeader => {}
        }
    }

    fn open(&mut self, db: &Database) {
        self.error_message = None;
        self.submitted = false;
        self.inputs.clear();

        match QuestionnaireService::new(db).open(&self.code_input) {
            Ok(loaded) => {
                self.code_input = loaded.0.code.clone();
                self.form = Some(loaded);
            }
            Err(e) => {
                self.form = None;
                self.error_message = Some(e.to_string());
            }
        }
    }

    fn submit(&mut self, state: &mut AppState, db: &Database) {
        let Some((form, questions)) = self.form.as_ref() else {
            return;
        };
        let Some(form_id) = form.id else {
            return;
        };

        let answers: HashMap<i64, Answer> = questions
            .iter()
            .filter_map(|q| {
                let id = q.id?;
                let answer = self.inputs.get(&id)?.to_answer(q.question_type)?;
                Some((id, answer))
            })
            .collect();

        match QuestionnaireService::new(db).submit(form_id, &answers) {
            Ok(_) => {
                self.inputs.clear();
                self.error_message = None;
                self.submitted = true;
                state.data_changed = true;
                state.show_success("Svar inskickat");
            }
            Err(e) => {
                self.error_message = Some(e.to_string());
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for QuestionnaireView {
    fn default() -> Self {
        Self::new()
    }
}
