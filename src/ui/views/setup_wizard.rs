//! Setup wizard för första start

use egui::{self, RichText};

use crate::db::Database;
use crate::models::{AppSettings, Organization};
use crate::ui::{
    state::AppState,
    theme::{Colors, Icons},
    View,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WizardStep {
    Organization,
    Operator,
    Done,
}

pub struct SetupWizardView {
    step: WizardStep,
    organization_name: String,
    operator_name: String,
    error_message: Option<String>,
}

impl Default for SetupWizardView {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupWizardView {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Organization,
            organization_name: String::new(),
            operator_name: String::new(),
            error_message: None,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database, settings: &mut AppSettings) {
        ui.vertical(|ui| {
            ui.heading(format!("{} Kom igång", Icons::SETTINGS));
            ui.add_space(12.0);

            ui.label(RichText::new(self.step_title()).strong());
            ui.add_space(8.0);

            if let Some(ref error) = self.error_message {
                ui.label(RichText::new(error).color(Colors::ERROR));
                ui.add_space(8.0);
            }

            match self.step {
                WizardStep::Organization => {
                    ui.label("Vad heter föreningen eller organisationen som driver programmet?");
                    ui.add_space(8.0);
                    ui.add(egui::TextEdit::singleline(&mut self.organization_name).desired_width(360.0));
                }
                WizardStep::Operator => {
                    ui.label("Ditt namn registreras som skapare av nya fadderträd. Kan lämnas tomt.");
                    ui.add_space(8.0);
                    ui.add(egui::TextEdit::singleline(&mut self.operator_name).desired_width(360.0));
                }
                WizardStep::Done => {
                    ui.label("Klart! Skapa ett formulär för att börja samla in svar.");
                    ui.add_space(8.0);
                    ui.label(format!("Organisation: {}", self.organization_name.trim()));
                }
            }

            ui.add_space(12.0);
            self.show_step_controls(ui, state, db, settings);
        });
    }

    fn show_step_controls(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database, settings: &mut AppSettings) {
        ui.horizontal(|ui| {
            if self.step == WizardStep::Operator
                && ui.button(format!("{} Tillbaka", Icons::ARROW_LEFT)).clicked()
            {
                self.error_message = None;
                self.step = WizardStep::Organization;
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| match self.step {
                WizardStep::Organization => {
                    if ui.button("Nästa →").clicked() {
                        if self.organization_name.trim().is_empty() {
                            self.error_message = Some("Ange ett namn först.".to_string());
                        } else {
                            self.error_message = None;
                            self.step = WizardStep::Operator;
                        }
                    }
                }
                WizardStep::Operator => {
                    if ui.button(format!("{} Slutför", Icons::SAVE)).clicked() && self.finish(db, settings).is_ok() {
                        self.error_message = None;
                        self.step = WizardStep::Done;
                        state.data_changed = true;
                        state.show_success("Setup klar");
                    }
                }
                WizardStep::Done => {
                    if ui.button(format!("{} Nytt formulär", Icons::ADD)).clicked() {
                        state.navigate(View::Dashboard);
                        state.open_new_form();
                    }
                    if ui.button("Gå till Dashboard").clicked() {
                        state.navigate(View::Dashboard);
                    }
                }
            });
        });
    }

    fn finish(&mut self, db: &Database, settings: &mut AppSettings) -> anyhow::Result<()> {
        // Organisationen kan redan finnas om guiden avbröts efter att den skapats
        let existing = db.organizations().get_default()?;
        if existing.is_none() {
            let mut org = Organization::new(self.organization_name.trim());
            if let Err(e) = db.organizations().create(&mut org) {
                self.error_message = Some(format!("Kunde inte spara: {}", e));
                return Err(e);
            }
        }

        settings.operator_name = self.operator_name.trim().to_string();
        if let Err(e) = settings.save() {
            self.error_message = Some(format!("Kunde inte spara inställningar: {}", e));
            return Err(e);
        }

        Ok(())
    }

    fn step_title(&self) -> &'static str {
        match self.step {
            WizardStep::Organization => "Steg 1: Organisation",
            WizardStep::Operator => "Steg 2: Ditt namn",
            WizardStep::Done => "Steg 3: Klar",
        }
    }
}
