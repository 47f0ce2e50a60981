//! Huvudapplikation för Biglittle Desktop

use anyhow::Result;
use eframe::egui;
use std::sync::Arc;

use crate::db::Database;
use crate::models::config::{AppSettings, ShortcutAction};
use crate::services::Canvas;
use crate::ui::{
    modals::{ChallengeFormModal, ConfirmDialog, FormFormModal, PointAwardModal, QuestionFormModal, TreeFormModal},
    shortcuts::ShortcutManager,
    state::AppState,
    theme::{configure_style, Colors},
    views::{
        DashboardView, FormDetailView, FormListView, QuestionnaireView, SettingsView, SetupWizardView,
        TreeGraphView, TreeListView, TreeManageView,
    },
    StatusType, View,
};
use crate::utils::path::get_database_path;

/// Huvudapplikation
pub struct BiglittleApp {
    db: Arc<Database>,
    state: AppState,
    app_settings: AppSettings,
    shortcut_manager: ShortcutManager,

    // Vyer
    dashboard: DashboardView,
    form_list: FormListView,
    form_detail: FormDetailView,
    questionnaire: QuestionnaireView,
    tree_list: TreeListView,
    tree_graph: TreeGraphView,
    tree_manage: TreeManageView,
    settings: SettingsView,
    setup_wizard: SetupWizardView,

    // Modals
    form_form_modal: FormFormModal,
    question_form_modal: QuestionFormModal,
    tree_form_modal: TreeFormModal,
    challenge_form_modal: ChallengeFormModal,
    point_award_modal: PointAwardModal,

    // Intern
    applied_dark_mode: Option<bool>,
}

impl BiglittleApp {
    /// Skapa ny applikation
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Result<Self> {
        let app_settings = AppSettings::load();
        let shortcut_manager = ShortcutManager::new(app_settings.shortcuts.clone());

        let db_path = get_database_path();
        tracing::info!("Öppnar databas: {:?}", db_path);

        let db = match Database::open(&db_path).and_then(|db| db.migrate().map(|_| db)) {
            Ok(db) => db,
            Err(e) => {
                tracing::error!("Kunde inte öppna databas: {:#}", e);
                // In-memory som reserv; inget sparas mellan körningar
                Database::open_in_memory()?
            }
        };

        let setup_complete = db.organizations().is_setup_complete().unwrap_or(false);

        let mut state = AppState::new();
        state.current_view = if setup_complete { View::Dashboard } else { View::SetupWizard };
        state.dark_mode = app_settings.dark_mode;

        Ok(Self {
            db: Arc::new(db),
            state,
            app_settings,
            shortcut_manager,
            dashboard: DashboardView::new(),
            form_list: FormListView::new(),
            form_detail: FormDetailView::new(),
            questionnaire: QuestionnaireView::new(),
            tree_list: TreeListView::new(),
            tree_graph: TreeGraphView::new(),
            tree_manage: TreeManageView::new(),
            settings: SettingsView::new(),
            setup_wizard: SetupWizardView::new(),
            form_form_modal: FormFormModal::new(),
            question_form_modal: QuestionFormModal::new(),
            tree_form_modal: TreeFormModal::new(),
            challenge_form_modal: ChallengeFormModal::new(),
            point_award_modal: PointAwardModal::new(),
            applied_dark_mode: None,
        })
    }

    fn canvas(&self) -> Canvas {
        Canvas::new(self.app_settings.canvas_width, self.app_settings.canvas_height)
    }

    /// Hantera navigation och uppdatera relevanta vyer
    fn handle_view_change(&mut self, new_view: View) {
        match new_view {
            View::Dashboard => self.dashboard.mark_needs_refresh(),
            View::FormList => self.form_list.mark_needs_refresh(),
            View::FormDetail => self.form_detail.mark_needs_refresh(),
            View::Questionnaire => {}
            View::TreeList => self.tree_list.mark_needs_refresh(),
            View::TreeGraph => self.tree_graph.mark_needs_refresh(),
            View::TreeManage => self.tree_manage.mark_needs_refresh(),
            View::Settings => self.settings.mark_needs_refresh(),
            View::SetupWizard => {}
        }
    }

    /// Något har sparats eller raderats: alla listor laddas om vid nästa visning
    fn refresh_all(&mut self) {
        self.dashboard.mark_needs_refresh();
        self.form_list.mark_needs_refresh();
        self.form_detail.mark_needs_refresh();
        self.tree_list.mark_needs_refresh();
        self.tree_manage.mark_needs_refresh();
    }

    /// Navigera till vy via genväg
    fn navigate_to(&mut self, view: View) {
        let old = self.state.current_view;
        self.state.current_view = view;
        if old != view {
            self.handle_view_change(view);
        }
    }

    /// Hantera en genvägsåtgärd
    fn handle_shortcut_action(&mut self, action: ShortcutAction) {
        // Om modal är öppen: tillåt bara CloseModal
        if self.state.any_modal_open() {
            if action == ShortcutAction::CloseModal {
                self.state.close_topmost_modal();
                self.reset_closed_modals();
            }
            return;
        }

        // Guiden måste slutföras först
        if self.state.current_view == View::SetupWizard && action != ShortcutAction::ToggleDarkMode {
            return;
        }

        match action {
            ShortcutAction::NavigateDashboard => self.navigate_to(View::Dashboard),
            ShortcutAction::NavigateForms => self.navigate_to(View::FormList),
            ShortcutAction::NavigateTrees => self.navigate_to(View::TreeList),
            ShortcutAction::NavigateQuestionnaire => self.navigate_to(View::Questionnaire),
            ShortcutAction::NavigateSettings => self.navigate_to(View::Settings),
            ShortcutAction::NewForm => self.state.open_new_form(),
            ShortcutAction::AutoLayout => {
                if self.state.current_view == View::TreeGraph {
                    let canvas = self.canvas();
                    self.tree_graph.auto_layout(&mut self.state, &self.db, canvas);
                }
            }
            ShortcutAction::CloseModal => {
                // Ingen modal öppen
            }
            ShortcutAction::ToggleDarkMode => self.toggle_dark_mode(),
        }
    }

    /// Byt tema och spara direkt; stilen appliceras i nästa update
    fn toggle_dark_mode(&mut self) {
        self.state.dark_mode = !self.state.dark_mode;
        self.app_settings.dark_mode = self.state.dark_mode;
        if let Err(e) = self.app_settings.save() {
            tracing::warn!("Kunde inte spara inställningar: {}", e);
        }
    }

    /// Töm dialoger som stängts med Escape så att de öppnas tomma nästa gång
    fn reset_closed_modals(&mut self) {
        if !self.state.show_form_form {
            self.form_form_modal.reset();
        }
        if !self.state.show_question_form {
            self.question_form_modal.reset();
        }
        if !self.state.show_tree_form {
            self.tree_form_modal.reset();
        }
        if !self.state.show_challenge_form {
            self.challenge_form_modal.reset();
        }
        if !self.state.show_point_award {
            self.point_award_modal.reset();
        }
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        let wizard = self.state.current_view == View::SetupWizard;

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Biglittle");
                ui.separator();

                // Navigation med genvägs-hints
                let nav_items = [
                    (View::Dashboard, "📊 Dashboard", ShortcutAction::NavigateDashboard),
                    (View::FormList, "📋 Formulär", ShortcutAction::NavigateForms),
                    (View::TreeList, "🌳 Fadderträd", ShortcutAction::NavigateTrees),
                    (View::Questionnaire, "📝 Fyll i", ShortcutAction::NavigateQuestionnaire),
                ];

                ui.add_enabled_ui(!wizard, |ui| {
                    for (view, label, shortcut_action) in nav_items {
                        let hint = self.shortcut_manager.shortcut_hint(shortcut_action).unwrap_or_default();
                        let selected = match view {
                            View::FormList => matches!(self.state.current_view, View::FormList | View::FormDetail),
                            View::TreeList => matches!(
                                self.state.current_view,
                                View::TreeList | View::TreeGraph | View::TreeManage
                            ),
                            _ => self.state.current_view == view,
                        };
                        let response = ui.selectable_label(selected, label);
                        if !hint.is_empty() {
                            response.clone().on_hover_text(hint.as_str());
                        }
                        if response.clicked() {
                            self.navigate_to(view);
                        }
                    }
                });

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let mode_icon = if self.state.dark_mode { "🌙" } else { "☀" };
                    if ui
                        .button(mode_icon)
                        .on_hover_text(
                            self.shortcut_manager
                                .shortcut_hint(ShortcutAction::ToggleDarkMode)
                                .unwrap_or_default(),
                        )
                        .clicked()
                    {
                        self.toggle_dark_mode();
                    }

                    if !wizard
                        && ui
                            .selectable_label(self.state.current_view == View::Settings, "⚙")
                            .on_hover_text(
                                self.shortcut_manager
                                    .shortcut_hint(ShortcutAction::NavigateSettings)
                                    .unwrap_or_default(),
                            )
                            .clicked()
                    {
                        self.navigate_to(View::Settings);
                    }

                    ui.separator();
                    ui.label(
                        egui::RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                            .small()
                            .weak(),
                    );
                });
            });
        });
    }

    fn show_modals(&mut self, ctx: &egui::Context) {
        if self.state.show_form_form && self.form_form_modal.show(ctx, &mut self.state, &self.db) {
            self.state.close_form_form();
        }

        if self.state.show_question_form && self.question_form_modal.show(ctx, &mut self.state, &self.db) {
            self.state.close_question_form();
        }

        if self.state.show_tree_form {
            let author_id = self.app_settings.author_id();
            if self.tree_form_modal.show(ctx, &mut self.state, &self.db, &author_id) {
                self.state.show_tree_form = false;
            }
        }

        if self.state.show_challenge_form && self.challenge_form_modal.show(ctx, &mut self.state, &self.db) {
            self.state.close_challenge_form();
        }

        if self.state.show_point_award && self.point_award_modal.show(ctx, &mut self.state, &self.db) {
            self.state.close_point_award();
        }

        if self.state.show_confirm_dialog {
            ConfirmDialog::show(ctx, &mut self.state, &self.db);
        }
    }
}

impl eframe::App for BiglittleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Inställningsvyn ändrar state.dark_mode direkt
        if self.applied_dark_mode != Some(self.state.dark_mode) {
            configure_style(ctx, self.state.dark_mode);
            self.applied_dark_mode = Some(self.state.dark_mode);
        }

        self.state.clear_old_status();

        // Kortkommandon
        if let Some(action) = self.shortcut_manager.check(ctx, self.state.capturing_shortcut) {
            self.handle_shortcut_action(action);
        }

        // Applicera nya genvägar från inställningsvyn (redan sparade där)
        if let Some(new_shortcuts) = self.state.shortcuts_to_apply.take() {
            self.shortcut_manager.update_shortcuts(new_shortcuts);
        }

        self.show_top_bar(ctx);

        // Statusbar
        if let Some(ref status) = self.state.status_message {
            egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
                let color = match status.status_type {
                    StatusType::Success => Colors::SUCCESS,
                    StatusType::Error => Colors::ERROR,
                    StatusType::Warning => Colors::WARNING,
                    StatusType::Info => Colors::INFO,
                };
                ui.colored_label(color, &status.text);
            });
        }

        let view_before = self.state.current_view;
        let canvas = self.canvas();

        // Huvudinnehåll
        egui::CentralPanel::default().show(ctx, |ui| match self.state.current_view {
            View::Dashboard => self.dashboard.show(ui, &mut self.state, &self.db),
            View::FormList => self.form_list.show(ui, &mut self.state, &self.db),
            View::FormDetail => self.form_detail.show(ui, &mut self.state, &self.db),
            View::Questionnaire => self.questionnaire.show(ui, &mut self.state, &self.db),
            View::TreeList => self.tree_list.show(ui, &mut self.state, &self.db),
            View::TreeGraph => self.tree_graph.show(ui, &mut self.state, &self.db, canvas),
            View::TreeManage => self.tree_manage.show(ui, &mut self.state, &self.db),
            View::Settings => self.settings.show(ui, &mut self.state, &self.db, &mut self.app_settings),
            View::SetupWizard => self.setup_wizard.show(ui, &mut self.state, &self.db, &mut self.app_settings),
        });

        self.show_modals(ctx);

        // Vyer som bytts inifrån en vy eller dialog
        if self.state.current_view != view_before {
            self.handle_view_change(self.state.current_view);
        }

        if self.state.data_changed {
            self.state.data_changed = false;
            self.refresh_all();
        }
    }
}
