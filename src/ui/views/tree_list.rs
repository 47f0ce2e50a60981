use egui::{self, RichText};

use crate::db::Database;
use crate::models::FamilyTree;
use crate::ui::{
    state::{AppState, ConfirmAction},
    theme::{Colors, Icons},
    View,
};

struct TreeRow {
    tree: FamilyTree,
    form_title: String,
    members: usize,
    pairs: i64,
}

pub struct TreeListView {
    trees_cache: Vec<TreeRow>,
    needs_refresh: bool,
}

impl TreeListView {
    pub fn new() -> Self {
        Self {
            trees_cache: Vec::new(),
            needs_refresh: true,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database) {
        if self.needs_refresh {
            self.refresh(db);
            self.needs_refresh = false;
        }

        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                ui.heading(format!("{} Fadderträd", Icons::TREE));
            });

            ui.label(
                RichText::new("Nya träd skapas från ett formulärs detaljvy.")
                    .small()
                    .color(Colors::TEXT_MUTED),
            );

            ui.add_space(8.0);

            if self.trees_cache.is_empty() {
                ui.label(RichText::new("Inga fadderträd ännu").color(Colors::TEXT_SECONDARY));
                if ui.button(format!("{} Till formulären", Icons::FORM)).clicked() {
                    state.navigate(View::FormList);
                }
                return;
            }

            egui::ScrollArea::vertical().show(ui, |ui| {
                for row in &self.trees_cache {
                    let Some(tree_id) = row.tree.id else {
                        continue;
                    };

                    egui::Frame::none()
                        .fill(ui.visuals().extreme_bg_color)
                        .rounding(8.0)
                        .inner_margin(12.0)
                        .show(ui, |ui| {
                            ui.set_min_width(ui.available_width());
                            ui.horizontal(|ui| {
                                ui.vertical(|ui| {
                                    ui.label(RichText::new(&row.tree.title).size(16.0).strong());
                                    ui.label(
                                        RichText::new(format!(
                                            "{} {} · {} medlemmar · {} par · kod {}",
                                            Icons::FORM,
                                            row.form_title,
                                            row.members,
                                            row.pairs,
                                            row.tree.code
                                        ))
                                        .small()
                                        .color(Colors::TEXT_SECONDARY),
                                    );
                                });

                                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                    if ui.small_button(Icons::DELETE).on_hover_text("Radera").clicked() {
                                        state.show_confirm(
                                            &format!("Radera fadderträdet '{}' med alla poäng?", row.tree.title),
                                            ConfirmAction::DeleteTree(tree_id),
                                        );
                                    }
                                    if ui.button(format!("{} Poäng", Icons::CHALLENGE)).clicked() {
                                        state.navigate_to_tree_manage(tree_id);
                                    }
                                    if ui.button(format!("{} Graf", Icons::TREE)).clicked() {
                                        state.navigate_to_tree(tree_id);
                                    }
                                });
                            });
                        });
                    ui.add_space(6.0);
                }
            });
        });
    }

    fn refresh(&mut self, db: &Database) {
        let trees = db.trees().find_all().unwrap_or_default();
        self.trees_cache = trees
            .into_iter()
            .map(|tree| {
                let id = tree.id.unwrap_or_default();
                TreeRow {
                    form_title: db
                        .forms()
                        .find_by_id(tree.form_id)
                        .ok()
                        .flatten()
                        .map(|f| f.title)
                        .unwrap_or_default(),
                    members: db.trees().find_members(id).map(|m| m.len()).unwrap_or(0),
                    pairs: db.connections().count_by_tree(id).unwrap_or(0),
                    tree,
                }
            })
            .collect();
    }

    pub fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }
}

impl Default for TreeListView {
    fn default() -> Self {
        Self::new()
    }
}
