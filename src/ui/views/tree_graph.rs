//! Grafvy för fadderträd: dra noder, dra kanter mellan handtag, högerklicksmeny

use egui::{self, Pos2, Rect, RichText, Stroke, Vec2};

use crate::db::Database;
use crate::services::layout::{NODE_HEIGHT, NODE_WIDTH};
use crate::services::{Canvas, NodeCategory, TreeEditorService, TreeGraph};
use crate::ui::{
    state::AppState,
    theme::{Colors, Icons},
    View,
};

/// Handtagens radie i trädkoordinater
const HANDLE_RADIUS: f32 = 7.0;
/// Hur nära en kant ett högerklick måste vara
const EDGE_TOLERANCE: f32 = 6.0;

/// Pågående dragning
#[derive(Debug, Clone, Copy)]
enum DragState {
    /// Flyttar en nod; `grab` är avståndet från nodens hörn till pekaren
    Node { id: i64, grab: Vec2, pos: Pos2 },
    /// Ny kant från en nods nedre handtag
    Edge { from: i64, to: Pos2 },
    Pan,
}

/// Vad högerklicksmenyn gäller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextTarget {
    Node(i64),
    Edge(i64),
}

enum MenuAction {
    ToggleBig(i64),
    DeleteMember(i64),
    DeleteConnection(i64),
}

pub struct TreeGraphView {
    graph: Option<TreeGraph>,
    loaded_tree_id: Option<i64>,
    pan_offset: Vec2,
    zoom: f32,
    drag: Option<DragState>,
    context_target: Option<ContextTarget>,
    new_member_name: String,
    needs_refresh: bool,
}

impl TreeGraphView {
    pub fn new() -> Self {
        Self {
            graph: None,
            loaded_tree_id: None,
            pan_offset: Vec2::ZERO,
            zoom: 1.0,
            drag: None,
            context_target: None,
            new_member_name: String::new(),
            needs_refresh: true,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database, canvas: Canvas) {
        let Some(tree_id) = state.selected_tree_id else {
            ui.label("Inget träd valt");
            if ui.button(format!("{} Till fadderträden", Icons::TREE)).clicked() {
                state.navigate(View::TreeList);
            }
            return;
        };

        if self.needs_refresh || self.loaded_tree_id != Some(tree_id) {
            self.load(tree_id, state, db);
            self.needs_refresh = false;
        }

        if self.graph.is_none() {
            ui.label(RichText::new("Trädet kunde inte laddas").color(Colors::ERROR));
            if ui.button(format!("{} Tillbaka", Icons::ARROW_LEFT)).clicked() {
                state.navigate(View::TreeList);
            }
            return;
        }

        self.show_header(ui, state, db, canvas);
        ui.add_space(4.0);
        Self::show_legend(ui);
        ui.add_space(4.0);
        self.show_canvas(ui, state, db, canvas);
    }

    fn show_header(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database, canvas: Canvas) {
        let title = self
            .graph
            .as_ref()
            .map(|g| g.tree.title.clone())
            .unwrap_or_default();

        ui.horizontal(|ui| {
            if ui.button(Icons::ARROW_LEFT).on_hover_text("Tillbaka").clicked() {
                state.navigate(View::TreeList);
            }
            ui.heading(format!("{} {}", Icons::TREE, title));

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button(format!("{} Poäng", Icons::CHALLENGE)).clicked() {
                    if let Some(tree_id) = state.selected_tree_id {
                        state.navigate_to_tree_manage(tree_id);
                    }
                }
                if ui.button(format!("{} Hämta svar", Icons::REFRESH)).clicked() {
                    self.sync_submissions(state, db, canvas);
                }
                if ui.button(format!("{} Autolayout", Icons::LAYOUT)).clicked() {
                    self.auto_layout(state, db, canvas);
                }

                ui.separator();

                if ui.small_button("⟲").on_hover_text("Återställ vy").clicked() {
                    self.pan_offset = Vec2::ZERO;
                    self.zoom = 1.0;
                }
                if ui.small_button("➖").clicked() {
                    self.zoom = (self.zoom / 1.2).max(0.3);
                }
                ui.label(format!("{:.0}%", self.zoom * 100.0));
                if ui.small_button("➕").clicked() {
                    self.zoom = (self.zoom * 1.2).min(3.0);
                }
            });
        });

        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.new_member_name)
                    .hint_text("Namn på ny medlem")
                    .desired_width(180.0),
            );
            let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button(format!("{} Lägg till", Icons::ADD)).clicked() || enter {
                self.add_member(state, db, canvas);
            }
        });
    }

    fn show_legend(ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for category in NodeCategory::all() {
                let (rect, _) = ui.allocate_exact_size(Vec2::splat(12.0), egui::Sense::hover());
                ui.painter().rect_filled(rect, 3.0, Colors::category(*category));
                ui.label(
                    RichText::new(format!("{} {}", category.icon(), category.label()))
                        .small()
                        .color(Colors::TEXT_SECONDARY),
                );
                ui.add_space(8.0);
            }
        });
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui, state: &mut AppState, db: &Database, canvas: Canvas) {
        let available_size = ui.available_size();
        let (response, painter) = ui.allocate_painter(available_size, egui::Sense::click_and_drag());
        let rect = response.rect;

        // Zoom med scroll
        if response.hovered() {
            let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 {
                let zoom_factor = 1.0 + scroll_delta * 0.001;
                self.zoom = (self.zoom * zoom_factor).clamp(0.3, 3.0);
            }
        }

        let origin = rect.min + Vec2::splat(16.0) + self.pan_offset;
        let zoom = self.zoom;
        let to_screen = |p: Pos2| -> Pos2 { origin + p.to_vec2() * zoom };
        let to_tree = |p: Pos2| -> Pos2 { Pos2::ZERO + (p - origin) / zoom };

        self.handle_drag(&response, state, db, canvas, to_tree);

        if response.secondary_clicked() {
            self.context_target = response.interact_pointer_pos().and_then(|p| {
                let p = to_tree(p);
                self.graph.as_ref().and_then(|g| {
                    node_at(g, p)
                        .map(ContextTarget::Node)
                        .or_else(|| edge_at(g, p).map(ContextTarget::Edge))
                })
            });
        }

        let Some(graph) = self.graph.as_ref() else {
            return;
        };

        painter.rect_filled(rect, 0.0, ui.visuals().extreme_bg_color);

        // Ritytans gränser
        let bounds = Rect::from_min_max(to_screen(Pos2::ZERO), to_screen(Pos2::new(canvas.width, canvas.height)));
        painter.rect_stroke(bounds, 4.0, Stroke::new(1.0, Colors::TEXT_MUTED));

        let dragged_pos = |id: i64| -> Option<Pos2> {
            match self.drag {
                Some(DragState::Node { id: drag_id, pos, .. }) if drag_id == id => Some(pos),
                _ => None,
            }
        };
        let node_pos = |id: i64| -> Option<Pos2> {
            dragged_pos(id).or_else(|| graph.node(id).map(|n| Pos2::new(n.member.position_x, n.member.position_y)))
        };

        // Kanter under noderna
        for edge in &graph.edges {
            let (Some(big), Some(little)) = (node_pos(edge.big_id), node_pos(edge.little_id)) else {
                continue;
            };
            let from = to_screen(bottom_handle(big));
            let to = to_screen(top_handle(little));
            let highlighted = self.context_target == Some(ContextTarget::Edge(edge.id.unwrap_or_default()));
            let width = if highlighted { 3.0 } else { 2.0 };
            painter.arrow(from, to - from, Stroke::new(width * zoom, Colors::EDGE));

            if edge.points != 0 {
                painter.text(
                    from + (to - from) * 0.5 + Vec2::new(8.0, 0.0),
                    egui::Align2::LEFT_CENTER,
                    format!("{} p", edge.points),
                    egui::FontId::proportional(11.0 * zoom),
                    Colors::TEXT_SECONDARY,
                );
            }
        }

        // Kant som dras
        if let Some(DragState::Edge { from, to }) = self.drag {
            if let Some(big) = node_pos(from) {
                painter.line_segment(
                    [to_screen(bottom_handle(big)), to_screen(to)],
                    Stroke::new(2.0 * zoom, Colors::PRIMARY),
                );
            }
        }

        let text_color = ui.visuals().strong_text_color();
        for node in &graph.nodes {
            let id = node.id();
            let Some(pos) = node_pos(id) else {
                continue;
            };
            let node_rect = Rect::from_min_size(to_screen(pos), Vec2::new(NODE_WIDTH, NODE_HEIGHT) * zoom);
            if !rect.intersects(node_rect) {
                continue;
            }

            let category = node.category();
            let selected = self.context_target == Some(ContextTarget::Node(id));
            let stroke = if selected {
                Stroke::new(2.5, Colors::PRIMARY)
            } else {
                Stroke::new(1.0, ui.visuals().widgets.inactive.bg_stroke.color)
            };

            painter.rect_filled(node_rect, 8.0 * zoom, Colors::category(category));
            painter.rect_stroke(node_rect, 8.0 * zoom, stroke);

            painter.text(
                node_rect.center() + Vec2::new(0.0, -6.0 * zoom),
                egui::Align2::CENTER_CENTER,
                &node.member.identifier,
                egui::FontId::proportional(14.0 * zoom),
                text_color,
            );
            painter.text(
                node_rect.center() + Vec2::new(0.0, 12.0 * zoom),
                egui::Align2::CENTER_CENTER,
                format!("{} {}", category.icon(), category.label()),
                egui::FontId::proportional(10.0 * zoom),
                text_color,
            );

            // Handtag: överst tar emot kanter, nederst startar dem
            let handle_fill = ui.visuals().window_fill;
            for handle in [top_handle(pos), bottom_handle(pos)] {
                painter.circle(to_screen(handle), HANDLE_RADIUS * zoom, handle_fill, Stroke::new(1.5, Colors::EDGE));
            }
        }

        let instructions = "Dra nod för att flytta • Dra från nedre handtaget till ett övre för att koppla • Högerklicka för meny • Dra i bakgrunden för att panorera";
        painter.text(
            Pos2::new(rect.center().x, rect.bottom() - 20.0),
            egui::Align2::CENTER_CENTER,
            instructions,
            egui::FontId::proportional(11.0),
            Colors::TEXT_MUTED,
        );

        let mut action = None;
        let target = self.context_target;
        let is_big = match target {
            Some(ContextTarget::Node(id)) => graph.node(id).map(|n| n.member.is_big).unwrap_or(false),
            _ => false,
        };
        response.context_menu(|ui| match target {
            Some(ContextTarget::Node(id)) => {
                let label = if is_big { "Ta bort big-roll" } else { "Gör till big" };
                if ui.button(format!("{} {}", Icons::PEOPLE, label)).clicked() {
                    action = Some(MenuAction::ToggleBig(id));
                    ui.close_menu();
                }
                if ui.button(format!("{} Ta bort medlem", Icons::DELETE)).clicked() {
                    action = Some(MenuAction::DeleteMember(id));
                    ui.close_menu();
                }
            }
            Some(ContextTarget::Edge(id)) => {
                if ui.button(format!("{} Ta bort koppling", Icons::DELETE)).clicked() {
                    action = Some(MenuAction::DeleteConnection(id));
                    ui.close_menu();
                }
            }
            None => {
                ui.label(RichText::new("Högerklicka på en nod eller kant").color(Colors::TEXT_MUTED));
            }
        });

        if let Some(action) = action {
            self.apply_menu_action(action, state, db);
        }
    }

    fn handle_drag(
        &mut self,
        response: &egui::Response,
        state: &mut AppState,
        db: &Database,
        canvas: Canvas,
        to_tree: impl Fn(Pos2) -> Pos2,
    ) {
        let Some(graph) = self.graph.as_ref() else {
            return;
        };

        if response.drag_started() {
            self.drag = response.interact_pointer_pos().map(|p| {
                let p = to_tree(p);
                if let Some(from) = bottom_handle_at(graph, p) {
                    DragState::Edge { from, to: p }
                } else if let Some(id) = node_at(graph, p) {
                    let pos = graph
                        .node(id)
                        .map(|n| Pos2::new(n.member.position_x, n.member.position_y))
                        .unwrap_or(p);
                    DragState::Node { id, grab: p - pos, pos }
                } else {
                    DragState::Pan
                }
            });
        }

        if response.dragged() {
            let pointer = response.interact_pointer_pos().map(&to_tree);
            match (&mut self.drag, pointer) {
                (Some(DragState::Node { grab, pos, .. }), Some(p)) => *pos = p - *grab,
                (Some(DragState::Edge { to, .. }), Some(p)) => *to = p,
                (Some(DragState::Pan), _) => self.pan_offset += response.drag_delta(),
                _ => {}
            }
        }

        if response.drag_stopped() {
            let pointer = response.interact_pointer_pos().map(&to_tree);
            match self.drag.take() {
                Some(DragState::Node { id, pos, .. }) => {
                    self.reposition(id, pos, state, db, canvas);
                }
                Some(DragState::Edge { from, to }) => {
                    // Kanten måste släppas på målets övre handtag
                    let target = self.graph.as_ref().and_then(|g| top_handle_at(g, pointer.unwrap_or(to)));
                    if let Some(little) = target {
                        self.connect(from, little, state, db);
                    }
                }
                _ => {}
            }
        }
    }

    fn reposition(&mut self, id: i64, pos: Pos2, state: &mut AppState, db: &Database, canvas: Canvas) {
        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        if let Err(e) = TreeEditorService::new(db).reposition(graph, id, pos.x, pos.y, canvas) {
            state.show_error(&format!("Kunde inte flytta noden: {}", e));
        }
    }

    fn connect(&mut self, big_id: i64, little_id: i64, state: &mut AppState, db: &Database) {
        if big_id == little_id {
            return;
        }
        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        match TreeEditorService::new(db).connect(graph, big_id, little_id) {
            Ok(()) => {
                state.data_changed = true;
                state.show_success("Koppling skapad");
            }
            Err(e) => state.show_error(&e.to_string()),
        }
    }

    fn apply_menu_action(&mut self, action: MenuAction, state: &mut AppState, db: &Database) {
        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        let service = TreeEditorService::new(db);

        let result = match action {
            MenuAction::ToggleBig(id) => service.toggle_big(graph, id).map(|is_big| {
                if is_big { "Medlemmen är nu big" } else { "Big-rollen borttagen" }
            }),
            MenuAction::DeleteMember(id) => service.delete_member(graph, id).map(|_| "Medlem borttagen"),
            MenuAction::DeleteConnection(id) => service.delete_connection(graph, id).map(|_| "Koppling borttagen"),
        };

        self.context_target = None;
        match result {
            Ok(message) => {
                state.data_changed = true;
                state.show_success(message);
            }
            Err(e) => state.show_error(&e.to_string()),
        }
    }

    /// Autolayout av hela trädet (knapp och kortkommando)
    pub fn auto_layout(&mut self, state: &mut AppState, db: &Database, canvas: Canvas) {
        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        match TreeEditorService::new(db).apply_auto_layout(graph, canvas) {
            Ok(()) => {
                self.pan_offset = Vec2::ZERO;
                state.show_success("Trädet har ordnats");
            }
            Err(e) => state.show_error(&format!("Autolayout misslyckades: {}", e)),
        }
    }

    fn sync_submissions(&mut self, state: &mut AppState, db: &Database, canvas: Canvas) {
        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        match TreeEditorService::new(db).sync_submissions(graph, canvas) {
            Ok(0) => state.show_status("Inga nya svar", crate::ui::StatusType::Info),
            Ok(added) => {
                state.data_changed = true;
                state.show_success(&format!("{} nya medlemmar från formulärsvar", added));
            }
            Err(e) => state.show_error(&format!("Kunde inte hämta svar: {}", e)),
        }
    }

    fn add_member(&mut self, state: &mut AppState, db: &Database, canvas: Canvas) {
        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        match TreeEditorService::new(db).add_member(graph, &self.new_member_name, canvas) {
            Ok(_) => {
                self.new_member_name.clear();
                state.data_changed = true;
            }
            Err(e) => state.show_error(&e.to_string()),
        }
    }

    fn load(&mut self, tree_id: i64, state: &mut AppState, db: &Database) {
        if self.loaded_tree_id != Some(tree_id) {
            self.pan_offset = Vec2::ZERO;
            self.zoom = 1.0;
        }
        self.loaded_tree_id = Some(tree_id);
        self.drag = None;
        self.context_target = None;

        match TreeEditorService::new(db).load(tree_id) {
            Ok(graph) => self.graph = Some(graph),
            Err(e) => {
                self.graph = None;
                state.show_error(&format!("Kunde inte ladda trädet: {}", e));
            }
        }
    }

    pub fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }
}

impl Default for TreeGraphView {
    fn default() -> Self {
        Self::new()
    }
}

fn top_handle(pos: Pos2) -> Pos2 {
    Pos2::new(pos.x + NODE_WIDTH / 2.0, pos.y)
}

fn bottom_handle(pos: Pos2) -> Pos2 {
    Pos2::new(pos.x + NODE_WIDTH / 2.0, pos.y + NODE_HEIGHT)
}

fn node_rect(x: f32, y: f32) -> Rect {
    Rect::from_min_size(Pos2::new(x, y), Vec2::new(NODE_WIDTH, NODE_HEIGHT))
}

/// Översta noden under en punkt (sist ritad vinner)
fn node_at(graph: &TreeGraph, p: Pos2) -> Option<i64> {
    graph
        .nodes
        .iter()
        .rev()
        .find(|n| node_rect(n.member.position_x, n.member.position_y).expand(HANDLE_RADIUS).contains(p))
        .map(|n| n.id())
}

fn handle_at(graph: &TreeGraph, p: Pos2, handle: fn(Pos2) -> Pos2) -> Option<i64> {
    graph
        .nodes
        .iter()
        .rev()
        .find(|n| handle(Pos2::new(n.member.position_x, n.member.position_y)).distance(p) <= HANDLE_RADIUS * 1.5)
        .map(|n| n.id())
}

fn bottom_handle_at(graph: &TreeGraph, p: Pos2) -> Option<i64> {
    handle_at(graph, p, bottom_handle)
}

fn top_handle_at(graph: &TreeGraph, p: Pos2) -> Option<i64> {
    handle_at(graph, p, top_handle)
}

fn edge_at(graph: &TreeGraph, p: Pos2) -> Option<i64> {
    graph
        .edges
        .iter()
        .filter_map(|e| {
            let big = graph.node(e.big_id)?;
            let little = graph.node(e.little_id)?;
            let a = bottom_handle(Pos2::new(big.member.position_x, big.member.position_y));
            let b = top_handle(Pos2::new(little.member.position_x, little.member.position_y));
            let d = distance_to_segment(p, a, b);
            (d <= EDGE_TOLERANCE).then_some((e.id?, d))
        })
        .min_by(|x, y| x.1.total_cmp(&y.1))
        .map(|(id, _)| id)
}

fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Connection, FamilyTree, TreeMember};

    fn graph() -> TreeGraph {
        let mut tree = FamilyTree::new(1, 1, "Test");
        tree.id = Some(1);
        let mut a = TreeMember::new(1, "Anna").at(0.0, 0.0);
        a.id = Some(1);
        let mut b = TreeMember::new(1, "Bo").at(0.0, 200.0);
        b.id = Some(2);
        let mut edge = Connection::new(1, 1, 2);
        edge.id = Some(10);
        TreeGraph::new(tree, vec![a, b], vec![edge])
    }

    #[test]
    fn test_hit_testing() {
        let g = graph();
        assert_eq!(node_at(&g, Pos2::new(10.0, 10.0)), Some(1));
        assert_eq!(node_at(&g, Pos2::new(10.0, 210.0)), Some(2));
        assert_eq!(node_at(&g, Pos2::new(400.0, 400.0)), None);

        let handle = bottom_handle(Pos2::new(0.0, 0.0));
        assert_eq!(bottom_handle_at(&g, handle), Some(1));
        assert_eq!(top_handle_at(&g, handle), None);

        // Bos övre handtag tar emot kanten, resten av noden gör det inte
        assert_eq!(top_handle_at(&g, top_handle(Pos2::new(0.0, 200.0))), Some(2));
        assert_eq!(top_handle_at(&g, Pos2::new(10.0, 230.0)), None);
        assert_eq!(top_handle_at(&g, bottom_handle(Pos2::new(0.0, 200.0))), None);
    }

    #[test]
    fn test_edge_hit_between_handles() {
        let g = graph();
        // Kanten går lodrätt från (75, 50) till (75, 200)
        assert_eq!(edge_at(&g, Pos2::new(78.0, 125.0)), Some(10));
        assert_eq!(edge_at(&g, Pos2::new(120.0, 125.0)), None);
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Pos2::new(-4.0, 3.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Pos2::new(1.0, 1.0), a, a), 2f32.sqrt());
    }
}
