//! Fadderträdets graf och redigering
//!
//! Varje ändring skrivs till databasen först; den lokala grafen ändras
//! bara om skrivningen lyckades.

use anyhow::Result;
use std::collections::HashSet;
use tracing::{info, warn};

use super::layout::{self, Canvas};
use crate::db::Database;
use crate::models::{Connection, FamilyTree, TreeMember};
use crate::utils::AppError;

/// Visuell kategori för en nod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Big som har littles och själv har en big
    BigWithLittlesAndBig,
    BigWithLittles,
    BigOnly,
    /// Har en big men inga egna littles som big
    Little,
    Unconnected,
}

impl NodeCategory {
    /// Kategori från nodens flaggor, i prioritetsordning
    pub fn from_flags(is_big: bool, has_littles: bool, has_big: bool) -> Self {
        match (is_big, has_littles, has_big) {
            (true, true, true) => NodeCategory::BigWithLittlesAndBig,
            (true, true, false) => NodeCategory::BigWithLittles,
            (true, false, _) => NodeCategory::BigOnly,
            (false, _, true) => NodeCategory::Little,
            (false, _, false) => NodeCategory::Unconnected,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            NodeCategory::BigWithLittlesAndBig => "🌳",
            NodeCategory::BigWithLittles => "🌿",
            NodeCategory::BigOnly => "⭐",
            NodeCategory::Little => "🌱",
            NodeCategory::Unconnected => "○",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeCategory::BigWithLittlesAndBig => "Big med littles och egen big",
            NodeCategory::BigWithLittles => "Big med littles",
            NodeCategory::BigOnly => "Big",
            NodeCategory::Little => "Little",
            NodeCategory::Unconnected => "Ej kopplad",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            NodeCategory::BigWithLittlesAndBig,
            NodeCategory::BigWithLittles,
            NodeCategory::BigOnly,
            NodeCategory::Little,
            NodeCategory::Unconnected,
        ]
    }
}

/// En nod i grafen
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub member: TreeMember,
    pub has_littles: bool,
    pub has_big: bool,
}

impl TreeNode {
    pub fn id(&self) -> i64 {
        self.member.id.unwrap_or_default()
    }

    pub fn category(&self) -> NodeCategory {
        NodeCategory::from_flags(self.member.is_big, self.has_littles, self.has_big)
    }

    pub fn position(&self) -> (f32, f32) {
        (self.member.position_x, self.member.position_y)
    }
}

/// Ett laddat träd med noder och kanter
#[derive(Debug, Clone, Default)]
pub struct TreeGraph {
    pub tree: FamilyTree,
    pub nodes: Vec<TreeNode>,
    pub edges: Vec<Connection>,
}

impl TreeGraph {
    pub fn new(tree: FamilyTree, members: Vec<TreeMember>, edges: Vec<Connection>) -> Self {
        let mut graph = Self {
            tree,
            nodes: members
                .into_iter()
                .map(|member| TreeNode {
                    member,
                    has_littles: false,
                    has_big: false,
                })
                .collect(),
            edges,
        };
        graph.refresh_flags();
        graph
    }

    pub fn tree_id(&self) -> i64 {
        self.tree.id.unwrap_or_default()
    }

    pub fn node(&self, member_id: i64) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| n.member.id == Some(member_id))
    }

    fn node_mut(&mut self, member_id: i64) -> Option<&mut TreeNode> {
        self.nodes.iter_mut().find(|n| n.member.id == Some(member_id))
    }

    pub fn contains(&self, member_id: i64) -> bool {
        self.node(member_id).is_some()
    }

    pub fn node_ids(&self) -> Vec<i64> {
        self.nodes.iter().filter_map(|n| n.member.id).collect()
    }

    pub fn edge_pairs(&self) -> Vec<(i64, i64)> {
        self.edges.iter().map(|e| (e.big_id, e.little_id)).collect()
    }

    pub fn has_big(&self, member_id: i64) -> bool {
        self.edges.iter().any(|e| e.little_id == member_id)
    }

    /// Härled has_littles/has_big från kantmängden
    pub fn refresh_flags(&mut self) {
        let bigs: HashSet<i64> = self.edges.iter().map(|e| e.big_id).collect();
        let littles: HashSet<i64> = self.edges.iter().map(|e| e.little_id).collect();
        for node in &mut self.nodes {
            let id = node.id();
            node.has_littles = bigs.contains(&id);
            node.has_big = littles.contains(&id);
        }
    }

    /// Regler för en ny kant, utan databas
    pub fn check_connect(&self, big_id: i64, little_id: i64) -> Result<(), AppError> {
        if big_id == little_id {
            return Err(AppError::validation("En medlem kan inte kopplas till sig själv"));
        }
        if !self.contains(big_id) || !self.contains(little_id) {
            return Err(AppError::validation("Medlemmarna tillhör inte samma träd"));
        }
        if self.edges.iter().any(|e| e.big_id == big_id && e.little_id == little_id) {
            return Err(AppError::already_exists("Kopplingen finns redan"));
        }
        if self.has_big(little_id) {
            return Err(AppError::validation("Medlemmen har redan en big"));
        }
        Ok(())
    }
}

/// Tjänst för att ladda och redigera fadderträd
pub struct TreeEditorService<'a> {
    db: &'a Database,
}

impl<'a> TreeEditorService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Skapa ett träd för ett formulär
    pub fn create_tree(
        &self,
        form_id: i64,
        question_id: i64,
        title: &str,
        author_id: &str,
    ) -> Result<FamilyTree> {
        let mut tree = FamilyTree::new(form_id, question_id, title);
        tree.author_id = author_id.to_string();
        if let Some(form) = self.db.forms().find_by_id(form_id)? {
            tree.code = form.code;
        }

        match self.db.trees().create(&mut tree) {
            Ok(id) => {
                info!("Skapade fadderträd {} för formulär {}", id, form_id);
                Ok(tree)
            }
            Err(e) => {
                warn!("Kunde inte skapa fadderträd för formulär {}: {}", form_id, e);
                Err(e)
            }
        }
    }

    /// Ladda medlemmar och kopplingar för ett träd
    pub fn load(&self, tree_id: i64) -> Result<TreeGraph> {
        let tree = self
            .db
            .trees()
            .find_by_id(tree_id)?
            .ok_or_else(|| AppError::not_found(format!("träd {}", tree_id)))?;
        let members = self.db.trees().find_members(tree_id)?;
        let edges = self.db.connections().find_by_tree(tree_id)?;

        Ok(TreeGraph::new(tree, members, edges))
    }

    /// Dra en kant från big till little
    pub fn connect(&self, graph: &mut TreeGraph, big_id: i64, little_id: i64) -> Result<()> {
        if let Err(e) = graph.check_connect(big_id, little_id) {
            warn!("Koppling {} -> {} avvisad: {}", big_id, little_id, e);
            return Err(e.into());
        }

        let mut connection = Connection::new(graph.tree_id(), big_id, little_id);
        self.db.connections().create(&mut connection)?;
        info!("Kopplade {} -> {}", big_id, little_id);

        graph.edges.push(connection);
        graph.refresh_flags();
        Ok(())
    }

    /// Flytta en nod; positionen begränsas till ritytan innan den skrivs
    pub fn reposition(
        &self,
        graph: &mut TreeGraph,
        member_id: i64,
        x: f32,
        y: f32,
        canvas: Canvas,
    ) -> Result<(f32, f32)> {
        let (x, y) = layout::clamp_position(x, y, canvas);
        self.db.trees().update_position(member_id, x, y)?;

        if let Some(node) = graph.node_mut(member_id) {
            node.member.position_x = x;
            node.member.position_y = y;
        }
        Ok((x, y))
    }

    /// Automatisk layout för hela trädet
    pub fn apply_auto_layout(&self, graph: &mut TreeGraph, canvas: Canvas) -> Result<()> {
        let positions = layout::auto_layout(&graph.node_ids(), &graph.edge_pairs(), canvas);
        self.db.trees().update_positions(&positions)?;

        for (id, x, y) in positions {
            if let Some(node) = graph.node_mut(id) {
                node.member.position_x = x;
                node.member.position_y = y;
            }
        }
        info!("Automatisk layout för träd {} ({} noder)", graph.tree_id(), graph.nodes.len());
        Ok(())
    }

    /// Ta bort en medlem och alla kanter som rör den
    pub fn delete_member(&self, graph: &mut TreeGraph, member_id: i64) -> Result<()> {
        self.db.trees().delete_member(member_id)?;
        info!("Tog bort medlem {}", member_id);

        graph.nodes.retain(|n| n.member.id != Some(member_id));
        graph.edges.retain(|e| !e.involves(member_id));
        graph.refresh_flags();
        Ok(())
    }

    pub fn delete_connection(&self, graph: &mut TreeGraph, connection_id: i64) -> Result<()> {
        self.db.connections().delete(connection_id)?;
        info!("Tog bort koppling {}", connection_id);

        graph.edges.retain(|e| e.id != Some(connection_id));
        graph.refresh_flags();
        Ok(())
    }

    /// Växla big-rollen; returnerar det nya värdet
    pub fn toggle_big(&self, graph: &mut TreeGraph, member_id: i64) -> Result<bool> {
        let current = graph
            .node(member_id)
            .map(|n| n.member.is_big)
            .ok_or_else(|| AppError::not_found(format!("medlem {}", member_id)))?;

        self.db.trees().set_is_big(member_id, !current)?;

        if let Some(node) = graph.node_mut(member_id) {
            node.member.is_big = !current;
        }
        Ok(!current)
    }

    /// Lägg till en medlem manuellt
    pub fn add_member(&self, graph: &mut TreeGraph, identifier: &str, canvas: Canvas) -> Result<i64> {
        let occupied: Vec<(f32, f32)> = graph.nodes.iter().map(TreeNode::position).collect();
        let (x, y) = layout::place_without_collision((layout::PADDING, layout::PADDING), &occupied, canvas);

        let mut member = TreeMember::new(graph.tree_id(), identifier.trim()).at(x, y);
        let id = self.db.trees().create_member(&mut member)?;

        graph.nodes.push(TreeNode {
            member,
            has_littles: false,
            has_big: false,
        });
        Ok(id)
    }

    /// Hämta nya inskickningar till trädet.
    ///
    /// Varje inskickning utan nod blir en ny medlem med svaret på trädets
    /// namnfråga som namn. Tomma svar hoppas över. Returnerar antalet nya.
    pub fn sync_submissions(&self, graph: &mut TreeGraph, canvas: Canvas) -> Result<usize> {
        let form_id = graph.tree.form_id;
        let question_id = graph.tree.question_id;

        let questions = self.db.forms().find_questions(form_id)?;
        let views = self.db.submissions().find_views(form_id, &questions)?;
        let existing = self.db.trees().member_submission_ids(graph.tree_id())?;

        let mut occupied: Vec<(f32, f32)> = graph.nodes.iter().map(TreeNode::position).collect();
        let start = Self::below_lowest(&occupied);
        let mut added = 0;

        for view in views {
            if existing.contains(&view.submission_id) {
                continue;
            }
            let name = view.answer(question_id).trim();
            if name.is_empty() {
                continue;
            }

            let (x, y) = layout::place_without_collision(start, &occupied, canvas);
            let mut member = TreeMember::new(graph.tree_id(), name).at(x, y);
            member.form_submission_id = Some(view.submission_id);
            self.db.trees().create_member(&mut member)?;

            occupied.push((x, y));
            graph.nodes.push(TreeNode {
                member,
                has_littles: false,
                has_big: false,
            });
            added += 1;
        }

        if added > 0 {
            info!("Lade till {} medlemmar från inskickningar i träd {}", added, graph.tree_id());
        }
        Ok(added)
    }

    /// Startpunkt för nya noder: raden under den lägsta noden
    fn below_lowest(occupied: &[(f32, f32)]) -> (f32, f32) {
        let y = occupied
            .iter()
            .map(|&(_, y)| y + layout::NODE_HEIGHT + layout::PADDING)
            .fold(layout::PADDING, f32::max);
        (layout::PADDING, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, Form, Organization, Question, QuestionType};

    struct Fixture {
        db: Database,
        form_id: i64,
        question_id: i64,
        tree_id: i64,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let mut org = Organization::new("Org");
        let org_id = db.organizations().create(&mut org).unwrap();
        let mut form = Form::new(org_id, "Rekrytering");
        let form_id = db.forms().create(&mut form).unwrap();
        let mut q = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let question_id = db.forms().add_question(&mut q).unwrap();

        let tree = TreeEditorService::new(&db)
            .create_tree(form_id, question_id, "Träd", "tester")
            .unwrap();

        Fixture {
            db,
            form_id,
            question_id,
            tree_id: tree.id.unwrap(),
        }
    }

    fn canvas() -> Canvas {
        Canvas::new(1200.0, 800.0)
    }

    fn add(service: &TreeEditorService, graph: &mut TreeGraph, name: &str) -> i64 {
        service.add_member(graph, name, canvas()).unwrap()
    }

    #[test]
    fn test_category_precedence() {
        use NodeCategory::*;
        assert_eq!(NodeCategory::from_flags(true, true, true), BigWithLittlesAndBig);
        assert_eq!(NodeCategory::from_flags(true, true, false), BigWithLittles);
        assert_eq!(NodeCategory::from_flags(true, false, true), BigOnly);
        assert_eq!(NodeCategory::from_flags(true, false, false), BigOnly);
        assert_eq!(NodeCategory::from_flags(false, true, true), Little);
        assert_eq!(NodeCategory::from_flags(false, false, true), Little);
        assert_eq!(NodeCategory::from_flags(false, true, false), Unconnected);
        assert_eq!(NodeCategory::from_flags(false, false, false), Unconnected);
    }

    #[test]
    fn test_create_tree_twice_leaves_one_row() {
        let f = setup();
        let service = TreeEditorService::new(&f.db);

        let err = service
            .create_tree(f.form_id, f.question_id, "Igen", "tester")
            .unwrap_err();

        assert!(matches!(AppError::find(&err), Some(AppError::AlreadyExists(_))));
        assert_eq!(f.db.trees().count().unwrap(), 1);
    }

    #[test]
    fn test_connect_updates_flags_and_rejects_second_big() {
        let f = setup();
        let service = TreeEditorService::new(&f.db);
        let mut graph = service.load(f.tree_id).unwrap();
        let anna = add(&service, &mut graph, "Anna");
        let bo = add(&service, &mut graph, "Bo");
        let cia = add(&service, &mut graph, "Cia");

        service.toggle_big(&mut graph, anna).unwrap();
        service.connect(&mut graph, anna, bo).unwrap();

        assert_eq!(graph.node(anna).unwrap().category(), NodeCategory::BigWithLittles);
        assert_eq!(graph.node(bo).unwrap().category(), NodeCategory::Little);

        assert!(service.connect(&mut graph, cia, bo).is_err());
        assert!(service.connect(&mut graph, bo, bo).is_err());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(f.db.connections().count_by_tree(f.tree_id).unwrap(), 1);
    }

    #[test]
    fn test_delete_member_removes_edges_locally_and_in_storage() {
        let f = setup();
        let service = TreeEditorService::new(&f.db);
        let mut graph = service.load(f.tree_id).unwrap();
        let anna = add(&service, &mut graph, "Anna");
        let bo = add(&service, &mut graph, "Bo");
        let cia = add(&service, &mut graph, "Cia");
        service.connect(&mut graph, anna, bo).unwrap();
        service.connect(&mut graph, bo, cia).unwrap();

        service.delete_member(&mut graph, bo).unwrap();

        assert!(graph.edges.iter().all(|e| !e.involves(bo)));
        assert!(graph.edges.is_empty());
        assert!(!graph.node(cia).unwrap().has_big);
        assert!(f.db.connections().find_by_tree(f.tree_id).unwrap().is_empty());

        let reloaded = service.load(f.tree_id).unwrap();
        assert_eq!(reloaded.nodes.len(), 2);
    }

    #[test]
    fn test_reposition_clamps_and_persists() {
        let f = setup();
        let service = TreeEditorService::new(&f.db);
        let mut graph = service.load(f.tree_id).unwrap();
        let anna = add(&service, &mut graph, "Anna");

        let (x, y) = service.reposition(&mut graph, anna, -40.0, 5000.0, canvas()).unwrap();

        assert_eq!(x, 0.0);
        assert_eq!(y, canvas().max_y());
        let stored = f.db.trees().find_member(anna).unwrap().unwrap();
        assert_eq!((stored.position_x, stored.position_y), (x, y));
    }

    #[test]
    fn test_auto_layout_persists_positions_with_cycle() {
        let f = setup();
        let service = TreeEditorService::new(&f.db);
        let mut graph = service.load(f.tree_id).unwrap();
        let a = add(&service, &mut graph, "A");
        let b = add(&service, &mut graph, "B");
        service.connect(&mut graph, a, b).unwrap();
        service.connect(&mut graph, b, a).unwrap();

        service.apply_auto_layout(&mut graph, canvas()).unwrap();

        let reloaded = service.load(f.tree_id).unwrap();
        for node in &reloaded.nodes {
            let local = graph.node(node.id()).unwrap();
            assert_eq!(node.position(), local.position());
            assert!(node.member.position_x >= 0.0);
        }
    }

    #[test]
    fn test_sync_submissions_adds_each_once() {
        let f = setup();
        for name in ["Anna", "  ", "Bo"] {
            f.db.submissions()
                .create(f.form_id, &[(f.question_id, Answer::Text(name.into()))])
                .unwrap();
        }
        let service = TreeEditorService::new(&f.db);
        let mut graph = service.load(f.tree_id).unwrap();

        assert_eq!(service.sync_submissions(&mut graph, canvas()).unwrap(), 2);
        assert_eq!(service.sync_submissions(&mut graph, canvas()).unwrap(), 0);

        let names: Vec<&str> = graph.nodes.iter().map(|n| n.member.identifier.as_str()).collect();
        assert_eq!(names, vec!["Anna", "Bo"]);
        let (a, b) = (graph.nodes[0].position(), graph.nodes[1].position());
        assert!(a != b);
    }

    #[test]
    fn test_toggle_big_recomputes_category() {
        let f = setup();
        let service = TreeEditorService::new(&f.db);
        let mut graph = service.load(f.tree_id).unwrap();
        let anna = add(&service, &mut graph, "Anna");

        assert!(service.toggle_big(&mut graph, anna).unwrap());
        assert_eq!(graph.node(anna).unwrap().category(), NodeCategory::BigOnly);
        assert!(!service.toggle_big(&mut graph, anna).unwrap());
        assert_eq!(graph.node(anna).unwrap().category(), NodeCategory::Unconnected);
        assert!(!f.db.trees().find_member(anna).unwrap().unwrap().is_big);
    }

    #[test]
    fn test_delete_connection_clears_big() {
        let f = setup();
        let service = TreeEditorService::new(&f.db);
        let mut graph = service.load(f.tree_id).unwrap();
        let anna = add(&service, &mut graph, "Anna");
        let bo = add(&service, &mut graph, "Bo");
        service.connect(&mut graph, anna, bo).unwrap();
        let connection_id = graph.edges[0].id.unwrap();

        service.delete_connection(&mut graph, connection_id).unwrap();

        assert!(graph.edges.is_empty());
        assert!(!graph.node(bo).unwrap().has_big);
        assert_eq!(graph.node(bo).unwrap().category(), NodeCategory::Unconnected);
        assert_eq!(f.db.connections().count_by_tree(f.tree_id).unwrap(), 0);

        service.connect(&mut graph, anna, bo).unwrap();
        let err = service.delete_connection(&mut graph, 9999).unwrap_err();
        assert!(matches!(AppError::find(&err), Some(AppError::NotFound(_))));
        assert_eq!(graph.edges.len(), 1);
        assert!(graph.node(bo).unwrap().has_big);
    }

    #[test]
    fn test_sync_places_new_members_below_lowest_node() {
        let f = setup();
        let service = TreeEditorService::new(&f.db);
        let mut graph = service.load(f.tree_id).unwrap();
        let anna = add(&service, &mut graph, "Anna");
        service.reposition(&mut graph, anna, 300.0, 200.0, canvas()).unwrap();

        f.db.submissions()
            .create(f.form_id, &[(f.question_id, Answer::Text("Bo".into()))])
            .unwrap();
        service.sync_submissions(&mut graph, canvas()).unwrap();

        let bo = graph.nodes.iter().find(|n| n.member.identifier == "Bo").unwrap();
        assert_eq!(
            bo.position(),
            (layout::PADDING, 200.0 + layout::NODE_HEIGHT + layout::PADDING)
        );
    }
}
