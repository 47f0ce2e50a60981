//! Tjänster för Biglittle
//!
//! Innehåller affärslogik som inte hör hemma i UI eller databas.

pub mod export;
pub mod family_tree;
pub mod layout;
pub mod questionnaire;
pub mod scoring;

pub use export::{ExportFormat, ExportResult, ExportService, ReportType};
pub use family_tree::{NodeCategory, TreeEditorService, TreeGraph, TreeNode};
pub use layout::Canvas;
pub use questionnaire::QuestionnaireService;
pub use scoring::ScoringService;
