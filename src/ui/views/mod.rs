pub mod dashboard;
pub mod form_detail;
pub mod form_list;
pub mod questionnaire;
pub mod settings;
pub mod setup_wizard;
pub mod tree_graph;
pub mod tree_list;
pub mod tree_manage;

pub use dashboard::DashboardView;
pub use form_detail::FormDetailView;
pub use form_list::FormListView;
pub use questionnaire::QuestionnaireView;
pub use settings::SettingsView;
pub use setup_wizard::SetupWizardView;
pub use tree_graph::TreeGraphView;
pub use tree_list::TreeListView;
pub use tree_manage::TreeManageView;
