pub mod challenge_form;
pub mod confirm_dialog;
pub mod form_form;
pub mod point_award;
pub mod question_form;
pub mod tree_form;

pub use challenge_form::ChallengeFormModal;
pub use confirm_dialog::ConfirmDialog;
pub use form_form::FormFormModal;
pub use point_award::PointAwardModal;
pub use question_form::QuestionFormModal;
pub use tree_form::TreeFormModal;
