pub mod organization;
pub mod form;
pub mod submission;
pub mod family_tree;
pub mod challenge;
pub mod config;

pub use organization::*;
pub use form::*;
pub use submission::*;
pub use family_tree::*;
pub use challenge::*;
pub use config::*;
