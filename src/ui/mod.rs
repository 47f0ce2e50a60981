pub mod modals;
pub mod shortcuts;
pub mod state;
pub mod theme;
pub mod views;

pub use state::{AppState, StatusType, View};
