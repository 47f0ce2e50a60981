//! Biglittle Desktop - fadderprogram för föreningar
//!
//! Formulär samlar in svar, svaren blir noder i ett fadderträd och
//! paren i trädet tävlar om poäng i utmaningar.

#![allow(dead_code)]

pub mod models;
pub mod db;
pub mod services;
pub mod ui;
pub mod utils;

// Re-exports
pub use db::Database;
pub use models::*;
pub use ui::{AppState, View};
