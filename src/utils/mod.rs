pub mod date;
pub mod error;
pub mod path;

pub use error::AppError;
