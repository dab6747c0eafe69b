pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;

pub use config::Config;
pub use error::{ApiErrorCode, Error, Result};
