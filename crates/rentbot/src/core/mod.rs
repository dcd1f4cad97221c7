//! Core utilities: configuration, errors, logging and small shared helpers

pub mod config;
pub mod contacts;
pub mod error;
pub mod logging;
pub mod text;
pub mod throttle;

pub use error::{AppError, AppResult};
pub use logging::{init_logger, log_configuration_summary};
