//! Rentbot - Telegram bot for a short-term apartment rental service
//!
//! Guests browse the apartment catalog, leave booking dates and collect promo
//! codes; admins manage apartments, requests, code pools, broadcasts and the
//! channel posts.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging and small shared helpers
//! - `storage`: SQLite pool, schema and queries
//! - `telegram`: dispatcher schema, screens and admin tools

#![allow(clippy::too_many_arguments)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod cli;
pub mod core;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use telegram::{schema, HandlerDeps};
