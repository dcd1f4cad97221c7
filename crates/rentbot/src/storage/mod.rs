//! SQLite storage: pool, schema bootstrap and queries per table group

pub mod apartments;
pub mod db;
pub mod events;
pub mod giveaway;
pub mod promo;
pub mod requests;
pub mod users;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
