//! SQLite storage backend for the class tax ledger.
//!
//! Schema lives in `migrations/` and is applied by
//! [`SqliteRepository::run_migrations`]. Treasury increments are single
//! `UPDATE ... SET x = x + ?` statements inside a SQLite transaction, so
//! concurrent postings never lose an update.

pub mod decimal;
mod factory;
pub mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::{SqliteRepository, SqliteTransaction};
