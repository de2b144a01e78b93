//! Database access for the CultureArc backend
//!
//! SQLite via sqlx. Schema creation is idempotent; every module that opens
//! the database runs it on startup.

pub mod init;
pub mod models;
pub mod settings;

pub use init::{create_tables, init_database};
