//! # CultureArc Common Library
//!
//! Shared code for the CultureArc backend including:
//! - Database schema, models and queries
//! - Moderation status derivation (the decision core)
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod moderation;

pub use error::{Error, Result};
pub use moderation::{determine_status, AiReview, ArtifactStatus};
