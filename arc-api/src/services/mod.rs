//! Backend services for arc-api
//!
//! External AI integration and the moderation orchestration built on it.

pub mod gemini;
pub mod moderation;

pub use gemini::{GeminiClient, GeminiError, GeminiReviewer};
pub use moderation::{
    ArtifactSubmission, ContentReviewer, ModerationOutcome, ModerationService,
    ModerationSettings, ReviewError,
};
