//! Moderation orchestration
//!
//! Decides whether automated review runs at all and assigns each new
//! artifact its initial status. Review failures never block creation:
//! anything short of a confident verdict leaves the artifact pending for
//! a human.

use crate::services::gemini::{GeminiClient, GeminiReviewer, DEFAULT_GEMINI_MODEL};
use arc_common::config::TomlConfig;
use arc_common::moderation::{determine_status, AiReview, ArtifactStatus, DEFAULT_APPROVE_THRESHOLD};
use arc_common::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error as ThisError;
use tokio::sync::RwLock;
use tracing::warn;

const DEFAULT_REVIEW_TIMEOUT_SECS: u64 = 30;

/// Descriptive fields of a submission, as sent to the reviewer.
///
/// Passed through to the model as-is; request validation happens at the
/// HTTP layer before moderation is invoked.
#[derive(Debug, Clone)]
pub struct ArtifactSubmission {
    pub title: String,
    pub description: String,
    pub category: String,
    pub era: String,
    pub region: String,
}

/// Error from a content reviewer implementation.
///
/// The production Gemini reviewer folds its failures into the review
/// record and never returns this; the orchestration still handles it so
/// that a misbehaving implementation cannot block artifact creation.
#[derive(Debug, ThisError)]
#[error("{0}")]
pub struct ReviewError(pub String);

/// Produces an appropriateness review for a submission
#[async_trait]
pub trait ContentReviewer: Send + Sync {
    async fn review(&self, submission: &ArtifactSubmission) -> std::result::Result<AiReview, ReviewError>;
}

/// Tunables for the moderation pipeline
#[derive(Debug, Clone)]
pub struct ModerationSettings {
    /// Gemini model used for review
    pub model: String,
    /// Confidence at or above which a verdict auto-decides the status
    pub approve_threshold: f64,
    /// Timeout for the outbound review call; a timeout collapses into the
    /// manual-review record like any other transport failure
    pub review_timeout: Duration,
}

impl Default for ModerationSettings {
    fn default() -> Self {
        ModerationSettings {
            model: DEFAULT_GEMINI_MODEL.to_string(),
            approve_threshold: DEFAULT_APPROVE_THRESHOLD,
            review_timeout: Duration::from_secs(DEFAULT_REVIEW_TIMEOUT_SECS),
        }
    }
}

impl ModerationSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        let defaults = ModerationSettings::default();
        ModerationSettings {
            model: config.gemini_model.clone().unwrap_or(defaults.model),
            approve_threshold: config.approve_threshold.unwrap_or(defaults.approve_threshold),
            review_timeout: config
                .review_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.review_timeout),
        }
    }
}

/// What moderation decided for a new artifact
#[derive(Debug, Clone)]
pub struct ModerationOutcome {
    pub status: ArtifactStatus,
    pub review: Option<AiReview>,
}

struct ReviewerState {
    client: Option<GeminiClient>,
    reviewer: Option<Arc<dyn ContentReviewer>>,
}

/// Moderation service: holds the (re)configurable reviewer and applies
/// the status derivation to its verdicts
pub struct ModerationService {
    settings: ModerationSettings,
    http: reqwest::Client,
    state: RwLock<ReviewerState>,
}

impl ModerationService {
    /// Build the service; `api_key == None` disables automated review
    /// entirely (submissions auto-approve).
    pub fn new(settings: ModerationSettings, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.review_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let state = match api_key {
            Some(key) => {
                let client = GeminiClient::new(http.clone(), settings.model.clone(), key);
                ReviewerState {
                    client: Some(client.clone()),
                    reviewer: Some(Arc::new(GeminiReviewer::new(client))),
                }
            }
            None => {
                warn!(
                    "No Gemini API key configured - content moderation is DISABLED \
                     and new artifacts will be auto-approved"
                );
                ReviewerState {
                    client: None,
                    reviewer: None,
                }
            }
        };

        Ok(ModerationService {
            settings,
            http,
            state: RwLock::new(state),
        })
    }

    /// Build the service around an arbitrary reviewer (tests, alternate
    /// backends). No Gemini client is attached.
    pub fn with_reviewer(reviewer: Arc<dyn ContentReviewer>, approve_threshold: f64) -> Self {
        ModerationService {
            settings: ModerationSettings {
                approve_threshold,
                ..ModerationSettings::default()
            },
            http: reqwest::Client::new(),
            state: RwLock::new(ReviewerState {
                client: None,
                reviewer: Some(reviewer),
            }),
        }
    }

    pub async fn enabled(&self) -> bool {
        self.state.read().await.reviewer.is_some()
    }

    /// Swap in a new Gemini API key at runtime
    pub async fn set_api_key(&self, api_key: String) {
        let client = GeminiClient::new(self.http.clone(), self.settings.model.clone(), api_key);
        let mut state = self.state.write().await;
        state.client = Some(client.clone());
        state.reviewer = Some(Arc::new(GeminiReviewer::new(client)));
    }

    /// The shared Gemini client, if one is configured (used by the
    /// authenticity analysis endpoint)
    pub async fn client(&self) -> Option<GeminiClient> {
        self.state.read().await.client.clone()
    }

    /// HTTP client sharing the service's connection pool and timeout
    pub fn http_client(&self) -> reqwest::Client {
        self.http.clone()
    }

    /// Run the moderation pipeline for a new submission.
    ///
    /// - Review disabled: auto-approve with no review record (flagged in
    ///   the logs; a policy choice for keyless dev/test deployments).
    /// - Review completes: store the record verbatim and derive the
    ///   status from it.
    /// - Reviewer errors: the artifact is still created, pending, with a
    ///   manual-review record. Moderation unavailability must never block
    ///   content creation, and must never silently approve it.
    pub async fn moderate(&self, submission: &ArtifactSubmission) -> ModerationOutcome {
        let reviewer = self.state.read().await.reviewer.clone();

        let Some(reviewer) = reviewer else {
            warn!("Content moderation disabled; auto-approving submission");
            return ModerationOutcome {
                status: ArtifactStatus::Approved,
                review: None,
            };
        };

        match reviewer.review(submission).await {
            Ok(review) => {
                let status = determine_status(&review, self.settings.approve_threshold);
                ModerationOutcome {
                    status,
                    review: Some(review),
                }
            }
            Err(e) => {
                warn!("Content reviewer failed unexpectedly: {}; deferring to manual review", e);
                ModerationOutcome {
                    status: ArtifactStatus::Pending,
                    review: Some(AiReview::manual_review(format!("AI review failed: {}", e))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn submission() -> ArtifactSubmission {
        ArtifactSubmission {
            title: "Amphora".to_string(),
            description: "Greek storage vessel".to_string(),
            category: "Pottery".to_string(),
            era: "Classical".to_string(),
            region: "Greece".to_string(),
        }
    }

    /// Reviewer returning a fixed verdict
    struct FixedReviewer(AiReview);

    #[async_trait]
    impl ContentReviewer for FixedReviewer {
        async fn review(
            &self,
            _submission: &ArtifactSubmission,
        ) -> std::result::Result<AiReview, ReviewError> {
            Ok(self.0.clone())
        }
    }

    /// Reviewer that always errors (a misbehaving implementation)
    struct ErroringReviewer;

    #[async_trait]
    impl ContentReviewer for ErroringReviewer {
        async fn review(
            &self,
            _submission: &ArtifactSubmission,
        ) -> std::result::Result<AiReview, ReviewError> {
            Err(ReviewError("simulated reviewer crash".to_string()))
        }
    }

    fn verdict(is_appropriate: Option<bool>, confidence: f64) -> AiReview {
        AiReview {
            is_appropriate,
            confidence,
            reason: "test".to_string(),
            reviewed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn disabled_moderation_auto_approves_without_review() {
        let service =
            ModerationService::new(ModerationSettings::default(), None).expect("service");
        assert!(!service.enabled().await);

        let outcome = service.moderate(&submission()).await;
        assert_eq!(outcome.status, ArtifactStatus::Approved);
        assert!(outcome.review.is_none());
    }

    #[tokio::test]
    async fn confident_verdicts_decide_the_status() {
        let cases = [
            (verdict(Some(true), 0.95), ArtifactStatus::Approved),
            (verdict(Some(false), 0.71), ArtifactStatus::Rejected),
            (verdict(Some(true), 0.5), ArtifactStatus::Pending),
            (verdict(None, 0.0), ArtifactStatus::Pending),
        ];

        for (review, expected) in cases {
            let service = ModerationService::with_reviewer(
                Arc::new(FixedReviewer(review.clone())),
                DEFAULT_APPROVE_THRESHOLD,
            );
            let outcome = service.moderate(&submission()).await;
            assert_eq!(outcome.status, expected);
            // The review record is stored verbatim
            let stored = outcome.review.expect("review attached");
            assert_eq!(stored.is_appropriate, review.is_appropriate);
            assert_eq!(stored.confidence, review.confidence);
        }
    }

    #[tokio::test]
    async fn erroring_reviewer_fails_open_to_pending() {
        let service = ModerationService::with_reviewer(
            Arc::new(ErroringReviewer),
            DEFAULT_APPROVE_THRESHOLD,
        );

        let outcome = service.moderate(&submission()).await;
        assert_eq!(outcome.status, ArtifactStatus::Pending);

        let review = outcome.review.expect("failure record attached");
        assert_eq!(review.is_appropriate, None);
        assert!(review.reason.contains("simulated reviewer crash"));
        assert!(review.reason.ends_with("Requires manual review."));
    }

    #[tokio::test]
    async fn setting_an_api_key_enables_review() {
        let service =
            ModerationService::new(ModerationSettings::default(), None).expect("service");
        assert!(!service.enabled().await);

        service.set_api_key("fresh-key".to_string()).await;
        assert!(service.enabled().await);
        assert!(service.client().await.is_some());
    }
}
