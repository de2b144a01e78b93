//! Moderation status derivation
//!
//! Maps the structured result of an AI content review onto an artifact
//! lifecycle status. The derivation is pure and side-effect-free; the
//! review itself (the outbound AI call) lives in the API crate's services.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Confidence below this value is not trusted to auto-decide a status.
///
/// Deployments can override it via `approve_threshold` in the TOML config.
pub const DEFAULT_APPROVE_THRESHOLD: f64 = 0.7;

/// Artifact lifecycle status controlling public visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ArtifactStatus {
    /// Awaiting manual review
    Pending,
    /// Publicly visible
    Approved,
    /// Hidden from the public catalog
    Rejected,
}

impl ArtifactStatus {
    /// Convert to the string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::Approved => "approved",
            ArtifactStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ArtifactStatus::Pending),
            "approved" => Ok(ArtifactStatus::Approved),
            "rejected" => Ok(ArtifactStatus::Rejected),
            other => Err(Error::InvalidInput(format!(
                "Status must be pending, approved, or rejected (got '{}')",
                other
            ))),
        }
    }
}

/// Structured result of an AI content review
///
/// `is_appropriate == None` is the "undetermined" sentinel: the review
/// call failed or produced unparseable output, and a human must decide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReview {
    /// Appropriateness judgment; `None` means undetermined
    pub is_appropriate: Option<bool>,
    /// Reviewer confidence in the judgment (0.0-1.0)
    pub confidence: f64,
    /// Human-readable explanation of the judgment
    pub reason: String,
    /// When the review was produced
    pub reviewed_at: DateTime<Utc>,
}

impl AiReview {
    /// Failure record: the review could not be completed and the artifact
    /// must wait for a human.
    pub fn manual_review(diagnostic: impl fmt::Display) -> Self {
        AiReview {
            is_appropriate: None,
            confidence: 0.0,
            reason: format!("{}. Requires manual review.", diagnostic),
            reviewed_at: Utc::now(),
        }
    }
}

/// Derive an artifact status from an AI review
///
/// First match wins:
///
/// | is_appropriate | confidence    | status   |
/// |----------------|---------------|----------|
/// | None           | any           | pending  |
/// | Some(true)     | >= threshold  | approved |
/// | Some(false)    | >= threshold  | rejected |
/// | Some(_)        | < threshold   | pending  |
///
/// A confidence below the threshold falls back to human review regardless
/// of which way the judgment leans.
pub fn determine_status(review: &AiReview, approve_threshold: f64) -> ArtifactStatus {
    match review.is_appropriate {
        None => ArtifactStatus::Pending,
        Some(true) if review.confidence >= approve_threshold => ArtifactStatus::Approved,
        Some(false) if review.confidence >= approve_threshold => ArtifactStatus::Rejected,
        Some(_) => ArtifactStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(is_appropriate: Option<bool>, confidence: f64) -> AiReview {
        AiReview {
            is_appropriate,
            confidence,
            reason: "test".to_string(),
            reviewed_at: Utc::now(),
        }
    }

    #[test]
    fn undetermined_is_always_pending() {
        for confidence in [0.0, 0.5, 0.7, 1.0] {
            let r = review(None, confidence);
            assert_eq!(
                determine_status(&r, DEFAULT_APPROVE_THRESHOLD),
                ArtifactStatus::Pending
            );
        }
    }

    #[test]
    fn confident_appropriate_is_approved() {
        let r = review(Some(true), 0.95);
        assert_eq!(
            determine_status(&r, DEFAULT_APPROVE_THRESHOLD),
            ArtifactStatus::Approved
        );
    }

    #[test]
    fn confident_inappropriate_is_rejected() {
        let r = review(Some(false), 0.71);
        assert_eq!(
            determine_status(&r, DEFAULT_APPROVE_THRESHOLD),
            ArtifactStatus::Rejected
        );
    }

    #[test]
    fn low_confidence_is_pending_either_way() {
        let r = review(Some(true), 0.5);
        assert_eq!(
            determine_status(&r, DEFAULT_APPROVE_THRESHOLD),
            ArtifactStatus::Pending
        );

        let r = review(Some(false), 0.69);
        assert_eq!(
            determine_status(&r, DEFAULT_APPROVE_THRESHOLD),
            ArtifactStatus::Pending
        );
    }

    #[test]
    fn threshold_boundary_counts_as_confident() {
        let r = review(Some(true), 0.7);
        assert_eq!(
            determine_status(&r, DEFAULT_APPROVE_THRESHOLD),
            ArtifactStatus::Approved
        );

        let r = review(Some(false), 0.7);
        assert_eq!(
            determine_status(&r, DEFAULT_APPROVE_THRESHOLD),
            ArtifactStatus::Rejected
        );
    }

    #[test]
    fn derivation_is_total() {
        // Every combination of judgment and confidence maps to exactly one
        // of the three statuses.
        for is_appropriate in [None, Some(true), Some(false)] {
            for i in 0..=100 {
                let confidence = f64::from(i) / 100.0;
                let status = determine_status(
                    &review(is_appropriate, confidence),
                    DEFAULT_APPROVE_THRESHOLD,
                );
                assert!(matches!(
                    status,
                    ArtifactStatus::Pending | ArtifactStatus::Approved | ArtifactStatus::Rejected
                ));
            }
        }
    }

    #[test]
    fn custom_threshold_is_respected() {
        let r = review(Some(true), 0.75);
        assert_eq!(determine_status(&r, 0.9), ArtifactStatus::Pending);
        assert_eq!(determine_status(&r, 0.5), ArtifactStatus::Approved);
    }

    #[test]
    fn failed_review_record_defers_to_human() {
        let r = AiReview::manual_review("AI review failed: connection refused");
        assert_eq!(r.is_appropriate, None);
        assert_eq!(r.confidence, 0.0);
        assert!(r.reason.ends_with("Requires manual review."));
        assert_eq!(
            determine_status(&r, DEFAULT_APPROVE_THRESHOLD),
            ArtifactStatus::Pending
        );
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ArtifactStatus::Pending,
            ArtifactStatus::Approved,
            ArtifactStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<ArtifactStatus>().unwrap(), status);
        }
        assert!("archived".parse::<ArtifactStatus>().is_err());
    }
}
