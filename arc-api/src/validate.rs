//! Request field validation
//!
//! Bounds are enforced here, before the moderation core or any query
//! runs; the core itself passes fields through unvalidated.

use crate::ApiError;

/// Reject a trimmed string outside `[min, max]` characters
fn bounded(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(ApiError::BadRequest(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    if len > max {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Reject anything that doesn't parse as an absolute http(s) URL
fn valid_url(field: &str, value: &str) -> Result<(), ApiError> {
    match reqwest::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        _ => Err(ApiError::BadRequest(format!("Invalid {} URL", field))),
    }
}

pub fn artifact_title(value: &str) -> Result<(), ApiError> {
    bounded("Title", value, 3, 200)
}

pub fn artifact_description(value: &str) -> Result<(), ApiError> {
    bounded("Description", value, 10, 5000)
}

pub fn artifact_image_url(value: &str) -> Result<(), ApiError> {
    valid_url("image", value)
}

pub fn artifact_category(value: &str) -> Result<(), ApiError> {
    bounded("Category", value, 1, 100)
}

pub fn artifact_era(value: &str) -> Result<(), ApiError> {
    bounded("Era", value, 1, 100)
}

pub fn artifact_region(value: &str) -> Result<(), ApiError> {
    bounded("Region", value, 1, 100)
}

pub fn comment_text(value: &str) -> Result<(), ApiError> {
    bounded("Comment", value, 1, 1000)
}

pub fn override_reason(value: &str) -> Result<(), ApiError> {
    bounded("Reason", value, 0, 500)
}

pub fn collection_title(value: &str) -> Result<(), ApiError> {
    bounded("Title", value, 3, 100)
}

pub fn collection_description(value: &str) -> Result<(), ApiError> {
    bounded("Description", value, 5, 1000)
}

pub fn collection_image_url(value: &str) -> Result<(), ApiError> {
    valid_url("image", value)
}

pub fn user_name(value: &str) -> Result<(), ApiError> {
    bounded("Name", value, 2, 50)
}

pub fn user_email(value: &str) -> Result<(), ApiError> {
    // Full address validation belongs to the upstream signup flow; this
    // only rejects obviously broken values on the admin update path.
    let value = value.trim();
    let well_formed = value.len() >= 3
        && value.contains('@')
        && !value.starts_with('@')
        && !value.ends_with('@');
    if well_formed {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid email format".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_bounds() {
        assert!(artifact_title("ok title").is_ok());
        assert!(artifact_title("ab").is_err());
        assert!(artifact_title(&"x".repeat(201)).is_err());
        // Whitespace doesn't count toward the minimum
        assert!(artifact_title("  a  ").is_err());
    }

    #[test]
    fn description_bounds() {
        assert!(artifact_description("a meaningful description").is_ok());
        assert!(artifact_description("too short").is_err());
    }

    #[test]
    fn image_url_must_be_http() {
        assert!(artifact_image_url("https://example.com/vase.jpg").is_ok());
        assert!(artifact_image_url("ftp://example.com/vase.jpg").is_err());
        assert!(artifact_image_url("not a url").is_err());
    }

    #[test]
    fn comment_bounds() {
        assert!(comment_text("nice").is_ok());
        assert!(comment_text("   ").is_err());
        assert!(comment_text(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn override_reason_allows_empty_but_caps_length() {
        assert!(override_reason("").is_ok());
        assert!(override_reason(&"x".repeat(500)).is_ok());
        assert!(override_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn email_shape() {
        assert!(user_email("a@b.com").is_ok());
        assert!(user_email("no-at-sign").is_err());
        assert!(user_email("@leading").is_err());
    }
}
