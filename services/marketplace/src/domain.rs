//! Business rules that do not need the database: id parsing, message
//! content checks, the first-message coin gate and the review
//! eligibility state machine. Services feed them rows read inside their
//! transactions.

use serde_json::Value;
use validator::Validate;
use workup_common::AppError;
use workup_database::Deal;

pub const INSUFFICIENT_COINS: &str = "Insufficient coins. Please purchase more.";
pub const NOT_AUTHORIZED_TO_REVIEW: &str = "Not authorized to review this deal";
pub const JOB_DETAILS_REQUIRED: &str = "Cannot review until artisan uploads job details";
pub const ALREADY_REVIEWED: &str = "This deal has already been reviewed";

/// Parses a positive integer identifier taken from a path segment.
pub fn parse_id(raw: &str, what: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation(format!("Invalid {}", what)))
}

pub fn require_id(value: Option<i32>, field: &str) -> Result<i32, AppError> {
    value
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// Message bodies must be JSON strings that are not blank. Returns the trimmed text.
pub fn message_content(content: Option<&Value>) -> Result<String, AppError> {
    match content {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        _ => Err(AppError::Validation(
            "Message content must be a non-empty string".to_string(),
        )),
    }
}

pub fn validate_request<T: Validate>(request: &T) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|errors| AppError::Validation(format!("Validation error: {}", errors)))
}

/// Coins to charge an artisan for a message, if any. Only an artisan's
/// first message to a receiver is charged, and a zero fee charges nothing.
pub fn first_message_fee(sender_artisan_id: Option<i32>, prior_messages: i64, fee: i32) -> Option<i32> {
    match sender_artisan_id {
        Some(_) if prior_messages == 0 && fee > 0 => Some(fee),
        _ => None,
    }
}

/// Lifecycle of a deal as seen by the review flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealStage {
    NoDeal,
    DealConfirmed,
    /// A job posting exists, so the deal is reviewable.
    JobPosted,
    Reviewed,
}

impl DealStage {
    pub fn of(deal_exists: bool, has_job_posting: bool, has_review: bool) -> Self {
        match (deal_exists, has_job_posting, has_review) {
            (false, _, _) => DealStage::NoDeal,
            (true, _, true) => DealStage::Reviewed,
            (true, true, false) => DealStage::JobPosted,
            (true, false, false) => DealStage::DealConfirmed,
        }
    }

    pub fn is_reviewable(self) -> bool {
        self == DealStage::JobPosted
    }
}

/// Decides whether `reviewer_id` may review `deal`.
pub fn check_review_eligibility(
    deal: Option<&Deal>,
    reviewer_id: i32,
    has_job_posting: bool,
    has_review: bool,
) -> Result<(), AppError> {
    let deal = deal.ok_or_else(|| AppError::NotFound("Deal not found".to_string()))?;

    if deal.user_id != reviewer_id {
        return Err(AppError::Authorization(NOT_AUTHORIZED_TO_REVIEW.to_string()));
    }

    let stage = DealStage::of(true, has_job_posting, has_review);
    if stage == DealStage::Reviewed {
        return Err(AppError::Conflict(ALREADY_REVIEWED.to_string()));
    }
    if !stage.is_reviewable() {
        return Err(AppError::Authorization(JOB_DETAILS_REQUIRED.to_string()));
    }
    Ok(())
}

pub fn validate_review_input(rating: Option<i32>, comment: Option<&str>) -> Result<(i32, String), AppError> {
    let rating = rating
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| AppError::Validation("Rating must be between 1 and 5".to_string()))?;

    let comment = comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("Comment is required".to_string()))?;

    Ok((rating, comment.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn deal(user_id: i32) -> Deal {
        Deal {
            id: 1,
            user_id,
            artisan_id: 9,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("12", "user id").unwrap(), 12);
        assert_eq!(parse_id(" 3 ", "user id").unwrap(), 3);
        for bad in ["abc", "", "0", "-4", "1.5", "undefined"] {
            assert_eq!(parse_id(bad, "user id").unwrap_err().status_code(), 400, "{bad}");
        }
        assert!(require_id(None, "sender_id").is_err());
        assert_eq!(require_id(Some(2), "sender_id").unwrap(), 2);
    }

    #[test]
    fn content_must_be_a_non_blank_string() {
        assert_eq!(message_content(Some(&json!("  Hello "))).unwrap(), "Hello");
        assert!(message_content(None).is_err());
        assert!(message_content(Some(&json!("   "))).is_err());
        assert!(message_content(Some(&json!(42))).is_err());
        assert!(message_content(Some(&json!(null))).is_err());
    }

    #[test]
    fn only_an_artisans_first_message_is_charged() {
        assert_eq!(first_message_fee(Some(4), 0, 25), Some(25));
        assert_eq!(first_message_fee(Some(4), 1, 25), None);
        assert_eq!(first_message_fee(None, 0, 25), None);
        assert_eq!(first_message_fee(Some(4), 0, 0), None);
    }

    #[test]
    fn deal_stages_follow_the_review_lifecycle() {
        assert_eq!(DealStage::of(false, false, false), DealStage::NoDeal);
        assert_eq!(DealStage::of(true, false, false), DealStage::DealConfirmed);
        assert_eq!(DealStage::of(true, true, false), DealStage::JobPosted);
        assert_eq!(DealStage::of(true, true, true), DealStage::Reviewed);
        assert!(DealStage::JobPosted.is_reviewable());
        assert!(!DealStage::DealConfirmed.is_reviewable());
        assert!(!DealStage::Reviewed.is_reviewable());
    }

    #[test]
    fn review_requires_deal_ownership_and_job_posting() {
        let err = check_review_eligibility(None, 5, true, false).unwrap_err();
        assert_eq!(err.status_code(), 404);

        let err = check_review_eligibility(Some(&deal(6)), 5, true, false).unwrap_err();
        assert_eq!(err.public_message(), NOT_AUTHORIZED_TO_REVIEW);
        assert_eq!(err.status_code(), 403);

        let err = check_review_eligibility(Some(&deal(5)), 5, false, false).unwrap_err();
        assert_eq!(err.public_message(), JOB_DETAILS_REQUIRED);
        assert_eq!(err.status_code(), 403);

        let err = check_review_eligibility(Some(&deal(5)), 5, true, true).unwrap_err();
        assert_eq!(err.status_code(), 409);

        // A reviewed deal stays a conflict even if its posting was removed
        let err = check_review_eligibility(Some(&deal(5)), 5, false, true).unwrap_err();
        assert_eq!(err.public_message(), ALREADY_REVIEWED);

        assert!(check_review_eligibility(Some(&deal(5)), 5, true, false).is_ok());
    }

    #[test]
    fn review_input_bounds() {
        assert_eq!(validate_review_input(Some(5), Some(" Great ")).unwrap(), (5, "Great".to_string()));
        assert!(validate_review_input(Some(0), Some("ok")).is_err());
        assert!(validate_review_input(Some(6), Some("ok")).is_err());
        assert!(validate_review_input(None, Some("ok")).is_err());
        assert!(validate_review_input(Some(3), Some("  ")).is_err());
        assert!(validate_review_input(Some(3), None).is_err());
    }
}
