//! Review model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::utils::errors::{EventHubError, Result};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const MAX_COMMENT_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(alias = "_id")]
    pub id: String,
    pub event_id: String,
    pub author_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    /// The reviewed host
    pub host_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Review form input, validated before any network call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewDraft {
    pub fn new(rating: u8, comment: Option<String>) -> Self {
        Self { rating, comment }
    }

    /// Check rating range and comment length; empty comments become `None`
    pub fn validate(&self) -> Result<ReviewDraft> {
        if self.rating == 0 {
            return Err(EventHubError::Validation("Please select a rating".to_string()));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(EventHubError::Validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }

        let comment = self
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        if let Some(text) = &comment {
            if text.chars().count() > MAX_COMMENT_CHARS {
                return Err(EventHubError::Validation(format!(
                    "Comment must be at most {} characters",
                    MAX_COMMENT_CHARS
                )));
            }
        }

        Ok(ReviewDraft {
            rating: self.rating,
            comment,
        })
    }
}

/// Reviews list with the backend-computed aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub total_reviews: u32,
}
