//! Eligibility result model

use serde::{Deserialize, Serialize};

/// Whether a user may join an event, with ordered human-readable blockers.
/// Recomputed after every mutation, never cached across one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub can_join: bool,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl EligibilityResult {
    pub fn allowed() -> Self {
        Self {
            can_join: true,
            reasons: Vec::new(),
        }
    }

    pub fn blocked(reasons: Vec<String>) -> Self {
        Self {
            can_join: false,
            reasons,
        }
    }

    /// Combine two verdicts: joinable only if both agree, reasons de-duplicated in order
    pub fn merge(mut self, other: EligibilityResult) -> Self {
        self.can_join = self.can_join && other.can_join;
        for reason in other.reasons {
            if !self.reasons.contains(&reason) {
                self.reasons.push(reason);
            }
        }
        // a negative verdict with no explanation still needs one
        if !self.can_join && self.reasons.is_empty() {
            self.reasons.push("You are not eligible to join this event".to_string());
        }
        self
    }

    pub fn mentions(&self, reason: &str) -> bool {
        self.reasons.iter().any(|r| r == reason)
    }
}
