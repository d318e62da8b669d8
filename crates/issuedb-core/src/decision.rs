//! Decision point types: structured human-in-the-loop prompts bound to an issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A structured prompt-and-response record attached to an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPoint {
    pub id: i64,

    pub issue_id: String,

    pub prompt: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_option: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub selected_option: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub response_text: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rationale: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub responded_by: String,

    pub iteration: i32,

    pub max_iterations: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_id: Option<i64>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub guidance: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub urgency: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub requested_by: String,

    pub created_at: DateTime<Utc>,
}

/// Fields accepted by `CreateDecisionPoint`.
#[derive(Debug, Clone, Default)]
pub struct NewDecisionPoint {
    pub prompt: String,
    pub context: String,
    pub options: Vec<String>,
    pub default_option: String,
    pub iteration: i32,
    pub max_iterations: i32,
    pub prior_id: Option<i64>,
    pub guidance: String,
    pub urgency: String,
    pub requested_by: String,
}

/// Mutable fields accepted by `UpdateDecisionPoint`.
#[derive(Debug, Clone, Default)]
pub struct DecisionPointResponse {
    pub selected_option: String,
    pub response_text: String,
    pub rationale: String,
    pub responded_by: String,
}

impl DecisionPoint {
    /// Whether this decision point is still awaiting a response.
    pub fn is_pending(&self) -> bool {
        self.responded_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_without_response() {
        let dp = DecisionPoint {
            id: 1,
            issue_id: "bd-abc".into(),
            prompt: "Proceed?".into(),
            context: String::new(),
            options: vec!["yes".into(), "no".into()],
            default_option: "yes".into(),
            selected_option: String::new(),
            response_text: String::new(),
            rationale: String::new(),
            responded_at: None,
            responded_by: String::new(),
            iteration: 1,
            max_iterations: 3,
            prior_id: None,
            guidance: String::new(),
            urgency: String::new(),
            requested_by: "alice".into(),
            created_at: Utc::now(),
        };
        assert!(dp.is_pending());
    }
}
