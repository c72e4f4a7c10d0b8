//! Business-fact model: fields, generated questions, extracted facts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Textual marker the assistant embeds when it considers setup officially
/// done. Observing it saturates progress at 100% even though new question
/// batches can still be appended afterwards.
pub const SETUP_COMPLETE_MARKER: &str = "[SETUP_COMPLETE]";

/// The field whose acceptance triggers the display-name/slug side effect.
pub const BUSINESS_NAME_FIELD: &str = "business_name";

/// The shape of a business-info field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Array,
    Boolean,
    Number,
    MultipleChoice,
}

impl Default for FieldType {
    fn default() -> Self {
        Self::Text
    }
}

/// One fact slot about an organization, answered or pending.
///
/// Fields are write-once: extraction only mutates fields that are still
/// unanswered, and re-asking requires an explicit reset, never an overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessField {
    pub organization_id: String,
    /// Unique per organization.
    pub field_name: String,
    pub field_type: FieldType,
    pub is_answered: bool,
    pub value: Option<String>,
    pub confidence: Option<f64>,
    /// Non-empty whenever `is_answered` is false.
    pub question_template: String,
    pub choices: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BusinessField {
    /// Create a new, unanswered field.
    pub fn new(
        organization_id: impl Into<String>,
        field_name: impl Into<String>,
        field_type: FieldType,
        question_template: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            organization_id: organization_id.into(),
            field_name: field_name.into(),
            field_type,
            is_answered: false,
            value: None,
            confidence: None,
            question_template: question_template.into(),
            choices: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = Some(choices);
        self
    }
}

/// A question produced by the AI generator, not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub field_name: String,
    pub question_template: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

/// One `(field, value, confidence)` triple produced by fact extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub field_name: String,
    pub value: String,
    pub confidence: f64,
}

/// Check whether a chunk of assistant output carries the setup-complete
/// signal.
pub fn contains_setup_marker(text: &str) -> bool {
    text.contains(SETUP_COMPLETE_MARKER)
}

/// Strip the setup-complete marker for display.
pub fn strip_setup_marker(text: &str) -> String {
    text.replace(SETUP_COMPLETE_MARKER, "").trim().to_string()
}
