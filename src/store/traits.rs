//! The consumed fact-store contract.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::onboarding::model::BusinessField;

/// Narrow interface over the durable key/value store of business-info
/// fields. The storage engine itself lives elsewhere; this is only the
/// surface the extraction and question engines consume.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// All fields for an organization, in insertion order.
    async fn list_fields(&self, organization_id: &str) -> Result<Vec<BusinessField>, StoreError>;

    /// Insert new fields. Field names already present for the organization
    /// are skipped, preserving uniqueness.
    async fn insert_fields(
        &self,
        organization_id: &str,
        fields: Vec<BusinessField>,
    ) -> Result<(), StoreError>;

    /// Mark a field answered, conditional on it still being unanswered.
    /// Returns `false` when the field was already answered (a concurrent
    /// acceptance won the race) — the stored value is never overwritten.
    async fn mark_answered(
        &self,
        organization_id: &str,
        field_name: &str,
        value: &str,
        confidence: f64,
    ) -> Result<bool, StoreError>;
}
