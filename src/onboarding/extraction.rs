//! Fact extraction and write-once acceptance.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CoreConfig;
use crate::error::{ExtractionError, IdentityError};
use crate::llm::AiGenerator;
use crate::onboarding::model::{BUSINESS_NAME_FIELD, BusinessField, ExtractedFact};
use crate::store::FactStore;

/// Organization directory the business-name side effect writes to.
/// Updates are best effort: a failure is logged, never propagated.
#[async_trait]
pub trait OrgDirectory: Send + Sync {
    async fn update_display_name(
        &self,
        organization_id: &str,
        display_name: &str,
        slug: &str,
    ) -> Result<(), IdentityError>;
}

pub struct ExtractionEngine {
    store: Arc<dyn FactStore>,
    generator: Arc<dyn AiGenerator>,
    directory: Option<Arc<dyn OrgDirectory>>,
    config: CoreConfig,
}

impl ExtractionEngine {
    pub fn new(
        store: Arc<dyn FactStore>,
        generator: Arc<dyn AiGenerator>,
        config: CoreConfig,
    ) -> Self {
        Self {
            store,
            generator,
            directory: None,
            config,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn OrgDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Run extraction over one user message and persist accepted facts.
    /// Returns the facts that were actually stored (lost write-once races
    /// and low-confidence guesses are dropped).
    pub async fn extract_and_apply(
        &self,
        organization_id: &str,
        text: &str,
    ) -> Result<Vec<ExtractedFact>, ExtractionError> {
        let fields = self.store.list_fields(organization_id).await?;
        let unanswered: Vec<BusinessField> =
            fields.into_iter().filter(|f| !f.is_answered).collect();
        if unanswered.is_empty() {
            return Ok(Vec::new());
        }

        let facts = self
            .generator
            .extract_facts(organization_id, text, &unanswered)
            .await?;

        let mut accepted = Vec::new();
        for fact in facts {
            // Strictly greater than: a fact at exactly the threshold is
            // discarded.
            if fact.confidence <= self.config.accept_threshold {
                tracing::debug!(
                    organization_id,
                    field = %fact.field_name,
                    confidence = fact.confidence,
                    "Discarding low-confidence fact"
                );
                continue;
            }
            if !unanswered.iter().any(|f| f.field_name == fact.field_name) {
                tracing::debug!(
                    organization_id,
                    field = %fact.field_name,
                    "Discarding fact for unknown or answered field"
                );
                continue;
            }

            let stored = self
                .store
                .mark_answered(
                    organization_id,
                    &fact.field_name,
                    &fact.value,
                    fact.confidence,
                )
                .await?;
            if !stored {
                tracing::debug!(
                    organization_id,
                    field = %fact.field_name,
                    "Field answered concurrently, keeping first value"
                );
                continue;
            }

            if fact.field_name == BUSINESS_NAME_FIELD {
                self.apply_business_name(organization_id, &fact.value).await;
            }
            accepted.push(fact);
        }

        Ok(accepted)
    }

    async fn apply_business_name(&self, organization_id: &str, name: &str) {
        let Some(directory) = &self.directory else {
            return;
        };
        let slug = slugify(name);
        if let Err(e) = directory
            .update_display_name(organization_id, name, &slug)
            .await
        {
            tracing::warn!(organization_id, error = %e, "Display name update failed");
        }
    }
}

/// Lowercase, alphanumerics kept, runs of everything else collapsed to a
/// single hyphen, trimmed of leading/trailing hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}
