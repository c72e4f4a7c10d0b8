//! In-memory fact store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::onboarding::model::BusinessField;

use super::traits::FactStore;

/// In-memory [`FactStore`] backend. Insertion order per organization is
/// preserved, which is what makes the question queue FIFO.
#[derive(Default)]
pub struct MemoryStore {
    fields: RwLock<HashMap<String, Vec<BusinessField>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FactStore for MemoryStore {
    async fn list_fields(&self, organization_id: &str) -> Result<Vec<BusinessField>, StoreError> {
        let fields = self.fields.read().await;
        Ok(fields.get(organization_id).cloned().unwrap_or_default())
    }

    async fn insert_fields(
        &self,
        organization_id: &str,
        new_fields: Vec<BusinessField>,
    ) -> Result<(), StoreError> {
        let mut fields = self.fields.write().await;
        let org_fields = fields.entry(organization_id.to_string()).or_default();
        for field in new_fields {
            if org_fields.iter().any(|f| f.field_name == field.field_name) {
                debug!(
                    organization_id,
                    field_name = %field.field_name,
                    "skipping duplicate field insert"
                );
                continue;
            }
            org_fields.push(field);
        }
        Ok(())
    }

    async fn mark_answered(
        &self,
        organization_id: &str,
        field_name: &str,
        value: &str,
        confidence: f64,
    ) -> Result<bool, StoreError> {
        let mut fields = self.fields.write().await;
        let org_fields = fields
            .get_mut(organization_id)
            .ok_or_else(|| StoreError::NotFound {
                organization_id: organization_id.to_string(),
                field: field_name.to_string(),
            })?;
        let field = org_fields
            .iter_mut()
            .find(|f| f.field_name == field_name)
            .ok_or_else(|| StoreError::NotFound {
                organization_id: organization_id.to_string(),
                field: field_name.to_string(),
            })?;

        if field.is_answered {
            return Ok(false);
        }
        field.is_answered = true;
        field.value = Some(value.to_string());
        field.confidence = Some(confidence);
        field.updated_at = Utc::now();
        Ok(true)
    }
}
