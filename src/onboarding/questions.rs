//! The onboarding question queue.
//!
//! Unanswered fields form a FIFO queue in insertion order. When the queue
//! runs dry we ask the generator for fresh questions, persist them, and
//! serve from the new head. Generation failures degrade to an empty queue
//! rather than surfacing to the user.

use std::sync::Arc;

use crate::llm::AiGenerator;
use crate::onboarding::model::BusinessField;
use crate::store::FactStore;

pub struct QuestionEngine {
    store: Arc<dyn FactStore>,
    generator: Arc<dyn AiGenerator>,
}

impl QuestionEngine {
    pub fn new(store: Arc<dyn FactStore>, generator: Arc<dyn AiGenerator>) -> Self {
        Self { store, generator }
    }

    /// The pending question queue, oldest first. Replenishes from the
    /// generator when empty.
    pub async fn next_questions(
        &self,
        organization_id: &str,
        recent_text: &str,
    ) -> Vec<BusinessField> {
        let all = match self.store.list_fields(organization_id).await {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(organization_id, error = %e, "Failed to list fields");
                return Vec::new();
            }
        };

        let pending: Vec<BusinessField> =
            all.iter().filter(|f| !f.is_answered).cloned().collect();
        if !pending.is_empty() {
            return pending;
        }

        // Queue exhausted: generate more, excluding every known field name.
        let known: Vec<String> = all.iter().map(|f| f.field_name.clone()).collect();
        let generated = match self
            .generator
            .generate_questions(organization_id, recent_text, &known)
            .await
        {
            Ok(questions) => questions,
            Err(e) => {
                tracing::warn!(organization_id, error = %e, "Question generation failed");
                return Vec::new();
            }
        };

        let new_fields: Vec<BusinessField> = generated
            .into_iter()
            .filter(|q| !known.contains(&q.field_name))
            .map(|q| {
                let field = BusinessField::new(
                    organization_id,
                    q.field_name,
                    q.field_type,
                    q.question_template,
                );
                match q.choices {
                    Some(choices) => field.with_choices(choices),
                    None => field,
                }
            })
            .collect();

        if new_fields.is_empty() {
            return Vec::new();
        }

        if let Err(e) = self
            .store
            .insert_fields(organization_id, new_fields.clone())
            .await
        {
            tracing::warn!(organization_id, error = %e, "Failed to persist generated questions");
            return Vec::new();
        }

        new_fields
    }

    /// The question to ask right now: head of the queue.
    pub async fn current_question(
        &self,
        organization_id: &str,
        recent_text: &str,
    ) -> Option<BusinessField> {
        self.next_questions(organization_id, recent_text)
            .await
            .into_iter()
            .next()
    }
}
