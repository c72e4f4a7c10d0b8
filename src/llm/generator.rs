//! Question generation and fact extraction over the LLM provider.
//!
//! Both operations ask the model for strict JSON and parse tolerantly:
//! code fences are stripped, and the reply is rejected (not repaired) if
//! what remains is not the expected shape.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ChatMessage, CompletionRequest, LlmProvider};
use crate::error::ExtractionError;
use crate::onboarding::model::{BusinessField, ExtractedFact, GeneratedQuestion};

/// Generates onboarding questions and extracts business facts.
#[async_trait]
pub trait AiGenerator: Send + Sync {
    /// Propose new questions for fields not yet tracked for this
    /// organization. `answered_names` lists fields that already exist
    /// (answered or queued) and must not be proposed again.
    async fn generate_questions(
        &self,
        organization_id: &str,
        recent_text: &str,
        answered_names: &[String],
    ) -> Result<Vec<GeneratedQuestion>, ExtractionError>;

    /// Extract facts about the given unanswered fields from one user
    /// message. Fields not mentioned in the text are simply absent from
    /// the result.
    async fn extract_facts(
        &self,
        organization_id: &str,
        text: &str,
        unanswered_fields: &[BusinessField],
    ) -> Result<Vec<ExtractedFact>, ExtractionError>;
}

pub struct LlmGenerator {
    provider: Arc<dyn LlmProvider>,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    async fn complete_json(&self, system: &str, user: &str) -> Result<String, ExtractionError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(system),
            ChatMessage::user(user),
        ])
        .with_max_tokens(1024)
        .with_temperature(0.0);

        let response = self.provider.complete(request).await?;
        Ok(response.content)
    }
}

/// Strip markdown code fences the model sometimes wraps JSON in.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

const QUESTION_SYSTEM_PROMPT: &str = "\
You help a business set up their account by asking short onboarding questions. \
Respond with ONLY valid JSON: an array of objects with keys \"field_name\" \
(snake_case identifier), \"question_template\" (one friendly sentence), \
optional \"field_type\" (one of \"text\", \"array\", \"boolean\", \"number\", \
\"multiple_choice\") and optional \"choices\" (array of strings, only for \
multiple_choice). No prose, no markdown.";

const EXTRACTION_SYSTEM_PROMPT: &str = "\
You extract business facts from a customer's chat message. You are given a \
list of open fields; report only fields the message actually answers. Respond \
with ONLY valid JSON: an array of objects with keys \"field_name\", \"value\" \
(string), and \"confidence\" (number between 0 and 1). An empty array is a \
valid answer. No prose, no markdown.";

#[async_trait]
impl AiGenerator for LlmGenerator {
    async fn generate_questions(
        &self,
        organization_id: &str,
        recent_text: &str,
        answered_names: &[String],
    ) -> Result<Vec<GeneratedQuestion>, ExtractionError> {
        let user = format!(
            "Fields already covered (do not repeat): {}\n\n\
             Recent conversation:\n{}\n\n\
             Propose up to 3 new questions.",
            if answered_names.is_empty() {
                "none".to_string()
            } else {
                answered_names.join(", ")
            },
            recent_text,
        );

        let raw = self.complete_json(QUESTION_SYSTEM_PROMPT, &user).await?;
        let questions: Vec<GeneratedQuestion> = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| {
                ExtractionError::Generation(format!("unparseable question list: {e}"))
            })?;

        tracing::debug!(
            organization_id,
            count = questions.len(),
            "Generated onboarding questions"
        );
        Ok(questions)
    }

    async fn extract_facts(
        &self,
        organization_id: &str,
        text: &str,
        unanswered_fields: &[BusinessField],
    ) -> Result<Vec<ExtractedFact>, ExtractionError> {
        if unanswered_fields.is_empty() {
            return Ok(Vec::new());
        }

        let field_list = unanswered_fields
            .iter()
            .map(|f| format!("- {}: {}", f.field_name, f.question_template))
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!("Open fields:\n{field_list}\n\nCustomer message:\n{text}");

        let raw = self.complete_json(EXTRACTION_SYSTEM_PROMPT, &user).await?;
        let facts: Vec<ExtractedFact> = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| ExtractionError::Parse(format!("unparseable fact list: {e}")))?;

        tracing::debug!(
            organization_id,
            count = facts.len(),
            "Extracted business facts"
        );
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{CompletionRequest, CompletionResponse};
    use crate::onboarding::model::FieldType;

    struct CannedProvider {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            Ok(CompletionResponse {
                content: self.reply.clone(),
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    fn generator(reply: &str) -> LlmGenerator {
        LlmGenerator::new(Arc::new(CannedProvider {
            reply: reply.to_string(),
        }))
    }

    #[test]
    fn strips_fenced_json() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("  [] "), "[]");
    }

    #[tokio::test]
    async fn parses_generated_questions() {
        let reply = r#"```json
[{"field_name": "team_size", "question_template": "How many people work with you?", "field_type": "number"},
 {"field_name": "industry", "question_template": "What industry are you in?"}]
```"#;
        let questions = generator(reply)
            .generate_questions("org-1", "we sell shoes", &[])
            .await
            .unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].field_name, "team_size");
        assert_eq!(questions[0].field_type, FieldType::Number);
        // field_type defaults to text when omitted
        assert_eq!(questions[1].field_type, FieldType::Text);
    }

    #[tokio::test]
    async fn parses_extracted_facts() {
        let reply = r#"[{"field_name": "business_name", "value": "Acme Shoes", "confidence": 0.9}]"#;
        let fields = vec![BusinessField::new(
            "org-1",
            "business_name",
            FieldType::Text,
            "What is your business called?",
        )];
        let facts = generator(reply)
            .extract_facts("org-1", "We're called Acme Shoes", &fields)
            .await
            .unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, "Acme Shoes");
        assert!((facts[0].confidence - 0.9).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn extraction_skips_provider_when_nothing_is_open() {
        let generator = generator("this would not parse");
        let facts = generator.extract_facts("org-1", "hello", &[]).await.unwrap();
        assert!(facts.is_empty());
    }

    #[tokio::test]
    async fn prose_reply_is_an_error() {
        let result = generator("Sure! Here are some questions...")
            .generate_questions("org-1", "hi", &[])
            .await;
        assert!(matches!(result, Err(ExtractionError::Generation(_))));
    }
}
