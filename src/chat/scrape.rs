//! Website scrape sub-flow: URL detection, skip detection, and the
//! scraper contract.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::ChatError;

// Permissive on purpose: users paste URLs without a scheme.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://)?(?:www\.)?[a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.[a-z]{2,}(?:/[^\s]*)?")
        .unwrap_or_else(|e| panic!("invalid URL regex: {e}"))
});

static SKIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(no|nope|skip|later|not now|no thanks|no thank you|don't have one|i don't have (a website|one))\b")
        .unwrap_or_else(|e| panic!("invalid skip regex: {e}"))
});

/// Find the first URL-looking token in a message, with trailing
/// punctuation stripped.
pub fn detect_url(text: &str) -> Option<String> {
    let raw = URL_RE.find(text)?.as_str();
    let trimmed = raw.trim_end_matches(['.', ',', '!', '?', ';', ':', ')', ']', '\'', '"']);
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Whether a reply to the website offer is an explicit skip/negative.
pub fn is_skip_reply(text: &str) -> bool {
    SKIP_RE.is_match(text)
}

/// Scrapes a website and produces the assistant-voice summary used to
/// replace the placeholder message.
#[async_trait]
pub trait WebsiteScraper: Send + Sync {
    async fn scrape_and_summarize(
        &self,
        organization_id: &str,
        url: &str,
    ) -> Result<String, ChatError>;

    /// Tell the backend the user declined to share a website. Best effort:
    /// the caller logs failures and moves on.
    async fn notify_skip(&self, organization_id: &str) -> Result<(), ChatError>;
}

/// Fetches the page over HTTP and summarizes it with the LLM provider.
pub struct HttpWebsiteScraper {
    client: reqwest::Client,
    llm: std::sync::Arc<dyn crate::llm::LlmProvider>,
}

/// Pages are truncated before summarization; onboarding only needs the
/// above-the-fold story, not the whole site.
const MAX_PAGE_BYTES: usize = 20_000;

impl HttpWebsiteScraper {
    pub fn new(llm: std::sync::Arc<dyn crate::llm::LlmProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            llm,
        }
    }
}

#[async_trait]
impl WebsiteScraper for HttpWebsiteScraper {
    async fn scrape_and_summarize(
        &self,
        organization_id: &str,
        url: &str,
    ) -> Result<String, ChatError> {
        let full_url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{url}")
        };

        let response = self
            .client
            .get(&full_url)
            .send()
            .await
            .map_err(|e| ChatError::Scrape(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ChatError::Scrape(format!(
                "fetch returned HTTP {}",
                response.status()
            )));
        }
        let mut body = response
            .text()
            .await
            .map_err(|e| ChatError::Scrape(e.to_string()))?;
        body.truncate(MAX_PAGE_BYTES);

        let request = crate::llm::CompletionRequest::new(vec![
            crate::llm::ChatMessage::system(
                "Summarize what this business does based on its website, in 2-3 \
                 friendly sentences addressed to the owner (\"It looks like you...\").",
            ),
            crate::llm::ChatMessage::user(body),
        ])
        .with_max_tokens(256);

        let summary = self
            .llm
            .complete(request)
            .await
            .map_err(|e| ChatError::Scrape(e.to_string()))?;

        tracing::debug!(organization_id, url = %full_url, "Website summarized");
        Ok(summary.content)
    }

    async fn notify_skip(&self, organization_id: &str) -> Result<(), ChatError> {
        tracing::debug!(organization_id, "User skipped the website offer");
        Ok(())
    }
}
