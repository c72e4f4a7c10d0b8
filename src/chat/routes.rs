//! HTTP endpoint serving the streaming chat protocol.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider};

use super::protocol::{ChatRequest, ResultPayload, STATUS_SCRAPING_OFFERED, StreamEvent};

/// Marker the model emits to offer website scraping; becomes a
/// `statusSignal` rather than visible text.
pub const OFFER_WEBSITE_MARKER: &str = "[OFFER_WEBSITE]";

/// Markers wrapping a choice list, e.g. `[CHOICES: Retail | Services]`.
const CHOICES_OPEN: &str = "[CHOICES:";
/// Marker allowing multi-select on the preceding choice list.
const MULTI_MARKER: &str = "[MULTI]";

const SYSTEM_PROMPT: &str = "\
You are a friendly onboarding assistant helping a small-business owner set \
up their account through conversation. Keep replies to a couple of short \
sentences. When offering fixed options, append [CHOICES: a | b | c] (add \
[MULTI] if several may apply). When the business basics are covered and you \
want to offer reading their website, append [OFFER_WEBSITE]. When setup is \
finished, append [SETUP_COMPLETE].";

/// Application state shared across chat handlers.
#[derive(Clone)]
pub struct ChatRouteState {
    pub llm: Arc<dyn LlmProvider>,
}

/// Build the Axum router for the chat endpoint.
pub fn chat_routes(state: ChatRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "biz-onboard-chat"
    }))
}

/// POST /api/chat
///
/// Body: `{messages, locale}`. Response: the named-frame event stream,
/// phase frames first, then exactly one `result` or `error`.
async fn chat_handler(
    State(state): State<ChatRouteState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let (tx, rx) = mpsc::channel::<Result<String, Infallible>>(16);

    tokio::spawn(run_chat_turn(state.llm, request, tx));

    let body = Body::from_stream(ReceiverStream::new(rx));
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/event-stream")],
        body,
    )
        .into_response()
}

async fn run_chat_turn(
    llm: Arc<dyn LlmProvider>,
    request: ChatRequest,
    tx: mpsc::Sender<Result<String, Infallible>>,
) {
    send_event(&tx, StreamEvent::Phase { name: "thinking".to_string() }).await;

    let mut messages = vec![ChatMessage::system(format!(
        "{SYSTEM_PROMPT}\nReply in locale: {}.",
        request.locale
    ))];
    for msg in &request.messages {
        match msg.role.as_str() {
            "assistant" => messages.push(ChatMessage::assistant(&msg.content)),
            _ => messages.push(ChatMessage::user(&msg.content)),
        }
    }

    let completion = llm
        .complete(CompletionRequest::new(messages).with_max_tokens(512))
        .await;

    let event = match completion {
        Ok(response) => {
            debug!(
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                "Chat completion finished"
            );
            StreamEvent::Result(parse_assistant_markup(&response.content))
        }
        Err(e) => {
            warn!(error = %e, "Chat completion failed");
            StreamEvent::Error {
                message: fallback_message(&e).to_string(),
            }
        }
    };
    send_event(&tx, event).await;
}

async fn send_event(tx: &mpsc::Sender<Result<String, Infallible>>, event: StreamEvent) {
    match event.encode() {
        Ok(frame) => {
            // A closed receiver just means the client went away.
            let _ = tx.send(Ok(frame)).await;
        }
        Err(e) => warn!(error = %e, "Failed to encode stream event"),
    }
}

/// Provider failures become distinct, user-readable fallback strings.
/// Raw provider errors never cross the wire.
fn fallback_message(error: &LlmError) -> &'static str {
    match error {
        LlmError::RateLimited { .. } => {
            "I'm getting a lot of requests right now. Give me a few seconds and try again."
        }
        LlmError::AuthFailed { .. } => {
            "I can't reach my assistant service right now. Please contact support."
        }
        _ => "Something went wrong on my end. Please try that again.",
    }
}

/// Lift inline markers out of the model's reply: choice lists become the
/// structured `multipleChoices` field and the website-offer marker becomes
/// a status signal. The setup-complete marker stays in the text for the
/// client to observe.
pub fn parse_assistant_markup(raw: &str) -> ResultPayload {
    let mut text = raw.to_string();
    let mut multiple_choices = None;
    let mut allow_multiple = None;
    let mut status_signal = None;

    if let Some(open) = text.find(CHOICES_OPEN) {
        if let Some(close_rel) = text[open..].find(']') {
            let close = open + close_rel;
            let inner = &text[open + CHOICES_OPEN.len()..close];
            let choices: Vec<String> = inner
                .split('|')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if !choices.is_empty() {
                multiple_choices = Some(choices);
            }
            text.replace_range(open..=close, "");
        }
    }

    if text.contains(MULTI_MARKER) {
        if multiple_choices.is_some() {
            allow_multiple = Some(true);
        }
        text = text.replace(MULTI_MARKER, "");
    }

    if text.contains(OFFER_WEBSITE_MARKER) {
        status_signal = Some(STATUS_SCRAPING_OFFERED.to_string());
        text = text.replace(OFFER_WEBSITE_MARKER, "");
    }

    ResultPayload {
        ai_message: text.trim().to_string(),
        multiple_choices,
        allow_multiple,
        status_signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_reply_passes_through() {
        let payload = parse_assistant_markup("What's your business called?");
        assert_eq!(payload.ai_message, "What's your business called?");
        assert!(payload.multiple_choices.is_none());
        assert!(payload.status_signal.is_none());
    }

    #[test]
    fn choice_marker_becomes_structured_choices() {
        let payload =
            parse_assistant_markup("Which fits best? [CHOICES: Retail | Services | Other]");
        assert_eq!(payload.ai_message, "Which fits best?");
        assert_eq!(
            payload.multiple_choices,
            Some(vec!["Retail".to_string(), "Services".to_string(), "Other".to_string()])
        );
        assert!(payload.allow_multiple.is_none());
    }

    #[test]
    fn multi_marker_needs_a_choice_list() {
        let payload = parse_assistant_markup("Pick any. [CHOICES: A | B] [MULTI]");
        assert_eq!(payload.allow_multiple, Some(true));

        let payload = parse_assistant_markup("No list here [MULTI]");
        assert_eq!(payload.ai_message, "No list here");
        assert!(payload.allow_multiple.is_none());
    }

    #[test]
    fn website_offer_becomes_a_status_signal() {
        let payload = parse_assistant_markup("Want me to look at your website? [OFFER_WEBSITE]");
        assert_eq!(payload.ai_message, "Want me to look at your website?");
        assert_eq!(payload.status_signal.as_deref(), Some(STATUS_SCRAPING_OFFERED));
    }

    #[test]
    fn setup_complete_marker_stays_in_the_text() {
        let payload = parse_assistant_markup("All set! [SETUP_COMPLETE]");
        assert!(payload.ai_message.contains("[SETUP_COMPLETE]"));
    }

    #[test]
    fn rate_limit_and_auth_fallbacks_are_distinct() {
        let rate = fallback_message(&LlmError::RateLimited { provider: "anthropic".to_string() });
        let auth = fallback_message(&LlmError::AuthFailed { provider: "anthropic".to_string() });
        let generic = fallback_message(&LlmError::RequestFailed {
            provider: "anthropic".to_string(),
            reason: "boom".to_string(),
        });
        assert_ne!(rate, auth);
        assert_ne!(rate, generic);
        assert_ne!(auth, generic);
    }
}
