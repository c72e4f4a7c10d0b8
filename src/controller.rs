//! Top-level conversation controller.
//!
//! Routes each user message to whichever flow owns the session right now:
//! the OTP flow while unauthenticated, the website-scrape sub-flow when a
//! URL shows up, and otherwise one orchestrated chat turn followed by
//! fact extraction and the next onboarding question.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::chat::orchestrator::{ChatOrchestrator, TurnOutcome};
use crate::chat::protocol::STATUS_SCRAPING_OFFERED;
use crate::chat::scrape::{WebsiteScraper, detect_url, is_skip_reply};
use crate::chat::transcript::{ChatState, Message};
use crate::onboarding::extraction::ExtractionEngine;
use crate::onboarding::model::{contains_setup_marker, strip_setup_marker};
use crate::onboarding::progress::Progress;
use crate::onboarding::questions::QuestionEngine;
use crate::otp::OtpExecutor;
use crate::session::SessionManager;
use crate::store::FactStore;

/// Synthesized invite appended when the backend offers website scraping.
const WEBSITE_INVITE: &str =
    "If you have a website, paste the address and I'll read it to fill in \
     the details for you. Or just say \"skip\".";

/// Placeholder shown while a scrape is running.
const SCRAPE_PLACEHOLDER: &str = "Taking a look at your website...";

/// Fallback when the scrape fails.
const SCRAPE_FALLBACK: &str =
    "I couldn't read that website just now. No problem, let's keep going.";

/// Shown when every queued question has been answered.
const STAGE_TRANSITION: &str =
    "That covers the basics! I'll let you know if anything else comes up.";

pub struct ChatController {
    manager: Arc<SessionManager>,
    otp: OtpExecutor,
    chat: Arc<ChatState>,
    orchestrator: Arc<ChatOrchestrator>,
    questions: Arc<QuestionEngine>,
    extraction: Arc<ExtractionEngine>,
    scraper: Arc<dyn WebsiteScraper>,
    store: Arc<dyn FactStore>,
    awaiting_website_reply: AtomicBool,
    setup_complete: AtomicBool,
}

impl ChatController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        manager: Arc<SessionManager>,
        otp: OtpExecutor,
        chat: Arc<ChatState>,
        orchestrator: Arc<ChatOrchestrator>,
        questions: Arc<QuestionEngine>,
        extraction: Arc<ExtractionEngine>,
        scraper: Arc<dyn WebsiteScraper>,
        store: Arc<dyn FactStore>,
    ) -> Self {
        Self {
            manager,
            otp,
            chat,
            orchestrator,
            questions,
            extraction,
            scraper,
            store,
            awaiting_website_reply: AtomicBool::new(false),
            setup_complete: AtomicBool::new(false),
        }
    }

    /// Handle one user message end to end.
    pub async fn handle_user_message(&self, text: &str) {
        if !self.manager.phase().await.is_authenticated() {
            // The OTP engine echoes valid input into the transcript itself.
            self.otp.handle_input(text).await;
            return;
        }

        self.chat.append(Message::user(text)).await;
        self.chat.set_input("").await;

        let Some(organization_id) = self.manager.organization_id().await else {
            warn!("Authenticated session without an organization");
            self.run_chat_turn().await;
            return;
        };

        if let Some(url) = detect_url(text) {
            self.awaiting_website_reply.store(false, Ordering::SeqCst);
            self.run_scrape(&organization_id, &url).await;
            return;
        }

        if self.awaiting_website_reply.swap(false, Ordering::SeqCst) && is_skip_reply(text) {
            // Best effort; the conversation moves on either way.
            if let Err(e) = self.scraper.notify_skip(&organization_id).await {
                debug!(error = %e, "Skip notification failed");
            }
        }

        // Onboarding state only moves on a completed turn; a failed or
        // suppressed send leaves the transcript and store untouched.
        if self.run_chat_turn().await {
            self.run_onboarding_step(&organization_id, text).await;
        }
    }

    /// Current setup progress for the authenticated organization.
    pub async fn progress(&self) -> Progress {
        let setup_complete = self.setup_complete.load(Ordering::SeqCst);
        let Some(organization_id) = self.manager.organization_id().await else {
            return Progress::measure(&[], setup_complete);
        };
        match self.store.list_fields(&organization_id).await {
            Ok(fields) => Progress::measure(&fields, setup_complete),
            Err(e) => {
                warn!(error = %e, "Failed to read fields for progress");
                Progress::measure(&[], setup_complete)
            }
        }
    }

    /// Run one chat turn. Returns `true` only when the turn completed.
    async fn run_chat_turn(&self) -> bool {
        self.chat.set_loading(true).await;
        let transcript = self.chat.messages().await;
        let outcome = self.orchestrator.send(&transcript).await;
        self.chat.set_loading(false).await;

        match outcome {
            None => {
                // A turn is already running; this send was a no-op.
                false
            }
            Some(TurnOutcome::Completed(payload)) => {
                self.chat.set_error(None).await;

                let display = if contains_setup_marker(&payload.ai_message) {
                    self.setup_complete.store(true, Ordering::SeqCst);
                    strip_setup_marker(&payload.ai_message)
                } else {
                    payload.ai_message.clone()
                };
                if !display.is_empty() {
                    let mut message = Message::ai(display);
                    if let Some(choices) = payload.multiple_choices {
                        message = message
                            .with_choices(choices, payload.allow_multiple.unwrap_or(false));
                    }
                    self.chat.append(message).await;
                }

                if payload.status_signal.as_deref() == Some(STATUS_SCRAPING_OFFERED) {
                    self.chat.append(Message::ai(WEBSITE_INVITE)).await;
                    self.awaiting_website_reply.store(true, Ordering::SeqCst);
                }
                true
            }
            Some(TurnOutcome::Failed(message)) => {
                self.chat.set_error(Some(message)).await;
                false
            }
        }
    }

    /// Extract facts from the user's message, then surface the next
    /// queued question (or the stage transition when the queue drains).
    async fn run_onboarding_step(&self, organization_id: &str, user_text: &str) {
        match self
            .extraction
            .extract_and_apply(organization_id, user_text)
            .await
        {
            Ok(accepted) if !accepted.is_empty() => {
                debug!(count = accepted.len(), "Accepted extracted facts");
            }
            Ok(_) => {}
            Err(e) => {
                // Degrades to "ask again next turn".
                warn!(error = %e, "Extraction failed");
            }
        }

        match self
            .questions
            .current_question(organization_id, user_text)
            .await
        {
            Some(field) => {
                let mut message = Message::ai(field.question_template.clone());
                if let Some(choices) = field.choices.clone() {
                    message = message.with_choices(choices, false);
                }
                self.chat.append(message).await;
            }
            None => {
                self.chat.append(Message::ai(STAGE_TRANSITION)).await;
            }
        }
    }

    async fn run_scrape(&self, organization_id: &str, url: &str) {
        let placeholder = Message::ai(SCRAPE_PLACEHOLDER);
        let placeholder_id = placeholder.id;
        self.chat.append(placeholder).await;

        match self
            .scraper
            .scrape_and_summarize(organization_id, url)
            .await
        {
            Ok(summary) => {
                self.chat.replace_message(placeholder_id, summary).await;
            }
            Err(e) => {
                warn!(url, error = %e, "Website scrape failed");
                self.chat.remove_message(placeholder_id).await;
                self.chat.append(Message::ai(SCRAPE_FALLBACK)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use futures::stream::BoxStream;
    use std::sync::Mutex;

    use crate::chat::orchestrator::ChatTransport;
    use crate::chat::protocol::{ChatRequest, ResultPayload, StreamEvent};
    use crate::chat::transcript::Role;
    use crate::config::CoreConfig;
    use crate::error::{ChatError, ExtractionError, IdentityError, StoreError};
    use crate::llm::AiGenerator;
    use crate::onboarding::model::{BusinessField, ExtractedFact, FieldType, GeneratedQuestion};
    use crate::session::{
        DependentData, Identity, IdentityEvent, IdentityProvider, SessionPhase,
    };
    use crate::session::manager::{AgentSummary, OrgMembership, SubscriptionInfo};
    use crate::store::MemoryStore;

    // ── Test doubles ────────────────────────────────────────────────────

    struct StubProvider {
        events: tokio::sync::broadcast::Sender<IdentityEvent>,
    }

    impl StubProvider {
        fn new() -> Self {
            let (events, _) = tokio::sync::broadcast::channel(8);
            Self { events }
        }
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn get_current_session(&self) -> Result<Option<Identity>, IdentityError> {
            Ok(None)
        }

        fn subscribe(&self) -> tokio::sync::broadcast::Receiver<IdentityEvent> {
            self.events.subscribe()
        }

        async fn send_otp(&self, _email: &str) -> Result<(), IdentityError> {
            Ok(())
        }

        async fn verify_otp(&self, email: &str, _code: &str) -> Result<Identity, IdentityError> {
            Ok(Identity::new("user-1", email))
        }

        async fn sign_out(&self) -> Result<(), IdentityError> {
            Ok(())
        }
    }

    struct StubDeps;

    #[async_trait]
    impl DependentData for StubDeps {
        async fn fetch_agents(&self, _user_id: &str) -> Result<Vec<AgentSummary>, IdentityError> {
            Ok(Vec::new())
        }

        async fn fetch_subscription(
            &self,
            _user_id: &str,
        ) -> Result<Option<SubscriptionInfo>, IdentityError> {
            Ok(None)
        }

        async fn fetch_organization(
            &self,
            _user_id: &str,
        ) -> Result<Option<OrgMembership>, IdentityError> {
            Ok(Some(OrgMembership {
                organization_id: "org-1".to_string(),
                role: "owner".to_string(),
            }))
        }
    }

    struct ScriptedTransport {
        payloads: Mutex<Vec<ResultPayload>>,
    }

    impl ScriptedTransport {
        fn new(payloads: Vec<ResultPayload>) -> Self {
            Self {
                payloads: Mutex::new(payloads),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn open(
            &self,
            _request: ChatRequest,
        ) -> Result<BoxStream<'static, Result<Vec<u8>, ChatError>>, ChatError> {
            let payload = {
                let mut payloads = self.payloads.lock().unwrap();
                if payloads.is_empty() {
                    ResultPayload::text("okay")
                } else {
                    payloads.remove(0)
                }
            };
            let bytes = StreamEvent::Result(payload).encode().unwrap().into_bytes();
            Ok(futures::stream::iter(vec![Ok(bytes)]).boxed())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl ChatTransport for FailingTransport {
        async fn open(
            &self,
            _request: ChatRequest,
        ) -> Result<BoxStream<'static, Result<Vec<u8>, ChatError>>, ChatError> {
            Err(ChatError::Http { status: 502 })
        }
    }

    struct StubGenerator {
        facts: Vec<ExtractedFact>,
    }

    #[async_trait]
    impl AiGenerator for StubGenerator {
        async fn generate_questions(
            &self,
            _organization_id: &str,
            _recent_text: &str,
            _answered_names: &[String],
        ) -> Result<Vec<GeneratedQuestion>, ExtractionError> {
            Ok(Vec::new())
        }

        async fn extract_facts(
            &self,
            _organization_id: &str,
            _text: &str,
            _unanswered_fields: &[BusinessField],
        ) -> Result<Vec<ExtractedFact>, ExtractionError> {
            Ok(self.facts.clone())
        }
    }

    enum ScrapeScript {
        Succeed(String),
        Fail,
    }

    struct StubScraper {
        script: ScrapeScript,
        skips: Mutex<usize>,
    }

    #[async_trait]
    impl WebsiteScraper for StubScraper {
        async fn scrape_and_summarize(
            &self,
            _organization_id: &str,
            _url: &str,
        ) -> Result<String, ChatError> {
            match &self.script {
                ScrapeScript::Succeed(summary) => Ok(summary.clone()),
                ScrapeScript::Fail => Err(ChatError::Scrape("unreachable".to_string())),
            }
        }

        async fn notify_skip(&self, _organization_id: &str) -> Result<(), ChatError> {
            *self.skips.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct Harness {
        controller: ChatController,
        chat: Arc<ChatState>,
        manager: Arc<SessionManager>,
        store: Arc<MemoryStore>,
    }

    async fn harness(
        facts: Vec<ExtractedFact>,
        payloads: Vec<ResultPayload>,
        scrape: ScrapeScript,
    ) -> Harness {
        harness_with_transport(facts, Arc::new(ScriptedTransport::new(payloads)), scrape).await
    }

    async fn harness_with_transport(
        facts: Vec<ExtractedFact>,
        transport: Arc<dyn ChatTransport>,
        scrape: ScrapeScript,
    ) -> Harness {
        let config = CoreConfig::default();
        let provider = Arc::new(StubProvider::new());
        let manager = SessionManager::new(provider.clone(), Arc::new(StubDeps), config.clone());
        let chat = Arc::new(ChatState::new());
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(StubGenerator { facts });

        let otp = OtpExecutor::new(
            Arc::clone(&manager),
            provider.clone(),
            Arc::clone(&chat),
            config.clone(),
        );
        let orchestrator = Arc::new(ChatOrchestrator::new(transport, config.clone()));
        let questions = Arc::new(QuestionEngine::new(store.clone(), generator.clone()));
        let extraction = Arc::new(ExtractionEngine::new(
            store.clone(),
            generator,
            config.clone(),
        ));
        let scraper = Arc::new(StubScraper {
            script: scrape,
            skips: Mutex::new(0),
        });

        let controller = ChatController::new(
            Arc::clone(&manager),
            otp,
            Arc::clone(&chat),
            orchestrator,
            questions,
            extraction,
            scraper,
            store.clone(),
        );
        Harness {
            controller,
            chat,
            manager,
            store,
        }
    }

    async fn authenticate(h: &Harness) {
        // Runs the dependent-data fan-out, so StubDeps installs org-1.
        h.manager
            .authenticate(Identity::new("user-1", "maria@example.com"))
            .await;
    }

    async fn seed_field(h: &Harness, name: &str, question: &str) {
        h.store
            .insert_fields(
                "org-1",
                vec![BusinessField::new("org-1", name, FieldType::Text, question)],
            )
            .await
            .unwrap();
    }

    fn fact(name: &str, value: &str, confidence: f64) -> ExtractedFact {
        ExtractedFact {
            field_name: name.to_string(),
            value: value.to_string(),
            confidence,
        }
    }

    // ── Scenarios ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn unauthenticated_name_advances_to_awaiting_email() {
        let h = harness(Vec::new(), Vec::new(), ScrapeScript::Fail).await;

        h.controller.handle_user_message("Maria").await;

        assert_eq!(h.manager.phase().await, SessionPhase::AwaitingEmail);
        let messages = h.chat.messages().await;
        let ai: Vec<_> = messages.iter().filter(|m| m.role == Role::Ai).collect();
        assert!(!ai.is_empty());
        assert!(ai.iter().any(|m| m.content.to_lowercase().contains("email")));
    }

    #[tokio::test]
    async fn answered_field_is_followed_by_the_next_queued_question() {
        let h = harness(
            vec![fact("business_hours", "9am-5pm", 0.8)],
            vec![ResultPayload::text("Got it, thanks!")],
            ScrapeScript::Fail,
        )
        .await;
        authenticate(&h).await;
        seed_field(&h, "business_hours", "When are you open?").await;
        seed_field(&h, "team_size", "How big is your team?").await;

        h.controller
            .handle_user_message("We're open 9 to 5")
            .await;

        let stored = h.store.list_fields("org-1").await.unwrap();
        let hours = stored
            .iter()
            .find(|f| f.field_name == "business_hours")
            .unwrap();
        assert!(hours.is_answered);
        assert_eq!(hours.value.as_deref(), Some("9am-5pm"));

        let messages = h.chat.messages().await;
        let last_ai = messages.iter().rev().find(|m| m.role == Role::Ai).unwrap();
        assert_eq!(last_ai.content, "How big is your team?");
    }

    #[tokio::test]
    async fn empty_queue_produces_a_stage_transition_message() {
        let h = harness(
            vec![fact("business_hours", "9am-5pm", 0.8)],
            vec![ResultPayload::text("Noted.")],
            ScrapeScript::Fail,
        )
        .await;
        authenticate(&h).await;
        seed_field(&h, "business_hours", "When are you open?").await;

        h.controller.handle_user_message("9 to 5").await;

        let messages = h.chat.messages().await;
        let last_ai = messages.iter().rev().find(|m| m.role == Role::Ai).unwrap();
        assert_eq!(last_ai.content, STAGE_TRANSITION);
    }

    #[tokio::test]
    async fn url_message_runs_the_scrape_flow() {
        let h = harness(
            Vec::new(),
            Vec::new(),
            ScrapeScript::Succeed("They sell handmade shoes.".to_string()),
        )
        .await;
        authenticate(&h).await;

        h.controller
            .handle_user_message("https://example.com")
            .await;

        let messages = h.chat.messages().await;
        let ai: Vec<_> = messages.iter().filter(|m| m.role == Role::Ai).collect();
        // Placeholder was replaced in place: one ai message, the summary.
        assert_eq!(ai.len(), 1);
        assert_eq!(ai[0].content, "They sell handmade shoes.");
    }

    #[tokio::test]
    async fn failed_scrape_leaves_a_fallback_not_a_placeholder() {
        let h = harness(Vec::new(), Vec::new(), ScrapeScript::Fail).await;
        authenticate(&h).await;

        h.controller.handle_user_message("acme.com").await;

        let messages = h.chat.messages().await;
        let ai: Vec<_> = messages.iter().filter(|m| m.role == Role::Ai).collect();
        assert_eq!(ai.len(), 1);
        assert_eq!(ai[0].content, SCRAPE_FALLBACK);
        assert!(!messages.iter().any(|m| m.content == SCRAPE_PLACEHOLDER));
    }

    #[tokio::test]
    async fn scrape_offer_appends_the_invite_and_arms_the_sub_flow() {
        let mut offer = ResultPayload::text("Basics covered!");
        offer.status_signal = Some(STATUS_SCRAPING_OFFERED.to_string());
        let h = harness(Vec::new(), vec![offer], ScrapeScript::Fail).await;
        authenticate(&h).await;

        h.controller.handle_user_message("done I think").await;

        let messages = h.chat.messages().await;
        assert!(messages.iter().any(|m| m.content == WEBSITE_INVITE));
        assert!(h.controller.awaiting_website_reply.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_turn_aborts_without_touching_onboarding_state() {
        let h = harness_with_transport(
            vec![fact("business_hours", "9am-5pm", 0.8)],
            Arc::new(FailingTransport),
            ScrapeScript::Fail,
        )
        .await;
        authenticate(&h).await;
        seed_field(&h, "business_hours", "When are you open?").await;

        h.controller.handle_user_message("hello").await;

        let snapshot = h.chat.snapshot().await;
        assert!(snapshot.error.is_some());
        // The aborted turn ran no extraction and appended no question.
        let stored = h.store.list_fields("org-1").await.unwrap();
        let hours = stored
            .iter()
            .find(|f| f.field_name == "business_hours")
            .unwrap();
        assert!(!hours.is_answered);
        assert!(snapshot.messages.iter().all(|m| m.role != Role::Ai));
    }

    #[tokio::test]
    async fn setup_marker_saturates_progress() {
        let h = harness(
            Vec::new(),
            vec![ResultPayload::text("All done! [SETUP_COMPLETE]")],
            ScrapeScript::Fail,
        )
        .await;
        authenticate(&h).await;
        seed_field(&h, "business_hours", "When are you open?").await;

        h.controller.handle_user_message("thanks").await;

        assert_eq!(h.controller.progress().await.percent(), 100);
        // The marker itself never reaches the transcript.
        let messages = h.chat.messages().await;
        assert!(messages.iter().all(|m| !m.content.contains("[SETUP_COMPLETE]")));
    }
}
