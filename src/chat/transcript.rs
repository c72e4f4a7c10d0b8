//! Chat transcript model and the shared client-visible chat state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Who produced a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Ai,
    System,
}

/// One transcript message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_choices: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_multiple: Option<bool>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            multiple_choices: None,
            allow_multiple: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Role::Ai, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_choices(mut self, choices: Vec<String>, allow_multiple: bool) -> Self {
        self.multiple_choices = Some(choices);
        self.allow_multiple = Some(allow_multiple);
        self
    }
}

/// Snapshot of the client-visible chat state.
#[derive(Debug, Clone, Default)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub input: String,
    pub loading: bool,
    pub error: Option<String>,
    pub code_sent: bool,
    pub blur_requested: bool,
}

/// Client-visible chat state shared by the OTP executor, the orchestrator,
/// and the onboarding engines.
///
/// The transcript is append-only so ordering is preserved under
/// interleaving; the lone exception is the website-scrape placeholder,
/// which is replaced in place by id (see `replace_message`).
#[derive(Default)]
pub struct ChatState {
    inner: RwLock<ChatSnapshot>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, message: Message) {
        self.inner.write().await.messages.push(message);
    }

    pub async fn append_all(&self, messages: Vec<Message>) {
        self.inner.write().await.messages.extend(messages);
    }

    /// Replace the content of an existing message by id. Returns false when
    /// the message is gone (e.g. already removed).
    pub async fn replace_message(&self, id: Uuid, content: impl Into<String>) -> bool {
        let mut inner = self.inner.write().await;
        match inner.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Remove a message by id (used only to drop a failed placeholder).
    pub async fn remove_message(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write().await;
        let before = inner.messages.len();
        inner.messages.retain(|m| m.id != id);
        inner.messages.len() != before
    }

    pub async fn set_input(&self, input: impl Into<String>) {
        self.inner.write().await.input = input.into();
    }

    pub async fn set_loading(&self, loading: bool) {
        self.inner.write().await.loading = loading;
    }

    pub async fn set_error(&self, error: Option<String>) {
        self.inner.write().await.error = error;
    }

    pub async fn mark_code_sent(&self) {
        self.inner.write().await.code_sent = true;
    }

    /// Signal the UI to dismiss an on-screen keyboard.
    pub async fn request_blur(&self) {
        self.inner.write().await.blur_requested = true;
    }

    pub async fn take_blur_request(&self) -> bool {
        let mut inner = self.inner.write().await;
        std::mem::take(&mut inner.blur_requested)
    }

    pub async fn snapshot(&self) -> ChatSnapshot {
        self.inner.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.read().await.messages.clone()
    }
}
