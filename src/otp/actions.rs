//! The OTP engine's action vocabulary.

use crate::chat::transcript::Message;
use crate::session::SessionPhase;

/// One instruction emitted by the OTP flow engine.
///
/// The engine never mutates state directly — it returns an ordered list of
/// these, and the executor applies them uniformly. This keeps the decision
/// logic a pure function of `(phase, input, pending)`.
#[derive(Debug, Clone)]
pub enum OtpAction {
    /// Append messages to the transcript (always append-only).
    AddMessages(Vec<Message>),
    /// Move the session to a new phase.
    SetAuthPhase(SessionPhase),
    /// Replace the input field contents.
    SetInput(String),
    /// Toggle the loading indicator.
    SetLoading(bool),
    /// Set or clear the inline error.
    SetError(Option<String>),
    /// Restart the resend cooldown; also marks the code as sent.
    SetCooldown(u32),
    /// Ask the caller to dismiss an on-screen keyboard on touch devices.
    BlurInput,
}

/// An asynchronous side effect the executor must run against the identity
/// provider before the flow can continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpEffect {
    DispatchCode { email: String },
    VerifyCode { email: String, code: String },
    Resend { email: String },
}

/// A mutation of the pending identity, applied by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingUpdate {
    SetName(String),
    SetEmail(String),
    IncrementAttempts,
}

/// One step of the flow: what to show, what to mutate, what to call.
#[derive(Debug, Clone, Default)]
pub struct OtpStep {
    pub actions: Vec<OtpAction>,
    pub pending_update: Option<PendingUpdate>,
    pub effect: Option<OtpEffect>,
}

impl OtpStep {
    pub fn empty() -> Self {
        Self::default()
    }
}
