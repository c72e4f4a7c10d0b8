//! Pure decision logic for the progressive OTP flow.
//!
//! `evaluate` interprets one line of free-text input according to the current
//! session phase and returns an [`OtpStep`]: chat-visible actions, an optional
//! pending-identity update, and at most one provider effect. The executor runs
//! the effect and feeds its outcome into the matching `after_*` function.
//! Given the same inputs these functions always return the same step.

use std::sync::LazyLock;

use regex::Regex;

use crate::chat::transcript::Message;
use crate::session::{PendingIdentity, SessionPhase};

use super::actions::{OtpAction, OtpEffect, OtpStep, PendingUpdate};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("valid code regex"));

/// Interpret one line of input for the current phase.
pub fn evaluate(phase: SessionPhase, input: &str, pending: &PendingIdentity) -> OtpStep {
    match phase {
        SessionPhase::AwaitingName => handle_name(input),
        SessionPhase::AwaitingEmail => handle_email(input),
        SessionPhase::AwaitingOtp => handle_code(input, pending),
        // Not part of the OTP flow; the caller routes these elsewhere.
        SessionPhase::Initializing | SessionPhase::Authenticated => OtpStep::empty(),
    }
}

fn handle_name(input: &str) -> OtpStep {
    let name = input.trim();
    if name.is_empty() {
        return OtpStep {
            actions: vec![OtpAction::SetError(Some(
                "Please tell me your name to get started.".to_string(),
            ))],
            ..Default::default()
        };
    }

    OtpStep {
        actions: vec![
            OtpAction::AddMessages(vec![
                Message::user(name),
                Message::ai(format!(
                    "Nice to meet you, {name}! What's your email address? I'll send you a code to sign in."
                )),
            ]),
            OtpAction::SetAuthPhase(SessionPhase::AwaitingEmail),
            OtpAction::SetInput(String::new()),
            OtpAction::SetError(None),
            OtpAction::BlurInput,
        ],
        pending_update: Some(PendingUpdate::SetName(name.to_string())),
        effect: None,
    }
}

fn handle_email(input: &str) -> OtpStep {
    let email = input.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return OtpStep {
            actions: vec![OtpAction::SetError(Some(
                "That doesn't look like a valid email address. Mind double-checking?".to_string(),
            ))],
            ..Default::default()
        };
    }

    OtpStep {
        actions: vec![
            OtpAction::AddMessages(vec![Message::user(&email)]),
            OtpAction::SetLoading(true),
            OtpAction::SetError(None),
        ],
        pending_update: Some(PendingUpdate::SetEmail(email.clone())),
        effect: Some(OtpEffect::DispatchCode { email }),
    }
}

fn handle_code(input: &str, pending: &PendingIdentity) -> OtpStep {
    let code = input.trim();
    if !CODE_RE.is_match(code) {
        return OtpStep {
            actions: vec![OtpAction::SetError(Some(
                "The code is the 6 digits from the email I sent you.".to_string(),
            ))],
            ..Default::default()
        };
    }

    OtpStep {
        actions: vec![
            OtpAction::AddMessages(vec![Message::user(code)]),
            OtpAction::SetLoading(true),
            OtpAction::SetError(None),
        ],
        pending_update: None,
        effect: Some(OtpEffect::VerifyCode {
            email: pending.email.clone(),
            code: code.to_string(),
        }),
    }
}

/// Continuation after the code-dispatch effect resolves.
pub fn after_dispatch(email: &str, error: Option<&str>, cooldown_secs: u32) -> OtpStep {
    match error {
        None => OtpStep {
            actions: vec![
                OtpAction::AddMessages(vec![Message::ai(format!(
                    "I've sent a 6-digit code to {email}. Enter it here when it arrives."
                ))]),
                OtpAction::SetAuthPhase(SessionPhase::AwaitingOtp),
                OtpAction::SetCooldown(cooldown_secs),
                OtpAction::SetLoading(false),
                OtpAction::SetInput(String::new()),
                OtpAction::BlurInput,
            ],
            ..Default::default()
        },
        Some(reason) => OtpStep {
            actions: vec![
                OtpAction::SetLoading(false),
                OtpAction::SetError(Some(format!(
                    "I couldn't send the code ({reason}). Please try again."
                ))),
            ],
            ..Default::default()
        },
    }
}

/// Continuation after the verify effect resolves.
///
/// Failure keeps the phase so the user can retry; the attempt counter is
/// incremented but lockout is the identity provider's policy.
pub fn after_verify(success: bool, name: &str) -> OtpStep {
    if success {
        let greeting = if name.is_empty() {
            "You're in! Let's set up your business.".to_string()
        } else {
            format!("You're in, {name}! Let's set up your business.")
        };
        OtpStep {
            actions: vec![
                OtpAction::AddMessages(vec![Message::ai(greeting)]),
                OtpAction::SetAuthPhase(SessionPhase::Authenticated),
                OtpAction::SetCooldown(0),
                OtpAction::SetLoading(false),
                OtpAction::SetInput(String::new()),
                OtpAction::SetError(None),
            ],
            ..Default::default()
        }
    } else {
        OtpStep {
            actions: vec![
                OtpAction::SetLoading(false),
                OtpAction::SetError(Some(
                    "That code didn't match. Check the email and try again.".to_string(),
                )),
            ],
            pending_update: Some(PendingUpdate::IncrementAttempts),
            effect: None,
        }
    }
}

/// Request a fresh code. Only meaningful from `AwaitingOtp`, and rate-limited
/// by the cooldown counter.
pub fn resend(phase: SessionPhase, pending: &PendingIdentity) -> OtpStep {
    if phase != SessionPhase::AwaitingOtp {
        return OtpStep::empty();
    }
    if pending.resend_cooldown_secs > 0 {
        return OtpStep {
            actions: vec![OtpAction::SetError(Some(format!(
                "You can request another code in {}s.",
                pending.resend_cooldown_secs
            )))],
            ..Default::default()
        };
    }

    OtpStep {
        actions: vec![OtpAction::SetLoading(true), OtpAction::SetError(None)],
        pending_update: None,
        effect: Some(OtpEffect::Resend {
            email: pending.email.clone(),
        }),
    }
}

/// Continuation after the resend effect resolves.
pub fn after_resend(email: &str, error: Option<&str>, cooldown_secs: u32) -> OtpStep {
    match error {
        None => OtpStep {
            actions: vec![
                OtpAction::AddMessages(vec![Message::ai(format!(
                    "Sent a new code to {email}."
                ))]),
                OtpAction::SetCooldown(cooldown_secs),
                OtpAction::SetLoading(false),
            ],
            ..Default::default()
        },
        Some(reason) => OtpStep {
            actions: vec![
                OtpAction::SetLoading(false),
                OtpAction::SetError(Some(format!(
                    "I couldn't resend the code ({reason}). Please try again."
                ))),
            ],
            ..Default::default()
        },
    }
}
