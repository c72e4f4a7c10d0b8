//! Applies OTP action lists and runs provider effects.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::chat::transcript::ChatState;
use crate::config::CoreConfig;
use crate::session::{IdentityProvider, SessionManager, SessionPhase};

use super::actions::{OtpAction, OtpEffect, OtpStep, PendingUpdate};
use super::engine;

/// Interpreter for [`OtpStep`]s: applies actions to the shared chat state,
/// pending-identity updates through the session manager's handle, and runs
/// effects against the identity provider.
pub struct OtpExecutor {
    manager: Arc<SessionManager>,
    provider: Arc<dyn IdentityProvider>,
    chat: Arc<ChatState>,
    config: CoreConfig,
}

impl OtpExecutor {
    pub fn new(
        manager: Arc<SessionManager>,
        provider: Arc<dyn IdentityProvider>,
        chat: Arc<ChatState>,
        config: CoreConfig,
    ) -> Self {
        Self {
            manager,
            provider,
            chat,
            config,
        }
    }

    /// Handle one line of user input while in the OTP flow.
    pub async fn handle_input(&self, input: &str) {
        let phase = self.manager.phase().await;
        let pending = self.manager.pending().read().await.clone();
        let step = engine::evaluate(phase, input, &pending);
        self.run_step(step).await;
    }

    /// Handle an explicit resend request.
    pub async fn handle_resend(&self) {
        let phase = self.manager.phase().await;
        let pending = self.manager.pending().read().await.clone();
        let step = engine::resend(phase, &pending);
        self.run_step(step).await;
    }

    async fn run_step(&self, step: OtpStep) {
        self.apply_pending_update(step.pending_update).await;
        self.apply_actions(step.actions).await;
        if let Some(effect) = step.effect {
            let continuation = self.run_effect(effect).await;
            // Effects resolve to exactly one continuation step; continuations
            // themselves never carry another effect.
            self.apply_pending_update(continuation.pending_update).await;
            self.apply_actions(continuation.actions).await;
        }
    }

    async fn apply_pending_update(&self, update: Option<PendingUpdate>) {
        let Some(update) = update else { return };
        let pending = self.manager.pending();
        let mut pending = pending.write().await;
        match update {
            PendingUpdate::SetName(name) => pending.name = name,
            PendingUpdate::SetEmail(email) => pending.email = email,
            PendingUpdate::IncrementAttempts => pending.otp_attempts += 1,
        }
    }

    async fn apply_actions(&self, actions: Vec<OtpAction>) {
        for action in actions {
            match action {
                OtpAction::AddMessages(messages) => self.chat.append_all(messages).await,
                OtpAction::SetAuthPhase(phase) => {
                    // Authenticated is set via `authenticate` in the verify
                    // continuation, which carries the identity.
                    if phase != SessionPhase::Authenticated {
                        self.manager.set_phase(phase).await;
                    }
                }
                OtpAction::SetInput(input) => self.chat.set_input(input).await,
                OtpAction::SetLoading(loading) => self.chat.set_loading(loading).await,
                OtpAction::SetError(error) => self.chat.set_error(error).await,
                OtpAction::SetCooldown(secs) => {
                    self.manager.start_cooldown(secs).await;
                    if secs > 0 {
                        self.chat.mark_code_sent().await;
                    }
                }
                OtpAction::BlurInput => self.chat.request_blur().await,
            }
        }
    }

    async fn run_effect(&self, effect: OtpEffect) -> OtpStep {
        match effect {
            OtpEffect::DispatchCode { email } => {
                match self.provider.send_otp(&email).await {
                    Ok(()) => {
                        debug!(%email, "one-time code dispatched");
                        engine::after_dispatch(&email, None, self.config.resend_cooldown_secs)
                    }
                    Err(e) => {
                        warn!(%email, error = %e, "code dispatch failed");
                        engine::after_dispatch(
                            &email,
                            Some(&e.to_string()),
                            self.config.resend_cooldown_secs,
                        )
                    }
                }
            }
            OtpEffect::VerifyCode { email, code } => {
                let name = self.manager.pending().read().await.name.clone();
                match self.provider.verify_otp(&email, &code).await {
                    Ok(identity) => {
                        self.manager.authenticate(identity).await;
                        engine::after_verify(true, &name)
                    }
                    Err(e) => {
                        debug!(%email, error = %e, "code verification failed");
                        engine::after_verify(false, &name)
                    }
                }
            }
            OtpEffect::Resend { email } => match self.provider.send_otp(&email).await {
                Ok(()) => engine::after_resend(&email, None, self.config.resend_cooldown_secs),
                Err(e) => {
                    warn!(%email, error = %e, "code resend failed");
                    engine::after_resend(
                        &email,
                        Some(&e.to_string()),
                        self.config.resend_cooldown_secs,
                    )
                }
            },
        }
    }
}
