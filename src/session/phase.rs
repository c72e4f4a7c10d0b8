//! Session phase state machine.

use serde::{Deserialize, Serialize};

/// The discrete authentication state of the session.
///
/// The unauthenticated flow progresses linearly:
/// AwaitingName → AwaitingEmail → AwaitingOtp → Authenticated.
/// `Initializing` exists only as the pre-`start()` value; the manager
/// replaces it synchronously before any async work begins, so dependent
/// components never observe it past the first tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Initializing,
    AwaitingName,
    AwaitingEmail,
    AwaitingOtp,
    Authenticated,
}

impl SessionPhase {
    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Any non-initial phase may fall back to `AwaitingName` (sign-out or
    /// restore failure), and `AwaitingName` may jump straight to
    /// `Authenticated` when an existing session is restored.
    pub fn can_transition_to(&self, target: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, target),
            (Initializing, AwaitingName)
                | (AwaitingName, AwaitingEmail)
                | (AwaitingName, Authenticated)
                | (AwaitingEmail, AwaitingOtp)
                | (AwaitingEmail, Authenticated)
                | (AwaitingOtp, Authenticated)
                | (AwaitingEmail, AwaitingName)
                | (AwaitingOtp, AwaitingName)
                | (Authenticated, AwaitingName)
        )
    }

    /// Whether the caller is authenticated in this phase.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Whether this phase is part of the OTP identity flow.
    pub fn in_otp_flow(&self) -> bool {
        matches!(self, Self::AwaitingName | Self::AwaitingEmail | Self::AwaitingOtp)
    }
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Initializing
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingEmail => "awaiting_email",
            Self::AwaitingOtp => "awaiting_otp",
            Self::Authenticated => "authenticated",
        };
        write!(f, "{s}")
    }
}
