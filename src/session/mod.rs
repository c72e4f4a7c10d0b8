//! Session lifecycle: the single source of truth for authentication state.

pub mod events;
pub mod manager;
pub mod phase;
pub mod provider;

pub use events::{Identity, IdentityEvent, IdentityEventKind};
pub use manager::{
    AgentSummary, DependentCaches, DependentData, OrgMembership, SessionManager, SubscriptionInfo,
};
pub use phase::SessionPhase;
pub use provider::IdentityProvider;

use serde::{Deserialize, Serialize};

/// The one session per client runtime.
///
/// Mutated only by the [`SessionManager`]; everything else reads snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub identity: Option<Identity>,
    pub phase: SessionPhase,
}

impl Session {
    /// Invariant check: `Authenticated` implies a present identity.
    pub fn is_consistent(&self) -> bool {
        !self.phase.is_authenticated() || self.identity.is_some()
    }
}

/// Transient identity collected during the OTP flow.
///
/// Owned by the OTP flow engine; cleared on successful authentication and
/// on sign-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingIdentity {
    pub name: String,
    pub email: String,
    pub otp_attempts: u32,
    pub resend_cooldown_secs: u32,
}

impl PendingIdentity {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
