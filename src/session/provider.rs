//! The consumed identity-provider contract.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::IdentityError;

use super::events::{Identity, IdentityEvent};

/// Narrow interface over the external identity provider.
///
/// Covers session restoration, the identity event stream, and the OTP
/// dispatch/verify operations the flow engine's effects run against.
/// Lockout after too many failed verifications is the provider's policy,
/// not enforced on this side.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Query for an existing session. `None` means no session to restore.
    async fn get_current_session(&self) -> Result<Option<Identity>, IdentityError>;

    /// Subscribe to identity change events.
    fn subscribe(&self) -> broadcast::Receiver<IdentityEvent>;

    /// Dispatch a one-time code to the given email address.
    async fn send_otp(&self, email: &str) -> Result<(), IdentityError>;

    /// Verify a one-time code. Success yields the authenticated identity.
    async fn verify_otp(&self, email: &str, code: &str) -> Result<Identity, IdentityError>;

    /// Terminate the current session.
    async fn sign_out(&self) -> Result<(), IdentityError>;
}
