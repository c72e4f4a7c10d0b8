//! Identity types and the external identity event stream.

use serde::{Deserialize, Serialize};

/// An authenticated principal handle returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Kinds of events emitted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityEventKind {
    /// Emitted once on subscription with the current session. Ignored by the
    /// manager — the restore step covers it, avoiding duplicate work.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// One identity change delivered over the provider's event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityEvent {
    pub kind: IdentityEventKind,
    pub identity: Option<Identity>,
}

impl IdentityEvent {
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            kind: IdentityEventKind::SignedIn,
            identity: Some(identity),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: IdentityEventKind::SignedOut,
            identity: None,
        }
    }

    pub fn token_refreshed(identity: Identity) -> Self {
        Self {
            kind: IdentityEventKind::TokenRefreshed,
            identity: Some(identity),
        }
    }

    pub fn initial_session(identity: Option<Identity>) -> Self {
        Self {
            kind: IdentityEventKind::InitialSession,
            identity,
        }
    }
}
