//! SessionManager — owns the top-level authentication state.
//!
//! Reconciles the synchronous default (`AwaitingName`) with the asynchronous
//! session-restore check, listens for external identity events without racing
//! itself, and runs the resend-cooldown ticker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CoreConfig;
use crate::error::IdentityError;

use super::events::{Identity, IdentityEvent, IdentityEventKind};
use super::phase::SessionPhase;
use super::provider::IdentityProvider;
use super::{PendingIdentity, Session};

// ── Dependent data ──────────────────────────────────────────────────────

/// Summary of one configured agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
}

/// The caller's subscription, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub plan: String,
    pub active: bool,
}

/// The caller's organization membership, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMembership {
    pub organization_id: String,
    pub role: String,
}

/// Caches populated by the authenticated-state fan-out fetch.
#[derive(Debug, Clone, Default)]
pub struct DependentCaches {
    pub agents: Vec<AgentSummary>,
    pub subscription: Option<SubscriptionInfo>,
    pub organization: Option<OrgMembership>,
}

/// Narrow interface over the backend that serves post-authentication data.
#[async_trait]
pub trait DependentData: Send + Sync {
    async fn fetch_agents(&self, user_id: &str) -> Result<Vec<AgentSummary>, IdentityError>;
    async fn fetch_subscription(
        &self,
        user_id: &str,
    ) -> Result<Option<SubscriptionInfo>, IdentityError>;
    async fn fetch_organization(
        &self,
        user_id: &str,
    ) -> Result<Option<OrgMembership>, IdentityError>;
}

// ── Internal state ──────────────────────────────────────────────────────

/// Initialization guard. A `SignedIn` event arriving while a restore or
/// fan-out is in flight, or arriving twice, must not trigger duplicate
/// dependent-data fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    /// No initialization performed; a sign-in triggers the full path.
    Idle,
    /// Restore or fan-out in flight; concurrent sign-ins are field updates.
    Initializing,
    /// Fully initialized; a matching sign-in is a cheap field update.
    Initialized,
}

struct ManagerState {
    session: Session,
    init: InitState,
    caches: DependentCaches,
    visible: bool,
    /// When the page last became visible; suppression lifts after a grace.
    visible_at: Option<Instant>,
}

// ── SessionManager ──────────────────────────────────────────────────────

/// Single source of truth for whether the caller is authenticated.
///
/// Constructed in `AwaitingName` so dependent components can render the
/// unauthenticated flow immediately; `start()` then kicks off the async
/// restore, the identity-event listener, and the cooldown ticker. Errors
/// never escape the manager — every failure path lands in a defined phase.
pub struct SessionManager {
    state: RwLock<ManagerState>,
    pending: Arc<RwLock<PendingIdentity>>,
    provider: Arc<dyn IdentityProvider>,
    deps: Arc<dyn DependentData>,
    config: CoreConfig,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionManager {
    /// Create the manager. The session phase is `AwaitingName` from this
    /// point on — `Initializing` is never observable.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        deps: Arc<dyn DependentData>,
        config: CoreConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(ManagerState {
                session: Session {
                    identity: None,
                    phase: SessionPhase::AwaitingName,
                },
                init: InitState::Idle,
                caches: DependentCaches::default(),
                visible: true,
                visible_at: None,
            }),
            pending: Arc::new(RwLock::new(PendingIdentity::default())),
            provider,
            deps,
            config,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the restore step, the event listener, and the cooldown ticker.
    pub async fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().await;

        let manager = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            manager.restore().await;
        }));

        let manager = Arc::clone(self);
        let mut rx = self.provider.subscribe();
        tasks.push(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => manager.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "identity event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("identity event stream closed");
                        break;
                    }
                }
            }
        }));

        let manager = Arc::clone(self);
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let mut pending = manager.pending.write().await;
                if pending.resend_cooldown_secs > 0 {
                    pending.resend_cooldown_secs -= 1;
                }
            }
        }));
    }

    /// Abort all background tasks.
    pub async fn dispose(&self) {
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    // ── Restore ─────────────────────────────────────────────────────────

    async fn restore(self: &Arc<Self>) {
        self.state.write().await.init = InitState::Initializing;

        match self.provider.get_current_session().await {
            Ok(Some(identity)) => {
                debug!(user_id = %identity.user_id, "restored existing session");
                self.initialize_authenticated(identity).await;
            }
            Ok(None) => self.settle_unauthenticated().await,
            Err(e) => {
                warn!(error = %e, "session restore failed, staying unauthenticated");
                self.settle_unauthenticated().await;
            }
        }
    }

    /// Restore found nothing (or failed). Confirm `AwaitingName` — unless a
    /// sign-in event landed while the restore was in flight, in which case
    /// its identity was recorded and we finish its initialization now.
    async fn settle_unauthenticated(self: &Arc<Self>) {
        let raced_identity = {
            let mut st = self.state.write().await;
            match st.session.identity.clone() {
                Some(identity) => Some(identity),
                None => {
                    st.init = InitState::Idle;
                    st.session.phase = SessionPhase::AwaitingName;
                    None
                }
            }
        };
        if let Some(identity) = raced_identity {
            self.initialize_authenticated(identity).await;
        }
    }

    // ── Event handling ──────────────────────────────────────────────────

    async fn handle_event(self: &Arc<Self>, event: IdentityEvent) {
        match event.kind {
            IdentityEventKind::InitialSession => {
                // The restore step covers this; reacting here would double up.
                debug!("ignoring initial_session event");
            }
            IdentityEventKind::SignedOut => self.reset_all().await,
            IdentityEventKind::SignedIn => {
                let Some(identity) = event.identity else {
                    warn!("signed_in event without identity, ignoring");
                    return;
                };
                self.handle_signed_in(identity).await;
            }
            IdentityEventKind::TokenRefreshed => {
                if let Some(identity) = event.identity {
                    // A refresh never re-fetches; suppressed or not, it is
                    // only an identity-field update.
                    self.update_identity_field(identity).await;
                }
            }
        }
    }

    async fn handle_signed_in(self: &Arc<Self>, identity: Identity) {
        if self.suppressed().await {
            debug!(user_id = %identity.user_id, "backgrounded, downgrading sign-in to field update");
            self.update_identity_field(identity).await;
            return;
        }

        let full_init = {
            let st = self.state.read().await;
            match st.init {
                InitState::Initializing => false,
                InitState::Initialized => st
                    .session
                    .identity
                    .as_ref()
                    .map(|current| current.user_id != identity.user_id)
                    .unwrap_or(true),
                InitState::Idle => true,
            }
        };

        if full_init {
            self.initialize_authenticated(identity).await;
        } else {
            debug!(user_id = %identity.user_id, "sign-in already handled, updating identity field");
            self.update_identity_field(identity).await;
        }
    }

    async fn update_identity_field(&self, identity: Identity) {
        let mut st = self.state.write().await;
        st.session.identity = Some(identity);
    }

    /// Transition to `Authenticated` and load dependent data in parallel.
    ///
    /// Each fetch failure is logged and defaults to an empty/safe value;
    /// no failure blocks the others or fails the transition.
    async fn initialize_authenticated(&self, identity: Identity) {
        self.state.write().await.init = InitState::Initializing;

        let user_id = identity.user_id.clone();
        let (agents, subscription, organization) = tokio::join!(
            self.deps.fetch_agents(&user_id),
            self.deps.fetch_subscription(&user_id),
            self.deps.fetch_organization(&user_id),
        );

        let agents = agents.unwrap_or_else(|e| {
            warn!(error = %e, "agent fetch failed, defaulting to empty list");
            Vec::new()
        });
        let subscription = subscription.unwrap_or_else(|e| {
            warn!(error = %e, "subscription fetch failed, defaulting to none");
            None
        });
        let organization = organization.unwrap_or_else(|e| {
            warn!(error = %e, "organization fetch failed, defaulting to none");
            None
        });

        {
            let mut st = self.state.write().await;
            st.caches = DependentCaches {
                agents,
                subscription,
                organization,
            };
            st.session.identity = Some(identity);
            if !st.session.phase.is_authenticated() {
                st.session.phase = SessionPhase::Authenticated;
            }
            st.init = InitState::Initialized;
        }
        self.pending.write().await.clear();
        info!(user_id = %user_id, "session initialized");
    }

    /// Unconditional total reset: session, pending identity, caches, guards.
    async fn reset_all(&self) {
        {
            let mut st = self.state.write().await;
            st.session = Session {
                identity: None,
                phase: SessionPhase::AwaitingName,
            };
            st.caches = DependentCaches::default();
            st.init = InitState::Idle;
        }
        self.pending.write().await.clear();
        info!("signed out, session state cleared");
    }

    // ── Visibility ──────────────────────────────────────────────────────

    /// Report host page visibility. While hidden (and for a short grace
    /// after becoming visible again) sign-in and token-refresh events are
    /// downgraded to silent identity-field updates.
    pub async fn set_visible(&self, visible: bool) {
        let mut st = self.state.write().await;
        st.visible = visible;
        if visible {
            st.visible_at = Some(Instant::now());
        }
    }

    async fn suppressed(&self) -> bool {
        let st = self.state.read().await;
        if !st.visible {
            return true;
        }
        match st.visible_at {
            Some(at) => at.elapsed() < self.config.visibility_grace,
            None => false,
        }
    }

    // ── Phase and pending access ────────────────────────────────────────

    /// Apply a validated phase transition. Invalid transitions are logged
    /// and dropped rather than applied.
    pub async fn set_phase(&self, target: SessionPhase) -> bool {
        let mut st = self.state.write().await;
        let current = st.session.phase;
        if current == target {
            return true;
        }
        if !current.can_transition_to(target) {
            warn!(%current, %target, "invalid session phase transition, ignoring");
            return false;
        }
        st.session.phase = target;
        true
    }

    /// Mark the session authenticated with a verified identity: the OTP
    /// verify path lands here. Runs the same dependent-data fan-out as an
    /// external sign-in and clears the pending OTP state.
    pub async fn authenticate(&self, identity: Identity) {
        self.initialize_authenticated(identity).await;
    }

    /// Terminate the session. The provider normally confirms with a
    /// `SignedOut` event, but local state is cleared immediately either
    /// way so the UI is never stuck signed in behind a provider failure.
    pub async fn sign_out(&self) {
        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, "provider sign-out failed, clearing local state anyway");
        }
        self.reset_all().await;
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.session.phase
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.state.read().await.session.identity.clone()
    }

    pub async fn session(&self) -> Session {
        self.state.read().await.session.clone()
    }

    pub async fn caches(&self) -> DependentCaches {
        self.state.read().await.caches.clone()
    }

    pub async fn organization_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .caches
            .organization
            .as_ref()
            .map(|org| org.organization_id.clone())
    }

    /// Shared handle to the pending OTP identity (the OTP executor writes
    /// through this; sign-out clears it).
    pub fn pending(&self) -> Arc<RwLock<PendingIdentity>> {
        Arc::clone(&self.pending)
    }

    /// Restart the resend cooldown; the ticker decrements it once per second.
    pub async fn start_cooldown(&self, secs: u32) {
        self.pending.write().await.resend_cooldown_secs = secs;
    }

    pub async fn cooldown_secs(&self) -> u32 {
        self.pending.read().await.resend_cooldown_secs
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct MockProvider {
        session: Option<Identity>,
        fail_restore: bool,
        events: broadcast::Sender<IdentityEvent>,
    }

    impl MockProvider {
        fn new(session: Option<Identity>) -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                session,
                fail_restore: false,
                events,
            })
        }

        fn failing() -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                session: None,
                fail_restore: true,
                events,
            })
        }
    }

    #[async_trait]
    impl IdentityProvider for MockProvider {
        async fn get_current_session(&self) -> Result<Option<Identity>, IdentityError> {
            if self.fail_restore {
                return Err(IdentityError::RestoreFailed("backend down".into()));
            }
            Ok(self.session.clone())
        }

        fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
            self.events.subscribe()
        }

        async fn send_otp(&self, _email: &str) -> Result<(), IdentityError> {
            Ok(())
        }

        async fn verify_otp(&self, email: &str, _code: &str) -> Result<Identity, IdentityError> {
            Ok(Identity::new("u-verified", email))
        }

        async fn sign_out(&self) -> Result<(), IdentityError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDeps {
        agent_fetches: AtomicUsize,
        fail_agents: bool,
    }

    #[async_trait]
    impl DependentData for MockDeps {
        async fn fetch_agents(&self, _user_id: &str) -> Result<Vec<AgentSummary>, IdentityError> {
            self.agent_fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_agents {
                return Err(IdentityError::FetchFailed {
                    resource: "agents".into(),
                    reason: "boom".into(),
                });
            }
            Ok(vec![AgentSummary {
                id: "a1".into(),
                name: "Support Agent".into(),
            }])
        }

        async fn fetch_subscription(
            &self,
            _user_id: &str,
        ) -> Result<Option<SubscriptionInfo>, IdentityError> {
            Ok(Some(SubscriptionInfo {
                plan: "starter".into(),
                active: true,
            }))
        }

        async fn fetch_organization(
            &self,
            _user_id: &str,
        ) -> Result<Option<OrgMembership>, IdentityError> {
            Ok(Some(OrgMembership {
                organization_id: "org-1".into(),
                role: "owner".into(),
            }))
        }
    }

    async fn wait_for<F, Fut>(mut cond: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..200 {
            if cond().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test]
    async fn default_phase_is_awaiting_name_before_any_async_work() {
        let provider = MockProvider::new(None);
        let manager = SessionManager::new(provider, Arc::new(MockDeps::default()), CoreConfig::default());
        // No start() yet — the synchronous default must already hold.
        assert_eq!(manager.phase().await, SessionPhase::AwaitingName);
    }

    #[tokio::test]
    async fn restore_success_authenticates_and_loads_dependents() {
        let identity = Identity::new("u1", "maria@example.com");
        let provider = MockProvider::new(Some(identity));
        let manager = SessionManager::new(provider, Arc::new(MockDeps::default()), CoreConfig::default());
        manager.start().await;

        wait_for(|| async { manager.phase().await.is_authenticated() }).await;
        let session = manager.session().await;
        assert!(session.is_consistent());
        let caches = manager.caches().await;
        assert_eq!(caches.agents.len(), 1);
        assert!(caches.subscription.is_some());
        assert_eq!(manager.organization_id().await.as_deref(), Some("org-1"));
        manager.dispose().await;
    }

    #[tokio::test]
    async fn restore_failure_confirms_awaiting_name() {
        let provider = MockProvider::failing();
        let manager = SessionManager::new(provider, Arc::new(MockDeps::default()), CoreConfig::default());
        manager.start().await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(manager.phase().await, SessionPhase::AwaitingName);
        assert!(manager.identity().await.is_none());
        manager.dispose().await;
    }

    #[tokio::test]
    async fn dependent_fetch_failure_degrades_without_blocking_siblings() {
        let identity = Identity::new("u1", "maria@example.com");
        let provider = MockProvider::new(Some(identity));
        let deps = Arc::new(MockDeps {
            fail_agents: true,
            ..Default::default()
        });
        let manager = SessionManager::new(provider, deps, CoreConfig::default());
        manager.start().await;

        wait_for(|| async { manager.phase().await.is_authenticated() }).await;
        let caches = manager.caches().await;
        assert!(caches.agents.is_empty(), "failed fetch defaults to empty");
        assert!(caches.subscription.is_some(), "sibling fetch unaffected");
        assert!(caches.organization.is_some());
        manager.dispose().await;
    }

    #[tokio::test]
    async fn signed_out_clears_everything() {
        let identity = Identity::new("u1", "maria@example.com");
        let provider = MockProvider::new(Some(identity));
        let events = provider.events.clone();
        let manager = SessionManager::new(provider, Arc::new(MockDeps::default()), CoreConfig::default());
        manager.start().await;
        wait_for(|| async { manager.phase().await.is_authenticated() }).await;

        // Leave some pending state behind to prove it is cleared.
        manager.pending().write().await.name = "Maria".into();
        manager.start_cooldown(45).await;

        events.send(IdentityEvent::signed_out()).unwrap();
        wait_for(|| async { manager.phase().await == SessionPhase::AwaitingName }).await;

        assert!(manager.identity().await.is_none());
        let caches = manager.caches().await;
        assert!(caches.agents.is_empty());
        assert!(caches.subscription.is_none());
        assert!(caches.organization.is_none());
        assert_eq!(*manager.pending().read().await, PendingIdentity::default());
        manager.dispose().await;
    }

    #[tokio::test]
    async fn duplicate_signed_in_does_not_refetch() {
        let identity = Identity::new("u1", "maria@example.com");
        let provider = MockProvider::new(Some(identity.clone()));
        let events = provider.events.clone();
        let deps = Arc::new(MockDeps::default());
        let manager = SessionManager::new(provider, Arc::clone(&deps) as Arc<dyn DependentData>, CoreConfig::default());
        manager.start().await;
        wait_for(|| async { manager.phase().await.is_authenticated() }).await;
        let fetches_after_init = deps.agent_fetches.load(Ordering::SeqCst);

        events.send(IdentityEvent::signed_in(identity)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            deps.agent_fetches.load(Ordering::SeqCst),
            fetches_after_init,
            "matching sign-in must be a cheap field update"
        );
        manager.dispose().await;
    }

    #[tokio::test]
    async fn signed_in_for_different_identity_reinitializes() {
        let identity = Identity::new("u1", "maria@example.com");
        let provider = MockProvider::new(Some(identity));
        let events = provider.events.clone();
        let deps = Arc::new(MockDeps::default());
        let manager = SessionManager::new(provider, Arc::clone(&deps) as Arc<dyn DependentData>, CoreConfig::default());
        manager.start().await;
        wait_for(|| async { manager.phase().await.is_authenticated() }).await;
        let fetches_after_init = deps.agent_fetches.load(Ordering::SeqCst);

        events
            .send(IdentityEvent::signed_in(Identity::new("u2", "other@example.com")))
            .unwrap();
        wait_for(|| async {
            manager
                .identity()
                .await
                .map(|id| id.user_id == "u2")
                .unwrap_or(false)
        })
        .await;

        wait_for(|| async { deps.agent_fetches.load(Ordering::SeqCst) > fetches_after_init }).await;
        assert!(manager.phase().await.is_authenticated());
        manager.dispose().await;
    }

    #[tokio::test]
    async fn backgrounded_sign_in_is_silent() {
        let provider = MockProvider::new(None);
        let events = provider.events.clone();
        let deps = Arc::new(MockDeps::default());
        let manager = SessionManager::new(provider, Arc::clone(&deps) as Arc<dyn DependentData>, CoreConfig::default());
        manager.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        manager.set_visible(false).await;
        events
            .send(IdentityEvent::signed_in(Identity::new("u1", "maria@example.com")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Identity recorded, but no phase change and no dependent fetch.
        assert_eq!(manager.phase().await, SessionPhase::AwaitingName);
        assert!(manager.identity().await.is_some());
        assert_eq!(deps.agent_fetches.load(Ordering::SeqCst), 0);
        manager.dispose().await;
    }

    #[tokio::test]
    async fn token_refreshed_updates_identity_without_refetch() {
        let identity = Identity::new("u1", "maria@example.com");
        let provider = MockProvider::new(Some(identity));
        let events = provider.events.clone();
        let deps = Arc::new(MockDeps::default());
        let manager = SessionManager::new(provider, Arc::clone(&deps) as Arc<dyn DependentData>, CoreConfig::default());
        manager.start().await;
        wait_for(|| async { manager.phase().await.is_authenticated() }).await;
        let fetches_after_init = deps.agent_fetches.load(Ordering::SeqCst);

        let refreshed = Identity::new("u1", "maria@example.com").with_display_name("Maria");
        events.send(IdentityEvent::token_refreshed(refreshed)).unwrap();
        wait_for(|| async {
            manager
                .identity()
                .await
                .and_then(|id| id.display_name)
                .is_some()
        })
        .await;

        assert_eq!(deps.agent_fetches.load(Ordering::SeqCst), fetches_after_init);
        manager.dispose().await;
    }

    #[tokio::test]
    async fn initial_session_event_is_ignored() {
        let provider = MockProvider::new(None);
        let events = provider.events.clone();
        let deps = Arc::new(MockDeps::default());
        let manager = SessionManager::new(provider, Arc::clone(&deps) as Arc<dyn DependentData>, CoreConfig::default());
        manager.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        events
            .send(IdentityEvent::initial_session(Some(Identity::new(
                "u1",
                "maria@example.com",
            ))))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(manager.phase().await, SessionPhase::AwaitingName);
        assert_eq!(deps.agent_fetches.load(Ordering::SeqCst), 0);
        manager.dispose().await;
    }

    #[tokio::test]
    async fn cooldown_ticks_down_to_zero() {
        let provider = MockProvider::new(None);
        let manager = SessionManager::new(provider, Arc::new(MockDeps::default()), CoreConfig::default());
        manager.start().await;

        manager.start_cooldown(1).await;
        wait_for(|| async { manager.cooldown_secs().await == 0 }).await;
        // Stays at zero, never goes negative (u32) or restarts by itself.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(manager.cooldown_secs().await, 0);
        manager.dispose().await;
    }

    #[tokio::test]
    async fn invalid_phase_transition_is_dropped() {
        let provider = MockProvider::new(None);
        let manager = SessionManager::new(provider, Arc::new(MockDeps::default()), CoreConfig::default());
        assert!(!manager.set_phase(SessionPhase::AwaitingOtp).await);
        assert_eq!(manager.phase().await, SessionPhase::AwaitingName);
        assert!(manager.set_phase(SessionPhase::AwaitingEmail).await);
        assert_eq!(manager.phase().await, SessionPhase::AwaitingEmail);
    }
}
