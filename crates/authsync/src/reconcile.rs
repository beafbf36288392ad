//! Session reconciliation.
//!
//! Derives one authoritative [`CredentialPair`] from the provider's two
//! independent views of the current identity, then keeps it current from the
//! provider's auth events.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures_util::{FutureExt, Stream, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use authsync_core::error::Error;
use authsync_core::{AuthEvent, AuthProvider, CredentialPair, Result, Session};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity, TracingSink};
use crate::store::CredentialStore;

/// Tunables for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Lifetime given to placeholder sessions synthesized for a verified
    /// user whose session could not be read.
    pub placeholder_lifetime: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            placeholder_lifetime: Duration::hours(1),
        }
    }
}

/// Where the reconciler runs, which decides whether it outlives
/// initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Short-lived and server-side: initialize only.
    Request,
    /// Long-lived: initialize, then follow auth events.
    Process,
}

/// Keeps a [`CredentialStore`] consistent with an [`AuthProvider`].
///
/// The provider is owned by the execution context that built it and handed
/// in explicitly; the reconciler never reaches for a global client. Clones
/// share the provider, store and sink.
pub struct SessionReconciler<P> {
    provider: Arc<P>,
    store: CredentialStore,
    sink: Arc<dyn DiagnosticSink>,
    config: ReconcileConfig,
}

impl<P> Clone for SessionReconciler<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            store: self.store.clone(),
            sink: Arc::clone(&self.sink),
            config: self.config.clone(),
        }
    }
}

impl<P> std::fmt::Debug for SessionReconciler<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionReconciler")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P> SessionReconciler<P>
where
    P: AuthProvider + 'static,
{
    /// A reconciler with a fresh store, tracing diagnostics and default
    /// config.
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            store: CredentialStore::new(),
            sink: Arc::new(TracingSink),
            config: ReconcileConfig::default(),
        }
    }

    /// Publish into an existing store instead of a fresh one.
    pub fn with_store(mut self, store: CredentialStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Derive the pair from the provider and publish it once.
    ///
    /// Never fails: any error or panic along the way resets the pair to
    /// empty. If the returned future is dropped before completion, the store
    /// keeps its prior value.
    #[instrument(skip_all)]
    pub async fn initialize(&self) -> CredentialPair {
        let outcome = AssertUnwindSafe(self.reconcile()).catch_unwind().await;

        let pair = match outcome {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                self.report(
                    Diagnostic::new(
                        Severity::Error,
                        DiagnosticKind::InitializationFailed,
                        "Session initialization failed; continuing signed out",
                    )
                    .with_error(e),
                );
                CredentialPair::empty()
            }
            Err(panic) => {
                self.report(
                    Diagnostic::new(
                        Severity::Error,
                        DiagnosticKind::InitializationFailed,
                        "Session initialization panicked; continuing signed out",
                    )
                    .with_error(panic_message(panic.as_ref())),
                );
                CredentialPair::empty()
            }
        };

        self.store.publish(pair.clone());
        debug!(authenticated = pair.is_authenticated(), "Credential pair initialized");
        pair
    }

    async fn reconcile(&self) -> Result<CredentialPair> {
        let (user, session) = tokio::join!(self.provider.get_user(), self.provider.get_session());

        let user = match user {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.report(Diagnostic::new(
                    Severity::Info,
                    DiagnosticKind::NoUser,
                    "No signed-in user",
                ));
                return Ok(CredentialPair::empty());
            }
            Err(e) => {
                self.report(
                    Diagnostic::new(
                        Severity::Warning,
                        DiagnosticKind::UserLookupFailed,
                        "Could not verify the current user",
                    )
                    .with_error(e),
                );
                return Ok(CredentialPair::empty());
            }
        };

        let session = match session {
            Ok(Some(payload)) => {
                let (session, embedded) = payload.into_parts();
                if !embedded.same_identity(&user) {
                    self.report(
                        Diagnostic::new(
                            Severity::Warning,
                            DiagnosticKind::IdentityDivergence,
                            format!(
                                "Session belongs to {} but the verified user is {}; keeping the verified user",
                                embedded.id, user.id
                            ),
                        )
                        .with_user(user.id.clone()),
                    );
                }
                Some(session)
            }
            Ok(None) => None,
            Err(e) => {
                self.report(
                    Diagnostic::new(
                        Severity::Warning,
                        DiagnosticKind::SessionLookupFailed,
                        "Could not read the session",
                    )
                    .with_user(user.id.clone())
                    .with_error(e),
                );
                None
            }
        };

        let session = match session {
            Some(session) => session,
            None => {
                let placeholder = self.placeholder_session()?;
                self.report(
                    Diagnostic::new(
                        Severity::Debug,
                        DiagnosticKind::SessionSynthesized,
                        "Synthesized a placeholder session for the verified user",
                    )
                    .with_user(user.id.clone()),
                );
                placeholder
            }
        };

        Ok(CredentialPair::new(session, user))
    }

    fn placeholder_session(&self) -> Result<Session> {
        let now = Utc::now();
        let lifetime = self.config.placeholder_lifetime;
        if lifetime <= Duration::zero() || now.checked_add_signed(lifetime).is_none() {
            return Err(Error::Internal {
                message: format!("invalid placeholder lifetime: {lifetime}"),
            });
        }
        Ok(Session::placeholder(now, lifetime))
    }

    /// Fold one auth event into the store. Returns true if the pair changed.
    ///
    /// Only the session is compared: an event carrying the held session is
    /// skipped even when its embedded user differs, so a user verified by
    /// [`AuthProvider::get_user`] is never replaced by a stale copy.
    pub fn apply_event(&self, event: AuthEvent) -> bool {
        let kind = event.kind;
        let held = self.store.session();
        let incoming = event.session.as_ref().map(|payload| &payload.session);

        if incoming == held.as_ref() {
            let mut diagnostic = Diagnostic::new(
                Severity::Debug,
                DiagnosticKind::EventSkipped,
                format!("Skipped {kind}; session unchanged"),
            );
            if let Some(user) = self.store.user() {
                diagnostic = diagnostic.with_user(user.id);
            }
            self.report(diagnostic);
            return false;
        }

        let pair = CredentialPair::from_session(event.session);
        let user_id = pair.user().map(|u| u.id.clone());
        let changed = self.store.publish(pair);

        let mut diagnostic = Diagnostic::new(
            Severity::Info,
            DiagnosticKind::EventApplied,
            format!("Applied {kind}"),
        );
        if let Some(id) = user_id {
            diagnostic = diagnostic.with_user(id);
        }
        self.report(diagnostic);
        changed
    }

    /// Apply events in arrival order until the stream ends.
    pub async fn run_events<S>(&self, events: S)
    where
        S: Stream<Item = AuthEvent>,
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            self.apply_event(event);
        }
        debug!("Auth event stream ended");
    }

    /// Initialize and, for [`ExecutionContext::Process`], subscribe to auth
    /// events on a single background task.
    ///
    /// Returns the event task's handle; abort it to stop following events.
    pub async fn start(&self, context: ExecutionContext) -> Option<JoinHandle<()>>
    where
        P::Events: 'static,
    {
        self.initialize().await;

        match context {
            ExecutionContext::Request => None,
            ExecutionContext::Process => {
                let events = self.provider.on_auth_state_change();
                let reconciler = self.clone();
                Some(tokio::spawn(async move {
                    reconciler.run_events(events).await;
                }))
            }
        }
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use authsync_core::error::TransportError;
    use authsync_core::{AccessToken, AuthEventKind, RefreshToken, SessionWithUser, User};
    use tokio::sync::mpsc;

    use crate::diagnostics::MemorySink;

    #[derive(Clone)]
    enum Reply<T> {
        Value(T),
        Fail,
        Panic,
        Hang,
        After(std::time::Duration, T),
    }

    async fn resolve<T: Clone>(reply: &Reply<T>) -> Result<T> {
        match reply {
            Reply::Value(v) => Ok(v.clone()),
            Reply::Fail => Err(TransportError::Exhausted {
                attempts: 3,
                last: Box::new(TransportError::Status {
                    status: 503,
                    body: String::new(),
                }),
            }
            .into()),
            Reply::Panic => panic!("provider bug"),
            Reply::Hang => std::future::pending().await,
            Reply::After(delay, v) => {
                tokio::time::sleep(*delay).await;
                Ok(v.clone())
            }
        }
    }

    type EventStream = Pin<Box<dyn Stream<Item = AuthEvent> + Send>>;

    struct MockProvider {
        user: Reply<Option<User>>,
        session: Reply<Option<SessionWithUser>>,
        events: Mutex<Option<mpsc::UnboundedReceiver<AuthEvent>>>,
        subscriptions: AtomicUsize,
    }

    impl MockProvider {
        fn new(user: Reply<Option<User>>, session: Reply<Option<SessionWithUser>>) -> Self {
            Self {
                user,
                session,
                events: Mutex::new(None),
                subscriptions: AtomicUsize::new(0),
            }
        }

        fn with_events(self, rx: mpsc::UnboundedReceiver<AuthEvent>) -> Self {
            *self.events.lock().unwrap() = Some(rx);
            self
        }
    }

    #[async_trait]
    impl AuthProvider for MockProvider {
        type Events = EventStream;

        async fn get_user(&self) -> Result<Option<User>> {
            resolve(&self.user).await
        }

        async fn get_session(&self) -> Result<Option<SessionWithUser>> {
            resolve(&self.session).await
        }

        fn on_auth_state_change(&self) -> Self::Events {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            match self.events.lock().unwrap().take() {
                Some(mut rx) => Box::pin(async_stream::stream! {
                    while let Some(event) = rx.recv().await {
                        yield event;
                    }
                }),
                None => Box::pin(futures_util::stream::empty()),
            }
        }
    }

    fn session(access: &str) -> Session {
        Session {
            access_token: AccessToken::new(access),
            refresh_token: RefreshToken::new(format!("refresh-{access}")),
            token_type: "bearer".into(),
            expires_in: Some(3600),
            // Fixed so separately built copies compare equal.
            expires_at: Some(4_102_444_800),
        }
    }

    fn payload(access: &str, user: &str) -> SessionWithUser {
        SessionWithUser::new(session(access), User::new(user))
    }

    fn reconciler(provider: MockProvider) -> (SessionReconciler<MockProvider>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let reconciler = SessionReconciler::new(Arc::new(provider)).with_sink(Arc::clone(&sink));
        (reconciler, sink)
    }

    fn assert_null_safe(pair: &CredentialPair) {
        assert!(
            pair.user().is_some() || pair.session().is_none(),
            "session without user: {pair:?}"
        );
    }

    #[tokio::test]
    async fn user_without_session_gets_placeholder() {
        let (reconciler, sink) = reconciler(MockProvider::new(
            Reply::Value(Some(User::new("u1"))),
            Reply::Fail,
        ));

        let before = Utc::now().timestamp();
        let pair = reconciler.initialize().await;

        assert_eq!(pair.user().map(|u| u.id.as_str()), Some("u1"));
        let session = pair.session().unwrap();
        assert!(session.is_placeholder());
        assert!(session.access_token.is_empty());
        assert!(session.refresh_token.is_empty());
        let expires_at = session.expires_at.unwrap();
        assert!(expires_at >= before + 3600);
        assert!(expires_at <= Utc::now().timestamp() + 3600);

        assert!(sink.contains(DiagnosticKind::SessionLookupFailed));
        assert!(sink.contains(DiagnosticKind::SessionSynthesized));
        assert_eq!(reconciler.store().current(), pair);
    }

    #[tokio::test]
    async fn missing_session_also_gets_placeholder() {
        let (reconciler, sink) = reconciler(MockProvider::new(
            Reply::Value(Some(User::new("u1"))),
            Reply::Value(None),
        ));

        let pair = reconciler.initialize().await;
        assert!(pair.has_placeholder_session());
        assert!(!sink.contains(DiagnosticKind::SessionLookupFailed));
    }

    #[tokio::test]
    async fn both_failing_yields_empty_pair() {
        let (reconciler, sink) = reconciler(MockProvider::new(Reply::Fail, Reply::Fail));

        let pair = reconciler.initialize().await;
        assert_eq!(pair, CredentialPair::empty());
        assert!(sink.contains(DiagnosticKind::UserLookupFailed));

        let failure = &sink.records()[0];
        assert_eq!(failure.severity, Severity::Warning);
        assert!(failure.error.as_deref().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn session_without_verified_user_is_dropped() {
        let (reconciler, sink) = reconciler(MockProvider::new(
            Reply::Fail,
            Reply::Value(Some(payload("at", "u1"))),
        ));

        let pair = reconciler.initialize().await;
        assert_eq!(pair, CredentialPair::empty());
        assert_null_safe(&pair);
        assert!(sink.contains(DiagnosticKind::UserLookupFailed));
    }

    #[tokio::test]
    async fn no_user_is_not_a_failure() {
        let (reconciler, sink) =
            reconciler(MockProvider::new(Reply::Value(None), Reply::Value(None)));

        let pair = reconciler.initialize().await;
        assert_eq!(pair, CredentialPair::empty());
        assert_eq!(sink.kinds(), vec![DiagnosticKind::NoUser]);
    }

    #[tokio::test]
    async fn session_is_stripped_and_verified_user_kept() {
        let verified = User::new("u1").with_email("fresh@example.com");
        let cached = payload("at", "u1");
        let (reconciler, sink) = reconciler(MockProvider::new(
            Reply::Value(Some(verified.clone())),
            Reply::Value(Some(cached.clone())),
        ));

        let pair = reconciler.initialize().await;
        assert_eq!(pair.user(), Some(&verified));
        assert_eq!(pair.session(), Some(&cached.session));
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn divergent_identity_prefers_verified_user() {
        let (reconciler, sink) = reconciler(MockProvider::new(
            Reply::Value(Some(User::new("A"))),
            Reply::Value(Some(payload("at", "B"))),
        ));

        let pair = reconciler.initialize().await;
        assert_eq!(pair.user().map(|u| u.id.as_str()), Some("A"));
        assert_eq!(pair.session().map(|s| s.access_token.as_str()), Some("at"));

        let records = sink.records();
        let divergence = records
            .iter()
            .find(|d| d.kind == DiagnosticKind::IdentityDivergence)
            .unwrap();
        assert_eq!(divergence.severity, Severity::Warning);
        assert_eq!(divergence.user_id.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn panic_resets_to_empty() {
        let (reconciler, sink) = reconciler(MockProvider::new(
            Reply::Value(Some(User::new("u1"))),
            Reply::Panic,
        ));
        reconciler
            .store()
            .publish(CredentialPair::new(session("old"), User::new("u0")));

        let pair = reconciler.initialize().await;
        assert_eq!(pair, CredentialPair::empty());
        assert_eq!(reconciler.store().current(), CredentialPair::empty());

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, DiagnosticKind::InitializationFailed);
        assert_eq!(records[0].error.as_deref(), Some("provider bug"));
    }

    #[tokio::test]
    async fn invalid_placeholder_lifetime_resets_to_empty() {
        let (reconciler, sink) = reconciler(MockProvider::new(
            Reply::Value(Some(User::new("u1"))),
            Reply::Value(None),
        ));
        let reconciler = reconciler.with_config(ReconcileConfig {
            placeholder_lifetime: Duration::zero(),
        });

        let pair = reconciler.initialize().await;
        assert_eq!(pair, CredentialPair::empty());
        assert!(sink.contains(DiagnosticKind::InitializationFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_initialization_keeps_prior_value() {
        let (reconciler, sink) = reconciler(MockProvider::new(
            Reply::Hang,
            Reply::Value(Some(payload("at", "u1"))),
        ));
        let prior = CredentialPair::new(session("old"), User::new("u0"));
        reconciler.store().publish(prior.clone());

        let outcome =
            tokio::time::timeout(std::time::Duration::from_secs(5), reconciler.initialize()).await;

        assert!(outcome.is_err());
        assert_eq!(reconciler.store().current(), prior);
        assert!(sink.records().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn lookups_run_concurrently() {
        let delay = std::time::Duration::from_millis(100);
        let (reconciler, _sink) = reconciler(MockProvider::new(
            Reply::After(delay, Some(User::new("u1"))),
            Reply::After(delay, Some(payload("at", "u1"))),
        ));

        let started = tokio::time::Instant::now();
        let pair = reconciler.initialize().await;

        assert!(pair.is_authenticated());
        assert!(started.elapsed() < delay * 2);
    }

    #[tokio::test]
    async fn signed_out_event_clears_pair() {
        let (reconciler, _sink) = reconciler(MockProvider::new(
            Reply::Value(Some(User::new("u1"))),
            Reply::Value(Some(payload("at", "u1"))),
        ));
        reconciler.initialize().await;
        assert!(reconciler.store().current().is_authenticated());

        assert!(reconciler.apply_event(AuthEvent::new(AuthEventKind::SignedOut, None)));
        assert_eq!(reconciler.store().current(), CredentialPair::empty());
    }

    #[tokio::test]
    async fn repeated_event_is_skipped() {
        let (reconciler, sink) = reconciler(MockProvider::new(Reply::Value(None), Reply::Value(None)));
        let mut rx = reconciler.store().subscribe();
        let event = AuthEvent::new(AuthEventKind::SignedIn, Some(payload("at", "u1")));

        assert!(reconciler.apply_event(event.clone()));
        let first = CredentialStore::changed(&mut rx).await.unwrap();

        assert!(!reconciler.apply_event(event));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(reconciler.store().current(), first);
        assert_eq!(
            sink.kinds(),
            vec![DiagnosticKind::EventApplied, DiagnosticKind::EventSkipped]
        );
    }

    #[tokio::test]
    async fn initial_session_keeps_verified_user_after_divergence() {
        let (reconciler, sink) = reconciler(MockProvider::new(
            Reply::Value(Some(User::new("A"))),
            Reply::Value(Some(payload("at", "B"))),
        ));
        reconciler.initialize().await;
        let mut rx = reconciler.store().subscribe();

        let event = AuthEvent::new(AuthEventKind::InitialSession, Some(payload("at", "B")));
        assert!(!reconciler.apply_event(event));

        assert!(!rx.has_changed().unwrap());
        let pair = reconciler.store().current();
        assert_eq!(pair.user().map(|u| u.id.as_str()), Some("A"));
        assert_eq!(pair.session().map(|s| s.access_token.as_str()), Some("at"));
        let last = sink.records().pop().unwrap();
        assert_eq!(last.kind, DiagnosticKind::EventSkipped);
        assert_eq!(last.user_id.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn same_session_with_different_user_fields_is_skipped() {
        let verified = User::new("u1").with_email("fresh@example.com");
        let (reconciler, _sink) = reconciler(MockProvider::new(
            Reply::Value(Some(verified.clone())),
            Reply::Value(Some(payload("at", "u1"))),
        ));
        reconciler.initialize().await;

        let stale = SessionWithUser::new(session("at"), User::new("u1").with_email("old@example.com"));
        assert!(!reconciler.apply_event(AuthEvent::new(AuthEventKind::TokenRefreshed, Some(stale))));
        assert_eq!(reconciler.store().user(), Some(verified));

        // A new session brings its own user along.
        assert!(reconciler.apply_event(AuthEvent::new(
            AuthEventKind::TokenRefreshed,
            Some(payload("at-2", "u1")),
        )));
        assert_eq!(reconciler.store().user(), Some(User::new("u1")));
    }

    #[tokio::test]
    async fn event_replaces_session_and_user_together() {
        let (reconciler, _sink) = reconciler(MockProvider::new(Reply::Value(None), Reply::Value(None)));

        reconciler.apply_event(AuthEvent::new(
            AuthEventKind::SignedIn,
            Some(payload("at-1", "u1")),
        ));
        reconciler.apply_event(AuthEvent::new(
            AuthEventKind::SignedIn,
            Some(payload("at-2", "u2")),
        ));

        let pair = reconciler.store().current();
        assert_eq!(pair.user().map(|u| u.id.as_str()), Some("u2"));
        assert_eq!(pair.session().map(|s| s.access_token.as_str()), Some("at-2"));
    }

    #[tokio::test]
    async fn events_apply_in_arrival_order() {
        let (reconciler, sink) = reconciler(MockProvider::new(Reply::Value(None), Reply::Value(None)));
        let mut rx = reconciler.store().subscribe();

        let events = futures_util::stream::iter(vec![
            AuthEvent::new(AuthEventKind::SignedIn, Some(payload("at-1", "u1"))),
            AuthEvent::new(AuthEventKind::TokenRefreshed, Some(payload("at-2", "u1"))),
            AuthEvent::new(AuthEventKind::TokenRefreshed, Some(payload("at-2", "u1"))),
            AuthEvent::signed_out(),
        ]);
        reconciler.run_events(events).await;

        assert_eq!(reconciler.store().current(), CredentialPair::empty());
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            sink.kinds(),
            vec![
                DiagnosticKind::EventApplied,
                DiagnosticKind::EventApplied,
                DiagnosticKind::EventSkipped,
                DiagnosticKind::EventApplied,
            ]
        );
        assert_null_safe(&rx.borrow_and_update());
    }

    #[tokio::test]
    async fn request_context_does_not_subscribe() {
        let (reconciler, _sink) = reconciler(MockProvider::new(
            Reply::Value(Some(User::new("u1"))),
            Reply::Value(Some(payload("at", "u1"))),
        ));

        let handle = reconciler.start(ExecutionContext::Request).await;
        assert!(handle.is_none());
        assert_eq!(reconciler.provider().subscriptions.load(Ordering::SeqCst), 0);
        assert!(reconciler.store().current().is_authenticated());
    }

    #[tokio::test]
    async fn process_context_follows_events() {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = MockProvider::new(
            Reply::Value(Some(User::new("u1"))),
            Reply::Value(Some(payload("at", "u1"))),
        )
        .with_events(rx);
        let (reconciler, _sink) = reconciler(provider);

        let handle = reconciler.start(ExecutionContext::Process).await.unwrap();
        assert_eq!(reconciler.provider().subscriptions.load(Ordering::SeqCst), 1);

        let mut watch = reconciler.store().subscribe();
        tx.send(AuthEvent::signed_out()).unwrap();

        let next = CredentialStore::changed(&mut watch).await.unwrap();
        assert_eq!(next, CredentialPair::empty());

        drop(tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn every_reachable_pair_is_null_safe() {
        let users = [Reply::Value(Some(User::new("u1"))), Reply::Value(None), Reply::Fail];
        let sessions = [
            Reply::Value(Some(payload("at", "u1"))),
            Reply::Value(Some(payload("at", "u2"))),
            Reply::Value(None),
            Reply::Fail,
        ];

        for user in &users {
            for session in &sessions {
                let (reconciler, _sink) =
                    reconciler(MockProvider::new(user.clone(), session.clone()));
                assert_null_safe(&reconciler.initialize().await);

                reconciler.apply_event(AuthEvent::signed_out());
                assert_null_safe(&reconciler.store().current());
            }
        }
    }
}
