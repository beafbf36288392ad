//! GoTrue-backed identity provider.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use authsync_core::error::{AuthError, Error, TransportError};
use authsync_core::{
    AccessToken, AuthEvent, AuthEventKind, AuthProvider, HttpRequest, HttpResponse, Method,
    ProviderUrl, Result, Session, SessionWithUser, Transport, User,
};

use crate::endpoints::*;
use crate::events::{AuthEventStream, EventHub};
use crate::jwt;
use crate::transport::{ReqwestTransport, RetryPolicy, RetryingTransport};

/// Sent with every request to identify the client library.
const CLIENT_INFO: &str = concat!("authsync/", env!("CARGO_PKG_VERSION"));

/// Configuration for a [`GoTrueProvider`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Project base URL; the auth API lives under `/auth/v1`.
    pub url: ProviderUrl,
    /// Public (anon) API key.
    pub anon_key: String,
    /// Retry policy for the default transport.
    pub retry: RetryPolicy,
    /// Sessions expiring within this margin are refreshed before use.
    pub refresh_margin: Duration,
}

impl ProviderConfig {
    pub fn new(url: ProviderUrl, anon_key: impl Into<String>) -> Self {
        Self {
            url,
            anon_key: anon_key.into(),
            retry: RetryPolicy::default(),
            refresh_margin: Duration::seconds(90),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// A GoTrue (Supabase Auth) client holding one session.
///
/// Each execution context constructs and owns its own provider; nothing is
/// shared between instances. Clones share the same session and event hub.
///
/// # Example
///
/// ```no_run
/// use authsync_core::{AuthProvider, ProviderUrl};
/// use authsync_gotrue::{GoTrueProvider, ProviderConfig};
///
/// # async fn example() -> Result<(), authsync_core::Error> {
/// let url = ProviderUrl::new("https://xyz.supabase.co")?;
/// let provider = GoTrueProvider::new(ProviderConfig::new(url, "anon-key"))?;
/// provider.sign_in_with_password("alice@example.com", "secret").await?;
///
/// let user = provider.get_user().await?;
/// println!("{:?}", user.map(|u| u.id));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GoTrueProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    config: ProviderConfig,
    transport: Arc<dyn Transport>,
    session: RwLock<Option<SessionWithUser>>,
    events: EventHub,
    /// Held by every operation that replaces the session. GoTrue refresh
    /// tokens are single-use, and a refresh still in flight must not
    /// reinstate a session that a later sign-out cleared.
    update_lock: tokio::sync::Mutex<()>,
}

impl GoTrueProvider {
    /// Create a provider with the default retrying reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let transport = RetryingTransport::new(ReqwestTransport::new()?, config.retry.clone());
        Ok(Self::with_transport(config, transport))
    }

    /// Create a provider that sends every request through `transport`.
    pub fn with_transport(config: ProviderConfig, transport: impl Transport + 'static) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                config,
                transport: Arc::new(transport),
                session: RwLock::new(None),
                events: EventHub::new(),
                update_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Returns the provider URL.
    pub fn url(&self) -> &ProviderUrl {
        &self.inner.config.url
    }

    /// Snapshot of the locally held session, without any network call.
    pub fn current_session(&self) -> Option<SessionWithUser> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the provider rejects the
    /// credentials.
    #[instrument(skip(self, password), fields(url = %self.inner.config.url))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionWithUser> {
        let _guard = self.inner.update_lock.lock().await;
        info!("Signing in with password");

        let request = self
            .anon_request(Method::Post, PASSWORD_GRANT)
            .json(&PasswordGrantRequest { email, password })?;

        let session = self.token_grant(request).await.map_err(|e| match e {
            Error::Protocol(p) if p.is_invalid_grant() || p.status == 400 => {
                let message = p.message.clone().unwrap_or_else(|| p.to_string());
                AuthError::InvalidCredentials(message).into()
            }
            other => other,
        })?;

        debug!(user_id = %session.user.id, "Signed in");
        self.store(Some(session.clone()), AuthEventKind::SignedIn);
        Ok(session)
    }

    /// Adopt previously persisted tokens.
    ///
    /// The tokens are verified against the provider; if the access token is
    /// expired or rejected, the refresh token is exchanged instead.
    #[instrument(skip(self, session), fields(url = %self.inner.config.url))]
    pub async fn set_session(&self, session: Session) -> Result<SessionWithUser> {
        let _guard = self.inner.update_lock.lock().await;
        let now = Utc::now();
        let mut session = session;
        if session.expires_at.is_none() {
            session.expires_at = jwt::expiry(session.access_token.as_str());
        }

        let can_refresh = !session.refresh_token.is_empty();
        if can_refresh && session.is_expired_at(now, self.inner.config.refresh_margin) {
            info!("Persisted session is expiring, refreshing");
            return self.refresh_with(session.refresh_token.as_str()).await;
        }

        match self.fetch_user(&session.access_token).await {
            Ok(user) => {
                let restored = SessionWithUser::new(session, user);
                debug!(user_id = %restored.user.id, "Session restored");
                self.store(Some(restored.clone()), AuthEventKind::SignedIn);
                Ok(restored)
            }
            Err(Error::Auth(AuthError::SessionExpired)) if can_refresh => {
                info!("Persisted access token rejected, refreshing");
                self.refresh_with(session.refresh_token.as_str()).await
            }
            Err(e) => Err(e),
        }
    }

    /// Exchange the held refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionMissing`] without a held session and
    /// [`AuthError::RefreshTokenInvalid`] if the provider rejects the token.
    #[instrument(skip(self), fields(url = %self.inner.config.url))]
    pub async fn refresh_session(&self) -> Result<SessionWithUser> {
        let _guard = self.inner.update_lock.lock().await;
        let current = self.current_session().ok_or(AuthError::SessionMissing)?;
        self.refresh_with(current.session.refresh_token.as_str())
            .await
    }

    /// Revoke the session remotely and drop it locally.
    ///
    /// The local session is cleared and `SIGNED_OUT` emitted even when the
    /// remote call fails; that failure is still returned. A refresh already
    /// in flight finishes first, and its session is the one revoked.
    #[instrument(skip(self), fields(url = %self.inner.config.url))]
    pub async fn sign_out(&self) -> Result<()> {
        let _guard = self.inner.update_lock.lock().await;
        let Some(current) = self.current_session() else {
            debug!("No session to sign out");
            return Ok(());
        };

        info!(user_id = %current.user.id, "Signing out");
        let request = self.user_request(Method::Post, LOGOUT, &current.session.access_token);
        let remote = self.execute(request).await;

        self.store(None, AuthEventKind::SignedOut);

        match remote {
            Ok(_) => Ok(()),
            // The session is already gone server-side.
            Err(Error::Protocol(p)) if p.status == 401 || p.status == 403 || p.status == 404 => {
                debug!(status = p.status, "Session already revoked");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Remote sign-out failed; local session cleared");
                Err(e)
            }
        }
    }

    /// Refresh the held session in the background whenever it gets within
    /// the refresh margin of expiring.
    ///
    /// Failures are logged and retried on the next tick. Abort the returned
    /// handle to stop.
    pub fn spawn_auto_refresh(&self, every: StdDuration) -> JoinHandle<()> {
        let provider = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = provider.refresh_if_expiring().await {
                    warn!(error = %e, "Automatic refresh failed");
                }
            }
        })
    }

    /// Refresh only if the held session is still expiring once the update
    /// lock is held; concurrent callers share one refresh.
    async fn refresh_if_expiring(&self) -> Result<Option<SessionWithUser>> {
        let _guard = self.inner.update_lock.lock().await;
        let Some(current) = self.current_session() else {
            return Ok(None);
        };
        let margin = self.inner.config.refresh_margin;
        if current.session.refresh_token.is_empty()
            || !current.session.is_expired_at(Utc::now(), margin)
        {
            return Ok(Some(current));
        }

        debug!(user_id = %current.user.id, "Session expiring, refreshing");
        match self.refresh_with(current.session.refresh_token.as_str()).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(Error::Auth(AuthError::RefreshTokenInvalid)) => {
                warn!(user_id = %current.user.id, "Refresh token rejected, signing out locally");
                self.store(None, AuthEventKind::SignedOut);
                Err(AuthError::RefreshTokenInvalid.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Callers hold the update lock.
    async fn refresh_with(&self, refresh_token: &str) -> Result<SessionWithUser> {
        if refresh_token.is_empty() {
            return Err(AuthError::SessionMissing.into());
        }

        let request = self
            .anon_request(Method::Post, REFRESH_GRANT)
            .json(&RefreshGrantRequest { refresh_token })?;

        let session = self.token_grant(request).await.map_err(|e| match e {
            Error::Protocol(p) if p.is_invalid_grant() || p.status == 400 || p.status == 401 => {
                AuthError::RefreshTokenInvalid.into()
            }
            other => other,
        })?;

        debug!(user_id = %session.user.id, "Session refreshed");
        self.store(Some(session.clone()), AuthEventKind::TokenRefreshed);
        Ok(session)
    }

    async fn fetch_user(&self, access_token: &AccessToken) -> Result<User> {
        let request = self.user_request(Method::Get, USER, access_token);
        let response = self.execute(request).await.map_err(|e| match e {
            Error::Protocol(p) if p.is_auth_error() => AuthError::SessionExpired.into(),
            other => other,
        })?;
        decode(&response)
    }

    async fn token_grant(&self, request: HttpRequest) -> Result<SessionWithUser> {
        let response = self.execute(request).await?;
        let payload: SessionWithUser = decode(&response)?;
        Ok(SessionWithUser::new(
            payload.session.with_computed_expiry(Utc::now()),
            payload.user,
        ))
    }

    /// Send a request, turning non-success responses into protocol errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        match self.inner.transport.send(request).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(GoTrueErrorResponse::parse(&response.text())
                .into_protocol_error(response.status)
                .into()),
            Err(TransportError::Status { status, body }) => {
                Err(GoTrueErrorResponse::parse(&body)
                    .into_protocol_error(status)
                    .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn anon_request(&self, method: Method, path: &str) -> HttpRequest {
        let anon_key = &self.inner.config.anon_key;
        self.base_request(method, path)
            .header("Authorization", format!("Bearer {}", anon_key))
    }

    fn user_request(&self, method: Method, path: &str, token: &AccessToken) -> HttpRequest {
        self.base_request(method, path)
            .header("Authorization", format!("Bearer {}", token.as_str()))
    }

    fn base_request(&self, method: Method, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.inner.config.url.auth_url(path))
            .header("apikey", self.inner.config.anon_key.as_str())
            .header("X-Client-Info", CLIENT_INFO)
            .header("Accept", "application/json")
    }

    /// Replace the held session and notify subscribers.
    ///
    /// The write happens under the hub lock, so subscribers see events in
    /// the same order the session changed.
    fn store(&self, session: Option<SessionWithUser>, kind: AuthEventKind) {
        self.inner.events.emit_with(|| {
            let mut held = self
                .inner
                .session
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *held = session.clone();
            AuthEvent::new(kind, session)
        });
    }
}

/// Decode a success body; a 2xx body that names an error becomes a
/// protocol error rather than a decode failure.
fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    response.json::<T>().map_err(|err| {
        let body = GoTrueErrorResponse::parse(&response.text());
        if body.has_error() {
            Error::Protocol(body.into_protocol_error(response.status))
        } else {
            Error::Malformed(err)
        }
    })
}

#[async_trait]
impl AuthProvider for GoTrueProvider {
    type Events = AuthEventStream;

    #[instrument(skip(self), fields(url = %self.inner.config.url))]
    async fn get_user(&self) -> Result<Option<User>> {
        let Some(current) = self.current_session() else {
            debug!("No session, no user to verify");
            return Ok(None);
        };
        self.fetch_user(&current.session.access_token).await.map(Some)
    }

    #[instrument(skip(self), fields(url = %self.inner.config.url))]
    async fn get_session(&self) -> Result<Option<SessionWithUser>> {
        let Some(current) = self.current_session() else {
            return Ok(None);
        };
        if !current
            .session
            .is_expired_at(Utc::now(), self.inner.config.refresh_margin)
        {
            return Ok(Some(current));
        }
        self.refresh_if_expiring().await
    }

    fn on_auth_state_change(&self) -> Self::Events {
        let inner = Arc::clone(&self.inner);
        self.inner.events.subscribe_with(move || {
            let session = inner
                .session
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            AuthEvent::new(AuthEventKind::InitialSession, session)
        })
    }
}

impl std::fmt::Debug for GoTrueProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoTrueProvider")
            .field("url", &self.inner.config.url)
            .field("anon_key", &"[REDACTED]")
            .field("session", &"[REDACTED]")
            .finish()
    }
}
