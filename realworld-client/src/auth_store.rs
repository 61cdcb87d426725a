//! Current-user state: restore, login, register, logout and profile edits.
//!
//! All mutating operations go through one async writer lock, so overlapping
//! calls finish in call order and the user never drifts from the token held by
//! the [`ApiClient`].

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::api_client::ApiClient;
use crate::error::ClientError;
use crate::models::{LoginCredentials, ProfileUpdate, RegistrationRequest, User};
use crate::storage::UserStorage;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthPhase {
    /// Persisted user not loaded yet.
    Initializing,
    Anonymous,
    Authenticated(User),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub phase: AuthPhase,
    pub busy: bool,
    pub error: Option<String>,
    /// Set when the persisted user could not be read at startup.
    pub restore_failure: Option<String>,
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match &self.phase {
            AuthPhase::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_initializing(&self) -> bool {
        self.phase == AuthPhase::Initializing
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            phase: AuthPhase::Initializing,
            busy: false,
            error: None,
            restore_failure: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    Restored(User),
    Anonymous,
    /// Stored entry was unreadable; the store fell back to anonymous.
    Failed(String),
}

/// Holds `busy` for the length of one request. Dropping it without `fail`
/// (success, or the caller abandoning the future) clears the flag.
struct Busy<'a> {
    state: &'a watch::Sender<AuthState>,
    failed: bool,
}

impl<'a> Busy<'a> {
    fn start(state: &'a watch::Sender<AuthState>) -> Self {
        state.send_modify(|s| {
            s.busy = true;
            s.error = None;
        });
        Self {
            state,
            failed: false,
        }
    }

    fn fail(mut self, err: &ClientError) {
        self.failed = true;
        self.state.send_modify(|s| {
            s.busy = false;
            s.error = Some(err.to_string());
        });
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        if !self.failed {
            self.state.send_modify(|s| s.busy = false);
        }
    }
}

#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    api: ApiClient,
    storage: Arc<dyn UserStorage>,
    state: watch::Sender<AuthState>,
    writer: Mutex<()>,
}

impl AuthStore {
    pub fn new(api: ApiClient, storage: Arc<dyn UserStorage>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            inner: Arc::new(AuthInner {
                api,
                storage,
                state,
                writer: Mutex::new(()),
            }),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Load the persisted user. A missing or unreadable entry leaves the store
    /// anonymous; an unreadable one is also reported in `restore_failure`.
    pub async fn restore(&self) -> RestoreOutcome {
        let _writer = self.inner.writer.lock().await;

        match self.inner.storage.load() {
            Ok(Some(user)) => {
                self.inner.api.set_token(user.token.clone()).await;
                tracing::info!("Restored session for {}", user.username);
                self.inner.state.send_modify(|s| {
                    s.phase = AuthPhase::Authenticated(user.clone());
                    s.restore_failure = None;
                });
                RestoreOutcome::Restored(user)
            }
            Ok(None) => {
                self.inner.api.clear_token().await;
                self.inner.state.send_modify(|s| {
                    s.phase = AuthPhase::Anonymous;
                    s.restore_failure = None;
                });
                RestoreOutcome::Anonymous
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Failed to load stored user: {}", message);
                self.inner.api.clear_token().await;
                self.inner.state.send_modify(|s| {
                    s.phase = AuthPhase::Anonymous;
                    s.restore_failure = Some(message.clone());
                });
                RestoreOutcome::Failed(message)
            }
        }
    }

    pub async fn login(&self, credentials: LoginCredentials) -> Result<User, ClientError> {
        if let Err(e) = credentials.validate() {
            self.record_error(&e);
            return Err(e);
        }

        let _writer = self.inner.writer.lock().await;
        let busy = Busy::start(&self.inner.state);

        let result = self.inner.api.authenticate(&credentials).await;
        self.finish_sign_in(busy, result).await
    }

    pub async fn register(&self, registration: RegistrationRequest) -> Result<User, ClientError> {
        if let Err(e) = registration.validate() {
            self.record_error(&e);
            return Err(e);
        }

        let _writer = self.inner.writer.lock().await;
        let busy = Busy::start(&self.inner.state);

        let result = self.inner.api.create_user(&registration).await;
        self.finish_sign_in(busy, result).await
    }

    pub async fn logout(&self) {
        let _writer = self.inner.writer.lock().await;

        self.inner.api.clear_token().await;
        self.inner.state.send_modify(|s| {
            s.phase = AuthPhase::Anonymous;
            s.error = None;
        });
        self.persist(None);
        tracing::info!("Logged out");
    }

    /// Replace the current user, e.g. after a profile edit.
    pub async fn update_user(&self, user: User) {
        let _writer = self.inner.writer.lock().await;
        self.apply_user(user).await;
    }

    /// Send a profile edit and adopt the user the server returns.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, ClientError> {
        if let Err(e) = update.validate() {
            self.record_error(&e);
            return Err(e);
        }

        let _writer = self.inner.writer.lock().await;
        let busy = Busy::start(&self.inner.state);

        match self.inner.api.update_profile(&update).await {
            Ok(user) => {
                self.apply_user(user.clone()).await;
                drop(busy);
                Ok(user)
            }
            Err(e) => {
                busy.fail(&e);
                Err(e)
            }
        }
    }

    fn record_error(&self, err: &ClientError) {
        self.inner
            .state
            .send_modify(|s| s.error = Some(err.to_string()));
    }

    async fn finish_sign_in(
        &self,
        busy: Busy<'_>,
        result: Result<User, ClientError>,
    ) -> Result<User, ClientError> {
        match result {
            Ok(user) => {
                tracing::info!("Signed in as {}", user.username);
                self.apply_user(user.clone()).await;
                drop(busy);
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("Sign in failed: {}", e);
                busy.fail(&e);
                Err(e)
            }
        }
    }

    // Caller holds the writer lock. The token is the only await: once it is
    // set, storage and phase follow without yielding.
    async fn apply_user(&self, user: User) {
        self.inner.api.set_token(user.token.clone()).await;
        self.persist(Some(&user));
        self.inner
            .state
            .send_modify(|s| s.phase = AuthPhase::Authenticated(user));
    }

    fn persist(&self, user: Option<&User>) {
        if let Err(e) = self.inner.storage.save(user) {
            tracing::error!("Failed to store user data: {}", e);
        }
    }
}
