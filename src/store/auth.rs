use crate::models::{Credentials, SignupData, User};
use crate::store::{AppStore, RequestState, RequestStatus};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    user: Option<User>,
    access_token: Option<String>,
    request: RequestState,
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn loading(&self) -> bool {
        self.request.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.request.error()
    }
}

impl AppStore {
    pub async fn signup(&mut self, data: &SignupData) -> RequestStatus {
        let ticket = self.auth.request.begin();
        let result = self.backend.signup(data).await;
        let (status, user) = self.auth.request.settle(ticket, result, "Signup failed");
        if let Some(user) = user {
            info!(username = %user.username, "signed up");
            self.auth.user = Some(user);
        }
        status
    }

    pub async fn login(&mut self, credentials: &Credentials) -> RequestStatus {
        let ticket = self.auth.request.begin();
        let result = self.backend.login(credentials).await;
        let (status, token) = self.auth.request.settle(ticket, result, "Login failed");
        if let Some(token) = token {
            if let Err(err) = self.tokens.save(&token) {
                warn!(error = %err, "could not persist access token");
            }
            self.backend.set_access_token(Some(token.clone()));
            self.auth.access_token = Some(token);
            info!("logged in");
        }
        status
    }

    /// Forgets the session, in memory and on disk.
    pub fn logout(&mut self) {
        self.auth.user = None;
        self.auth.access_token = None;
        self.auth.request.reset();
        self.backend.set_access_token(None);
        if let Err(err) = self.tokens.clear() {
            warn!(error = %err, "could not remove stored access token");
        }
    }

    /// Reloads the token from persistent storage.
    pub fn reset_access_token(&mut self) -> Option<&str> {
        self.auth.access_token = self.tokens.load();
        self.backend.set_access_token(self.auth.access_token.clone());
        self.auth.access_token.as_deref()
    }
}
