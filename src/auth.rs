use crate::api::{transport_error, ApiEndpoint};
use crate::error::{
    ErrorBody, VocablyError, MSG_INVALID_CREDENTIALS, MSG_LOGIN_FAILED, MSG_LOGIN_UNREACHABLE,
    MSG_MISSING_CREDENTIALS, MSG_SERVER_STARTING,
};
use crate::session::SessionStore;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cold-starting backends can take a long time to answer the first request.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
}

/// Exchanges credentials for a bearer token and tracks the login status.
pub struct AuthClient {
    endpoint: ApiEndpoint,
    store: SessionStore,
    login_timeout: Duration,
    is_authenticated: bool,
    is_logging_in: bool,
    error: Option<VocablyError>,
}

impl AuthClient {
    pub fn new(endpoint: ApiEndpoint, store: SessionStore) -> Self {
        let is_authenticated = store.is_present();
        Self {
            endpoint,
            store,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            is_authenticated,
            is_logging_in: false,
            error: None,
        }
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn is_logging_in(&self) -> bool {
        self.is_logging_in
    }

    pub fn error(&self) -> Option<&VocablyError> {
        self.error.as_ref()
    }

    pub fn token(&self) -> Option<String> {
        self.store.get()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), VocablyError> {
        let username = username.trim();
        if username.is_empty() || password.trim().is_empty() {
            let err = VocablyError::Validation(MSG_MISSING_CREDENTIALS.to_string());
            self.error = Some(err.clone());
            return Err(err);
        }

        self.is_logging_in = true;
        self.error = None;
        let result = self.send_login(username, password).await;
        self.is_logging_in = false;

        match result {
            Ok(token) => {
                self.store.set(&token);
                self.is_authenticated = true;
                info!(username, "login succeeded");
                Ok(())
            }
            Err(e) => {
                warn!(username, "login failed: {}", e);
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn send_login(&self, username: &str, password: &str) -> Result<String, VocablyError> {
        let url = self.endpoint.url("/login");
        debug!("sending login request to {}", url);

        let response = self
            .endpoint
            .http()
            .post(&url)
            .timeout(self.login_timeout)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(login_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = ErrorBody::read(response)
                .await
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| MSG_INVALID_CREDENTIALS.to_string());
            return Err(VocablyError::Auth(detail));
        }

        let body: LoginResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                login_transport_error(e)
            } else {
                warn!("malformed login response: {}", e);
                VocablyError::Auth(MSG_LOGIN_FAILED.to_string())
            }
        })?;
        if body.access_token.is_empty() {
            return Err(VocablyError::Auth(MSG_LOGIN_FAILED.to_string()));
        }
        Ok(body.access_token)
    }

    pub fn logout(&mut self) {
        self.store.clear();
        self.is_authenticated = false;
        self.error = None;
        debug!("session cleared");
    }
}

fn login_transport_error(e: reqwest::Error) -> VocablyError {
    transport_error(
        e,
        MSG_LOGIN_UNREACHABLE,
        MSG_SERVER_STARTING,
        MSG_LOGIN_FAILED,
    )
}
