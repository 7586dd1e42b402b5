//! Client for the identity service that issues and verifies ceremony
//! challenges.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use passvote_types::{ClientError, Identity, UserId};
use passvote_utils::http;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credential::{AuthenticationResponseJson, RegistrationResponseJson};

// ── Wire types ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterStartRequest {
    pub username: String,
    pub display_name: String,
}

impl RegisterStartRequest {
    /// The display name defaults to the username.
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            display_name: username.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterStartResponse {
    pub registration_id: String,
    #[serde(default)]
    pub public_key_options: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFinishRequest {
    pub username: String,
    pub registration_id: String,
    pub credential: RegistrationResponseJson,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateStartRequest {
    pub username: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthenticateStartResponse {
    pub authentication_id: String,
    #[serde(default)]
    pub public_key_options: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateFinishRequest {
    pub authentication_id: String,
    pub credential: AuthenticationResponseJson,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSuccessResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user_id: UserId,
    pub user_name: String,
    pub token: String,
}

impl std::fmt::Debug for AuthSuccessResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSuccessResponse")
            .field("message", &self.message)
            .field("user_id", &self.user_id)
            .field("user_name", &self.user_name)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ProtectedResponse {
    user_id: UserId,
}

// ── Service trait ───────────────────────────────────────────────────────

/// The identity service endpoints a ceremony needs.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// `POST /auth/register/start`
    async fn register_start(
        &self,
        request: &RegisterStartRequest,
    ) -> Result<RegisterStartResponse, ClientError>;

    /// `POST /auth/register/finish`
    async fn register_finish(&self, request: &RegisterFinishRequest) -> Result<(), ClientError>;

    /// `POST /auth/authenticate/start`
    async fn authenticate_start(
        &self,
        request: &AuthenticateStartRequest,
    ) -> Result<AuthenticateStartResponse, ClientError>;

    /// `POST /auth/authenticate/finish`
    async fn authenticate_finish(
        &self,
        request: &AuthenticateFinishRequest,
    ) -> Result<AuthSuccessResponse, ClientError>;

    /// Re-validate a stored session token. `None` when the token is rejected
    /// or the service cannot be reached.
    async fn resolve_session(&self, token: &str, username: &str) -> Option<Identity>;
}

#[async_trait]
impl<T: IdentityService + ?Sized> IdentityService for Arc<T> {
    async fn register_start(
        &self,
        request: &RegisterStartRequest,
    ) -> Result<RegisterStartResponse, ClientError> {
        (**self).register_start(request).await
    }

    async fn register_finish(&self, request: &RegisterFinishRequest) -> Result<(), ClientError> {
        (**self).register_finish(request).await
    }

    async fn authenticate_start(
        &self,
        request: &AuthenticateStartRequest,
    ) -> Result<AuthenticateStartResponse, ClientError> {
        (**self).authenticate_start(request).await
    }

    async fn authenticate_finish(
        &self,
        request: &AuthenticateFinishRequest,
    ) -> Result<AuthSuccessResponse, ClientError> {
        (**self).authenticate_finish(request).await
    }

    async fn resolve_session(&self, token: &str, username: &str) -> Option<Identity> {
        (**self).resolve_session(token, username).await
    }
}

// ── HTTP implementation ─────────────────────────────────────────────────

/// `reqwest`-backed [`IdentityService`].
#[derive(Clone)]
pub struct HttpIdentityService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIdentityService {
    /// Create a client for the service at `base_url` (e.g. `http://localhost:8080`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeouts(base_url, http::DEFAULT_TIMEOUT, http::DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: http::build_client(timeout, connect_timeout)?,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ClientError> {
        let url = http::join_url(&self.base_url, path);
        debug!(%url, "identity service request");
        let response = http::send(self.http.post(url).json(body)).await?;
        http::ensure_success(response, None).await
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn register_start(
        &self,
        request: &RegisterStartRequest,
    ) -> Result<RegisterStartResponse, ClientError> {
        let response = self.post("/auth/register/start", request).await?;
        http::read_json(response).await
    }

    async fn register_finish(&self, request: &RegisterFinishRequest) -> Result<(), ClientError> {
        self.post("/auth/register/finish", request).await?;
        Ok(())
    }

    async fn authenticate_start(
        &self,
        request: &AuthenticateStartRequest,
    ) -> Result<AuthenticateStartResponse, ClientError> {
        let response = self.post("/auth/authenticate/start", request).await?;
        http::read_json(response).await
    }

    async fn authenticate_finish(
        &self,
        request: &AuthenticateFinishRequest,
    ) -> Result<AuthSuccessResponse, ClientError> {
        let response = self.post("/auth/authenticate/finish", request).await?;
        http::read_json(response).await
    }

    async fn resolve_session(&self, token: &str, username: &str) -> Option<Identity> {
        let url = http::join_url(&self.base_url, "/api/protected/test");
        let response = match http::send(self.http.get(url).bearer_auth(token)).await {
            Ok(response) => response,
            Err(e) => {
                debug!("session re-validation unreachable: {e:?}");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(status = %response.status(), "session token rejected");
            return None;
        }

        match http::read_json::<ProtectedResponse>(response).await {
            Ok(body) => Some(Identity::new(body.user_id, username)),
            Err(e) => {
                debug!("session re-validation returned an unexpected body: {e:?}");
                None
            }
        }
    }
}
