//! Nullable identity service.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use passvote_ceremony::{
    AuthSuccessResponse, AuthenticateFinishRequest, AuthenticateStartRequest,
    AuthenticateStartResponse, IdentityService, RegisterFinishRequest, RegisterStartRequest,
    RegisterStartResponse,
};
use passvote_types::{ClientError, Identity, UserId};
use serde_json::json;

/// One recorded call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityCall {
    RegisterStart(RegisterStartRequest),
    RegisterFinish(RegisterFinishRequest),
    AuthenticateStart(AuthenticateStartRequest),
    AuthenticateFinish(AuthenticateFinishRequest),
    ResolveSession { token: String },
}

impl IdentityCall {
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::RegisterFinish(_) | Self::AuthenticateFinish(_))
    }
}

/// An identity service with configurable answers.
///
/// Defaults describe a healthy service: start calls return well-formed
/// options, finish calls succeed and authentication signs in `user-1`.
pub struct NullIdentityService {
    register_start: Mutex<Result<RegisterStartResponse, ClientError>>,
    register_finish: Mutex<Result<(), ClientError>>,
    authenticate_start: Mutex<Result<AuthenticateStartResponse, ClientError>>,
    authenticate_finish: Mutex<Result<AuthSuccessResponse, ClientError>>,
    sessions: Mutex<HashMap<String, UserId>>,
    calls: Mutex<Vec<IdentityCall>>,
}

impl Default for NullIdentityService {
    fn default() -> Self {
        Self::new()
    }
}

impl NullIdentityService {
    pub fn new() -> Self {
        Self {
            register_start: Mutex::new(Ok(RegisterStartResponse {
                registration_id: "reg-1".into(),
                public_key_options: Some(Self::creation_options()),
            })),
            register_finish: Mutex::new(Ok(())),
            authenticate_start: Mutex::new(Ok(AuthenticateStartResponse {
                authentication_id: "auth-1".into(),
                public_key_options: Some(Self::request_options()),
            })),
            authenticate_finish: Mutex::new(Ok(AuthSuccessResponse {
                message: Some("Authentication successful".into()),
                user_id: "user-1".into(),
                user_name: "alice".into(),
                token: "token-1".into(),
            })),
            sessions: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Registration options wrapped the way the service sends them.
    pub fn creation_options() -> serde_json::Value {
        json!({
            "publicKey": {
                "rp": { "id": "localhost", "name": "Polls" },
                "user": { "id": "dXNlci0x", "name": "alice", "displayName": "alice" },
                "challenge": "Y2hhbGxlbmdlLXJlZw",
                "pubKeyCredParams": [{ "type": "public-key", "alg": -7 }],
                "timeout": 60000,
                "excludeCredentials": [{ "type": "public-key", "id": "b2xkLWNyZWQ" }]
            }
        })
    }

    pub fn request_options() -> serde_json::Value {
        json!({
            "publicKey": {
                "challenge": "Y2hhbGxlbmdlLWF1dGg",
                "rpId": "localhost",
                "allowCredentials": [{ "type": "public-key", "id": "bnVsbC1jcmVk" }],
                "userVerification": "preferred"
            }
        })
    }

    pub fn set_register_start(&self, result: Result<RegisterStartResponse, ClientError>) {
        *self.register_start.lock().unwrap() = result;
    }

    pub fn set_register_finish(&self, result: Result<(), ClientError>) {
        *self.register_finish.lock().unwrap() = result;
    }

    pub fn set_authenticate_start(&self, result: Result<AuthenticateStartResponse, ClientError>) {
        *self.authenticate_start.lock().unwrap() = result;
    }

    pub fn set_authenticate_finish(&self, result: Result<AuthSuccessResponse, ClientError>) {
        *self.authenticate_finish.lock().unwrap() = result;
    }

    /// Accept `token` as a live session of `user_id`.
    pub fn add_session(&self, token: impl Into<String>, user_id: impl Into<UserId>) {
        self.sessions
            .lock()
            .unwrap()
            .insert(token.into(), user_id.into());
    }

    pub fn calls(&self) -> Vec<IdentityCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn finish_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.is_finish())
            .count()
    }

    fn record(&self, call: IdentityCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityService for NullIdentityService {
    async fn register_start(
        &self,
        request: &RegisterStartRequest,
    ) -> Result<RegisterStartResponse, ClientError> {
        self.record(IdentityCall::RegisterStart(request.clone()));
        self.register_start.lock().unwrap().clone()
    }

    async fn register_finish(&self, request: &RegisterFinishRequest) -> Result<(), ClientError> {
        self.record(IdentityCall::RegisterFinish(request.clone()));
        self.register_finish.lock().unwrap().clone()
    }

    async fn authenticate_start(
        &self,
        request: &AuthenticateStartRequest,
    ) -> Result<AuthenticateStartResponse, ClientError> {
        self.record(IdentityCall::AuthenticateStart(request.clone()));
        self.authenticate_start.lock().unwrap().clone()
    }

    async fn authenticate_finish(
        &self,
        request: &AuthenticateFinishRequest,
    ) -> Result<AuthSuccessResponse, ClientError> {
        self.record(IdentityCall::AuthenticateFinish(request.clone()));
        self.authenticate_finish.lock().unwrap().clone()
    }

    async fn resolve_session(&self, token: &str, username: &str) -> Option<Identity> {
        self.record(IdentityCall::ResolveSession {
            token: token.to_string(),
        });
        self.sessions
            .lock()
            .unwrap()
            .get(token)
            .map(|user_id| Identity::new(user_id.clone(), username))
    }
}
