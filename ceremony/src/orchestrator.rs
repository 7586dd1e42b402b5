//! Passkey ceremony state machine.
//!
//! Both ceremonies walk the same path:
//!
//! ```text
//! Idle -> ChallengeRequested -> ChallengeReceived -> PlatformCeremonyInFlight
//!      -> ResponseSubmitted -> Succeeded | Failed
//! ```
//!
//! A challenge is consumed by exactly one [`CeremonyOrchestrator::finish`].
//! There is no automatic retry; the caller starts a new ceremony.

use passvote_session::SessionStore;
use passvote_types::{validate_username, ClientError, Identity};
use tracing::{debug, info, warn};

use crate::authenticator::PlatformAuthenticator;
use crate::credential::{AuthenticationResponseJson, RegistrationResponseJson};
use crate::options::{
    extract_options, CreationOptions, CreationOptionsJson, RequestOptions, RequestOptionsJson,
};
use crate::service::{
    AuthenticateFinishRequest, AuthenticateStartRequest, IdentityService, RegisterFinishRequest,
    RegisterStartRequest,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl std::fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registration => f.write_str("registration"),
            Self::Authentication => f.write_str("authentication"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CeremonyState {
    #[default]
    Idle,
    ChallengeRequested { kind: CeremonyKind },
    ChallengeReceived { kind: CeremonyKind, ceremony_id: String },
    PlatformCeremonyInFlight { kind: CeremonyKind },
    ResponseSubmitted { kind: CeremonyKind },
    Succeeded { kind: CeremonyKind },
    Failed { kind: CeremonyKind, error: ClientError },
}

impl CeremonyState {
    pub fn failure(&self) -> Option<&ClientError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The user-facing message of a failed ceremony.
    pub fn failure_message(&self) -> Option<String> {
        self.failure().map(ToString::to_string)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

/// The identity and bearer token issued by a successful authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub identity: Identity,
    pub token: String,
}

impl std::fmt::Debug for AuthenticatedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedSession")
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CeremonyOutcome {
    Registered { username: String },
    Authenticated(AuthenticatedSession),
}

enum PendingChallenge {
    Registration {
        username: String,
        registration_id: String,
        options: CreationOptions,
    },
    Authentication {
        authentication_id: String,
        options: RequestOptions,
    },
}

impl PendingChallenge {
    fn kind(&self) -> CeremonyKind {
        match self {
            Self::Registration { .. } => CeremonyKind::Registration,
            Self::Authentication { .. } => CeremonyKind::Authentication,
        }
    }
}

/// Drives registration and authentication ceremonies.
pub struct CeremonyOrchestrator<S, A> {
    service: S,
    authenticator: A,
    session: SessionStore,
    state: CeremonyState,
    pending: Option<PendingChallenge>,
}

impl<S: IdentityService, A: PlatformAuthenticator> CeremonyOrchestrator<S, A> {
    pub fn new(service: S, authenticator: A, session: SessionStore) -> Self {
        Self {
            service,
            authenticator,
            session,
            state: CeremonyState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> &CeremonyState {
        &self.state
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn has_pending_challenge(&self) -> bool {
        self.pending.is_some()
    }

    /// Request a registration challenge for `username`.
    pub async fn start_registration(&mut self, username: &str) -> Result<(), ClientError> {
        self.begin(username)?;
        let kind = CeremonyKind::Registration;
        self.transition(CeremonyState::ChallengeRequested { kind });

        let response = match self
            .service
            .register_start(&RegisterStartRequest::new(username))
            .await
        {
            Ok(response) => response,
            Err(e) => return Err(self.fail(kind, e)),
        };

        let options = match extract_options::<CreationOptionsJson>(response.public_key_options)
            .and_then(CreationOptionsJson::decode)
        {
            Ok(options) => options,
            Err(e) => return Err(self.fail(kind, e)),
        };

        self.transition(CeremonyState::ChallengeReceived {
            kind,
            ceremony_id: response.registration_id.clone(),
        });
        self.pending = Some(PendingChallenge::Registration {
            username: username.to_string(),
            registration_id: response.registration_id,
            options,
        });
        Ok(())
    }

    /// Request an authentication challenge for `username`.
    pub async fn start_authentication(&mut self, username: &str) -> Result<(), ClientError> {
        self.begin(username)?;
        let kind = CeremonyKind::Authentication;
        self.transition(CeremonyState::ChallengeRequested { kind });

        let request = AuthenticateStartRequest {
            username: username.to_string(),
        };
        let response = match self.service.authenticate_start(&request).await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(kind, e)),
        };

        let options = match extract_options::<RequestOptionsJson>(response.public_key_options)
            .and_then(RequestOptionsJson::decode)
        {
            Ok(options) => options,
            Err(e) => return Err(self.fail(kind, e)),
        };

        self.transition(CeremonyState::ChallengeReceived {
            kind,
            ceremony_id: response.authentication_id.clone(),
        });
        self.pending = Some(PendingChallenge::Authentication {
            authentication_id: response.authentication_id,
            options,
        });
        Ok(())
    }

    /// Run the platform ceremony on the pending challenge and submit the
    /// credential.
    ///
    /// Without a pending challenge this performs no network call and leaves
    /// the state untouched.
    pub async fn finish(&mut self) -> Result<CeremonyOutcome, ClientError> {
        let Some(pending) = self.pending.take() else {
            return Err(ClientError::ProtocolViolation(
                "no pending ceremony challenge".into(),
            ));
        };
        let kind = pending.kind();
        self.transition(CeremonyState::PlatformCeremonyInFlight { kind });

        let result = match pending {
            PendingChallenge::Registration {
                username,
                registration_id,
                options,
            } => self.finish_registration(username, registration_id, &options).await,
            PendingChallenge::Authentication {
                authentication_id,
                options,
            } => self.finish_authentication(authentication_id, &options).await,
        };

        match result {
            Ok(outcome) => {
                self.transition(CeremonyState::Succeeded { kind });
                match &outcome {
                    CeremonyOutcome::Registered { username } => {
                        info!(%username, "passkey registered")
                    }
                    CeremonyOutcome::Authenticated(session) => {
                        info!(user_id = %session.identity.id, "passkey authentication succeeded")
                    }
                }
                Ok(outcome)
            }
            Err(e) => Err(self.fail(kind, e)),
        }
    }

    /// `start_registration` followed by `finish`.
    pub async fn register(&mut self, username: &str) -> Result<CeremonyOutcome, ClientError> {
        self.start_registration(username).await?;
        self.finish().await
    }

    /// `start_authentication` followed by `finish`.
    pub async fn authenticate(
        &mut self,
        username: &str,
    ) -> Result<AuthenticatedSession, ClientError> {
        self.start_authentication(username).await?;
        match self.finish().await? {
            CeremonyOutcome::Authenticated(session) => Ok(session),
            CeremonyOutcome::Registered { .. } => Err(ClientError::ProtocolViolation(
                "authentication finished as a registration".into(),
            )),
        }
    }

    async fn finish_registration(
        &mut self,
        username: String,
        registration_id: String,
        options: &CreationOptions,
    ) -> Result<CeremonyOutcome, ClientError> {
        let credential = self
            .authenticator
            .create(options)
            .await?
            .ok_or(ClientError::CeremonyCancelled)?;

        let request = RegisterFinishRequest {
            username: username.clone(),
            registration_id,
            credential: RegistrationResponseJson::from(&credential),
        };
        self.transition(CeremonyState::ResponseSubmitted {
            kind: CeremonyKind::Registration,
        });
        self.service.register_finish(&request).await?;
        Ok(CeremonyOutcome::Registered { username })
    }

    async fn finish_authentication(
        &mut self,
        authentication_id: String,
        options: &RequestOptions,
    ) -> Result<CeremonyOutcome, ClientError> {
        let credential = self
            .authenticator
            .get(options)
            .await?
            .ok_or(ClientError::CeremonyCancelled)?;

        let request = AuthenticateFinishRequest {
            authentication_id,
            credential: AuthenticationResponseJson::from(&credential),
        };
        self.transition(CeremonyState::ResponseSubmitted {
            kind: CeremonyKind::Authentication,
        });
        let success = self.service.authenticate_finish(&request).await?;

        let identity = Identity::new(success.user_id, success.user_name);
        self.session.set_identity(Some(identity.clone()));
        Ok(CeremonyOutcome::Authenticated(AuthenticatedSession {
            identity,
            token: success.token,
        }))
    }

    /// Drop any earlier challenge, then check `username`. A rejected start
    /// leaves nothing to finish.
    fn begin(&mut self, username: &str) -> Result<(), ClientError> {
        if self.pending.take().is_some() {
            debug!("discarding unfinished ceremony challenge");
        }
        self.transition(CeremonyState::Idle);
        validate_username(username)
    }

    fn transition(&mut self, next: CeremonyState) {
        debug!(from = ?self.state, to = ?next, "ceremony transition");
        self.state = next;
    }

    fn fail(&mut self, kind: CeremonyKind, error: ClientError) -> ClientError {
        self.pending = None;
        warn!(%kind, "ceremony failed: {error}");
        self.transition(CeremonyState::Failed {
            kind,
            error: error.clone(),
        });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_is_the_error_display() {
        let state = CeremonyState::Failed {
            kind: CeremonyKind::Registration,
            error: ClientError::service(400, "Username already taken"),
        };
        assert_eq!(state.failure_message().as_deref(), Some("Username already taken"));
        assert!(state.is_terminal());
        assert!(!CeremonyState::Idle.is_terminal());
    }

    #[test]
    fn session_debug_redacts_token() {
        let session = AuthenticatedSession {
            identity: Identity::new("u-1", "alice"),
            token: "secret-token".into(),
        };
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
