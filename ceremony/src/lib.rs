//! Passkey registration and authentication against a remote identity
//! service.
//!
//! The [`CeremonyOrchestrator`] fetches a challenge from the
//! [`IdentityService`], decodes it with the [`codec`], hands it to a
//! [`PlatformAuthenticator`] and submits the encoded credential back.

pub mod authenticator;
pub mod codec;
pub mod credential;
pub mod options;
pub mod orchestrator;
pub mod service;

pub use authenticator::{PlatformAuthenticator, PlatformError};
pub use codec::CodecError;
pub use credential::{
    AssertionCredential, AttestationCredential, AuthenticationResponseJson,
    RegistrationResponseJson,
};
pub use options::{CreationOptions, CredentialDescriptor, RequestOptions, UserEntity};
pub use orchestrator::{
    AuthenticatedSession, CeremonyKind, CeremonyOrchestrator, CeremonyOutcome, CeremonyState,
};
pub use service::{
    AuthSuccessResponse, AuthenticateFinishRequest, AuthenticateStartRequest,
    AuthenticateStartResponse, HttpIdentityService, IdentityService, RegisterFinishRequest,
    RegisterStartRequest, RegisterStartResponse,
};
