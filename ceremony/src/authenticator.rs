//! The platform credential capability.
//!
//! Signing happens inside the platform authenticator; this crate only hands
//! it decoded options and reads back the credential it produced.

use std::sync::Arc;

use async_trait::async_trait;
use passvote_types::ClientError;
use thiserror::Error;

use crate::credential::{AssertionCredential, AttestationCredential};
use crate::options::{CreationOptions, RequestOptions};

/// Rejections reported by a platform authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The user dismissed or refused the prompt.
    #[error("the operation was not allowed by the user or the platform")]
    NotAllowed,

    #[error("the operation was cancelled")]
    Cancelled,

    #[error("the operation timed out")]
    TimedOut,

    /// e.g. the credential is already registered on this authenticator.
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Other(String),
}

impl PlatformError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::NotAllowed | Self::Cancelled | Self::TimedOut)
    }
}

impl From<PlatformError> for ClientError {
    fn from(e: PlatformError) -> Self {
        if e.is_cancellation() {
            ClientError::CeremonyCancelled
        } else {
            ClientError::Platform(e.to_string())
        }
    }
}

/// Create (registration) or retrieve (authentication) a public-key credential.
///
/// `Ok(None)` means the platform returned no credential, which callers treat
/// as a cancellation.
#[async_trait]
pub trait PlatformAuthenticator: Send + Sync {
    async fn create(
        &self,
        options: &CreationOptions,
    ) -> Result<Option<AttestationCredential>, PlatformError>;

    async fn get(
        &self,
        options: &RequestOptions,
    ) -> Result<Option<AssertionCredential>, PlatformError>;
}

#[async_trait]
impl<T: PlatformAuthenticator + ?Sized> PlatformAuthenticator for Arc<T> {
    async fn create(
        &self,
        options: &CreationOptions,
    ) -> Result<Option<AttestationCredential>, PlatformError> {
        (**self).create(options).await
    }

    async fn get(
        &self,
        options: &RequestOptions,
    ) -> Result<Option<AssertionCredential>, PlatformError> {
        (**self).get(options).await
    }
}
