//! Nullable platform authenticator.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use passvote_ceremony::{
    AssertionCredential, AttestationCredential, CreationOptions, PlatformAuthenticator,
    PlatformError, RequestOptions,
};

type CreateResult = Result<Option<AttestationCredential>, PlatformError>;
type GetResult = Result<Option<AssertionCredential>, PlatformError>;

/// A platform authenticator that returns canned credentials.
///
/// Scripted results are consumed in order; once they run out every call
/// succeeds with [`NullAuthenticator::attestation`] /
/// [`NullAuthenticator::assertion`].
#[derive(Default)]
pub struct NullAuthenticator {
    create_results: Mutex<VecDeque<CreateResult>>,
    get_results: Mutex<VecDeque<GetResult>>,
    create_calls: Mutex<Vec<CreationOptions>>,
    get_calls: Mutex<Vec<RequestOptions>>,
}

impl NullAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `create`.
    pub fn script_create(&self, result: CreateResult) {
        self.create_results.lock().unwrap().push_back(result);
    }

    /// Queue the result of the next `get`.
    pub fn script_get(&self, result: GetResult) {
        self.get_results.lock().unwrap().push_back(result);
    }

    /// Make the next ceremony of either kind fail with `error`.
    pub fn fail_next(&self, error: PlatformError) {
        self.script_create(Err(error.clone()));
        self.script_get(Err(error));
    }

    pub fn create_calls(&self) -> Vec<CreationOptions> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn get_calls(&self) -> Vec<RequestOptions> {
        self.get_calls.lock().unwrap().clone()
    }

    pub fn attestation() -> AttestationCredential {
        AttestationCredential {
            id: "bnVsbC1jcmVk".into(),
            raw_id: b"null-cred".to_vec(),
            client_data_json: br#"{"type":"webauthn.create"}"#.to_vec(),
            attestation_object: vec![0xa3, 0x63, 0x66, 0x6d, 0x74],
        }
    }

    pub fn assertion() -> AssertionCredential {
        AssertionCredential {
            id: "bnVsbC1jcmVk".into(),
            raw_id: b"null-cred".to_vec(),
            client_data_json: br#"{"type":"webauthn.get"}"#.to_vec(),
            authenticator_data: vec![0x49, 0x96, 0x0d, 0xe5],
            signature: vec![0x30, 0x45, 0x02, 0x21],
            user_handle: Some(b"user-1".to_vec()),
        }
    }
}

#[async_trait]
impl PlatformAuthenticator for NullAuthenticator {
    async fn create(&self, options: &CreationOptions) -> CreateResult {
        self.create_calls.lock().unwrap().push(options.clone());
        self.create_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Some(Self::attestation())))
    }

    async fn get(&self, options: &RequestOptions) -> GetResult {
        self.get_calls.lock().unwrap().push(options.clone());
        self.get_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Some(Self::assertion())))
    }
}
