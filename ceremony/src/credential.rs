//! Credentials produced by the platform and their wire responses.

use serde::{Deserialize, Serialize};

use crate::codec;

/// The only credential type defined for public-key ceremonies.
pub const PUBLIC_KEY_TYPE: &str = "public-key";

/// Result of a platform `create` (registration).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
}

/// Result of a platform `get` (authentication).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssertionCredential {
    pub id: String,
    pub raw_id: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationResponseJson {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    #[serde(rename = "attestationObject")]
    pub attestation_object: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionResponseJson {
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub signature: String,
    #[serde(rename = "userHandle", default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

/// `RegistrationResponseJSON` / `AuthenticationResponseJSON`, generic over
/// the ceremony-specific `response` object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialResponseJson<R> {
    pub id: String,
    pub raw_id: String,
    pub response: R,
    #[serde(rename = "type")]
    pub kind: String,
    pub client_extension_results: serde_json::Map<String, serde_json::Value>,
}

pub type RegistrationResponseJson = CredentialResponseJson<AttestationResponseJson>;
pub type AuthenticationResponseJson = CredentialResponseJson<AssertionResponseJson>;

impl<R> CredentialResponseJson<R> {
    fn public_key(id: &str, raw_id: &[u8], response: R) -> Self {
        Self {
            id: id.to_string(),
            raw_id: codec::encode(raw_id),
            response,
            kind: PUBLIC_KEY_TYPE.to_string(),
            client_extension_results: serde_json::Map::new(),
        }
    }
}

impl From<&AttestationCredential> for RegistrationResponseJson {
    fn from(credential: &AttestationCredential) -> Self {
        Self::public_key(
            &credential.id,
            &credential.raw_id,
            AttestationResponseJson {
                client_data_json: codec::encode(&credential.client_data_json),
                attestation_object: codec::encode(&credential.attestation_object),
            },
        )
    }
}

impl From<&AssertionCredential> for AuthenticationResponseJson {
    fn from(credential: &AssertionCredential) -> Self {
        Self::public_key(
            &credential.id,
            &credential.raw_id,
            AssertionResponseJson {
                authenticator_data: codec::encode(&credential.authenticator_data),
                client_data_json: codec::encode(&credential.client_data_json),
                signature: codec::encode(&credential.signature),
                user_handle: credential.user_handle.as_deref().map(codec::encode),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registration_response_wire_shape() {
        let credential = AttestationCredential {
            id: "cred-1".into(),
            raw_id: vec![1, 2, 3],
            client_data_json: b"{}".to_vec(),
            attestation_object: vec![0xfb, 0xff],
        };
        let wire = serde_json::to_value(RegistrationResponseJson::from(&credential)).unwrap();
        assert_eq!(
            wire,
            json!({
                "id": "cred-1",
                "rawId": "AQID",
                "response": { "clientDataJSON": "e30", "attestationObject": "-_8" },
                "type": "public-key",
                "clientExtensionResults": {}
            })
        );
    }

    #[test]
    fn authentication_response_omits_absent_user_handle() {
        let credential = AssertionCredential {
            id: "cred-1".into(),
            raw_id: vec![1, 2, 3],
            client_data_json: b"{}".to_vec(),
            authenticator_data: vec![9],
            signature: vec![7, 7],
            user_handle: None,
        };
        let wire = serde_json::to_value(AuthenticationResponseJson::from(&credential)).unwrap();
        assert!(wire["response"].get("userHandle").is_none());
        assert_eq!(wire["response"]["signature"], "Bwc");
        assert_eq!(wire["type"], "public-key");

        let with_handle = AssertionCredential {
            user_handle: Some(b"user-1".to_vec()),
            ..credential
        };
        let wire = serde_json::to_value(AuthenticationResponseJson::from(&with_handle)).unwrap();
        assert_eq!(wire["response"]["userHandle"], "dXNlci0x");
    }
}
