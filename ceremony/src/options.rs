//! Ceremony options: the JSON the identity service sends and the decoded
//! form handed to the platform authenticator.

use passvote_types::ClientError;
use serde::{Deserialize, Serialize};

use crate::codec;

/// Relying party as named in creation options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

/// An acceptable credential algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialParameter {
    #[serde(rename = "type")]
    pub kind: String,
    pub alg: i64,
}

/// Wire form of a credential descriptor (`excludeCredentials` / `allowCredentials`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptorJson {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntityJson {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

/// `PublicKeyCredentialCreationOptionsJSON`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOptionsJson {
    pub rp: RelyingParty,
    pub user: UserEntityJson,
    pub challenge: String,
    #[serde(default)]
    pub pub_key_cred_params: Vec<CredentialParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_credentials: Option<Vec<CredentialDescriptorJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

/// `PublicKeyCredentialRequestOptionsJSON`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptionsJson {
    pub challenge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<CredentialDescriptorJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

/// A credential descriptor with its id decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialDescriptor {
    pub kind: String,
    pub id: Vec<u8>,
    pub transports: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserEntity {
    /// The user handle.
    pub id: Vec<u8>,
    pub name: String,
    pub display_name: String,
}

/// Options for creating a credential, ready for the platform authenticator.
#[derive(Clone, Debug, PartialEq)]
pub struct CreationOptions {
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub challenge: Vec<u8>,
    pub pub_key_cred_params: Vec<CredentialParameter>,
    /// Milliseconds.
    pub timeout: Option<u64>,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: Option<serde_json::Value>,
    pub attestation: Option<String>,
    pub extensions: Option<serde_json::Value>,
}

/// Options for retrieving an assertion, ready for the platform authenticator.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    pub challenge: Vec<u8>,
    /// Milliseconds.
    pub timeout: Option<u64>,
    pub rp_id: Option<String>,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: Option<String>,
    pub extensions: Option<serde_json::Value>,
}

fn decode_field(field: &str, text: &str) -> Result<Vec<u8>, ClientError> {
    codec::decode(text).map_err(|e| ClientError::ProtocolViolation(format!("{field}: {e}")))
}

fn decode_descriptors(
    field: &str,
    descriptors: Option<Vec<CredentialDescriptorJson>>,
) -> Result<Vec<CredentialDescriptor>, ClientError> {
    descriptors
        .unwrap_or_default()
        .into_iter()
        .map(|d| {
            Ok(CredentialDescriptor {
                id: decode_field(field, &d.id)?,
                kind: d.kind,
                transports: d.transports.unwrap_or_default(),
            })
        })
        .collect()
}

impl CreationOptionsJson {
    pub fn decode(self) -> Result<CreationOptions, ClientError> {
        Ok(CreationOptions {
            challenge: decode_field("challenge", &self.challenge)?,
            user: UserEntity {
                id: decode_field("user.id", &self.user.id)?,
                name: self.user.name,
                display_name: self.user.display_name,
            },
            exclude_credentials: decode_descriptors("excludeCredentials", self.exclude_credentials)?,
            rp: self.rp,
            pub_key_cred_params: self.pub_key_cred_params,
            timeout: self.timeout,
            authenticator_selection: self.authenticator_selection,
            attestation: self.attestation,
            extensions: self.extensions,
        })
    }
}

impl RequestOptionsJson {
    pub fn decode(self) -> Result<RequestOptions, ClientError> {
        Ok(RequestOptions {
            challenge: decode_field("challenge", &self.challenge)?,
            allow_credentials: decode_descriptors("allowCredentials", self.allow_credentials)?,
            timeout: self.timeout,
            rp_id: self.rp_id,
            user_verification: self.user_verification,
            extensions: self.extensions,
        })
    }
}

/// Pull the typed options out of a start response's `public_key_options`.
///
/// The service may wrap them as `{"publicKey": {...}}` or send them bare.
/// A missing payload or one of the wrong shape is a protocol violation.
pub fn extract_options<T: serde::de::DeserializeOwned>(
    public_key_options: Option<serde_json::Value>,
) -> Result<T, ClientError> {
    let value = match public_key_options {
        Some(serde_json::Value::Null) | None => {
            return Err(ClientError::ProtocolViolation(
                "No public_key_options received from server".into(),
            ))
        }
        Some(value) => value,
    };

    let inner = match value {
        serde_json::Value::Object(mut map) if map.contains_key("publicKey") => map
            .remove("publicKey")
            .unwrap_or(serde_json::Value::Null),
        other => other,
    };

    serde_json::from_value(inner)
        .map_err(|e| ClientError::ProtocolViolation(format!("malformed public_key_options: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn creation_json() -> serde_json::Value {
        json!({
            "rp": { "id": "localhost", "name": "Polls" },
            "user": { "id": "dXNlci0x", "name": "alice", "displayName": "alice" },
            "challenge": "Y2hhbGxlbmdl",
            "pubKeyCredParams": [{ "type": "public-key", "alg": -7 }],
            "timeout": 60000,
            "excludeCredentials": [{ "type": "public-key", "id": "AQID" }],
            "attestation": "none"
        })
    }

    #[test]
    fn wrapped_creation_options_decode() {
        let opts: CreationOptionsJson =
            extract_options(Some(json!({ "publicKey": creation_json() }))).unwrap();
        let decoded = opts.decode().unwrap();
        assert_eq!(decoded.challenge, b"challenge");
        assert_eq!(decoded.user.id, b"user-1");
        assert_eq!(decoded.exclude_credentials[0].id, vec![1, 2, 3]);
        assert_eq!(decoded.pub_key_cred_params[0].alg, -7);
        assert_eq!(decoded.timeout, Some(60000));
    }

    #[test]
    fn bare_request_options_decode() {
        let opts: RequestOptionsJson = extract_options(Some(json!({
            "challenge": "Y2hhbGxlbmdl",
            "rpId": "localhost",
            "allowCredentials": [{ "type": "public-key", "id": "AQID", "transports": ["internal"] }],
            "userVerification": "preferred"
        })))
        .unwrap();
        let decoded = opts.decode().unwrap();
        assert_eq!(decoded.challenge, b"challenge");
        assert_eq!(decoded.allow_credentials[0].transports, vec!["internal".to_string()]);
        assert_eq!(decoded.rp_id.as_deref(), Some("localhost"));
    }

    #[test]
    fn missing_options_is_protocol_violation() {
        let err = extract_options::<RequestOptionsJson>(None).unwrap_err();
        assert!(matches!(err, ClientError::ProtocolViolation(_)));
        let err = extract_options::<RequestOptionsJson>(Some(serde_json::Value::Null)).unwrap_err();
        assert!(matches!(err, ClientError::ProtocolViolation(_)));
    }

    #[test]
    fn wrong_shape_is_protocol_violation() {
        let err = extract_options::<CreationOptionsJson>(Some(json!({ "publicKey": { "foo": 1 } })))
            .unwrap_err();
        assert!(matches!(err, ClientError::ProtocolViolation(_)));
    }

    #[test]
    fn undecodable_challenge_is_protocol_violation() {
        let mut raw = creation_json();
        raw["challenge"] = json!("!!!");
        let opts: CreationOptionsJson = extract_options(Some(raw)).unwrap();
        assert!(matches!(opts.decode(), Err(ClientError::ProtocolViolation(_))));
    }
}
