// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Credential Endpoint messages: the Credential Request, the Credential
//! Response and the Notification Request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{reject, ErrorCode},
    jws::{JsonObject, JwkPublic},
    metadata::ResponseEncryptionMetadata,
    proof::Proofs,
    Error, Result,
};

/// Selects the credential a Credential Request is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSelector {
    /// A `credential_identifier` from the Token Response.
    Identifier(String),
    /// A key of `credential_configurations_supported`.
    ConfigurationId(String),
}

/// A Credential Request.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRequest {
    /// Which credential is requested.
    pub credential: CredentialSelector,
    /// Key proofs, one per requested credential instance.
    pub proofs: Proofs,
    /// Parameters for encrypting the Credential Response.
    pub credential_response_encryption: Option<CredentialResponseEncryption>,
    /// Unknown members.
    pub additional: JsonObject,
}

/// Parameters for encrypting the Credential Response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialResponseEncryption {
    /// The public key the response is encrypted to.
    pub jwk: JwkPublic,
    /// JWE `alg`, taken from the `jwk` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// JWE `enc`.
    pub enc: String,
    /// JWE `zip`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

#[derive(Deserialize)]
struct CredentialRequestWire {
    credential_identifier: Option<String>,
    credential_configuration_id: Option<String>,
    proof: Option<JsonObject>,
    proofs: Option<JsonObject>,
    credential_response_encryption: Option<CredentialResponseEncryption>,
    #[serde(flatten)]
    additional: JsonObject,
}

#[derive(Serialize)]
struct CredentialRequestOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    credential_identifier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credential_configuration_id: Option<&'a str>,
    proofs: &'a Proofs,
    #[serde(skip_serializing_if = "Option::is_none")]
    credential_response_encryption: Option<&'a CredentialResponseEncryption>,
    #[serde(flatten)]
    additional: &'a JsonObject,
}

impl CredentialRequest {
    /// Parses and validates a Credential Request body.
    ///
    /// Exactly one of `credential_identifier` and
    /// `credential_configuration_id` must be present
    /// ([`ErrorCode::InvalidCredentialRequest`]), and exactly one of `proof`
    /// and `proofs` ([`ErrorCode::InvalidProof`]).
    pub fn from_json(body: &str) -> Result<Self> {
        let wire: CredentialRequestWire = serde_json::from_str(body).or_else(|error| {
            reject(
                ErrorCode::InvalidCredentialRequest,
                format!("malformed credential request: {error}"),
            )
        })?;

        Self::from_wire(wire)
    }

    /// Parses and validates an already decoded Credential Request body.
    pub fn from_value(body: Value) -> Result<Self> {
        let wire: CredentialRequestWire = serde_json::from_value(body).or_else(|error| {
            reject(
                ErrorCode::InvalidCredentialRequest,
                format!("malformed credential request: {error}"),
            )
        })?;

        Self::from_wire(wire)
    }

    fn from_wire(wire: CredentialRequestWire) -> Result<Self> {
        let credential = match (wire.credential_identifier, wire.credential_configuration_id) {
            (Some(identifier), None) => CredentialSelector::Identifier(identifier),
            (None, Some(configuration_id)) => CredentialSelector::ConfigurationId(configuration_id),
            (Some(_), Some(_)) => {
                return reject(
                    ErrorCode::InvalidCredentialRequest,
                    "credential_identifier and credential_configuration_id are mutually exclusive",
                )
            }
            (None, None) => {
                return reject(
                    ErrorCode::InvalidCredentialRequest,
                    "one of credential_identifier or credential_configuration_id is required",
                )
            }
        };

        let proofs = match (wire.proof, wire.proofs) {
            (Some(proof), None) => Proofs::from_single(proof)?,
            (None, Some(proofs)) => Proofs::from_batch(proofs)?,
            (Some(_), Some(_)) => {
                return reject(
                    ErrorCode::InvalidProof,
                    "proof and proofs must not both be present",
                )
            }
            (None, None) => return reject(ErrorCode::InvalidProof, "proof or proofs is required"),
        };

        if let Some(encryption) = &wire.credential_response_encryption {
            encryption.validate()?;
        }

        Ok(Self {
            credential,
            proofs,
            credential_response_encryption: wire.credential_response_encryption,
            additional: wire.additional,
        })
    }

    /// Fails with [`ErrorCode::InvalidEncryptionParameters`] when `required`
    /// but no encryption parameters were sent.
    pub fn require_encryption(&self, required: bool) -> Result<()> {
        if required && self.credential_response_encryption.is_none() {
            return reject(
                ErrorCode::InvalidEncryptionParameters,
                "credential_response_encryption is required",
            );
        }

        Ok(())
    }
}

impl Serialize for CredentialRequest {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let (credential_identifier, credential_configuration_id) = match &self.credential {
            CredentialSelector::Identifier(identifier) => (Some(identifier.as_str()), None),
            CredentialSelector::ConfigurationId(id) => (None, Some(id.as_str())),
        };

        CredentialRequestOut {
            credential_identifier,
            credential_configuration_id,
            proofs: &self.proofs,
            credential_response_encryption: self.credential_response_encryption.as_ref(),
            additional: &self.additional,
        }
        .serialize(serializer)
    }
}

impl CredentialResponseEncryption {
    /// Checks that the key is public and `enc` is present.
    pub fn validate(&self) -> Result<()> {
        if self.jwk.contains_key("d") {
            return reject(
                ErrorCode::InvalidEncryptionParameters,
                "jwk must not contain a private key",
            );
        }
        if !self.jwk.get("kty").is_some_and(Value::is_string) {
            return reject(
                ErrorCode::InvalidEncryptionParameters,
                "kty not found in jwk",
            );
        }
        if self.enc.is_empty() {
            return reject(ErrorCode::InvalidEncryptionParameters, "enc must not be empty");
        }

        Ok(())
    }

    /// The JWE `alg`, falling back to the `alg` of the `jwk`.
    pub fn algorithm(&self) -> Option<&str> {
        self.alg
            .as_deref()
            .or_else(|| self.jwk.get("alg").and_then(Value::as_str))
    }

    /// Checks `alg` and `enc` against what the issuer supports.
    pub fn check_supported(&self, supported: &ResponseEncryptionMetadata) -> Result<()> {
        match self.algorithm() {
            Some(alg) if supported.alg_values_supported.iter().any(|value| value == alg) => {}
            Some(alg) => {
                return reject(
                    ErrorCode::InvalidEncryptionParameters,
                    format!("encryption alg '{alg}' is not supported"),
                )
            }
            None => {
                return reject(
                    ErrorCode::InvalidEncryptionParameters,
                    "encryption alg is missing",
                )
            }
        }

        if !supported.enc_values_supported.contains(&self.enc) {
            return reject(
                ErrorCode::InvalidEncryptionParameters,
                format!("encryption enc '{}' is not supported", self.enc),
            );
        }

        Ok(())
    }
}

/// A Credential Response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CredentialResponseWire", into = "CredentialResponseWire")]
pub struct CredentialResponse {
    /// Whether the credentials were issued right away.
    pub outcome: CredentialOutcome,
    /// A fresh `c_nonce` for the next request.
    pub c_nonce: Option<String>,
    /// Lifetime of the `c_nonce`, in seconds.
    pub c_nonce_expires_in: Option<u64>,
}

/// The outcome of a Credential Request.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialOutcome {
    /// The credentials were issued.
    Issued {
        /// One credential per proof.
        credentials: Vec<IssuedCredential>,
        /// Identifies the issuance in Notification Requests.
        notification_id: Option<String>,
    },
    /// Issuance is deferred.
    Deferred {
        /// Identifies the deferred issuance.
        transaction_id: String,
        /// Seconds to wait before polling the Deferred Credential Endpoint.
        interval: Option<u64>,
    },
}

/// One issued credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuedCredential {
    /// The credential, a string or an object depending on the format.
    pub credential: Value,
    /// Unknown members.
    #[serde(flatten)]
    pub additional: JsonObject,
}

#[derive(Clone, Serialize, Deserialize)]
struct CredentialResponseWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credentials: Option<Vec<IssuedCredential>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notification_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    c_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    c_nonce_expires_in: Option<u64>,
}

impl CredentialResponse {
    /// A response carrying issued credentials.
    pub fn issued(credentials: Vec<IssuedCredential>, notification_id: Option<String>) -> Self {
        Self {
            outcome: CredentialOutcome::Issued {
                credentials,
                notification_id,
            },
            c_nonce: None,
            c_nonce_expires_in: None,
        }
    }

    /// A response deferring issuance.
    pub fn deferred(transaction_id: impl Into<String>) -> Self {
        Self {
            outcome: CredentialOutcome::Deferred {
                transaction_id: transaction_id.into(),
                interval: None,
            },
            c_nonce: None,
            c_nonce_expires_in: None,
        }
    }

    /// Attaches a fresh `c_nonce`.
    pub fn with_c_nonce(mut self, c_nonce: impl Into<String>, expires_in: u64) -> Self {
        self.c_nonce = Some(c_nonce.into());
        self.c_nonce_expires_in = Some(expires_in);
        self
    }

    /// Parses and validates a Credential Response body.
    pub fn from_json(body: &str) -> Result<Self> {
        let wire: CredentialResponseWire = serde_json::from_str(body).or_else(|error| {
            reject(
                ErrorCode::InvalidRequest,
                format!("malformed credential response: {error}"),
            )
        })?;

        wire.try_into()
    }
}

impl TryFrom<CredentialResponseWire> for CredentialResponse {
    type Error = bherror::Error<Error>;

    fn try_from(wire: CredentialResponseWire) -> std::result::Result<Self, Self::Error> {
        let outcome = match (wire.credentials, wire.transaction_id) {
            (Some(credentials), None) if credentials.is_empty() => {
                return reject(ErrorCode::InvalidRequest, "credentials must not be empty")
            }
            (Some(credentials), None) => CredentialOutcome::Issued {
                credentials,
                notification_id: wire.notification_id,
            },
            (None, Some(transaction_id)) if wire.notification_id.is_none() => {
                CredentialOutcome::Deferred {
                    transaction_id,
                    interval: wire.interval,
                }
            }
            (None, Some(_)) => {
                return reject(
                    ErrorCode::InvalidRequest,
                    "notification_id must only accompany credentials",
                )
            }
            (Some(_), Some(_)) => {
                return reject(
                    ErrorCode::InvalidRequest,
                    "credentials and transaction_id are mutually exclusive",
                )
            }
            (None, None) => {
                return reject(
                    ErrorCode::InvalidRequest,
                    "one of credentials or transaction_id is required",
                )
            }
        };

        Ok(Self {
            outcome,
            c_nonce: wire.c_nonce,
            c_nonce_expires_in: wire.c_nonce_expires_in,
        })
    }
}

impl From<CredentialResponse> for CredentialResponseWire {
    fn from(response: CredentialResponse) -> Self {
        let mut wire = CredentialResponseWire {
            credentials: None,
            transaction_id: None,
            interval: None,
            notification_id: None,
            c_nonce: response.c_nonce,
            c_nonce_expires_in: response.c_nonce_expires_in,
        };

        match response.outcome {
            CredentialOutcome::Issued {
                credentials,
                notification_id,
            } => {
                wire.credentials = Some(credentials);
                wire.notification_id = notification_id;
            }
            CredentialOutcome::Deferred {
                transaction_id,
                interval,
            } => {
                wire.transaction_id = Some(transaction_id);
                wire.interval = interval;
            }
        }

        wire
    }
}

/// Events a wallet notifies the issuer about.
#[derive(
    strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationEvent {
    /// The credentials were stored.
    CredentialAccepted,
    /// Storing the credentials failed.
    CredentialFailure,
    /// The user deleted the credentials.
    CredentialDeleted,
}

/// A Notification Request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    /// The `notification_id` of the Credential Response.
    pub notification_id: String,
    /// What happened to the credentials.
    pub event: NotificationEvent,
    /// Human readable ASCII description of the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_description: Option<String>,
}

impl NotificationRequest {
    /// Parses and validates a Notification Request body.
    pub fn from_json(body: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(body).or_else(|error| {
            reject(
                ErrorCode::InvalidNotificationRequest,
                format!("malformed notification request: {error}"),
            )
        })?;

        if request.notification_id.is_empty() {
            return reject(
                ErrorCode::InvalidNotificationRequest,
                "notification_id must not be empty",
            );
        }

        // %x20-21 / %x23-5B / %x5D-7E
        let printable = |c: char| matches!(c, ' '..='~') && c != '"' && c != '\\';
        if let Some(description) = &request.event_description {
            if !description.chars().all(printable) {
                return reject(
                    ErrorCode::InvalidNotificationRequest,
                    "event_description contains disallowed characters",
                );
            }
        }

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::proof::{ProofJwt, ProofType};

    fn request(body: Value) -> Result<CredentialRequest> {
        CredentialRequest::from_json(&body.to_string())
    }

    fn code_of<T: std::fmt::Debug>(result: Result<T>) -> ErrorCode {
        result.unwrap_err().error.code
    }

    fn encryption() -> Value {
        json!({
            "jwk": { "kty": "EC", "crv": "P-256", "x": "AAAA", "y": "BBBB", "alg": "ECDH-ES" },
            "enc": "A128GCM"
        })
    }

    #[test]
    fn batch_request() {
        let request = request(json!({
            "credential_configuration_id": "PDA1Credential",
            "proofs": { "jwt": ["a.b.c", "d.e.f"] },
            "credential_response_encryption": encryption(),
        }))
        .unwrap();

        assert_eq!(
            request.credential,
            CredentialSelector::ConfigurationId("PDA1Credential".to_owned())
        );
        assert_eq!(request.proofs.len(), 2);
        assert_eq!(
            request
                .credential_response_encryption
                .as_ref()
                .unwrap()
                .algorithm(),
            Some("ECDH-ES")
        );
        request.require_encryption(true).unwrap();
    }

    #[test]
    fn legacy_single_proof() {
        let request = request(json!({
            "credential_identifier": "CivilEngineeringDegree-2023",
            "proof": { "proof_type": "jwt", "jwt": "a.b.c" },
            "format": "vc+sd-jwt",
        }))
        .unwrap();

        assert_eq!(request.proofs, Proofs::Jwt(vec![ProofJwt::new("a.b.c")]));
        assert_eq!(request.additional["format"], "vc+sd-jwt");
        assert_eq!(
            code_of(request.require_encryption(true)),
            ErrorCode::InvalidEncryptionParameters
        );
        request.require_encryption(false).unwrap();
    }

    #[test]
    fn credential_selection() {
        let both = json!({
            "credential_identifier": "a",
            "credential_configuration_id": "b",
            "proofs": { "jwt": ["a.b.c"] },
        });
        let neither = json!({ "proofs": { "jwt": ["a.b.c"] } });

        assert_eq!(code_of(request(both)), ErrorCode::InvalidCredentialRequest);
        assert_eq!(code_of(request(neither)), ErrorCode::InvalidCredentialRequest);
    }

    #[test]
    fn proof_presence() {
        let both = json!({
            "credential_configuration_id": "b",
            "proof": { "proof_type": "jwt", "jwt": "a.b.c" },
            "proofs": { "jwt": ["a.b.c"] },
        });
        let neither = json!({ "credential_configuration_id": "b" });
        let empty = json!({ "credential_configuration_id": "b", "proofs": { "jwt": [] } });
        let unknown = json!({ "credential_configuration_id": "b", "proofs": { "cwt": ["x"] } });

        assert_eq!(code_of(request(both)), ErrorCode::InvalidProof);
        assert_eq!(code_of(request(neither)), ErrorCode::InvalidProof);
        assert_eq!(code_of(request(empty)), ErrorCode::InvalidProof);
        assert_eq!(code_of(request(unknown)), ErrorCode::UnsupportedCredentialFormat);
    }

    #[test]
    fn malformed_bodies() {
        assert_eq!(
            code_of(CredentialRequest::from_json("not json")),
            ErrorCode::InvalidCredentialRequest
        );
        assert_eq!(
            code_of(CredentialRequest::from_value(json!({ "proofs": "jwt" }))),
            ErrorCode::InvalidCredentialRequest
        );
    }

    #[test]
    fn encryption_parameters() {
        let mut private = encryption();
        private["jwk"]["d"] = json!("c2VjcmV0");
        let mut no_enc = encryption();
        no_enc["enc"] = json!("");
        let mut no_kty = encryption();
        no_kty["jwk"].as_object_mut().unwrap().remove("kty");

        for encryption in [private, no_enc, no_kty] {
            let body = json!({
                "credential_configuration_id": "b",
                "proofs": { "jwt": ["a.b.c"] },
                "credential_response_encryption": encryption,
            });
            assert_eq!(code_of(request(body)), ErrorCode::InvalidEncryptionParameters);
        }
    }

    #[test]
    fn encryption_against_metadata() {
        let encryption: CredentialResponseEncryption =
            serde_json::from_value(encryption()).unwrap();
        let mut supported = ResponseEncryptionMetadata {
            alg_values_supported: vec!["ECDH-ES".to_owned()],
            enc_values_supported: vec!["A128GCM".to_owned(), "A256GCM".to_owned()],
            encryption_required: true,
        };
        encryption.check_supported(&supported).unwrap();

        supported.enc_values_supported = vec!["A256GCM".to_owned()];
        assert_eq!(
            code_of(encryption.check_supported(&supported)),
            ErrorCode::InvalidEncryptionParameters
        );

        supported.alg_values_supported = vec!["RSA-OAEP-256".to_owned()];
        assert_eq!(
            code_of(encryption.check_supported(&supported)),
            ErrorCode::InvalidEncryptionParameters
        );
    }

    #[test]
    fn request_serializes_in_batch_form() {
        let body = json!({
            "credential_identifier": "id-1",
            "proof": { "proof_type": "jwt", "jwt": "a.b.c" },
        });
        let request = request(body).unwrap();

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({ "credential_identifier": "id-1", "proofs": { "jwt": ["a.b.c"] } })
        );
        assert_eq!(
            CredentialRequest::from_value(wire).unwrap().proofs.proof_type(),
            ProofType::Jwt
        );
    }

    #[test]
    fn issued_response() {
        let response = CredentialResponse::issued(
            vec![IssuedCredential {
                credential: json!("eyJ...sd-jwt~"),
                additional: JsonObject::new(),
            }],
            Some("3fwe98js".to_owned()),
        )
        .with_c_nonce("fGFF7UkhLa", 86400);

        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(
            wire,
            json!({
                "credentials": [{ "credential": "eyJ...sd-jwt~" }],
                "notification_id": "3fwe98js",
                "c_nonce": "fGFF7UkhLa",
                "c_nonce_expires_in": 86400
            })
        );
        assert_eq!(
            CredentialResponse::from_json(&wire.to_string()).unwrap(),
            response
        );
    }

    #[test]
    fn deferred_response() {
        let response: CredentialResponse =
            serde_json::from_value(json!({ "transaction_id": "8xLOxBtZp8", "interval": 5 }))
                .unwrap();
        assert_matches!(
            response.outcome,
            CredentialOutcome::Deferred { ref transaction_id, interval: Some(5) }
                if transaction_id == "8xLOxBtZp8"
        );
        assert_eq!(
            serde_json::to_value(CredentialResponse::deferred("8xLOxBtZp8")).unwrap(),
            json!({ "transaction_id": "8xLOxBtZp8" })
        );
    }

    #[test]
    fn invalid_responses() {
        for body in [
            json!({}),
            json!({ "credentials": [] }),
            json!({ "credentials": [{ "credential": "x" }], "transaction_id": "t" }),
            json!({ "transaction_id": "t", "notification_id": "n" }),
        ] {
            assert_eq!(
                code_of(CredentialResponse::from_json(&body.to_string())),
                ErrorCode::InvalidRequest,
                "{body}"
            );
            assert!(serde_json::from_value::<CredentialResponse>(body).is_err());
        }
    }

    #[test]
    fn notification_requests() {
        let request = NotificationRequest::from_json(
            r#"{"notification_id":"3fwe98js","event":"credential_failure","event_description":"Could not store the Credential. Out of storage."}"#,
        )
        .unwrap();
        assert_eq!(request.event, NotificationEvent::CredentialFailure);

        for body in [
            r#"{"notification_id":"3fwe98js","event":"credential_lost"}"#,
            r#"{"notification_id":"","event":"credential_accepted"}"#,
            r#"{"notification_id":"n","event":"credential_deleted","event_description":"naïve"}"#,
            r#"{"notification_id":"n","event":"credential_deleted","event_description":"a\"b"}"#,
            r#"{"event":"credential_accepted"}"#,
        ] {
            assert_eq!(
                code_of(NotificationRequest::from_json(body)),
                ErrorCode::InvalidNotificationRequest,
                "{body}"
            );
        }
    }
}
