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

//! Credential Issuer metadata, as published at
//! `/.well-known/openid-credential-issuer`.

use std::collections::BTreeMap;

use bherror::traits::{ErrorContext as _, ForeignError as _, PropagateError as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::ErrorCode,
    jws::{sign_compact, JsonObject, Signer},
    utils::SecondsSinceEpoch,
    Error, Result,
};

/// The Credential Issuer metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialIssuerMetadata {
    /// The Credential Issuer identifier.
    pub credential_issuer: String,
    /// Authorization servers the issuer relies on; the issuer itself when
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_servers: Option<Vec<String>>,
    /// URL of the Credential Endpoint.
    pub credential_endpoint: String,
    /// URL of the Nonce Endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce_endpoint: Option<String>,
    /// URL of the Deferred Credential Endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred_credential_endpoint: Option<String>,
    /// URL of the Notification Endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_endpoint: Option<String>,
    /// Supported encryption of Credential Responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_response_encryption: Option<ResponseEncryptionMetadata>,
    /// Present when batch issuance through `proofs` is supported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_credential_issuance: Option<BatchCredentialIssuance>,
    /// The metadata as a signed JWT, see [`sign_metadata`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_metadata: Option<String>,
    /// Display properties of the issuer, one per locale.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<DisplayProperties>,
    /// The credentials the issuer can issue, keyed by configuration id.
    pub credential_configurations_supported: BTreeMap<String, CredentialConfiguration>,
    /// Unknown members.
    #[serde(flatten)]
    pub additional: JsonObject,
}

/// Encryption of Credential Responses supported by the issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEncryptionMetadata {
    /// Supported JWE `alg` values.
    pub alg_values_supported: Vec<String>,
    /// Supported JWE `enc` values.
    pub enc_values_supported: Vec<String>,
    /// Whether every Credential Response is encrypted.
    pub encryption_required: bool,
}

/// Batch issuance support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCredentialIssuance {
    /// Maximal number of proofs in one Credential Request.
    pub batch_size: u32,
}

/// Locale specific display properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayProperties {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// BCP47 language tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Logo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<Image>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// CSS background color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Background image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<Image>,
    /// CSS text color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

/// An image referenced from display properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Where to obtain the image from.
    pub uri: String,
    /// Alternative text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// Describes one credential the issuer can issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialConfiguration {
    /// Credential format, e.g. `dc+sd-jwt` or `mso_mdoc`.
    pub format: String,
    /// OAuth scope requesting this credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// How the credential can be bound to a key, e.g. `jwk` or `did:example`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cryptographic_binding_methods_supported: Option<Vec<String>>,
    /// Algorithms the issuer signs the credential with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_signing_alg_values_supported: Option<Vec<Value>>,
    /// Accepted key proofs, keyed by proof type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_types_supported: Option<BTreeMap<String, ProofTypeMetadata>>,
    /// Display properties of the credential, one per locale.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display: Vec<DisplayProperties>,
    /// SD-JWT VC type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vct: Option<String>,
    /// ISO mdoc document type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctype: Option<String>,
    /// W3C VC types and subject claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_definition: Option<CredentialDefinition>,
    /// Format specific members.
    #[serde(flatten)]
    pub additional: JsonObject,
}

/// Metadata of one accepted proof type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofTypeMetadata {
    /// Algorithms the wallet may sign the proof with.
    pub proof_signing_alg_values_supported: Vec<String>,
    /// Requirements on a key attestation accompanying the proof.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_attestations_required: Option<Value>,
}

/// Definition of a W3C Verifiable Credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialDefinition {
    /// Credential types.
    #[serde(rename = "type")]
    pub types: Vec<String>,
    /// Metadata of the subject claims.
    #[serde(
        rename = "credentialSubject",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub credential_subject: Option<JsonObject>,
}

/// Signs `metadata` into its `signed_metadata` member.
///
/// The claims are the metadata itself, without any previous
/// `signed_metadata`, plus `iat`, and `iss` and `sub` both set to the
/// `credential_issuer`. The header carries `alg`, `typ: JWT` and the `x5c`
/// chain of the signing key. The returned metadata is `metadata` with the new
/// `signed_metadata`.
pub fn sign_metadata<S: Signer + ?Sized>(
    metadata: &CredentialIssuerMetadata,
    signer: &S,
    x5c: &[String],
    current_time: SecondsSinceEpoch,
) -> Result<CredentialIssuerMetadata> {
    let mut signed = metadata.clone();
    signed.signed_metadata = None;

    let mut claims = match serde_json::to_value(&signed)
        .foreign_err(|| Error::from_code(ErrorCode::ServerError))
        .ctx(|| "serializing issuer metadata")?
    {
        Value::Object(claims) => claims,
        _ => {
            return Err(bherror::Error::root(Error::new(
                ErrorCode::ServerError,
                "issuer metadata did not serialize to an object",
            )))
        }
    };
    claims.remove("signed_metadata");
    claims.insert("iat".to_owned(), current_time.into());
    claims.insert("iss".to_owned(), signed.credential_issuer.clone().into());
    claims.insert("sub".to_owned(), signed.credential_issuer.clone().into());

    let mut header = JsonObject::new();
    header.insert("alg".to_owned(), signer.algorithm().as_str().into());
    header.insert("typ".to_owned(), "JWT".into());
    header.insert("x5c".to_owned(), x5c.into());

    let jwt = sign_compact(&header, &claims, signer)
        .with_err(|| Error::new(ErrorCode::ServerError, "unable to sign issuer metadata"))?;

    tracing::debug!(
        credential_issuer = signed.credential_issuer.as_str(),
        "signed issuer metadata"
    );

    signed.signed_metadata = Some(jwt);
    Ok(signed)
}
