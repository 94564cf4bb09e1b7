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

//! [JSON Web Signature][1] plumbing used by key proofs and signed metadata.
//!
//! Only the compact serialization is supported. Token types are decoded by the
//! callers; this module deals with segments, algorithms and keys.
//!
//! [1]: https://datatracker.ietf.org/doc/html/rfc7515

use std::str::FromStr;

use bherror::{
    traits::{ForeignBoxed as _, ForeignError as _},
    Error,
};
use serde::{Deserialize, Serialize};

use crate::utils::{base64_url_decode, base64_url_encode};

mod openssl_impl;

pub use openssl_impl::{OpensslSigner, OpensslVerifier, DEFAULT_SIGNATURE_VERIFIERS};

/// Type alias for a boxed error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A JSON object.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// The public part of a JSON Web Key, kept as a plain JSON object.
pub type JwkPublic = JsonObject;

/// Helper macro with the same syntax as [`serde_json::json`] specialized for
/// constructing JSON objects.
///
/// It will construct a more specific type ([`serde_json::Map<String,Value>`])
/// than just [`serde_json::Value`], and panic if the literal is not an object.
#[macro_export]
macro_rules! json_object {
    ($stuff:tt) => {
        match ::serde_json::json!($stuff) {
            ::serde_json::Value::Object(o) => o,
            _ => unreachable!("JSON literal wasn't an object"),
        }
    };
}

/// Errors of the JWS layer.
#[derive(strum_macros::Display, Debug, PartialEq, Clone)]
pub enum JwsError {
    /// The compact serialization does not have exactly three segments.
    #[strum(to_string = "JWS must consist of exactly three segments, found {0}")]
    SegmentCount(usize),
    /// A segment is not valid `base64url` without padding.
    #[strum(to_string = "JWS {0} is not valid base64url")]
    InvalidBase64(&'static str),
    /// A segment is not a JSON object.
    #[strum(to_string = "JWS {0} is not a JSON object")]
    InvalidJson(&'static str),
    /// The header or the payload is not a `base64url` encoded JSON object.
    #[strum(to_string = "JWS header or payload is not a base64url encoded JSON object")]
    NonParseableJws,
    /// The `alg` is `none`.
    #[strum(to_string = "alg parameter value 'none' is not allowed")]
    NoneAlgorithm,
    /// The `alg` is a MAC algorithm.
    #[strum(to_string = "symmetric signing algorithm '{0}' is not allowed")]
    SymmetricAlgorithm(String),
    /// The `alg` is unknown or not asymmetric.
    #[strum(to_string = "unsupported signing algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    /// The key is not a usable JWK for the algorithm.
    #[strum(to_string = "JWK parsing failed: {0}")]
    JwkParsingFailed(String),
    /// The signer failed.
    #[strum(to_string = "Unable to sign JWS")]
    SigningFailed,
    /// Key generation failed.
    #[strum(to_string = "Key generation failed")]
    KeyGenerationFailed,
    /// The cryptographic backend unexpectedly failed.
    #[strum(to_string = "Crypto backend failed")]
    CryptoBackend,
}

impl bherror::BhError for JwsError {}

/// Asymmetric JOSE signature algorithms accepted for key proofs and metadata.
///
/// MAC algorithms (`HS*`) and `none` are never representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// ECDSA over P-256 with SHA-256
    #[serde(rename = "ES256")]
    Es256,
    /// ECDSA over P-384 with SHA-384
    #[serde(rename = "ES384")]
    Es384,
    /// ECDSA over P-521 with SHA-512
    #[serde(rename = "ES512")]
    Es512,
    /// RSASSA-PSS with SHA-256 and MGF1 with SHA-256
    #[serde(rename = "PS256")]
    Ps256,
    /// RSASSA-PSS with SHA-384 and MGF1 with SHA-384
    #[serde(rename = "PS384")]
    Ps384,
    /// RSASSA-PSS with SHA-512 and MGF1 with SHA-512
    #[serde(rename = "PS512")]
    Ps512,
    /// RSASSA-PKCS1-v1_5 with SHA-256
    #[serde(rename = "RS256")]
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384
    #[serde(rename = "RS384")]
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512
    #[serde(rename = "RS512")]
    Rs512,
    /// Edwards-curve signatures, limited to Ed25519
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl SigningAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [SigningAlgorithm; 10] = [
        SigningAlgorithm::Es256,
        SigningAlgorithm::Es384,
        SigningAlgorithm::Es512,
        SigningAlgorithm::Ps256,
        SigningAlgorithm::Ps384,
        SigningAlgorithm::Ps512,
        SigningAlgorithm::Rs256,
        SigningAlgorithm::Rs384,
        SigningAlgorithm::Rs512,
        SigningAlgorithm::EdDsa,
    ];

    /// The JWS `alg` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::EdDsa => "EdDSA",
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = Error<JwsError>;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some(alg) = Self::ALL.into_iter().find(|alg| alg.as_str() == value) {
            return Ok(alg);
        }

        let error = if value.eq_ignore_ascii_case("none") {
            JwsError::NoneAlgorithm
        } else if value.starts_with("HS") {
            JwsError::SymmetricAlgorithm(value.to_owned())
        } else {
            JwsError::UnsupportedAlgorithm(value.to_owned())
        };
        Err(Error::root(error))
    }
}

impl std::fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An external signing backend, to be used for computing a JWS signature.
///
/// The output of the signer, regardless of the algorithm, must be a valid
/// **JWS signature**, e.g. `r || s` for ECDSA. See step 5 in [section 5.1 of
/// RFC7515](https://www.rfc-editor.org/rfc/rfc7515.html#section-5.1).
pub trait Signer {
    /// Algorithm used for signing.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Sign the `message` and return the raw JWS signature.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, BoxError>;

    /// The public counterpart of the signing key, as a JWK.
    fn public_jwk(&self) -> Result<JwkPublic, BoxError>;
}

/// An external verification backend for JWS signatures.
pub trait SignatureVerifier: Sync {
    /// Algorithm this verifier checks signatures of.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Verify `signature` over `message` with `public_key`.
    ///
    /// Returns `Ok(false)` for a well-formed but wrong signature, and an error
    /// when the key or the signature cannot be interpreted at all.
    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: &JwkPublic,
    ) -> Result<bool, BoxError>;
}

/// Looks up the verifier for `alg` among `verifiers`.
pub fn find_verifier<'a>(
    verifiers: &[&'a dyn SignatureVerifier],
    alg: SigningAlgorithm,
) -> Option<&'a dyn SignatureVerifier> {
    verifiers
        .iter()
        .copied()
        .find(|verifier| verifier.algorithm() == alg)
}

/// A compact JWS split into its decoded parts.
///
/// Nothing about it is verified yet; the signature is checked by
/// [`CompactJws::verify_signature`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompactJws {
    /// Decoded protected header.
    pub header: JsonObject,
    /// Decoded payload.
    pub payload: JsonObject,
    signing_input: String,
    signature: Vec<u8>,
}

impl CompactJws {
    /// Splits `jws` into exactly three `base64url` segments and decodes the
    /// header and the payload as JSON objects.
    pub fn parse(jws: &str) -> bherror::Result<Self, JwsError> {
        let segments: Vec<&str> = jws.split('.').collect();
        let [header, payload, signature] = segments[..] else {
            return Err(Error::root(JwsError::SegmentCount(segments.len())));
        };

        // `alg` selects the verifier, so the header is read unverified.
        let token: jwt::Token<JsonObject, JsonObject, jwt::Unverified<'_>> =
            jwt::Token::parse_unverified(jws).foreign_err(|| JwsError::NonParseableJws)?;
        let signature_bytes =
            base64_url_decode(signature).foreign_err(|| JwsError::InvalidBase64("signature"))?;

        Ok(Self {
            header: token.header().clone(),
            payload: token.claims().clone(),
            signing_input: construct_jws_payload(header, payload),
            signature: signature_bytes,
        })
    }

    /// Checks the signature with `verifier` against `public_key`.
    pub fn verify_signature(
        &self,
        verifier: &dyn SignatureVerifier,
        public_key: &JwkPublic,
    ) -> Result<bool, BoxError> {
        verifier.verify(self.signing_input.as_bytes(), &self.signature, public_key)
    }
}

/// Create payload for a `JWS`, given its header and claims.
///
/// The payload is constructed by concatenating the header and claims by `.`
/// character, i.e. `<header>.<claims>`, as defined [here].
///
/// [here]: https://www.rfc-editor.org/rfc/rfc7515.html#section-5.1
pub fn construct_jws_payload(header: &str, claims: &str) -> String {
    format!("{header}.{claims}")
}

/// Serializes `header` and `payload` and signs them into a compact JWS.
pub fn sign_compact<S: Signer + ?Sized>(
    header: &JsonObject,
    payload: &JsonObject,
    signer: &S,
) -> bherror::Result<String, JwsError> {
    let header = serde_json::to_vec(header).foreign_err(|| JwsError::InvalidJson("header"))?;
    let payload = serde_json::to_vec(payload).foreign_err(|| JwsError::InvalidJson("payload"))?;

    let signing_input =
        construct_jws_payload(&base64_url_encode(header), &base64_url_encode(payload));
    let signature = signer
        .sign(signing_input.as_bytes())
        .foreign_boxed_err(|| JwsError::SigningFailed)?;

    Ok(format!("{signing_input}.{}", base64_url_encode(signature)))
}
