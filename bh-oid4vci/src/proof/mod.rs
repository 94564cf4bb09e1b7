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

//! Key proof verification.
//!
//! A wallet proves possession of the key that the issued credential will be
//! bound to with one of three proof types: a signed JWT ([`ProofJwt`]), a
//! Verifiable Presentation secured with a Data Integrity proof
//! ([`ProofDiVp`]), or a key attestation issued by a third party
//! ([`ProofAttestation`]).
//!
//! Each proof type offers the same three operations:
//! - `validate_structure` performs every check that needs neither keys nor
//!   the verification context;
//! - `verify` additionally checks the audience, the `c_nonce` and the
//!   cryptographic integrity of the proof;
//! - `extract_bound_key` returns the key the credential should be bound to.
//!
//! [`ProofVerifier`] ties those together with the pluggable pieces which are
//! outside of this crate: key resolution, Data Integrity cryptosuites, and
//! trust in attestation issuers. Each of them rejects by default.

use serde::{Deserialize, Serialize};

use crate::{
    error::{reject, ErrorCode},
    jws::{JsonObject, JwkPublic, SignatureVerifier, SigningAlgorithm, DEFAULT_SIGNATURE_VERIFIERS},
    metadata::CredentialIssuerMetadata,
    utils::SecondsSinceEpoch,
    Result,
};

mod attestation;
mod di_vp;
mod jwt;

pub use attestation::{
    DecodedKeyAttestation, KeyAttestationClaims, KeyAttestationHeader, ProofAttestation,
    KEY_ATTESTATION_TYP,
};
pub use di_vp::{
    Cryptosuite, DataIntegrityProof, DiVpPresentation, ProofDiVp, AUTHENTICATION_PROOF_PURPOSE,
    VERIFIABLE_PRESENTATION_TYPE,
};
pub use jwt::{DecodedProofJwt, ProofJwt, ProofJwtClaims, ProofJwtHeader, PROOF_JWT_TYP};

/// The proof types defined by OpenID4VCI.
#[derive(
    strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProofType {
    /// `jwt`
    Jwt,
    /// `di_vp`
    DiVp,
    /// `attestation`
    Attestation,
}

impl ProofType {
    /// Looks up a proof type by its wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "jwt" => Some(ProofType::Jwt),
            "di_vp" => Some(ProofType::DiVp),
            "attestation" => Some(ProofType::Attestation),
            _ => None,
        }
    }
}

/// A single key proof.
#[derive(Debug, Clone, PartialEq)]
pub enum Proof {
    /// A proof JWT.
    Jwt(ProofJwt),
    /// A Verifiable Presentation with a Data Integrity proof.
    DiVp(ProofDiVp),
    /// A key attestation.
    Attestation(ProofAttestation),
}

impl Proof {
    /// The type of this proof.
    pub fn proof_type(&self) -> ProofType {
        match self {
            Proof::Jwt(_) => ProofType::Jwt,
            Proof::DiVp(_) => ProofType::DiVp,
            Proof::Attestation(_) => ProofType::Attestation,
        }
    }

    /// Runs the structural checks of the contained proof.
    pub fn validate_structure(&self) -> Result<()> {
        match self {
            Proof::Jwt(proof) => proof.validate_structure(),
            Proof::DiVp(proof) => proof.validate_structure(),
            Proof::Attestation(proof) => proof.validate_structure(),
        }
    }

    /// Returns the key the credential should be bound to.
    pub fn extract_bound_key(&self) -> Result<KeyRef> {
        match self {
            Proof::Jwt(proof) => proof.extract_bound_key(),
            Proof::DiVp(proof) => proof.extract_bound_key(),
            Proof::Attestation(proof) => proof.extract_bound_key(),
        }
    }
}

/// The key proofs of a Credential Request, one per requested credential
/// instance.
///
/// All proofs share a single type, and there is always at least one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Proofs {
    /// Proof JWTs.
    Jwt(Vec<ProofJwt>),
    /// Verifiable Presentations with Data Integrity proofs.
    DiVp(Vec<ProofDiVp>),
    /// Key attestations.
    Attestation(Vec<ProofAttestation>),
}

impl Proofs {
    /// The type shared by all the proofs.
    pub fn proof_type(&self) -> ProofType {
        match self {
            Proofs::Jwt(_) => ProofType::Jwt,
            Proofs::DiVp(_) => ProofType::DiVp,
            Proofs::Attestation(_) => ProofType::Attestation,
        }
    }

    /// Number of proofs.
    pub fn len(&self) -> usize {
        match self {
            Proofs::Jwt(proofs) => proofs.len(),
            Proofs::DiVp(proofs) => proofs.len(),
            Proofs::Attestation(proofs) => proofs.len(),
        }
    }

    /// Returns `true` if there are no proofs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parses the batch form, `{"<proof type>": [<proof>, ...]}`.
    pub fn from_batch(batch: JsonObject) -> Result<Self> {
        if batch.len() != 1 {
            let found: Vec<&str> = batch.keys().map(String::as_str).collect();
            return reject(
                ErrorCode::InvalidProof,
                format!(
                    "proofs must contain exactly one proof type, found [{}]",
                    found.join(", ")
                ),
            );
        }

        // the length was checked above
        let Some((name, value)) = batch.into_iter().next() else {
            return reject(ErrorCode::InvalidProof, "proofs must not be empty");
        };
        let proof_type = proof_type_from_wire(&name)?;

        let is_non_empty_array = value.as_array().is_some_and(|items| !items.is_empty());
        if !is_non_empty_array {
            return reject(
                ErrorCode::InvalidProof,
                format!("proofs.{name} must be a non-empty array"),
            );
        }

        Self::from_values(proof_type, value)
    }

    /// Parses the legacy single proof form,
    /// `{"proof_type": "<proof type>", "<proof type>": <proof>}`.
    pub fn from_single(mut proof: JsonObject) -> Result<Self> {
        let Some(name) = proof.get("proof_type").and_then(|name| name.as_str()) else {
            return reject(ErrorCode::InvalidProof, "proof_type is required in proof");
        };
        let name = name.to_owned();
        let proof_type = proof_type_from_wire(&name)?;

        let Some(value) = proof.remove(&name) else {
            return reject(
                ErrorCode::InvalidProof,
                format!("proof of type {name} does not contain the '{name}' member"),
            );
        };

        Self::from_values(proof_type, serde_json::Value::Array(vec![value]))
    }

    fn from_values(proof_type: ProofType, values: serde_json::Value) -> Result<Self> {
        let proofs = match proof_type {
            ProofType::Jwt => serde_json::from_value(values).map(Proofs::Jwt),
            ProofType::DiVp => serde_json::from_value(values).map(Proofs::DiVp),
            ProofType::Attestation => serde_json::from_value(values).map(Proofs::Attestation),
        };

        proofs.or_else(|error| {
            reject(
                ErrorCode::InvalidCredentialRequest,
                format!("malformed {proof_type} proof: {error}"),
            )
        })
    }
}

fn proof_type_from_wire(name: &str) -> Result<ProofType> {
    match ProofType::from_wire(name) {
        Some(proof_type) => Ok(proof_type),
        None => reject(
            ErrorCode::UnsupportedCredentialFormat,
            format!("proof type '{name}' is not supported"),
        ),
    }
}

/// A reference to the key a credential is to be bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRef {
    /// A public JWK, taken verbatim from the proof.
    Jwk(JwkPublic),
    /// A key identifier which needs external resolution.
    Kid(String),
    /// An X.509 certificate chain (`base64` DER), not validated here.
    X5c(Vec<String>),
    /// A Data Integrity verification method, typically a DID URL.
    VerificationMethod(String),
}

impl KeyRef {
    /// Returns the JWK if the key is embedded.
    pub fn as_jwk(&self) -> Option<&JwkPublic> {
        match self {
            KeyRef::Jwk(jwk) => Some(jwk),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            KeyRef::Jwk(_) => "jwk",
            KeyRef::Kid(_) => "kid",
            KeyRef::X5c(_) => "x5c",
            KeyRef::VerificationMethod(_) => "verificationMethod",
        }
    }
}

/// The verification context of a key proof.
///
/// Everything is optional; an unset field skips the corresponding check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyProofOptions {
    /// The Credential Issuer identifier the proof must be addressed to.
    pub audience: Option<String>,
    /// The `c_nonce` the proof must echo.
    pub c_nonce: Option<String>,
    /// Signing algorithms the issuer accepts; empty means every supported one.
    pub supported_algorithms: Vec<SigningAlgorithm>,
    /// Maximal age of a proof JWT, in seconds.
    pub max_age: Option<u64>,
}

impl VerifyProofOptions {
    /// Sets the expected audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the expected `c_nonce`.
    pub fn with_c_nonce(mut self, c_nonce: impl Into<String>) -> Self {
        self.c_nonce = Some(c_nonce.into());
        self
    }

    /// Restricts the accepted signing algorithms.
    pub fn with_supported_algorithms(
        mut self,
        algorithms: impl IntoIterator<Item = SigningAlgorithm>,
    ) -> Self {
        self.supported_algorithms = algorithms.into_iter().collect();
        self
    }

    /// Sets the maximal age of a proof JWT.
    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Builds the options for proofs of `proof_type` sent for the credential
    /// configuration `configuration_id`.
    ///
    /// The audience is the `credential_issuer`, the algorithms come from the
    /// `proof_signing_alg_values_supported` of the proof type. Algorithms this
    /// crate cannot verify are left out.
    pub fn from_metadata(
        metadata: &CredentialIssuerMetadata,
        configuration_id: &str,
        proof_type: ProofType,
    ) -> Result<Self> {
        let Some(configuration) = metadata
            .credential_configurations_supported
            .get(configuration_id)
        else {
            return reject(
                ErrorCode::UnsupportedCredentialType,
                format!("credential configuration '{configuration_id}' is not supported"),
            );
        };

        let Some(proof_metadata) = configuration
            .proof_types_supported
            .as_ref()
            .and_then(|types| types.get(proof_type.to_string().as_str()))
        else {
            return reject(
                ErrorCode::UnsupportedCredentialFormat,
                format!(
                    "proof type {proof_type} is not supported for credential configuration \
                     '{configuration_id}'"
                ),
            );
        };

        let supported_algorithms = proof_metadata
            .proof_signing_alg_values_supported
            .iter()
            .filter_map(|alg| match alg.parse::<SigningAlgorithm>() {
                Ok(alg) => Some(alg),
                Err(_) => {
                    tracing::debug!(alg = alg.as_str(), "skipping unsupported proof signing algorithm");
                    None
                }
            })
            .collect();

        Ok(Self {
            audience: Some(metadata.credential_issuer.clone()),
            c_nonce: None,
            supported_algorithms,
            max_age: None,
        })
    }

    pub(crate) fn check_algorithm(&self, alg: SigningAlgorithm) -> Result<()> {
        if self.supported_algorithms.is_empty() || self.supported_algorithms.contains(&alg) {
            return Ok(());
        }

        reject(
            ErrorCode::InvalidCredentialRequest,
            format!("alg parameter value '{alg}' is not supported"),
        )
    }

    /// Checks `nonce` against the expected `c_nonce`, yielding
    /// [`ErrorCode::InvalidNonce`] on a missing or different value.
    pub(crate) fn check_nonce(&self, nonce: Option<&str>, member: &str) -> Result<()> {
        let Some(expected) = self.c_nonce.as_deref() else {
            return Ok(());
        };

        match nonce {
            None => reject(
                ErrorCode::InvalidNonce,
                format!("{member} not found but c_nonce was provided"),
            ),
            Some(nonce) if nonce != expected => reject(
                ErrorCode::InvalidNonce,
                format!("{member} does not match c_nonce"),
            ),
            Some(_) => Ok(()),
        }
    }
}

/// Resolves a [`KeyRef`] into a public JWK to check a proof JWT signature
/// with.
pub trait KeyResolver: Sync {
    /// Returns the public JWK referenced by `key`.
    fn resolve(&self, key: &KeyRef) -> Result<JwkPublic>;
}

/// Verifies the cryptosuite-specific signature of a Data Integrity proof.
pub trait DataIntegrityVerifier: Sync {
    /// Checks `proof`, one of the proofs securing `presentation`.
    ///
    /// Called only after all structural and contextual checks have passed.
    fn verify(&self, presentation: &DiVpPresentation, proof: &DataIntegrityProof) -> Result<()>;
}

/// Establishes trust in the issuer of a key attestation.
pub trait AttestationTrust: Sync {
    /// Checks the signature of `attestation` against a trusted issuer key.
    ///
    /// [`DecodedKeyAttestation::verify_signature`] does the signature part
    /// once the issuer key is known.
    fn verify(&self, attestation: &DecodedKeyAttestation) -> Result<()>;
}

/// [`KeyResolver`] accepting only keys embedded in the proof as a `jwk`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedJwkResolver;

impl KeyResolver for EmbeddedJwkResolver {
    fn resolve(&self, key: &KeyRef) -> Result<JwkPublic> {
        match key {
            KeyRef::Jwk(jwk) => Ok(jwk.clone()),
            other => reject(
                ErrorCode::InvalidProof,
                format!("unable to resolve a key referenced by {}", other.kind()),
            ),
        }
    }
}

/// Rejects every Data Integrity proof and every key attestation.
///
/// Used whenever no real implementation is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailClosed;

impl DataIntegrityVerifier for FailClosed {
    fn verify(&self, _presentation: &DiVpPresentation, proof: &DataIntegrityProof) -> Result<()> {
        tracing::info!(
            cryptosuite = %proof.cryptosuite,
            "no Data Integrity verifier configured, rejecting di_vp proof"
        );
        reject(
            ErrorCode::InvalidProof,
            format!(
                "verification of {} proofs is not available",
                proof.cryptosuite
            ),
        )
    }
}

impl AttestationTrust for FailClosed {
    fn verify(&self, _attestation: &DecodedKeyAttestation) -> Result<()> {
        tracing::info!("no attestation trust configured, rejecting key attestation");
        reject(
            ErrorCode::InvalidProof,
            "key attestation issuer is not trusted",
        )
    }
}

/// Verifies key proofs end to end.
///
/// The default instance checks JWT signatures with OpenSSL against an
/// embedded `jwk`, and rejects `di_vp` and `attestation` proofs, as well as
/// proof JWTs referencing their key by `kid` or `x5c`.
pub struct ProofVerifier<'a> {
    signature_verifiers: &'a [&'a dyn SignatureVerifier],
    key_resolver: &'a dyn KeyResolver,
    data_integrity: &'a dyn DataIntegrityVerifier,
    attestation_trust: &'a dyn AttestationTrust,
}

impl Default for ProofVerifier<'static> {
    fn default() -> Self {
        Self {
            signature_verifiers: DEFAULT_SIGNATURE_VERIFIERS,
            key_resolver: &EmbeddedJwkResolver,
            data_integrity: &FailClosed,
            attestation_trust: &FailClosed,
        }
    }
}

impl<'a> ProofVerifier<'a> {
    /// Replaces the signature verifiers used for proof JWTs.
    pub fn with_signature_verifiers(mut self, verifiers: &'a [&'a dyn SignatureVerifier]) -> Self {
        self.signature_verifiers = verifiers;
        self
    }

    /// Replaces the resolver of the keys proof JWTs are signed with.
    pub fn with_key_resolver(mut self, resolver: &'a dyn KeyResolver) -> Self {
        self.key_resolver = resolver;
        self
    }

    /// Plugs in a Data Integrity verifier.
    pub fn with_data_integrity_verifier(mut self, verifier: &'a dyn DataIntegrityVerifier) -> Self {
        self.data_integrity = verifier;
        self
    }

    /// Plugs in the attestation issuer trust.
    pub fn with_attestation_trust(mut self, trust: &'a dyn AttestationTrust) -> Self {
        self.attestation_trust = trust;
        self
    }

    /// Fully verifies `proof` and returns the key to bind the credential to.
    pub fn verify(
        &self,
        proof: &Proof,
        options: &VerifyProofOptions,
        current_time: SecondsSinceEpoch,
    ) -> Result<KeyRef> {
        match proof {
            Proof::Jwt(proof) => self.verify_jwt(proof, options, current_time),
            Proof::DiVp(proof) => self.verify_di_vp(proof, options),
            Proof::Attestation(proof) => self.verify_attestation(proof, options, current_time),
        }
    }

    /// Verifies every proof of `proofs`, returning their keys in order.
    ///
    /// The first failing proof fails the whole batch.
    pub fn verify_all(
        &self,
        proofs: &Proofs,
        options: &VerifyProofOptions,
        current_time: SecondsSinceEpoch,
    ) -> Result<Vec<KeyRef>> {
        if proofs.is_empty() {
            return reject(ErrorCode::InvalidProof, "at least one proof is required");
        }

        match proofs {
            Proofs::Jwt(proofs) => proofs
                .iter()
                .map(|proof| self.verify_jwt(proof, options, current_time))
                .collect(),
            Proofs::DiVp(proofs) => proofs
                .iter()
                .map(|proof| self.verify_di_vp(proof, options))
                .collect(),
            Proofs::Attestation(proofs) => proofs
                .iter()
                .map(|proof| self.verify_attestation(proof, options, current_time))
                .collect(),
        }
    }

    /// Verifies the proofs of a Credential Request.
    pub fn verify_request(
        &self,
        request: &crate::CredentialRequest,
        options: &VerifyProofOptions,
        current_time: SecondsSinceEpoch,
    ) -> Result<Vec<KeyRef>> {
        self.verify_all(&request.proofs, options, current_time)
    }

    fn verify_jwt(
        &self,
        proof: &ProofJwt,
        options: &VerifyProofOptions,
        current_time: SecondsSinceEpoch,
    ) -> Result<KeyRef> {
        let decoded = proof.decode()?;
        decoded.check_context(options, current_time)?;
        let key = decoded.bound_key()?;
        let public_key = self.key_resolver.resolve(&key)?;
        decoded.verify_signature(self.signature_verifiers, &public_key)?;

        tracing::debug!(key = key.kind(), "jwt proof verified");
        Ok(key)
    }

    fn verify_di_vp(&self, proof: &ProofDiVp, options: &VerifyProofOptions) -> Result<KeyRef> {
        proof.verify(self.data_integrity, options)?;
        let key = proof.extract_bound_key()?;

        tracing::debug!(key = key.kind(), "di_vp proof verified");
        Ok(key)
    }

    fn verify_attestation(
        &self,
        proof: &ProofAttestation,
        options: &VerifyProofOptions,
        current_time: SecondsSinceEpoch,
    ) -> Result<KeyRef> {
        proof.verify(self.attestation_trust, options, current_time)?;
        let key = proof.extract_bound_key()?;

        tracing::debug!(key = key.kind(), "attestation proof verified");
        Ok(key)
    }
}
