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

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    jwt::{asymmetric_algorithm, check_typ, decode_object, header_alg, parse_compact, verify_jws_signature},
    AttestationTrust, KeyRef, VerifyProofOptions,
};
use crate::{
    error::malformed,
    jws::{CompactJws, JsonObject, JwkPublic, SignatureVerifier, SigningAlgorithm},
    utils::SecondsSinceEpoch,
    Result,
};

/// The `typ` header value of a key attestation.
pub const KEY_ATTESTATION_TYP: &str = "key-attestation+jwt";

/// A key attestation JWT, used directly as a key proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofAttestation(String);

/// Header of a key attestation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAttestationHeader {
    /// The signing algorithm of the attestation issuer.
    pub alg: SigningAlgorithm,
    /// Always [`KEY_ATTESTATION_TYP`].
    pub typ: String,
    /// Identifies the attestation issuer key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Certificate chain of the attestation issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    /// Unknown header parameters.
    #[serde(flatten)]
    pub additional: JsonObject,
}

/// Claims of a key attestation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAttestationClaims {
    /// The attestation issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Time of issuance.
    pub iat: SecondsSinceEpoch,
    /// Expiration time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<SecondsSinceEpoch>,
    /// The attested public keys; the first one is the bound key.
    pub attested_keys: Vec<JwkPublic>,
    /// The `c_nonce` provided by the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Attack potential resistance of the key storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_storage: Option<Vec<String>>,
    /// Attack potential resistance of the user authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_authentication: Option<Vec<String>>,
    /// Link to a certification of the key storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification: Option<String>,
    /// Status list reference of the attestation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    /// Unknown claims.
    #[serde(flatten)]
    pub additional: JsonObject,
}

/// A structurally valid key attestation, with its signature not yet checked.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedKeyAttestation {
    /// The decoded header.
    pub header: KeyAttestationHeader,
    /// The decoded claims.
    pub claims: KeyAttestationClaims,
    jws: CompactJws,
}

impl ProofAttestation {
    /// Wraps a compact serialized key attestation.
    pub fn new(jwt: impl Into<String>) -> Self {
        Self(jwt.into())
    }

    /// Returns the compact serialization.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the attestation, checking its header, the presence of `iat`,
    /// and that `attested_keys` is a non-empty list of public keys.
    pub fn decode(&self) -> Result<DecodedKeyAttestation> {
        let jws = parse_compact(&self.0, "key attestation")?;

        let alg = header_alg(&jws.header)?;
        check_typ(&jws.header, KEY_ATTESTATION_TYP)?;

        if !jws.payload.contains_key("iat") {
            return malformed("iat claim not found in key attestation");
        }
        match jws.payload.get("attested_keys").and_then(Value::as_array) {
            None => return malformed("attested_keys claim not found in key attestation"),
            Some(keys) if keys.is_empty() => {
                return malformed("attested_keys claim must not be empty")
            }
            Some(keys) => {
                for key in keys {
                    match key.as_object() {
                        None => return malformed("attested keys must be JSON objects"),
                        Some(key) if key.contains_key("d") => {
                            return malformed("attested keys must not contain a private key")
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        asymmetric_algorithm(alg)?;

        let header = decode_object(&jws.header, "key attestation header")?;
        let claims = decode_object(&jws.payload, "key attestation body")?;

        Ok(DecodedKeyAttestation {
            header,
            claims,
            jws,
        })
    }

    /// Runs the structural checks of [`ProofAttestation::decode`].
    pub fn validate_structure(&self) -> Result<()> {
        self.decode().map(|_| ())
    }

    /// Verifies the attestation as a key proof.
    ///
    /// The attestation must be issued with a supported algorithm, be
    /// unexpired, echo the expected `c_nonce`, and be signed by an issuer
    /// `trust` accepts.
    pub fn verify(
        &self,
        trust: &dyn AttestationTrust,
        options: &VerifyProofOptions,
        current_time: SecondsSinceEpoch,
    ) -> Result<()> {
        let decoded = self.decode()?;
        options.check_algorithm(decoded.header.alg)?;

        if decoded.claims.exp.is_some_and(|exp| exp <= current_time) {
            return malformed("key attestation has expired");
        }
        if decoded.claims.iat > current_time {
            return malformed("iat claim must not be in the future");
        }

        options.check_nonce(decoded.claims.nonce.as_deref(), "nonce claim")?;

        trust.verify(&decoded)
    }

    /// Returns the first attested key.
    pub fn extract_bound_key(&self) -> Result<KeyRef> {
        let decoded = self.decode()?;

        match decoded.claims.attested_keys.into_iter().next() {
            Some(key) => Ok(KeyRef::Jwk(key)),
            None => malformed("attested_keys claim must not be empty"),
        }
    }

    /// Returns the `iss` claim, the attestation issuer.
    pub fn subject_of(&self) -> Result<Option<String>> {
        Ok(self.decode()?.claims.iss)
    }
}

impl DecodedKeyAttestation {
    /// Checks the attestation signature against the issuer key `public_key`.
    pub fn verify_signature(
        &self,
        signature_verifiers: &[&dyn SignatureVerifier],
        public_key: &JwkPublic,
    ) -> Result<()> {
        verify_jws_signature(
            &self.jws,
            self.header.alg,
            signature_verifiers,
            public_key,
            "key attestation",
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        error::ErrorCode,
        jws::{sign_compact, OpensslSigner, Signer as _, DEFAULT_SIGNATURE_VERIFIERS},
        json_object,
        proof::FailClosed,
        test_utils::{sign_attestation, ISSUER, NONCE, NOW},
    };

    struct Trusted(JwkPublic);

    impl AttestationTrust for Trusted {
        fn verify(&self, attestation: &DecodedKeyAttestation) -> Result<()> {
            attestation.verify_signature(DEFAULT_SIGNATURE_VERIFIERS, &self.0)
        }
    }

    fn options() -> VerifyProofOptions {
        VerifyProofOptions::default()
            .with_audience(ISSUER)
            .with_c_nonce(NONCE)
    }

    fn keys() -> (OpensslSigner, OpensslSigner) {
        (
            OpensslSigner::generate(SigningAlgorithm::Es256).unwrap(),
            OpensslSigner::generate(SigningAlgorithm::Es256).unwrap(),
        )
    }

    fn attestation_with(issuer: &OpensslSigner, header: JsonObject, claims: JsonObject) -> ProofAttestation {
        ProofAttestation::new(sign_compact(&header, &claims, issuer).unwrap())
    }

    fn claims(wallet: &OpensslSigner) -> JsonObject {
        json_object!({
            "iss": "https://wallet-provider.example",
            "iat": NOW - 60,
            "exp": NOW + 3600,
            "attested_keys": [wallet.public_jwk().unwrap()],
            "key_storage": ["iso_18045_moderate"],
            "nonce": NONCE,
        })
    }

    fn header() -> JsonObject {
        json_object!({ "alg": "ES256", "typ": KEY_ATTESTATION_TYP, "kid": "provider-key" })
    }

    #[test]
    fn trusted_attestation_binds_first_key() {
        let (issuer, wallet) = keys();
        let proof = sign_attestation(&issuer, &wallet);

        proof
            .verify(&Trusted(issuer.public_jwk().unwrap()), &options(), NOW)
            .unwrap();
        assert_eq!(
            proof.extract_bound_key().unwrap(),
            KeyRef::Jwk(wallet.public_jwk().unwrap())
        );
    }

    #[test]
    fn claims_are_decoded() {
        let (issuer, wallet) = keys();
        let proof = attestation_with(&issuer, header(), claims(&wallet));

        let decoded = proof.decode().unwrap();
        assert_eq!(decoded.header.kid.as_deref(), Some("provider-key"));
        assert_eq!(
            decoded.claims.key_storage,
            Some(vec!["iso_18045_moderate".to_owned()])
        );
        assert_eq!(
            proof.subject_of().unwrap().as_deref(),
            Some("https://wallet-provider.example")
        );
    }

    #[test]
    fn fails_closed_without_trust() {
        let (issuer, wallet) = keys();
        let proof = sign_attestation(&issuer, &wallet);

        let err = proof.verify(&FailClosed, &options(), NOW).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidProof);
    }

    #[test]
    fn wrong_issuer_key() {
        let (issuer, wallet) = keys();
        let proof = sign_attestation(&issuer, &wallet);

        let err = proof
            .verify(&Trusted(wallet.public_jwk().unwrap()), &options(), NOW)
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidProof);
    }

    #[test]
    fn expired() {
        let (issuer, wallet) = keys();
        let mut claims = claims(&wallet);
        claims.insert("exp".to_owned(), json!(NOW));
        let proof = attestation_with(&issuer, header(), claims);

        let err = proof
            .verify(&Trusted(issuer.public_jwk().unwrap()), &options(), NOW)
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
    }

    #[test]
    fn nonce_mismatch() {
        let (issuer, wallet) = keys();
        let mut claims = claims(&wallet);
        claims.insert("nonce".to_owned(), json!("stale"));
        let proof = attestation_with(&issuer, header(), claims);

        let err = proof
            .verify(&Trusted(issuer.public_jwk().unwrap()), &options(), NOW)
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidNonce);
    }

    #[test]
    fn structural_failures() {
        let (issuer, wallet) = keys();

        let mut wrong_typ = header();
        wrong_typ.insert("typ".to_owned(), json!("JWT"));

        let mut empty_keys = claims(&wallet);
        empty_keys.insert("attested_keys".to_owned(), json!([]));

        let mut private_key = claims(&wallet);
        let mut jwk = wallet.public_jwk().unwrap();
        jwk.insert("d".to_owned(), json!("c2VjcmV0"));
        private_key.insert("attested_keys".to_owned(), json!([jwk]));

        let mut no_iat = claims(&wallet);
        no_iat.remove("iat");

        for (header, claims) in [
            (wrong_typ, claims(&wallet)),
            (header(), empty_keys),
            (header(), private_key),
            (header(), no_iat),
        ] {
            let err = attestation_with(&issuer, header, claims)
                .validate_structure()
                .unwrap_err();
            assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
        }
    }

    #[test]
    fn disallowed_algorithm() {
        let (issuer, wallet) = keys();
        let proof = sign_attestation(&issuer, &wallet);
        let options = options().with_supported_algorithms([SigningAlgorithm::EdDsa]);

        let err = proof
            .verify(&Trusted(issuer.public_jwk().unwrap()), &options, NOW)
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
    }
}
