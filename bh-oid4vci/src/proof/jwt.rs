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

use bherror::traits::{ForeignBoxed as _, PropagateError as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::{KeyRef, VerifyProofOptions};
use crate::{
    error::{malformed, reject, ErrorCode},
    jws::{find_verifier, CompactJws, JsonObject, JwkPublic, SignatureVerifier, SigningAlgorithm},
    utils::{OneOrMany, SecondsSinceEpoch},
    Error, Result,
};

/// The `typ` header value of a proof JWT.
pub const PROOF_JWT_TYP: &str = "openid4vci-proof+jwt";

const KEY_BINDING_MEMBERS: [&str; 3] = ["kid", "jwk", "x5c"];

/// A proof JWT in its compact serialization, exactly as sent by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofJwt(String);

/// The decoded header of a proof JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofJwtHeader {
    /// The signing algorithm.
    pub alg: SigningAlgorithm,
    /// Always [`PROOF_JWT_TYP`].
    pub typ: String,
    /// Key identifier, e.g. a DID URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// The public key the proof is signed with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwk: Option<JwkPublic>,
    /// Certificate chain of the signing key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    /// Unknown header parameters.
    #[serde(flatten)]
    pub additional: JsonObject,
}

/// The decoded claims of a proof JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofJwtClaims {
    /// The Credential Issuer the proof is intended for.
    pub aud: OneOrMany<String>,
    /// Time of issuance.
    pub iat: SecondsSinceEpoch,
    /// The `c_nonce` provided by the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// The `client_id` of the wallet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Unknown claims.
    #[serde(flatten)]
    pub additional: JsonObject,
}

/// A structurally valid, not yet verified, proof JWT.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedProofJwt {
    /// The decoded header.
    pub header: ProofJwtHeader,
    /// The decoded claims.
    pub claims: ProofJwtClaims,
    jws: CompactJws,
}

impl ProofJwt {
    /// Wraps a compact serialized proof JWT.
    pub fn new(jwt: impl Into<String>) -> Self {
        Self(jwt.into())
    }

    /// Returns the compact serialization.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the proof JWT, running every check which needs neither a key
    /// nor the verification context.
    ///
    /// The header must carry an asymmetric `alg`, the `typ` must be
    /// [`PROOF_JWT_TYP`], and exactly one of `kid`, `jwk` or `x5c` must be
    /// present, with the `jwk` not containing a private key. The claims must
    /// contain `aud` and `iat`.
    pub fn decode(&self) -> Result<DecodedProofJwt> {
        let jws = parse_compact(&self.0, "proof JWT")?;

        // !!! Start of direct access to not-yet-integrity-verified fields
        let alg = header_alg(&jws.header)?;
        check_typ(&jws.header, PROOF_JWT_TYP)?;
        check_key_binding(&jws.header)?;

        for claim in ["aud", "iat"] {
            if !jws.payload.contains_key(claim) {
                return malformed(format!("{claim} claim not found in JWT body"));
            }
        }
        if jws.payload["aud"].as_array().is_some_and(Vec::is_empty) {
            return malformed("aud claim must not be empty");
        }

        asymmetric_algorithm(alg)?;

        let header = decode_object(&jws.header, "JWT header")?;
        let claims = decode_object(&jws.payload, "JWT body")?;
        // !!! End of direct access to not-yet-integrity-verified fields

        Ok(DecodedProofJwt {
            header,
            claims,
            jws,
        })
    }

    /// Runs the structural checks of [`ProofJwt::decode`].
    pub fn validate_structure(&self) -> Result<()> {
        self.decode().map(|_| ())
    }

    /// Fully verifies the proof JWT against `public_key`.
    ///
    /// On top of the structural checks, the `aud` must contain the expected
    /// audience, `iat` must not be in the future, the `nonce` must match the
    /// expected `c_nonce`, and the `alg` must be among the supported
    /// algorithms. The signature is checked last.
    pub fn verify(
        &self,
        public_key: &JwkPublic,
        signature_verifiers: &[&dyn SignatureVerifier],
        options: &VerifyProofOptions,
        current_time: SecondsSinceEpoch,
    ) -> Result<()> {
        let decoded = self.decode()?;
        decoded.check_context(options, current_time)?;
        decoded.verify_signature(signature_verifiers, public_key)
    }

    /// Returns the key the proof binds: the `jwk` verbatim, otherwise the
    /// `kid` or the unresolved `x5c` chain.
    pub fn extract_bound_key(&self) -> Result<KeyRef> {
        self.decode()?.bound_key()
    }

    /// Returns the `iss` claim, i.e. the `client_id` of the wallet.
    pub fn subject_of(&self) -> Result<Option<String>> {
        Ok(self.decode()?.claims.iss)
    }
}

impl DecodedProofJwt {
    /// Runs every check of [`ProofJwt::verify`] except the signature check,
    /// so a stale `nonce` is reported before the key is looked up.
    pub(super) fn check_context(
        &self,
        options: &VerifyProofOptions,
        current_time: SecondsSinceEpoch,
    ) -> Result<()> {
        self.validate_claims(options, current_time)?;
        options.check_algorithm(self.header.alg)
    }

    pub(super) fn bound_key(&self) -> Result<KeyRef> {
        let header = &self.header;
        match (&header.jwk, &header.kid, &header.x5c) {
            (Some(jwk), _, _) => Ok(KeyRef::Jwk(jwk.clone())),
            (None, Some(kid), _) => Ok(KeyRef::Kid(kid.clone())),
            (None, None, Some(x5c)) => Ok(KeyRef::X5c(x5c.clone())),
            (None, None, None) => malformed("one of kid, jwk or x5c must be present in JWT header"),
        }
    }

    fn validate_claims(
        &self,
        options: &VerifyProofOptions,
        current_time: SecondsSinceEpoch,
    ) -> Result<()> {
        if let Some(audience) = &options.audience {
            if !self.claims.aud.contains(audience) {
                return malformed(format!("aud claim does not contain '{audience}'"));
            }
        }

        if self.claims.iat > current_time {
            return malformed("iat claim must not be in the future");
        }

        if let Some(max_age) = options.max_age {
            if current_time - self.claims.iat > max_age {
                return malformed(format!("proof JWT is older than {max_age} seconds"));
            }
        }

        options.check_nonce(self.claims.nonce.as_deref(), "nonce claim")
    }

    pub(super) fn verify_signature(
        &self,
        signature_verifiers: &[&dyn SignatureVerifier],
        public_key: &JwkPublic,
    ) -> Result<()> {
        verify_jws_signature(
            &self.jws,
            self.header.alg,
            signature_verifiers,
            public_key,
            "JWT",
        )
    }
}

pub(super) fn parse_compact(jwt: &str, what: &str) -> Result<CompactJws> {
    CompactJws::parse(jwt).match_err(|error| {
        Error::new(
            ErrorCode::InvalidCredentialRequest,
            format!("invalid {what}: {error}"),
        )
    })
}

/// Reads `alg`, rejecting a missing value and `none`.
pub(super) fn header_alg(header: &JsonObject) -> Result<&str> {
    let Some(alg) = header.get("alg") else {
        return malformed("alg parameter not found in JWT header");
    };
    let Some(alg) = alg.as_str() else {
        return malformed("alg parameter must be a string");
    };
    if alg.eq_ignore_ascii_case("none") {
        return malformed("alg parameter value 'none' is not allowed");
    }

    Ok(alg)
}

pub(super) fn check_typ(header: &JsonObject, expected: &str) -> Result<()> {
    match header.get("typ").and_then(Value::as_str) {
        Some(typ) if typ == expected => Ok(()),
        Some(typ) => malformed(format!(
            "typ parameter value must be '{expected}', found '{typ}'"
        )),
        None => malformed("typ parameter not found in JWT header"),
    }
}

fn check_key_binding(header: &JsonObject) -> Result<()> {
    let present: Vec<&str> = KEY_BINDING_MEMBERS
        .into_iter()
        .filter(|member| header.get(*member).is_some_and(|value| !value.is_null()))
        .collect();

    match present[..] {
        [] => malformed("one of kid, jwk or x5c must be present in JWT header"),
        [_] => match header.get("jwk") {
            Some(Value::Object(jwk)) if jwk.contains_key("d") => {
                malformed("jwk must not contain a private key")
            }
            Some(Value::Object(jwk)) if !jwk.get("kty").is_some_and(Value::is_string) => {
                malformed("kty not found in jwk")
            }
            Some(jwk) if !jwk.is_object() => malformed("jwk parameter must be a JSON object"),
            _ => Ok(()),
        },
        [first, second, ..] => malformed(format!(
            "{second} must not be present when {first} is present"
        )),
    }
}

/// Rejects MAC algorithms and anything else which is not asymmetric.
pub(super) fn asymmetric_algorithm(alg: &str) -> Result<SigningAlgorithm> {
    alg.parse::<SigningAlgorithm>().match_err(|error| {
        Error::new(ErrorCode::InvalidCredentialRequest, error.to_string())
    })
}

pub(super) fn decode_object<T: DeserializeOwned>(object: &JsonObject, what: &str) -> Result<T> {
    serde_json::from_value(Value::Object(object.clone()))
        .or_else(|error| malformed(format!("malformed {what}: {error}")))
}

pub(super) fn verify_jws_signature(
    jws: &CompactJws,
    alg: SigningAlgorithm,
    signature_verifiers: &[&dyn SignatureVerifier],
    public_key: &JwkPublic,
    what: &str,
) -> Result<()> {
    let Some(verifier) = find_verifier(signature_verifiers, alg) else {
        return reject(
            ErrorCode::InvalidProof,
            format!("no signature verifier available for {alg}"),
        );
    };

    let valid = jws
        .verify_signature(verifier, public_key)
        .foreign_boxed_err(|| {
            Error::new(
                ErrorCode::InvalidProof,
                format!("unable to verify {what} signature"),
            )
        })?;

    if !valid {
        return reject(ErrorCode::InvalidProof, format!("{what} signature is invalid"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::{
        jws::{OpensslSigner, Signer as _, DEFAULT_SIGNATURE_VERIFIERS},
        test_utils::{
            proof_jwt_claims, proof_jwt_header, sign_proof_jwt, unsigned_jwt, ISSUER, NONCE, NOW,
        },
    };

    fn options() -> VerifyProofOptions {
        VerifyProofOptions::default()
            .with_audience(ISSUER)
            .with_c_nonce(NONCE)
    }

    fn setup() -> (OpensslSigner, JsonObject, JsonObject) {
        let signer = OpensslSigner::generate(SigningAlgorithm::Es256).unwrap();
        let header = proof_jwt_header(&signer);
        (signer, header, proof_jwt_claims())
    }

    fn verify(jwt: &ProofJwt, signer: &OpensslSigner) -> Result<()> {
        jwt.verify(
            &signer.public_jwk().unwrap(),
            DEFAULT_SIGNATURE_VERIFIERS,
            &options(),
            NOW,
        )
    }

    fn code_of<T: std::fmt::Debug>(result: Result<T>) -> ErrorCode {
        result.unwrap_err().error.code
    }

    #[test]
    fn valid_proof() {
        let (signer, header, claims) = setup();
        let jwt = sign_proof_jwt(&header, &claims, &signer);

        jwt.validate_structure().unwrap();
        verify(&jwt, &signer).unwrap();

        let decoded = jwt.decode().unwrap();
        assert_eq!(decoded.header.alg, SigningAlgorithm::Es256);
        assert_eq!(decoded.header.typ, PROOF_JWT_TYP);
        assert_eq!(decoded.claims.nonce.as_deref(), Some(NONCE));
        assert_eq!(jwt.subject_of().unwrap().as_deref(), Some("wallet-client-id"));
        assert_eq!(
            jwt.extract_bound_key().unwrap(),
            KeyRef::Jwk(signer.public_jwk().unwrap())
        );
    }

    #[test]
    fn every_algorithm_verifies() {
        for alg in SigningAlgorithm::ALL {
            let signer = OpensslSigner::generate(alg).unwrap();
            let jwt = sign_proof_jwt(&proof_jwt_header(&signer), &proof_jwt_claims(), &signer);
            verify(&jwt, &signer).unwrap();
        }
    }

    #[test]
    fn alg_none_is_rejected_regardless_of_other_fields() {
        let (signer, mut header, mut claims) = setup();
        header.insert("alg".to_owned(), json!("none"));
        let jwt = unsigned_jwt(&header, &claims);

        assert_eq!(code_of(jwt.validate_structure()), ErrorCode::InvalidCredentialRequest);
        assert_eq!(code_of(verify(&jwt, &signer)), ErrorCode::InvalidCredentialRequest);

        // even with a wrong nonce, the algorithm is reported first
        claims.insert("nonce".to_owned(), json!("wrong"));
        let jwt = unsigned_jwt(&header, &claims);
        assert_eq!(code_of(verify(&jwt, &signer)), ErrorCode::InvalidCredentialRequest);
    }

    #[test]
    fn symmetric_algorithms_are_rejected() {
        let (signer, mut header, claims) = setup();
        for alg in ["HS256", "HS384", "HS512", "XS256"] {
            header.insert("alg".to_owned(), json!(alg));
            let jwt = unsigned_jwt(&header, &claims);
            assert_eq!(code_of(verify(&jwt, &signer)), ErrorCode::InvalidCredentialRequest);
        }
    }

    #[test]
    fn missing_alg() {
        let (_, mut header, claims) = setup();
        header.remove("alg");
        let err = unsigned_jwt(&header, &claims).validate_structure().unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
        assert_eq!(
            err.error.description.as_deref(),
            Some("alg parameter not found in JWT header")
        );
    }

    #[test]
    fn typ_is_an_exact_match() {
        let (_, mut header, claims) = setup();
        for typ in ["JWT", "OPENID4VCI-PROOF+JWT", "openid4vci-proof+jwt "] {
            header.insert("typ".to_owned(), json!(typ));
            assert_eq!(
                code_of(unsigned_jwt(&header, &claims).validate_structure()),
                ErrorCode::InvalidCredentialRequest
            );
        }
        header.remove("typ");
        assert_eq!(
            code_of(unsigned_jwt(&header, &claims).validate_structure()),
            ErrorCode::InvalidCredentialRequest
        );
    }

    #[test]
    fn exactly_one_key_binding() {
        let (signer, header, claims) = setup();

        let mut both = header.clone();
        both.insert("kid".to_owned(), json!("key-1"));
        let err = sign_proof_jwt(&both, &claims, &signer)
            .validate_structure()
            .unwrap_err();
        assert_eq!(
            err.error.description.as_deref(),
            Some("jwk must not be present when kid is present")
        );

        let mut with_x5c = header.clone();
        with_x5c.insert("x5c".to_owned(), json!(["MIIB"]));
        assert_eq!(
            code_of(sign_proof_jwt(&with_x5c, &claims, &signer).validate_structure()),
            ErrorCode::InvalidCredentialRequest
        );

        let mut none = header.clone();
        none.remove("jwk");
        assert_eq!(
            code_of(sign_proof_jwt(&none, &claims, &signer).validate_structure()),
            ErrorCode::InvalidCredentialRequest
        );
    }

    #[test]
    fn private_jwk_is_rejected_even_with_valid_signature() {
        let (signer, mut header, claims) = setup();
        let mut jwk = signer.public_jwk().unwrap();
        jwk.insert("d".to_owned(), json!("c2VjcmV0"));
        header.insert("jwk".to_owned(), Value::Object(jwk));
        let jwt = sign_proof_jwt(&header, &claims, &signer);

        let err = jwt.validate_structure().unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
        assert_eq!(code_of(verify(&jwt, &signer)), ErrorCode::InvalidCredentialRequest);
    }

    #[test]
    fn jwk_without_key_type_is_malformed() {
        let (signer, mut header, claims) = setup();

        header.insert("jwk".to_owned(), json!({}));
        let err = sign_proof_jwt(&header, &claims, &signer)
            .validate_structure()
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
        assert_eq!(err.error.description.as_deref(), Some("kty not found in jwk"));

        let mut jwk = signer.public_jwk().unwrap();
        jwk.insert("kty".to_owned(), json!(2));
        header.insert("jwk".to_owned(), Value::Object(jwk));
        let jwt = sign_proof_jwt(&header, &claims, &signer);
        assert_eq!(code_of(jwt.extract_bound_key()), ErrorCode::InvalidCredentialRequest);
        assert_eq!(code_of(verify(&jwt, &signer)), ErrorCode::InvalidCredentialRequest);
    }

    #[test]
    fn required_claims() {
        let (signer, header, claims) = setup();
        for claim in ["aud", "iat"] {
            let mut claims = claims.clone();
            claims.remove(claim);
            let err = sign_proof_jwt(&header, &claims, &signer)
                .validate_structure()
                .unwrap_err();
            assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
            assert_eq!(
                err.error.description,
                Some(format!("{claim} claim not found in JWT body"))
            );
        }

        let mut claims = claims.clone();
        claims.insert("iat".to_owned(), json!("yesterday"));
        assert_eq!(
            code_of(sign_proof_jwt(&header, &claims, &signer).validate_structure()),
            ErrorCode::InvalidCredentialRequest
        );
    }

    #[test]
    fn audience() {
        let (signer, header, mut claims) = setup();

        claims.insert("aud".to_owned(), json!(["https://other.example", ISSUER]));
        verify(&sign_proof_jwt(&header, &claims, &signer), &signer).unwrap();

        claims.insert("aud".to_owned(), json!("https://other.example"));
        assert_eq!(
            code_of(verify(&sign_proof_jwt(&header, &claims, &signer), &signer)),
            ErrorCode::InvalidCredentialRequest
        );
    }

    #[test]
    fn issued_at() {
        let (signer, header, mut claims) = setup();

        claims.insert("iat".to_owned(), json!(NOW + 1));
        assert_eq!(
            code_of(verify(&sign_proof_jwt(&header, &claims, &signer), &signer)),
            ErrorCode::InvalidCredentialRequest
        );

        claims.insert("iat".to_owned(), json!(NOW - 600));
        let jwt = sign_proof_jwt(&header, &claims, &signer);
        verify(&jwt, &signer).unwrap();

        let strict = options().with_max_age(300);
        let err = jwt
            .verify(
                &signer.public_jwk().unwrap(),
                DEFAULT_SIGNATURE_VERIFIERS,
                &strict,
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
    }

    #[test]
    fn nonce_mismatch_and_absence_are_invalid_nonce() {
        let (signer, header, mut claims) = setup();

        claims.insert("nonce".to_owned(), json!("some-other-nonce"));
        assert_eq!(
            code_of(verify(&sign_proof_jwt(&header, &claims, &signer), &signer)),
            ErrorCode::InvalidNonce
        );

        claims.remove("nonce");
        let jwt = sign_proof_jwt(&header, &claims, &signer);
        assert_eq!(code_of(verify(&jwt, &signer)), ErrorCode::InvalidNonce);

        // without an expected nonce, none is required
        jwt.verify(
            &signer.public_jwk().unwrap(),
            DEFAULT_SIGNATURE_VERIFIERS,
            &VerifyProofOptions::default().with_audience(ISSUER),
            NOW,
        )
        .unwrap();
    }

    #[test]
    fn wrong_key_fails_signature_check() {
        let (signer, header, claims) = setup();
        let jwt = sign_proof_jwt(&header, &claims, &signer);
        let other = OpensslSigner::generate(SigningAlgorithm::Es256).unwrap();

        assert_eq!(code_of(verify(&jwt, &other)), ErrorCode::InvalidProof);
    }

    #[test]
    fn tampered_payload_fails_signature_check() {
        let (signer, header, claims) = setup();
        let jwt = sign_proof_jwt(&header, &claims, &signer);

        let mut forged_claims = claims.clone();
        forged_claims.insert("iss".to_owned(), json!("attacker"));
        let forged = unsigned_jwt(&header, &forged_claims);
        let signature = jwt.as_str().rsplit('.').next().unwrap();
        let forged = ProofJwt::new(format!(
            "{}{}",
            forged.as_str().trim_end_matches(|c| c != '.'),
            signature
        ));

        assert_eq!(code_of(verify(&forged, &signer)), ErrorCode::InvalidProof);
    }

    #[test]
    fn unsupported_algorithm_option() {
        let (signer, header, claims) = setup();
        let jwt = sign_proof_jwt(&header, &claims, &signer);
        let only_eddsa = options().with_supported_algorithms([SigningAlgorithm::EdDsa]);

        let err = jwt
            .verify(
                &signer.public_jwk().unwrap(),
                DEFAULT_SIGNATURE_VERIFIERS,
                &only_eddsa,
                NOW,
            )
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
    }

    #[test]
    fn missing_verifier_is_invalid_proof() {
        let (signer, header, claims) = setup();
        let jwt = sign_proof_jwt(&header, &claims, &signer);

        let err = jwt
            .verify(&signer.public_jwk().unwrap(), &[], &options(), NOW)
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidProof);
    }

    #[test]
    fn malformed_compact_serialization() {
        for jwt in ["", "abc", "a.b", "a.b.c.d", "e30.e30", "!.e30.e30"] {
            assert_matches!(
                ProofJwt::new(jwt).validate_structure(),
                Err(err) if err.error.code == ErrorCode::InvalidCredentialRequest,
                "{jwt}"
            );
        }
    }

    #[test]
    fn bound_key_by_reference() {
        let (signer, mut header, claims) = setup();
        header.remove("jwk");
        header.insert("kid".to_owned(), json!("did:example:123#0"));
        let jwt = sign_proof_jwt(&header, &claims, &signer);
        assert_eq!(
            jwt.extract_bound_key().unwrap(),
            KeyRef::Kid("did:example:123#0".to_owned())
        );

        header.remove("kid");
        header.insert("x5c".to_owned(), json!(["MIIBcert", "MIIBca"]));
        let jwt = sign_proof_jwt(&header, &claims, &signer);
        assert_eq!(
            jwt.extract_bound_key().unwrap(),
            KeyRef::X5c(vec!["MIIBcert".to_owned(), "MIIBca".to_owned()])
        );
    }

    #[test]
    fn unknown_members_are_preserved() {
        let (signer, mut header, mut claims) = setup();
        header.insert("key_attestation".to_owned(), json!("a.b.c"));
        claims.insert("client_data".to_owned(), json!({ "nested": true }));

        let decoded = sign_proof_jwt(&header, &claims, &signer).decode().unwrap();
        assert_eq!(decoded.header.additional["key_attestation"], "a.b.c");
        assert_eq!(decoded.claims.additional["client_data"], json!({ "nested": true }));
    }
}
