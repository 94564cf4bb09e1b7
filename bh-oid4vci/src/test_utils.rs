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

//! Fixtures shared by the unit tests.

use crate::{
    jws::{sign_compact, JsonObject, OpensslSigner, Signer as _},
    json_object,
    proof::{ProofAttestation, ProofJwt, KEY_ATTESTATION_TYP, PROOF_JWT_TYP},
    utils::{base64_url_encode, SecondsSinceEpoch},
};

pub(crate) const ISSUER: &str = "https://issuer.example";
pub(crate) const NONCE: &str = "tZignsnFbp";
pub(crate) const NOW: SecondsSinceEpoch = 1_700_000_000;

pub(crate) fn proof_jwt_header(signer: &OpensslSigner) -> JsonObject {
    json_object!({
        "alg": signer.algorithm(),
        "typ": PROOF_JWT_TYP,
        "jwk": signer.public_jwk().unwrap(),
    })
}

pub(crate) fn proof_jwt_claims() -> JsonObject {
    json_object!({
        "iss": "wallet-client-id",
        "aud": ISSUER,
        "iat": NOW - 10,
        "nonce": NONCE,
    })
}

pub(crate) fn sign_proof_jwt(
    header: &JsonObject,
    claims: &JsonObject,
    signer: &OpensslSigner,
) -> ProofJwt {
    ProofJwt::new(sign_compact(header, claims, signer).unwrap())
}

/// A JWT with an empty signature segment.
pub(crate) fn unsigned_jwt(header: &JsonObject, claims: &JsonObject) -> ProofJwt {
    ProofJwt::new(format!(
        "{}.{}.",
        base64_url_encode(serde_json::to_vec(header).unwrap()),
        base64_url_encode(serde_json::to_vec(claims).unwrap()),
    ))
}

pub(crate) fn sign_attestation(issuer: &OpensslSigner, wallet: &OpensslSigner) -> ProofAttestation {
    let header = json_object!({
        "alg": issuer.algorithm(),
        "typ": KEY_ATTESTATION_TYP,
        "kid": "wallet-provider#1",
    });
    let claims = json_object!({
        "iss": "https://wallet-provider.example",
        "iat": NOW - 60,
        "exp": NOW + 86_400,
        "attested_keys": [wallet.public_jwk().unwrap()],
        "key_storage": ["iso_18045_high"],
        "user_authentication": ["iso_18045_high"],
        "nonce": NONCE,
    });

    ProofAttestation::new(sign_compact(&header, &claims, issuer).unwrap())
}

pub(crate) fn di_vp_document() -> JsonObject {
    json_object!({
        "@context": [
            "https://www.w3.org/ns/credentials/v2",
            "https://www.w3.org/ns/credentials/examples/v2"
        ],
        "type": ["VerifiablePresentation"],
        "holder": "did:example:holder",
        "proof": {
            "type": "DataIntegrityProof",
            "cryptosuite": "eddsa-rdfc-2022",
            "proofPurpose": "authentication",
            "verificationMethod": "did:example:holder#key-1",
            "created": "2023-03-01T14:56:29.280619Z",
            "challenge": NONCE,
            "domain": ISSUER,
            "proofValue": "z5hrbHzZiqXHNpLq6i7zePEUcUzEbZKmWfNQzXcUXUrqF7bykZP9tpWF1H8c6QiHGRLWrqq3aJLf8AcrFMhz1E4LT",
        },
    })
}
