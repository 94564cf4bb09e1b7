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

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{DataIntegrityVerifier, KeyRef, VerifyProofOptions};
use crate::{
    error::malformed,
    jws::JsonObject,
    utils::OneOrMany,
    Result,
};

/// The `type` every presentation used as a key proof must include.
pub const VERIFIABLE_PRESENTATION_TYPE: &str = "VerifiablePresentation";

/// The only `proofPurpose` accepted on a key proof.
pub const AUTHENTICATION_PROOF_PURPOSE: &str = "authentication";

/// A W3C Verifiable Presentation secured with a Data Integrity proof.
///
/// Wallets send the document either as a JSON object or as a string holding
/// the serialized object; both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProofDiVp(JsonObject);

/// The typed view of a [`ProofDiVp`] document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiVpPresentation {
    /// JSON-LD contexts.
    #[serde(rename = "@context")]
    pub context: OneOrMany<Value>,
    /// Presentation types.
    #[serde(rename = "type")]
    pub types: OneOrMany<String>,
    /// The proofs securing the presentation.
    pub proof: OneOrMany<DataIntegrityProof>,
    /// The holder of the presentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    /// Presentation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Unknown members.
    #[serde(flatten)]
    pub additional: JsonObject,
}

/// A Data Integrity proof securing a presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIntegrityProof {
    /// Usually `DataIntegrityProof`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub proof_type: Option<String>,
    /// The cryptosuite the proof value was produced with.
    pub cryptosuite: Cryptosuite,
    /// Always [`AUTHENTICATION_PROOF_PURPOSE`].
    pub proof_purpose: String,
    /// Reference to the key that produced the proof.
    pub verification_method: String,
    /// The Credential Issuer the presentation is addressed to.
    pub domain: String,
    /// The `c_nonce` provided by the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    /// Creation time, as an XML Schema date-time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// The encoded proof value.
    pub proof_value: String,
    /// Unknown members.
    #[serde(flatten)]
    pub additional: JsonObject,
}

/// Data Integrity cryptosuites accepted on a key proof.
#[derive(
    strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Cryptosuite {
    /// `eddsa-rdfc-2022`
    EddsaRdfc2022,
    /// `ecdsa-rdfc-2019`
    EcdsaRdfc2019,
    /// `ecdsa-sd-2023`
    EcdsaSd2023,
    /// `eddsa-jcs-2022`
    EddsaJcs2022,
    /// `ecdsa-jcs-2019`
    EcdsaJcs2019,
}

impl Cryptosuite {
    /// Every accepted cryptosuite.
    pub const ALL: [Cryptosuite; 5] = [
        Cryptosuite::EddsaRdfc2022,
        Cryptosuite::EcdsaRdfc2019,
        Cryptosuite::EcdsaSd2023,
        Cryptosuite::EddsaJcs2022,
        Cryptosuite::EcdsaJcs2019,
    ];

    fn from_wire(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|suite| suite.to_string() == name)
    }
}

impl<'de> Deserialize<'de> for ProofDiVp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Object(JsonObject),
            Serialized(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Object(document) => Ok(Self(document)),
            Wire::Serialized(document) => serde_json::from_str(&document)
                .map(Self)
                .map_err(serde::de::Error::custom),
        }
    }
}

impl ProofDiVp {
    /// Wraps a presentation document.
    pub fn new(document: JsonObject) -> Self {
        Self(document)
    }

    /// The raw presentation document.
    pub fn document(&self) -> &JsonObject {
        &self.0
    }

    /// Checks the presentation and each of its proofs, returning the typed
    /// presentation.
    ///
    /// No cryptographic check happens here.
    pub fn decode(&self) -> Result<DiVpPresentation> {
        let document = &self.0;

        match document.get("@context") {
            None => return malformed("@context not found in di_vp proof"),
            Some(Value::Array(contexts)) if contexts.is_empty() => {
                return malformed("@context must not be empty")
            }
            Some(Value::String(context)) if context.is_empty() => {
                return malformed("@context must not be empty")
            }
            Some(Value::Array(_) | Value::String(_)) => {}
            Some(_) => return malformed("@context must be a string or an array"),
        }

        let includes_presentation_type = match document.get("type") {
            Some(Value::String(value)) => value == VERIFIABLE_PRESENTATION_TYPE,
            Some(Value::Array(values)) => values
                .iter()
                .any(|value| value.as_str() == Some(VERIFIABLE_PRESENTATION_TYPE)),
            _ => false,
        };
        if !includes_presentation_type {
            return malformed(format!("type must include {VERIFIABLE_PRESENTATION_TYPE}"));
        }

        let proofs: Vec<&Value> = match document.get("proof") {
            Some(Value::Array(proofs)) if !proofs.is_empty() => proofs.iter().collect(),
            Some(proof @ Value::Object(_)) => vec![proof],
            _ => return malformed("proof not found in di_vp proof"),
        };
        for proof in proofs {
            check_proof(proof)?;
        }

        serde_json::from_value(Value::Object(document.clone()))
            .or_else(|error| malformed(format!("malformed di_vp proof: {error}")))
    }

    /// Runs the structural checks of [`ProofDiVp::decode`].
    pub fn validate_structure(&self) -> Result<()> {
        self.decode().map(|_| ())
    }

    /// Checks every proof's `domain` and `challenge` against the context and
    /// hands them to `verifier` for the cryptosuite-specific check.
    pub fn verify(
        &self,
        verifier: &dyn DataIntegrityVerifier,
        options: &VerifyProofOptions,
    ) -> Result<()> {
        let presentation = self.decode()?;

        for proof in presentation.proof.iter() {
            if let Some(audience) = &options.audience {
                if &proof.domain != audience {
                    return malformed(format!("domain does not match '{audience}'"));
                }
            }
            options.check_nonce(proof.challenge.as_deref(), "challenge")?;
        }

        for proof in presentation.proof.iter() {
            verifier.verify(&presentation, proof)?;
        }

        Ok(())
    }

    /// Returns the `verificationMethod` of the first proof, unresolved.
    pub fn extract_bound_key(&self) -> Result<KeyRef> {
        let presentation = self.decode()?;

        match presentation.proof.first() {
            Some(proof) => Ok(KeyRef::VerificationMethod(
                proof.verification_method.clone(),
            )),
            None => malformed("proof not found in di_vp proof"),
        }
    }

    /// Returns the `holder` of the presentation.
    pub fn subject_of(&self) -> Result<Option<String>> {
        Ok(self.decode()?.holder)
    }
}

fn check_proof(proof: &Value) -> Result<()> {
    let Some(proof) = proof.as_object() else {
        return malformed("di_vp proof entries must be JSON objects");
    };
    let member = |name: &str| proof.get(name).and_then(Value::as_str);

    match member("proofPurpose") {
        Some(AUTHENTICATION_PROOF_PURPOSE) => {}
        Some(purpose) => {
            return malformed(format!(
                "proofPurpose must be '{AUTHENTICATION_PROOF_PURPOSE}', found '{purpose}'"
            ))
        }
        None => return malformed("proofPurpose not found in di_vp proof"),
    }

    match member("cryptosuite") {
        Some(suite) if Cryptosuite::from_wire(suite).is_some() => {}
        Some(suite) => return malformed(format!("cryptosuite '{suite}' is not supported")),
        None => return malformed("cryptosuite not found in di_vp proof"),
    }

    for required in ["verificationMethod", "domain", "proofValue"] {
        if member(required).is_none() {
            return malformed(format!("{required} not found in di_vp proof"));
        }
    }

    Ok(())
}
