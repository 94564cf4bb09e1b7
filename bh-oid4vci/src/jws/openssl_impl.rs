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

use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error, Result,
};
use openssl::{
    bn::{BigNum, BigNumContext},
    ec::{EcGroup, EcKey},
    ecdsa::EcdsaSig,
    hash::{hash, MessageDigest},
    nid::Nid,
    pkey::{Id, PKey, Private, Public},
    rsa::{Padding, Rsa},
    sign::RsaPssSaltlen,
};

use super::{BoxError, JwkPublic, JwsError, SignatureVerifier, Signer, SigningAlgorithm};
use crate::utils::{base64_url_decode, base64_url_encode};

/// Smallest RSA modulus accepted for signing or verification, in bits.
const RSA_MIN_MODULUS_BITS: u32 = 2048;

const ED25519_KEY_LEN: usize = 32;

/// Verifiers for every [`SigningAlgorithm`], backed by OpenSSL.
pub static DEFAULT_SIGNATURE_VERIFIERS: &[&dyn SignatureVerifier] = &[
    &OpensslVerifier(SigningAlgorithm::Es256),
    &OpensslVerifier(SigningAlgorithm::Es384),
    &OpensslVerifier(SigningAlgorithm::Es512),
    &OpensslVerifier(SigningAlgorithm::Ps256),
    &OpensslVerifier(SigningAlgorithm::Ps384),
    &OpensslVerifier(SigningAlgorithm::Ps512),
    &OpensslVerifier(SigningAlgorithm::Rs256),
    &OpensslVerifier(SigningAlgorithm::Rs384),
    &OpensslVerifier(SigningAlgorithm::Rs512),
    &OpensslVerifier(SigningAlgorithm::EdDsa),
];

/// The way an algorithm uses its key.
enum KeyKind {
    Ec(Curve),
    Rsa { pss: bool },
    Ed25519,
}

/// An elliptic curve paired with the digest its JWS algorithm prescribes.
struct Curve {
    nid: Nid,
    crv: &'static str,
    coordinate_len: usize,
}

// X9_62_PRIME256V1 is an alias for secp256r1, i.e. NIST P-256
const P256: Curve = Curve {
    nid: Nid::X9_62_PRIME256V1,
    crv: "P-256",
    coordinate_len: 32,
};
const P384: Curve = Curve {
    nid: Nid::SECP384R1,
    crv: "P-384",
    coordinate_len: 48,
};
const P521: Curve = Curve {
    nid: Nid::SECP521R1,
    crv: "P-521",
    coordinate_len: 66,
};

impl SigningAlgorithm {
    fn key_kind(&self) -> KeyKind {
        match self {
            Self::Es256 => KeyKind::Ec(P256),
            Self::Es384 => KeyKind::Ec(P384),
            Self::Es512 => KeyKind::Ec(P521),
            Self::Ps256 | Self::Ps384 | Self::Ps512 => KeyKind::Rsa { pss: true },
            Self::Rs256 | Self::Rs384 | Self::Rs512 => KeyKind::Rsa { pss: false },
            Self::EdDsa => KeyKind::Ed25519,
        }
    }

    fn message_digest(&self) -> MessageDigest {
        match self {
            Self::Es256 | Self::Ps256 | Self::Rs256 => MessageDigest::sha256(),
            Self::Es384 | Self::Ps384 | Self::Rs384 => MessageDigest::sha384(),
            // EdDSA hashes internally; the digest is never used for it
            Self::Es512 | Self::Ps512 | Self::Rs512 | Self::EdDsa => MessageDigest::sha512(),
        }
    }
}

/// [`Signer`] implementation for every [`SigningAlgorithm`], backed by OpenSSL.
pub struct OpensslSigner {
    algorithm: SigningAlgorithm,
    private_key: PKey<Private>,
    kid: Option<String>,
}

impl OpensslSigner {
    /// Generate a fresh key suitable for `algorithm`.
    ///
    /// RSA keys are generated with a 2048-bit modulus.
    pub fn generate(algorithm: SigningAlgorithm) -> Result<Self, JwsError> {
        let private_key = match algorithm.key_kind() {
            KeyKind::Ec(curve) => {
                let group = EcGroup::from_curve_name(curve.nid)
                    .foreign_err(|| JwsError::CryptoBackend)?;
                let ec_key =
                    EcKey::generate(&group).foreign_err(|| JwsError::KeyGenerationFailed)?;
                PKey::from_ec_key(ec_key)
            }
            KeyKind::Rsa { .. } => {
                let rsa = Rsa::generate(RSA_MIN_MODULUS_BITS)
                    .foreign_err(|| JwsError::KeyGenerationFailed)?;
                PKey::from_rsa(rsa)
            }
            KeyKind::Ed25519 => PKey::generate_ed25519(),
        }
        .foreign_err(|| JwsError::KeyGenerationFailed)?;

        Ok(Self {
            algorithm,
            private_key,
            kid: None,
        })
    }

    /// Create a signer for `algorithm` from a private key in the PEM format.
    ///
    /// The key type (and curve or modulus size) must fit the algorithm.
    pub fn from_private_key_pem(
        algorithm: SigningAlgorithm,
        private_key_pem: &[u8],
    ) -> Result<Self, JwsError> {
        let private_key = PKey::private_key_from_pem(private_key_pem)
            .foreign_err(|| JwsError::JwkParsingFailed("invalid PEM private key".to_owned()))?;

        let fits = match algorithm.key_kind() {
            KeyKind::Ec(curve) => private_key
                .ec_key()
                .ok()
                .and_then(|key| key.group().curve_name())
                .is_some_and(|nid| nid == curve.nid),
            KeyKind::Rsa { .. } => {
                private_key.id() == Id::RSA && private_key.bits() >= RSA_MIN_MODULUS_BITS
            }
            KeyKind::Ed25519 => private_key.id() == Id::ED25519,
        };
        if !fits {
            return Err(Error::root(JwsError::JwkParsingFailed(format!(
                "private key does not fit {algorithm}"
            ))));
        }

        Ok(Self {
            algorithm,
            private_key,
            kid: None,
        })
    }

    /// Sets the `kid` member of the public JWK.
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    fn public_jwk_inner(&self) -> Result<JwkPublic, JwsError> {
        let mut jwk = match self.algorithm.key_kind() {
            KeyKind::Ec(curve) => {
                let ec_key = self
                    .private_key
                    .ec_key()
                    .foreign_err(|| JwsError::CryptoBackend)?;
                let mut x = BigNum::new().foreign_err(|| JwsError::CryptoBackend)?;
                let mut y = BigNum::new().foreign_err(|| JwsError::CryptoBackend)?;
                let mut ctx = BigNumContext::new().foreign_err(|| JwsError::CryptoBackend)?;
                ec_key
                    .public_key()
                    .affine_coordinates(ec_key.group(), &mut x, &mut y, &mut ctx)
                    .foreign_err(|| JwsError::CryptoBackend)?;

                crate::json_object!({
                    "kty": "EC",
                    "crv": curve.crv,
                    "x": base64_url_encode(padded(&x, curve.coordinate_len)?),
                    "y": base64_url_encode(padded(&y, curve.coordinate_len)?),
                })
            }
            KeyKind::Rsa { .. } => {
                let rsa = self
                    .private_key
                    .rsa()
                    .foreign_err(|| JwsError::CryptoBackend)?;
                crate::json_object!({
                    "kty": "RSA",
                    "n": base64_url_encode(rsa.n().to_vec()),
                    "e": base64_url_encode(rsa.e().to_vec()),
                })
            }
            KeyKind::Ed25519 => {
                let x = self
                    .private_key
                    .raw_public_key()
                    .foreign_err(|| JwsError::CryptoBackend)?;
                crate::json_object!({
                    "kty": "OKP",
                    "crv": "Ed25519",
                    "x": base64_url_encode(x),
                })
            }
        };

        jwk.insert("alg".to_owned(), self.algorithm.as_str().into());
        if let Some(kid) = &self.kid {
            jwk.insert("kid".to_owned(), kid.as_str().into());
        }

        Ok(jwk)
    }
}

impl Signer for OpensslSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    fn sign(&self, message: &[u8]) -> std::result::Result<Vec<u8>, BoxError> {
        let digest = self.algorithm.message_digest();

        match self.algorithm.key_kind() {
            KeyKind::Ec(curve) => {
                let ec_key = self.private_key.ec_key()?;
                let signature = EcdsaSig::sign(&hash(digest, message)?, &ec_key)?;

                let mut jws = padded(signature.r(), curve.coordinate_len)?;
                jws.extend(padded(signature.s(), curve.coordinate_len)?);
                Ok(jws)
            }
            KeyKind::Rsa { pss } => {
                let mut signer = openssl::sign::Signer::new(digest, &self.private_key)?;
                if pss {
                    signer.set_rsa_padding(Padding::PKCS1_PSS)?;
                    signer.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
                    signer.set_rsa_mgf1_md(digest)?;
                }
                signer.update(message)?;
                Ok(signer.sign_to_vec()?)
            }
            KeyKind::Ed25519 => {
                let mut signer = openssl::sign::Signer::new_without_digest(&self.private_key)?;
                Ok(signer.sign_oneshot_to_vec(message)?)
            }
        }
    }

    fn public_jwk(&self) -> std::result::Result<JwkPublic, BoxError> {
        Ok(self.public_jwk_inner()?)
    }
}

/// [`SignatureVerifier`] implementation for a single [`SigningAlgorithm`],
/// backed by OpenSSL.
///
/// The public JWK must match the algorithm: an `EC` key on the right curve,
/// an `RSA` key of at least 2048 bits, or an `OKP` Ed25519 key.
#[derive(Debug, Clone, Copy)]
pub struct OpensslVerifier(pub SigningAlgorithm);

impl SignatureVerifier for OpensslVerifier {
    fn algorithm(&self) -> SigningAlgorithm {
        self.0
    }

    fn verify(
        &self,
        message: &[u8],
        signature: &[u8],
        public_key: &JwkPublic,
    ) -> std::result::Result<bool, BoxError> {
        let digest = self.0.message_digest();

        match self.0.key_kind() {
            KeyKind::Ec(curve) => {
                let public_key = ec_public_key_from_jwk(public_key, &curve)?;
                if signature.len() != 2 * curve.coordinate_len {
                    return Ok(false);
                }
                let (r, s) = signature.split_at(curve.coordinate_len);
                let ecdsa_sig =
                    EcdsaSig::from_private_components(BigNum::from_slice(r)?, BigNum::from_slice(s)?)?;

                Ok(ecdsa_sig.verify(&hash(digest, message)?, &public_key)?)
            }
            KeyKind::Rsa { pss } => {
                let public_key = rsa_public_key_from_jwk(public_key)?;
                let mut verifier = openssl::sign::Verifier::new(digest, &public_key)?;
                if pss {
                    verifier.set_rsa_padding(Padding::PKCS1_PSS)?;
                    verifier.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
                    verifier.set_rsa_mgf1_md(digest)?;
                }
                verifier.update(message)?;
                Ok(verifier.verify(signature)?)
            }
            KeyKind::Ed25519 => {
                let public_key = ed25519_public_key_from_jwk(public_key)?;
                let mut verifier = openssl::sign::Verifier::new_without_digest(&public_key)?;
                Ok(verifier.verify_oneshot(signature, message)?)
            }
        }
    }
}

fn padded(number: &openssl::bn::BigNumRef, len: usize) -> Result<Vec<u8>, JwsError> {
    let len = i32::try_from(len).foreign_err(|| JwsError::CryptoBackend)?;
    number
        .to_vec_padded(len)
        .foreign_err(|| JwsError::CryptoBackend)
}

fn ec_public_key_from_jwk(
    public_key: &JwkPublic,
    curve: &Curve,
) -> Result<EcKey<Public>, JwsError> {
    check_jwk_field(public_key, "kty", "EC")?;
    check_jwk_field(public_key, "crv", curve.crv)?;

    let x = parse_member(public_key, "x")?;
    let y = parse_member(public_key, "y")?;
    if x.len() != curve.coordinate_len || y.len() != curve.coordinate_len {
        return Err(Error::root(JwsError::JwkParsingFailed(format!(
            "{} coordinates must be {} bytes long",
            curve.crv, curve.coordinate_len
        ))));
    }

    let group = EcGroup::from_curve_name(curve.nid).foreign_err(|| JwsError::CryptoBackend)?;
    let x = BigNum::from_slice(&x).foreign_err(|| JwsError::CryptoBackend)?;
    let y = BigNum::from_slice(&y).foreign_err(|| JwsError::CryptoBackend)?;

    EcKey::from_public_key_affine_coordinates(&group, &x, &y).foreign_err(|| {
        JwsError::JwkParsingFailed("coordinates are not a point on the curve".to_owned())
    })
}

fn rsa_public_key_from_jwk(public_key: &JwkPublic) -> Result<PKey<Public>, JwsError> {
    check_jwk_field(public_key, "kty", "RSA")?;

    let n = BigNum::from_slice(&parse_member(public_key, "n")?)
        .foreign_err(|| JwsError::CryptoBackend)?;
    let e = BigNum::from_slice(&parse_member(public_key, "e")?)
        .foreign_err(|| JwsError::CryptoBackend)?;

    let bits = n.num_bits();
    if bits < RSA_MIN_MODULUS_BITS as i32 {
        return Err(Error::root(JwsError::JwkParsingFailed(format!(
            "RSA modulus of {bits} bits is below the {RSA_MIN_MODULUS_BITS}-bit minimum"
        ))));
    }

    let rsa = Rsa::from_public_components(n, e).foreign_err(|| JwsError::CryptoBackend)?;
    PKey::from_rsa(rsa).foreign_err(|| JwsError::CryptoBackend)
}

fn ed25519_public_key_from_jwk(public_key: &JwkPublic) -> Result<PKey<Public>, JwsError> {
    check_jwk_field(public_key, "kty", "OKP")?;
    check_jwk_field(public_key, "crv", "Ed25519")?;

    let x = parse_member(public_key, "x")?;
    if x.len() != ED25519_KEY_LEN {
        return Err(Error::root(JwsError::JwkParsingFailed(
            "Ed25519 public key must be 32 bytes long".to_owned(),
        )));
    }

    PKey::public_key_from_raw_bytes(&x, Id::ED25519).foreign_err(|| JwsError::CryptoBackend)
}

fn check_jwk_field(
    public_key: &JwkPublic,
    field: &str,
    expected_value: &str,
) -> Result<(), JwsError> {
    let error = |message| Error::root(JwsError::JwkParsingFailed(message));

    let value = public_key
        .get(field)
        .ok_or_else(|| error(format!("missing \"{}\" field", field)))?;

    if value == expected_value {
        return Ok(());
    }

    Err(error(format!("incorrect value on \"{}\" field", field))).ctx(|| {
        format!(
            "value on field \"{}\" was {}, expected {}",
            field, value, expected_value
        )
    })
}

fn parse_member(public_key: &JwkPublic, member: &str) -> Result<Vec<u8>, JwsError> {
    let error = |message| Error::root(JwsError::JwkParsingFailed(message));

    let encoded = public_key
        .get(member)
        .ok_or_else(|| error(format!("missing \"{}\" field", member)))?
        .as_str()
        .ok_or_else(|| error(format!("\"{}\" field is not a string", member)))?;

    base64_url_decode(encoded)
        .foreign_err(|| JwsError::JwkParsingFailed(format!("decoding \"{member}\" failed")))
}
