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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate implements the issuer and wallet side building blocks of
//! [OpenID for Verifiable Credential Issuance][1] which do not depend on a
//! particular HTTP stack or storage.
//!
//! [1]: https://openid.net/specs/openid-4-verifiable-credential-issuance-1_0.html
//!
//! # Details
//!
//! - [`offer`] encodes and decodes Credential Offers, by value and by
//!   reference, and optionally renders them as QR codes (feature `qr`).
//! - [`proof`] verifies the key proofs of a [`CredentialRequest`] and
//!   extracts the keys the credentials are to be bound to.
//! - [`CredentialRequest`], [`CredentialResponse`], [`NotificationRequest`]
//!   and [`TokenResponse`] are the messages of the issuer endpoints, decoded
//!   into [`Error`]s carrying the protocol [`ErrorCode`] to answer with.
//! - [`metadata`] holds the Credential Issuer Metadata and signs it.
//! - [`pkce`] and [`generate_nonce`] cover PKCE and `c_nonce` generation.
//!
//! Key proof JWTs and signed metadata use the [`jws`] module, backed by
//! [`openssl`](https://docs.rs/openssl).
//!
//! # Examples
//!
//! ## Offer a credential by value
//!
//! ```
//! use bh_oid4vci::offer::{decode_offer, CredentialOfferParameters, GrantPreAuthorizedCode};
//!
//! let params = CredentialOfferParameters::new("https://issuer.example", ["PDA1Credential"])
//!     .with_grant(GrantPreAuthorizedCode {
//!         pre_authorized_code: "oaKazRN8I0IbtZ0C7JuMn5".to_owned(),
//!         tx_code: None,
//!         authorization_server: None,
//!     });
//!
//! let offer = params.encode().unwrap();
//! assert!(offer.as_str().starts_with("credential_offer="));
//!
//! let decoded = decode_offer(offer.as_str()).unwrap();
//! assert_eq!(decoded, params);
//! ```
//!
//! ## Verify the key proofs of a Credential Request
//!
//! ```
//! use bh_oid4vci::{CredentialRequest, ErrorCode, ProofVerifier, VerifyProofOptions};
//!
//! let body = r#"{
//!     "credential_configuration_id": "PDA1Credential",
//!     "proofs": { "jwt": ["not-a-jwt"] }
//! }"#;
//! let request = CredentialRequest::from_json(body).unwrap();
//!
//! let options = VerifyProofOptions::default()
//!     .with_audience("https://issuer.example")
//!     .with_c_nonce("tZignsnFbp");
//! let err = ProofVerifier::default()
//!     .verify_request(&request, &options, 1_700_000_000)
//!     .unwrap_err();
//!
//! assert_eq!(err.error.code, ErrorCode::InvalidCredentialRequest);
//! ```

mod error;
mod nonce;
mod request;
mod token;
mod utils;

pub mod jws;
pub mod metadata;
pub mod offer;
pub mod pkce;
pub mod proof;

#[cfg(test)]
mod test_utils;

pub use error::{status_code_for, Error, ErrorCode, Result};
pub use nonce::{generate_nonce, generate_nonce_with, MAX_NONCE_BYTES, MIN_NONCE_BYTES};
pub use proof::{KeyRef, Proofs, ProofType, ProofVerifier, VerifyProofOptions};
pub use request::{
    CredentialOutcome, CredentialRequest, CredentialResponse, CredentialResponseEncryption,
    CredentialSelector, IssuedCredential, NotificationEvent, NotificationRequest,
};
pub use token::{AuthorizationDetail, TokenResponse, OPENID_CREDENTIAL_TYPE};
pub use utils::{base64_url_decode, base64_url_encode, OneOrMany, SecondsSinceEpoch};

