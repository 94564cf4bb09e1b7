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

//! Proof Key for Code Exchange ([RFC 7636][1]).
//!
//! [1]: https://www.rfc-editor.org/rfc/rfc7636

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    error::{reject, ErrorCode},
    utils::base64_url_encode,
    Result,
};

/// Number of random bytes behind a generated code verifier.
const CODE_VERIFIER_ENTROPY_BYTES: usize = 32;

/// Minimal length of a code verifier, in characters.
pub const CODE_VERIFIER_MIN_LEN: usize = 43;

/// Maximal length of a code verifier, in characters.
pub const CODE_VERIFIER_MAX_LEN: usize = 128;

/// The transformation applied to the code verifier to obtain the challenge.
#[derive(
    strum_macros::Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum CodeChallengeMethod {
    /// `BASE64URL(SHA256(code_verifier))`
    #[strum(to_string = "S256")]
    #[serde(rename = "S256")]
    S256,
    /// The challenge is the verifier itself.
    #[strum(to_string = "plain")]
    #[serde(rename = "plain")]
    Plain,
}

impl std::str::FromStr for CodeChallengeMethod {
    type Err = bherror::Error<crate::Error>;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "S256" => Ok(CodeChallengeMethod::S256),
            "plain" => Ok(CodeChallengeMethod::Plain),
            other => reject(
                ErrorCode::InvalidRequest,
                format!("unsupported code_challenge_method '{other}'"),
            ),
        }
    }
}

/// Generates a fresh code verifier from the thread-local CSPRNG.
///
/// The verifier carries 256 bits of entropy and is 43 characters long.
pub fn create_code_verifier() -> String {
    create_code_verifier_with(&mut rand::thread_rng())
}

/// Generates a fresh code verifier from the given cryptographically secure
/// generator.
pub fn create_code_verifier_with<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> String {
    let mut verifier = [0u8; CODE_VERIFIER_ENTROPY_BYTES];
    rng.fill_bytes(&mut verifier);
    base64_url_encode(verifier)
}

/// Derives the code challenge for `verifier` with the given `method`.
pub fn create_code_challenge(method: CodeChallengeMethod, verifier: &str) -> String {
    match method {
        CodeChallengeMethod::S256 => base64_url_encode(openssl::sha::sha256(verifier.as_bytes())),
        CodeChallengeMethod::Plain => verifier.to_owned(),
    }
}

/// Checks that an externally supplied code verifier has between 43 and 128
/// characters from the unreserved set `[A-Za-z0-9-._~]`.
pub fn validate_code_verifier(verifier: &str) -> Result<()> {
    let len = verifier.len();
    if !(CODE_VERIFIER_MIN_LEN..=CODE_VERIFIER_MAX_LEN).contains(&len) {
        return reject(
            ErrorCode::InvalidRequest,
            format!(
                "code_verifier must be between {CODE_VERIFIER_MIN_LEN} and \
                 {CODE_VERIFIER_MAX_LEN} characters long, got {len}"
            ),
        );
    }

    let is_unreserved =
        |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~');
    if !verifier.chars().all(is_unreserved) {
        return reject(
            ErrorCode::InvalidRequest,
            "code_verifier contains characters outside of the unreserved set",
        );
    }

    Ok(())
}

/// Verifies that `verifier` produces `challenge` under `method`.
///
/// The verifier is validated with [`validate_code_verifier`] first; a mismatch
/// is reported as [`ErrorCode::InvalidGrant`].
pub fn verify_code_challenge(
    method: CodeChallengeMethod,
    verifier: &str,
    challenge: &str,
) -> Result<()> {
    validate_code_verifier(verifier)?;

    let expected = create_code_challenge(method, verifier);
    let matches = expected.len() == challenge.len()
        && openssl::memcmp::eq(expected.as_bytes(), challenge.as_bytes());

    if !matches {
        return reject(
            ErrorCode::InvalidGrant,
            "code_verifier does not match the code_challenge",
        );
    }

    Ok(())
}
