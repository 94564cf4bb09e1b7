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

use rand::{CryptoRng, RngCore};

use crate::utils::base64_url_encode;

/// The smallest (and default) nonce entropy, in bytes.
pub const MIN_NONCE_BYTES: usize = 32;

/// The largest nonce entropy, in bytes.
pub const MAX_NONCE_BYTES: usize = 94;

/// Generates a `c_nonce` value from the thread-local CSPRNG.
///
/// The `requested_size` is the entropy in bytes; it is clamped to
/// [`MIN_NONCE_BYTES`]`..=`[`MAX_NONCE_BYTES`], with `0` meaning the minimum.
/// The result is `base64url`-encoded without padding, so the default nonce is
/// 43 characters long and the largest one 126.
pub fn generate_nonce(requested_size: usize) -> String {
    generate_nonce_with(&mut rand::thread_rng(), requested_size)
}

/// Same as [`generate_nonce`], drawing from the given generator.
pub fn generate_nonce_with<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    requested_size: usize,
) -> String {
    let size = requested_size.clamp(MIN_NONCE_BYTES, MAX_NONCE_BYTES);
    let mut nonce = vec![0u8; size];
    rng.fill_bytes(&mut nonce);
    base64_url_encode(nonce)
}

#[cfg(test)]
mod tests {
    use crate::utils::base64_url_decode;

    use super::*;

    #[test]
    fn default_size() {
        let nonce = generate_nonce(0);
        assert_eq!(nonce.len(), 43);
        assert_eq!(base64_url_decode(&nonce).unwrap().len(), MIN_NONCE_BYTES);
    }

    #[test]
    fn small_sizes_are_raised_to_minimum() {
        assert_eq!(generate_nonce(1).len(), 43);
        assert_eq!(generate_nonce(31).len(), 43);
    }

    #[test]
    fn large_sizes_are_clamped() {
        let nonce = generate_nonce(1000);
        assert_eq!(nonce.len(), 126);
        assert_eq!(base64_url_decode(&nonce).unwrap().len(), MAX_NONCE_BYTES);
        assert_eq!(generate_nonce(MAX_NONCE_BYTES).len(), 126);
    }

    #[test]
    fn sizes_in_range_are_kept() {
        let nonce = generate_nonce(48);
        assert_eq!(base64_url_decode(&nonce).unwrap().len(), 48);
    }

    #[test]
    fn nonces_are_unique() {
        let nonce = generate_nonce(0);
        let all_zero = base64_url_decode(&nonce).unwrap().into_iter().all(|b| b == 0);
        assert!(!all_zero);
        assert_ne!(nonce, generate_nonce(0));
    }
}
