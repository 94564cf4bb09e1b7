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

use std::io::Cursor;

use bherror::traits::ForeignError as _;
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::{
    error::{reject, ErrorCode},
    utils::base64_encode,
    Error, Result,
};

/// Wallet invocation scheme used when none is configured.
pub const DEFAULT_WALLET_SCHEME: &str = "openid-credential-offer://";

/// Largest accepted [`QrOptions::size`], in pixels.
pub const MAX_QR_SIZE: u32 = 4096;

/// Error correction level of a rendered QR code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryLevel {
    /// Recovers 7% of the data.
    Low,
    /// Recovers 15% of the data.
    #[default]
    Medium,
    /// Recovers 25% of the data.
    Quartile,
    /// Recovers 30% of the data.
    High,
}

impl From<RecoveryLevel> for EcLevel {
    fn from(level: RecoveryLevel) -> Self {
        match level {
            RecoveryLevel::Low => EcLevel::L,
            RecoveryLevel::Medium => EcLevel::M,
            RecoveryLevel::Quartile => EcLevel::Q,
            RecoveryLevel::High => EcLevel::H,
        }
    }
}

/// How a Credential Offer is rendered as a QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QrOptions {
    /// Error correction level.
    pub recovery_level: RecoveryLevel,
    /// Minimal width and height of the image, in pixels, at most
    /// [`MAX_QR_SIZE`].
    pub size: u32,
    /// The wallet endpoint the offer is sent to, e.g. a custom URL scheme.
    pub wallet_scheme: String,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            recovery_level: RecoveryLevel::Medium,
            size: 256,
            wallet_scheme: DEFAULT_WALLET_SCHEME.to_owned(),
        }
    }
}

/// A Credential Offer rendered for a wallet to scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferQr {
    /// PNG image, `base64` encoded.
    pub qr_base64: String,
    /// The deep link the image encodes.
    pub credential_offer_url: String,
}

pub(super) fn render(query: &str, options: &QrOptions) -> Result<OfferQr> {
    if options.size > MAX_QR_SIZE {
        return reject(
            ErrorCode::InvalidRequest,
            format!("QR code size must not exceed {MAX_QR_SIZE} pixels"),
        );
    }

    let scheme = if options.wallet_scheme.is_empty() {
        DEFAULT_WALLET_SCHEME
    } else {
        options.wallet_scheme.as_str()
    };
    let credential_offer_url = format!("{scheme}?{query}");

    let code = QrCode::with_error_correction_level(
        credential_offer_url.as_bytes(),
        options.recovery_level.into(),
    )
    .foreign_err(|| Error::new(ErrorCode::ServerError, "unable to encode the QR code"))?;

    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(options.size, options.size)
        .build();

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .foreign_err(|| Error::new(ErrorCode::ServerError, "unable to write the QR image"))?;

    tracing::debug!(
        width = image.width(),
        bytes = png.len(),
        "rendered credential offer QR code"
    );

    Ok(OfferQr {
        qr_base64: base64_encode(png),
        credential_offer_url,
    })
}
