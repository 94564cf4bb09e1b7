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

//! Credential Offers.
//!
//! An issuer starts an issuance flow by handing the wallet a Credential Offer,
//! either by value, as the `credential_offer` query parameter carrying the
//! JSON encoded [`CredentialOfferParameters`], or by reference, as the
//! `credential_offer_uri` query parameter pointing to where the wallet can
//! fetch them.

use bherror::{
    traits::{ErrorContext as _, ForeignError as _},
    Error as BhErr,
};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::{
    error::{reject, ErrorCode},
    Error, Result,
};

mod grant;
#[cfg(feature = "qr")]
mod qr;

pub use grant::{
    Grant, GrantAuthorizationCode, GrantPreAuthorizedCode, Grants, InputMode, KnownGrant, TxCode,
    AUTHORIZATION_CODE_GRANT_TYPE, PRE_AUTHORIZED_CODE_GRANT_TYPE, TX_CODE_DESCRIPTION_MAX_LEN,
};
#[cfg(feature = "qr")]
pub use qr::{OfferQr, QrOptions, RecoveryLevel, DEFAULT_WALLET_SCHEME, MAX_QR_SIZE};

/// Query parameter carrying an offer by value.
pub const CREDENTIAL_OFFER_PARAM: &str = "credential_offer";

/// Query parameter carrying an offer by reference.
pub const CREDENTIAL_OFFER_URI_PARAM: &str = "credential_offer_uri";

/// Path segment under the issuer URL that offers by reference live in.
pub const CREDENTIAL_OFFER_PATH: &str = "credential-offer";

/// The Credential Offer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialOfferParameters {
    /// The Credential Issuer identifier.
    pub credential_issuer: String,
    /// Keys of `credential_configurations_supported` in the issuer metadata.
    pub credential_configuration_ids: Vec<String>,
    /// The grants the issuer is prepared to process for this offer.
    #[serde(default, skip_serializing_if = "Grants::is_empty")]
    pub grants: Grants,
}

impl CredentialOfferParameters {
    /// Creates an offer of the given credential configurations, without
    /// grants.
    pub fn new(
        credential_issuer: impl Into<String>,
        credential_configuration_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            credential_issuer: credential_issuer.into(),
            credential_configuration_ids: credential_configuration_ids
                .into_iter()
                .map(Into::into)
                .collect(),
            grants: Grants::default(),
        }
    }

    /// Adds `grant`, replacing a previous grant of the same type.
    pub fn with_grant<G: KnownGrant>(mut self, grant: G) -> Self {
        self.grants.insert(grant);
        self
    }

    /// Checks that the issuer is an absolute URI, that configuration ids are
    /// present, non-empty and unique, and that the grants are well formed.
    pub fn validate(&self) -> Result<()> {
        if Url::parse(&self.credential_issuer).is_err() {
            return reject(
                ErrorCode::InvalidRequest,
                format!(
                    "credential_issuer '{}' is not an absolute URI",
                    self.credential_issuer
                ),
            );
        }

        if self.credential_configuration_ids.is_empty() {
            return reject(
                ErrorCode::InvalidRequest,
                "credential_configuration_ids must not be empty",
            );
        }
        for (index, id) in self.credential_configuration_ids.iter().enumerate() {
            if id.is_empty() {
                return reject(
                    ErrorCode::InvalidRequest,
                    "credential configuration ids must not be empty",
                );
            }
            if self.credential_configuration_ids[..index].contains(id) {
                return reject(
                    ErrorCode::InvalidRequest,
                    format!("credential configuration id '{id}' is offered twice"),
                );
            }
        }

        self.grants.validate()
    }

    /// Encodes the offer by value.
    pub fn encode(&self) -> Result<CredentialOffer> {
        self.validate()?;

        let json = serde_json::to_string(self)
            .foreign_err(|| Error::from_code(ErrorCode::ServerError))
            .ctx(|| "serializing credential offer")?;
        let query = serde_urlencoded::to_string([(CREDENTIAL_OFFER_PARAM, json)])
            .foreign_err(|| Error::from_code(ErrorCode::ServerError))
            .ctx(|| "encoding credential offer")?;

        Ok(CredentialOffer(query))
    }

    /// Mints a fresh by reference URI for this offer,
    /// `<credential_issuer>/credential-offer/<uuid>`.
    ///
    /// The caller stores the parameters under [`CredentialOfferUri::uuid`].
    pub fn by_reference(&self) -> Result<CredentialOfferUri> {
        self.validate()?;
        CredentialOfferUri::for_issuer(&self.credential_issuer, Uuid::new_v4())
    }
}

/// A Credential Offer by value, `credential_offer=<url-encoded JSON>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialOffer(String);

impl CredentialOffer {
    /// The query string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the offer parameters.
    pub fn decode(&self) -> Result<CredentialOfferParameters> {
        decode_offer(&self.0)
    }

    /// Renders the offer as a QR code encoding
    /// `<wallet_scheme>?credential_offer=...`.
    #[cfg(feature = "qr")]
    pub fn render_qr(&self, options: &QrOptions) -> Result<OfferQr> {
        qr::render(&self.0, options)
    }
}

impl std::fmt::Display for CredentialOffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Credential Offer by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialOfferUri(Url);

impl CredentialOfferUri {
    fn for_issuer(credential_issuer: &str, id: Uuid) -> Result<Self> {
        let mut url = Url::parse(credential_issuer)
            .foreign_err(|| Error::new(ErrorCode::InvalidRequest, "invalid credential_issuer"))?;

        {
            let Ok(mut segments) = url.path_segments_mut() else {
                return reject(
                    ErrorCode::InvalidRequest,
                    "credential_issuer cannot be a base URL",
                );
            };
            segments
                .pop_if_empty()
                .push(CREDENTIAL_OFFER_PATH)
                .push(&id.to_string());
        }

        Ok(Self(url))
    }

    /// Parses an absolute credential offer URI.
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri).foreign_err(|| {
            Error::new(ErrorCode::InvalidRequest, "credential_offer_uri is not a URI")
        })?;
        Ok(Self(url))
    }

    /// The URI.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Extracts the offer identifier from the last path segment.
    ///
    /// Fails when the URI does not end in `credential-offer/<uuid>`.
    pub fn uuid(&self) -> Result<Uuid> {
        let mut segments = self
            .0
            .path_segments()
            .map(|segments| segments.rev())
            .into_iter()
            .flatten();

        match (segments.next(), segments.next()) {
            (Some(id), Some(CREDENTIAL_OFFER_PATH)) => Uuid::parse_str(id).foreign_err(|| {
                Error::new(ErrorCode::InvalidRequest, "invalid credential offer id")
            }),
            _ => reject(
                ErrorCode::InvalidRequest,
                format!("'{}' is not a credential offer URI", self.0),
            ),
        }
    }

    /// Wraps the URI in a `credential_offer_uri=` query string.
    pub fn to_query(&self) -> Result<String> {
        serde_urlencoded::to_string([(CREDENTIAL_OFFER_URI_PARAM, self.as_str())])
            .foreign_err(|| Error::from_code(ErrorCode::ServerError))
            .ctx(|| "encoding credential offer uri")
    }

    /// Renders the reference as a QR code encoding
    /// `<wallet_scheme>?credential_offer_uri=...`.
    #[cfg(feature = "qr")]
    pub fn render_qr(&self, options: &QrOptions) -> Result<OfferQr> {
        qr::render(&self.to_query()?, options)
    }
}

impl TryFrom<String> for CredentialOfferUri {
    type Error = BhErr<Error>;

    fn try_from(uri: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&uri)
    }
}

impl From<CredentialOfferUri> for String {
    fn from(uri: CredentialOfferUri) -> Self {
        uri.0.into()
    }
}

impl std::fmt::Display for CredentialOfferUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// A Credential Offer as received by a wallet.
#[derive(Debug, Clone, PartialEq)]
pub enum OfferPayload {
    /// The offer parameters themselves.
    ByValue(CredentialOfferParameters),
    /// Where to fetch the offer parameters from.
    ByReference(CredentialOfferUri),
}

impl OfferPayload {
    /// Parses a bare query string or any URI carrying either
    /// `credential_offer` or `credential_offer_uri`.
    pub fn parse(offer: &str) -> Result<Self> {
        let params = query_params(offer)?;
        let find = |name: &str| {
            params
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        match (find(CREDENTIAL_OFFER_PARAM), find(CREDENTIAL_OFFER_URI_PARAM)) {
            (Some(offer), None) => parse_parameters(offer).map(Self::ByValue),
            (None, Some(uri)) => CredentialOfferUri::parse(uri).map(Self::ByReference),
            (Some(_), Some(_)) => reject(
                ErrorCode::InvalidRequest,
                "credential_offer and credential_offer_uri are mutually exclusive",
            ),
            (None, None) => reject(
                ErrorCode::InvalidRequest,
                "neither credential_offer nor credential_offer_uri is present",
            ),
        }
    }
}

/// Encodes `params` as `credential_offer=<url-encoded JSON>`.
pub fn encode_offer(params: &CredentialOfferParameters) -> Result<CredentialOffer> {
    params.encode()
}

/// Decodes an offer by value, given as a bare query string or within any URI.
///
/// Known grant types are decoded into their typed shape; unknown ones are kept
/// as opaque JSON.
pub fn decode_offer(offer: &str) -> Result<CredentialOfferParameters> {
    match OfferPayload::parse(offer)? {
        OfferPayload::ByValue(params) => Ok(params),
        OfferPayload::ByReference(_) => reject(
            ErrorCode::InvalidRequest,
            "the credential offer is passed by reference",
        ),
    }
}

/// Extracts the offer identifier from a by reference URI.
pub fn uuid_of(uri: &str) -> Result<Uuid> {
    CredentialOfferUri::parse(uri)?.uuid()
}

fn query_params(offer: &str) -> Result<Vec<(String, String)>> {
    let query = offer.split_once('?').map_or(offer, |(_, query)| query);
    let query = query.split_once('#').map_or(query, |(query, _)| query);

    serde_urlencoded::from_str(query).foreign_err(|| {
        Error::new(ErrorCode::InvalidRequest, "credential offer is not a query string")
    })
}

fn parse_parameters(json: &str) -> Result<CredentialOfferParameters> {
    let params: CredentialOfferParameters = serde_json::from_str(json).or_else(|error| {
        reject(
            ErrorCode::InvalidRequest,
            format!("malformed credential offer: {error}"),
        )
    })?;
    params.validate()?;

    Ok(params)
}
