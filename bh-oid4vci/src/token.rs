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

use crate::{
    error::{reject, ErrorCode},
    jws::JsonObject,
    request::{CredentialRequest, CredentialSelector},
    Result,
};

/// The `type` of authorization details describing credentials.
pub const OPENID_CREDENTIAL_TYPE: &str = "openid_credential";

/// The Token Response of the OpenID4VCI Token Endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The issued access token.
    pub access_token: String,
    /// Type of the access token, `Bearer` or `DPoP`.
    pub token_type: String,
    /// Lifetime of the access token, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Scope of the access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// The `state` of the authorization request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// A `c_nonce` for the first Credential Request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce: Option<String>,
    /// Lifetime of the `c_nonce`, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_nonce_expires_in: Option<u64>,
    /// The credentials the access token is good for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authorization_details: Vec<AuthorizationDetail>,
}

/// An `authorization_details` entry of type `openid_credential`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDetail {
    /// Always [`OPENID_CREDENTIAL_TYPE`] for entries this crate produces.
    #[serde(rename = "type")]
    pub detail_type: String,
    /// The configuration the entry is about.
    pub credential_configuration_id: String,
    /// Identifiers to use as `credential_identifier` in Credential Requests.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credential_identifiers: Vec<String>,
    /// Unknown members.
    #[serde(flatten)]
    pub additional: JsonObject,
}

impl AuthorizationDetail {
    /// An `openid_credential` entry for `credential_configuration_id`.
    pub fn new(
        credential_configuration_id: impl Into<String>,
        credential_identifiers: Vec<String>,
    ) -> Self {
        Self {
            detail_type: OPENID_CREDENTIAL_TYPE.to_owned(),
            credential_configuration_id: credential_configuration_id.into(),
            credential_identifiers,
            additional: JsonObject::new(),
        }
    }
}

impl TokenResponse {
    /// A `Bearer` token response without any optional members.
    pub fn bearer(access_token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_owned(),
            expires_in: Some(expires_in),
            scope: None,
            state: None,
            c_nonce: None,
            c_nonce_expires_in: None,
            authorization_details: Vec::new(),
        }
    }

    /// Attaches a `c_nonce`.
    pub fn with_c_nonce(mut self, c_nonce: impl Into<String>, expires_in: u64) -> Self {
        self.c_nonce = Some(c_nonce.into());
        self.c_nonce_expires_in = Some(expires_in);
        self
    }

    /// Adds an `authorization_details` entry.
    pub fn with_authorization_detail(mut self, detail: AuthorizationDetail) -> Self {
        self.authorization_details.push(detail);
        self
    }

    fn credential_details(&self) -> impl Iterator<Item = &AuthorizationDetail> {
        self.authorization_details
            .iter()
            .filter(|detail| detail.detail_type == OPENID_CREDENTIAL_TYPE)
    }

    /// The configuration a `credential_identifier` was issued for.
    pub fn configuration_id_for(&self, credential_identifier: &str) -> Option<&str> {
        self.credential_details()
            .find(|detail| {
                detail
                    .credential_identifiers
                    .iter()
                    .any(|identifier| identifier == credential_identifier)
            })
            .map(|detail| detail.credential_configuration_id.as_str())
    }

    /// Resolves the credential configuration a Credential Request made with
    /// this token asks for.
    ///
    /// A `credential_identifier` must be one of the granted identifiers. A
    /// `credential_configuration_id` is only accepted for configurations
    /// that were not granted with identifiers.
    pub fn resolve_configuration<'a>(&'a self, request: &'a CredentialRequest) -> Result<&'a str> {
        match &request.credential {
            CredentialSelector::Identifier(identifier) => {
                match self.configuration_id_for(identifier) {
                    Some(configuration_id) => Ok(configuration_id),
                    None => reject(
                        ErrorCode::InvalidCredentialRequest,
                        format!("unknown credential_identifier '{identifier}'"),
                    ),
                }
            }
            CredentialSelector::ConfigurationId(configuration_id) => {
                let granted_with_identifiers = self.credential_details().any(|detail| {
                    detail.credential_configuration_id == *configuration_id
                        && !detail.credential_identifiers.is_empty()
                });
                if granted_with_identifiers {
                    return reject(
                        ErrorCode::InvalidCredentialRequest,
                        format!(
                            "credential_identifier must be used for configuration '{configuration_id}'"
                        ),
                    );
                }

                Ok(configuration_id)
            }
        }
    }
}
