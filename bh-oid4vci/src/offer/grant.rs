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

use std::collections::BTreeMap;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    error::{reject, ErrorCode},
    Result,
};

/// Grant type key of the Authorization Code flow.
pub const AUTHORIZATION_CODE_GRANT_TYPE: &str = "authorization_code";

/// Grant type key of the Pre-Authorized Code flow.
pub const PRE_AUTHORIZED_CODE_GRANT_TYPE: &str =
    "urn:ietf:params:oauth:grant-type:pre-authorized_code";

/// Maximal length of [`TxCode::description`], in characters.
pub const TX_CODE_DESCRIPTION_MAX_LEN: usize = 300;

/// Parameters of the Authorization Code grant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantAuthorizationCode {
    /// Opaque value binding the authorization request to this offer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_state: Option<String>,
    /// The authorization server to use, when the issuer has several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_server: Option<String>,
}

/// Parameters of the Pre-Authorized Code grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantPreAuthorizedCode {
    /// The code exchanged at the token endpoint.
    #[serde(rename = "pre-authorized_code")]
    pub pre_authorized_code: String,
    /// Present when a transaction code is expected at the token endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_code: Option<TxCode>,
    /// The authorization server to use, when the issuer has several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_server: Option<String>,
}

/// Describes the transaction code a user has to enter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCode {
    /// The character set of the code, `numeric` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<InputMode>,
    /// Length of the code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Guidance for the user, at most [`TX_CODE_DESCRIPTION_MAX_LEN`]
    /// characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Character set of a transaction code.
#[derive(
    strum_macros::Display, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InputMode {
    /// Digits only.
    #[default]
    Numeric,
    /// Any characters.
    Text,
}

/// One entry of [`Grants`].
#[derive(Debug, Clone, PartialEq)]
pub enum Grant {
    /// Stored under [`AUTHORIZATION_CODE_GRANT_TYPE`].
    AuthorizationCode(GrantAuthorizationCode),
    /// Stored under [`PRE_AUTHORIZED_CODE_GRANT_TYPE`].
    PreAuthorizedCode(GrantPreAuthorizedCode),
    /// A grant type this crate does not know, kept as is.
    Other(Value),
}

impl From<GrantAuthorizationCode> for Grant {
    fn from(grant: GrantAuthorizationCode) -> Self {
        Grant::AuthorizationCode(grant)
    }
}

impl From<GrantPreAuthorizedCode> for Grant {
    fn from(grant: GrantPreAuthorizedCode) -> Self {
        Grant::PreAuthorizedCode(grant)
    }
}

/// A grant with a grant type defined by OpenID4VCI.
pub trait KnownGrant: Into<Grant> + sealed::Sealed {
    /// The key the grant is stored under.
    const GRANT_TYPE: &'static str;
}

impl KnownGrant for GrantAuthorizationCode {
    const GRANT_TYPE: &'static str = AUTHORIZATION_CODE_GRANT_TYPE;
}

impl KnownGrant for GrantPreAuthorizedCode {
    const GRANT_TYPE: &'static str = PRE_AUTHORIZED_CODE_GRANT_TYPE;
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::GrantAuthorizationCode {}
    impl Sealed for super::GrantPreAuthorizedCode {}
}

/// The `grants` of a Credential Offer, keyed by grant type.
///
/// Each known grant type is decoded into its own shape; values under any
/// other key are preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grants(BTreeMap<String, Grant>);

impl Grants {
    /// Returns `true` if no grant is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of grants.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Looks up the grant stored under `grant_type`.
    pub fn get(&self, grant_type: &str) -> Option<&Grant> {
        self.0.get(grant_type)
    }

    /// Iterates over the grants in grant type order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Grant)> {
        self.0.iter().map(|(key, grant)| (key.as_str(), grant))
    }

    /// The Authorization Code grant, if offered.
    pub fn authorization_code(&self) -> Option<&GrantAuthorizationCode> {
        match self.get(AUTHORIZATION_CODE_GRANT_TYPE) {
            Some(Grant::AuthorizationCode(grant)) => Some(grant),
            _ => None,
        }
    }

    /// The Pre-Authorized Code grant, if offered.
    pub fn pre_authorized_code(&self) -> Option<&GrantPreAuthorizedCode> {
        match self.get(PRE_AUTHORIZED_CODE_GRANT_TYPE) {
            Some(Grant::PreAuthorizedCode(grant)) => Some(grant),
            _ => None,
        }
    }

    /// Stores a known grant under its grant type, replacing a previous one.
    pub fn insert<G: KnownGrant>(&mut self, grant: G) {
        self.0.insert(G::GRANT_TYPE.to_owned(), grant.into());
    }

    /// Stores an opaque grant under `grant_type`.
    ///
    /// Known grant types must go through [`Grants::insert`].
    pub fn insert_other(&mut self, grant_type: impl Into<String>, value: Value) -> Result<()> {
        let grant_type = grant_type.into();
        if is_known(&grant_type) {
            return reject(
                ErrorCode::InvalidRequest,
                format!("grant type '{grant_type}' must be given in its typed form"),
            );
        }

        self.0.insert(grant_type, Grant::Other(value));
        Ok(())
    }

    pub(super) fn validate(&self) -> Result<()> {
        let Some(grant) = self.pre_authorized_code() else {
            return Ok(());
        };

        if grant.pre_authorized_code.is_empty() {
            return reject(ErrorCode::InvalidRequest, "pre-authorized_code must not be empty");
        }

        let description_len = grant
            .tx_code
            .as_ref()
            .and_then(|tx_code| tx_code.description.as_ref())
            .map_or(0, |description| description.chars().count());
        if description_len > TX_CODE_DESCRIPTION_MAX_LEN {
            return reject(
                ErrorCode::InvalidRequest,
                format!(
                    "tx_code description must be at most {TX_CODE_DESCRIPTION_MAX_LEN} characters"
                ),
            );
        }

        Ok(())
    }
}

fn is_known(grant_type: &str) -> bool {
    grant_type == AUTHORIZATION_CODE_GRANT_TYPE || grant_type == PRE_AUTHORIZED_CODE_GRANT_TYPE
}

impl Serialize for Grants {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Wire<'a> {
            AuthorizationCode(&'a GrantAuthorizationCode),
            PreAuthorizedCode(&'a GrantPreAuthorizedCode),
            Other(&'a Value),
        }

        serializer.collect_map(self.0.iter().map(|(key, grant)| {
            let wire = match grant {
                Grant::AuthorizationCode(grant) => Wire::AuthorizationCode(grant),
                Grant::PreAuthorizedCode(grant) => Wire::PreAuthorizedCode(grant),
                Grant::Other(value) => Wire::Other(value),
            };
            (key, wire)
        }))
    }
}

impl<'de> Deserialize<'de> for Grants {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;

        let grants = raw
            .into_iter()
            .map(|(key, value)| {
                let grant = match key.as_str() {
                    AUTHORIZATION_CODE_GRANT_TYPE => {
                        serde_json::from_value(value).map(Grant::AuthorizationCode)
                    }
                    PRE_AUTHORIZED_CODE_GRANT_TYPE => {
                        serde_json::from_value(value).map(Grant::PreAuthorizedCode)
                    }
                    _ => Ok(Grant::Other(value)),
                };
                grant
                    .map(|grant| (key.clone(), grant))
                    .map_err(|error| D::Error::custom(format!("invalid {key} grant: {error}")))
            })
            .collect::<std::result::Result<_, _>>()?;

        Ok(Grants(grants))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn known_grants_are_typed() {
        let grants: Grants = serde_json::from_value(json!({
            "authorization_code": { "issuer_state": "eyJhbGciOiJSU0Et...FYUaBy" },
            "urn:ietf:params:oauth:grant-type:pre-authorized_code": {
                "pre-authorized_code": "adhjhdjajkdkhjhdj",
                "tx_code": { "input_mode": "text", "length": 6, "description": "Check your inbox" },
                "authorization_server": "https://as.example"
            }
        }))
        .unwrap();

        assert_eq!(
            grants.authorization_code().unwrap().issuer_state.as_deref(),
            Some("eyJhbGciOiJSU0Et...FYUaBy")
        );
        let pre_authorized = grants.pre_authorized_code().unwrap();
        assert_eq!(pre_authorized.pre_authorized_code, "adhjhdjajkdkhjhdj");
        assert_eq!(
            pre_authorized.tx_code.as_ref().unwrap().input_mode,
            Some(InputMode::Text)
        );
        assert_eq!(
            pre_authorized.authorization_server.as_deref(),
            Some("https://as.example")
        );
    }

    #[test]
    fn unknown_grants_are_preserved() {
        let wire = json!({
            "urn:openid:params:grant-type:ciba": { "binding_message": "W4SCT" },
            "authorization_code": {}
        });
        let grants: Grants = serde_json::from_value(wire.clone()).unwrap();

        assert_eq!(grants.len(), 2);
        assert_eq!(
            grants.get("urn:openid:params:grant-type:ciba"),
            Some(&Grant::Other(json!({ "binding_message": "W4SCT" })))
        );
        assert_eq!(serde_json::to_value(&grants).unwrap(), wire);
    }

    #[test]
    fn malformed_known_grant() {
        let result = serde_json::from_value::<Grants>(json!({
            "urn:ietf:params:oauth:grant-type:pre-authorized_code": { "tx_code": {} }
        }));
        assert!(result.is_err());

        let result = serde_json::from_value::<Grants>(json!({ "authorization_code": "code" }));
        assert!(result.is_err());
    }

    #[test]
    fn insertion() {
        let mut grants = Grants::default();
        grants.insert(GrantAuthorizationCode {
            issuer_state: Some("state".to_owned()),
            authorization_server: None,
        });
        assert!(grants.authorization_code().is_some());
        assert!(grants.pre_authorized_code().is_none());

        assert!(grants
            .insert_other(AUTHORIZATION_CODE_GRANT_TYPE, json!({}))
            .is_err());
        grants
            .insert_other("urn:example:grant", json!({ "x": 1 }))
            .unwrap();
        assert_eq!(grants.len(), 2);
    }

    #[test]
    fn tx_code_description_length() {
        let mut grants = Grants::default();
        grants.insert(GrantPreAuthorizedCode {
            pre_authorized_code: "code".to_owned(),
            tx_code: Some(TxCode {
                description: Some("é".repeat(TX_CODE_DESCRIPTION_MAX_LEN)),
                ..Default::default()
            }),
            authorization_server: None,
        });
        grants.validate().unwrap();

        grants.insert(GrantPreAuthorizedCode {
            pre_authorized_code: "code".to_owned(),
            tx_code: Some(TxCode {
                description: Some("a".repeat(TX_CODE_DESCRIPTION_MAX_LEN + 1)),
                ..Default::default()
            }),
            authorization_server: None,
        });
        assert_eq!(
            grants.validate().unwrap_err().error.code,
            ErrorCode::InvalidRequest
        );
    }
}
