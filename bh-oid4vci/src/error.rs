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

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Protocol error codes shared by the OAuth 2.0 and OpenID4VCI endpoints.
///
/// The [`Display`][std::fmt::Display] and serde representations are the exact
/// strings sent on the wire.
#[derive(
    strum_macros::Display,
    strum_macros::IntoStaticStr,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is missing a required parameter or is otherwise malformed.
    InvalidRequest,
    /// The client is not authorized to use the requested grant or response type.
    UnauthorizedClient,
    /// The resource owner or the authorization server denied the request.
    AccessDenied,
    /// The authorization server does not support the requested response type.
    UnsupportedResponseType,
    /// The requested scope is invalid, unknown or malformed.
    InvalidScope,
    /// Unexpected condition on the server side.
    ServerError,
    /// The server is temporarily unable to handle the request.
    TemporarilyUnavailable,
    /// The provided grant (e.g. a Pre-Authorized Code) is invalid or expired.
    InvalidGrant,
    /// Client authentication failed.
    InvalidClient,
    /// The grant type is not supported by the authorization server.
    UnsupportedGrantType,
    /// The Credential Request is missing a parameter or is malformed.
    InvalidCredentialRequest,
    /// The requested Credential type is not supported.
    UnsupportedCredentialType,
    /// The requested Credential format (or key proof type) is not supported.
    UnsupportedCredentialFormat,
    /// The key proof is missing, invalid, or could not be verified.
    InvalidProof,
    /// The key proof does not carry the expected `c_nonce`.
    ///
    /// The wallet is expected to fetch a fresh nonce and retry.
    InvalidNonce,
    /// The Credential Response encryption parameters are invalid or missing.
    InvalidEncryptionParameters,
    /// The Credential Request was understood but will not be honoured.
    CredentialRequestDenied,
    /// The `notification_id` of a Notification Request is unknown.
    InvalidNotificationId,
    /// The Notification Request is malformed.
    InvalidNotificationRequest,
}

impl ErrorCode {
    /// Every defined error code, in declaration order.
    pub const ALL: [ErrorCode; 19] = [
        ErrorCode::InvalidRequest,
        ErrorCode::UnauthorizedClient,
        ErrorCode::AccessDenied,
        ErrorCode::UnsupportedResponseType,
        ErrorCode::InvalidScope,
        ErrorCode::ServerError,
        ErrorCode::TemporarilyUnavailable,
        ErrorCode::InvalidGrant,
        ErrorCode::InvalidClient,
        ErrorCode::UnsupportedGrantType,
        ErrorCode::InvalidCredentialRequest,
        ErrorCode::UnsupportedCredentialType,
        ErrorCode::UnsupportedCredentialFormat,
        ErrorCode::InvalidProof,
        ErrorCode::InvalidNonce,
        ErrorCode::InvalidEncryptionParameters,
        ErrorCode::CredentialRequestDenied,
        ErrorCode::InvalidNotificationId,
        ErrorCode::InvalidNotificationRequest,
    ];

    /// Returns the wire representation of the code.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Looks up a code by its wire representation.
    pub fn from_wire(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|known| known.as_str() == code)
    }

    /// Returns the HTTP status an endpoint responds with for this code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest
            | ErrorCode::InvalidGrant
            | ErrorCode::UnsupportedGrantType
            | ErrorCode::InvalidScope
            | ErrorCode::UnsupportedResponseType
            | ErrorCode::InvalidCredentialRequest
            | ErrorCode::UnsupportedCredentialType
            | ErrorCode::UnsupportedCredentialFormat
            | ErrorCode::InvalidProof
            | ErrorCode::InvalidNonce
            | ErrorCode::InvalidEncryptionParameters
            | ErrorCode::CredentialRequestDenied
            | ErrorCode::InvalidNotificationId
            | ErrorCode::InvalidNotificationRequest => StatusCode::BAD_REQUEST,
            ErrorCode::UnauthorizedClient | ErrorCode::InvalidClient => StatusCode::UNAUTHORIZED,
            ErrorCode::AccessDenied => StatusCode::FORBIDDEN,
            ErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::TemporarilyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Maps a raw error code string to its HTTP status.
///
/// Codes outside of [`ErrorCode`] map to `418 I'm a teapot`, so that a missing
/// mapping stands out instead of blending in with a generic `500`.
pub fn status_code_for(code: &str) -> StatusCode {
    ErrorCode::from_wire(code).map_or(StatusCode::IM_A_TEAPOT, |code| code.status_code())
}

/// The error value of every operation of the crate.
///
/// It doubles as the OAuth 2.0 error response body, i.e. it serializes to
/// `{"error": "...", "error_description": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    /// The protocol error code.
    #[serde(rename = "error")]
    pub code: ErrorCode,
    /// Human-readable explanation of what was rejected.
    #[serde(
        rename = "error_description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
}

impl Error {
    /// Creates a new error with a description.
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: Some(description.into()),
        }
    }

    /// Creates a new error carrying only the code.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            description: None,
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => write!(f, "{}", self.code),
        }
    }
}

impl bherror::BhError for Error {}

/// Result type alias for the crate.
pub type Result<T> = bherror::Result<T, Error>;

/// Creates a root [`bherror::Error`] with the given code and description.
#[track_caller]
pub(crate) fn reject<T>(code: ErrorCode, description: impl Into<String>) -> Result<T> {
    Err(bherror::Error::root(Error::new(code, description)))
}

/// Shorthand for [`reject`] with [`ErrorCode::InvalidCredentialRequest`].
#[track_caller]
pub(crate) fn malformed<T>(description: impl Into<String>) -> Result<T> {
    reject(ErrorCode::InvalidCredentialRequest, description)
}
