// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error types.
//!
//! - [`ConfigurationError`] is only ever returned while building a filter.
//! - [`VerificationError`] is the closed outcome set of a [`TokenVerifier`]; the
//!   filter swallows it after logging.
//! - [`ContextRejection`] is produced by the optional extractors, never by the
//!   filter itself.
//!
//! [`TokenVerifier`]: crate::verifier::TokenVerifier

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Invalid filter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The shared secret is empty or was never provided.
    #[error("JWT secret cannot be empty")]
    EmptySecret,

    /// A configuration value could not be parsed.
    #[error("invalid configuration value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Why a token failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Bad signature, malformed token, or a claim that does not match the
    /// configured constraints.
    #[error("{0}")]
    Signature(String),

    /// The `exp` claim (or `iat + max_age`) is in the past.
    #[error("{message}")]
    Expired {
        message: String,
        expired_at: DateTime<Utc>,
    },

    /// The `nbf` claim is in the future.
    #[error("{message}")]
    NotActive { message: String, date: DateTime<Utc> },

    /// Any other failure mode of the verification primitive.
    #[error("{0}")]
    Unknown(String),
}

impl VerificationError {
    /// Stable identifier, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            VerificationError::Signature(_) => "signature",
            VerificationError::Expired { .. } => "expired",
            VerificationError::NotActive { .. } => "not_active",
            VerificationError::Unknown(_) => "unknown",
        }
    }

    pub(crate) fn signature(message: impl Into<String>) -> Self {
        VerificationError::Signature(message.into())
    }
}

/// Rejection returned by the extractors in [`crate::extractor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextRejection {
    /// No `TokenContext` extension: the filter is not part of this route's stack.
    #[error("Token context filter is not installed for this route")]
    FilterNotInstalled,

    /// The filter ran but the request carries no verified token.
    #[error("A valid bearer token is required")]
    Unauthenticated,
}

#[derive(Serialize)]
struct RejectionBody {
    error: String,
    error_code: String,
}

impl ContextRejection {
    /// Get the error code for this rejection.
    pub fn error_code(&self) -> &'static str {
        match self {
            ContextRejection::FilterNotInstalled => "token_context_missing",
            ContextRejection::Unauthenticated => "unauthenticated",
        }
    }

    /// Get the HTTP status code for this rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ContextRejection::FilterNotInstalled => StatusCode::INTERNAL_SERVER_ERROR,
            ContextRejection::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ContextRejection {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(RejectionBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
