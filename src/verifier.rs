// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verification.
//!
//! [`TokenVerifier`] is the seam between the filter and the cryptography. The
//! filter hands it the raw token, the shared secret and the pass-through
//! [`VerifyOptions`]; the verifier returns the claims or one of the four
//! [`VerificationError`] kinds.
//!
//! [`JsonWebTokenVerifier`] is the default: `jsonwebtoken` checks structure,
//! header algorithm and HMAC signature, then the registered claims are checked
//! here in a fixed order (`nbf`, `exp`, `aud`, `iss`, `sub`, `jti`, max age).

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};

use crate::claims::Claims;
use crate::config::VerifyOptions;
use crate::error::VerificationError;

/// Verifies a bearer token and returns its claims.
pub trait TokenVerifier: Send + Sync {
    fn verify(
        &self,
        token: &str,
        secret: &str,
        options: &VerifyOptions,
    ) -> Result<Claims, VerificationError>;
}

impl<F> TokenVerifier for F
where
    F: Fn(&str, &str, &VerifyOptions) -> Result<Claims, VerificationError> + Send + Sync,
{
    fn verify(
        &self,
        token: &str,
        secret: &str,
        options: &VerifyOptions,
    ) -> Result<Claims, VerificationError> {
        self(token, secret, options)
    }
}

/// HMAC (HS256/HS384/HS512) JWT verifier backed by `jsonwebtoken`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWebTokenVerifier;

impl TokenVerifier for JsonWebTokenVerifier {
    fn verify(
        &self,
        token: &str,
        secret: &str,
        options: &VerifyOptions,
    ) -> Result<Claims, VerificationError> {
        if token.is_empty() {
            return Err(VerificationError::signature("jwt must be provided"));
        }

        let claims = decode_signed_payload(token, secret, options)?;
        let now = options
            .clock_timestamp
            .unwrap_or_else(|| Utc::now().timestamp());
        check_registered_claims(&claims, options, now)?;

        Ok(claims)
    }
}

/// Signature and structure only; registered claims are checked afterwards.
fn decode_signed_payload(
    token: &str,
    secret: &str,
    options: &VerifyOptions,
) -> Result<Claims, VerificationError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = options.effective_algorithms();
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let key = DecodingKey::from_secret(secret.as_bytes());

    decode::<Map<String, Value>>(token, &key, &validation)
        .map(|data| Claims::new(data.claims))
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => VerificationError::signature("invalid signature"),
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => VerificationError::signature("jwt malformed"),
            ErrorKind::InvalidAlgorithm => VerificationError::signature("invalid algorithm"),
            _ => VerificationError::Unknown(e.to_string()),
        })
}

fn check_registered_claims(
    claims: &Claims,
    options: &VerifyOptions,
    now: i64,
) -> Result<(), VerificationError> {
    let now = now as f64;
    let tolerance = options.clock_tolerance as f64;

    if !options.ignore_not_before {
        if let Some(nbf) = numeric_claim(claims, "nbf", "invalid nbf value")? {
            if nbf > now + tolerance {
                return Err(VerificationError::NotActive {
                    message: "jwt not active".to_string(),
                    date: to_datetime(nbf),
                });
            }
        }
    }

    if !options.ignore_expiration {
        if let Some(exp) = numeric_claim(claims, "exp", "invalid exp value")? {
            if now >= exp + tolerance {
                return Err(VerificationError::Expired {
                    message: "jwt expired".to_string(),
                    expired_at: to_datetime(exp),
                });
            }
        }
    }

    if let Some(expected) = &options.audience {
        let matched = claims
            .audiences()
            .iter()
            .any(|aud| expected.iter().any(|e| e == aud));
        if !matched {
            return Err(VerificationError::signature(format!(
                "jwt audience invalid. expected: {}",
                expected.join(" or ")
            )));
        }
    }

    if let Some(expected) = &options.issuer {
        let matched = claims
            .iss()
            .is_some_and(|iss| expected.iter().any(|e| e == iss));
        if !matched {
            return Err(VerificationError::signature(format!(
                "jwt issuer invalid. expected: {}",
                expected.join(",")
            )));
        }
    }

    if let Some(expected) = &options.subject {
        if claims.sub() != Some(expected.as_str()) {
            return Err(VerificationError::signature(format!(
                "jwt subject invalid. expected: {expected}"
            )));
        }
    }

    if let Some(expected) = &options.jwtid {
        if claims.jti() != Some(expected.as_str()) {
            return Err(VerificationError::signature(format!(
                "jwt jwtid invalid. expected: {expected}"
            )));
        }
    }

    if let Some(max_age) = options.max_age {
        let iat = claims
            .get("iat")
            .and_then(Value::as_f64)
            .ok_or_else(|| VerificationError::signature("iat required when maxAge is specified"))?;
        let limit = iat + max_age as f64;
        if now >= limit + tolerance {
            return Err(VerificationError::Expired {
                message: "maxAge exceeded".to_string(),
                expired_at: to_datetime(limit),
            });
        }
    }

    Ok(())
}

/// `Ok(None)` when absent, an error when present but not a number.
fn numeric_claim(
    claims: &Claims,
    name: &str,
    invalid_message: &str,
) -> Result<Option<f64>, VerificationError> {
    match claims.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| VerificationError::signature(invalid_message)),
    }
}

fn to_datetime(seconds: f64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(seconds.floor() as i64, 0).unwrap_or_default()
}
