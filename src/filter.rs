// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The token context filter.
//!
//! ## Per-request flow
//!
//! 1. Read `Authorization`. No header, a non-ASCII value, or anything not
//!    starting with `"Bearer "` gives an empty context, silently.
//! 2. Hand the rest of the value to the [`TokenVerifier`].
//! 3. Success stores the claims; any failure stores an empty context and logs
//!    one WARN line.
//!
//! The filter never rejects a request. Whether an empty context is acceptable
//! is up to the handlers behind it.

use std::{fmt, sync::Arc};

use axum::http::{header::AUTHORIZATION, HeaderMap, Request};

use crate::claims::TokenContext;
use crate::config::FilterConfiguration;
use crate::error::{ConfigurationError, VerificationError};
use crate::middleware::TokenContextLayer;
use crate::verifier::{JsonWebTokenVerifier, TokenVerifier};

/// Scheme prefix, case-sensitive with a single space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Attaches a [`TokenContext`] to every request it sees.
///
/// Holds only immutable, shared state; clone it freely across routers and
/// threads.
#[derive(Clone)]
pub struct TokenContextFilter {
    config: Arc<FilterConfiguration>,
    verifier: Arc<dyn TokenVerifier>,
}

impl fmt::Debug for TokenContextFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenContextFilter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TokenContextFilter {
    /// Create a filter backed by [`JsonWebTokenVerifier`].
    ///
    /// # Errors
    /// [`ConfigurationError::EmptySecret`] if the secret is empty.
    pub fn new(config: FilterConfiguration) -> Result<Self, ConfigurationError> {
        Self::with_verifier(config, JsonWebTokenVerifier)
    }

    /// Create a filter with a custom verification primitive.
    pub fn with_verifier<V>(config: FilterConfiguration, verifier: V) -> Result<Self, ConfigurationError>
    where
        V: TokenVerifier + 'static,
    {
        if config.secret.is_empty() {
            return Err(ConfigurationError::EmptySecret);
        }

        Ok(Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
        })
    }

    pub fn config(&self) -> &FilterConfiguration {
        &self.config
    }

    /// Tower layer running this filter in front of an inner service.
    pub fn layer(&self) -> TokenContextLayer {
        TokenContextLayer::new(self.clone())
    }

    /// Resolve and attach the context, replacing any existing one.
    pub fn apply<B>(&self, request: &mut Request<B>) {
        let context = self.resolve(request.headers());
        request.extensions_mut().insert(context);
    }

    /// Resolve the context for a set of request headers.
    pub fn resolve(&self, headers: &HeaderMap) -> TokenContext {
        match bearer_token(headers) {
            Some(token) => self.verify(token),
            None => TokenContext::empty(),
        }
    }

    /// Verify a raw token, logging on failure.
    pub fn verify(&self, token: &str) -> TokenContext {
        match self
            .verifier
            .verify(token, &self.config.secret, &self.config.options)
        {
            Ok(claims) => TokenContext::verified(claims),
            Err(err) => {
                log_failure(&err);
                TokenContext::empty()
            }
        }
    }
}

/// Token part of an `Authorization: Bearer <token>` header.
///
/// Everything after the first space is returned as-is, including an empty
/// string for a bare `"Bearer "`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

fn log_failure(err: &VerificationError) {
    match err {
        VerificationError::Signature(_)
        | VerificationError::Expired { .. }
        | VerificationError::NotActive { .. } => {
            tracing::warn!(kind = err.kind(), "JWT validation failed: {}", err);
        }
        VerificationError::Unknown(detail) => {
            tracing::warn!("Unknown JWT error occurred");
            tracing::debug!(error = %detail, "unclassified token verification failure");
        }
    }
}
