// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for handlers behind the filter.
//!
//! The filter only annotates requests. Handlers decide what an empty context
//! means:
//!
//! ```rust,ignore
//! // Works for both anonymous and authenticated callers.
//! async fn feed(ctx: TokenContext) -> impl IntoResponse { /* ... */ }
//!
//! // 401 unless the request carried a verified token.
//! async fn profile(RequireClaims(claims): RequireClaims) -> impl IntoResponse { /* ... */ }
//! ```

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::claims::{Claims, TokenContext};
use crate::error::ContextRejection;

impl<S> FromRequestParts<S> for TokenContext
where
    S: Send + Sync,
{
    type Rejection = ContextRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TokenContext>()
            .cloned()
            .ok_or(ContextRejection::FilterNotInstalled)
    }
}

/// Extractor that requires verified claims.
pub struct RequireClaims(pub Arc<Claims>);

impl<S> FromRequestParts<S> for RequireClaims
where
    S: Send + Sync,
{
    type Rejection = ContextRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        TokenContext::from_request_parts(parts, state)
            .await?
            .into_claims()
            .map(RequireClaims)
            .ok_or(ContextRejection::Unauthenticated)
    }
}
