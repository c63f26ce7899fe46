// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wiring the filter into a request pipeline.
//!
//! Two equivalent shapes over [`TokenContextFilter::apply`]:
//!
//! - [`token_context_middleware`] for `axum::middleware::from_fn_with_state`
//! - [`TokenContextLayer`] for any tower stack
//!
//! # Usage
//!
//! ```rust,ignore
//! let filter = TokenContextFilter::new(FilterConfiguration::from_env()?)?;
//!
//! let app = Router::new()
//!     .route("/me", get(me_handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         filter.clone(),
//!         token_context_middleware,
//!     ));
//!
//! // or, equivalently
//! let app = Router::new().route("/me", get(me_handler)).layer(filter.layer());
//! ```
//!
//! Both always forward the request exactly once, after verification finished.

use std::task::{Context, Poll};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower::{Layer, Service};

use crate::filter::TokenContextFilter;

/// Axum middleware function: attach the token context, then run the rest of
/// the chain.
pub async fn token_context_middleware(
    State(filter): State<TokenContextFilter>,
    mut request: Request,
    next: Next,
) -> Response {
    filter.apply(&mut request);
    next.run(request).await
}

/// Tower layer that runs a [`TokenContextFilter`] before the inner service.
#[derive(Debug, Clone)]
pub struct TokenContextLayer {
    filter: TokenContextFilter,
}

impl TokenContextLayer {
    pub fn new(filter: TokenContextFilter) -> Self {
        Self { filter }
    }
}

impl<S> Layer<S> for TokenContextLayer {
    type Service = TokenContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenContextService {
            inner,
            filter: self.filter.clone(),
        }
    }
}

/// Service produced by [`TokenContextLayer`].
#[derive(Debug, Clone)]
pub struct TokenContextService<S> {
    inner: S,
    filter: TokenContextFilter,
}

impl<S, B> Service<axum::http::Request<B>> for TokenContextService<S>
where
    S: Service<axum::http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: axum::http::Request<B>) -> Self::Future {
        self.filter.apply(&mut request);
        self.inner.call(request)
    }
}
