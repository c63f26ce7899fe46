// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token Context - bearer JWT context filter
//!
//! A single request-pipeline stage: read `Authorization: Bearer <jwt>`, verify
//! it against a shared HMAC secret, and attach the decoded claims (or an empty
//! context) to the request before the next stage runs.
//!
//! The filter never rejects, never writes a response and never lets an error
//! escape. Verification failures are logged at WARN via `tracing`.
//!
//! ## Modules
//!
//! - `config` - Secret and pass-through verification options
//! - `claims` - Claims mapping and the `TokenContext` request extension
//! - `verifier` - Verification primitive (`jsonwebtoken`, HMAC)
//! - `filter` - The filter itself
//! - `middleware` - axum middleware function and tower layer
//! - `extractor` - Extractors for downstream handlers
//! - `error` - Error types

pub mod claims;
pub mod config;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod middleware;
pub mod verifier;

#[cfg(test)]
mod testutil;

pub use claims::{Claims, TokenContext};
pub use config::{FilterConfiguration, VerifyOptions};
pub use error::{ConfigurationError, ContextRejection, VerificationError};
pub use extractor::RequireClaims;
pub use filter::{bearer_token, TokenContextFilter};
pub use middleware::{token_context_middleware, TokenContextLayer, TokenContextService};
pub use verifier::{JsonWebTokenVerifier, TokenVerifier};

/// Re-exported so callers can build algorithm allow-lists without a direct
/// `jsonwebtoken` dependency.
pub use jsonwebtoken::Algorithm;
