// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verified claims and the request extension that carries them.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded payload of a verified token, keyed by claim name.
///
/// Values keep whatever JSON type the issuer used. Registered claims have
/// typed accessors; everything else goes through [`Claims::get`] or
/// [`Claims::deserialize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Subject (`sub`), when it is a string.
    pub fn sub(&self) -> Option<&str> {
        self.str_claim("sub")
    }

    /// Issuer (`iss`), when it is a string.
    pub fn iss(&self) -> Option<&str> {
        self.str_claim("iss")
    }

    /// Token id (`jti`), when it is a string.
    pub fn jti(&self) -> Option<&str> {
        self.str_claim("jti")
    }

    /// Issued-at (`iat`) in UNIX seconds.
    pub fn iat(&self) -> Option<i64> {
        self.timestamp_claim("iat")
    }

    /// Expiry (`exp`) in UNIX seconds.
    pub fn exp(&self) -> Option<i64> {
        self.timestamp_claim("exp")
    }

    /// Not-before (`nbf`) in UNIX seconds.
    pub fn nbf(&self) -> Option<i64> {
        self.timestamp_claim("nbf")
    }

    /// Audiences (`aud`), accepting both the string and the array form.
    pub fn audiences(&self) -> Vec<&str> {
        match self.0.get("aud") {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Deserialize the whole payload into an application-defined claims type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn str_claim(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    // Timestamps may be encoded as floats by some issuers.
    fn timestamp_claim(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Per-request token context, stored in the request extensions.
///
/// Once the filter has run this is either empty (no bearer token, or the token
/// failed verification) or holds the verified claims. Cloning is cheap; the
/// claims are shared and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenContext(Option<Arc<Claims>>);

impl TokenContext {
    /// The null context.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn verified(claims: Claims) -> Self {
        Self(Some(Arc::new(claims)))
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.0.as_deref()
    }

    pub fn is_verified(&self) -> bool {
        self.0.is_some()
    }

    pub fn into_claims(self) -> Option<Arc<Claims>> {
        self.0
    }
}
