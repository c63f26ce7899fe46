// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Filter Configuration
//!
//! A [`FilterConfiguration`] is the shared secret plus a set of
//! [`VerifyOptions`]. The filter only checks that the secret is non-empty; the
//! options are handed to the verifier untouched.
//!
//! Configuration can be built in code, deserialized with serde (options are
//! flattened next to `secret`), or loaded from the environment.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `JWT_SECRET` | Shared HMAC secret | Required |
//! | `JWT_AUDIENCE` | Accepted audiences (comma-separated) | Not checked |
//! | `JWT_ISSUER` | Accepted issuers (comma-separated) | Not checked |
//! | `JWT_SUBJECT` | Expected subject | Not checked |
//! | `JWT_ALGORITHMS` | Accepted algorithms (comma-separated) | `HS256,HS384,HS512` |
//! | `JWT_CLOCK_TOLERANCE` | Clock skew tolerance in seconds | `0` |
//! | `JWT_MAX_AGE` | Maximum token age in seconds, measured from `iat` | Not checked |

use std::{fmt, str::FromStr};

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigurationError;

/// Environment variable name for the shared HMAC secret.
pub const SECRET_ENV: &str = "JWT_SECRET";

/// Environment variable name for accepted audiences.
pub const AUDIENCE_ENV: &str = "JWT_AUDIENCE";

/// Environment variable name for accepted issuers.
pub const ISSUER_ENV: &str = "JWT_ISSUER";

/// Environment variable name for the expected subject.
pub const SUBJECT_ENV: &str = "JWT_SUBJECT";

/// Environment variable name for the algorithm allow-list.
pub const ALGORITHMS_ENV: &str = "JWT_ALGORITHMS";

/// Environment variable name for the clock tolerance, in seconds.
pub const CLOCK_TOLERANCE_ENV: &str = "JWT_CLOCK_TOLERANCE";

/// Environment variable name for the maximum token age, in seconds.
pub const MAX_AGE_ENV: &str = "JWT_MAX_AGE";

/// Algorithms accepted when [`VerifyOptions::algorithms`] is empty.
pub const DEFAULT_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Verification constraints passed through to the verifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyOptions {
    /// Accepted audiences; the token's `aud` must contain one of them.
    #[serde(deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<String>>,

    /// Accepted issuers; the token's `iss` must be one of them.
    #[serde(deserialize_with = "one_or_many", skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Vec<String>>,

    /// Expected `sub`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Expected `jti`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwtid: Option<String>,

    /// Accepted header algorithms. Empty means [`DEFAULT_ALGORITHMS`].
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub algorithms: Vec<Algorithm>,

    /// Seconds of slack applied to `nbf`, `exp` and `max_age`.
    pub clock_tolerance: u64,

    /// Maximum age in seconds, measured from `iat`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,

    pub ignore_expiration: bool,

    pub ignore_not_before: bool,

    /// Fixed evaluation time (UNIX seconds) instead of the system clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_timestamp: Option<i64>,
}

impl VerifyOptions {
    /// Add an accepted audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience.get_or_insert_with(Vec::new).push(audience.into());
        self
    }

    /// Add an accepted issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer.get_or_insert_with(Vec::new).push(issuer.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_jwtid(mut self, jwtid: impl Into<String>) -> Self {
        self.jwtid = Some(jwtid.into());
        self
    }

    pub fn with_algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.algorithms = algorithms.into_iter().collect();
        self
    }

    pub fn with_clock_tolerance(mut self, seconds: u64) -> Self {
        self.clock_tolerance = seconds;
        self
    }

    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn with_ignore_expiration(mut self, ignore: bool) -> Self {
        self.ignore_expiration = ignore;
        self
    }

    pub fn with_ignore_not_before(mut self, ignore: bool) -> Self {
        self.ignore_not_before = ignore;
        self
    }

    pub fn with_clock_timestamp(mut self, timestamp: i64) -> Self {
        self.clock_timestamp = Some(timestamp);
        self
    }

    /// The allow-list actually enforced.
    pub fn effective_algorithms(&self) -> Vec<Algorithm> {
        if self.algorithms.is_empty() {
            DEFAULT_ALGORITHMS.to_vec()
        } else {
            self.algorithms.clone()
        }
    }
}

/// Secret plus pass-through verification options.
///
/// Key material is not printable via `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilterConfiguration {
    #[serde(default)]
    pub secret: String,

    #[serde(flatten)]
    pub options: VerifyOptions,
}

impl fmt::Debug for FilterConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterConfiguration")
            .field("secret", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl FilterConfiguration {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            options: VerifyOptions::default(),
        }
    }

    pub fn with_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    /// Load configuration from the process environment.
    ///
    /// A missing `JWT_SECRET` is not reported here; the filter rejects the
    /// empty secret when it is constructed.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(SECRET_ENV).unwrap_or_default();
        let mut options = VerifyOptions::default();

        if let Some(raw) = lookup(AUDIENCE_ENV) {
            options.audience = non_empty(split_list(&raw));
        }
        if let Some(raw) = lookup(ISSUER_ENV) {
            options.issuer = non_empty(split_list(&raw));
        }
        if let Some(raw) = lookup(SUBJECT_ENV) {
            let subject = raw.trim();
            if !subject.is_empty() {
                options.subject = Some(subject.to_string());
            }
        }
        if let Some(raw) = lookup(ALGORITHMS_ENV) {
            options.algorithms = split_list(&raw)
                .iter()
                .map(|name| Algorithm::from_str(name))
                .collect::<Result<_, _>>()
                .map_err(|_| ConfigurationError::InvalidValue {
                    key: ALGORITHMS_ENV,
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup(CLOCK_TOLERANCE_ENV) {
            options.clock_tolerance = parse_seconds(CLOCK_TOLERANCE_ENV, &raw)?;
        }
        if let Some(raw) = lookup(MAX_AGE_ENV) {
            options.max_age = Some(parse_seconds(MAX_AGE_ENV, &raw)?);
        }

        Ok(Self { secret, options })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn parse_seconds(key: &'static str, raw: &str) -> Result<u64, ConfigurationError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigurationError::InvalidValue {
            key,
            value: raw.to_string(),
        })
}

/// Accept `"aud"` as well as `["aud1", "aud2"]`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(value)) => Some(vec![value]),
        Some(OneOrMany::Many(values)) => Some(values),
        None => None,
    })
}
