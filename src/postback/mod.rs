// src/postback/mod.rs
//! Postback profiles
//!
//! A profile describes the outbound webhook fired when a conversion changes
//! state: a URL template with `{macro}` placeholders, extra parameters, how
//! conversion statuses map onto the partner's vocabulary, request signing
//! and a retry schedule. Profiles are only configured and previewed here;
//! delivery happens elsewhere.

use crate::rule::NEW_RULE_ID;
use crate::ValidationIssue;
use ahash::{HashMap, HashSet};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::form_urlencoded;

/// Macros the tracker can substitute into a postback
pub const KNOWN_MACROS: &[&str] = &[
    "click_id",
    "transaction_id",
    "offer_id",
    "affiliate_id",
    "payout",
    "revenue",
    "currency",
    "status",
    "ip",
    "country",
    "timestamp",
    "sub1",
    "sub2",
    "sub3",
    "sub4",
    "sub5",
];

/// Upper bound for `RetryPolicy::max_attempts`
pub const MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMapping {
    /// Conversion status on our side, e.g. `approved`
    pub status: String,
    /// Value sent to the partner
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    /// May contain `{macro}` placeholders
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningAlgorithm {
    #[default]
    HmacSha256,
    HmacSha512,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signing {
    pub enabled: bool,
    #[serde(default)]
    pub algorithm: SigningAlgorithm,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_signature_header")]
    pub header: String,
}

impl Default for Signing {
    fn default() -> Self {
        Self {
            enabled: false,
            algorithm: SigningAlgorithm::default(),
            secret: String::new(),
            header: default_signature_header(),
        }
    }
}

fn default_signature_header() -> String {
    "X-Signature".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Fixed,
    Linear,
    #[default]
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts including the first delivery
    pub max_attempts: u32,
    pub initial_delay_secs: u64,
    pub backoff: Backoff,
    pub max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_secs: 60,
            backoff: Backoff::Exponential,
            max_delay_secs: 3600,
        }
    }
}

impl RetryPolicy {
    /// Wait before each retry, in order. Never longer than `max_delay_secs`
    /// and never more than `MAX_ATTEMPTS - 1` entries.
    pub fn delays(&self) -> Vec<Duration> {
        let retries = self.max_attempts.clamp(1, MAX_ATTEMPTS) - 1;

        (1..=retries)
            .map(|n| {
                let secs = match self.backoff {
                    Backoff::Fixed => self.initial_delay_secs,
                    Backoff::Linear => self.initial_delay_secs.saturating_mul(u64::from(n)),
                    Backoff::Exponential => {
                        let factor = 1u64.checked_shl(n - 1).unwrap_or(u64::MAX);
                        self.initial_delay_secs.saturating_mul(factor)
                    }
                };
                Duration::from_secs(secs.min(self.max_delay_secs))
            })
            .collect()
    }
}

/// Outbound webhook template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostbackProfile {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub status_mapping: Vec<StatusMapping>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub signing: Signing,
    #[serde(default)]
    pub retry: RetryPolicy,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PostbackProfile {
    /// Unsaved, active GET profile with the default retry policy
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: NEW_RULE_ID.to_string(),
            name: name.into(),
            url: url.into(),
            method: HttpMethod::Get,
            status_mapping: Vec::new(),
            parameters: Vec::new(),
            signing: Signing::default(),
            retry: RetryPolicy::default(),
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == NEW_RULE_ID
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn map_status(mut self, status: impl Into<String>, value: impl Into<String>) -> Self {
        self.status_mapping.push(StatusMapping {
            status: status.into(),
            value: value.into(),
        });
        self
    }

    /// Distinct `{macro}` names used by the URL and parameter values, in
    /// order of first appearance
    pub fn placeholders(&self) -> Vec<String> {
        let mut seen = HashSet::default();
        let templates =
            std::iter::once(self.url.as_str()).chain(self.parameters.iter().map(|p| p.value.as_str()));

        templates
            .flat_map(scan_placeholders)
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect()
    }

    /// Collect every problem that blocks saving
    pub fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::EmptyName);
        }

        let url = self.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://"))
            || Url::parse(&substitute(url, &HashMap::default(), str::to_string)).is_err()
        {
            issues.push(ValidationIssue::InvalidUrl(self.url.clone()));
        }

        for name in self.placeholders() {
            if !KNOWN_MACROS.contains(&name.as_str()) {
                issues.push(ValidationIssue::UnknownPlaceholder(name));
            }
        }

        let mut statuses = HashSet::default();
        for mapping in &self.status_mapping {
            if !statuses.insert(mapping.status.as_str()) {
                issues.push(ValidationIssue::DuplicateStatus(mapping.status.clone()));
            }
        }

        if self.parameters.iter().any(|p| p.key.trim().is_empty()) {
            issues.push(ValidationIssue::EmptyParameterKey);
        }

        if self.signing.enabled && self.signing.secret.is_empty() {
            issues.push(ValidationIssue::MissingSecret);
        }

        if !(1..=MAX_ATTEMPTS).contains(&self.retry.max_attempts) {
            issues.push(ValidationIssue::AttemptsOutOfRange(self.retry.max_attempts));
        }
        if self.retry.initial_delay_secs > self.retry.max_delay_secs {
            issues.push(ValidationIssue::DelayExceedsCap {
                initial: self.retry.initial_delay_secs,
                max: self.retry.max_delay_secs,
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Preview of the URL the tracker would call.
    ///
    /// Placeholders are replaced by `values` (missing ones become empty) and
    /// percent-encoded for the part of the URL they land in, so a value can
    /// never add path segments or query parameters. For GET profiles the
    /// parameters are appended as a query string.
    pub fn render_url(&self, values: &HashMap<String, String>) -> Result<String, ValidationIssue> {
        let template = self.url.trim();
        let rendered = match template.split_once('?') {
            Some((path, query)) => format!(
                "{}?{}",
                substitute(path, values, encode_path),
                substitute(query, values, encode_query)
            ),
            None => substitute(template, values, encode_path),
        };
        let mut url =
            Url::parse(&rendered).map_err(|_| ValidationIssue::InvalidUrl(self.url.clone()))?;

        if self.method == HttpMethod::Get && !self.parameters.is_empty() {
            let mut query = url.query_pairs_mut();
            for parameter in &self.parameters {
                // append_pair does the encoding
                let value = substitute(&parameter.value, values, str::to_string);
                query.append_pair(&parameter.key, &value);
            }
        }

        Ok(url.into())
    }
}

/// Split `template` into literal text and well-formed `{name}` placeholders
fn tokenize(template: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}').map(|end| (&after[..end], &after[end + 1..])) {
            Some((name, tail)) if is_macro_name(name) => {
                tokens.push(Token::Text(&rest[..start]));
                tokens.push(Token::Placeholder(name));
                rest = tail;
            }
            _ => {
                tokens.push(Token::Text(&rest[..=start]));
                rest = after;
            }
        }
    }
    tokens.push(Token::Text(rest));

    tokens
}

enum Token<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

fn scan_placeholders(template: &str) -> Vec<&str> {
    tokenize(template)
        .into_iter()
        .filter_map(|token| match token {
            Token::Placeholder(name) => Some(name),
            Token::Text(_) => None,
        })
        .collect()
}

fn is_macro_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Single pass: substituted values are never scanned for placeholders
fn substitute(
    template: &str,
    values: &HashMap<String, String>,
    encode: impl Fn(&str) -> String,
) -> String {
    tokenize(template)
        .into_iter()
        .map(|token| match token {
            Token::Text(text) => text.to_string(),
            Token::Placeholder(name) => encode(values.get(name).map(String::as_str).unwrap_or("")),
        })
        .collect()
}

fn encode_query(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

// byte_serialize escapes a literal '+', so every '+' left is a space
fn encode_path(value: &str) -> String {
    encode_query(value).replace('+', "%20")
}
