use crate::error::{BotError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use url::form_urlencoded::byte_serialize;

type HmacSha256 = Hmac<Sha256>;

/// Reserved parameter name; never part of the signed payload
pub const SIGNATURE_KEY: &str = "signature";

/// Order in which parameters enter the canonical query string.
///
/// Binance verifies the signature against the query exactly as it was
/// transmitted, so the same order must be used for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamOrder {
    /// Alphabetical by key (account and order endpoints)
    Sorted,
    /// Order in which parameters were added
    Insertion,
}

/// API credentials. The secret is optional so that a missing one surfaces
/// as a configuration error at signing time rather than as a panic.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    secret_key: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret_key: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.filter(|s| !s.is_empty()),
        }
    }

    /// Read `BINANCE_API_KEY` / `BINANCE_API_SECRET`. Both must be set and
    /// non-empty.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var("BINANCE_API_KEY").ok(),
            std::env::var("BINANCE_API_SECRET").ok(),
        )
    }

    fn from_vars(api_key: Option<String>, secret_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .ok_or_else(|| BotError::Config("BINANCE_API_KEY not found in environment".into()))?;
        let secret_key = secret_key
            .ok_or_else(|| BotError::Config("BINANCE_API_SECRET not found in environment".into()))?;

        if api_key.is_empty() {
            return Err(BotError::Config("BINANCE_API_KEY is empty".into()));
        }
        if secret_key.is_empty() {
            return Err(BotError::Config("BINANCE_API_SECRET is empty".into()));
        }

        Ok(Self::new(api_key, Some(secret_key)))
    }

    pub fn secret_key(&self) -> Result<&str> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| BotError::Config("API secret is missing; refusing to send unsigned request".into()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Request parameters in the order they were added
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: &str, value: impl ToString) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `key=value` pairs joined with `&`; any `signature` entry is skipped
    pub fn canonical(&self, order: ParamOrder) -> String {
        let mut pairs: Vec<&(String, String)> = self
            .pairs
            .iter()
            .filter(|(k, _)| k != SIGNATURE_KEY)
            .collect();

        if order == ParamOrder::Sorted {
            // Stable, so duplicate keys keep their relative order
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
        }

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn encode(raw: &str) -> String {
    byte_serialize(raw.as_bytes()).collect()
}

/// Generate HMAC-SHA256 signature for Binance API requests
///
/// Returns the lowercase hex digest. An empty secret is a configuration
/// error.
pub fn generate_signature(secret_key: &str, query_string: &str) -> Result<String> {
    if secret_key.is_empty() {
        return Err(BotError::Config("API secret is empty".into()));
    }

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| BotError::Config(format!("Invalid HMAC key: {}", e)))?;

    mac.update(query_string.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build the transmitted query: canonical string with `signature` appended last
pub fn build_signed_query(params: &QueryParams, secret_key: &str, order: ParamOrder) -> Result<String> {
    let query_string = params.canonical(order);
    let signature = generate_signature(secret_key, &query_string)?;

    if query_string.is_empty() {
        Ok(format!("{}={}", SIGNATURE_KEY, signature))
    } else {
        Ok(format!("{}&{}={}", query_string, SIGNATURE_KEY, signature))
    }
}
