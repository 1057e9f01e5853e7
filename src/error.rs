//! Error taxonomy for the signal-and-order engine.

use std::fmt;
use thiserror::Error;

/// Which leg of a bracket an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BracketLeg {
    Entry,
    TakeProfit,
    StopLoss,
}

impl fmt::Display for BracketLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BracketLeg::Entry => "entry",
            BracketLeg::TakeProfit => "take-profit",
            BracketLeg::StopLoss => "stop-loss",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BotError {
    /// Missing credentials or invalid settings. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure or timeout.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the venue.
    #[error("Venue rejected request (HTTP {status}, code {code}): {message}")]
    Venue {
        status: u16,
        code: i64,
        message: String,
    },

    /// Malformed or insufficient market data.
    #[error("Data error: {0}")]
    Data(String),

    /// Order parameters that the venue would never accept.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// 2xx from the venue with a body that does not decode. The order may
    /// be live.
    #[error("Venue accepted {path} but the acknowledgement is unreadable: {detail}")]
    UnreadableAck { path: String, detail: String },

    /// One or two bracket legs failed; the position may be unhedged.
    #[error("Partial bracket execution, failed legs {failed:?}: {detail}")]
    PartialExecution {
        failed: Vec<BracketLeg>,
        detail: String,
    },
}

impl BotError {
    /// Errors a polling cycle logs and moves past.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BotError::Network(_) | BotError::Venue { .. })
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Data(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
