use crate::error::{BotError, Result};
use crate::exchange::Endpoints;
use crate::strategy::LoopSettings;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default config location when neither `--config` nor `CONFIG_FILE` is set
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Upper bound Binance accepts for recvWindow
const MAX_RECV_WINDOW_MS: u64 = 60_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub strategy: StrategyConfig,
    pub orders: OrderConfig,
    pub exchange: ExchangeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub symbol: String,
    /// Kline interval, e.g. "1h"
    pub interval: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".into(),
            interval: "1h".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub candle_limit: usize,
    pub history_capacity: usize,
    pub poll_interval_secs: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fast_period: 50,
            slow_period: 200,
            candle_limit: 200,
            history_capacity: 200,
            poll_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    pub quantity: Decimal,
    /// Fraction of entry price, 0.10 = 10%
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
    /// Decimal places for TP/SL limit prices
    pub price_precision: u32,
    pub recv_window_ms: u64,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            quantity: dec!(0.001),
            take_profit_pct: dec!(0.10),
            stop_loss_pct: dec!(0.08),
            price_precision: 2,
            recv_window_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub endpoints: Endpoints,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://testnet.binancefuture.com".into(),
            request_timeout_secs: 10,
            endpoints: Endpoints::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "json" or "pretty"
    pub output: String,
    /// Empty for stdout
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            output: "pretty".into(),
            file_path: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| BotError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `CONFIG_FILE` or the default path
    pub fn load() -> Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(path)
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.strategy;
        let o = &self.orders;

        let check = |ok: bool, msg: String| if ok { Ok(()) } else { Err(BotError::Config(msg)) };

        check(!self.general.symbol.is_empty(), "general.symbol is empty".into())?;
        check(!self.general.interval.is_empty(), "general.interval is empty".into())?;
        check(s.fast_period > 0, "strategy.fast_period must be positive".into())?;
        check(
            s.fast_period < s.slow_period,
            format!("fast_period {} must be below slow_period {}", s.fast_period, s.slow_period),
        )?;
        check(
            s.candle_limit >= s.slow_period,
            format!("candle_limit {} must cover slow_period {}", s.candle_limit, s.slow_period),
        )?;
        check(s.history_capacity > 0, "strategy.history_capacity must be positive".into())?;
        check(s.poll_interval_secs > 0, "strategy.poll_interval_secs must be positive".into())?;
        check(o.quantity > Decimal::ZERO, format!("orders.quantity must be positive, got {}", o.quantity))?;
        check(
            o.take_profit_pct > Decimal::ZERO,
            format!("orders.take_profit_pct must be positive, got {}", o.take_profit_pct),
        )?;
        check(
            o.stop_loss_pct > Decimal::ZERO && o.stop_loss_pct < Decimal::ONE,
            format!("orders.stop_loss_pct must be in (0, 1), got {}", o.stop_loss_pct),
        )?;
        check(
            o.recv_window_ms > 0 && o.recv_window_ms <= MAX_RECV_WINDOW_MS,
            format!("orders.recv_window_ms must be in 1..={}", MAX_RECV_WINDOW_MS),
        )?;
        check(
            self.exchange.request_timeout_secs > 0,
            "exchange.request_timeout_secs must be positive".into(),
        )?;

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange.request_timeout_secs)
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            symbol: self.general.symbol.clone(),
            interval: self.general.interval.clone(),
            fast_period: self.strategy.fast_period,
            slow_period: self.strategy.slow_period,
            candle_limit: self.strategy.candle_limit,
            quantity: self.orders.quantity,
            take_profit_pct: self.orders.take_profit_pct,
            stop_loss_pct: self.orders.stop_loss_pct,
            poll_interval: Duration::from_secs(self.strategy.poll_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.strategy.fast_period, 50);
        assert_eq!(config.orders.recv_window_ms, 5000);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = Config::from_toml_str(
            r#"
            [general]
            symbol = "ETHUSDT"

            [orders]
            quantity = "0.05"
            "#,
        )
        .unwrap();

        assert_eq!(config.general.symbol, "ETHUSDT");
        assert_eq!(config.general.interval, "1h");
        assert_eq!(config.orders.quantity, dec!(0.05));
        assert_eq!(config.orders.take_profit_pct, dec!(0.10));
        assert_eq!(config.exchange.endpoints.order, "/fapi/v1/order");
    }

    #[test]
    fn test_endpoint_override() {
        let config = Config::from_toml_str(
            r#"
            [exchange]
            base_url = "https://testnet.binance.vision"

            [exchange.endpoints]
            klines = "/api/v3/klines"
            order = "/api/v3/order"
            "#,
        )
        .unwrap();

        assert_eq!(config.exchange.endpoints.klines, "/api/v3/klines");
        assert_eq!(config.exchange.endpoints.server_time, "/fapi/v1/time");
    }

    #[test]
    fn test_rejects_inverted_periods() {
        let result = Config::from_toml_str(
            r#"
            [strategy]
            fast_period = 200
            slow_period = 50
            "#,
        );
        assert!(matches!(result, Err(BotError::Config(_))));
    }

    #[test]
    fn test_rejects_window_shorter_than_slow_period() {
        let mut config = Config::default();
        config.strategy.candle_limit = 100;
        assert!(matches!(config.validate(), Err(BotError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_order_settings() {
        let mut config = Config::default();
        config.orders.quantity = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.orders.stop_loss_pct = Decimal::ONE;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.orders.recv_window_ms = 120_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert!(matches!(Config::from_toml_str("[general"), Err(BotError::Config(_))));
    }

    #[test]
    fn test_shipped_default_config_loads() {
        let config = Config::from_file(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_loop_settings() {
        let settings = Config::default().loop_settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(3600));
        assert_eq!(settings.candle_limit, 200);
    }
}
