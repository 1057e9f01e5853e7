use crate::data::Candle;
use crate::error::{BotError, Result};
use crate::exchange::binance::types::parse_kline;
use crate::exchange::BinanceRestClient;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// Fetches candle closes for the indicator window.
///
/// A fetch either yields a complete, parsed series or an error. An empty
/// payload is never handed on as valid data.
pub struct MarketDataFeed {
    client: Arc<BinanceRestClient>,
}

impl MarketDataFeed {
    pub fn new(client: Arc<BinanceRestClient>) -> Self {
        Self { client }
    }

    pub async fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Candle>> {
        if limit == 0 {
            return Err(BotError::Data("candle limit must be positive".into()));
        }

        let rows = self.client.get_klines(symbol, interval, limit).await?;

        if rows.is_empty() {
            return Err(BotError::Data(format!("venue returned no candles for {} {}", symbol, interval)));
        }

        let candles = rows.iter().map(parse_kline).collect::<Result<Vec<_>>>()?;

        debug!(
            symbol,
            interval,
            requested = limit,
            received = candles.len(),
            "Fetched candles"
        );

        Ok(candles)
    }

    /// Close prices, oldest first. Length is `limit` or fewer when the
    /// venue truncates.
    pub async fn fetch_closes(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Decimal>> {
        let candles = self.fetch_candles(symbol, interval, limit).await?;
        Ok(candles.into_iter().map(|c| c.close).collect())
    }

    /// Most recent close from a fresh fetch of `limit` candles
    pub async fn latest_close(&self, symbol: &str, interval: &str, limit: usize) -> Result<Decimal> {
        let closes = self.fetch_closes(symbol, interval, limit).await?;
        closes
            .last()
            .copied()
            .ok_or_else(|| BotError::Data("no close price available".into()))
    }
}

#[cfg(test)]
pub mod testing {
    //! Kline payload builders shared by the engine tests

    use rust_decimal::Decimal;

    pub fn kline_body(closes: &[Decimal]) -> String {
        let rows: Vec<String> = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let open_time = 1_700_000_000_000i64 + i as i64 * 3_600_000;
                format!(
                    r#"[{}, "{c}", "{c}", "{c}", "{c}", "1.0", {}, "0", 1, "0", "0", "0"]"#,
                    open_time,
                    open_time + 3_599_999,
                    c = close
                )
            })
            .collect();
        format!("[{}]", rows.join(","))
    }
}
