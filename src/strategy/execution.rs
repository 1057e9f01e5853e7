use crate::data::{MarketDataFeed, Side};
use crate::error::{BotError, BracketLeg, Result};
use crate::exchange::binance::{OrderRequest, OrderResponse};
use crate::exchange::BinanceRestClient;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Candles fetched when re-reading the entry price
const ENTRY_PRICE_LOOKBACK: usize = 1;

/// Entry reference and the two exit levels derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketPrices {
    pub entry: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

/// Take-profit and stop-loss levels around `entry`.
///
/// BUY puts TP above and SL below; SELL inverts both. Levels are rounded to
/// `precision` decimal places.
pub fn bracket_prices(
    side: Side,
    entry: Decimal,
    take_profit_pct: Decimal,
    stop_loss_pct: Decimal,
    precision: u32,
) -> BracketPrices {
    let (tp_factor, sl_factor) = match side {
        Side::Buy => (Decimal::ONE + take_profit_pct, Decimal::ONE - stop_loss_pct),
        Side::Sell => (Decimal::ONE - take_profit_pct, Decimal::ONE + stop_loss_pct),
    };

    BracketPrices {
        entry,
        take_profit: (entry * tp_factor).round_dp(precision),
        stop_loss: (entry * sl_factor).round_dp(precision),
    }
}

/// Result of one submission
#[derive(Debug)]
pub enum LegOutcome {
    Accepted(OrderResponse),
    /// The venue answered 2xx but the ack could not be read; treat as live
    Unconfirmed(BotError),
    Rejected(BotError),
}

impl LegOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, LegOutcome::Accepted(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, LegOutcome::Rejected(_))
    }

    pub fn ack(&self) -> Option<&OrderResponse> {
        match self {
            LegOutcome::Accepted(ack) => Some(ack),
            LegOutcome::Unconfirmed(_) | LegOutcome::Rejected(_) => None,
        }
    }

    pub fn error(&self) -> Option<&BotError> {
        match self {
            LegOutcome::Accepted(_) | LegOutcome::Unconfirmed(_) => None,
            LegOutcome::Rejected(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// No leg rejected
    Complete,
    /// One or two legs failed; the position may be unhedged
    Partial,
    /// Nothing was accepted
    Failed,
}

/// Per-leg outcome of an entry + bracket placement
#[derive(Debug)]
pub struct BracketReport {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub prices: BracketPrices,
    pub entry: LegOutcome,
    pub take_profit: LegOutcome,
    pub stop_loss: LegOutcome,
}

impl BracketReport {
    pub fn legs(&self) -> [(BracketLeg, &LegOutcome); 3] {
        [
            (BracketLeg::Entry, &self.entry),
            (BracketLeg::TakeProfit, &self.take_profit),
            (BracketLeg::StopLoss, &self.stop_loss),
        ]
    }

    pub fn failed_legs(&self) -> Vec<BracketLeg> {
        self.legs()
            .iter()
            .filter(|(_, outcome)| outcome.is_rejected())
            .map(|(leg, _)| *leg)
            .collect()
    }

    /// Legs the venue took but whose acknowledgement was unreadable
    pub fn unconfirmed_legs(&self) -> Vec<BracketLeg> {
        self.legs()
            .iter()
            .filter(|(_, outcome)| matches!(outcome, LegOutcome::Unconfirmed(_)))
            .map(|(leg, _)| *leg)
            .collect()
    }

    pub fn status(&self) -> ExecutionStatus {
        match self.failed_legs().len() {
            0 => ExecutionStatus::Complete,
            3 => ExecutionStatus::Failed,
            _ => ExecutionStatus::Partial,
        }
    }

    /// Collapse into a `Result`: partial placement becomes
    /// `BotError::PartialExecution`, total failure the entry's own error.
    pub fn into_result(self) -> Result<BracketReport> {
        let failed = self.failed_legs();
        if failed.is_empty() {
            return Ok(self);
        }

        let detail = self
            .legs()
            .iter()
            .filter_map(|(leg, outcome)| outcome.error().map(|e| format!("{}: {}", leg, e)))
            .collect::<Vec<_>>()
            .join("; ");

        match (failed.len(), self.entry) {
            (3, LegOutcome::Rejected(err)) => Err(err),
            _ => Err(BotError::PartialExecution { failed, detail }),
        }
    }
}

/// Places a market entry with take-profit and stop-loss limit legs.
///
/// The three submissions are independent: each gets its own server
/// timestamp and signature, all three are attempted, and nothing is rolled
/// back or retried.
pub struct OrderExecutor {
    client: Arc<BinanceRestClient>,
    feed: Arc<MarketDataFeed>,
    interval: String,
    price_precision: u32,
}

impl OrderExecutor {
    pub fn new(
        client: Arc<BinanceRestClient>,
        feed: Arc<MarketDataFeed>,
        interval: String,
        price_precision: u32,
    ) -> Self {
        Self {
            client,
            feed,
            interval,
            price_precision,
        }
    }

    /// Returns `Err` only when nothing was submitted (no secret, no entry
    /// price). Leg failures are reported in the `BracketReport`.
    pub async fn place_entry_with_bracket(
        &self,
        symbol: &str,
        side: Side,
        quantity: Decimal,
        take_profit_pct: Decimal,
        stop_loss_pct: Decimal,
    ) -> Result<BracketReport> {
        self.client.can_sign()?;

        if quantity <= Decimal::ZERO {
            return Err(BotError::InvalidOrder(format!("quantity must be positive, got {}", quantity)));
        }

        // Fresh read, independent of the candles that produced the signal
        let entry_price = self
            .feed
            .latest_close(symbol, &self.interval, ENTRY_PRICE_LOOKBACK)
            .await?;

        let prices = bracket_prices(side, entry_price, take_profit_pct, stop_loss_pct, self.price_precision);
        let exit_side = side.opposite();

        info!(
            symbol,
            %side,
            %quantity,
            entry = %prices.entry,
            take_profit = %prices.take_profit,
            stop_loss = %prices.stop_loss,
            "Placing entry with bracket"
        );

        let entry = self
            .submit_leg(BracketLeg::Entry, OrderRequest::market(symbol, side, quantity))
            .await;
        let take_profit = self
            .submit_leg(
                BracketLeg::TakeProfit,
                OrderRequest::limit(symbol, exit_side, quantity, prices.take_profit),
            )
            .await;
        let stop_loss = self
            .submit_leg(
                BracketLeg::StopLoss,
                OrderRequest::limit(symbol, exit_side, quantity, prices.stop_loss),
            )
            .await;

        let report = BracketReport {
            symbol: symbol.to_string(),
            side,
            quantity,
            prices,
            entry,
            take_profit,
            stop_loss,
        };

        match report.status() {
            ExecutionStatus::Complete => info!(symbol, %side, "Bracket placed"),
            ExecutionStatus::Partial => warn!(
                symbol,
                %side,
                failed = ?report.failed_legs(),
                "Bracket partially placed; position may be unhedged"
            ),
            ExecutionStatus::Failed => error!(symbol, %side, "Bracket placement failed on every leg"),
        }

        Ok(report)
    }

    async fn submit_leg(&self, leg: BracketLeg, order: Result<OrderRequest>) -> LegOutcome {
        match self.send_leg(order).await {
            Ok(ack) => {
                info!(%leg, order_id = ack.order_id, "Leg accepted");
                LegOutcome::Accepted(ack)
            }
            Err(err @ BotError::UnreadableAck { .. }) => {
                error!(%leg, error = %err, "Leg acknowledgement unreadable; order may be live");
                LegOutcome::Unconfirmed(err)
            }
            Err(err) => {
                error!(%leg, error = %err, "Leg rejected");
                LegOutcome::Rejected(err)
            }
        }
    }

    /// Fetch server time immediately before signing this leg
    async fn send_leg(&self, order: Result<OrderRequest>) -> Result<OrderResponse> {
        let order = order?;
        let timestamp = self.client.get_server_time().await?;
        self.client.place_order_at(&order, timestamp).await
    }
}
