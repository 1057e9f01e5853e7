use crate::data::{Candle, OrderType, Side, TimeInForce};
use crate::error::{BotError, Result};
use crate::exchange::binance::auth::QueryParams;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kline row layout: [openTime, open, high, low, close, volume, closeTime, ...]
const KLINE_OPEN_TIME: usize = 0;
const KLINE_CLOSE: usize = 4;
const KLINE_CLOSE_TIME: usize = 6;

/// Unsigned part of an order submission
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: Side, quantity: Decimal) -> Result<Self> {
        let request = Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: None,
        };
        request.validate()?;
        Ok(request)
    }

    /// Good-Till-Cancel limit order
    pub fn limit(symbol: &str, side: Side, quantity: Decimal, price: Decimal) -> Result<Self> {
        let request = Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            time_in_force: Some(TimeInForce::Gtc),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() {
            return Err(BotError::InvalidOrder("symbol is empty".into()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(BotError::InvalidOrder(format!("quantity must be positive, got {}", self.quantity)));
        }
        match (self.order_type, self.price) {
            (OrderType::Limit, None) => Err(BotError::InvalidOrder("LIMIT order requires a price".into())),
            (OrderType::Limit, Some(p)) if p <= Decimal::ZERO => {
                Err(BotError::InvalidOrder(format!("price must be positive, got {}", p)))
            }
            _ => Ok(()),
        }
    }

    /// Order fields as query parameters. Timestamp, recvWindow and the
    /// signature are added by the client at send time.
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new()
            .with("symbol", &self.symbol)
            .with("side", self.side.as_str())
            .with("type", self.order_type.as_str())
            .with("quantity", self.quantity.normalize());

        if let Some(price) = self.price {
            params.push("price", price.normalize());
        }
        if let Some(tif) = self.time_in_force {
            params.push("timeInForce", tif.as_str());
        }

        params
    }
}

/// Order acknowledgement. Spot and futures responses differ, so
/// everything beyond the id is optional.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: u64,

    pub symbol: String,

    #[serde(rename = "clientOrderId", default)]
    pub client_order_id: String,

    #[serde(default)]
    pub price: Option<String>,

    #[serde(rename = "avgPrice", default)]
    pub avg_price: Option<String>,

    #[serde(rename = "origQty", default)]
    pub orig_qty: Option<String>,

    #[serde(rename = "executedQty", default)]
    pub executed_qty: Option<String>,

    #[serde(default)]
    pub status: String, // "NEW", "FILLED", etc.

    #[serde(rename = "timeInForce", default)]
    pub time_in_force: Option<String>,

    #[serde(rename = "type", default)]
    pub order_type: Option<String>,

    #[serde(default)]
    pub side: Option<String>,

    #[serde(rename = "updateTime", alias = "transactTime", default)]
    pub update_time: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerTime {
    #[serde(rename = "serverTime")]
    pub server_time: u64,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

/// One asset row of the futures balance endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AssetBalance {
    pub asset: String,

    pub balance: Decimal,

    #[serde(rename = "availableBalance", default)]
    pub available_balance: Option<Decimal>,

    #[serde(rename = "crossUnPnl", default)]
    pub cross_un_pnl: Option<Decimal>,
}

/// Parse one kline row into a candle
pub fn parse_kline(row: &Value) -> Result<Candle> {
    let fields = row
        .as_array()
        .ok_or_else(|| BotError::Data(format!("kline row is not an array: {}", row)))?;

    if fields.len() <= KLINE_CLOSE_TIME {
        return Err(BotError::Data(format!("kline row has {} fields, expected at least 7", fields.len())));
    }

    let open_time = fields[KLINE_OPEN_TIME]
        .as_i64()
        .ok_or_else(|| BotError::Data("kline open time is not an integer".into()))?;
    let close_time = fields[KLINE_CLOSE_TIME]
        .as_i64()
        .ok_or_else(|| BotError::Data("kline close time is not an integer".into()))?;

    // Closes arrive as strings; accept bare numbers too
    let close = match &fields[KLINE_CLOSE] {
        Value::String(s) => s.parse::<Decimal>().ok(),
        Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        _ => None,
    }
    .ok_or_else(|| BotError::Data(format!("unparsable close price: {}", fields[KLINE_CLOSE])))?;

    Candle::new(open_time, close_time, close)
        .ok_or_else(|| BotError::Data(format!("kline timestamp out of range: {}", open_time)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_kline_row() {
        let row: Value = serde_json::from_str(
            r#"[1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100",
                "148976.11427815", 1499644799999, "2434.19055334", 308, "1756.87402397",
                "28.46694368", "0"]"#,
        )
        .unwrap();

        let candle = parse_kline(&row).unwrap();
        assert_eq!(candle.close, dec!(0.01577100));
        assert_eq!(candle.close_time.timestamp_millis(), 1499644799999);
    }

    #[test]
    fn test_parse_kline_rejects_short_row() {
        let row: Value = serde_json::from_str(r#"[1499040000000, "1", "2"]"#).unwrap();
        assert!(matches!(parse_kline(&row), Err(BotError::Data(_))));
    }

    #[test]
    fn test_parse_kline_needs_close_time() {
        let six: Value = serde_json::from_str(r#"[1499040000000, "1", "2", "0.5", "1.5", "10"]"#).unwrap();
        assert!(matches!(parse_kline(&six), Err(BotError::Data(_))));

        let seven: Value =
            serde_json::from_str(r#"[1499040000000, "1", "2", "0.5", "1.5", "10", 1499043599999]"#).unwrap();
        let candle = parse_kline(&seven).unwrap();
        assert_eq!(candle.close, dec!(1.5));
        assert_eq!(candle.open_time.timestamp_millis(), 1499040000000);
    }

    #[test]
    fn test_parse_kline_rejects_bad_close() {
        let row: Value =
            serde_json::from_str(r#"[1, "1", "2", "0.5", "abc", "10", 2]"#).unwrap();
        assert!(matches!(parse_kline(&row), Err(BotError::Data(_))));
    }

    #[test]
    fn test_order_request_validation() {
        assert!(OrderRequest::market("BTCUSDT", Side::Buy, dec!(0.001)).is_ok());
        assert!(matches!(
            OrderRequest::market("BTCUSDT", Side::Buy, Decimal::ZERO),
            Err(BotError::InvalidOrder(_))
        ));
        assert!(matches!(
            OrderRequest::limit("BTCUSDT", Side::Sell, dec!(-1), dec!(100)),
            Err(BotError::InvalidOrder(_))
        ));
        assert!(matches!(
            OrderRequest::limit("BTCUSDT", Side::Sell, dec!(1), Decimal::ZERO),
            Err(BotError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_limit_params_include_price_and_tif() {
        let request = OrderRequest::limit("BTCUSDT", Side::Sell, dec!(0.001), dec!(110.00)).unwrap();
        let params = request.to_params();

        assert_eq!(params.get("type"), Some("LIMIT"));
        assert_eq!(params.get("price"), Some("110"));
        assert_eq!(params.get("timeInForce"), Some("GTC"));
        assert_eq!(params.get("quantity"), Some("0.001"));
    }

    #[test]
    fn test_market_params_have_no_price() {
        let request = OrderRequest::market("BTCUSDT", Side::Buy, dec!(0.001)).unwrap();
        let params = request.to_params();

        assert_eq!(params.get("price"), None);
        assert_eq!(params.get("timeInForce"), None);
    }

    #[test]
    fn test_parse_futures_order_response() {
        let json = r#"{
            "orderId": 22542179,
            "symbol": "BTCUSDT",
            "status": "NEW",
            "clientOrderId": "testOrder",
            "price": "0",
            "avgPrice": "0.00000",
            "origQty": "0.001",
            "executedQty": "0",
            "timeInForce": "GTC",
            "type": "MARKET",
            "side": "BUY",
            "updateTime": 1566818724722
        }"#;

        let response: OrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.order_id, 22542179);
        assert_eq!(response.update_time, Some(1566818724722));
    }

    #[test]
    fn test_parse_spot_ack_response() {
        let json = r#"{"symbol":"BTCUSDT","orderId":28,"clientOrderId":"x","transactTime":1507725176595}"#;
        let response: OrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.order_id, 28);
        assert_eq!(response.update_time, Some(1507725176595));
    }

    #[test]
    fn test_parse_balance() {
        let json = r#"[{"accountAlias":"SgsR","asset":"USDT","balance":"122607.35137903",
            "crossWalletBalance":"23.72469206","crossUnPnl":"0.00000000",
            "availableBalance":"23.72469206","maxWithdrawAmount":"23.72469206",
            "marginAvailable":true,"updateTime":1617939110373}]"#;

        let balances: Vec<AssetBalance> = serde_json::from_str(json).unwrap();
        assert_eq!(balances[0].asset, "USDT");
        assert_eq!(balances[0].balance, dec!(122607.35137903));
    }
}
