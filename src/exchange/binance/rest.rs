use crate::error::{BotError, Result};
use crate::exchange::binance::auth::{self, Credentials, ParamOrder, QueryParams};
use crate::exchange::binance::types::{ApiErrorBody, AssetBalance, OrderRequest, OrderResponse, ServerTime};
use crate::exchange::transport::{Method, Transport, VenueRequest, VenueResponse};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Venue paths, relative to the base URL. Defaults are USDⓈ-M futures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub klines: String,
    pub server_time: String,
    pub order: String,
    pub open_orders: String,
    pub balance: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            klines: "/fapi/v1/klines".into(),
            server_time: "/fapi/v1/time".into(),
            order: "/fapi/v1/order".into(),
            open_orders: "/fapi/v1/openOrders".into(),
            balance: "/fapi/v2/balance".into(),
        }
    }
}

/// Binance REST API client
///
/// Every signed call fetches the venue's server time immediately before
/// signing, so local clock drift never pushes a request outside recvWindow.
pub struct BinanceRestClient {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    endpoints: Endpoints,
    recv_window_ms: u64,
}

impl BinanceRestClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Credentials,
        endpoints: Endpoints,
        recv_window_ms: u64,
    ) -> Self {
        Self {
            transport,
            credentials,
            endpoints,
            recv_window_ms,
        }
    }

    /// Raw kline rows, oldest first
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Value>> {
        let params = QueryParams::new()
            .with("symbol", symbol)
            .with("interval", interval)
            .with("limit", limit);

        let body = self.execute_public_request(&self.endpoints.klines, &params).await?;
        let payload: Value = serde_json::from_str(&body)?;

        match payload {
            Value::Array(rows) => Ok(rows),
            other => Err(BotError::Data(format!("klines payload is not an array: {}", other))),
        }
    }

    /// Get exchange time in milliseconds
    pub async fn get_server_time(&self) -> Result<u64> {
        let body = self
            .execute_public_request(&self.endpoints.server_time, &QueryParams::new())
            .await?;
        let time: ServerTime = serde_json::from_str(&body)?;
        Ok(time.server_time)
    }

    /// Fails with `ConfigError` when no secret is configured
    pub fn can_sign(&self) -> Result<()> {
        self.credentials.secret_key().map(|_| ())
    }

    /// Submit one order, timestamped with a fresh server time
    pub async fn place_order(&self, order: &OrderRequest) -> Result<OrderResponse> {
        self.can_sign()?;
        let timestamp = self.get_server_time().await?;
        self.place_order_at(order, timestamp).await
    }

    /// Submit one order signed with the given venue timestamp
    pub async fn place_order_at(&self, order: &OrderRequest, timestamp: u64) -> Result<OrderResponse> {
        order.validate()?;

        info!(
            symbol = %order.symbol,
            side = %order.side,
            order_type = order.order_type.as_str(),
            quantity = %order.quantity,
            price = ?order.price,
            timestamp,
            "Submitting order"
        );

        let path = &self.endpoints.order;
        let body = self
            .send_signed_at(Method::Post, path, order.to_params(), timestamp)
            .await?;
        let response: OrderResponse = serde_json::from_str(&body).map_err(|e| {
            error!(path = %path, error = %e, "Order accepted but acknowledgement unreadable; order may be live");
            BotError::UnreadableAck {
                path: path.clone(),
                detail: e.to_string(),
            }
        })?;

        info!(order_id = response.order_id, status = %response.status, "Order accepted");
        Ok(response)
    }

    /// Cancel an order
    pub async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<OrderResponse> {
        let params = QueryParams::new()
            .with("symbol", symbol)
            .with("orderId", order_id);

        self.execute_signed_request(Method::Delete, &self.endpoints.order, params)
            .await
    }

    /// All open orders on a symbol
    pub async fn get_open_orders(&self, symbol: &str) -> Result<Vec<OrderResponse>> {
        let params = QueryParams::new().with("symbol", symbol);

        self.execute_signed_request(Method::Get, &self.endpoints.open_orders, params)
            .await
    }

    /// Wallet balance per asset
    pub async fn get_balance(&self) -> Result<Vec<AssetBalance>> {
        self.execute_signed_request(Method::Get, &self.endpoints.balance, QueryParams::new())
            .await
    }

    async fn execute_public_request(&self, path: &str, params: &QueryParams) -> Result<String> {
        let request = VenueRequest {
            method: Method::Get,
            path: path.to_string(),
            query: params.canonical(ParamOrder::Insertion),
            api_key: None,
        };

        let response = self.transport.send(request).await?;
        Self::check_response(path, response)
    }

    /// Timestamp with a fresh server time, sign and send. The secret is
    /// checked before any network traffic.
    async fn execute_signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: QueryParams,
    ) -> Result<T> {
        self.can_sign()?;
        let timestamp = self.get_server_time().await?;
        self.execute_signed_request_at(method, path, params, timestamp).await
    }

    async fn execute_signed_request_at<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: QueryParams,
        timestamp: u64,
    ) -> Result<T> {
        let body = self.send_signed_at(method, path, params, timestamp).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_signed_at(
        &self,
        method: Method,
        path: &str,
        mut params: QueryParams,
        timestamp: u64,
    ) -> Result<String> {
        let secret = self.credentials.secret_key()?;

        params.push("recvWindow", self.recv_window_ms);
        params.push("timestamp", timestamp);

        let query = auth::build_signed_query(&params, secret, ParamOrder::Sorted)?;
        debug!(%method, path, timestamp, "Sending signed request");

        let request = VenueRequest {
            method,
            path: path.to_string(),
            query,
            api_key: Some(self.credentials.api_key.clone()),
        };

        let response = self.transport.send(request).await?;
        Self::check_response(path, response)
    }

    /// Map non-2xx responses to `BotError::Venue`, decoding `{code, msg}`
    /// when the body carries it
    fn check_response(path: &str, response: VenueResponse) -> Result<String> {
        if response.is_success() {
            return Ok(response.body);
        }

        let (code, message) = match serde_json::from_str::<ApiErrorBody>(&response.body) {
            Ok(body) => (body.code, body.msg),
            Err(_) => (0, response.body),
        };

        error!(path, status = response.status, code, %message, "Venue request failed");

        Err(BotError::Venue {
            status: response.status,
            code,
            message,
        })
    }
}
