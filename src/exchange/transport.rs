use crate::error::{BotError, Result};
use futures_util::future::BoxFuture;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Outbound request, fully built and (if needed) signed.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueRequest {
    pub method: Method,
    pub path: String,
    /// Encoded query string without the leading `?`
    pub query: String,
    /// Sent as `X-MBX-APIKEY` when present
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VenueResponse {
    pub status: u16,
    pub body: String,
}

impl VenueResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Black-box HTTP collaborator.
///
/// Non-2xx responses are returned as `Ok`; only transport failures
/// (connect, timeout, body read) are `Err`.
pub trait Transport: Send + Sync {
    fn send(&self, request: VenueRequest) -> BoxFuture<'_, Result<VenueResponse>>;
}

/// Transport backed by `reqwest` with a bounded per-request timeout
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| BotError::Config(format!("Invalid base URL {}: {}", base_url, e)))?;

        Ok(Self { client, base_url })
    }

    fn url_for(&self, request: &VenueRequest) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&request.path)
            .map_err(|e| BotError::Config(format!("Invalid endpoint {}: {}", request.path, e)))?;

        if !request.query.is_empty() {
            url.set_query(Some(&request.query));
        }

        Ok(url)
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: VenueRequest) -> BoxFuture<'_, Result<VenueResponse>> {
        Box::pin(async move {
            let url = self.url_for(&request)?;
            debug!(method = %request.method, path = %request.path, "Sending venue request");

            let builder = match request.method {
                Method::Get => self.client.get(url),
                Method::Post => self.client.post(url),
                Method::Delete => self.client.delete(url),
            };

            let builder = match &request.api_key {
                Some(key) => builder.header("X-MBX-APIKEY", key),
                None => builder,
            };

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;

            Ok(VenueResponse { status, body })
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, query: &str) -> VenueRequest {
        VenueRequest {
            method: Method::Get,
            path: path.to_string(),
            query: query.to_string(),
            api_key: None,
        }
    }

    #[test]
    fn test_url_joins_path_and_query() {
        let transport =
            ReqwestTransport::new("https://testnet.binancefuture.com", Duration::from_secs(10)).unwrap();
        let url = transport
            .url_for(&request("/fapi/v1/klines", "symbol=BTCUSDT&interval=1h&limit=200"))
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://testnet.binancefuture.com/fapi/v1/klines?symbol=BTCUSDT&interval=1h&limit=200"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let result = ReqwestTransport::new("not a url", Duration::from_secs(1));
        assert!(matches!(result, Err(BotError::Config(_))));
    }

    #[test]
    fn test_response_success_range() {
        assert!(VenueResponse { status: 200, body: String::new() }.is_success());
        assert!(!VenueResponse { status: 400, body: String::new() }.is_success());
        assert!(!VenueResponse { status: 503, body: String::new() }.is_success());
    }

    #[tokio::test]
    async fn test_mock_queue_keeps_last_response() {
        let mock = mock::MockTransport::new();
        mock.respond(Method::Get, "/a", 200, "first");
        mock.respond(Method::Get, "/a", 200, "second");

        let first = mock.send(request("/a", "")).await.unwrap();
        let second = mock.send(request("/a", "")).await.unwrap();
        let third = mock.send(request("/a", "")).await.unwrap();

        assert_eq!(first.body, "first");
        assert_eq!(second.body, "second");
        assert_eq!(third.body, "second");
        assert_eq!(mock.sent().len(), 3);
    }
}
