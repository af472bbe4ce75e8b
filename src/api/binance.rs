use super::Exchange;
use crate::config::ExchangeSettings;
use crate::error::BotError;
use crate::models::{Candle, OrderConfirmation, TradeSide, TradingLimits};
use crate::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::str::FromStr;
use uuid::Uuid;

// Binance Spot REST API
// Docs: https://developers.binance.com/docs/binance-spot-api-docs/rest-api
pub const BINANCE_API_BASE: &str = "https://api.binance.com";
const KLINES_PAGE_LIMIT: usize = 1000;
const DEFAULT_MIN_NOTIONAL: u32 = 10;
const DEFAULT_RECV_WINDOW_MS: u64 = 60_000;
const CLIENT_ORDER_PREFIX: &str = "xb-";

type HmacSha256 = Hmac<Sha256>;

/// Client for the Binance Spot REST API
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    recv_window_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    filters: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    free: Decimal,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: i64,
    client_order_id: String,
    status: String,
    executed_qty: Decimal,
}

impl BinanceClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            recv_window_ms: DEFAULT_RECV_WINDOW_MS,
        }
    }

    /// Build a client from the exchange section of the settings
    pub fn from_settings(settings: &ExchangeSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            api_secret: settings.api_secret.clone(),
            recv_window_ms: settings.recv_window_ms,
        })
    }

    /// HMAC-SHA256 of the query string, hex encoded
    fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| BotError::InvalidConfig(format!("Invalid API secret: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn signed_query(&self, params: &[(&str, String)]) -> Result<String> {
        let mut pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        pairs.push(format!("recvWindow={}", self.recv_window_ms));
        pairs.push(format!("timestamp={}", Utc::now().timestamp_millis()));

        let query = pairs.join("&");
        let signature = self.sign(&query)?;
        Ok(format!("{}&signature={}", query, signature))
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        let response = self.client.get(&url).send().await?;
        Self::parse_response(response).await
    }

    async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}?{}", self.base_url, path, self.signed_query(params)?);
        let response = self
            .client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Decode a success body, or map an error body to a provider error
    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        // Peer closed the connection mid-body
        let body = response.text().await.map_err(|e| {
            BotError::TransientNetwork(format!("Failed to read response body: {}", e))
        })?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) => Err(BotError::Provider {
                status: status.as_u16(),
                code: err.code,
                msg: err.msg,
            }),
            Err(_) => Err(BotError::Unclassified(format!("HTTP {}: {}", status, body))),
        }
    }

    async fn klines(&self, query: &str) -> Result<Vec<Candle>> {
        let rows: Vec<Vec<serde_json::Value>> = self.get_public("/api/v3/klines", query).await?;
        rows.iter().map(|row| parse_kline(row)).collect()
    }
}

/// Kline rows are arrays: `[open_time, open, high, low, close, volume, ...]`
fn parse_kline(row: &[serde_json::Value]) -> Result<Candle> {
    let timestamp = row
        .first()
        .and_then(|v| v.as_i64())
        .ok_or("Kline row missing open time")?;
    let close = row
        .get(4)
        .and_then(|v| v.as_str())
        .ok_or("Kline row missing close price")?;

    Ok(Candle {
        timestamp,
        close: Decimal::from_str(close)?,
    })
}

/// Extract lot size and notional limits from a symbol's filter list
fn limits_from_filters(filters: &[serde_json::Value]) -> Result<TradingLimits> {
    let field = |f: &serde_json::Value, name: &str| -> Result<Option<Decimal>> {
        match f.get(name).and_then(|v| v.as_str()) {
            Some(s) => Ok(Some(Decimal::from_str(s)?)),
            None => Ok(None),
        }
    };

    let mut lot_size = None;
    let mut min_notional = None;

    for f in filters {
        match f.get("filterType").and_then(|t| t.as_str()).unwrap_or("") {
            "LOT_SIZE" => {
                let min_qty = field(f, "minQty")?.ok_or("LOT_SIZE filter missing minQty")?;
                let step_size = field(f, "stepSize")?.ok_or("LOT_SIZE filter missing stepSize")?;
                lot_size = Some((min_qty, step_size));
            }
            "MIN_NOTIONAL" | "NOTIONAL" => {
                if let Some(value) = field(f, "minNotional")? {
                    min_notional = Some(value);
                }
            }
            _ => {}
        }
    }

    let (min_qty, step_size) = lot_size.ok_or("Symbol has no LOT_SIZE filter")?;

    Ok(TradingLimits {
        min_qty,
        min_notional: min_notional.unwrap_or_else(|| Decimal::from(DEFAULT_MIN_NOTIONAL)),
        step_size,
    })
}

#[async_trait]
impl Exchange for BinanceClient {
    async fn symbol_limits(&self, symbol: &str) -> Result<TradingLimits> {
        let info: ExchangeInfoResponse = self
            .get_public("/api/v3/exchangeInfo", &format!("symbol={}", symbol))
            .await?;

        let symbol_info = info
            .symbols
            .into_iter()
            .find(|s| s.symbol == symbol)
            .ok_or_else(|| BotError::Unclassified(format!("Symbol {} not listed", symbol)))?;

        limits_from_filters(&symbol_info.filters)
    }

    async fn historical_candles(
        &self,
        symbol: &str,
        interval: &str,
        lookback: Duration,
    ) -> Result<Vec<Candle>> {
        let end_ms = Utc::now().timestamp_millis();
        let mut start_ms = end_ms - lookback.num_milliseconds();
        let mut candles: Vec<Candle> = Vec::new();

        loop {
            let query = format!(
                "symbol={}&interval={}&startTime={}&endTime={}&limit={}",
                symbol, interval, start_ms, end_ms, KLINES_PAGE_LIMIT
            );
            let page = self.klines(&query).await?;
            let page_len = page.len();
            candles.extend(page);

            match candles.last() {
                Some(last) if page_len == KLINES_PAGE_LIMIT && last.timestamp < end_ms => {
                    start_ms = last.timestamp + 1;
                }
                _ => break,
            }
        }

        tracing::debug!(symbol, interval, count = candles.len(), "Fetched historical klines");
        Ok(candles)
    }

    async fn latest_candles(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Candle>> {
        self.klines(&format!("symbol={}&interval={}&limit={}", symbol, interval, count))
            .await
    }

    async fn balance(&self, asset: &str) -> Result<Decimal> {
        let account: AccountResponse = self
            .send_signed(Method::GET, "/api/v3/account", &[])
            .await?;

        Ok(account
            .balances
            .into_iter()
            .find(|b| b.asset == asset)
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO))
    }

    async fn current_price(&self, symbol: &str) -> Result<Decimal> {
        let ticker: TickerPrice = self
            .get_public("/api/v3/ticker/price", &format!("symbol={}", symbol))
            .await?;
        Ok(ticker.price)
    }

    async fn submit_market_order(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: &str,
    ) -> Result<OrderConfirmation> {
        let client_order_id = format!("{}{}", CLIENT_ORDER_PREFIX, Uuid::new_v4().simple());
        let params = [
            ("symbol", symbol.to_string()),
            ("side", side.as_str().to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", quantity.to_string()),
            ("newClientOrderId", client_order_id),
        ];

        let order: OrderResponse = self
            .send_signed(Method::POST, "/api/v3/order", &params)
            .await?;

        Ok(OrderConfirmation {
            order_id: order.order_id,
            client_order_id: order.client_order_id,
            status: order.status,
            executed_qty: order.executed_qty,
        })
    }
}
