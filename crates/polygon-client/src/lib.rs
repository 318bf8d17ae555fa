use async_trait::async_trait;
use harvest_core::{round_cents, HarvestError, QuoteSource};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://api.polygon.io";
const DEFAULT_RATE_LIMIT: usize = 500;
const MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(15);

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    /// Record a request at `now` if the window has room, else return how long to wait.
    fn try_reserve(&self, sent: &mut VecDeque<Instant>, now: Instant) -> Option<Duration> {
        while sent
            .front()
            .is_some_and(|&first| now.duration_since(first) >= self.window)
        {
            sent.pop_front();
        }

        match sent.front() {
            Some(&oldest) if sent.len() >= self.max_requests => {
                Some((oldest + self.window).saturating_duration_since(now) + Duration::from_millis(50))
            }
            _ => {
                sent.push_back(now);
                None
            }
        }
    }

    async fn acquire(&self) {
        loop {
            let wait = {
                let mut sent = self.timestamps.lock().await;
                match self.try_reserve(&mut sent, Instant::now()) {
                    None => return,
                    Some(wait) => wait,
                }
            };

            tracing::debug!("Polygon rate window full, next slot in {:.1}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }
}

/// Quote client over the Polygon.io stock snapshot endpoint
#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PolygonClient {
    pub fn new(api_key: String) -> Self {
        // A quote run makes one call per distinct ticker; POLYGON_RATE_LIMIT caps calls per minute.
        let rate_limit: usize = std::env::var("POLYGON_RATE_LIMIT")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
        }
    }

    /// Build from `POLYGON_API_KEY`
    pub fn from_env() -> Result<Self, HarvestError> {
        let api_key = std::env::var("POLYGON_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| HarvestError::ConfigError("POLYGON_API_KEY must be set".to_string()))?;
        Ok(Self::new(api_key))
    }

    /// Send a request through the rate limiter, backing off on HTTP 429.
    async fn send_request(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, HarvestError> {
        let request = builder
            .build()
            .map_err(|e| HarvestError::ApiError(e.to_string()))?;

        for attempt in 1..=MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;
            let attempt_request = request
                .try_clone()
                .ok_or_else(|| HarvestError::ApiError("request body is not replayable".to_string()))?;
            let response = self
                .client
                .execute(attempt_request)
                .await
                .map_err(|e| HarvestError::ApiError(e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            if attempt == MAX_ATTEMPTS {
                break;
            }

            let wait = retry_after(response.headers());
            tracing::warn!(
                "Polygon throttled request (attempt {}/{}), backing off {}s",
                attempt,
                MAX_ATTEMPTS,
                wait.as_secs()
            );
            tokio::time::sleep(wait).await;
        }

        Err(HarvestError::ApiError(format!(
            "Polygon still throttling after {} attempts",
            MAX_ATTEMPTS
        )))
    }

    /// Get snapshot for a ticker (near-real-time last trade, today's OHLCV, prev day)
    pub async fn get_snapshot(&self, symbol: &str) -> Result<SnapshotTicker, HarvestError> {
        let url = format!(
            "{}/v2/snapshot/locale/us/markets/stocks/tickers/{}",
            BASE_URL, symbol
        );

        let response = self
            .send_request(self.client.get(&url).query(&[("apiKey", &self.api_key)]))
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(HarvestError::QuoteUnavailable {
                ticker: symbol.to_string(),
                reason: "unknown ticker".to_string(),
            });
        }
        if !status.is_success() {
            return Err(HarvestError::ApiError(format!(
                "Snapshot HTTP {}: {}",
                status,
                response.text().await.unwrap_or_default()
            )));
        }

        let snap_response: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| HarvestError::ApiError(e.to_string()))?;

        Ok(snap_response.ticker)
    }
}

/// Back-off for a 429: the `Retry-After` seconds when present, else the default
fn retry_after(headers: &reqwest::header::HeaderMap) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

#[async_trait]
impl QuoteSource for PolygonClient {
    async fn current_price(&self, ticker: &str) -> Result<f64, HarvestError> {
        let snapshot = self.get_snapshot(ticker).await?;
        snapshot
            .last_price()
            .ok_or_else(|| HarvestError::QuoteUnavailable {
                ticker: ticker.to_string(),
                reason: "snapshot carries no price".to_string(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    ticker: SnapshotTicker,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotTicker {
    pub day: Option<SnapshotDay>,
    #[serde(rename = "lastTrade")]
    pub last_trade: Option<SnapshotLastTrade>,
    #[serde(rename = "prevDay")]
    pub prev_day: Option<SnapshotDay>,
    #[serde(rename = "todaysChange")]
    pub todays_change: Option<f64>,
    #[serde(rename = "todaysChangePerc")]
    pub todays_change_perc: Option<f64>,
}

impl SnapshotTicker {
    /// Last trade, else today's close, else previous close; rounded to cents.
    /// Zero prices (pre-market snapshots) are skipped.
    pub fn last_price(&self) -> Option<f64> {
        let usable = |p: Option<f64>| p.filter(|p| p.is_finite() && *p > 0.0);

        usable(self.last_trade.as_ref().and_then(|t| t.p))
            .or_else(|| usable(self.day.as_ref().and_then(|d| d.c)))
            .or_else(|| usable(self.prev_day.as_ref().and_then(|d| d.c)))
            .map(round_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDay {
    pub o: Option<f64>,
    pub h: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
    pub v: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLastTrade {
    pub p: Option<f64>,
    pub s: Option<i64>,
    pub t: Option<i64>,
}
