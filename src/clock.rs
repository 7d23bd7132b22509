//! Trusted time for token validity checks.
//!
//! Token expiry is compared against the server's clock, not the device's.
//! [`DriftCorrectedClock`] measures the offset between the two with a round
//! trip against the server time endpoint (Cristian's algorithm) and caches
//! the measured correction for a bounded interval. It never fails: when the
//! server cannot be reached it falls back to uncorrected local time.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::JournalsConfig;

const SERVER_NOW_PATH: &str = "/api/1/misc/now";
const DRIFT_REFRESH_MS: u64 = 15 * 60 * 1000;

/// Source of server-synchronized time.
///
/// Contract: returns milliseconds since the Unix epoch; repeated calls a few
/// seconds apart differ only by elapsed wall time.
#[async_trait]
pub trait ServerClock: Send + Sync {
    async fn now_ms(&self) -> u64;
}

/// Uncorrected wall clock. Suitable when the device clock is known to be
/// synchronized out of band.
pub struct SystemClock;

#[async_trait]
impl ServerClock for SystemClock {
    async fn now_ms(&self) -> u64 {
        local_now_ms()
    }
}

fn local_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy)]
struct ClockDrift {
    correction_ms: i64,
    checked_at_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ServerNowResponse {
    /// Server time in seconds since the Unix epoch.
    now: f64,
}

/// Wall clock corrected by the measured offset from the server clock.
pub struct DriftCorrectedClock {
    http: reqwest::Client,
    base_url: String,
    drift: Mutex<Option<ClockDrift>>,
}

impl DriftCorrectedClock {
    pub fn new(config: &JournalsConfig) -> Self {
        Self::with_http_client(reqwest::Client::new(), config)
    }

    /// Reuse an existing HTTP client.
    pub fn with_http_client(http: reqwest::Client, config: &JournalsConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            drift: Mutex::new(None),
        }
    }

    /// One round trip against the time endpoint; the one-way latency is
    /// assumed to be half the round trip.
    async fn measure(&self) -> Result<ClockDrift, reqwest::Error> {
        let started = local_now_ms();
        let response = self
            .http
            .get(format!("{}{}", self.base_url, SERVER_NOW_PATH))
            .send()
            .await?
            .error_for_status()?;
        let data: ServerNowResponse = response.json().await?;
        let finished = local_now_ms();

        let one_way = finished.saturating_sub(started) / 2;
        let correction_ms = (data.now * 1000.0) as i64 - (started + one_way) as i64;
        Ok(ClockDrift {
            correction_ms,
            checked_at_ms: finished,
        })
    }

    async fn drift(&self) -> ClockDrift {
        let mut cached = self.drift.lock().await;
        if let Some(drift) = *cached {
            if drift.checked_at_ms + DRIFT_REFRESH_MS > local_now_ms() {
                return drift;
            }
        }

        let measured = match self.measure().await {
            Ok(drift) => drift,
            Err(e) => {
                log::warn!("failed to measure server clock drift: {e}");
                // Synthetic zero correction, cached like a real measurement
                // so an unreachable server is not re-polled on every call.
                ClockDrift {
                    correction_ms: 0,
                    checked_at_ms: local_now_ms(),
                }
            }
        };
        *cached = Some(measured);
        measured
    }
}

#[async_trait]
impl ServerClock for DriftCorrectedClock {
    async fn now_ms(&self) -> u64 {
        let drift = self.drift().await;
        (local_now_ms() as i64 + drift.correction_ms).max(0) as u64
    }
}
