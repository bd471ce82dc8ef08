use async_trait::async_trait;
use relaysync_types::{MetricSample, MetricsConfig};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

const TIMEOUT_SECS: u64 = 10;

/// Push-style metrics backend.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn submit(&self, samples: &[MetricSample]) -> CoreResult<()>;
}

/// Datadog series API (v1) sink.
pub struct DatadogSink {
    client: Client,
    url: String,
    api_key: String,
}

#[derive(Serialize)]
struct SeriesPayload<'a> {
    series: Vec<Series<'a>>,
}

#[derive(Serialize)]
struct Series<'a> {
    metric: &'a str,
    points: [(i64, f64); 1],
    #[serde(rename = "type")]
    kind: &'static str,
    host: &'a str,
    tags: &'a [String],
}

impl DatadogSink {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> CoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| CoreError::MetricsDelivery(format!("failed to create client: {e}")))?;
        Ok(Self { client, url: url.into(), api_key: api_key.into() })
    }

    /// Build a sink from config; `None` when no API key is configured.
    pub fn from_config(config: &MetricsConfig) -> CoreResult<Option<Self>> {
        match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => Self::new(config.series_url(), key).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MetricsSink for DatadogSink {
    fn name(&self) -> &'static str {
        "datadog"
    }

    async fn submit(&self, samples: &[MetricSample]) -> CoreResult<()> {
        let payload = SeriesPayload {
            series: samples
                .iter()
                .map(|s| Series {
                    metric: &s.name,
                    points: [(s.timestamp, s.value)],
                    kind: "gauge",
                    host: &s.host,
                    tags: &s.tags,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.url)
            .header("DD-API-KEY", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::MetricsDelivery(e.to_string()))?;

        if !response.status().is_success() {
            // Body may echo the key back; log status only.
            return Err(CoreError::MetricsDelivery(format!(
                "{} returned HTTP {}",
                self.name(),
                response.status()
            )));
        }
        Ok(())
    }
}
