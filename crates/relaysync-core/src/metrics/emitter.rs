use chrono::{DateTime, Utc};
use relaysync_types::{MetricSample, MetricsConfig, SyncState};
use std::sync::Arc;

use super::prometheus::record_gauges;
use super::sink::MetricsSink;
use crate::status::StatusHandle;

/// Reads the latest [`SyncState`] snapshot and emits it as gauges.
pub struct MetricsEmitter {
    config: MetricsConfig,
    status: StatusHandle,
    sink: Option<Arc<dyn MetricsSink>>,
}

impl MetricsEmitter {
    pub fn new(
        config: MetricsConfig,
        status: StatusHandle,
        sink: Option<Arc<dyn MetricsSink>>,
    ) -> Self {
        Self { config, status, sink }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    fn name(&self, metric: &str) -> String {
        format!("{}.{}", self.config.prefix, metric)
    }

    /// Samples describing `state` at `now`.
    pub fn samples(&self, state: &SyncState, now: DateTime<Utc>) -> Vec<MetricSample> {
        let host = self.config.host.as_str();
        let ts = now.timestamp();
        let tag = format!("host:{host}");

        let mut samples = vec![
            MetricSample::gauge(
                self.name("upstream_range_count"),
                state.range_count as f64,
                host,
                ts,
            ),
            MetricSample::gauge(self.name("reload_success"), reload_gauge(state), host, ts),
            MetricSample::gauge(
                self.name("consecutive_failures"),
                f64::from(state.consecutive_failures),
                host,
                ts,
            ),
        ];
        if let Some(age) = sync_age_secs(state, now) {
            samples.push(MetricSample::gauge(self.name("sync_age_seconds"), age, host, ts));
        }

        samples.into_iter().map(|s| s.with_tag(tag.clone())).collect()
    }

    /// Emit one round. Delivery failures are logged and swallowed.
    pub async fn tick(&self) -> usize {
        let state = self.status.snapshot();
        let now = Utc::now();

        record_gauges(
            state.range_count as f64,
            reload_gauge(&state),
            f64::from(state.consecutive_failures),
            sync_age_secs(&state, now),
        );

        let samples = self.samples(&state, now);
        let Some(sink) = &self.sink else {
            tracing::debug!("[Metrics] No push backend configured, samples: {:?}", samples);
            return 0;
        };

        match sink.submit(&samples).await {
            Ok(()) => {
                tracing::debug!("[Metrics] Pushed {} samples to {}", samples.len(), sink.name());
                samples.len()
            },
            Err(e) => {
                tracing::warn!("[Metrics] Delivery to {} failed: {}", sink.name(), e);
                0
            },
        }
    }
}

/// 1 until a change has been applied and its reload failed.
fn reload_gauge(state: &SyncState) -> f64 {
    if state.reload_success.unwrap_or(true) {
        1.0
    } else {
        0.0
    }
}

fn sync_age_secs(state: &SyncState, now: DateTime<Utc>) -> Option<f64> {
    state.last_sync.map(|at| (now - at).num_milliseconds().max(0) as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DatadogSink;
    use crate::status::status_channel;
    use ipnet::IpNet;
    use relaysync_types::IpRangeSet;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> MetricsConfig {
        MetricsConfig { host: "mx-1".into(), ..MetricsConfig::default() }
    }

    fn value(samples: &[MetricSample], name: &str) -> Option<f64> {
        samples.iter().find(|s| s.name == name).map(|s| s.value)
    }

    #[test]
    fn test_samples_before_first_sync() {
        let (_publisher, handle) = status_channel();
        let emitter = MetricsEmitter::new(config(), handle, None);
        let samples = emitter.samples(&SyncState::initial(), Utc::now());

        assert_eq!(value(&samples, "relaysync.upstream_range_count"), Some(0.0));
        assert_eq!(value(&samples, "relaysync.reload_success"), Some(1.0));
        assert_eq!(value(&samples, "relaysync.consecutive_failures"), Some(0.0));
        assert_eq!(value(&samples, "relaysync.sync_age_seconds"), None);
        assert!(samples.iter().all(|s| s.host == "mx-1" && s.tags == ["host:mx-1"]));
    }

    #[test]
    fn test_samples_after_failed_reload() {
        let (_publisher, handle) = status_channel();
        let emitter = MetricsEmitter::new(config(), handle, None);
        let now = Utc::now();
        let set: IpRangeSet = ["10.0.0.0/8".parse::<IpNet>().unwrap()].into_iter().collect();
        let state = SyncState::initial().with_applied(set, Err("exit 1".into()), now);

        let samples = emitter.samples(&state, now + chrono::Duration::seconds(30));
        assert_eq!(value(&samples, "relaysync.upstream_range_count"), Some(1.0));
        assert_eq!(value(&samples, "relaysync.reload_success"), Some(0.0));
        assert_eq!(value(&samples, "relaysync.sync_age_seconds"), Some(30.0));
    }

    #[tokio::test]
    async fn test_tick_pushes_to_sink() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/series"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let (_publisher, handle) = status_channel();
        let sink = DatadogSink::new(format!("{}/api/v1/series", server.uri()), "k").unwrap();
        let emitter = MetricsEmitter::new(config(), handle, Some(Arc::new(sink)));

        assert_eq!(emitter.tick().await, 3);
    }

    #[tokio::test]
    async fn test_tick_swallows_delivery_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (_publisher, handle) = status_channel();
        let sink = DatadogSink::new(server.uri(), "k").unwrap();
        let emitter = MetricsEmitter::new(config(), handle, Some(Arc::new(sink)));

        assert_eq!(emitter.tick().await, 0);
    }
}
