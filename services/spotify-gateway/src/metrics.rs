//! Prometheus metrics exposition
//!
//! - `gateway_requests_total` (counter): labels `route`, `status`
//! - `gateway_upstream_duration_seconds` (histogram): label `operation`
//! - `gateway_upstream_errors_total` (counter): label `operation`

use std::future::Future;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const UPSTREAM_DURATION: &str = "gateway_upstream_duration_seconds";

const UPSTREAM_BUCKETS: &[f64] = &[0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(UPSTREAM_DURATION.to_string()), UPSTREAM_BUCKETS)
}

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record a completed inbound request.
pub fn record_request(route: &str, status: u16) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Time an outbound Spotify call, counting it as an error when it fails.
pub async fn observe_upstream<T, E>(
    operation: &'static str,
    call: impl Future<Output = Result<T, E>>,
) -> Result<T, E> {
    let started = Instant::now();
    let result = call.await;
    metrics::histogram!(UPSTREAM_DURATION, "operation" => operation)
        .record(started.elapsed().as_secs_f64());
    if result.is_err() {
        metrics::counter!("gateway_upstream_errors_total", "operation" => operation).increment(1);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    /// Isolated recorder so tests never touch the global one.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_request_carries_route_and_status() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request("/spotify", 401);

        let output = handle.render();
        assert!(output.contains("gateway_requests_total"));
        assert!(output.contains("route=\"/spotify\""));
        assert!(output.contains("status=\"401\""));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn observe_upstream_records_duration_and_errors() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let ok: Result<u8, &str> = observe_upstream("top_tracks", async { Ok(1) }).await;
        assert_eq!(ok, Ok(1));
        let err: Result<u8, &str> = observe_upstream("start_playback", async { Err("404") }).await;
        assert!(err.is_err());

        let output = handle.render();
        assert!(
            output.contains("gateway_upstream_duration_seconds_bucket"),
            "histogram must render bucket lines:\n{output}"
        );
        assert!(output.contains("operation=\"top_tracks\""));
        assert!(output.contains("gateway_upstream_errors_total{operation=\"start_playback\"} 1"));
        assert!(
            !output.contains("gateway_upstream_errors_total{operation=\"top_tracks\"}"),
            "successful calls must not count as errors"
        );
    }
}
