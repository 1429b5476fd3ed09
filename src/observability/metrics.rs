//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pagespeed_requests_total` (counter): proxied requests by interception outcome
//! - `pagespeed_rewrite_duration_seconds` (histogram): time spent rewriting one page
//! - `pagespeed_images_rewritten_total` (counter): rewritten elements by kind
//!   (`wrapped` for responsive containers, `converted` for in-place conversion)
//! - `pagespeed_origin_failures_total` (counter): origin calls that failed in
//!   transport, missed their deadline, or whose captured body could not be read

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a proxied request and how the interceptor handled it.
pub fn record_request(outcome: &'static str) {
    counter!("pagespeed_requests_total", "outcome" => outcome).increment(1);
}

/// Record the duration of one rewrite started at `start`.
pub fn record_rewrite_duration(start: Instant) {
    histogram!("pagespeed_rewrite_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record element counts from one rewrite.
pub fn record_images(wrapped: usize, converted: usize) {
    if wrapped > 0 {
        counter!("pagespeed_images_rewritten_total", "kind" => "wrapped").increment(wrapped as u64);
    }
    if converted > 0 {
        counter!("pagespeed_images_rewritten_total", "kind" => "converted")
            .increment(converted as u64);
    }
}

pub fn record_origin_failure() {
    counter!("pagespeed_origin_failures_total").increment(1);
}
