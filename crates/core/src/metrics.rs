//! Metrics definitions for the pagination engine.
//!
//! This module defines all metrics used throughout folio.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "store_queries_total",
        "Total number of queries issued to the document store"
    );
    describe_counter!(
        "pages_served_total",
        "Total number of pages resolved by a paginator"
    );
    describe_counter!(
        "cursor_decode_errors_total",
        "Total number of malformed cursor tokens received"
    );
    describe_counter!(
        "keyset_resets_total",
        "Total number of backward keyset pages reset to the first page"
    );
    describe_histogram!(
        "window_fetch_duration_seconds",
        "Time taken to fetch a paginator window in seconds"
    );
}

/// Record a store query.
///
/// # Arguments
/// * `op` - The store operation ("find", "find_one" or "count")
pub fn record_store_query(op: &'static str) {
    counter!("store_queries_total", "op" => op).increment(1);
}

/// Record a resolved page.
///
/// # Arguments
/// * `mode` - The paginator ("keyset", "offset", "objects" or "offset_objects")
pub fn record_page_served(mode: &'static str) {
    counter!("pages_served_total", "mode" => mode).increment(1);
}

/// Record a cursor that failed to decode.
pub fn record_cursor_decode_error() {
    counter!("cursor_decode_errors_total").increment(1);
}

/// Record a backward keyset page that was reset to the first page.
pub fn record_keyset_reset() {
    counter!("keyset_resets_total").increment(1);
}

/// Record window fetch duration.
pub fn record_window_fetch_duration(duration_secs: f64) {
    histogram!("window_fetch_duration_seconds").record(duration_secs);
}

/// A timer that automatically records the window fetch duration when dropped.
pub struct WindowTimer {
    start: Instant,
}

impl WindowTimer {
    /// Start a new window timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WindowTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WindowTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_window_fetch_duration(duration);
    }
}
