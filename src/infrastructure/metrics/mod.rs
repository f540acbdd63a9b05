//! Prometheus metrics for mail composition and delivery.
//!
//! - Build metrics (built mails by outcome)
//! - Dispatch metrics (sent, failed, refused, latency)
//! - Tracking metrics (opens)
//! - Store metrics (gauges refreshed on scrape)

mod helpers;

pub use helpers::{encode_metrics, BuildMetrics, DispatchMetrics, TrackingMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "mailforge";

lazy_static! {
    // ============================================================================
    // Build Metrics
    // ============================================================================

    /// Mails built, by outcome (ready, population-error, unresolved-key-error, both, rejected)
    pub static ref MAILS_BUILT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_mails_built_total", METRIC_PREFIX),
        "Total mail build attempts by outcome",
        &["outcome"]
    ).unwrap();

    // ============================================================================
    // Dispatch Metrics
    // ============================================================================

    /// Mails handed to the transport successfully, by content mode
    pub static ref MAILS_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_mails_sent_total", METRIC_PREFIX),
        "Total mails sent",
        &["mode"]
    ).unwrap();

    /// Transport failures
    pub static ref MAILS_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_mails_failed_total", METRIC_PREFIX),
        "Total mails the transport failed to deliver"
    ).unwrap();

    /// Send attempts refused before reaching the transport, by reason
    pub static ref MAILS_REFUSED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_mails_refused_total", METRIC_PREFIX),
        "Total send attempts refused",
        &["reason"]
    ).unwrap();

    /// Transport call latency in seconds
    pub static ref DISPATCH_LATENCY: Histogram = register_histogram!(
        format!("{}_dispatch_latency_seconds", METRIC_PREFIX),
        "Latency of transport send calls",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    // ============================================================================
    // Tracking Metrics
    // ============================================================================

    /// Tracking pixel hits on known mails
    pub static ref MAILS_OPENED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_mails_opened_total", METRIC_PREFIX),
        "Total tracked mail opens"
    ).unwrap();

    // ============================================================================
    // Store Metrics
    // ============================================================================

    /// Mails currently stored
    pub static ref MAILS_STORED: IntGauge = register_int_gauge!(
        format!("{}_mails_stored", METRIC_PREFIX),
        "Number of stored mails"
    ).unwrap();

    /// Mails waiting for delivery
    pub static ref MAILS_DUE: IntGauge = register_int_gauge!(
        format!("{}_mails_due", METRIC_PREFIX),
        "Number of unsent mails whose delivery time has come"
    ).unwrap();

    /// Registered replacement entities
    pub static ref ENTITIES_REGISTERED: IntGauge = register_int_gauge!(
        format!("{}_entities_registered", METRIC_PREFIX),
        "Number of registered replacement entities"
    ).unwrap();

    /// Stored templates
    pub static ref TEMPLATES_STORED: IntGauge = register_int_gauge!(
        format!("{}_templates_stored", METRIC_PREFIX),
        "Number of stored mail templates"
    ).unwrap();
}
