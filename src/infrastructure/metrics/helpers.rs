//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    DISPATCH_LATENCY, MAILS_BUILT_TOTAL, MAILS_FAILED_TOTAL, MAILS_OPENED_TOTAL,
    MAILS_REFUSED_TOTAL, MAILS_SENT_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording build metrics
pub struct BuildMetrics;

impl BuildMetrics {
    /// Record a persisted build, labelled by its error code (or "ready")
    pub fn record_outcome(outcome: &str) {
        MAILS_BUILT_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a build rejected for missing required fields
    pub fn record_rejected() {
        MAILS_BUILT_TOTAL.with_label_values(&["rejected"]).inc();
    }
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a mail accepted by the transport
    pub fn record_sent(mode: &str) {
        MAILS_SENT_TOTAL.with_label_values(&[mode]).inc();
    }

    /// Record a transport failure
    pub fn record_failed() {
        MAILS_FAILED_TOTAL.inc();
    }

    /// Record a send refused before the transport was called
    pub fn record_refused(reason: &str) {
        MAILS_REFUSED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record transport latency
    pub fn record_latency(seconds: f64) {
        DISPATCH_LATENCY.observe(seconds);
    }
}

/// Helper struct for recording tracking metrics
pub struct TrackingMetrics;

impl TrackingMetrics {
    /// Record an open of a known mail
    pub fn record_open() {
        MAILS_OPENED_TOTAL.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_contains_recorded_metrics() {
        BuildMetrics::record_outcome("ready");
        DispatchMetrics::record_sent("html");
        TrackingMetrics::record_open();

        let output = encode_metrics().unwrap();
        assert!(output.contains("mailforge_mails_built_total"));
        assert!(output.contains("mailforge_mails_sent_total"));
        assert!(output.contains("mailforge_mails_opened_total"));
    }
}
