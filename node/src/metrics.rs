//! # Prometheus Metrics
//!
//! Operational metrics for the registry node, scraped at `/metrics` on the
//! metrics port.
//!
//! Mutation counters are driven by the ledger event stream: [`NodeMetrics`]
//! is an [`EventSink`] chained after the journal, so a counter only moves
//! for an event that is already durable. Request-level metrics (rejections
//! and latency) are recorded by the API layer.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] under the
//! `attest` namespace.

use attest_contracts::{EventSink, LedgerEvent, SinkError};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    pub issuers_registered_total: IntCounter,
    pub issuers_verified_total: IntCounter,
    pub dids_created_total: IntCounter,
    /// Key rotations and endpoint updates.
    pub dids_updated_total: IntCounter,
    pub credentials_issued_total: IntCounter,
    pub credentials_revoked_total: IntCounter,
    pub proofs_recorded_total: IntCounter,
    /// Requests answered with an error, labelled by error code.
    pub requests_rejected_total: IntCounterVec,
    pub request_latency_seconds: Histogram,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, metric: C) -> prometheus::Result<C> {
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("attest".into()), None)?;

        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounter> {
            register(&registry, IntCounter::new(name, help)?)
        };

        Ok(Self {
            issuers_registered_total: counter(
                "issuers_registered_total",
                "Issuers registered",
            )?,
            issuers_verified_total: counter(
                "issuers_verified_total",
                "Issuers granted trusted status",
            )?,
            dids_created_total: counter("dids_created_total", "DIDs created")?,
            dids_updated_total: counter(
                "dids_updated_total",
                "DID key rotations and endpoint updates",
            )?,
            credentials_issued_total: counter(
                "credentials_issued_total",
                "Credentials issued",
            )?,
            credentials_revoked_total: counter(
                "credentials_revoked_total",
                "Credentials revoked",
            )?,
            proofs_recorded_total: counter(
                "proofs_recorded_total",
                "Proof verifications recorded",
            )?,
            requests_rejected_total: register(
                &registry,
                IntCounterVec::new(
                    Opts::new("requests_rejected_total", "API requests rejected, by error code"),
                    &["code"],
                )?,
            )?,
            request_latency_seconds: register(
                &registry,
                Histogram::with_opts(
                    HistogramOpts::new(
                        "request_latency_seconds",
                        "API request handling latency in seconds",
                    )
                    .buckets(vec![
                        0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
                    ]),
                )?,
            )?,
            registry,
        })
    }

    pub fn reject(&self, code: &str) {
        self.requests_rejected_total.with_label_values(&[code]).inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl EventSink for NodeMetrics {
    fn record(&self, event: &LedgerEvent) -> Result<(), SinkError> {
        let counter = match event {
            LedgerEvent::IssuerRegistered(_) => &self.issuers_registered_total,
            LedgerEvent::IssuerVerified(_) => &self.issuers_verified_total,
            LedgerEvent::DidCreated(_) => &self.dids_created_total,
            LedgerEvent::DidUpdated(_) => &self.dids_updated_total,
            LedgerEvent::CredentialIssued(_) => &self.credentials_issued_total,
            LedgerEvent::ProofRecorded(_) => &self.proofs_recorded_total,
            LedgerEvent::CredentialRevoked(_) => &self.credentials_revoked_total,
        };
        counter.inc();
        Ok(())
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_contracts::Engine;
    use attest_protocol::crypto::Keypair;

    #[test]
    fn counters_follow_ledger_events() {
        let metrics = Arc::new(NodeMetrics::new().unwrap());
        let authority = Keypair::generate();
        let issuer = Keypair::generate();
        let engine = Engine::builder(authority.address())
            .sink(metrics.clone())
            .build();

        engine
            .issuers()
            .register_issuer(&issuer.address(), "Test University", "did:web:t", "")
            .unwrap();
        // Rejected mutations never reach the sink.
        assert!(engine
            .issuers()
            .register_issuer(&issuer.address(), "Test University", "did:web:t", "")
            .is_err());
        engine
            .issuers()
            .verify_issuer(&authority.address(), &issuer.address())
            .unwrap();

        assert_eq!(metrics.issuers_registered_total.get(), 1);
        assert_eq!(metrics.issuers_verified_total.get(), 1);
        assert_eq!(metrics.credentials_issued_total.get(), 0);
    }

    #[test]
    fn encode_uses_the_attest_namespace() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.reject("NOT_FOUND");
        let text = metrics.encode().unwrap();
        assert!(text.contains("attest_requests_rejected_total{code=\"NOT_FOUND\"} 1"));
        assert!(text.contains("attest_proofs_recorded_total 0"));
    }
}
