//! # Prometheus Metrics
//!
//! Operational metrics for the ledger node, scraped from `/metrics` on the
//! metrics port. Everything is registered in a dedicated registry with the
//! `tiermint_` prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use tiermint_contracts::TierMintContract;
use tiermint_protocol::types::{Tier, WEI_PER_ETHER};

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Accepted mint calls, labelled by tier.
    pub mint_calls_total: IntCounterVec,
    /// Rejected calls, labelled by error kind.
    pub rejections_total: IntCounterVec,
    /// Approval changes, labelled by the new flag value.
    pub approvals_total: IntCounterVec,
    /// Addresses holding a non-zero balance of any tier.
    pub holders: IntGauge,
    /// Units in circulation, labelled by tier.
    pub supply: IntGaugeVec,
    /// Native currency retained by the ledger, in whole units.
    pub native_balance: Gauge,
    /// Latency of a mutating call, lock acquisition through persistence.
    pub call_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("tiermint".into()), None)
            .expect("failed to create prometheus registry");

        let mint_calls_total = IntCounterVec::new(
            Opts::new("mint_calls_total", "Accepted mint calls by tier"),
            &["tier"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(mint_calls_total.clone()))
            .expect("metric registration");

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Rejected ledger calls by error kind"),
            &["kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(rejections_total.clone()))
            .expect("metric registration");

        let approvals_total = IntCounterVec::new(
            Opts::new("approvals_total", "Operator approval changes"),
            &["approved"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(approvals_total.clone()))
            .expect("metric registration");

        let holders = IntGauge::new("holders", "Addresses holding a non-zero balance")
            .expect("metric creation");
        registry
            .register(Box::new(holders.clone()))
            .expect("metric registration");

        let supply = IntGaugeVec::new(Opts::new("supply", "Units in circulation"), &["tier"])
            .expect("metric creation");
        registry
            .register(Box::new(supply.clone()))
            .expect("metric registration");

        let native_balance = Gauge::new(
            "native_balance",
            "Native currency retained from tier-F purchases",
        )
        .expect("metric creation");
        registry
            .register(Box::new(native_balance.clone()))
            .expect("metric registration");

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "call_latency_seconds",
                "Mutating call latency in seconds, persistence included",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(call_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            mint_calls_total,
            rejections_total,
            approvals_total,
            holders,
            supply,
            native_balance,
            call_latency_seconds,
        }
    }

    /// Refreshes the gauges from the current contract state.
    pub fn observe_ledger(&self, contract: &TierMintContract) {
        let ledger = contract.ledger();
        self.holders.set(ledger.holders().len() as i64);
        for tier in Tier::ALL {
            let label = tier.to_string();
            self.supply
                .with_label_values(&[label.as_str()])
                .set(ledger.total_supply(tier).min(i64::MAX as u128) as i64);
        }
        self.native_balance
            .set(contract.native_balance() as f64 / WEI_PER_ETHER as f64);
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

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
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
