//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `asset_ledger_operations_total{operation,outcome}` - Operations by result
//! - `asset_ledger_operation_duration_seconds{operation}` - Operation latency
//! - `asset_ledger_commits_total` - Transactions that wrote state
//! - `asset_ledger_conflicts_total` - Transactions rejected by MVCC validation
//!
//! Collectors are registered on a registry owned by the ledger rather than the
//! process-global one, so several ledgers can coexist in one process.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Operations by name and outcome
    pub operations_total: IntCounterVec,

    /// Operation duration histogram
    pub operation_duration: HistogramVec,

    /// Committed transactions
    pub commits_total: IntCounter,

    /// Transactions that lost a read-write race
    pub conflicts_total: IntCounter,

    /// Prometheus registry
    pub registry: Registry,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new(
                "asset_ledger_operations_total",
                "Asset ledger operations by outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "asset_ledger_operation_duration_seconds",
                "Histogram of operation latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.500]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let commits_total = IntCounter::new(
            "asset_ledger_commits_total",
            "Transactions that committed writes",
        )?;
        registry.register(Box::new(commits_total.clone()))?;

        let conflicts_total = IntCounter::new(
            "asset_ledger_conflicts_total",
            "Transactions rejected by read-set validation",
        )?;
        registry.register(Box::new(conflicts_total.clone()))?;

        Ok(Self {
            operations_total,
            operation_duration,
            commits_total,
            conflicts_total,
            registry,
        })
    }

    /// Record a finished operation
    pub fn record_operation(&self, operation: &str, outcome: &str, duration_seconds: f64) {
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.operation_duration
            .with_label_values(&[operation])
            .observe(duration_seconds);
    }

    /// Record a committed transaction
    pub fn record_commit(&self) {
        self.commits_total.inc();
    }

    /// Record an MVCC conflict
    pub fn record_conflict(&self) {
        self.conflicts_total.inc();
    }

    /// Render the registry in the Prometheus text format
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("commits_total", &self.commits_total.get())
            .field("conflicts_total", &self.conflicts_total.get())
            .finish_non_exhaustive()
    }
}
