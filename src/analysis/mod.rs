pub mod metrics;
pub mod plan;
pub mod report;

use snafu::Snafu;

// Rule thresholds. Tuning happens here, never inline in the rule bodies.
pub const HIGH_CPU_UTILIZATION_PCT: f64 = 80.0;
pub const MIN_BUFFER_POOL_HIT_RATE_PCT: f64 = 99.0;
pub const HIGH_CONNECTION_UTILIZATION_PCT: f64 = 80.0;
pub const HIGH_ROWS_EXAMINED: i64 = 10_000;
pub const HIGH_READ_LATENCY_MS: f64 = 20.0;

/// Validation failures for malformed input. The whole classification call
/// fails; there is no partial result.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AnalysisError {
    #[snafu(display("Row estimate for table '{}' is negative: {}", table, rows))]
    NegativeRowEstimate { table: String, rows: i64 },

    #[snafu(display("Metric '{}' is outside its valid range: {}", metric, value))]
    MetricOutOfRange { metric: String, value: f64 },
}
