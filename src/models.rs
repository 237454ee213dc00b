use serde::{Deserialize, Serialize};

/// One row of a MySQL EXPLAIN execution plan, as supplied by the plan
/// collector. Columns that EXPLAIN reports as NULL stay `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRow {
    pub table: Option<String>,
    pub select_type: Option<String>,
    /// Join access strategy (`system`, `const`, `eq_ref`, `ref`, `range`,
    /// `index`, `ALL`). Kept as the raw string; unknown or absent values are
    /// treated as full scans during classification.
    pub access_type: Option<String>,
    /// Index chosen by the optimizer; absent means no index was consulted.
    pub key: Option<String>,
    pub rows_examined: Option<i64>,
    /// Free-text annotations such as `Using filesort` or `Using temporary`.
    pub extra: Option<String>,
}

/// Point-in-time runtime counters and schema inventory facts.
///
/// Every field is optional: an absent metric means the collector had no
/// source for it, which is distinct from a measured zero. Rules referencing
/// an absent field are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSnapshot {
    pub cpu_utilization_pct: Option<f64>,
    pub buffer_pool_hit_rate_pct: Option<f64>,
    pub connection_utilization_pct: Option<f64>,
    pub read_latency_ms: Option<f64>,
    pub tables_without_primary_key: Option<u64>,
    pub unused_index_count: Option<u64>,
    pub slow_query_log_enabled: Option<bool>,
}

impl MetricSnapshot {
    /// Overlays metrics collected from another source (e.g. a CloudWatch
    /// export). Fields present in `other` win; absent fields keep the
    /// current value.
    pub fn merge(&mut self, other: MetricSnapshot) {
        self.cpu_utilization_pct = other.cpu_utilization_pct.or(self.cpu_utilization_pct);
        self.buffer_pool_hit_rate_pct = other
            .buffer_pool_hit_rate_pct
            .or(self.buffer_pool_hit_rate_pct);
        self.connection_utilization_pct = other
            .connection_utilization_pct
            .or(self.connection_utilization_pct);
        self.read_latency_ms = other.read_latency_ms.or(self.read_latency_ms);
        self.tables_without_primary_key = other
            .tables_without_primary_key
            .or(self.tables_without_primary_key);
        self.unused_index_count = other.unused_index_count.or(self.unused_index_count);
        self.slow_query_log_enabled = other.slow_query_log_enabled.or(self.slow_query_log_enabled);
    }
}

/// Operational impact of an issue, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

/// Closed set of issue categories. Plan-derived categories come first,
/// metric-derived categories after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    AccessPattern,
    SortTemp,
    RowVolume,
    MissingIndex,
    Cpu,
    Memory,
    Connections,
    Schema,
    Indexes,
    Monitoring,
    Storage,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::AccessPattern => "access-pattern",
            IssueCategory::SortTemp => "sort-temp",
            IssueCategory::RowVolume => "row-volume",
            IssueCategory::MissingIndex => "missing-index",
            IssueCategory::Cpu => "cpu",
            IssueCategory::Memory => "memory",
            IssueCategory::Connections => "connections",
            IssueCategory::Schema => "schema",
            IssueCategory::Indexes => "indexes",
            IssueCategory::Monitoring => "monitoring",
            IssueCategory::Storage => "storage",
        }
    }
}

/// A single detected problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub category: IssueCategory,
    pub severity: Severity,
    /// Human-readable description embedding the measured value that
    /// triggered the rule (table name, percentage, row count).
    pub description: String,
    /// Present for plan-derived issues.
    pub subject_table: Option<String>,
    /// Remediation advice for this specific issue, attached when the rule
    /// fires. The aggregator deduplicates these into the report's
    /// recommendation list.
    pub recommendation: String,
}

/// A remediation entry in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub text: String,
    pub related_category: IssueCategory,
}

/// The assembled diagnosis, consumed by the presentation layer.
///
/// Invariant: `overall_severity` equals the maximum severity among
/// `issues`, and is `Low` exactly when `issues` is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub overall_severity: Severity,
    /// Plan-derived issues first, then metric-derived, each group in source
    /// order.
    pub issues: Vec<Issue>,
    /// Deduplicated remediation advice, first-seen order.
    pub recommendations: Vec<Recommendation>,
    /// Pass-through of the analyzed plan, for audit and printing.
    pub raw_plan: Vec<PlanRow>,
    /// Pass-through of the analyzed snapshot.
    pub raw_snapshot: Option<MetricSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_low_to_high() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert_eq!(
            [Severity::Medium, Severity::High, Severity::Low]
                .into_iter()
                .max(),
            Some(Severity::High)
        );
    }

    #[test]
    fn categories_serialize_as_kebab_case() {
        assert_eq!(
            serde_json::to_value(IssueCategory::AccessPattern).unwrap(),
            serde_json::json!("access-pattern")
        );
        assert_eq!(
            serde_json::to_value(IssueCategory::MissingIndex).unwrap(),
            serde_json::json!("missing-index")
        );
    }

    #[test]
    fn report_is_serializable() {
        let report = DiagnosticReport {
            overall_severity: Severity::High,
            issues: vec![Issue {
                category: IssueCategory::Cpu,
                severity: Severity::High,
                description: "High CPU utilization (avg: 92.0%)".into(),
                subject_table: None,
                recommendation: "scale up".into(),
            }],
            recommendations: vec![Recommendation {
                text: "scale up".into(),
                related_category: IssueCategory::Cpu,
            }],
            raw_plan: Vec::new(),
            raw_snapshot: Some(MetricSnapshot::default()),
        };

        serde_json::to_string(&report).expect("DiagnosticReport should serialize");
    }

    #[test]
    fn empty_report_serializes_all_fields() {
        let json = serde_json::to_value(DiagnosticReport::default()).unwrap();
        assert_eq!(json["overall_severity"], "low");
        assert_eq!(json["issues"], serde_json::json!([]));
        assert_eq!(json["recommendations"], serde_json::json!([]));
    }

    #[test]
    fn merge_prefers_overlay_fields() {
        let mut base = MetricSnapshot {
            cpu_utilization_pct: None,
            connection_utilization_pct: Some(40.0),
            ..Default::default()
        };
        base.merge(MetricSnapshot {
            cpu_utilization_pct: Some(92.0),
            ..Default::default()
        });

        assert_eq!(base.cpu_utilization_pct, Some(92.0));
        assert_eq!(base.connection_utilization_pct, Some(40.0));
    }

    #[test]
    fn snapshot_deserializes_with_missing_fields() {
        let snapshot: MetricSnapshot =
            serde_json::from_str(r#"{"cpu_utilization_pct": 85.5}"#).unwrap();
        assert_eq!(snapshot.cpu_utilization_pct, Some(85.5));
        assert_eq!(snapshot.read_latency_ms, None);
        assert_eq!(snapshot.slow_query_log_enabled, None);
    }
}
