use crate::analysis::{
    AnalysisError, MetricOutOfRangeSnafu, HIGH_CONNECTION_UTILIZATION_PCT,
    HIGH_CPU_UTILIZATION_PCT, HIGH_READ_LATENCY_MS, MIN_BUFFER_POOL_HIT_RATE_PCT,
};
use crate::models::{Issue, IssueCategory, MetricSnapshot, Severity};
use snafu::ensure;

type Result<T> = std::result::Result<T, AnalysisError>;

/// Evaluates a runtime snapshot against the fixed thresholds.
///
/// Rules are checked in a fixed order and a rule whose field is absent is
/// skipped entirely; absence is never read as zero.
pub fn evaluate(snapshot: &MetricSnapshot) -> Result<Vec<Issue>> {
    validate(snapshot)?;

    let mut issues = Vec::new();

    if let Some(cpu) = snapshot.cpu_utilization_pct {
        if cpu > HIGH_CPU_UTILIZATION_PCT {
            push_issue(
                &mut issues,
                IssueCategory::Cpu,
                Severity::High,
                format!("High CPU utilization (avg: {cpu:.1}%)"),
                "Review the top CPU-consuming queries and optimize them, or scale to a larger \
                 instance class",
            );
        }
    }

    if let Some(hit_rate) = snapshot.buffer_pool_hit_rate_pct {
        if hit_rate < MIN_BUFFER_POOL_HIT_RATE_PCT {
            push_issue(
                &mut issues,
                IssueCategory::Memory,
                Severity::Medium,
                format!("Low buffer pool hit rate ({hit_rate:.2}%)"),
                "Consider increasing innodb_buffer_pool_size or scaling to an instance with \
                 more memory",
            );
        }
    }

    if let Some(utilization) = snapshot.connection_utilization_pct {
        if utilization > HIGH_CONNECTION_UTILIZATION_PCT {
            push_issue(
                &mut issues,
                IssueCategory::Connections,
                Severity::High,
                format!("High connection utilization ({utilization:.1}%)"),
                "Implement connection pooling (proxy or application-level) and review for \
                 leaked connections",
            );
        }
    }

    if let Some(count) = snapshot.tables_without_primary_key {
        if count > 0 {
            push_issue(
                &mut issues,
                IssueCategory::Schema,
                Severity::Medium,
                format!("{count} table(s) without a primary key"),
                "Add primary keys to all tables; they are critical for replication and query \
                 performance",
            );
        }
    }

    if let Some(count) = snapshot.unused_index_count {
        if count > 0 {
            push_issue(
                &mut issues,
                IssueCategory::Indexes,
                Severity::Low,
                format!("{count} potentially unused index(es)"),
                "Review and consider dropping unused indexes to reduce storage and write \
                 overhead",
            );
        }
    }

    if snapshot.slow_query_log_enabled == Some(false) {
        push_issue(
            &mut issues,
            IssueCategory::Monitoring,
            Severity::Medium,
            "Slow query log is disabled".to_string(),
            "Enable the slow query log (slow_query_log=1) to identify problematic queries",
        );
    }

    if let Some(latency) = snapshot.read_latency_ms {
        if latency > HIGH_READ_LATENCY_MS {
            push_issue(
                &mut issues,
                IssueCategory::Storage,
                Severity::High,
                format!("High read latency (avg: {latency:.1}ms)"),
                "Storage I/O bottleneck detected; provision faster storage or more IOPS",
            );
        }
    }

    Ok(issues)
}

fn validate(snapshot: &MetricSnapshot) -> Result<()> {
    let percentages = [
        ("cpu_utilization_pct", snapshot.cpu_utilization_pct),
        ("buffer_pool_hit_rate_pct", snapshot.buffer_pool_hit_rate_pct),
        (
            "connection_utilization_pct",
            snapshot.connection_utilization_pct,
        ),
    ];
    for (metric, value) in percentages {
        if let Some(value) = value {
            ensure!(
                (0.0..=100.0).contains(&value),
                MetricOutOfRangeSnafu { metric, value }
            );
        }
    }

    if let Some(latency) = snapshot.read_latency_ms {
        ensure!(
            latency >= 0.0,
            MetricOutOfRangeSnafu {
                metric: "read_latency_ms",
                value: latency,
            }
        );
    }

    Ok(())
}

fn push_issue(
    issues: &mut Vec<Issue>,
    category: IssueCategory,
    severity: Severity,
    description: String,
    recommendation: &str,
) {
    issues.push(Issue {
        category,
        severity,
        description,
        subject_table: None,
        recommendation: recommendation.to_string(),
    });
}
