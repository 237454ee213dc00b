use crate::models::{DiagnosticReport, Issue, Recommendation, Severity};
use itertools::Itertools;

/// Merges plan-derived and metric-derived issues into a single report.
///
/// Plan issues are listed first: they point at a concrete query and are the
/// most actionable. The overall severity is the maximum across all issues,
/// `Low` when there are none. Recommendations are deduplicated by text with
/// first-occurrence order preserved so the report is reproducible; issues
/// themselves are never dropped.
pub fn aggregate(plan_issues: Vec<Issue>, metric_issues: Vec<Issue>) -> DiagnosticReport {
    let mut issues = plan_issues;
    issues.extend(metric_issues);

    let overall_severity = issues
        .iter()
        .map(|issue| issue.severity)
        .max()
        .unwrap_or(Severity::Low);

    let recommendations = issues
        .iter()
        .map(|issue| Recommendation {
            text: issue.recommendation.clone(),
            related_category: issue.category,
        })
        .unique_by(|rec| rec.text.clone())
        .collect();

    DiagnosticReport {
        overall_severity,
        issues,
        recommendations,
        raw_plan: Vec::new(),
        raw_snapshot: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metrics;
    use crate::models::{IssueCategory, MetricSnapshot};

    fn issue(category: IssueCategory, severity: Severity, recommendation: &str) -> Issue {
        Issue {
            category,
            severity,
            description: format!("{} issue", category.as_str()),
            subject_table: None,
            recommendation: recommendation.to_string(),
        }
    }

    #[test]
    fn empty_inputs_yield_an_all_clear_report() {
        let report = aggregate(Vec::new(), Vec::new());

        assert_eq!(report.overall_severity, Severity::Low);
        assert!(report.issues.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn overall_severity_is_the_maximum_present() {
        let report = aggregate(
            vec![issue(IssueCategory::SortTemp, Severity::Medium, "a")],
            vec![issue(IssueCategory::Indexes, Severity::Low, "b")],
        );
        assert_eq!(report.overall_severity, Severity::Medium);

        let report = aggregate(
            vec![issue(IssueCategory::SortTemp, Severity::Medium, "a")],
            vec![issue(IssueCategory::Cpu, Severity::High, "b")],
        );
        assert_eq!(report.overall_severity, Severity::High);

        let report = aggregate(
            Vec::new(),
            vec![issue(IssueCategory::Indexes, Severity::Low, "b")],
        );
        assert_eq!(report.overall_severity, Severity::Low);
    }

    #[test]
    fn plan_issues_are_listed_before_metric_issues() {
        let report = aggregate(
            vec![issue(IssueCategory::AccessPattern, Severity::High, "a")],
            vec![issue(IssueCategory::Cpu, Severity::High, "b")],
        );

        assert_eq!(report.issues[0].category, IssueCategory::AccessPattern);
        assert_eq!(report.issues[1].category, IssueCategory::Cpu);
    }

    #[test]
    fn recommendation_dedup_preserves_first_occurrence() {
        let report = aggregate(
            vec![
                issue(IssueCategory::AccessPattern, Severity::High, "fix A"),
                issue(IssueCategory::Indexes, Severity::Low, "fix B"),
                issue(IssueCategory::MissingIndex, Severity::High, "fix A"),
            ],
            Vec::new(),
        );

        let texts: Vec<&str> = report
            .recommendations
            .iter()
            .map(|rec| rec.text.as_str())
            .collect();
        assert_eq!(texts, vec!["fix A", "fix B"]);
        // Duplicate advice never drops the issue itself.
        assert_eq!(report.issues.len(), 3);
    }

    #[test]
    fn diagnose_scenario_end_to_end() {
        let snapshot = MetricSnapshot {
            cpu_utilization_pct: Some(92.0),
            buffer_pool_hit_rate_pct: Some(99.5),
            connection_utilization_pct: Some(40.0),
            tables_without_primary_key: Some(2),
            unused_index_count: Some(0),
            slow_query_log_enabled: Some(true),
            read_latency_ms: Some(3.0),
        };
        let report = aggregate(Vec::new(), metrics::evaluate(&snapshot).unwrap());

        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.issues[0].category, IssueCategory::Cpu);
        assert_eq!(report.issues[0].severity, Severity::High);
        assert_eq!(report.issues[1].category, IssueCategory::Schema);
        assert_eq!(report.issues[1].severity, Severity::Medium);
        assert_eq!(report.overall_severity, Severity::High);

        assert_eq!(report.recommendations.len(), 2);
        assert_eq!(report.recommendations[0].related_category, IssueCategory::Cpu);
        assert_eq!(
            report.recommendations[1].related_category,
            IssueCategory::Schema
        );
    }
}
