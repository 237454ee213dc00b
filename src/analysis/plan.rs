use crate::analysis::{AnalysisError, NegativeRowEstimateSnafu, HIGH_ROWS_EXAMINED};
use crate::models::{Issue, IssueCategory, PlanRow, Severity};
use snafu::ensure;

type Result<T> = std::result::Result<T, AnalysisError>;

const USING_FILESORT: &str = "Using filesort";
const USING_TEMPORARY: &str = "Using temporary";

/// Access strategy reported by EXPLAIN for one table, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessType {
    System,
    Const,
    EqRef,
    Ref,
    Range,
    Index,
    All,
}

impl AccessType {
    /// Unknown or absent access types are treated as full scans so a
    /// degraded plan surfaces as a problem instead of passing silently.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return AccessType::All;
        };

        if raw.eq_ignore_ascii_case("system") {
            AccessType::System
        } else if raw.eq_ignore_ascii_case("const") {
            AccessType::Const
        } else if raw.eq_ignore_ascii_case("eq_ref") {
            AccessType::EqRef
        } else if raw.eq_ignore_ascii_case("ref") {
            AccessType::Ref
        } else if raw.eq_ignore_ascii_case("range") {
            AccessType::Range
        } else if raw.eq_ignore_ascii_case("index") {
            AccessType::Index
        } else {
            AccessType::All
        }
    }
}

/// Classifies an execution plan into access-pattern issues.
///
/// Every rule is evaluated independently per row; a single row may emit
/// several issues. The rule order (full scan, filesort, temporary, row
/// volume, missing index) fixes the issue order for deterministic output.
pub fn classify(plan: &[PlanRow]) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();
    for row in plan {
        classify_row(row, &mut issues)?;
    }
    Ok(issues)
}

fn classify_row(row: &PlanRow, issues: &mut Vec<Issue>) -> Result<()> {
    let table = row.table.as_deref().unwrap_or("unknown");
    let rows_examined = row.rows_examined.unwrap_or(0);
    ensure!(
        rows_examined >= 0,
        NegativeRowEstimateSnafu {
            table,
            rows: rows_examined,
        }
    );

    let access_type = AccessType::from_raw(row.access_type.as_deref());
    let extra = row.extra.as_deref().unwrap_or("");

    if access_type == AccessType::All {
        push_issue(
            issues,
            IssueCategory::AccessPattern,
            Severity::High,
            format!("Full table scan on table '{table}' (examining {rows_examined} rows)"),
            table,
            format!("Add an index to table '{table}' on the columns used in WHERE/JOIN clauses"),
        );
    }

    if extra.contains(USING_FILESORT) {
        push_issue(
            issues,
            IssueCategory::SortTemp,
            Severity::Medium,
            format!("Filesort operation on table '{table}'"),
            table,
            format!("Add an index matching the ORDER BY columns for table '{table}'"),
        );
    }

    if extra.contains(USING_TEMPORARY) {
        push_issue(
            issues,
            IssueCategory::SortTemp,
            Severity::Medium,
            format!("Temporary table created for table '{table}'"),
            table,
            format!("Add an index matching the GROUP BY columns for table '{table}'"),
        );
    }

    if rows_examined > HIGH_ROWS_EXAMINED {
        push_issue(
            issues,
            IssueCategory::RowVolume,
            Severity::Medium,
            format!("High row examination on table '{table}' ({rows_examined} rows)"),
            table,
            format!("Review WHERE clause selectivity for table '{table}'"),
        );
    }

    if row.key.is_none() && !matches!(access_type, AccessType::System | AccessType::Const) {
        push_issue(
            issues,
            IssueCategory::MissingIndex,
            Severity::Medium,
            format!("No index used on table '{table}'"),
            table,
            format!("Create an appropriate index for table '{table}'"),
        );
    }

    Ok(())
}

fn push_issue(
    issues: &mut Vec<Issue>,
    category: IssueCategory,
    severity: Severity,
    description: String,
    subject_table: &str,
    recommendation: String,
) {
    issues.push(Issue {
        category,
        severity,
        description,
        subject_table: Some(subject_table.to_string()),
        recommendation,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row(access_type: &str, key: Option<&str>, rows: i64, extra: &str) -> PlanRow {
        PlanRow {
            table: Some("users".to_string()),
            select_type: Some("SIMPLE".to_string()),
            access_type: Some(access_type.to_string()),
            key: key.map(str::to_string),
            rows_examined: Some(rows),
            extra: if extra.is_empty() {
                None
            } else {
                Some(extra.to_string())
            },
        }
    }

    #[test]
    fn empty_plan_yields_no_issues() {
        assert!(classify(&[]).unwrap().is_empty());
    }

    #[test]
    fn indexed_const_lookups_pass_clean() {
        let plan = vec![
            row("const", Some("PRIMARY"), 1, ""),
            row("const", Some("PRIMARY"), 1, "Using index"),
        ];
        assert!(classify(&plan).unwrap().is_empty());
    }

    #[test]
    fn full_scan_row_emits_rules_in_fixed_order() {
        let plan = vec![row("ALL", None, 50_000, "")];
        let issues = classify(&plan).unwrap();

        let expected = [
            (IssueCategory::AccessPattern, Severity::High),
            (IssueCategory::RowVolume, Severity::Medium),
            (IssueCategory::MissingIndex, Severity::Medium),
        ];
        assert_eq!(issues.len(), expected.len());
        for (issue, (category, severity)) in issues.iter().zip(expected) {
            assert_eq!(issue.category, category);
            assert_eq!(issue.severity, severity);
            assert_eq!(issue.subject_table.as_deref(), Some("users"));
        }
        assert!(issues[0].description.contains("50000"));
    }

    #[test]
    fn filesort_precedes_temporary() {
        let plan = vec![row(
            "ref",
            Some("idx_users_email"),
            10,
            "Using temporary; Using filesort",
        )];
        let issues = classify(&plan).unwrap();

        assert_eq!(issues.len(), 2);
        assert!(issues[0].description.contains("Filesort"));
        assert!(issues[1].description.contains("Temporary"));
        assert_eq!(issues[0].category, IssueCategory::SortTemp);
        assert_eq!(issues[1].category, IssueCategory::SortTemp);
    }

    #[test]
    fn missing_access_type_is_treated_as_full_scan() {
        let plan = vec![PlanRow {
            table: Some("orders".to_string()),
            key: Some("PRIMARY".to_string()),
            rows_examined: Some(5),
            ..Default::default()
        }];
        let issues = classify(&plan).unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, IssueCategory::AccessPattern);
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn unknown_table_is_labelled() {
        let plan = vec![PlanRow {
            access_type: Some("ALL".to_string()),
            ..Default::default()
        }];
        let issues = classify(&plan).unwrap();
        assert!(issues[0].description.contains("'unknown'"));
    }

    #[test]
    fn negative_row_estimate_is_rejected() {
        let plan = vec![row("ref", Some("PRIMARY"), -1, "")];
        let err = classify(&plan).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn classification_is_deterministic() {
        let plan = vec![
            row("ALL", None, 50_000, "Using filesort"),
            row("range", None, 200, "Using where"),
        ];
        let first: Vec<String> = classify(&plan)
            .unwrap()
            .iter()
            .map(|i| i.description.clone())
            .collect();
        let second: Vec<String> = classify(&plan)
            .unwrap()
            .iter()
            .map(|i| i.description.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[rstest]
    #[case("system", AccessType::System)]
    #[case("const", AccessType::Const)]
    #[case("eq_ref", AccessType::EqRef)]
    #[case("ref", AccessType::Ref)]
    #[case("range", AccessType::Range)]
    #[case("index", AccessType::Index)]
    #[case("ALL", AccessType::All)]
    #[case("fulltext", AccessType::All)]
    #[case("", AccessType::All)]
    fn access_type_parsing(#[case] raw: &str, #[case] expected: AccessType) {
        assert_eq!(AccessType::from_raw(Some(raw)), expected);
    }

    #[test]
    fn absent_access_type_parses_as_worst_case() {
        assert_eq!(AccessType::from_raw(None), AccessType::All);
    }
}
