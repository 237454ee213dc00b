use crate::models::{DiagnosticReport, MetricSnapshot, PlanRow, Severity};
use clap::ValueEnum;
use snafu::{ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum ReporterError {
    #[snafu(display("Failed to write output: {}", source))]
    OutputError { source: std::io::Error },
}

type Result<T, E = ReporterError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    /// Markdown formatted report
    Markdown,
    /// JSON formatted report
    Json,
    /// Plain text summary
    Text,
}

pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    pub fn report(&self, report: &DiagnosticReport) -> Result<()> {
        match self.format {
            ReportFormat::Markdown => self.report_markdown(report)?,
            ReportFormat::Json => self.report_json(report)?,
            ReportFormat::Text => self.report_text(report)?,
        }
        Ok(())
    }

    fn report_markdown(&self, report: &DiagnosticReport) -> Result<()> {
        use std::io::Write;

        let stdout = std::io::stdout();
        let mut handle = stdout.lock();

        writeln!(handle, "# MySQL Performance Diagnostic Report\n").context(OutputSnafu)?;
        writeln!(
            handle,
            "**Overall Severity**: {}\n",
            self.format_severity_badge(&report.overall_severity)
        )
        .context(OutputSnafu)?;

        if report.issues.is_empty() {
            writeln!(handle, "No issues found.\n").context(OutputSnafu)?;
        } else {
            writeln!(handle, "## Issues\n").context(OutputSnafu)?;
            writeln!(handle, "Found **{}** issue(s):\n", report.issues.len())
                .context(OutputSnafu)?;
            for issue in &report.issues {
                writeln!(
                    handle,
                    "- {} `{}` {}",
                    self.format_severity_badge(&issue.severity),
                    issue.category.as_str(),
                    issue.description
                )
                .context(OutputSnafu)?;
            }
            writeln!(handle).context(OutputSnafu)?;

            writeln!(handle, "## Recommendations\n").context(OutputSnafu)?;
            for (i, rec) in report.recommendations.iter().enumerate() {
                writeln!(handle, "{}. {} (`{}`)", i + 1, rec.text, rec.related_category.as_str())
                    .context(OutputSnafu)?;
            }
            writeln!(handle).context(OutputSnafu)?;
        }

        if let Some(snapshot) = &report.raw_snapshot {
            self.write_snapshot_markdown(&mut handle, snapshot)?;
        }

        if !report.raw_plan.is_empty() {
            self.write_plan_markdown(&mut handle, &report.raw_plan)?;
        }

        Ok(())
    }

    fn write_snapshot_markdown(
        &self,
        handle: &mut std::io::StdoutLock,
        snapshot: &MetricSnapshot,
    ) -> Result<()> {
        use std::io::Write;

        writeln!(handle, "## Collected Metrics\n").context(OutputSnafu)?;
        writeln!(handle, "| Metric | Value |").context(OutputSnafu)?;
        writeln!(handle, "|--------|-------|").context(OutputSnafu)?;

        let rows = [
            ("CPU utilization", fmt_pct(snapshot.cpu_utilization_pct)),
            (
                "Buffer pool hit rate",
                fmt_pct(snapshot.buffer_pool_hit_rate_pct),
            ),
            (
                "Connection utilization",
                fmt_pct(snapshot.connection_utilization_pct),
            ),
            (
                "Read latency",
                snapshot
                    .read_latency_ms
                    .map(|v| format!("{v:.1} ms"))
                    .unwrap_or_else(|| "Unknown".to_string()),
            ),
            (
                "Tables without primary key",
                fmt_count(snapshot.tables_without_primary_key),
            ),
            ("Unused indexes", fmt_count(snapshot.unused_index_count)),
            (
                "Slow query log",
                match snapshot.slow_query_log_enabled {
                    Some(true) => "Enabled".to_string(),
                    Some(false) => "Disabled".to_string(),
                    None => "Unknown".to_string(),
                },
            ),
        ];
        for (metric, value) in rows {
            writeln!(handle, "| {metric} | {value} |").context(OutputSnafu)?;
        }
        writeln!(handle).context(OutputSnafu)?;

        Ok(())
    }

    fn write_plan_markdown(
        &self,
        handle: &mut std::io::StdoutLock,
        plan: &[PlanRow],
    ) -> Result<()> {
        use std::io::Write;

        writeln!(handle, "---\n").context(OutputSnafu)?;
        writeln!(handle, "## Execution Plan\n").context(OutputSnafu)?;
        writeln!(
            handle,
            "<details>\n<summary>Click to view the raw EXPLAIN output</summary>\n"
        )
        .context(OutputSnafu)?;
        writeln!(handle).context(OutputSnafu)?;

        writeln!(
            handle,
            "| Table | Select Type | Access Type | Key | Rows | Extra |"
        )
        .context(OutputSnafu)?;
        writeln!(
            handle,
            "|-------|-------------|-------------|-----|------|-------|"
        )
        .context(OutputSnafu)?;

        for row in plan {
            writeln!(
                handle,
                "| {} | {} | {} | {} | {} | {} |",
                row.table.as_deref().unwrap_or("NULL"),
                row.select_type.as_deref().unwrap_or("NULL"),
                row.access_type.as_deref().unwrap_or("NULL"),
                row.key.as_deref().unwrap_or("NULL"),
                row.rows_examined
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "NULL".to_string()),
                row.extra.as_deref().unwrap_or(""),
            )
            .context(OutputSnafu)?;
        }

        writeln!(handle).context(OutputSnafu)?;
        writeln!(handle, "</details>\n").context(OutputSnafu)?;

        Ok(())
    }

    fn format_severity_badge(&self, severity: &Severity) -> String {
        let badge = match severity {
            Severity::High => "![HIGH](https://img.shields.io/badge/HIGH-red)",
            Severity::Medium => "![MEDIUM](https://img.shields.io/badge/MEDIUM-yellow)",
            Severity::Low => "![LOW](https://img.shields.io/badge/LOW-green)",
        };
        badge.to_string()
    }

    fn report_json(&self, report: &DiagnosticReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .context(OutputSnafu)?;

        println!("{}", json);
        Ok(())
    }

    fn report_text(&self, report: &DiagnosticReport) -> Result<()> {
        use std::io::Write;

        let stdout = std::io::stdout();
        let mut handle = stdout.lock();

        writeln!(handle, "MySQL Performance Diagnostic Report").context(OutputSnafu)?;
        writeln!(handle, "===================================\n").context(OutputSnafu)?;

        writeln!(handle, "Severity: {}", report.overall_severity.as_str()).context(OutputSnafu)?;
        writeln!(handle).context(OutputSnafu)?;

        if report.issues.is_empty() {
            writeln!(handle, "No issues found.").context(OutputSnafu)?;
            return Ok(());
        }

        writeln!(handle, "Issues Found:").context(OutputSnafu)?;
        writeln!(handle, "{}", "-".repeat(60)).context(OutputSnafu)?;
        for issue in &report.issues {
            writeln!(
                handle,
                "  [{}] {}",
                issue.severity.as_str(),
                issue.description
            )
            .context(OutputSnafu)?;
        }
        writeln!(handle).context(OutputSnafu)?;

        writeln!(handle, "Recommendations:").context(OutputSnafu)?;
        writeln!(handle, "{}", "-".repeat(60)).context(OutputSnafu)?;
        for (i, rec) in report.recommendations.iter().enumerate() {
            writeln!(handle, "  {}. {}", i + 1, rec.text).context(OutputSnafu)?;
        }

        Ok(())
    }
}

/// Writes the JSON rendering of the report to a file, for downstream
/// tooling or later comparison.
pub fn write_json_file(report: &DiagnosticReport, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        .context(OutputSnafu)?;
    std::fs::write(path, json).context(OutputSnafu)?;
    Ok(())
}

fn fmt_pct(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn fmt_count(value: Option<u64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
