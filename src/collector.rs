use crate::config::DbConfig;
use crate::models::{MetricSnapshot, PlanRow};
use snafu::{ResultExt, Snafu};
use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{query_scalar, MySql, Pool, Row};
use tracing::{debug, info, warn};

#[derive(Debug, Snafu)]
pub enum CollectorError {
    #[snafu(display("Failed to connect to database: {}", source))]
    ConnectionError { source: sqlx::Error },

    #[snafu(display("Failed to execute query: {}", query))]
    QueryError { query: String, source: sqlx::Error },

    #[snafu(display("Failed to parse statement: {}", source))]
    StatementParse {
        source: sqlparser::parser::ParserError,
    },

    #[snafu(display("Cannot explain statement: {}", reason))]
    UnsupportedStatement { reason: String },

    #[snafu(display("Failed to read metrics file: {}", source))]
    MetricsFileRead { source: std::io::Error },

    #[snafu(display("Failed to parse metrics file: {}", source))]
    MetricsFileParse { source: serde_json::Error },
}

type Result<T, E = CollectorError> = std::result::Result<T, E>;

const TABLES_WITHOUT_PK_QUERY: &str = r#"
    SELECT COUNT(*)
    FROM information_schema.tables t
    LEFT JOIN information_schema.table_constraints tc
      ON t.table_schema = tc.table_schema
      AND t.table_name = tc.table_name
      AND tc.constraint_type = 'PRIMARY KEY'
    WHERE tc.constraint_name IS NULL
      AND t.table_schema NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys')
      AND t.table_type = 'BASE TABLE'
"#;

const UNUSED_INDEXES_QUERY: &str = r#"
    SELECT COUNT(*)
    FROM performance_schema.table_io_waits_summary_by_index_usage
    WHERE index_name IS NOT NULL
      AND index_name != 'PRIMARY'
      AND count_star = 0
      AND object_schema NOT IN ('mysql', 'performance_schema', 'sys')
"#;

/// Acquires raw diagnostic inputs from a MySQL server.
///
/// The collector never decides anything; it hands a `MetricSnapshot` or a
/// plan to the analysis layer. A metric whose source is unavailable is left
/// absent (with a warning), never filled with zero.
pub struct Collector {
    config: DbConfig,
    pool: Pool<MySql>,
}

impl Collector {
    pub async fn new(config: DbConfig) -> Result<Self> {
        info!("Connecting to MySQL at {}:{}", config.host, config.port);

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(&config.connection_string())
            .await
            .context(ConnectionSnafu)?;

        info!("Successfully connected to database: {}", config.database);

        Ok(Self { config, pool })
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    /// Collects the runtime counters and schema facts that have a SQL
    /// source. CPU utilization and read latency have none and stay absent
    /// unless a metrics overlay supplies them.
    pub async fn collect_snapshot(&self) -> Result<MetricSnapshot> {
        let mut snapshot = MetricSnapshot::default();

        info!("Collecting connection statistics...");
        let threads_connected = self.fetch_status_numeric("Threads_connected").await?;
        let max_connections = self
            .fetch_variable("max_connections")
            .await?
            .and_then(|v| v.parse::<f64>().ok());
        snapshot.connection_utilization_pct = match (threads_connected, max_connections) {
            (Some(current), Some(max)) if max > 0.0 => Some(current / max * 100.0),
            _ => {
                warn!("Connection counters unavailable; skipping connection utilization");
                None
            }
        };

        info!("Collecting buffer pool statistics...");
        let read_requests = self
            .fetch_status_numeric("Innodb_buffer_pool_read_requests")
            .await?;
        let disk_reads = self.fetch_status_numeric("Innodb_buffer_pool_reads").await?;
        snapshot.buffer_pool_hit_rate_pct = match (read_requests, disk_reads) {
            (Some(requests), Some(reads)) if requests > 0.0 => {
                Some((requests - reads) / requests * 100.0)
            }
            // No read requests served yet means there is no hit rate to
            // report, not a 0% one.
            _ => None,
        };

        info!("Analyzing schema and indexes...");
        snapshot.tables_without_primary_key = match query_scalar::<_, i64>(TABLES_WITHOUT_PK_QUERY)
            .fetch_one(&self.pool)
            .await
        {
            Ok(count) => Some(count.max(0) as u64),
            Err(err) => {
                warn!("Failed to count tables without primary keys: {err}");
                None
            }
        };

        snapshot.unused_index_count = match query_scalar::<_, i64>(UNUSED_INDEXES_QUERY)
            .fetch_one(&self.pool)
            .await
        {
            Ok(count) => Some(count.max(0) as u64),
            Err(err) => {
                warn!("Could not query performance_schema for unused indexes: {err}");
                None
            }
        };

        info!("Checking slow query log configuration...");
        snapshot.slow_query_log_enabled = self
            .fetch_variable("slow_query_log")
            .await?
            .map(|v| v.eq_ignore_ascii_case("ON") || v == "1");

        Ok(snapshot)
    }

    /// Runs EXPLAIN on a single SELECT statement and returns the plan rows.
    pub async fn explain(&self, sql: &str) -> Result<Vec<PlanRow>> {
        let statement = sql.trim().trim_end_matches(';').trim();
        ensure_single_select(statement)?;

        let query = format!("EXPLAIN {statement}");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context(QuerySnafu { query: query.clone() })?;

        let plan: Vec<PlanRow> = rows.iter().map(plan_row_from_mysql).collect();
        debug!("Collected {} plan rows", plan.len());
        Ok(plan)
    }

    async fn fetch_status_numeric(&self, name: &str) -> Result<Option<f64>> {
        let query = format!("SHOW GLOBAL STATUS LIKE '{name}'");
        let row = sqlx::query(&query)
            .fetch_optional(&self.pool)
            .await
            .context(QuerySnafu { query: query.clone() })?;

        Ok(row
            .and_then(|r| r.try_get::<String, _>("Value").ok())
            .and_then(|v| v.parse::<f64>().ok()))
    }

    async fn fetch_variable(&self, name: &str) -> Result<Option<String>> {
        let query = format!("SHOW VARIABLES LIKE '{name}'");
        let row = sqlx::query(&query)
            .fetch_optional(&self.pool)
            .await
            .context(QuerySnafu { query: query.clone() })?;

        Ok(row.and_then(|r| r.try_get::<String, _>("Value").ok()))
    }
}

/// Loads externally collected metrics (e.g. a CloudWatch export) from a
/// JSON file, to be merged over the SQL-collected snapshot.
pub fn load_metrics_overlay(path: &str) -> Result<MetricSnapshot> {
    let content = std::fs::read_to_string(path).context(MetricsFileReadSnafu)?;
    serde_json::from_str(&content).context(MetricsFileParseSnafu)
}

/// Only a single SELECT statement may be interpolated into EXPLAIN.
fn ensure_single_select(sql: &str) -> Result<()> {
    let statements = Parser::parse_sql(&MySqlDialect {}, sql).context(StatementParseSnafu)?;

    match statements.as_slice() {
        [Statement::Query(_)] => Ok(()),
        [] => UnsupportedStatementSnafu {
            reason: "empty statement",
        }
        .fail(),
        [_] => UnsupportedStatementSnafu {
            reason: "only SELECT statements are supported",
        }
        .fail(),
        _ => UnsupportedStatementSnafu {
            reason: "multiple statements supplied",
        }
        .fail(),
    }
}

fn plan_row_from_mysql(row: &MySqlRow) -> PlanRow {
    PlanRow {
        table: row.try_get::<Option<String>, _>("table").ok().flatten(),
        select_type: row
            .try_get::<Option<String>, _>("select_type")
            .ok()
            .flatten(),
        access_type: row.try_get::<Option<String>, _>("type").ok().flatten(),
        key: row.try_get::<Option<String>, _>("key").ok().flatten(),
        rows_examined: row
            .try_get::<Option<u64>, _>("rows")
            .ok()
            .flatten()
            .map(|r| r as i64),
        extra: row.try_get::<Option<String>, _>("Extra").ok().flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_statement_is_accepted() {
        assert!(ensure_single_select("SELECT * FROM users WHERE id = 1").is_ok());
    }

    #[test]
    fn join_query_is_accepted() {
        assert!(ensure_single_select(
            "SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id ORDER BY o.created_at"
        )
        .is_ok());
    }

    #[test]
    fn ddl_is_rejected() {
        let err = ensure_single_select("DROP TABLE users").unwrap_err();
        assert!(err.to_string().contains("only SELECT statements"));
    }

    #[test]
    fn multiple_statements_are_rejected() {
        assert!(ensure_single_select("SELECT 1; SELECT 2").is_err());
    }

    #[test]
    fn unparseable_input_is_rejected() {
        assert!(ensure_single_select("SELEKT everything").is_err());
    }
}
