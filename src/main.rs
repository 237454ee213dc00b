use clap::{ArgGroup, Parser, Subcommand};
use mydiag::analysis::{metrics, plan, report};
use mydiag::collector::{self, Collector};
use mydiag::config::DbConfig;
use mydiag::reporter::{self, ReportFormat, Reporter};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// MySQL Performance Diagnostics - Analyzes runtime state and query plans and
/// suggests improvements
#[derive(Parser, Debug)]
#[command(name = "mydiag")]
#[command(version = "0.1.0")]
#[command(about = "MySQL performance diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "markdown")]
    format: ReportFormat,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diagnose runtime and schema state of a single MySQL database
    Diagnose {
        /// Database host
        #[arg(
            short = 'H',
            long = "host",
            env = "MYSQL_HOST",
            default_value = "localhost"
        )]
        host: String,

        /// Database port
        #[arg(long = "port", env = "MYSQL_PORT", default_value = "3306")]
        port: u16,

        /// Database name
        #[arg(
            short = 'd',
            long = "database",
            env = "MYSQL_DATABASE",
            default_value = "information_schema"
        )]
        database: String,

        /// Username
        #[arg(short = 'u', long = "username", env = "MYSQL_USER")]
        username: String,

        /// Password
        #[arg(short = 'p', long = "password", env = "MYSQL_PASSWORD")]
        password: String,

        /// JSON file with externally collected metrics (e.g. a CloudWatch
        /// export); fields present in the file override collected values
        #[arg(long = "metrics-file")]
        metrics_file: Option<String>,

        /// Also write the JSON report to this path
        #[arg(short = 'o', long = "output")]
        output: Option<String>,
    },
    /// Analyze the execution plan of a single query with EXPLAIN
    #[command(group(ArgGroup::new("statement").required(true).args(["query", "file"])))]
    Explain {
        /// Database host
        #[arg(
            short = 'H',
            long = "host",
            env = "MYSQL_HOST",
            default_value = "localhost"
        )]
        host: String,

        /// Database port
        #[arg(long = "port", env = "MYSQL_PORT", default_value = "3306")]
        port: u16,

        /// Database name
        #[arg(
            short = 'd',
            long = "database",
            env = "MYSQL_DATABASE",
            default_value = "information_schema"
        )]
        database: String,

        /// Username
        #[arg(short = 'u', long = "username", env = "MYSQL_USER")]
        username: String,

        /// Password
        #[arg(short = 'p', long = "password", env = "MYSQL_PASSWORD")]
        password: String,

        /// SQL query to analyze
        #[arg(short = 'q', long = "query")]
        query: Option<String>,

        /// File containing the SQL query
        #[arg(long = "file")]
        file: Option<String>,

        /// Also write the JSON report to this path
        #[arg(short = 'o', long = "output")]
        output: Option<String>,
    },
    /// Diagnose multiple databases from a YAML config file
    Config {
        /// Path to YAML config file
        #[arg(short = 'c', long = "config")]
        config_path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Diagnose {
            host,
            port,
            database,
            username,
            password,
            metrics_file,
            output,
        } => {
            info!("Diagnosing database: {}", database);
            let config = DbConfig::from_connection_params(host, port, database, username, password);

            let db = Collector::new(config).await?;
            let mut snapshot = db.collect_snapshot().await?;
            if let Some(path) = metrics_file {
                info!("Overlaying metrics from: {}", path);
                snapshot.merge(collector::load_metrics_overlay(&path)?);
            }

            let issues = metrics::evaluate(&snapshot)?;
            let mut diagnosis = report::aggregate(Vec::new(), issues);
            diagnosis.raw_snapshot = Some(snapshot);

            Reporter::new(cli.format).report(&diagnosis)?;
            if let Some(path) = output {
                reporter::write_json_file(&diagnosis, &path)?;
                info!("Results saved to: {}", path);
            }
        }
        Commands::Explain {
            host,
            port,
            database,
            username,
            password,
            query,
            file,
            output,
        } => {
            let sql = match (query, file) {
                (Some(sql), _) => sql,
                (None, Some(path)) => std::fs::read_to_string(&path)?,
                (None, None) => anyhow::bail!("either --query or --file must be provided"),
            };

            info!("Analyzing query against database: {}", database);
            let config = DbConfig::from_connection_params(host, port, database, username, password);

            let db = Collector::new(config).await?;
            let plan_rows = db.explain(&sql).await?;

            let issues = plan::classify(&plan_rows)?;
            let mut diagnosis = report::aggregate(issues, Vec::new());
            diagnosis.raw_plan = plan_rows;

            Reporter::new(cli.format).report(&diagnosis)?;
            if let Some(path) = output {
                reporter::write_json_file(&diagnosis, &path)?;
                info!("Results saved to: {}", path);
            }
        }
        Commands::Config { config_path } => {
            info!("Loading config from: {}", config_path);
            let configs = DbConfig::from_config_file(&config_path)?;

            for config in configs {
                info!("Diagnosing database: {}", config.database);
                let db = Collector::new(config).await?;
                let snapshot = db.collect_snapshot().await?;

                let issues = metrics::evaluate(&snapshot)?;
                let mut diagnosis = report::aggregate(Vec::new(), issues);
                diagnosis.raw_snapshot = Some(snapshot);

                Reporter::new(cli.format).report(&diagnosis)?;
            }
        }
    }

    Ok(())
}
