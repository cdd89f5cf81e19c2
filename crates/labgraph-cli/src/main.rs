//! Labgraph CLI
//!
//! Runs one experiment-metadata query and prints the records as JSON on
//! stdout. Logs and the one-line summary go to stderr.
//!
//! The record store is either a JSON snapshot (`--snapshot`) or the live REST
//! API (`--url`, or `LABGRAPH_REST_URL` plus the other `LABGRAPH_REST_*`
//! variables).

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use labgraph_domains::{DomainQuery, MetadataClient};
use labgraph_graph::RecordSource;
use labgraph_source::{query_deadline, RestSource, SnapshotSource, SourceConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "labgraph")]
#[command(author, version, about = "Experiment metadata from a join-free record store")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Read from a JSON snapshot instead of the REST API.
    #[arg(long, global = true, conflicts_with = "url")]
    snapshot: Option<PathBuf>,

    /// REST base URL (overrides LABGRAPH_REST_URL).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Abort the query after this many seconds; 0 disables the deadline
    /// (overrides LABGRAPH_QUERY_DEADLINE_SECS).
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,

    /// Pretty-print the JSON output.
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Args, Clone)]
struct QueryArgs {
    /// Only records about this subject.
    #[arg(long)]
    subject: Option<String>,

    /// Earliest timestamp (RFC 3339 or YYYY-MM-DD).
    #[arg(long, value_parser = parse_timestamp)]
    start: Option<DateTime<Utc>>,

    /// Latest timestamp (RFC 3339 or YYYY-MM-DD, end of day).
    #[arg(long, value_parser = parse_end_timestamp)]
    end: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ecephys sessions.
    Sessions {
        #[command(flatten)]
        query: QueryArgs,
        /// Only the session with this name.
        #[arg(long)]
        session_name: Option<String>,
    },
    /// Histology procedures with their washes and reagents.
    Histology {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Light-sheet imaging runs.
    Imaging {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Viral injections with the materials they were mixed from.
    ViralInjections {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Viral materials with plasmids, titer and injections.
    ViralMaterials {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Water restriction periods.
    WaterRestrictions {
        #[command(flatten)]
        query: QueryArgs,
    },
}

impl QueryArgs {
    fn into_query(self) -> DomainQuery {
        DomainQuery {
            subject_id: self.subject,
            start: self.start,
            end: self.end,
            session_name: None,
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_day_or_instant(raw, false)
}

fn parse_end_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_day_or_instant(raw, true)
}

/// RFC 3339 instant, or a bare date taken as the start (or end) of that UTC
/// day.
fn parse_day_or_instant(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("expected RFC 3339 timestamp or YYYY-MM-DD, got {raw:?}"))?;
    let time = if end_of_day {
        day.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        day.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| format!("invalid date {raw:?}"))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "warn,labgraph_graph=info,labgraph_source=info,labgraph_domains=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_store(args: &StoreArgs) -> Result<Arc<dyn RecordSource>> {
    if let Some(path) = &args.snapshot {
        let source = SnapshotSource::load(path)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), rows = source.row_count(), "using snapshot");
        return Ok(Arc::new(source));
    }

    let config = SourceConfig::from_env(args.url.as_deref())?;
    let source = RestSource::new(&config).context("failed to build REST client")?;
    tracing::info!(url = %config.base_url, "using REST record store");
    Ok(Arc::new(source))
}

fn render<T: Serialize>(records: &[T], pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(records)?
    } else {
        serde_json::to_string(records)?
    };
    Ok(text)
}

/// Run the selected query; returns the rendered JSON, the record count and a
/// label for the summary line.
async fn run(client: &MetadataClient, command: Commands, pretty: bool) -> Result<(String, usize, &'static str)> {
    let out = match command {
        Commands::Sessions {
            query,
            session_name,
        } => {
            let mut query = query.into_query();
            query.session_name = session_name;
            let records = client.get_sessions(&query).await?;
            (render(&records, pretty)?, records.len(), "sessions")
        }
        Commands::Histology { query } => {
            let records = client.get_histology_procedures(&query.into_query()).await?;
            (render(&records, pretty)?, records.len(), "histology procedures")
        }
        Commands::Imaging { query } => {
            let records = client.get_imaging_runs(&query.into_query()).await?;
            (render(&records, pretty)?, records.len(), "imaging runs")
        }
        Commands::ViralInjections { query } => {
            let records = client.get_viral_injections(&query.into_query()).await?;
            (render(&records, pretty)?, records.len(), "viral injections")
        }
        Commands::ViralMaterials { query } => {
            let records = client.get_viral_materials(&query.into_query()).await?;
            (render(&records, pretty)?, records.len(), "viral materials")
        }
        Commands::WaterRestrictions { query } => {
            let records = client.get_water_restrictions(&query.into_query()).await?;
            (render(&records, pretty)?, records.len(), "water restrictions")
        }
    };
    Ok(out)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let source = open_store(&cli.store)?;
    let deadline = query_deadline(cli.store.deadline_secs)?;
    let client = MetadataClient::new(source).with_deadline(deadline);

    let (json, count, label) = run(&client, cli.command, cli.store.pretty)
        .await
        .context("query failed")?;
    println!("{json}");
    eprintln!("{} {} {}", "ok".green().bold(), count, label);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_dates_cover_whole_day() {
        let start = parse_timestamp("2024-06-01").unwrap();
        let end = parse_end_timestamp("2024-06-01").unwrap();
        assert_eq!(start.to_rfc3339(), "2024-06-01T00:00:00+00:00");
        assert_eq!(end.timestamp_millis() - start.timestamp_millis(), 86_399_999);
        assert!(parse_timestamp("2024-06-01T10:00:00Z").is_ok());
        assert!(parse_timestamp("June 1st").is_err());
    }

    #[test]
    fn test_session_flags_parse() {
        let cli = Cli::try_parse_from([
            "labgraph",
            "sessions",
            "--subject",
            "614173",
            "--session-name",
            "ecephys_1",
            "--snapshot",
            "store.json",
            "--pretty",
        ])
        .unwrap();
        assert!(cli.store.pretty);
        assert_eq!(cli.store.snapshot, Some(PathBuf::from("store.json")));
        match cli.command {
            Commands::Sessions {
                query,
                session_name,
            } => {
                assert_eq!(query.subject.as_deref(), Some("614173"));
                assert_eq!(session_name.as_deref(), Some("ecephys_1"));
            }
            _ => panic!("expected sessions"),
        }
    }

    #[test]
    fn test_snapshot_and_url_conflict() {
        let parsed = Cli::try_parse_from([
            "labgraph",
            "imaging",
            "--snapshot",
            "a.json",
            "--url",
            "http://localhost",
        ]);
        assert!(parsed.is_err());
    }
}
