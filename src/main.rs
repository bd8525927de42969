use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

mod auditlog;
mod config;
mod error;
mod logging;
mod model;
mod render;

use auditlog::{AuditLogReader, AuditRecord};
use config::{Config, FilterPolicy};
use model::{EdgeSet, LineageBuilder, RunSummary};
use render::OutputFormat;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "bql")]
#[command(about = "BigQuery table lineage from exported audit logs", long_about = None)]
struct Cli {
    /// Logging verbosity (`trace`, `debug`, `info`, `warn`, `error`); RUST_LOG overrides it.
    #[arg(short, long, global = true, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the lineage graph from every auditlog.json under a directory.
    Graph {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        #[arg(long)]
        config: PathBuf,

        #[arg(short = 'o', long)]
        out: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Dot)]
        format: OutputFormat,
    },

    /// Print decoded job records as JSON lines.
    Extract {
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Drop records of excluded principals.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup(&cli.verbosity);

    match cli.cmd {
        Commands::Graph {
            data_dir,
            config: config_path,
            out,
            format,
        } => {
            // 1) Load config; bad patterns stop us here.
            let config = config::load_config(&config_path)?;
            info!(
                start = ?config.start,
                end = ?config.end,
                limit = config.limit,
                sources = config.sources.len(),
                "Loaded config {}",
                config_path.display()
            );

            // 2) Discover and fold audit logs into the edge set.
            let files = discover(&data_dir)?;
            let (edges, summary) = collect_edges(&files, &config.filters)?;
            log_summary(&summary, edges.len());

            // 3) Cluster.
            let graph = model::build_graph(&edges);

            // 4) Render.
            info!("Build a graph to {}", out.display());
            let text = render::render(&graph, format)?;
            std::fs::write(&out, text).with_context(|| format!("write {}", out.display()))?;
            println!("Wrote {}", out.display());
        }
        Commands::Extract {
            data_dir,
            config: config_path,
        } => {
            let config = match config_path {
                Some(path) => config::load_config(&path)?,
                None => Config::default(),
            };
            let files = discover(&data_dir)?;
            for path in &files {
                for record in extract_records(path, &config.filters)? {
                    println!("{}", serde_json::to_string(&record)?);
                }
            }
        }
    }

    Ok(())
}

fn discover(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let files = auditlog::find_audit_log_files(data_dir)?;
    if files.is_empty() {
        warn!(
            "no {} found under {}",
            auditlog::AUDIT_LOG_FILE_NAME,
            data_dir.display()
        );
    }
    Ok(files)
}

/// Decode every line of one file, skipping malformed records with a warning.
///
/// Returns the number of skipped lines.
fn for_each_record(path: &Path, mut on_record: impl FnMut(AuditRecord)) -> Result<usize> {
    info!("Read {}", path.display());
    let mut malformed = 0;
    for item in AuditLogReader::open(path)? {
        let (lno, decoded) = item.with_context(|| format!("read {}", path.display()))?;
        match decoded {
            Ok(record) => on_record(record),
            Err(e) => {
                malformed += 1;
                warn!("skip malformed record at {}:{}: {}", path.display(), lno, e);
            }
        }
    }
    Ok(malformed)
}

/// Records of one file that carry a job event and were not triggered by an
/// excluded principal.
fn extract_records(path: &Path, policy: &FilterPolicy) -> Result<Vec<AuditRecord>> {
    let mut records = Vec::new();
    for_each_record(path, |record| {
        let keep = record.job_event.is_some()
            && !policy.is_excluded_principal(&record.auth_info.principal_email);
        if keep {
            records.push(record);
        }
    })?;
    Ok(records)
}

/// Fold every record of every file into one edge set, in file order.
fn collect_edges(files: &[PathBuf], policy: &FilterPolicy) -> Result<(EdgeSet, RunSummary)> {
    let mut builder = LineageBuilder::new(policy);
    let mut summary = RunSummary::default();

    for path in files {
        let malformed = for_each_record(path, |record| {
            summary.record(builder.update(&record));
        })?;
        summary.malformed += malformed;
        debug!(path = %path.display(), edges = builder.edges().len(), "folded");
    }

    Ok((builder.into_edges(), summary))
}

fn log_summary(summary: &RunSummary, edges: usize) {
    info!(
        records = summary.records,
        malformed = summary.malformed,
        no_job_event = summary.no_job_event,
        excluded_principal = summary.excluded_principal,
        no_destination = summary.no_destination,
        excluded_destination = summary.excluded_destination,
        absorbed = summary.absorbed,
        edges_added = summary.edges_added,
        edges,
        "lineage collected"
    );
}
