use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod columns;
mod config;
mod error;
mod ingest;
mod levels;
mod models;
mod pipeline;
mod report;
mod scoring;
mod server;
mod workbook;

#[derive(Parser)]
#[command(name = "diagnostic-analytics")]
#[command(
    about = "Psychometric analytics for child diagnostic assessment spreadsheets",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the analytics workbook for one assessment export
    Process {
        /// Input spreadsheet named `{site}-{assessment}-*.xlsx`
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the summary tables without building a workbook
    Summary {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = SummaryFormat::Markdown)]
        format: SummaryFormat,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Serve the upload page and processing endpoint
    Serve(config::ServerConfig),
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

fn read_input(path: &Path) -> anyhow::Result<(Vec<u8>, String)> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("input path has no usable file name")?
        .to_string();
    Ok((bytes, filename))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process { input, out_dir } => {
            let (bytes, filename) = read_input(&input)?;
            let output = pipeline::process(&bytes, &filename)?;
            let out = out_dir.join(&output.filename);
            std::fs::write(&out, &output.workbook)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Workbook written to {}.", out.display());
        }
        Commands::Summary { input, format, out } => {
            let (bytes, filename) = read_input(&input)?;
            let analysis = pipeline::analyze(&bytes, &filename)?;
            let today = Utc::now().date_naive();
            let rendered = match format {
                SummaryFormat::Markdown => report::build_markdown(
                    &analysis.source,
                    analysis.scored.len(),
                    today,
                    &analysis.tables,
                ),
                SummaryFormat::Json => report::build_json(
                    &analysis.source,
                    analysis.scored.len(),
                    today,
                    &analysis.tables,
                )?,
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Summary written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Serve(config) => {
            server::run_server(config).await?;
        }
    }

    Ok(())
}
