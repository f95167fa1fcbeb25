use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use sheetpilot::api::{ApiClient, FileApi as _, FlowApi as _};
use sheetpilot::config::AppSettings;
use sheetpilot::model::FileRecord;
use sheetpilot::upload::{Notice, UploadSession};
use sheetpilot::utils::{fmt_file_size, fmt_timestamp};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetpilot", about = "Spreadsheet flow builder", version)]
pub struct Cli {
    /// Backend base URL. Overrides the settings file and `SHEETPILOT_API_URL`.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token. Falls back to `SHEETPILOT_TOKEN`.
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List saved flows
    Flows,
    /// List uploaded files, grouped
    Files {
        /// Only show groups belonging to this flow
        #[arg(long)]
        flow: Option<i64>,
    },
    /// Print a preview of an uploaded file
    Preview {
        file_id: i64,

        /// Sheet to preview. Defaults to the first sheet.
        #[arg(long)]
        sheet: Option<String>,

        /// Maximum number of rows to print
        #[arg(long, default_value_t = 20)]
        rows: usize,
    },
    /// Run a saved flow and download its output
    Export {
        flow_id: i64,

        /// Where to save the download. Defaults to the configured download folder.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub async fn run_command(command: Commands, api: &ApiClient, settings: &AppSettings) -> Result<()> {
    match command {
        Commands::Flows => handle_flows(api).await,
        Commands::Files { flow } => handle_files(api, flow).await,
        Commands::Preview {
            file_id,
            sheet,
            rows,
        } => handle_preview(api, file_id, sheet, rows).await,
        Commands::Export { flow_id, out_dir } => {
            let dir = out_dir.unwrap_or_else(|| settings.resolved_download_dir());
            handle_export(api, flow_id, dir).await
        }
    }
}

async fn handle_flows(api: &ApiClient) -> Result<()> {
    let flows = api.list_flows().await.context("Failed to list flows")?;
    if flows.is_empty() {
        println!("No flows saved yet.");
        return Ok(());
    }
    for flow in flows {
        println!(
            "{:>6}  {:<40}  {:>4} blocks  updated {}",
            flow.id,
            flow.name,
            flow.flow_data.nodes.len(),
            fmt_timestamp(flow.updated_at.as_deref())
        );
    }
    Ok(())
}

fn print_file(file: &FileRecord, indent: &str) {
    println!(
        "{indent}{:>6}  {:<40}  {:>10}  {}",
        file.id,
        file.display_name(),
        fmt_file_size(file.file_size),
        fmt_timestamp(file.created_at.as_deref())
    );
}

async fn handle_files(api: &ApiClient, flow_id: Option<i64>) -> Result<()> {
    let mut session = UploadSession::new(api);
    session.open(flow_id).await;
    for notice in session.state.drain_notices() {
        if let Notice::Alert(message) = notice {
            anyhow::bail!(message);
        }
    }

    for bucket in session.state.batches() {
        println!("Group #{} {} ({} files)", bucket.batch.id, bucket.batch.name, bucket.files.len());
        for file in &bucket.files {
            print_file(file, "  ");
        }
    }
    println!("Individual files ({})", session.state.individual().len());
    for file in session.state.individual() {
        print_file(file, "  ");
    }
    Ok(())
}

async fn handle_preview(api: &ApiClient, file_id: i64, sheet: Option<String>, rows: usize) -> Result<()> {
    let preview = api
        .preview_file(file_id, sheet.as_deref())
        .await
        .with_context(|| format!("Failed to preview file {file_id}"))?;

    println!("{}", preview.columns.join("\t"));
    for row in 0..preview.preview_rows.len().min(rows) {
        let cells: Vec<String> = preview
            .columns
            .iter()
            .map(|column| preview.cell_text(row, column))
            .collect();
        println!("{}", cells.join("\t"));
    }
    println!("({} rows, {} columns)", preview.row_count, preview.columns.len());
    Ok(())
}

async fn handle_export(api: &ApiClient, flow_id: i64, dir: PathBuf) -> Result<()> {
    let flow = api
        .get_flow(flow_id)
        .await
        .with_context(|| format!("Failed to load flow {flow_id}"))?;
    println!("Exporting \"{}\" to {}...", flow.name, dir.display());
    let path = sheetpilot::export::export_flow(api, &flow.flow_data, &dir).await?;
    println!("Saved {}", path.display());
    Ok(())
}
