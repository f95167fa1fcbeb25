//! # SheetPilot entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Initialise logging, parse CLI arguments (clap), load settings
//!   │
//!   ├─> If a subcommand was given:
//!   │   └─> Run it on a Tokio runtime and exit
//!   │
//!   └─> Otherwise:
//!       └─> Launch the egui flow builder
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // CLI subcommands print their results
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod cli;

use anyhow::{Context as _, Result};
use clap::Parser as _;
use eframe::egui;
use secrecy::SecretString;
use sheetpilot::api::ApiClient;
use sheetpilot::config::{AppSettings, token_from_env};
use sheetpilot::gui::FlowBuilderApp;
use std::sync::Arc;

fn main() -> Result<()> {
    sheetpilot::logging::init().context("Failed to initialise logging")?;

    let cli = cli::Cli::parse();

    let mut settings = AppSettings::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Using default settings");
        AppSettings::default()
    });
    if let Some(url) = cli.api_url.filter(|u| !u.trim().is_empty()) {
        settings.api_base_url = url;
    }
    let token = cli
        .token
        .filter(|t| !t.trim().is_empty())
        .map(SecretString::from)
        .or_else(token_from_env);

    let client = ApiClient::new(&settings.api_base_url, token.clone())?;
    tracing::info!(api = %client.base_url(), authenticated = token.is_some(), "SheetPilot starting");

    if let Some(command) = cli.command {
        let runtime = sheetpilot::utils::build_runtime()?;
        return runtime.block_on(cli::run_command(command, &client, &settings));
    }

    run_gui(settings, token, client)
}

fn run_gui(settings: AppSettings, token: Option<SecretString>, client: ApiClient) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("SheetPilot")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 500.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "SheetPilot",
        options,
        Box::new(move |cc| {
            let app = FlowBuilderApp::new(cc, settings, token, Arc::new(client))?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run the flow builder: {e}"))
}
