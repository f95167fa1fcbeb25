//! # SheetPilot - spreadsheet flow builder
//!
//! A desktop client for building spreadsheet transformation pipelines. Users
//! drag blocks (source, upload, filter, transform, output) onto a canvas,
//! wire them together, preview intermediate results and export the outputs.
//! Execution, storage and authentication live in the backend, reached over
//! HTTP through [`api::ApiClient`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use sheetpilot::api::{ApiClient, FlowApi as _};
//!
//! # async fn example() -> sheetpilot::error::Result<()> {
//! let client = ApiClient::new("http://localhost:8000", None)?;
//! for flow in client.list_flows().await? {
//!     tracing::info!(id = flow.id, name = %flow.name, "flow");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`store`]: the flow document; every edit is a [`store::FlowCommand`]
//! - [`canvas`]: viewport math, drag-and-drop payloads and the canvas widget
//! - [`blocks`]: per-block summaries and the node widget
//! - [`upload`]: file and group management behind the upload modal
//! - [`targets`]: destination targets of transform steps
//! - [`export`]: download naming and saving
//! - [`api`]: backend traits and the HTTP client
//! - [`gui`]: the eframe application
//! - [`error`]: error types and handling utilities
//!
//! ## State and side effects
//!
//! The state types ([`store::FlowStore`], [`upload::UploadState`]) never do
//! I/O. The GUI runs backend calls on a background runtime and feeds the
//! results back as events, so the same state logic is driven directly by the
//! CLI and the integration tests.

#![warn(clippy::all, rust_2018_idioms)]

pub mod api;
pub mod blocks;
pub mod canvas;
pub mod config;
pub mod error;
pub mod export;
pub mod gui;
pub mod logging;
pub mod model;
pub mod store;
pub mod targets;
pub mod theme;
pub mod upload;
pub mod utils;
