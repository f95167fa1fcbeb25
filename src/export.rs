//! Export: run the flow on the backend and save the returned file.
//!
//! The backend answers with a single workbook when the output block defines
//! one output file and with `outputs.zip` otherwise; the name travels in the
//! `Content-Disposition` header.

use crate::api::{ExecuteRequest, ExportedFile, TransformApi};
use crate::error::{Result, ResultExt as _, SheetpilotError};
use crate::model::{BlockConfig, FlowData, OutputConfig};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

pub const ZIP_DOWNLOAD_NAME: &str = "outputs.zip";
pub const DEFAULT_OUTPUT_NAME: &str = "output.xlsx";

/// Output configuration of the flow's output block (empty when it has none).
pub fn output_config_of(flow_data: &FlowData) -> OutputConfig {
    flow_data
        .nodes
        .iter()
        .find_map(|node| match &node.data.block {
            BlockConfig::Output { output } => Some(output.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Name the backend will give the download for this output configuration.
pub fn expected_download_name(output: &OutputConfig) -> String {
    match output.outputs.as_slice() {
        [] => DEFAULT_OUTPUT_NAME.to_owned(),
        [single] if !single.file_name.trim().is_empty() => single.file_name.clone(),
        [_] => DEFAULT_OUTPUT_NAME.to_owned(),
        _ => ZIP_DOWNLOAD_NAME.to_owned(),
    }
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// Understands `filename=name`, `filename="name"` and the RFC 5987
/// `filename*=UTF-8''name` form (preferred when both are present).
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in header.split(';').map(str::trim) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename" => {
                let value = value.trim().trim_matches('"');
                if !value.is_empty() {
                    plain = Some(value.to_owned());
                }
            }
            "filename*" => {
                let value = value.trim();
                let encoded = value.split_once("''").map_or(value, |(_, rest)| rest);
                let decoded = percent_decode_str(encoded).decode_utf8_lossy();
                if !decoded.is_empty() {
                    extended = Some(decoded.into_owned());
                }
            }
            _ => {}
        }
    }
    extended.or(plain).map(|name| sanitize_file_name(&name))
}

/// Strips path components and characters that are invalid in file names.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_owned();
    if cleaned.is_empty() {
        DEFAULT_OUTPUT_NAME.to_owned()
    } else {
        cleaned
    }
}

/// First path in `dir` for `file_name` that does not exist yet, adding
/// ` (1)`, ` (2)`, ... before the extension.
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    };
    (1..)
        .map(|n| dir.join(format!("{stem} ({n}){ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Writes an exported file into `dir` without overwriting existing files.
pub fn save_export(dir: &Path, file: &ExportedFile) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = unique_path(dir, &sanitize_file_name(&file.file_name));
    std::fs::write(&path, &file.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = file.bytes.len(), "Export saved");
    Ok(path)
}

/// Runs the export for `flow_data` and saves the result into `dir`.
pub async fn export_flow(
    api: &dyn TransformApi,
    flow_data: &FlowData,
    dir: &Path,
) -> Result<PathBuf> {
    let request = ExecuteRequest::for_flow(flow_data, None);
    if request.file_ids.is_empty() {
        return Err(SheetpilotError::Validation(
            "Add files to the flow before exporting".to_owned(),
        ));
    }
    let file = api.export(&request).await?;
    save_export(dir, &file)
}
