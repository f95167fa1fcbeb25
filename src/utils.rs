use crate::error::{Result, ResultExt as _};

/// Formats a byte count with a binary unit, e.g. `1.5 KB`.
pub fn fmt_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = "KB";
    for next in UNITS.iter().skip(1) {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

/// Renders a backend timestamp (ISO 8601, with or without offset) as local
/// `YYYY-MM-DD HH:MM`, or "—" when missing or unparseable.
pub fn fmt_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "—".to_owned();
    };
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| "—".to_owned())
}

/// Multi-threaded runtime the GUI runs backend calls on.
pub fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("sheetpilot-io")
        .enable_all()
        .build()
        .context("Failed to start the background runtime")
}
