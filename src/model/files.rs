//! Client-side mirrors of the backend's file, batch and preview records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An uploaded file as listed by `GET /api/files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    /// Generated name on the server's disk
    pub filename: String,
    /// Name the user uploaded, used for display
    pub original_filename: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Owning group; `None` for individual files
    #[serde(default)]
    pub batch_id: Option<i64>,
}

impl FileRecord {
    pub fn display_name(&self) -> &str {
        if self.original_filename.is_empty() {
            &self.filename
        } else {
            &self.original_filename
        }
    }

    /// Display name without its extension.
    pub fn stem(&self) -> &str {
        let name = self.display_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => name.get(..idx).unwrap_or(name),
            _ => name,
        }
    }
}

/// A named file group as listed by `GET /api/files/batches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_count: usize,
    #[serde(default)]
    pub flow_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Tabular sample returned by the preview endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilePreview {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub preview_rows: Vec<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub dtypes: BTreeMap<String, String>,
}

impl FilePreview {
    /// Renders one cell as display text. Missing cells and nulls render empty.
    pub fn cell_text(&self, row: usize, column: &str) -> String {
        match self.preview_rows.get(row).and_then(|r| r.get(column)) {
            None | Some(serde_json::Value::Null) => String::new(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_record_from_backend_json() {
        let json = r#"{
            "id": 12,
            "filename": "a1b2c3.csv",
            "original_filename": "Q3 sales.csv",
            "file_size": 2048,
            "mime_type": "text/csv",
            "created_at": "2024-05-01T10:00:00"
        }"#;
        let record: FileRecord = serde_json::from_str(json).expect("valid record");
        assert_eq!(record.batch_id, None);
        assert_eq!(record.display_name(), "Q3 sales.csv");
        assert_eq!(record.stem(), "Q3 sales");
    }

    #[test]
    fn test_stem_without_extension() {
        let record = FileRecord {
            id: 1,
            filename: "stored".to_owned(),
            original_filename: ".hidden".to_owned(),
            file_size: 0,
            mime_type: String::new(),
            created_at: None,
            batch_id: None,
        };
        assert_eq!(record.stem(), ".hidden");
    }

    #[test]
    fn test_cell_text() {
        let preview: FilePreview = serde_json::from_str(
            r#"{"columns": ["name", "age", "note"], "row_count": 1,
                "preview_rows": [{"name": "Ada", "age": 36, "note": null}]}"#,
        )
        .expect("valid preview");
        assert_eq!(preview.cell_text(0, "name"), "Ada");
        assert_eq!(preview.cell_text(0, "age"), "36");
        assert_eq!(preview.cell_text(0, "note"), "");
        assert_eq!(preview.cell_text(3, "name"), "");
    }
}
