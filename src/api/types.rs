//! Request and response bodies of the backend API.

use crate::model::{BlockConfig, FilePreview, FlowData, OutputFile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct FlowCreateRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub flow_data: &'a FlowData,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowUpdateRequest<'a> {
    pub name: &'a str,
    pub flow_data: &'a FlowData,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchCreateRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<i64>,
}

/// A file picked by the user, ready to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    /// MIME type reported by the picker, if any
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Reads a file from disk, deriving its MIME type from the extension.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        let mime_type = crate::upload::validation::mime_for_name(&file_name).map(str::to_owned);
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }
}

/// Which table a flow execution should preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviewTarget {
    File {
        file_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        sheet_name: Option<String>,
    },
    Virtual {
        virtual_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest<'a> {
    pub file_id: i64,
    pub file_ids: Vec<i64>,
    pub flow_data: &'a FlowData,
    pub preview_target: Option<PreviewTarget>,
}

impl<'a> ExecuteRequest<'a> {
    /// Builds a request over every file the flow references.
    pub fn for_flow(flow_data: &'a FlowData, preview_target: Option<PreviewTarget>) -> Self {
        let file_ids = flow_data.referenced_file_ids();
        Self {
            file_id: file_ids.first().copied().unwrap_or_default(),
            file_ids,
            flow_data,
            preview_target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecuteResponse {
    pub preview: FilePreview,
    pub row_count: usize,
    pub column_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepPreviewRequest {
    pub file_id: i64,
    /// The node's data without its label: `{blockType, config, ...}`
    pub step_config: serde_json::Value,
}

impl StepPreviewRequest {
    pub fn for_block(file_id: i64, block: &BlockConfig) -> crate::error::Result<Self> {
        Ok(Self {
            file_id,
            step_config: serde_json::to_value(block)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrecomputeResponse {
    pub status: String,
    #[serde(default)]
    pub precomputed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputListing {
    #[serde(default)]
    pub outputs: Vec<OutputFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetList {
    pub sheets: Vec<String>,
}

/// A downloaded export: the server-chosen file name and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_target_shapes() {
        let file = PreviewTarget::File {
            file_id: 4,
            sheet_name: None,
        };
        assert_eq!(
            serde_json::to_value(&file).expect("serializable"),
            serde_json::json!({"file_id": 4})
        );

        let virtual_target = PreviewTarget::Virtual {
            virtual_id: "output:output-1:Sheet1".to_owned(),
        };
        assert_eq!(
            serde_json::to_value(&virtual_target).expect("serializable"),
            serde_json::json!({"virtual_id": "output:output-1:Sheet1"})
        );
    }

    #[test]
    fn test_execute_request_without_files_uses_zero() {
        let data = FlowData::default();
        let request = ExecuteRequest::for_flow(&data, None);
        assert_eq!(request.file_id, 0);
        assert!(request.file_ids.is_empty());
    }
}
