//! Upload allow-list.
//!
//! Only spreadsheet formats are accepted. A file passes when either its
//! extension or the MIME type reported by the picker is on the list, which
//! matches how browsers fill the `accept` attribute.

use crate::api::FileUpload;
use crate::error::{Result, SheetpilotError};

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

const MIME_BY_EXTENSION: [(&str, &str); 3] = [
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("xls", "application/vnd.ms-excel"),
    ("csv", "text/csv"),
];

/// Lower-cased extension of `name`, without the dot.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type the backend expects for an allowed file name.
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let ext = extension_of(name)?;
    MIME_BY_EXTENSION
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

pub fn is_allowed_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    MIME_BY_EXTENSION
        .iter()
        .any(|(_, allowed)| allowed.eq_ignore_ascii_case(essence))
}

pub fn is_allowed(upload: &FileUpload) -> bool {
    mime_for_name(&upload.file_name).is_some()
        || upload.mime_type.as_deref().is_some_and(is_allowed_mime)
}

/// Rejects files outside the allow-list with a message naming them.
pub fn validate_uploads(uploads: &[FileUpload]) -> Result<()> {
    if uploads.is_empty() {
        return Err(SheetpilotError::Validation(
            "Choose at least one file to upload".to_owned(),
        ));
    }
    let rejected: Vec<&str> = uploads
        .iter()
        .filter(|u| !is_allowed(u))
        .map(|u| u.file_name.as_str())
        .collect();
    if rejected.is_empty() {
        Ok(())
    } else {
        Err(SheetpilotError::Validation(format!(
            "Only .xlsx, .xls and .csv files can be uploaded (rejected: {})",
            rejected.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, mime: Option<&str>) -> FileUpload {
        FileUpload {
            file_name: name.to_owned(),
            mime_type: mime.map(str::to_owned),
            bytes: Vec::new(),
        }
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(mime_for_name("Report.XLSX"), MIME_BY_EXTENSION.first().map(|m| m.1));
        assert_eq!(mime_for_name("data.csv"), Some("text/csv"));
        assert_eq!(mime_for_name("notes.txt"), None);
        assert_eq!(mime_for_name(".csv"), None);
        assert_eq!(mime_for_name("csv"), None);
    }

    #[test]
    fn test_mime_type_alone_is_enough() {
        assert!(is_allowed(&upload("export", Some("text/csv; charset=utf-8"))));
        assert!(!is_allowed(&upload("export", Some("application/pdf"))));
    }

    #[test]
    fn test_validate_names_rejected_files() {
        let files = [upload("a.xlsx", None), upload("b.pdf", Some("application/pdf"))];
        let err = validate_uploads(&files).expect_err("pdf is rejected");
        assert!(err.to_string().contains("b.pdf"));
        assert!(validate_uploads(&[]).is_err());
        assert!(validate_uploads(&files[..1]).is_ok());
    }
}
