//! Data upload modal: uploaded files, file groups and their previews.

pub mod gui;
pub mod ops;
pub mod state;
pub mod validation;

pub use ops::{BulkReport, EnsureFlowSaved, UploadSession};
pub use state::{
    BatchBucket, BusyFlags, DeleteScope, Notice, PreviewState, UploadEvent, UploadState,
    UploadTarget,
};
