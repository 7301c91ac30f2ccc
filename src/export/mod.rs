//! Reconciliation and export
//!
//! Merges a folder's original OCR snapshot with its current annotation
//! state into the export document external consumers parse. The field
//! names in `types` are a wire contract inherited from earlier tooling
//! (`originalOCR`, `calibratedText`, `fullText`, `isManuallyAdded`);
//! they must never be renamed.

mod engine;
mod types;

pub use engine::{export_document, reconcile_folder};
pub use types::{
    CalibratedText, ExportDocument, ExportInfo, ExportRegion, ExportSummary, FolderExport,
    ImageExport, Modifications, OcrTriple,
};
