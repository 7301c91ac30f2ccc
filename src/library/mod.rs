//! Folder model and upload validation
//!
//! A folder is the unit of work: the images uploaded together, the OCR
//! output per image, and derived counters. Image binaries live in the
//! chunk store; annotation sets live in their own collection. Both are
//! keyed by folder id, so everything here is metadata.

mod folder;
mod validate;

pub use folder::{Folder, FolderMetadata, FolderStatus, ImageFileMeta};
pub use validate::{decode_data_uri, sniff_dimensions, validate_file};
