//! Annotation data model and calibration session state
//!
//! An annotation is one text region on one image: its rectangle (always
//! in original-image pixel coordinates), its current text, and whether
//! a human created it or it was seeded from OCR output. The store keeps
//! the per-image lists for a folder under calibration; the manager owns
//! one store per active session and is the only holder of uncommitted
//! edits.

mod session;
mod store;
mod types;

pub use session::CalibrationManager;
pub use store::AnnotationStore;
pub use types::{Annotation, AnnotationSet, AnnotationStats};
