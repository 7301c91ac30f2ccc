//! Annotation types

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::ocr::OcrRegion;

/// One text region on one image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Unique within the image's list; never reused
    pub id: String,
    /// User-editable text, may be empty
    pub text: String,
    /// Rectangle in original-image pixel coordinates, never display space
    pub region: Rect,
    /// True when created by a person rather than seeded from OCR
    pub is_manual: bool,
    /// Confidence in [0, 1]; only machine-origin annotations carry one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Annotation {
    /// Build a machine-origin annotation from a normalized OCR region
    pub fn from_ocr(region: &OcrRegion) -> Self {
        Self {
            id: region.id.clone(),
            text: region.text.clone(),
            region: region.region,
            is_manual: false,
            confidence: region.confidence,
        }
    }
}

/// All annotations for one image, in insertion order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSet {
    pub image_name: String,
    pub text_regions: Vec<Annotation>,
}

impl AnnotationSet {
    pub fn new(image_name: &str) -> Self {
        Self {
            image_name: image_name.to_string(),
            text_regions: Vec::new(),
        }
    }
}

/// Derived statistics for one image's annotation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationStats {
    /// Current list length
    pub count: usize,
    /// Sum of character counts over all region texts
    pub total_chars: usize,
}
