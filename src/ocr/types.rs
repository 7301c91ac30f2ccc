//! OCR types

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// One recognized text region in canonical form
///
/// This is the only shape stored in a folder's `ocrResults` and the
/// only shape the annotation store seeds from. The `id` is assigned by
/// the normalizer and carried into the seeded annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrRegion {
    /// Unique region id (UUID)
    pub id: String,
    /// Recognized text, possibly empty
    pub text: String,
    /// Axis-aligned bounding rectangle in original-image pixels
    pub region: Rect,
    /// Confidence in [0, 1], when the service reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Word-level results, when the service reported them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<OcrWord>>,
}

/// Single word inside a recognized region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// Network or HTTP-level failure reaching the service
    #[error("OCR transport error: {0}")]
    Transport(String),

    /// Service answered, but with a non-success status in its payload
    #[error("OCR service error: {0}")]
    Semantic(String),

    /// Per-item recognition deadline elapsed
    #[error("OCR timed out after {0}s")]
    Timeout(u64),

    /// Response body did not match any known shape
    #[error("Invalid OCR response: {0}")]
    InvalidResponse(String),

    /// Batch entry point called with no images
    #[error("Empty batch: no images to process")]
    EmptyBatch,
}

impl OcrError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Transport(_) | Self::Timeout(_) => StatusCode::BAD_GATEWAY,
            Self::Semantic(_) | Self::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            Self::EmptyBatch => StatusCode::BAD_REQUEST,
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::EmptyBatch)
    }
}
