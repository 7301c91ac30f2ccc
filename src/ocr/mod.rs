//! OCR boundary
//!
//! Everything the rest of the server knows about OCR lives behind this
//! module: a provider trait over the remote HTTP service, a retrying
//! service wrapper, the shape normalizer that converts heterogeneous
//! response formats into canonical regions, and the concurrency-limited
//! batch pipeline that processes a folder of images.
//!
//! Raw response shapes are classified and converted exactly once, at
//! this boundary. Internal code only ever sees [`OcrRegion`].

mod normalize;
mod pipeline;
mod provider;
mod service;
mod types;

pub use normalize::{normalize_item, normalize_items};
pub use pipeline::{BatchReport, ItemReport, OcrPipeline};
pub use provider::{HttpOcrProvider, OcrProviderTrait};
pub use service::OcrService;
pub use types::{OcrError, OcrRegion, OcrWord};

#[cfg(test)]
pub use provider::MockProvider;
