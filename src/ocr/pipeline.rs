//! Batch OCR pipeline
//!
//! Runs a folder's images through the OCR service with bounded
//! concurrency. Each worker slot owns one image end to end, retries
//! included, before taking the next. Failures stay local to their
//! image: the batch always completes with a summary, and failed items
//! appear in the report with an explicit error string rather than
//! being dropped.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::service::OcrService;
use super::types::{OcrError, OcrRegion};

/// Outcome of one batch run
#[derive(Debug)]
pub struct BatchReport {
    pub success_count: usize,
    pub failure_count: usize,
    /// One entry per input image, in input order
    pub items: Vec<ItemReport>,
}

/// Outcome for a single image
#[derive(Debug)]
pub struct ItemReport {
    pub image_name: String,
    /// Normalized regions on success
    pub regions: Option<Vec<OcrRegion>>,
    /// Error description on failure
    pub error: Option<String>,
}

/// Concurrency-limited batch runner
pub struct OcrPipeline {
    service: Arc<OcrService>,
}

impl OcrPipeline {
    pub fn new(service: Arc<OcrService>) -> Self {
        Self { service }
    }

    /// Process a batch of `(image_name, bytes)` pairs.
    ///
    /// Rejects an empty batch immediately; everything else completes
    /// with a per-item report.
    pub async fn run(&self, images: Vec<(String, Vec<u8>)>) -> Result<BatchReport, OcrError> {
        if images.is_empty() {
            return Err(OcrError::EmptyBatch);
        }

        let concurrency = self.service.config().concurrency.max(1);
        let total = images.len();

        let mut outcomes: Vec<(usize, ItemReport)> = stream::iter(images.into_iter().enumerate())
            .map(|(index, (image_name, bytes))| {
                let service = Arc::clone(&self.service);
                async move {
                    let report = match service.recognize(&bytes).await {
                        Ok(regions) => {
                            tracing::debug!(
                                image = %image_name,
                                regions = regions.len(),
                                "OCR succeeded"
                            );
                            ItemReport {
                                image_name,
                                regions: Some(regions),
                                error: None,
                            }
                        }
                        Err(e) => {
                            tracing::warn!(image = %image_name, error = %e, "OCR failed");
                            ItemReport {
                                image_name,
                                regions: None,
                                error: Some(e.to_string()),
                            }
                        }
                    };
                    (index, report)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        // Restore input order for a deterministic report
        outcomes.sort_by_key(|(index, _)| *index);
        let items: Vec<ItemReport> = outcomes.into_iter().map(|(_, item)| item).collect();

        let success_count = items.iter().filter(|i| i.regions.is_some()).count();
        let report = BatchReport {
            success_count,
            failure_count: total - success_count,
            items,
        };

        tracing::info!(
            total = total,
            succeeded = report.success_count,
            failed = report.failure_count,
            "OCR batch complete"
        );

        Ok(report)
    }
}
