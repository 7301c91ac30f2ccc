//! OCR service
//!
//! Wraps a provider with the per-item reliability policy: a deadline on
//! every attempt, and up to `max_retries` attempts with linearly
//! increasing delay between them. A timeout abandons waiting for the
//! in-flight call but cannot stop the remote side.

use std::sync::Arc;

use tokio::time::timeout;

use super::normalize::normalize_items;
use super::provider::OcrProviderTrait;
use super::types::{OcrError, OcrRegion};
use crate::config::OcrConfig;

/// Retrying OCR service over a single provider
pub struct OcrService {
    provider: Arc<dyn OcrProviderTrait>,
    config: OcrConfig,
}

impl OcrService {
    pub fn new(provider: Arc<dyn OcrProviderTrait>, config: OcrConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Recognize one image, normalized, with retry
    pub async fn recognize(&self, image_data: &[u8]) -> Result<Vec<OcrRegion>, OcrError> {
        let max_attempts = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let result = timeout(self.config.timeout, self.provider.recognize(image_data))
                .await
                .unwrap_or_else(|_| Err(OcrError::Timeout(self.config.timeout.as_secs())));

            match result {
                Ok(items) => return Ok(normalize_items(&items)),
                Err(e) => {
                    if attempt < max_attempts && e.is_retryable() {
                        // Linear backoff: base delay times the attempt number
                        let delay = self.config.retry_delay * attempt;
                        tracing::warn!(
                            attempt = attempt,
                            max_attempts = max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "OCR attempt failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(OcrError::Transport("no attempts made".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::provider::MockProvider;
    use serde_json::json;
    use std::time::Duration;

    fn test_config(max_retries: u32) -> OcrConfig {
        OcrConfig {
            endpoint: "http://localhost:0".to_string(),
            timeout: Duration::from_secs(5),
            max_retries,
            retry_delay: Duration::from_millis(1),
            concurrency: 2,
        }
    }

    #[tokio::test]
    async fn test_recognize_normalizes_output() {
        let provider = Arc::new(MockProvider::succeeding(vec![json!({
            "text": "hello",
            "text_region": [[0, 0], [40, 0], [40, 10], [0, 10]],
            "confidence": 0.95
        })]));
        let service = OcrService::new(provider, test_config(3));

        let regions = service.recognize(b"fake image").await.unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].text, "hello");
        assert_eq!(regions[0].region.width, 40);
    }

    #[tokio::test]
    async fn test_recognize_retries_until_success() {
        // Two failures, then success, with max_retries set to 3
        let provider = Arc::new(MockProvider::flaky(vec![json!({ "text": "ok" })], 2));
        let service = OcrService::new(provider, test_config(3));

        let regions = service.recognize(b"fake image").await.unwrap();
        assert_eq!(regions[0].text, "ok");
    }

    #[tokio::test]
    async fn test_recognize_exhausts_retries() {
        let provider = Arc::new(MockProvider::flaky(vec![], 10));
        let service = OcrService::new(provider, test_config(2));

        let result = service.recognize(b"fake image").await;
        assert!(matches!(result, Err(OcrError::Transport(_))));
    }
}
