//! OCR providers
//!
//! The provider trait is the black-box contract with the recognition
//! service: image bytes in, a list of raw result items out. Shape
//! normalization happens upstream, in the normalizer.

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;

use super::types::OcrError;

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Check whether the provider can be reached
    async fn is_available(&self) -> bool;

    /// Recognize text regions in an image
    ///
    /// Returns raw result items in whatever shape the service emits;
    /// callers normalize them.
    async fn recognize(&self, image_data: &[u8]) -> Result<Vec<Value>, OcrError>;
}

/// HTTP OCR provider (PaddleOCR-style serving endpoint)
pub struct HttpOcrProvider {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpOcrProvider {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl OcrProviderTrait for HttpOcrProvider {
    async fn is_available(&self) -> bool {
        self.client.head(&self.endpoint).send().await.is_ok()
    }

    async fn recognize(&self, image_data: &[u8]) -> Result<Vec<Value>, OcrError> {
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let request = serde_json::json!({
            "images": [image_base64],
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::Transport(format!("Failed to call OCR service: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Transport(format!(
                "OCR service returned {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| OcrError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        // The serving wrapper embeds its own status code; "000" is success
        if let Some(status) = body.get("status").and_then(Value::as_str) {
            if status != "000" {
                let msg = body.get("msg").and_then(Value::as_str).unwrap_or("unknown");
                return Err(OcrError::Semantic(format!(
                    "status {}: {}",
                    status, msg
                )));
            }
        }

        // results is a list per input image; we always send exactly one
        let items = body
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| {
                OcrError::InvalidResponse("response has no results array".to_string())
            })?;

        Ok(items)
    }
}

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    pub items: Vec<Value>,
    /// Fail this many calls before succeeding
    pub fail_first: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl MockProvider {
    pub fn succeeding(items: Vec<Value>) -> Self {
        Self {
            items,
            fail_first: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn flaky(items: Vec<Value>, failures: u32) -> Self {
        Self {
            items,
            fail_first: std::sync::atomic::AtomicU32::new(failures),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for MockProvider {
    async fn is_available(&self) -> bool {
        true
    }

    async fn recognize(&self, _image_data: &[u8]) -> Result<Vec<Value>, OcrError> {
        use std::sync::atomic::Ordering;

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(OcrError::Transport("simulated failure".to_string()));
        }

        Ok(self.items.clone())
    }
}
