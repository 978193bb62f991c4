//! Chunked execution and best-effort image placement.
//!
//! Large request lists are split into contiguous chunks and sent one after
//! another. The list is already ordered, so every chunk boundary preserves
//! the descending-offset guarantee.

use docweave_types::{Request, Result};
use serde::Serialize;

use crate::api::DocsApi;
use crate::builder::ImagePlacement;

/// Configuration for batch execution.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum requests per remote call.
    pub max_requests_per_batch: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_requests_per_batch: 50 }
    }
}

/// Send `requests` in sequential chunks. Returns the number executed.
///
/// A failing chunk aborts the rest; earlier chunks stay applied.
pub async fn execute_chunked(
    api: &dyn DocsApi,
    document_id: &str,
    requests: &[Request],
    config: &BatchConfig,
) -> Result<usize> {
    if requests.is_empty() {
        return Ok(0);
    }
    let size = config.max_requests_per_batch.max(1);
    let chunks = requests.len().div_ceil(size);
    for (i, chunk) in requests.chunks(size).enumerate() {
        tracing::debug!(doc = %document_id, chunk = i + 1, of = chunks, requests = chunk.len(), "batch update");
        api.batch_update(document_id, chunk).await?;
    }
    Ok(requests.len())
}

/// One image that could not be placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInsertFailure {
    pub index: usize,
    pub uri: String,
    pub reason: String,
}

/// Outcome of a best-effort image pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageReport {
    pub inserted: usize,
    pub failed: Vec<ImageInsertFailure>,
}

impl ImageReport {
    pub fn merge(&mut self, other: ImageReport) {
        self.inserted += other.inserted;
        self.failed.extend(other.failed);
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Insert images one call at a time, in the given (descending) order.
///
/// A failed image is recorded and the rest continue.
pub async fn insert_images(
    api: &dyn DocsApi,
    document_id: &str,
    placements: &[ImagePlacement],
) -> ImageReport {
    let mut report = ImageReport::default();
    for placement in placements {
        let request = Request::InsertInlineImage {
            index: placement.index,
            image: placement.image.clone(),
        };
        match api.batch_update(document_id, std::slice::from_ref(&request)).await {
            Ok(()) => report.inserted += 1,
            Err(e) => {
                tracing::warn!(
                    doc = %document_id,
                    index = placement.index,
                    uri = %placement.image.uri,
                    error = %e,
                    "image insertion failed, continuing"
                );
                report.failed.push(ImageInsertFailure {
                    index: placement.index,
                    uri: placement.image.uri.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    report
}
