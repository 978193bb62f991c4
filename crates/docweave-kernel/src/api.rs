//! The remote document API seam.

use async_trait::async_trait;
use docweave_types::{Document, Request, Result};

/// Remote document operations.
///
/// Everything the engine knows about a document comes through a fresh
/// `get_document`; offsets are never trusted across a `batch_update` unless
/// they were planned for it.
#[async_trait]
pub trait DocsApi: Send + Sync {
    /// Read the full document structure.
    async fn get_document(&self, document_id: &str) -> Result<Document>;

    /// Apply requests strictly in order, atomically.
    async fn batch_update(&self, document_id: &str, requests: &[Request]) -> Result<()>;

    /// Create an empty document.
    async fn create_document(&self, title: &str) -> Result<Document>;
}
