use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{AssetId, RemoteAsset};

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("blob store request failed: {0}")]
    Request(String),
    #[error("blob store rejected the request: {0}")]
    Provider(String),
}

/// Remote content store. Shares no transaction with the primary store —
/// callers own the ordering and compensation between the two.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Upload a blob. Not idempotent: every call creates a new, distinct
    /// asset even for identical bytes.
    async fn put(&self, bytes: &[u8]) -> Result<RemoteAsset, BlobStoreError>;

    /// Delete a blob. Idempotent: deleting an absent or already-deleted id
    /// succeeds.
    async fn delete(&self, id: &AssetId) -> Result<(), BlobStoreError>;
}
