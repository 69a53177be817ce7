//! Object-store capability consumed by the streaming orchestrator.

mod opendal;

pub use self::opendal::{StorageBackend, StorageConfig, StorageManager};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::ops::RangeInclusive;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("backend error: {0}")]
    Backend(#[from] ::opendal::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Read-only object store. Implementations must allow concurrent independent reads.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Size of the object in bytes, or `StorageError::NotFound`.
    async fn head_object(&self, key: &str) -> StorageResult<u64>;

    /// Stream the object, or only the inclusive `range` of it.
    ///
    /// The stream is lazy: bytes are fetched as it is polled, and dropping it
    /// cancels the underlying read.
    async fn get_object(
        &self,
        key: &str,
        range: Option<RangeInclusive<u64>>,
    ) -> StorageResult<ByteStream>;

    /// Backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}
