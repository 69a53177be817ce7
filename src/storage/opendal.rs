use super::{ByteStream, ObjectStore, StorageError, StorageResult};
use ::opendal::services::{Fs, Memory, S3};
use ::opendal::{Buffer, ErrorKind, Operator};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::ops::{Bound, RangeInclusive};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Storage configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub workspace: PathBuf,
}

#[derive(Clone, Debug)]
pub enum StorageBackend {
    Local,
    S3 {
        bucket: String,
        endpoint: Option<String>,
        region: Option<String>,
        access_key_id: String,
        secret_access_key: String,
    },
    /// Process-local, used for tests and demos
    Memory,
}

/// Object store backed by a single opendal operator.
///
/// No retry layer is installed: a failed read is terminal for its request.
#[derive(Clone)]
pub struct StorageManager {
    operator: Operator,
    config: StorageConfig,
}

impl StorageManager {
    pub fn new(config: StorageConfig) -> Result<Self> {
        let operator = match &config.backend {
            StorageBackend::Local => build_fs_operator(&config.workspace)?,
            StorageBackend::S3 {
                bucket,
                endpoint,
                region,
                access_key_id,
                secret_access_key,
            } => build_s3_operator(
                bucket,
                endpoint.as_deref(),
                region.as_deref(),
                access_key_id,
                secret_access_key,
            )?,
            StorageBackend::Memory => Operator::new(Memory::default())?.finish(),
        };

        Ok(Self { operator, config })
    }

    pub fn memory() -> Result<Self> {
        Self::new(StorageConfig {
            backend: StorageBackend::Memory,
            workspace: PathBuf::from("/"),
        })
    }

    /// Write a whole object. The gateway never writes; seeding and tests do.
    pub async fn put_object(&self, key: &str, data: impl Into<Buffer>) -> StorageResult<()> {
        self.operator.write(key, data.into()).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for StorageManager {
    async fn head_object(&self, key: &str) -> StorageResult<u64> {
        match self.operator.stat(key).await {
            Ok(meta) => Ok(meta.content_length()),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(%key, "object not found");
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn get_object(
        &self,
        key: &str,
        range: Option<RangeInclusive<u64>>,
    ) -> StorageResult<ByteStream> {
        let bounds = match range {
            Some(range) => (
                Bound::Included(*range.start()),
                Bound::Included(*range.end()),
            ),
            None => (Bound::Unbounded, Bound::Unbounded),
        };

        let reader = self.operator.reader(key).await.map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                error.into()
            }
        })?;
        let stream = reader.into_bytes_stream(bounds).await?;

        Ok(Box::pin(stream.map_err(StorageError::from)))
    }

    fn backend_name(&self) -> &'static str {
        match self.config.backend {
            StorageBackend::Local => "fs",
            StorageBackend::S3 { .. } => "s3",
            StorageBackend::Memory => "memory",
        }
    }
}

fn build_fs_operator(root: &Path) -> Result<Operator> {
    info!(root = ?root, "Building filesystem operator");

    let mut builder = Fs::default();
    builder = builder.root(
        root.to_str()
            .ok_or_else(|| anyhow!("Invalid root path: {:?}", root))?,
    );

    Ok(Operator::new(builder)?.finish())
}

fn build_s3_operator(
    bucket: &str,
    endpoint: Option<&str>,
    region: Option<&str>,
    access_key_id: &str,
    secret_access_key: &str,
) -> Result<Operator> {
    info!(
        bucket = %bucket,
        endpoint = ?endpoint,
        region = ?region,
        "Building S3 operator"
    );

    let mut builder = S3::default();
    builder = builder.bucket(bucket);
    builder = builder.access_key_id(access_key_id);
    builder = builder.secret_access_key(secret_access_key);

    if let Some(region) = region {
        builder = builder.region(region);
    }

    if let Some(endpoint) = endpoint {
        builder = builder.endpoint(endpoint);
    }

    Ok(Operator::new(builder)?.finish())
}
