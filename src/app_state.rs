use crate::claim::{AuthorizationBinder, ClaimAuthority, ClaimManager};
use crate::config::Config;
use crate::storage::{ObjectStore, StorageBackend, StorageConfig, StorageManager};
use crate::streamer::Streamer;
use anyhow::anyhow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Read-only state shared by every request
#[derive(Clone)]
pub struct AppState {
    pub streamer: Streamer,
    pub session_cookie_name: Arc<str>,
    pub video_token_name: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, authority: ClaimAuthority, config: &Config) -> Self {
        let binder = AuthorizationBinder::new(Arc::new(authority));

        Self {
            streamer: Streamer::new(store, binder, config.max_chunk_size()),
            session_cookie_name: config.session_cookie_name.as_str().into(),
            video_token_name: config.video_token_name.as_str().into(),
        }
    }

    /// Build the storage backend and credential keys described by `config`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let storage = StorageManager::new(storage_config(config)?)?;
        Ok(Self::new(Arc::new(storage), claim_authority(config), config))
    }
}

fn storage_config(config: &Config) -> anyhow::Result<StorageConfig> {
    let backend = match config.storage_backend.as_str() {
        "local" => {
            info!(workspace = %config.workspace, "Using local filesystem storage");
            StorageBackend::Local
        }
        "s3" => {
            info!("Using S3 storage backend");
            let s3_config = config
                .to_s3_config()
                .ok_or_else(|| anyhow!("S3 configuration is required when using S3 backend"))?;
            StorageBackend::S3 {
                bucket: s3_config.bucket,
                endpoint: s3_config.endpoint,
                region: s3_config.region,
                access_key_id: s3_config.access_key_id,
                secret_access_key: s3_config.secret_access_key,
            }
        }
        backend => {
            return Err(anyhow!(
                "Unsupported storage backend: {backend}. Use 'local' or 's3'"
            ));
        }
    };

    Ok(StorageConfig {
        backend,
        workspace: PathBuf::from(&config.workspace),
    })
}

fn claim_authority(config: &Config) -> ClaimAuthority {
    if config.session_keys.is_empty() {
        warn!("No session keys configured, using a random key; sessions will not survive a restart");
    }
    if config.resource_keys.is_empty() {
        warn!("No resource keys configured, using a random key; external issuers cannot mint video tokens");
    }

    ClaimAuthority::new(
        ClaimManager::from_keys(config.session_keys.clone()),
        ClaimManager::from_keys(config.resource_keys.clone()),
    )
}
