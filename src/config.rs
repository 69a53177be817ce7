use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::ArgAction::Append;
use clap::Parser;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

const MIB: u64 = 1024 * 1024;

/// Gateway configuration, loaded from CLI args and an optional TOML file
///
/// Example configuration file content
/// # Media Streamer Configuration
///
/// listen_on_port = 3000
/// workspace = "./media"
/// max_chunk_size_mb = 1
///
/// # Storage configuration
/// storage_backend = "s3"  # Options: "local" or "s3"
///
/// # S3 configuration (required when storage_backend = "s3")
/// s3_bucket = "my-media-bucket"
/// s3_endpoint = "http://localhost:9000"  # Optional: for MinIO or custom S3
/// s3_region = "us-east-1"                # Optional
/// s3_access_key_id = "minioadmin"
/// s3_secret_access_key = "minioadmin"
///
/// # Credential names
/// session_cookie_name = "bs-token"
/// video_token_name = "video-token"
///
/// allowed_origins = ["https://app.example.com"]
///
/// [session_keys]
/// 1 = "<base64 32-byte key>"
///
/// [resource_keys]
/// 1 = "<base64 32-byte key>"
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[serde(default)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000)]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Root directory of the local storage backend
    #[arg(short = 'w', long, default_value = ".")]
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Configuration file path
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Storage backend: local or s3
    #[arg(short, long, default_value = "local")]
    #[serde(default = "default_storage_backend")]
    pub storage_backend: String,

    /// S3 bucket name (required when storage-backend is s3)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,

    /// S3 endpoint (for MinIO/custom S3)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_endpoint: Option<String>,

    /// S3 region
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_region: Option<String>,

    /// S3 access key ID
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_access_key_id: Option<String>,

    /// S3 secret access key
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_secret_access_key: Option<String>,

    /// Largest byte range served by one ranged response, in MiB
    #[arg(short, long, default_value_t = 1)]
    #[serde(default = "default_max_chunk_size_mb")]
    pub max_chunk_size_mb: u64,

    /// Cookie carrying the session token
    #[arg(long, default_value = "bs-token")]
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Query parameter carrying the video resource token
    #[arg(long, default_value = "video-token")]
    #[serde(default = "default_video_token_name")]
    pub video_token_name: String,

    /// Session token keys (kid -> base64 encoded 32-byte key).
    /// Can be specified multiple times as --session-key 1:base64key.
    /// You can generate a key with: openssl rand -base64 32
    #[arg(long = "session-key", value_parser = parse_claim_key, action = Append)]
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "de_claim_keys")]
    pub session_keys: Vec<(u8, [u8; 32])>,

    /// Resource token keys, same format as --session-key
    #[arg(long = "resource-key", value_parser = parse_claim_key, action = Append)]
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "de_claim_keys")]
    pub resource_keys: Vec<(u8, [u8; 32])>,

    /// CORS origins; any origin when empty
    #[arg(long = "allowed-origin", action = Append)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_origins: Vec<String>,
}

/// Parse a key from command line format "kid:base64_key"
fn parse_claim_key(s: &str) -> Result<(u8, [u8; 32]), String> {
    let Some((kid, encoded)) = s.split_once(':') else {
        return Err("Invalid format. Use kid:base64_key".to_string());
    };

    let kid = kid
        .parse::<u8>()
        .map_err(|_| format!("Invalid kid '{kid}'. Must be a number between 0-255"))?;

    let key_bytes = STANDARD
        .decode(encoded)
        .map_err(|error| format!("Failed to decode base64 key for {kid}: {error}"))?;

    key_bytes.try_into().map(|key| (kid, key)).map_err(|bytes: Vec<u8>| {
        format!(
            "Invalid key length for kid {kid}: expected 32 bytes, got {}",
            bytes.len()
        )
    })
}

fn de_claim_keys<'de, D>(de: D) -> Result<Vec<(u8, [u8; 32])>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut out: Vec<(u8, [u8; 32])> = Vec::new();

    let repr = Option::<HashMap<String, String>>::deserialize(de)?;
    let Some(repr) = repr else {
        return Ok(out);
    };

    for (kstr, v) in repr {
        let kid: u8 = kstr.parse().map_err(serde::de::Error::custom)?;
        let bytes = STANDARD.decode(v).map_err(serde::de::Error::custom)?;
        let key: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            serde::de::Error::custom(format!("key[{kid}] length {}, expect 32", bytes.len()))
        })?;
        out.push((kid, key));
    }

    out.sort_unstable_by_key(|(k, _)| *k);
    out.dedup_by_key(|(k, _)| *k);

    Ok(out)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_on_port: default_port(),
            workspace: default_workspace(),
            config: None,
            storage_backend: default_storage_backend(),
            s3_bucket: None,
            s3_endpoint: None,
            s3_region: None,
            s3_access_key_id: None,
            s3_secret_access_key: None,
            max_chunk_size_mb: default_max_chunk_size_mb(),
            session_cookie_name: default_session_cookie_name(),
            video_token_name: default_video_token_name(),
            session_keys: Vec::new(),
            resource_keys: Vec::new(),
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Config::parse();

        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence unless left at default
    fn merge_with_file(mut self, file_config: Config) -> Self {
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.workspace == default_workspace() {
            self.workspace = file_config.workspace;
        }
        if self.storage_backend == default_storage_backend() {
            self.storage_backend = file_config.storage_backend;
        }
        if self.max_chunk_size_mb == default_max_chunk_size_mb() {
            self.max_chunk_size_mb = file_config.max_chunk_size_mb;
        }
        if self.session_cookie_name == default_session_cookie_name() {
            self.session_cookie_name = file_config.session_cookie_name;
        }
        if self.video_token_name == default_video_token_name() {
            self.video_token_name = file_config.video_token_name;
        }

        if self.s3_bucket.is_none() {
            self.s3_bucket = file_config.s3_bucket;
        }
        if self.s3_endpoint.is_none() {
            self.s3_endpoint = file_config.s3_endpoint;
        }
        if self.s3_region.is_none() {
            self.s3_region = file_config.s3_region;
        }
        if self.s3_access_key_id.is_none() {
            self.s3_access_key_id = file_config.s3_access_key_id;
        }
        if self.s3_secret_access_key.is_none() {
            self.s3_secret_access_key = file_config.s3_secret_access_key;
        }
        if self.session_keys.is_empty() {
            self.session_keys = file_config.session_keys;
        }
        if self.resource_keys.is_empty() {
            self.resource_keys = file_config.resource_keys;
        }
        if self.allowed_origins.is_empty() {
            self.allowed_origins = file_config.allowed_origins;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.storage_backend.as_str() {
            "local" => {}
            "s3" => {
                let missing = |value: &Option<String>| value.as_deref().is_none_or(str::is_empty);
                if missing(&self.s3_bucket) {
                    anyhow::bail!("S3 bucket name is required when backend is 's3'");
                }
                if missing(&self.s3_access_key_id) {
                    anyhow::bail!("S3 access key ID is required when backend is 's3'");
                }
                if missing(&self.s3_secret_access_key) {
                    anyhow::bail!("S3 secret access key is required when backend is 's3'");
                }
            }
            backend => {
                anyhow::bail!("Unsupported storage backend: {backend}. Use 'local' or 's3'");
            }
        }

        if self.max_chunk_size_mb == 0 {
            anyhow::bail!("max_chunk_size_mb must be greater than 0");
        }
        if self.max_chunk_size_mb.checked_mul(MIB).is_none() {
            anyhow::bail!("max_chunk_size_mb is too large");
        }
        if self.session_cookie_name.is_empty() {
            anyhow::bail!("session_cookie_name cannot be empty");
        }
        if self.video_token_name.is_empty() {
            anyhow::bail!("video_token_name cannot be empty");
        }

        Ok(())
    }

    /// Chunk ceiling in bytes
    pub fn max_chunk_size(&self) -> u64 {
        self.max_chunk_size_mb.saturating_mul(MIB)
    }

    /// Convert to S3 storage backend configuration
    pub fn to_s3_config(&self) -> Option<S3Config> {
        if self.storage_backend != "s3" {
            return None;
        }

        Some(S3Config {
            bucket: self.s3_bucket.clone()?,
            endpoint: self.s3_endpoint.clone(),
            region: self.s3_region.clone(),
            access_key_id: self.s3_access_key_id.clone()?,
            secret_access_key: self.s3_secret_access_key.clone()?,
        })
    }
}

// S3 configuration subset
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_workspace() -> String {
    ".".to_string()
}

fn default_storage_backend() -> String {
    "local".to_string()
}

fn default_max_chunk_size_mb() -> u64 {
    1
}

fn default_session_cookie_name() -> String {
    "bs-token".to_string()
}

fn default_video_token_name() -> String {
    "video-token".to_string()
}
