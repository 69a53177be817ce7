use crate::claim::error::ClaimError;
use crate::claim::header::{ALG_AES_256_GCM, ClaimHeader, HEADER_SIZE, TAG_SIZE};
use crate::claim::payload::{ClaimPayload, ResourceClaims, SessionClaims, now_unix};
use aes_gcm::Aes256Gcm;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Key, Nonce};
use anyhow::{Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct ClaimManagerInner {
    keys: HashMap<u8, [u8; 32]>,
    current_kid: u8,
}

impl ClaimManagerInner {
    fn new() -> Self {
        let mut keys = HashMap::new();

        // Generate initial key for kid=1
        let mut key = [0u8; 32];
        use rand::RngCore;
        rand::thread_rng().fill_bytes(&mut key);
        keys.insert(1, key);

        Self {
            keys,
            current_kid: 1,
        }
    }

    fn from_keys(keys: Vec<(u8, [u8; 32])>) -> Self {
        let keys = keys.into_iter().collect::<HashMap<_, _>>();
        // Newest key signs
        let Some(current_kid) = keys.keys().max().copied() else {
            return Self::new();
        };

        Self { keys, current_kid }
    }

    fn sign<P: ClaimPayload>(&self, payload: &P) -> Result<String> {
        let key = self
            .keys
            .get(&self.current_kid)
            .ok_or_else(|| anyhow!("Key ID {} not found", self.current_kid))?;

        let header = ClaimHeader::new(self.current_kid, ALG_AES_256_GCM, P::KIND);
        let header_bytes = header.to_bytes();
        let payload_bytes = payload.serialize_to_bytes()?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        let nonce = Nonce::from_slice(&header.nonce);

        // Use header as AAD (Additional Authenticated Data)
        let ciphertext = cipher
            .encrypt(
                nonce,
                aes_gcm::aead::Payload {
                    msg: &payload_bytes,
                    aad: &header_bytes,
                },
            )
            .map_err(|error| anyhow!("Encryption failed: {error}"))?;

        // Combine: header || ciphertext (includes tag)
        let mut token_bytes = header_bytes.to_vec();
        token_bytes.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(token_bytes))
    }

    fn open<P: ClaimPayload>(&self, token: &str) -> Result<P, ClaimError> {
        let token_bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ClaimError::InvalidToken)?;

        if token_bytes.len() < HEADER_SIZE + TAG_SIZE {
            return Err(ClaimError::InvalidToken);
        }

        let header = ClaimHeader::from_bytes(&token_bytes[..HEADER_SIZE])?;
        if header.kind != P::KIND {
            return Err(ClaimError::KindMismatch {
                expected: P::KIND,
                found: header.kind,
            });
        }
        if header.alg != ALG_AES_256_GCM {
            return Err(ClaimError::InvalidHeader(format!(
                "Unsupported algorithm: {}",
                header.alg
            )));
        }

        let key = self
            .keys
            .get(&header.kid)
            .ok_or(ClaimError::KeyNotFound(header.kid))?;

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        let nonce = Nonce::from_slice(&header.nonce);

        // The received header bytes are the AAD, so any tampering fails here
        let payload_bytes = cipher
            .decrypt(
                nonce,
                aes_gcm::aead::Payload {
                    msg: &token_bytes[HEADER_SIZE..],
                    aad: &token_bytes[..HEADER_SIZE],
                },
            )
            .map_err(|_| ClaimError::AeadFail)?;

        P::deserialize_from_bytes(&payload_bytes)
    }
}

/// Keyed sealer/opener for one family of claim tokens.
///
/// Tokens are `base64url(header || AES-256-GCM(payload))`. Keys are indexed by
/// a one-byte key id carried in the header so keys can rotate without
/// invalidating tokens that are still in flight.
#[derive(Clone, Debug)]
pub struct ClaimManager {
    inner: Arc<RwLock<ClaimManagerInner>>,
}

impl ClaimManager {
    /// Create a new ClaimManager with a randomly generated key
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ClaimManagerInner::new())),
        }
    }

    /// Use configured keys; falls back to a random key when none are given
    pub fn from_keys(keys: Vec<(u8, [u8; 32])>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ClaimManagerInner::from_keys(keys))),
        }
    }

    pub fn with_key(kid: u8, key: [u8; 32]) -> Self {
        Self::from_keys(vec![(kid, key)])
    }

    pub fn sign<P: ClaimPayload>(&self, payload: &P) -> Result<String> {
        self.inner.read().sign(payload)
    }

    /// Decrypt, decode and time-check a token
    pub fn verify<P: ClaimPayload>(&self, token: &str) -> Result<P, ClaimError> {
        let payload = self.inner.read().open::<P>(token)?;
        payload.check_time()?;
        Ok(payload)
    }
}

impl Default for ClaimManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Credential verification capability consumed by the authorization binder
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Returns the caller's user id
    fn verify_session(&self, token: &str) -> Result<String, ClaimError>;

    fn verify_resource_token(&self, token: &str) -> Result<ResourceClaims, ClaimError>;
}

/// Session and resource token managers, keyed independently
#[derive(Clone, Debug, Default)]
pub struct ClaimAuthority {
    pub session: ClaimManager,
    pub resource: ClaimManager,
}

impl ClaimAuthority {
    pub fn new(session: ClaimManager, resource: ClaimManager) -> Self {
        Self { session, resource }
    }

    /// Issue a session token valid from now for `ttl`
    pub fn issue_session(&self, user_id: &str, ttl: Duration) -> Result<String> {
        let now = now_unix();
        self.session.sign(&SessionClaims {
            exp_unix: now.saturating_add(ttl_secs(ttl)),
            nbf_unix: now,
            user_id: user_id.to_string(),
        })
    }

    /// Issue a resource token binding `user_id` to `path` for `ttl`
    pub fn issue_resource(&self, user_id: &str, path: &str, ttl: Duration) -> Result<String> {
        let now = now_unix();
        let token = self.resource.sign(&ResourceClaims {
            exp_unix: now.saturating_add(ttl_secs(ttl)),
            nbf_unix: now,
            user_id: user_id.to_string(),
            path: path.to_string(),
        })?;
        debug!(user_id, path, ttl_secs = ttl.as_secs(), "Resource token issued");
        Ok(token)
    }
}

fn ttl_secs(ttl: Duration) -> u32 {
    u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX)
}

impl CredentialVerifier for ClaimAuthority {
    fn verify_session(&self, token: &str) -> Result<String, ClaimError> {
        self.session
            .verify::<SessionClaims>(token)
            .map(|claims| claims.user_id)
    }

    fn verify_resource_token(&self, token: &str) -> Result<ResourceClaims, ClaimError> {
        self.resource.verify::<ResourceClaims>(token)
    }
}
