use crate::claim::error::ClaimError;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) const MAGIC: &[u8; 4] = b"BSC1";
pub(crate) const VERSION: u8 = 1;
pub(crate) const ALG_AES_256_GCM: u8 = 1;

/// magic(4) | version(1) | kid(1) | alg(1) | kind(1) | nonce(12) | create_at(16)
pub(crate) const HEADER_SIZE: usize = 36;
pub(crate) const TAG_SIZE: usize = 16;

const NONCE_RANGE: std::ops::Range<usize> = 8..20;
const CREATE_AT_RANGE: std::ops::Range<usize> = 20..36;

/// Plaintext token header, authenticated as AAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClaimHeader {
    pub kid: u8,
    pub alg: u8,
    /// Which payload type is sealed behind this header
    pub kind: u8,
    pub nonce: [u8; 12],
    /// Nanoseconds since UNIX_EPOCH
    pub create_at: u128,
}

impl ClaimHeader {
    /// Fresh header with a random nonce
    pub fn new(kid: u8, alg: u8, kind: u8) -> Self {
        use rand::RngCore;
        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);

        let create_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        Self {
            kid,
            alg,
            kind,
            nonce,
            create_at,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..4].copy_from_slice(MAGIC);
        out[4] = VERSION;
        out[5] = self.kid;
        out[6] = self.alg;
        out[7] = self.kind;
        out[NONCE_RANGE].copy_from_slice(&self.nonce);
        out[CREATE_AT_RANGE].copy_from_slice(&self.create_at.to_le_bytes());
        out
    }

    /// Decode the leading `HEADER_SIZE` bytes of a token
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClaimError> {
        let raw: &[u8; HEADER_SIZE] = bytes
            .first_chunk()
            .ok_or_else(|| ClaimError::InvalidHeader("Invalid header size".to_string()))?;

        if &raw[..4] != MAGIC {
            return Err(ClaimError::InvalidHeader("Invalid magic bytes".to_string()));
        }
        if raw[4] != VERSION {
            return Err(ClaimError::InvalidHeader(format!(
                "Unsupported version: {}",
                raw[4]
            )));
        }

        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(&raw[NONCE_RANGE]);
        let mut create_at = [0u8; 16];
        create_at.copy_from_slice(&raw[CREATE_AT_RANGE]);

        Ok(Self {
            kid: raw[5],
            alg: raw[6],
            kind: raw[7],
            nonce,
            create_at: u128::from_le_bytes(create_at),
        })
    }
}
