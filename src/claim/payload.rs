use crate::claim::error::ClaimError;
use anyhow::{Result, anyhow};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token kind byte stored in the header
pub const KIND_SESSION: u8 = 1;
pub const KIND_RESOURCE: u8 = 2;

/// A payload that can be sealed into a claim token
pub trait ClaimPayload: Sized {
    const KIND: u8;

    fn serialize_to_bytes(&self) -> Result<Vec<u8>>;

    fn deserialize_from_bytes(bytes: &[u8]) -> Result<Self, ClaimError>;

    /// `(nbf_unix, exp_unix)`
    fn validity(&self) -> (u32, u32);

    /// Reject the claim outside `[nbf_unix, exp_unix)`
    fn check_time(&self) -> Result<(), ClaimError> {
        let now = now_unix();
        let (nbf_unix, exp_unix) = self.validity();

        if now < nbf_unix {
            return Err(ClaimError::TokenNotYetValid);
        }
        if now >= exp_unix {
            return Err(ClaimError::TokenExpired);
        }
        Ok(())
    }
}

pub(crate) fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}

/// Persistent session identity of a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Expiration time in Unix timestamp
    pub exp_unix: u32,
    /// Not-before time in Unix timestamp
    pub nbf_unix: u32,
    pub user_id: String,
}

/// Short-lived grant binding one caller to one object path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceClaims {
    pub exp_unix: u32,
    pub nbf_unix: u32,
    pub user_id: String,
    /// Object key this grant is valid for
    pub path: String,
}

impl ClaimPayload for SessionClaims {
    const KIND: u8 = KIND_SESSION;

    fn serialize_to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        write_validity(&mut bytes, self.exp_unix, self.nbf_unix);
        write_short_str(&mut bytes, &self.user_id, "user_id")?;
        Ok(bytes)
    }

    fn deserialize_from_bytes(bytes: &[u8]) -> Result<Self, ClaimError> {
        let mut reader = PayloadReader::new(bytes);
        let exp_unix = reader.u32("exp_unix")?;
        let nbf_unix = reader.u32("nbf_unix")?;
        let user_id = reader.short_str("user_id")?;
        reader.finish()?;

        Ok(SessionClaims {
            exp_unix,
            nbf_unix,
            user_id,
        })
    }

    fn validity(&self) -> (u32, u32) {
        (self.nbf_unix, self.exp_unix)
    }
}

impl ClaimPayload for ResourceClaims {
    const KIND: u8 = KIND_RESOURCE;

    fn serialize_to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        write_validity(&mut bytes, self.exp_unix, self.nbf_unix);
        write_short_str(&mut bytes, &self.user_id, "user_id")?;

        // path_len (2 bytes)
        let path_bytes = self.path.as_bytes();
        let path_len =
            u16::try_from(path_bytes.len()).map_err(|_| anyhow!("path too long"))?;
        bytes.extend_from_slice(&path_len.to_le_bytes());
        bytes.extend_from_slice(path_bytes);

        Ok(bytes)
    }

    fn deserialize_from_bytes(bytes: &[u8]) -> Result<Self, ClaimError> {
        let mut reader = PayloadReader::new(bytes);
        let exp_unix = reader.u32("exp_unix")?;
        let nbf_unix = reader.u32("nbf_unix")?;
        let user_id = reader.short_str("user_id")?;
        let path_len = reader.u16("path_len")? as usize;
        let path = reader.str(path_len, "path")?;
        reader.finish()?;

        Ok(ResourceClaims {
            exp_unix,
            nbf_unix,
            user_id,
            path,
        })
    }

    fn validity(&self) -> (u32, u32) {
        (self.nbf_unix, self.exp_unix)
    }
}

fn write_validity(bytes: &mut Vec<u8>, exp_unix: u32, nbf_unix: u32) {
    // exp_unix (4 bytes)
    bytes.extend_from_slice(&exp_unix.to_le_bytes());
    // nbf_unix (4 bytes)
    bytes.extend_from_slice(&nbf_unix.to_le_bytes());
}

/// u8 length prefix followed by UTF-8 bytes
fn write_short_str(bytes: &mut Vec<u8>, value: &str, field: &str) -> Result<()> {
    let raw = value.as_bytes();
    if raw.len() > u8::MAX as usize {
        return Err(anyhow!("{field} too long"));
    }
    bytes.push(raw.len() as u8);
    bytes.extend_from_slice(raw);
    Ok(())
}

/// Bounds-checked little-endian cursor over a decrypted payload
struct PayloadReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8], ClaimError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| ClaimError::InvalidPayload(format!("Failed to read {field}")))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u32(&mut self, field: &str) -> Result<u32, ClaimError> {
        let raw = self.take(4, field)?;
        let arr: [u8; 4] = raw
            .try_into()
            .map_err(|_| ClaimError::InvalidPayload(format!("Failed to read {field}")))?;
        Ok(u32::from_le_bytes(arr))
    }

    fn u16(&mut self, field: &str) -> Result<u16, ClaimError> {
        let raw = self.take(2, field)?;
        let arr: [u8; 2] = raw
            .try_into()
            .map_err(|_| ClaimError::InvalidPayload(format!("Failed to read {field}")))?;
        Ok(u16::from_le_bytes(arr))
    }

    fn str(&mut self, len: usize, field: &str) -> Result<String, ClaimError> {
        let raw = self.take(len, field)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| ClaimError::InvalidPayload(format!("Invalid UTF-8 in {field}")))
    }

    fn short_str(&mut self, field: &str) -> Result<String, ClaimError> {
        let len = self.take(1, field)?[0] as usize;
        self.str(len, field)
    }

    fn finish(self) -> Result<(), ClaimError> {
        if self.offset != self.bytes.len() {
            return Err(ClaimError::InvalidPayload(
                "Trailing bytes after payload".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_claims_binary_layout() {
        let claims = ResourceClaims {
            exp_unix: 0x12345678,
            nbf_unix: 0x87654321,
            user_id: "abc".to_string(),
            path: "v.mp4".to_string(),
        };

        let bytes = claims.serialize_to_bytes().unwrap();

        assert_eq!(&bytes[0..4], &0x12345678u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0x87654321u32.to_le_bytes());
        assert_eq!(bytes[8], 3); // user_id length
        assert_eq!(&bytes[9..12], b"abc");
        assert_eq!(&bytes[12..14], &5u16.to_le_bytes());
        assert_eq!(&bytes[14..19], b"v.mp4");
        assert_eq!(bytes.len(), 19);

        assert_eq!(ResourceClaims::deserialize_from_bytes(&bytes).unwrap(), claims);
    }

    #[test]
    fn test_truncated_and_trailing_payloads() {
        let claims = SessionClaims {
            exp_unix: 2000000000,
            nbf_unix: 1700000000,
            user_id: "user@domain".to_string(),
        };
        let bytes = claims.serialize_to_bytes().unwrap();

        assert!(matches!(
            SessionClaims::deserialize_from_bytes(&bytes[..bytes.len() - 1]),
            Err(ClaimError::InvalidPayload(_))
        ));

        let mut padded = bytes.clone();
        padded.push(0);
        assert!(matches!(
            SessionClaims::deserialize_from_bytes(&padded),
            Err(ClaimError::InvalidPayload(_))
        ));

        assert!(SessionClaims::deserialize_from_bytes(&[]).is_err());
    }

    #[test]
    fn test_oversized_fields_are_refused() {
        let claims = SessionClaims {
            exp_unix: 2000000000,
            nbf_unix: 1700000000,
            user_id: "u".repeat(256),
        };
        assert!(claims.serialize_to_bytes().is_err());

        let claims = ResourceClaims {
            exp_unix: 2000000000,
            nbf_unix: 1700000000,
            user_id: "u".to_string(),
            path: "p".repeat(u16::MAX as usize + 1),
        };
        assert!(claims.serialize_to_bytes().is_err());
    }

    #[test]
    fn test_check_time() {
        let now = now_unix();
        let valid = SessionClaims {
            exp_unix: now + 3600,
            nbf_unix: now - 60,
            user_id: "u".to_string(),
        };
        assert_eq!(valid.check_time(), Ok(()));

        let expired = SessionClaims {
            exp_unix: now - 1,
            nbf_unix: now - 3600,
            ..valid.clone()
        };
        assert_eq!(expired.check_time(), Err(ClaimError::TokenExpired));

        let early = SessionClaims {
            exp_unix: now + 7200,
            nbf_unix: now + 3600,
            ..valid
        };
        assert_eq!(early.check_time(), Err(ClaimError::TokenNotYetValid));
    }
}
