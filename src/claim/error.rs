use thiserror::Error;

/// Reasons a claim token cannot be accepted
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ClaimError {
    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is not yet valid")]
    TokenNotYetValid,

    #[error("AEAD decryption failed")]
    AeadFail,

    #[error("Key not found: {0}")]
    KeyNotFound(u8),

    #[error("Token kind mismatch: expected {expected}, got {found}")]
    KindMismatch { expected: u8, found: u8 },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}
