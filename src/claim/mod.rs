pub mod binder;
pub mod error;
pub mod manager;
pub mod payload;

// Internal modules
mod header;

// Re-export public types and functions
pub use binder::{AuthorizationBinder, Caller, Credentials};
pub use error::ClaimError;
pub use manager::{ClaimAuthority, ClaimManager, CredentialVerifier};
pub use payload::{ClaimPayload, ResourceClaims, SessionClaims};
