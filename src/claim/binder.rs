use crate::claim::manager::CredentialVerifier;
use crate::error::{StreamError, StreamResult};
use crate::resource::ResourcePath;
use std::sync::Arc;
use tracing::debug;

/// Raw credentials lifted off one request
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    /// Session token from the cookie or the bearer header
    pub session: Option<&'a str>,
    /// Resource-scoped token from the query string
    pub resource: Option<&'a str>,
}

/// Authenticated caller of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
}

/// Validates credentials against a requested path. Never issues tokens.
#[derive(Clone)]
pub struct AuthorizationBinder {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthorizationBinder {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    pub fn authorize(
        &self,
        path: &ResourcePath,
        credentials: Credentials<'_>,
    ) -> StreamResult<Caller> {
        let token = credentials.session.ok_or(StreamError::Unauthorized)?;
        let user_id = self.verifier.verify_session(token).map_err(|error| {
            debug!(%error, "Session credential rejected");
            StreamError::Unauthorized
        })?;

        if path.kind().requires_resource_token() {
            self.bind_resource(&user_id, path, credentials.resource)?;
        }

        Ok(Caller { user_id })
    }

    fn bind_resource(
        &self,
        user_id: &str,
        path: &ResourcePath,
        token: Option<&str>,
    ) -> StreamResult<()> {
        let token = token.ok_or(StreamError::UnauthorizedResource)?;

        // Malformed or expired tokens surface as credential errors (403)
        let claims = self.verifier.verify_resource_token(token)?;

        if claims.user_id != user_id || claims.path != path.as_str() {
            debug!(
                user_id,
                path = %path,
                token_user = %claims.user_id,
                token_path = %claims.path,
                "Resource token bound to another caller or path"
            );
            return Err(StreamError::UnauthorizedResource);
        }

        Ok(())
    }
}
