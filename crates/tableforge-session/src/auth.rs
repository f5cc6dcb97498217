//! Admission: resolving a bearer credential into an identity.
//!
//! This crate doesn't implement identity verification itself — that's the
//! edge's job (Clerk, a custom JWT issuer, whatever sits in front of this
//! server). Instead it defines the [`Authenticator`] trait: a single async
//! method that takes a bearer credential and returns a resolved [`Identity`]
//! or an error. The server calls this during admission; everything else
//! (rate limiting, session bookkeeping) is identical regardless of which
//! identity provider issued the credential.

use tableforge_protocol::{SessionId, UserId};

use crate::SessionError;

/// The identity resolved from a bearer credential during admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub org_id: Option<String>,
}

/// Validates a bearer credential and returns the caller's identity.
///
/// # Example
///
/// ```rust
/// use tableforge_session::{Authenticator, Identity, SessionError};
/// use tableforge_protocol::{SessionId, UserId};
///
/// /// Accepts any non-empty credential and uses it as the user id.
/// /// Only for development — never use this in production.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, credential: &str) -> Result<Identity, SessionError> {
///         if credential.is_empty() {
///             return Err(SessionError::AuthFailed("empty credential".into()));
///         }
///         Ok(Identity {
///             user_id: UserId::new(credential),
///             session_id: SessionId::new(format!("sess-{credential}")),
///             org_id: None,
///         })
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Resolves the given bearer credential.
    ///
    /// # Errors
    /// `SessionError::AuthFailed` if the credential is invalid, expired, or
    /// rejected.
    fn authenticate(
        &self,
        credential: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}
