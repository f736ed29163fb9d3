use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{Caller, Role, User, UserId};
use super::error::MarketplaceError;
use super::repository::{MarketplaceRepository, NewUser};

/// Mutex-guarded bearer-token registry. Tokens are opaque uuids; revocation
/// is immediate. Credential verification proper belongs to the external
/// identity provider; this stand-in identifies accounts by email only.
#[derive(Default)]
pub struct TokenRegistry {
    tokens: Mutex<HashMap<String, UserId>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, user: UserId) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens
            .lock()
            .expect("token mutex poisoned")
            .insert(token.clone(), user);
        token
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .expect("token mutex poisoned")
            .remove(token)
            .is_some()
    }

    pub fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens
            .lock()
            .expect("token mutex poisoned")
            .get(token)
            .copied()
    }
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub company_name: Option<String>,
}

/// Login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

/// A freshly authenticated session: the account plus its bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Token-issuing identity service over the user table.
pub struct IdentityService<R> {
    repository: Arc<R>,
    tokens: Arc<TokenRegistry>,
}

impl<R> IdentityService<R>
where
    R: MarketplaceRepository,
{
    pub fn new(repository: Arc<R>, tokens: Arc<TokenRegistry>) -> Self {
        Self { repository, tokens }
    }

    pub fn register(&self, request: RegisterRequest) -> Result<Session, MarketplaceError> {
        if request.name.trim().is_empty() {
            return Err(MarketplaceError::Validation("name is required".to_string()));
        }
        if request.email.trim().is_empty() {
            return Err(MarketplaceError::Validation("email is required".to_string()));
        }
        let role = Role::parse(&request.role).ok_or_else(|| {
            MarketplaceError::Validation("role must be 'company' or 'freelancer'".to_string())
        })?;

        let user = self
            .repository
            .insert_user(NewUser {
                name: request.name,
                email: request.email,
                role,
                company_name: request.company_name.filter(|_| role == Role::Company),
            })
            .map_err(|err| match err {
                super::repository::RepositoryError::Conflict => {
                    MarketplaceError::Conflict("email is already registered".to_string())
                }
                other => other.into(),
            })?;

        let token = self.tokens.issue(user.id);
        Ok(Session { user, token })
    }

    pub fn login(&self, request: LoginRequest) -> Result<Session, MarketplaceError> {
        let user = self
            .repository
            .user_by_email(&request.email)?
            .ok_or_else(|| MarketplaceError::NotFound("no account for this email".to_string()))?;
        let token = self.tokens.issue(user.id);
        Ok(Session { user, token })
    }

    pub fn logout(&self, token: &str) -> Result<(), MarketplaceError> {
        if self.tokens.revoke(token) {
            Ok(())
        } else {
            Err(MarketplaceError::Unauthenticated)
        }
    }

    /// Resolves a presented bearer token to a caller identity.
    pub fn authenticate(&self, token: &str) -> Result<Caller, MarketplaceError> {
        let user_id = self
            .tokens
            .resolve(token)
            .ok_or(MarketplaceError::Unauthenticated)?;
        let user = self
            .repository
            .user(user_id)?
            .ok_or(MarketplaceError::Unauthenticated)?;
        Ok(Caller {
            id: user.id,
            role: user.role,
        })
    }
}
