//! Authentication backend for axum-login.
//!
//! Multi-user: credentials verify against the users table through the
//! Ledger, and sessions re-load the user row on every request, so
//! balances seen by handlers are never stale.

use axum_login::{AuthUser, AuthnBackend, UserId};

use crate::domain::error::PapertradeError;
use crate::domain::ledger::Ledger;
use crate::domain::user::User;

/// A logged-in account. The session auth hash is the stored password
/// hash, so changing the password invalidates existing sessions.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub User);

impl AuthUser for AuthedUser {
    type Id = i64;

    fn id(&self) -> i64 {
        self.0.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.0.password_hash.as_bytes()
    }
}

/// Login credentials submitted via the login form.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Backend {
    ledger: Ledger,
}

impl Backend {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }
}

impl AuthnBackend for Backend {
    type User = AuthedUser;
    type Credentials = Credentials;
    type Error = PapertradeError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        match self.ledger.authenticate(&creds.username, &creds.password) {
            Ok(user) => Ok(Some(AuthedUser(user))),
            Err(PapertradeError::Auth { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        Ok(self.ledger.user_by_id(*user_id)?.map(AuthedUser))
    }
}

pub type AuthSession = axum_login::AuthSession<Backend>;
