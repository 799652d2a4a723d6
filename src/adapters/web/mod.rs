//! Web server adapter.
//!
//! Axum router with server-rendered askama pages, signed-cookie
//! sessions stored in SQLite, and axum-login authentication backed by
//! the users table.

mod auth;
mod error;
mod handlers;
mod templates;

pub use auth::{AuthSession, AuthedUser, Backend, Credentials};
pub use error::WebError;
pub use handlers::*;
pub use templates::*;

use axum::{
    routing::{get, post},
    Router,
};
use axum_login::{login_required, AuthManagerLayerBuilder};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_sessions::{cookie::Key, Expiry, SessionManagerLayer};
use tower_sessions_rusqlite_store::RusqliteStore;

use crate::domain::error::PapertradeError;
use crate::domain::ledger::Ledger;
use crate::ports::config_port::ConfigPort;

pub struct AppState {
    pub ledger: Ledger,
    pub config: Arc<dyn ConfigPort + Send + Sync>,
}

pub async fn build_router(state: AppState) -> Result<Router, PapertradeError> {
    let session_store = open_session_store(&*state.config).await?;
    let key = signing_key(&*state.config)?;
    let lifetime = state.config.get_int("auth", "session_lifetime", 86_400);

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(lifetime)))
        .with_signed(key);

    let backend = Backend::new(state.ledger.clone());
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let router = Router::new()
        .route("/", get(handlers::index))
        .route("/quote", get(handlers::quote_form).post(handlers::quote))
        .route("/buy", get(handlers::buy_form).post(handlers::buy))
        .route("/sell", get(handlers::sell_form).post(handlers::sell))
        .route("/history", get(handlers::history))
        .route("/cash", get(handlers::cash_form))
        .route("/cash/deposit", post(handlers::deposit))
        .route("/cash/withdraw", post(handlers::withdraw))
        .route("/settings", get(handlers::settings_form))
        .route("/settings/username", post(handlers::change_username))
        .route("/settings/password", post(handlers::change_password))
        .route_layer(login_required!(Backend, login_url = "/login"))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route(
            "/register",
            get(handlers::register_form).post(handlers::register),
        )
        .nest_service("/static", ServeDir::new("static"))
        .fallback(handlers::not_found)
        .layer(auth_layer)
        .with_state(Arc::new(state));

    Ok(router)
}

async fn open_session_store(config: &dyn ConfigPort) -> Result<RusqliteStore, PapertradeError> {
    let db_path = config
        .get_string("database", "path")
        .unwrap_or_else(|| ":memory:".to_string());

    let conn = tokio_rusqlite::Connection::open(&db_path)
        .await
        .map_err(|e| PapertradeError::storage(format!("session store open failed: {e}")))?;
    let session_store = RusqliteStore::new(conn);
    session_store
        .migrate()
        .await
        .map_err(|e| PapertradeError::storage(format!("session store migrate failed: {e}")))?;
    Ok(session_store)
}

/// Cookie signing key from the hex `session_secret` config value, which
/// must decode to at least 64 bytes.
fn signing_key(config: &dyn ConfigPort) -> Result<Key, PapertradeError> {
    let secret_hex = config.get_string("auth", "session_secret").ok_or_else(|| {
        PapertradeError::ConfigMissing {
            section: "auth".into(),
            key: "session_secret".into(),
        }
    })?;
    let secret = hex::decode(secret_hex.trim()).map_err(|_| PapertradeError::ConfigInvalid {
        section: "auth".into(),
        key: "session_secret".into(),
        reason: "must be a hex string".into(),
    })?;
    Key::try_from(secret.as_slice()).map_err(|_| PapertradeError::ConfigInvalid {
        section: "auth".into(),
        key: "session_secret".into(),
        reason: "must decode to at least 64 bytes".into(),
    })
}
