//! HTTP request handlers for the web adapter.

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use std::sync::Arc;

use crate::domain::money::Cents;
use crate::domain::user::User;

use super::auth::{AuthSession, AuthedUser, Credentials};
use super::templates::{
    BuyTemplate, CashTemplate, HistoryRow, HistoryTemplate, HoldingRow, IndexTemplate,
    LoginTemplate, QuoteTemplate, QuotedTemplate, RegisterTemplate, SellTemplate,
    SettingsTemplate, TradeTemplate,
};
use super::{AppState, WebError};

const TIME_DISPLAY: &str = "%Y-%m-%d %H:%M:%S UTC";

fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => WebError::internal(format!("template error: {e}")).into_response(),
    }
}

/// The `login_required` layer guards every route that calls this; the
/// error branch only fires if a session outlives its user row.
fn require_user(auth_session: &AuthSession) -> Result<User, WebError> {
    auth_session
        .user
        .as_ref()
        .map(|u| u.0.clone())
        .ok_or_else(|| WebError::new(StatusCode::UNAUTHORIZED, "not logged in"))
}

fn parse_shares(input: &str) -> Result<u32, WebError> {
    let shares: u32 = input
        .trim()
        .parse()
        .map_err(|_| WebError::new(StatusCode::BAD_REQUEST, "shares must be a positive integer"))?;
    if shares == 0 {
        return Err(WebError::new(
            StatusCode::BAD_REQUEST,
            "shares must be a positive integer",
        ));
    }
    Ok(shares)
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    auth_session: AuthSession,
) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    let snapshot = state.ledger.portfolio_snapshot(user.id)?;

    let rows = snapshot
        .holdings
        .into_iter()
        .map(|h| HoldingRow {
            symbol: h.symbol,
            name: h.name,
            shares: h.shares,
            price: h.price,
            value: h.value,
        })
        .collect();

    let template = IndexTemplate {
        logged_in: true,
        username: user.username,
        rows,
        cash: snapshot.cash,
        total: snapshot.holdings_value,
        equity: snapshot.equity,
    };
    Ok(render(&template))
}

pub async fn login_form() -> Response {
    render(&LoginTemplate {
        logged_in: false,
        error: String::new(),
    })
}

pub async fn login(mut auth_session: AuthSession, Form(creds): Form<Credentials>) -> Response {
    match auth_session.authenticate(creds).await {
        Ok(Some(user)) => {
            if auth_session.login(&user).await.is_err() {
                return WebError::internal("failed to establish session").into_response();
            }
            Redirect::to("/").into_response()
        }
        Ok(None) => render(&LoginTemplate {
            logged_in: false,
            error: "Invalid username or password".to_string(),
        }),
        Err(e) => WebError::from(e).into_response(),
    }
}

pub async fn logout(mut auth_session: AuthSession) -> Response {
    match auth_session.logout().await {
        Ok(_) => Redirect::to("/login").into_response(),
        Err(_) => WebError::internal("failed to end session").into_response(),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm: String,
}

pub async fn register_form() -> Response {
    render(&RegisterTemplate { logged_in: false })
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    mut auth_session: AuthSession,
    Form(form): Form<RegisterForm>,
) -> Result<Response, WebError> {
    let user = state
        .ledger
        .register(&form.username, &form.password, &form.confirm)?;

    if auth_session.login(&AuthedUser(user)).await.is_err() {
        return Err(WebError::internal("failed to establish session"));
    }
    Ok(Redirect::to("/").into_response())
}

#[derive(Debug, serde::Deserialize)]
pub struct QuoteForm {
    pub symbol: String,
}

pub async fn quote_form() -> Response {
    render(&QuoteTemplate { logged_in: true })
}

pub async fn quote(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QuoteForm>,
) -> Result<Response, WebError> {
    let quote = state.ledger.quote(&form.symbol)?;
    Ok(render(&QuotedTemplate {
        logged_in: true,
        symbol: quote.symbol,
        name: quote.name,
        price: quote.price,
    }))
}

#[derive(Debug, serde::Deserialize)]
pub struct TradeForm {
    pub symbol: String,
    pub shares: String,
}

pub async fn buy_form() -> Response {
    render(&BuyTemplate { logged_in: true })
}

pub async fn buy(
    State(state): State<Arc<AppState>>,
    auth_session: AuthSession,
    Form(form): Form<TradeForm>,
) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    let shares = parse_shares(&form.shares)?;
    let receipt = state.ledger.buy(user.id, &form.symbol, shares)?;

    Ok(render(&TradeTemplate {
        logged_in: true,
        verb: "Bought".to_string(),
        symbol: receipt.symbol,
        name: receipt.name,
        shares: receipt.shares,
        price: receipt.price,
        total: receipt.total,
        time: receipt.executed_at.format(TIME_DISPLAY).to_string(),
        cash_after: receipt.cash_after,
    }))
}

pub async fn sell_form(
    State(state): State<Arc<AppState>>,
    auth_session: AuthSession,
) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    let symbols = state
        .ledger
        .holdings(user.id)?
        .into_iter()
        .map(|line| line.symbol)
        .collect();
    Ok(render(&SellTemplate {
        logged_in: true,
        symbols,
    }))
}

pub async fn sell(
    State(state): State<Arc<AppState>>,
    auth_session: AuthSession,
    Form(form): Form<TradeForm>,
) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    let shares = parse_shares(&form.shares)?;
    let receipt = state.ledger.sell(user.id, &form.symbol, shares)?;

    Ok(render(&TradeTemplate {
        logged_in: true,
        verb: "Sold".to_string(),
        symbol: receipt.symbol,
        name: receipt.name,
        shares: receipt.shares,
        price: receipt.price,
        total: receipt.total,
        time: receipt.executed_at.format(TIME_DISPLAY).to_string(),
        cash_after: receipt.cash_after,
    }))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    auth_session: AuthSession,
) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    let rows = state
        .ledger
        .history(user.id)?
        .into_iter()
        .map(|entry| HistoryRow {
            action: entry.action.to_string(),
            symbol: entry.symbol.unwrap_or_default(),
            shares: entry.shares.map(|s| s.to_string()).unwrap_or_default(),
            amount: entry.amount,
            time: entry.executed_at.format(TIME_DISPLAY).to_string(),
        })
        .collect();

    Ok(render(&HistoryTemplate {
        logged_in: true,
        rows,
    }))
}

#[derive(Debug, serde::Deserialize)]
pub struct AmountForm {
    pub amount: String,
}

pub async fn cash_form(auth_session: AuthSession) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    Ok(render(&CashTemplate {
        logged_in: true,
        cash: user.cash,
    }))
}

pub async fn deposit(
    State(state): State<Arc<AppState>>,
    auth_session: AuthSession,
    Form(form): Form<AmountForm>,
) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    let amount = Cents::parse(&form.amount)?;
    state.ledger.deposit(user.id, amount)?;
    Ok(Redirect::to("/").into_response())
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    auth_session: AuthSession,
    Form(form): Form<AmountForm>,
) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    let amount = Cents::parse(&form.amount)?;
    state.ledger.withdraw(user.id, amount)?;
    Ok(Redirect::to("/").into_response())
}

pub async fn settings_form(auth_session: AuthSession) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    Ok(render(&SettingsTemplate {
        logged_in: true,
        username: user.username,
    }))
}

#[derive(Debug, serde::Deserialize)]
pub struct ChangeUsernameForm {
    pub current_username: String,
    pub password: String,
    pub new_username: String,
}

pub async fn change_username(
    State(state): State<Arc<AppState>>,
    auth_session: AuthSession,
    Form(form): Form<ChangeUsernameForm>,
) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    state.ledger.change_username(
        user.id,
        &form.current_username,
        &form.password,
        &form.new_username,
    )?;
    Ok(Redirect::to("/settings").into_response())
}

#[derive(Debug, serde::Deserialize)]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm: String,
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    mut auth_session: AuthSession,
    Form(form): Form<ChangePasswordForm>,
) -> Result<Response, WebError> {
    let user = require_user(&auth_session)?;
    let updated = state.ledger.change_password(
        user.id,
        &form.current_password,
        &form.new_password,
        &form.confirm,
    )?;

    // The session auth hash is derived from the password hash; log the
    // session back in with the updated user so it stays valid.
    if auth_session.login(&AuthedUser(updated)).await.is_err() {
        return Err(WebError::internal("failed to refresh session"));
    }
    Ok(Redirect::to("/settings").into_response())
}

pub async fn not_found() -> Response {
    WebError::not_found("page not found").into_response()
}
