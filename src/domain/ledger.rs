//! The Ledger Service.
//!
//! All operations take the acting user's id explicitly; session handling
//! belongs to the web adapter. Input validation and quote resolution
//! happen here; the guarded read-modify-write itself is delegated to the
//! store port, which applies it atomically.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::error::PapertradeError;
use crate::domain::money::Cents;
use crate::domain::password;
use crate::domain::portfolio::{Holding, PortfolioLine, PortfolioSnapshot, Quote};
use crate::domain::transaction::LedgerEntry;
use crate::domain::user::{User, UserId};
use crate::ports::quote_port::QuotePort;
use crate::ports::store_port::StorePort;

/// Opening balance credited when an account is created: $10,000.00.
pub const DEFAULT_OPENING_BONUS: Cents = Cents(1_000_000);

/// Outcome of a successful buy or sell, for confirmation pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    pub symbol: String,
    pub name: String,
    pub shares: u32,
    pub price: Cents,
    pub total: Cents,
    pub executed_at: DateTime<Utc>,
    pub cash_after: Cents,
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn StorePort + Send + Sync>,
    quotes: Arc<dyn QuotePort + Send + Sync>,
    opening_bonus: Cents,
}

impl Ledger {
    pub fn new(
        store: Arc<dyn StorePort + Send + Sync>,
        quotes: Arc<dyn QuotePort + Send + Sync>,
        opening_bonus: Cents,
    ) -> Self {
        Self {
            store,
            quotes,
            opening_bonus,
        }
    }

    /// Create an account, credit the opening bonus, and return the new
    /// user. The caller (web adapter or CLI) establishes the session.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        confirm: &str,
    ) -> Result<User, PapertradeError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(PapertradeError::validation("must provide username"));
        }
        if password.is_empty() {
            return Err(PapertradeError::validation("must provide password"));
        }
        if password != confirm {
            return Err(PapertradeError::validation("passwords must match"));
        }

        let hash = password::hash(password)?;
        self.store
            .create_user(username, &hash, self.opening_bonus, Utc::now())
    }

    /// Verify credentials and return the matching user.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, PapertradeError> {
        if username.is_empty() {
            return Err(PapertradeError::auth("must provide username"));
        }
        if password.is_empty() {
            return Err(PapertradeError::auth("must provide password"));
        }

        let user = self
            .store
            .user_by_username(username.trim())?
            .ok_or_else(|| PapertradeError::auth("invalid username and/or password"))?;

        if !password::verify(password, &user.password_hash) {
            return Err(PapertradeError::auth("invalid username and/or password"));
        }
        Ok(user)
    }

    pub fn user_by_id(&self, id: UserId) -> Result<Option<User>, PapertradeError> {
        self.store.user_by_id(id)
    }

    pub fn deposit(&self, user: UserId, amount: Cents) -> Result<User, PapertradeError> {
        if !amount.is_positive() {
            return Err(PapertradeError::validation("amount must be positive"));
        }
        self.store.apply_deposit(user, amount, Utc::now())
    }

    pub fn withdraw(&self, user: UserId, amount: Cents) -> Result<User, PapertradeError> {
        if !amount.is_positive() {
            return Err(PapertradeError::validation("amount must be positive"));
        }
        self.store.apply_withdraw(user, amount, Utc::now())
    }

    /// Current quote for a symbol, or `UnknownSymbol`.
    pub fn quote(&self, symbol: &str) -> Result<Quote, PapertradeError> {
        let symbol = normalize_symbol(symbol);
        self.quotes
            .lookup(&symbol)?
            .ok_or(PapertradeError::UnknownSymbol { symbol })
    }

    pub fn buy(
        &self,
        user: UserId,
        symbol: &str,
        shares: u32,
    ) -> Result<TradeReceipt, PapertradeError> {
        if shares == 0 {
            return Err(PapertradeError::validation("shares must be a positive integer"));
        }
        let quote = self.quote(symbol)?;
        let total = quote
            .price
            .checked_mul_shares(shares)
            .ok_or_else(|| PapertradeError::validation("purchase amount too large"))?;

        let executed_at = Utc::now();
        let user = self
            .store
            .apply_buy(user, &quote.symbol, shares, quote.price, executed_at)?;

        Ok(TradeReceipt {
            symbol: quote.symbol,
            name: quote.name,
            shares,
            price: quote.price,
            total,
            executed_at,
            cash_after: user.cash,
        })
    }

    pub fn sell(
        &self,
        user: UserId,
        symbol: &str,
        shares: u32,
    ) -> Result<TradeReceipt, PapertradeError> {
        if shares == 0 {
            return Err(PapertradeError::validation("shares must be a positive integer"));
        }
        let quote = self.quote(symbol)?;

        // Surface NotOwned before the share-count check, matching the
        // order a user sees the failures in.
        if self.store.portfolio_line(user, &quote.symbol)?.is_none() {
            return Err(PapertradeError::NotOwned {
                symbol: quote.symbol,
            });
        }

        let total = quote
            .price
            .checked_mul_shares(shares)
            .ok_or_else(|| PapertradeError::validation("sale amount too large"))?;

        let executed_at = Utc::now();
        let user = self
            .store
            .apply_sell(user, &quote.symbol, shares, quote.price, executed_at)?;

        Ok(TradeReceipt {
            symbol: quote.symbol,
            name: quote.name,
            shares,
            price: quote.price,
            total,
            executed_at,
            cash_after: user.cash,
        })
    }

    /// Price every holding at its current quote and total up equity.
    ///
    /// A quote failure for any owned symbol aborts the whole snapshot
    /// rather than silently understating equity.
    pub fn portfolio_snapshot(&self, user: UserId) -> Result<PortfolioSnapshot, PapertradeError> {
        let account = self
            .store
            .user_by_id(user)?
            .ok_or_else(|| PapertradeError::storage(format!("no such user id {user}")))?;

        let lines = self.store.portfolio_for(user)?;
        let mut holdings = Vec::with_capacity(lines.len());
        let mut holdings_value = Cents::ZERO;

        for line in lines {
            let quote = self.quote(&line.symbol)?;
            let value = quote
                .price
                .checked_mul_shares(line.shares)
                .ok_or_else(|| PapertradeError::validation("holding value too large"))?;
            holdings_value = holdings_value
                .checked_add(value)
                .ok_or_else(|| PapertradeError::validation("portfolio value too large"))?;
            holdings.push(Holding {
                symbol: line.symbol,
                name: quote.name,
                shares: line.shares,
                price: quote.price,
                value,
            });
        }

        let equity = account
            .cash
            .checked_add(holdings_value)
            .ok_or_else(|| PapertradeError::validation("equity too large"))?;

        Ok(PortfolioSnapshot {
            holdings,
            cash: account.cash,
            holdings_value,
            equity,
        })
    }

    pub fn history(&self, user: UserId) -> Result<Vec<LedgerEntry>, PapertradeError> {
        self.store.history_for(user)
    }

    /// Raw portfolio lines, without quote resolution.
    pub fn holdings(&self, user: UserId) -> Result<Vec<PortfolioLine>, PapertradeError> {
        self.store.portfolio_for(user)
    }

    /// Change the username. The caller must re-supply the current
    /// username (a confirmation field kept for compatibility with the
    /// original form) and the account password.
    pub fn change_username(
        &self,
        user: UserId,
        current_username: &str,
        password: &str,
        new_username: &str,
    ) -> Result<User, PapertradeError> {
        let new_username = new_username.trim();
        if current_username.is_empty() || password.is_empty() || new_username.is_empty() {
            return Err(PapertradeError::validation("all fields are required"));
        }

        let account = self.require_user(user)?;
        if account.username != current_username.trim() {
            return Err(PapertradeError::auth("current username does not match"));
        }
        if !password::verify(password, &account.password_hash) {
            return Err(PapertradeError::auth("invalid password"));
        }

        self.store.rename_user(user, new_username)
    }

    /// Change the password after re-verifying the current one. Returns
    /// the updated user so the web adapter can refresh the session.
    pub fn change_password(
        &self,
        user: UserId,
        current_password: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<User, PapertradeError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(PapertradeError::validation("all fields are required"));
        }
        if new_password != confirm {
            return Err(PapertradeError::validation("passwords must match"));
        }

        let account = self.require_user(user)?;
        if !password::verify(current_password, &account.password_hash) {
            return Err(PapertradeError::auth("invalid password"));
        }

        let hash = password::hash(new_password)?;
        self.store.set_password_hash(user, &hash)
    }

    fn require_user(&self, id: UserId) -> Result<User, PapertradeError> {
        self.store
            .user_by_id(id)?
            .ok_or_else(|| PapertradeError::storage(format!("no such user id {id}")))
    }
}

/// Symbols are stored and compared uppercase.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
