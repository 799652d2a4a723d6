#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use papertrade::domain::error::PapertradeError;
use papertrade::domain::ledger::Ledger;
use papertrade::domain::money::Cents;
use papertrade::domain::portfolio::{PortfolioLine, Quote};
use papertrade::domain::transaction::{Action, LedgerEntry};
use papertrade::domain::user::{User, UserId};
use papertrade::ports::quote_port::QuotePort;
use papertrade::ports::store_port::StorePort;

/// In-memory store with the same guarded-mutation semantics as the
/// SQLite adapter, for exercising the Ledger without a database.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    lines: Vec<PortfolioLine>,
    entries: Vec<LedgerEntry>,
    next_user_id: i64,
    next_entry_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_user_id: 1,
                next_entry_id: 1,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

impl Inner {
    fn user_mut(&mut self, id: UserId) -> Result<&mut User, PapertradeError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| PapertradeError::storage(format!("no such user id {id}")))
    }

    fn push_entry(
        &mut self,
        user: UserId,
        symbol: Option<&str>,
        action: Action,
        shares: Option<u32>,
        amount: Cents,
        at: DateTime<Utc>,
    ) {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        self.entries.push(LedgerEntry {
            id,
            user_id: user,
            symbol: symbol.map(|s| s.to_string()),
            action,
            shares,
            amount,
            executed_at: at,
        });
    }
}

impl StorePort for MemoryStore {
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        opening_bonus: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError> {
        let mut inner = self.lock();
        if inner.users.iter().any(|u| u.username == username) {
            return Err(PapertradeError::Conflict {
                username: username.to_string(),
            });
        }
        let id = inner.next_user_id;
        inner.next_user_id += 1;
        let user = User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            cash: opening_bonus,
        };
        inner.users.push(user.clone());
        inner.push_entry(id, None, Action::OpeningBonus, None, opening_bonus, at);
        Ok(user)
    }

    fn user_by_id(&self, id: UserId) -> Result<Option<User>, PapertradeError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>, PapertradeError> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    fn apply_deposit(
        &self,
        user: UserId,
        amount: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError> {
        let mut inner = self.lock();
        let account = inner.user_mut(user)?;
        account.cash = account
            .cash
            .checked_add(amount)
            .ok_or_else(|| PapertradeError::validation("balance too large"))?;
        let updated = account.clone();
        inner.push_entry(user, None, Action::Deposit, None, amount, at);
        Ok(updated)
    }

    fn apply_withdraw(
        &self,
        user: UserId,
        amount: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError> {
        let mut inner = self.lock();
        let account = inner.user_mut(user)?;
        if account.cash < amount {
            return Err(PapertradeError::InsufficientFunds {
                needed: amount,
                available: account.cash,
            });
        }
        account.cash = Cents(account.cash.0 - amount.0);
        let updated = account.clone();
        inner.push_entry(user, None, Action::Withdraw, None, Cents(-amount.0), at);
        Ok(updated)
    }

    fn apply_buy(
        &self,
        user: UserId,
        symbol: &str,
        shares: u32,
        unit_price: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError> {
        let cost = unit_price
            .checked_mul_shares(shares)
            .ok_or_else(|| PapertradeError::validation("purchase amount too large"))?;

        let mut inner = self.lock();
        let account = inner.user_mut(user)?;
        if account.cash < cost {
            return Err(PapertradeError::InsufficientFunds {
                needed: cost,
                available: account.cash,
            });
        }
        account.cash = Cents(account.cash.0 - cost.0);
        let updated = account.clone();

        match inner
            .lines
            .iter_mut()
            .find(|l| l.user_id == user && l.symbol == symbol)
        {
            Some(line) => line.shares += shares,
            None => inner.lines.push(PortfolioLine {
                user_id: user,
                symbol: symbol.to_string(),
                shares,
            }),
        }
        inner.push_entry(user, Some(symbol), Action::Buy, Some(shares), unit_price, at);
        Ok(updated)
    }

    fn apply_sell(
        &self,
        user: UserId,
        symbol: &str,
        shares: u32,
        unit_price: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError> {
        let proceeds = unit_price
            .checked_mul_shares(shares)
            .ok_or_else(|| PapertradeError::validation("sale amount too large"))?;

        let mut inner = self.lock();
        let position = inner
            .lines
            .iter()
            .position(|l| l.user_id == user && l.symbol == symbol);
        let position = match position {
            Some(p) => p,
            None => {
                return Err(PapertradeError::NotOwned {
                    symbol: symbol.to_string(),
                });
            }
        };
        let held = inner.lines[position].shares;
        if held < shares {
            return Err(PapertradeError::InsufficientShares {
                symbol: symbol.to_string(),
                requested: shares,
                held,
            });
        }

        if held == shares {
            inner.lines.remove(position);
        } else {
            inner.lines[position].shares -= shares;
        }

        let account = inner.user_mut(user)?;
        account.cash = Cents(account.cash.0 + proceeds.0);
        let updated = account.clone();
        inner.push_entry(user, Some(symbol), Action::Sell, Some(shares), unit_price, at);
        Ok(updated)
    }

    fn portfolio_for(&self, user: UserId) -> Result<Vec<PortfolioLine>, PapertradeError> {
        let mut lines: Vec<PortfolioLine> = self
            .lock()
            .lines
            .iter()
            .filter(|l| l.user_id == user)
            .cloned()
            .collect();
        lines.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(lines)
    }

    fn portfolio_line(
        &self,
        user: UserId,
        symbol: &str,
    ) -> Result<Option<PortfolioLine>, PapertradeError> {
        Ok(self
            .lock()
            .lines
            .iter()
            .find(|l| l.user_id == user && l.symbol == symbol)
            .cloned())
    }

    fn history_for(&self, user: UserId) -> Result<Vec<LedgerEntry>, PapertradeError> {
        let mut entries: Vec<LedgerEntry> = self
            .lock()
            .entries
            .iter()
            .filter(|e| e.user_id == user)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.executed_at, e.id));
        Ok(entries)
    }

    fn rename_user(&self, user: UserId, new_username: &str) -> Result<User, PapertradeError> {
        let mut inner = self.lock();
        if inner
            .users
            .iter()
            .any(|u| u.username == new_username && u.id != user)
        {
            return Err(PapertradeError::Conflict {
                username: new_username.to_string(),
            });
        }
        let account = inner.user_mut(user)?;
        account.username = new_username.to_string();
        Ok(account.clone())
    }

    fn set_password_hash(&self, user: UserId, new_hash: &str) -> Result<User, PapertradeError> {
        let mut inner = self.lock();
        let account = inner.user_mut(user)?;
        account.password_hash = new_hash.to_string();
        Ok(account.clone())
    }
}

/// Quote provider with a fixed table of quotes.
pub struct FixedQuotes {
    quotes: HashMap<String, Quote>,
}

impl FixedQuotes {
    pub fn new() -> Self {
        Self {
            quotes: HashMap::new(),
        }
    }

    pub fn with_quote(mut self, symbol: &str, name: &str, price: Cents) -> Self {
        self.quotes.insert(
            symbol.to_string(),
            Quote {
                symbol: symbol.to_string(),
                name: name.to_string(),
                price,
            },
        );
        self
    }
}

impl QuotePort for FixedQuotes {
    fn lookup(&self, symbol: &str) -> Result<Option<Quote>, PapertradeError> {
        Ok(self.quotes.get(symbol).cloned())
    }
}

/// Standard quote table used across tests.
pub fn test_quotes() -> FixedQuotes {
    FixedQuotes::new()
        .with_quote("AAPL", "Apple Inc", Cents::from_dollars(50))
        .with_quote("MSFT", "Microsoft Corporation", Cents::from_dollars(410))
        .with_quote("NFLX", "Netflix Inc", Cents::from_dollars(60))
}

/// A ledger over the in-memory store and the standard quotes, with the
/// default $10,000 opening bonus.
pub fn test_ledger() -> (Ledger, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let ledger = Ledger::new(
        Arc::clone(&store) as Arc<dyn StorePort + Send + Sync>,
        Arc::new(test_quotes()),
        Cents::from_dollars(10_000),
    );
    (ledger, store)
}

#[cfg(feature = "web")]
pub mod web {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, Response, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use papertrade::adapters::sqlite_store::SqliteStore;
    use papertrade::adapters::web::{build_router, AppState};
    use papertrade::domain::ledger::Ledger;
    use papertrade::domain::money::Cents;
    use papertrade::domain::portfolio::Quote;
    use papertrade::ports::config_port::ConfigPort;
    use papertrade::ports::quote_port::QuotePort;
    use papertrade::ports::store_port::StorePort;

    pub struct TestConfig;

    impl ConfigPort for TestConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            match (section, key) {
                ("auth", "session_secret") => Some("00".repeat(64)),
                ("database", "path") => Some(":memory:".to_string()),
                _ => None,
            }
        }

        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }

        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    /// A full app over an in-memory SQLite store seeded with quotes.
    pub async fn test_app() -> Router {
        let store = SqliteStore::in_memory().unwrap();
        store.initialize_schema().unwrap();
        store
            .upsert_quotes(&[
                Quote {
                    symbol: "AAPL".into(),
                    name: "Apple Inc".into(),
                    price: Cents::from_dollars(50),
                },
                Quote {
                    symbol: "MSFT".into(),
                    name: "Microsoft Corporation".into(),
                    price: Cents::from_dollars(410),
                },
            ])
            .unwrap();

        let store = Arc::new(store);
        let ledger = Ledger::new(
            Arc::clone(&store) as Arc<dyn StorePort + Send + Sync>,
            store as Arc<dyn QuotePort + Send + Sync>,
            Cents::from_dollars(10_000),
        );
        let state = AppState {
            ledger,
            config: Arc::new(TestConfig),
        };
        build_router(state).await.unwrap()
    }

    pub fn extract_cookies(response: &Response<Body>) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn build_cookie_header(set_cookies: &[String]) -> String {
        set_cookies
            .iter()
            .map(|sc| sc.split(';').next().unwrap_or("").to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn form_request(uri: &str, cookie: &str, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if !cookie.is_empty() {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub fn get_request(uri: &str, cookie: &str) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if !cookie.is_empty() {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    pub async fn body_string(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).to_string()
    }

    /// Register an account and return the session cookie header.
    pub async fn register_user(app: &Router, username: &str, password: &str) -> String {
        let body = format!(
            "username={username}&password={password}&confirm={password}"
        );
        let response = app
            .clone()
            .oneshot(form_request("/register", "", &body))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::SEE_OTHER,
            "registration should redirect"
        );
        build_cookie_header(&extract_cookies(&response))
    }
}
