//! SQLite ledger store.
//!
//! Implements [`StorePort`] with every guarded mutation inside a
//! `BEGIN IMMEDIATE` transaction: the cash/share guard is evaluated on
//! rows the transaction already holds the write lock for, so two
//! concurrent mutations against the same user serialize instead of both
//! passing validation on a stale read. Also implements [`QuotePort`]
//! over a local `quotes` table, which is the simulated market.

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

use crate::domain::error::PapertradeError;
use crate::domain::money::Cents;
use crate::domain::portfolio::{PortfolioLine, Quote};
use crate::domain::transaction::{Action, LedgerEntry};
use crate::domain::user::{User, UserId};
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;
use crate::ports::store_port::StorePort;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: impl ToString) -> PapertradeError {
    PapertradeError::storage(e)
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PapertradeError> {
        let db_path =
            config
                .get_string("database", "path")
                .ok_or_else(|| PapertradeError::ConfigMissing {
                    section: "database".into(),
                    key: "path".into(),
                })?;
        let pool_size = config.get_int("database", "pool_size", 4) as u32;
        Self::open(&db_path, pool_size)
    }

    pub fn open(db_path: &str, pool_size: u32) -> Result<Self, PapertradeError> {
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        });
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    /// An in-memory store for tests. Pool size is pinned to one
    /// connection: each in-memory connection is its own database.
    pub fn in_memory() -> Result<Self, PapertradeError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), PapertradeError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                cash INTEGER NOT NULL DEFAULT 0 CHECK (cash >= 0)
            );
            CREATE TABLE IF NOT EXISTS portfolio (
                user_id INTEGER NOT NULL REFERENCES users(id),
                symbol TEXT NOT NULL,
                shares INTEGER NOT NULL CHECK (shares > 0),
                PRIMARY KEY (user_id, symbol)
            );
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                symbol TEXT,
                action TEXT NOT NULL,
                shares INTEGER,
                amount INTEGER NOT NULL,
                executed_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_transactions_user
                ON transactions(user_id, executed_at);
            CREATE TABLE IF NOT EXISTS quotes (
                symbol TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                price INTEGER NOT NULL CHECK (price >= 0)
            );",
        )
        .map_err(db_err)
    }

    /// Insert or replace quotes in the simulated market.
    pub fn upsert_quotes(&self, quotes: &[Quote]) -> Result<(), PapertradeError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;
        for quote in quotes {
            tx.execute(
                "INSERT INTO quotes (symbol, name, price) VALUES (?1, ?2, ?3)
                 ON CONFLICT(symbol) DO UPDATE SET name = excluded.name, price = excluded.price",
                params![quote.symbol, quote.name, quote.price.0],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, PapertradeError> {
        self.pool.get().map_err(db_err)
    }

    fn user_in_tx(tx: &Transaction<'_>, id: UserId) -> Result<User, PapertradeError> {
        tx.query_row(
            "SELECT id, username, password_hash, cash FROM users WHERE id = ?1",
            params![id],
            map_user_row,
        )
        .optional()
        .map_err(db_err)?
        .ok_or_else(|| PapertradeError::storage(format!("no such user id {id}")))
    }

    fn record_entry(
        tx: &Transaction<'_>,
        user: UserId,
        symbol: Option<&str>,
        action: Action,
        shares: Option<u32>,
        amount: Cents,
        at: DateTime<Utc>,
    ) -> Result<(), PapertradeError> {
        tx.execute(
            "INSERT INTO transactions (user_id, symbol, action, shares, amount, executed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user,
                symbol,
                action.to_string(),
                shares,
                amount.0,
                at.format(TIME_FORMAT).to_string()
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        cash: Cents(row.get(3)?),
    })
}

fn map_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let action_str: String = row.get(3)?;
    let action: Action = action_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::other(e)),
        )
    })?;
    let time_str: String = row.get(6)?;
    let executed_at = DateTime::parse_from_rfc3339(&time_str)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?
        .with_timezone(&Utc);

    let shares: Option<i64> = row.get(4)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        symbol: row.get(2)?,
        action,
        shares: shares.map(|s| s as u32),
        amount: Cents(row.get(5)?),
        executed_at,
    })
}

impl StorePort for SqliteStore {
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        opening_bonus: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let taken: Option<i64> = tx
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(PapertradeError::Conflict {
                username: username.to_string(),
            });
        }

        tx.execute(
            "INSERT INTO users (username, password_hash, cash) VALUES (?1, ?2, ?3)",
            params![username, password_hash, opening_bonus.0],
        )
        .map_err(db_err)?;
        let id = tx.last_insert_rowid();

        Self::record_entry(&tx, id, None, Action::OpeningBonus, None, opening_bonus, at)?;

        let user = Self::user_in_tx(&tx, id)?;
        tx.commit().map_err(db_err)?;
        Ok(user)
    }

    fn user_by_id(&self, id: UserId) -> Result<Option<User>, PapertradeError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, password_hash, cash FROM users WHERE id = ?1",
            params![id],
            map_user_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>, PapertradeError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, password_hash, cash FROM users WHERE username = ?1",
            params![username],
            map_user_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn apply_deposit(
        &self,
        user: UserId,
        amount: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let account = Self::user_in_tx(&tx, user)?;
        let new_cash = account
            .cash
            .checked_add(amount)
            .ok_or_else(|| PapertradeError::validation("balance too large"))?;

        tx.execute(
            "UPDATE users SET cash = ?1 WHERE id = ?2",
            params![new_cash.0, user],
        )
        .map_err(db_err)?;
        Self::record_entry(&tx, user, None, Action::Deposit, None, amount, at)?;

        let updated = Self::user_in_tx(&tx, user)?;
        tx.commit().map_err(db_err)?;
        Ok(updated)
    }

    fn apply_withdraw(
        &self,
        user: UserId,
        amount: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let account = Self::user_in_tx(&tx, user)?;
        if account.cash < amount {
            return Err(PapertradeError::InsufficientFunds {
                needed: amount,
                available: account.cash,
            });
        }

        tx.execute(
            "UPDATE users SET cash = cash - ?1 WHERE id = ?2",
            params![amount.0, user],
        )
        .map_err(db_err)?;
        Self::record_entry(&tx, user, None, Action::Withdraw, None, Cents(-amount.0), at)?;

        let updated = Self::user_in_tx(&tx, user)?;
        tx.commit().map_err(db_err)?;
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

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let account = Self::user_in_tx(&tx, user)?;
        if account.cash < cost {
            return Err(PapertradeError::InsufficientFunds {
                needed: cost,
                available: account.cash,
            });
        }

        tx.execute(
            "UPDATE users SET cash = cash - ?1 WHERE id = ?2",
            params![cost.0, user],
        )
        .map_err(db_err)?;
        tx.execute(
            "INSERT INTO portfolio (user_id, symbol, shares) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, symbol) DO UPDATE SET shares = shares + excluded.shares",
            params![user, symbol, shares],
        )
        .map_err(db_err)?;
        Self::record_entry(&tx, user, Some(symbol), Action::Buy, Some(shares), unit_price, at)?;

        let updated = Self::user_in_tx(&tx, user)?;
        tx.commit().map_err(db_err)?;
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

        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let held: Option<i64> = tx
            .query_row(
                "SELECT shares FROM portfolio WHERE user_id = ?1 AND symbol = ?2",
                params![user, symbol],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        let held = match held {
            Some(h) => h as u32,
            None => {
                return Err(PapertradeError::NotOwned {
                    symbol: symbol.to_string(),
                });
            }
        };
        if held < shares {
            return Err(PapertradeError::InsufficientShares {
                symbol: symbol.to_string(),
                requested: shares,
                held,
            });
        }

        // Delete the line outright when it empties; zero-share rows
        // must never exist.
        if held == shares {
            tx.execute(
                "DELETE FROM portfolio WHERE user_id = ?1 AND symbol = ?2",
                params![user, symbol],
            )
            .map_err(db_err)?;
        } else {
            tx.execute(
                "UPDATE portfolio SET shares = shares - ?1 WHERE user_id = ?2 AND symbol = ?3",
                params![shares, user, symbol],
            )
            .map_err(db_err)?;
        }

        tx.execute(
            "UPDATE users SET cash = cash + ?1 WHERE id = ?2",
            params![proceeds.0, user],
        )
        .map_err(db_err)?;
        Self::record_entry(&tx, user, Some(symbol), Action::Sell, Some(shares), unit_price, at)?;

        let updated = Self::user_in_tx(&tx, user)?;
        tx.commit().map_err(db_err)?;
        Ok(updated)
    }

    fn portfolio_for(&self, user: UserId) -> Result<Vec<PortfolioLine>, PapertradeError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT user_id, symbol, shares FROM portfolio
                 WHERE user_id = ?1 ORDER BY symbol",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![user], |row| {
                let shares: i64 = row.get(2)?;
                Ok(PortfolioLine {
                    user_id: row.get(0)?,
                    symbol: row.get(1)?,
                    shares: shares as u32,
                })
            })
            .map_err(db_err)?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row.map_err(db_err)?);
        }
        Ok(lines)
    }

    fn portfolio_line(
        &self,
        user: UserId,
        symbol: &str,
    ) -> Result<Option<PortfolioLine>, PapertradeError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT user_id, symbol, shares FROM portfolio WHERE user_id = ?1 AND symbol = ?2",
            params![user, symbol],
            |row| {
                let shares: i64 = row.get(2)?;
                Ok(PortfolioLine {
                    user_id: row.get(0)?,
                    symbol: row.get(1)?,
                    shares: shares as u32,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    fn history_for(&self, user: UserId) -> Result<Vec<LedgerEntry>, PapertradeError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, symbol, action, shares, amount, executed_at
                 FROM transactions WHERE user_id = ?1
                 ORDER BY executed_at, id",
            )
            .map_err(db_err)?;

        let rows = stmt.query_map(params![user], map_entry_row).map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    fn rename_user(&self, user: UserId, new_username: &str) -> Result<User, PapertradeError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let taken: Option<i64> = tx
            .query_row(
                "SELECT id FROM users WHERE username = ?1 AND id != ?2",
                params![new_username, user],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        if taken.is_some() {
            return Err(PapertradeError::Conflict {
                username: new_username.to_string(),
            });
        }

        tx.execute(
            "UPDATE users SET username = ?1 WHERE id = ?2",
            params![new_username, user],
        )
        .map_err(db_err)?;

        let updated = Self::user_in_tx(&tx, user)?;
        tx.commit().map_err(db_err)?;
        Ok(updated)
    }

    fn set_password_hash(&self, user: UserId, new_hash: &str) -> Result<User, PapertradeError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            params![new_hash, user],
        )
        .map_err(db_err)?;
        let updated = Self::user_in_tx(&tx, user)?;
        tx.commit().map_err(db_err)?;
        Ok(updated)
    }
}

impl QuotePort for SqliteStore {
    fn lookup(&self, symbol: &str) -> Result<Option<Quote>, PapertradeError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT symbol, name, price FROM quotes WHERE symbol = ?1",
            params![symbol],
            |row| {
                Ok(Quote {
                    symbol: row.get(0)?,
                    name: row.get(1)?,
                    price: Cents(row.get(2)?),
                })
            },
        )
        .optional()
        .map_err(db_err)
    }
}
