//! Ledger store port trait.
//!
//! Every multi-step mutation (registration, deposit, withdraw, buy, sell)
//! is a single port operation. Implementations must apply each one
//! atomically, evaluating the business guard (cash or share sufficiency)
//! inside the same transaction as the writes so that concurrent mutations
//! against the same user cannot both pass validation on a stale read.

use chrono::{DateTime, Utc};

use crate::domain::error::PapertradeError;
use crate::domain::money::Cents;
use crate::domain::portfolio::PortfolioLine;
use crate::domain::transaction::LedgerEntry;
use crate::domain::user::{User, UserId};

pub trait StorePort {
    /// Create a user with `cash = opening_bonus` and record the bonus
    /// entry, as one unit. `Conflict` if the username is taken.
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        opening_bonus: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError>;

    fn user_by_id(&self, id: UserId) -> Result<Option<User>, PapertradeError>;

    fn user_by_username(&self, username: &str) -> Result<Option<User>, PapertradeError>;

    /// Credit cash and append a Deposit entry. Returns the updated user.
    fn apply_deposit(
        &self,
        user: UserId,
        amount: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError>;

    /// Debit cash and append a Withdraw entry with a negative amount.
    /// `InsufficientFunds` if the balance cannot cover it.
    fn apply_withdraw(
        &self,
        user: UserId,
        amount: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError>;

    /// Debit `unit_price * shares`, upsert the portfolio line, and append
    /// a Buy entry. `InsufficientFunds` if cash cannot cover the cost.
    fn apply_buy(
        &self,
        user: UserId,
        symbol: &str,
        shares: u32,
        unit_price: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError>;

    /// Credit the sale proceeds, decrement the portfolio line (deleting
    /// it at zero), and append a Sell entry. `NotOwned` if no line
    /// exists, `InsufficientShares` if the line is too small.
    fn apply_sell(
        &self,
        user: UserId,
        symbol: &str,
        shares: u32,
        unit_price: Cents,
        at: DateTime<Utc>,
    ) -> Result<User, PapertradeError>;

    /// All portfolio lines for a user, ordered by symbol.
    fn portfolio_for(&self, user: UserId) -> Result<Vec<PortfolioLine>, PapertradeError>;

    /// One line for a user, if held.
    fn portfolio_line(
        &self,
        user: UserId,
        symbol: &str,
    ) -> Result<Option<PortfolioLine>, PapertradeError>;

    /// All ledger entries for a user, ordered by timestamp then
    /// insertion id.
    fn history_for(&self, user: UserId) -> Result<Vec<LedgerEntry>, PapertradeError>;

    /// Change the username. `Conflict` if the new name is taken.
    fn rename_user(&self, user: UserId, new_username: &str) -> Result<User, PapertradeError>;

    fn set_password_hash(&self, user: UserId, new_hash: &str) -> Result<User, PapertradeError>;
}
