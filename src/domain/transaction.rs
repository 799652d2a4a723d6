//! Append-only transaction ledger entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::domain::money::Cents;
use crate::domain::user::UserId;

/// What a ledger entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
    Deposit,
    Withdraw,
    OpeningBonus,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Buy => "Buy",
            Action::Sell => "Sell",
            Action::Deposit => "Deposit",
            Action::Withdraw => "Withdraw",
            Action::OpeningBonus => "Account Opening Bonus",
        };
        f.write_str(label)
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Buy" => Ok(Action::Buy),
            "Sell" => Ok(Action::Sell),
            // "Cash" is the label older databases used for a deposit.
            "Deposit" | "Cash" => Ok(Action::Deposit),
            "Withdraw" => Ok(Action::Withdraw),
            "Account Opening Bonus" => Ok(Action::OpeningBonus),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

/// One immutable row of the audit trail. Created exactly once per
/// ledger-affecting operation, never mutated or deleted.
///
/// For `Buy`/`Sell`, `amount` is the unit price and `shares` is set.
/// For cash operations, `amount` is the signed cash delta (withdrawals
/// are negative) and `symbol`/`shares` are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: UserId,
    pub symbol: Option<String>,
    pub action: Action,
    pub shares: Option<u32>,
    pub amount: Cents,
    pub executed_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Signed share delta this entry contributes to its symbol's
    /// position: positive for buys, negative for sells, zero otherwise.
    pub fn share_delta(&self) -> i64 {
        let shares = i64::from(self.shares.unwrap_or(0));
        match self.action {
            Action::Buy => shares,
            Action::Sell => -shares,
            _ => 0,
        }
    }
}
