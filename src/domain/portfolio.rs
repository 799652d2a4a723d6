//! Portfolio holdings and valuation.

use crate::domain::money::Cents;
use crate::domain::user::UserId;

/// A single (user, symbol) holding. Only lines with a positive share
/// count exist; a sell that empties a line deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioLine {
    pub user_id: UserId,
    pub symbol: String,
    pub shares: u32,
}

/// A quote from the simulated market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Cents,
}

/// A portfolio line priced at the current quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub shares: u32,
    pub price: Cents,
    pub value: Cents,
}

/// Point-in-time view of a user's financial position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioSnapshot {
    pub holdings: Vec<Holding>,
    pub cash: Cents,
    /// Market value of all holdings.
    pub holdings_value: Cents,
    /// Cash plus holdings value.
    pub equity: Cents,
}
