//! HTML templates using Askama.

use askama::Template;

use crate::domain::money::Cents;

/// One priced holding row on the portfolio page.
pub struct HoldingRow {
    pub symbol: String,
    pub name: String,
    pub shares: u32,
    pub price: Cents,
    pub value: Cents,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub logged_in: bool,
    pub username: String,
    pub rows: Vec<HoldingRow>,
    pub cash: Cents,
    pub total: Cents,
    pub equity: Cents,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub logged_in: bool,
    /// Empty when there is nothing to report.
    pub error: String,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub logged_in: bool,
}

#[derive(Template)]
#[template(path = "quote.html")]
pub struct QuoteTemplate {
    pub logged_in: bool,
}

#[derive(Template)]
#[template(path = "quoted.html")]
pub struct QuotedTemplate {
    pub logged_in: bool,
    pub symbol: String,
    pub name: String,
    pub price: Cents,
}

#[derive(Template)]
#[template(path = "buy.html")]
pub struct BuyTemplate {
    pub logged_in: bool,
}

#[derive(Template)]
#[template(path = "sell.html")]
pub struct SellTemplate {
    pub logged_in: bool,
    /// Symbols the user currently holds, for the symbol selector.
    pub symbols: Vec<String>,
}

/// Confirmation page for a completed buy or sell.
#[derive(Template)]
#[template(path = "trade.html")]
pub struct TradeTemplate {
    pub logged_in: bool,
    /// "Bought" or "Sold".
    pub verb: String,
    pub symbol: String,
    pub name: String,
    pub shares: u32,
    pub price: Cents,
    pub total: Cents,
    pub time: String,
    pub cash_after: Cents,
}

pub struct HistoryRow {
    pub action: String,
    /// Empty for cash-only entries.
    pub symbol: String,
    /// Empty for cash-only entries.
    pub shares: String,
    pub amount: Cents,
    pub time: String,
}

#[derive(Template)]
#[template(path = "history.html")]
pub struct HistoryTemplate {
    pub logged_in: bool,
    pub rows: Vec<HistoryRow>,
}

#[derive(Template)]
#[template(path = "cash.html")]
pub struct CashTemplate {
    pub logged_in: bool,
    pub cash: Cents,
}

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub logged_in: bool,
    pub username: String,
}
