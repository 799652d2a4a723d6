//! Quote provider port trait.

use crate::domain::error::PapertradeError;
use crate::domain::portfolio::Quote;

pub trait QuotePort {
    /// Look up the current quote for a symbol. `Ok(None)` means the
    /// provider has no data for it; callers translate that into
    /// `UnknownSymbol`.
    fn lookup(&self, symbol: &str) -> Result<Option<Quote>, PapertradeError>;
}
