//! CSV quote ingest.
//!
//! Reads a `symbol,name,price` file (header row expected, price in
//! dollars) for seeding the simulated market's quotes table.

use std::fs;
use std::path::Path;

use crate::domain::error::PapertradeError;
use crate::domain::ledger::normalize_symbol;
use crate::domain::money::Cents;
use crate::domain::portfolio::Quote;

pub fn read_quote_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Quote>, PapertradeError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| PapertradeError::Storage {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut quotes = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| PapertradeError::Storage {
            reason: format!("CSV parse error: {e}"),
        })?;

        let symbol = record.get(0).ok_or_else(|| PapertradeError::Storage {
            reason: "missing symbol column".into(),
        })?;
        let name = record.get(1).ok_or_else(|| PapertradeError::Storage {
            reason: "missing name column".into(),
        })?;
        let price_str = record.get(2).ok_or_else(|| PapertradeError::Storage {
            reason: "missing price column".into(),
        })?;
        let price = Cents::parse(price_str).map_err(|_| PapertradeError::Storage {
            reason: format!("invalid price for {symbol}: {price_str}"),
        })?;

        quotes.push(Quote {
            symbol: normalize_symbol(symbol),
            name: name.trim().to_string(),
            price,
        });
    }

    Ok(quotes)
}
