//! papertrade — a simulated stock-trading web application.
//!
//! Hexagonal architecture: ledger rules in [`domain`], port traits in
//! [`ports`], concrete implementations (SQLite store, CSV quote ingest,
//! axum web UI) in [`adapters`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
