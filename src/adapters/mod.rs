//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod quote_csv;
pub mod sqlite_store;
#[cfg(feature = "web")]
pub mod web;
