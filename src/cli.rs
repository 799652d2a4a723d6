//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::quote_csv::read_quote_csv;
use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::error::PapertradeError;
use crate::domain::ledger::{Ledger, DEFAULT_OPENING_BONUS};
use crate::domain::money::Cents;
use crate::domain::password;
use crate::ports::config_port::ConfigPort;
use crate::ports::quote_port::QuotePort;
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(name = "papertrade", about = "Simulated stock trading web application")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the database schema
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Load quotes from a symbol,name,price CSV into the simulated market
    ImportQuotes {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Register a user account (password read from stdin)
    AddUser {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        username: String,
    },
    /// Output an argon2 hash for a password read from stdin
    HashPassword,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::InitDb { config } => run_init_db(&config),
        Command::ImportQuotes { config, file } => run_import_quotes(&config, &file),
        Command::AddUser { config, username } => run_add_user(&config, &username),
        Command::HashPassword => run_hash_password(),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PapertradeError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn open_store(config: &dyn ConfigPort) -> Result<SqliteStore, ExitCode> {
    let store = SqliteStore::from_config(config).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    store.initialize_schema().map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })?;
    Ok(store)
}

fn opening_bonus(config: &dyn ConfigPort) -> Cents {
    Cents(config.get_int("ledger", "opening_bonus", DEFAULT_OPENING_BONUS.0))
}

/// Build the ledger over a single SQLite store, which implements both
/// the store and quote ports.
fn build_ledger(store: SqliteStore, config: &dyn ConfigPort) -> Ledger {
    let store = Arc::new(store);
    Ledger::new(
        Arc::clone(&store) as Arc<dyn StorePort + Send + Sync>,
        store as Arc<dyn QuotePort + Send + Sync>,
        opening_bonus(config),
    )
}

fn run_serve(config_path: &PathBuf) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState};
        use std::net::SocketAddr;

        eprintln!("Loading config from {}", config_path.display());
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(code) => return code,
        };

        let store = match open_store(&config) {
            Ok(s) => s,
            Err(code) => return code,
        };

        let addr: SocketAddr = match config
            .get_string("server", "listen")
            .unwrap_or_else(|| "127.0.0.1:8000".to_string())
            .parse()
        {
            Ok(a) => a,
            Err(e) => {
                eprintln!("error: invalid [server] listen address: {e}");
                return ExitCode::from(2);
            }
        };

        let ledger = build_ledger(store, &config);
        let state = AppState {
            ledger,
            config: Arc::new(config),
        };

        eprintln!("Starting web server on {addr}");

        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                eprintln!("error: failed to start runtime: {e}");
                return ExitCode::from(1);
            }
        };

        runtime.block_on(async {
            let router = match build_router(state).await {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("error: {e}");
                    return ExitCode::from(&e);
                }
            };
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("error: failed to bind {addr}: {e}");
                    return ExitCode::from(1);
                }
            };
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("error: server exited: {e}");
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        })
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}

fn run_init_db(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    match open_store(&config) {
        Ok(_) => {
            eprintln!("Database schema created");
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}

fn run_import_quotes(config_path: &PathBuf, file: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let quotes = match read_quote_csv(file) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };
    if let Err(e) = store.upsert_quotes(&quotes) {
        eprintln!("error: {e}");
        return ExitCode::from(&e);
    }

    eprintln!("Imported {} quotes from {}", quotes.len(), file.display());
    ExitCode::SUCCESS
}

fn run_add_user(config_path: &PathBuf, username: &str) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let store = match open_store(&config) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let ledger = build_ledger(store, &config);

    let password = match read_password() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    match ledger.register(username, &password, &password) {
        Ok(user) => {
            eprintln!("Created user {} (id {})", user.username, user.id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_hash_password() -> ExitCode {
    let password = match read_password() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
    };

    match password::hash(&password) {
        Ok(hash) => {
            println!("{hash}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn read_password() -> std::io::Result<String> {
    use std::io::BufRead;

    eprintln!("Enter password:");
    let stdin = std::io::stdin();
    let line = stdin
        .lock()
        .lines()
        .next()
        .unwrap_or_else(|| Ok(String::new()))?;
    Ok(line.trim_end().to_string())
}
