mod auth;
mod config;
mod http;
mod logger;
mod state;
mod store;
mod telegram;

use std::path::PathBuf;
use std::process;

use clap::Parser;
use hyper::StatusCode;
use thiserror::Error;
use tokio::sync::watch;

pub use crate::state::State;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(about = "The tournament registry server")]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::from_file(&args.config).await {
        Ok(config) => config.with_environment(),
        Err(err) => {
            eprintln!("Failed to load config from {}: {}", args.config.display(), err);
            process::exit(1);
        }
    };

    logger::init(config.loglevel);
    log::info!("Using config: {:?}", config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::task::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => log::error!("Failed to listen for shutdown signal: {}", err),
        }
    });

    let state = State::new(config, shutdown_rx);

    if let Err(err) = prepare_tables(&state).await {
        log::error!("Failed to prepare database tables: {}", err);
        process::exit(1);
    }

    if let Err(err) = http::bind(state).await {
        log::error!("Server error: {}", err);
        process::exit(1);
    }
}

/// Creates all tables if they don't exist yet.
async fn prepare_tables(state: &State) -> Result<(), Error> {
    let prefix = &state.config.database.prefix;

    let tables = [
        format!(
            "CREATE TABLE IF NOT EXISTS {}teams (id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY, \
            name TEXT NOT NULL, captain_name TEXT NOT NULL, captain_telegram TEXT NOT NULL, \
            members_count INT UNSIGNED NOT NULL, members_info TEXT NOT NULL, \
            auth_code VARCHAR(32) NOT NULL, status TINYINT UNSIGNED NOT NULL, \
            admin_comment TEXT, created_at DATETIME NOT NULL)",
            prefix
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}admins (id BIGINT UNSIGNED PRIMARY KEY, \
            username VARCHAR(64) NOT NULL UNIQUE, password TEXT NOT NULL, \
            is_superadmin BOOLEAN NOT NULL, telegram_chat_id BIGINT)",
            prefix
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}matches (id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY, \
            number BIGINT UNSIGNED NOT NULL, segment TINYINT UNSIGNED NOT NULL, \
            round INT UNSIGNED NOT NULL, data BLOB NOT NULL, scheduled_time DATETIME)",
            prefix
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {}settings (id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY, \
            is_open BOOLEAN NOT NULL, updated_by TEXT, updated_at DATETIME NOT NULL)",
            prefix
        ),
    ];

    for table in tables {
        sqlx::query(&table).execute(&state.store.pool).await?;
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Store(#[from] sqlx::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Hyper(#[from] hyper::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid token")]
    InvalidToken,
    #[error("not found")]
    NotFound,
    #[error("bad request")]
    BadRequest,
    #[error(transparent)]
    StatusCodeError(#[from] StatusCodeError),
}

/// An error rendered to the client as its status code with a `{code,
/// message}` JSON body.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct StatusCodeError {
    pub code: StatusCode,
    pub message: String,
}

impl StatusCodeError {
    pub fn new<T>(code: StatusCode, message: T) -> Self
    where
        T: ToString,
    {
        Self {
            code,
            message: message.to_string(),
        }
    }

    /// Replaces the default message.
    pub fn message<T>(mut self, message: T) -> Self
    where
        T: ToString,
    {
        self.message = message.to_string();
        self
    }

    /// 400 Bad Request
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request")
    }

    /// 401 Unauthorized
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    /// 403 Forbidden
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden")
    }

    /// 404 Not Found
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }

    /// 405 Method Not Allowed
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    /// 408 Request Timeout
    pub fn request_timeout() -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, "Request Timeout")
    }

    /// 411 Length Required
    pub fn length_required() -> Self {
        Self::new(StatusCode::LENGTH_REQUIRED, "Length Required")
    }

    /// 413 Payload Too Large
    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
    }
}
