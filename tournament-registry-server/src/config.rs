use std::env;
use std::fmt::{self, Formatter};
use std::io;
use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::LevelFilter;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

macro_rules! from_environment {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            {
                if let Ok(value) = env::var($key) {
                    if let Ok(value) = value.parse() {
                        $config.$name = value;
                    }
                }
            }
        )*
    }};
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub database: Database,
    pub loglevel: LevelFilter,
    pub bind: BindAddr,
    #[serde(default)]
    pub telegram: Telegram,
}

impl Config {
    pub async fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path).await?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        Ok(toml::from_slice(&buf)?)
    }

    /// Overrides fields set in the environment.
    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "TR_LOGLEVEL", loglevel, "TR_BIND", bind);
        self.database = self.database.with_environment();
        self.telegram = self.telegram.with_environment();

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Database::default(),
            loglevel: LevelFilter::Info,
            bind: BindAddr::Tcp(SocketAddr::new([0, 0, 0, 0].into(), 3000)),
            telegram: Telegram::default(),
        }
    }
}

/// An address to bind the http server to.
///
/// This can currently be a tcp socket (net) or a unix socket (file).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum BindAddr {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl BindAddr {
    /// Parses the given string into a `Tcp` address.
    ///
    /// # Errors
    ///
    /// Returns an [`AddrParseError`] when parsing the input fails.
    #[inline]
    pub fn parse_socket(s: &str) -> Result<Self, AddrParseError> {
        s.parse().map(Self::Tcp)
    }
}

impl FromStr for BindAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = Self::parse_socket(s) {
            return Ok(addr);
        }

        Ok(Self::Unix(s.to_owned().into()))
    }
}

impl<'de> Deserialize<'de> for BindAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BindAddrVisitor;

        impl<'de> Visitor<'de> for BindAddrVisitor {
            type Value = BindAddr;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("an address with port, or file path")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                match v.parse() {
                    Ok(addr) => Ok(addr),
                    Err(err) => Err(E::custom(err)),
                }
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                self.visit_str(&v)
            }
        }

        deserializer.deserialize_str(BindAddrVisitor)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub prefix: String,
}

impl Database {
    pub fn connect_string(&self) -> String {
        format!(
            "{}://{}:{}@{}:{}/{}?ssl-mode=DISABLED",
            self.driver, self.user, self.password, self.host, self.port, self.database
        )
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "TR_DB_DRIVER",
            driver,
            "TR_DB_HOST",
            host,
            "TR_DB_PORT",
            port,
            "TR_DB_USER",
            user,
            "TR_DB_PASSWORD",
            password,
            "TR_DB_DATABASE",
            database,
            "TR_DB_PREFIX",
            prefix,
        );

        self
    }
}

/// The Telegram bot connection. An empty token disables all bot traffic.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Telegram {
    #[serde(default)]
    pub token: String,
}

impl Telegram {
    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "TR_TELEGRAM_TOKEN", token);

        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::BindAddr;

    #[test]
    fn test_bindaddr_parse() {
        let input = "0.0.0.0:80";
        assert_eq!(
            input.parse::<BindAddr>().unwrap(),
            BindAddr::Tcp(input.parse().unwrap())
        );

        let input = "/var/run/test";
        assert_eq!(
            input.parse::<BindAddr>().unwrap(),
            BindAddr::Unix(input.to_owned().into())
        );
    }
}
