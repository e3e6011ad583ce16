//! Environment configuration
//!
//! Values come from the process environment, with a `.env` file loaded first
//! when present.

use std::net::SocketAddr;

use crate::pricing::format::DisplayFormat;
use crate::pricing::matrix::{MatrixLayout, UnknownLayout};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error(transparent)]
    Layout(#[from] UnknownLayout),
}

/// Runtime settings
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub layout: MatrixLayout,
    pub display: DisplayFormat,
}

impl Config {
    /// Load from the environment (and `.env`)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = match var("BIND_ADDR") {
            Some(value) => value.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
                name: "BIND_ADDR",
                value,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(value) => match value.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "DATABASE_MAX_CONNECTIONS",
                        value,
                    })
                }
            },
            None => 5,
        };

        let layout = match var("PRICE_MATRIX_LAYOUT") {
            Some(value) => value.parse::<MatrixLayout>()?,
            None => MatrixLayout::standard(),
        };

        let defaults = DisplayFormat::default();
        let display = DisplayFormat::new(
            var("PRICE_MATRIX_CURRENCY").unwrap_or(defaults.currency),
            var("PRICE_MATRIX_TONNAGE_UNIT").unwrap_or(defaults.tonnage_unit),
        );

        Ok(Self {
            database_url,
            database_max_connections,
            bind_addr,
            layout,
            display,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/pm")])).unwrap();

        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.layout, MatrixLayout::standard());
        assert_eq!(config.display, DisplayFormat::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pm"),
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("PRICE_MATRIX_LAYOUT", "coarse"),
            ("PRICE_MATRIX_CURRENCY", "UGX"),
            ("PRICE_MATRIX_TONNAGE_UNIT", "t/week"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.database_max_connections, 12);
        assert_eq!(config.layout, MatrixLayout::coarse());
        assert_eq!(config.display, DisplayFormat::new("UGX", "t/week"));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pm"),
            ("BIND_ADDR", "not-an-address"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BIND_ADDR"));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pm"),
            ("PRICE_MATRIX_LAYOUT", "premium"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Layout(_)));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pm"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));
    }
}
