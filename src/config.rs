//! Application configuration, read from the environment (and a `.env` file, if present).

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::query::CaseSensitivity;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub host: String,

    pub port: u16,

    /// PostgreSQL connection URL. Without one the catalog lives in memory.
    pub database_url: Option<String>,

    pub search_case: CaseSensitivity,

    /// Directory served under `/static`
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_url: None,
            search_case: CaseSensitivity::Insensitive,
            static_dir: PathBuf::from("public"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let port = match env::var("PORT") {
            Ok(port) => port.parse().with_context(|| format!("Invalid PORT: {port}"))?,
            Err(_) => defaults.port,
        };

        let search_case = match env::var("SEARCH_CASE_SENSITIVE") {
            Ok(value) if parse_flag(&value)? => CaseSensitivity::Sensitive,
            _ => CaseSensitivity::Insensitive,
        };

        Ok(Config {
            host: env::var("HOST").unwrap_or(defaults.host),
            port,
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            search_case,
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
        })
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("Invalid SEARCH_CASE_SENSITIVE value: {other}"),
    }
}
