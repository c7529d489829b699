use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DATA_FILE: &str = "registrations.csv";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_EXPORT_PREFIX: &str = "registrations";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {name} '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub data_file: String,
    pub host: IpAddr,
    pub port: u16,
    pub export_file_prefix: String,
    pub cors_allowed_origins: String,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let host_raw = var("HOST", DEFAULT_HOST);
        let host = host_raw.parse::<IpAddr>().map_err(|_| ConfigError::Invalid {
            name: "HOST",
            value: host_raw.clone(),
        })?;

        let port_raw = var("PORT", DEFAULT_PORT.to_string().as_str());
        let port = port_raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value: port_raw.clone(),
        })?;

        let export_file_prefix = var("EXPORT_FILE_PREFIX", DEFAULT_EXPORT_PREFIX);
        if export_file_prefix.contains('"')
            || axum::http::HeaderValue::from_str(&export_file_prefix).is_err()
        {
            return Err(ConfigError::Invalid {
                name: "EXPORT_FILE_PREFIX",
                value: export_file_prefix,
            });
        }

        Ok(Self {
            data_dir: PathBuf::from(var("DATA_DIR", DEFAULT_DATA_DIR)),
            data_file: var("DATA_FILE", DEFAULT_DATA_FILE),
            host,
            port,
            export_file_prefix,
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS", cors::DEFAULT_ALLOWED_ORIGINS),
            production: lookup("RUST_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
        })
    }

    /// Registrations file, relative to the working directory unless absolute.
    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join(&self.data_file)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            data_file: DEFAULT_DATA_FILE.to_string(),
            host: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            export_file_prefix: DEFAULT_EXPORT_PREFIX.to_string(),
            cors_allowed_origins: cors::DEFAULT_ALLOWED_ORIGINS.to_string(),
            production: false,
        }
    }
}
