//! Connection Configuration
//!
//! Connection parameters and the optional `sapnwrfc.toml` configuration file.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ffi::LibraryLoader;

/// Name of the configuration file searched for by [`RfcConfig::find_and_load`].
pub const CONFIG_FILE_NAME: &str = "sapnwrfc.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid connection parameter '{0}', expected KEY=VALUE")]
    InvalidParameter(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Keys whose values never show up in `Debug` output.
const SECRET_KEYS: &[&str] = &["PASSWD", "MYSAPSSO2", "X509CERT"];

/// Ordered, case-insensitive set of RFC connection parameters.
///
/// Keys are stored upper-cased, so `ashost` and `ASHOST` name the same
/// parameter; setting an existing key replaces its value in place. Keys the
/// crate has no helper for are handed to the RFC library untouched.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, String>", into = "IndexMap<String, String>")]
pub struct ConnectionParameters {
    entries: IndexMap<String, String>,
}

macro_rules! parameter_setters {
    ($($(#[$meta:meta])* $method:ident => $key:literal,)+) => {
        $(
            $(#[$meta])*
            pub fn $method(self, value: impl Into<String>) -> Self {
                self.with($key, value)
            }
        )+
    };
}

impl ConnectionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any value stored under the same key
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.trim().to_ascii_uppercase(), value.into());
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.trim().to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(&key.trim().to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy `other` on top of these parameters
    pub fn merge(&mut self, other: &ConnectionParameters) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    /// Parse a `KEY=VALUE` pair as given on a command line
    pub fn parse_pair(pair: &str) -> ConfigResult<(String, String)> {
        match pair.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(ConfigError::InvalidParameter(pair.to_string())),
        }
    }

    /// Flattened `(name, value)` list in insertion order, as the native open call takes it
    pub fn to_native(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    parameter_setters! {
        /// Application server host
        app_server_host => "ASHOST",
        /// Two digit instance number
        system_number => "SYSNR",
        /// Three digit logon client
        client => "CLIENT",
        user => "USER",
        password => "PASSWD",
        /// Logon language (one or two letter code)
        language => "LANG",
        /// Message server host, for load-balanced logon
        message_server_host => "MSHOST",
        message_server_service => "MSSERV",
        system_id => "SYSID",
        logon_group => "GROUP",
        sap_router => "SAPROUTER",
        gateway_host => "GWHOST",
        gateway_service => "GWSERV",
        /// Destination name in `sapnwrfc.ini`
        destination => "DEST",
        /// RFC trace level, `0` to `3`
        trace => "TRACE",
    }
}

impl From<IndexMap<String, String>> for ConnectionParameters {
    fn from(map: IndexMap<String, String>) -> Self {
        let mut params = ConnectionParameters::new();
        for (key, value) in map {
            params.set(&key, value);
        }
        params
    }
}

impl From<ConnectionParameters> for IndexMap<String, String> {
    fn from(params: ConnectionParameters) -> Self {
        params.entries
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ConnectionParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = ConnectionParameters::new();
        for (key, value) in iter {
            params.set(key.as_ref(), value);
        }
        params
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.entries {
            if SECRET_KEYS.contains(&key.as_str()) {
                map.entry(key, &"***");
            } else {
                map.entry(key, value);
            }
        }
        map.finish()
    }
}

/// Root configuration structure matching sapnwrfc.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RfcConfig {
    /// Where to look for the SDK libraries
    #[serde(default)]
    pub library: LibraryConfig,

    /// Connection parameters, in the order they are given
    #[serde(default)]
    pub connection: ConnectionParameters,
}

/// SDK library lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LibraryConfig {
    /// Directories searched before the platform library path
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

impl RfcConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: RfcConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// A library loader that tries the configured search paths first, in order.
    pub fn library_loader(&self) -> LibraryLoader {
        let mut loader = LibraryLoader::new();
        for path in self.library.search_paths.iter().rev() {
            loader.add_search_path(path);
        }
        loader
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }
}
