//! Hook configuration and the configuration service abstraction.
//!
//! Configuration is loaded from `~/.config/cloudhook/config.toml`. Any value
//! can be overridden with an environment variable named
//! `CLOUDHOOK__<SECTION>__<KEY>`.
//!
//! ## Example Configuration
//!
//! ```toml
//! [proxy]
//! use_proxy = true
//! proxy_host = "abc.com"
//! proxy_port = 8080
//! proxy_type = "HTTP_NO_TUNNEL"
//!
//! [hook]
//! scopes = ["https://www.googleapis.com/auth/cloud-platform"]
//! timeout_seconds = 60
//! num_retries = 5
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ConfigError, Result};
use crate::proxy::ProxyDescriptor;

/// Section holding the proxy flag and descriptor.
pub const PROXY_SECTION: &str = "proxy";

/// Key of the boolean flag that enables proxying.
pub const USE_PROXY_KEY: &str = "use_proxy";

/// Section holding hook settings.
pub const HOOK_SECTION: &str = "hook";

/// Prefix of environment variables that override file values.
pub const ENV_PREFIX: &str = "CLOUDHOOK";

/// OAuth scope requested when none is configured.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Read access to the settings the hook depends on.
///
/// Implementations must be safe to share between concurrent authorization
/// calls; the hook only ever reads through this trait.
pub trait ConfigurationService: Send + Sync {
    /// Reads a boolean setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when the section or key is absent,
    /// and [`ConfigError::InvalidValue`] when the value is not a boolean.
    fn get_boolean(&self, section: &str, key: &str) -> Result<bool>;

    /// Reads the proxy descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if any descriptor field is missing or malformed.
    fn get_proxy_config(&self) -> Result<ProxyDescriptor>;

    /// Reads hook settings, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a present setting is malformed.
    fn settings(&self) -> Result<HookSettings> {
        Ok(HookSettings::default())
    }
}

/// Retry behaviour for transient HTTP failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts before failing.
    pub max_retries: u32,
    /// Initial delay before the first retry attempt.
    pub initial_delay: Duration,
    /// Maximum delay between retry attempts (caps exponential growth).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Settings applied to every authorized client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSettings {
    /// OAuth scopes requested from the credential provider.
    pub scopes: Vec<String>,
    /// Request timeout in seconds. `None` means no timeout.
    pub timeout_seconds: Option<u64>,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            scopes: vec![DEFAULT_SCOPE.to_string()],
            timeout_seconds: None,
            retry: RetryConfig::default(),
        }
    }
}

/// The `[hook]` section as written in configuration.
#[derive(Debug, Deserialize)]
struct HookSection {
    #[serde(default = "default_scopes")]
    scopes: ScopeList,
    #[serde(default)]
    timeout_seconds: Option<u64>,
    #[serde(default = "default_num_retries")]
    num_retries: u32,
}

/// Scopes given either as an array or as one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScopeList {
    Many(Vec<String>),
    Joined(String),
}

impl ScopeList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Many(scopes) => scopes,
            Self::Joined(joined) => joined
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

fn default_scopes() -> ScopeList {
    ScopeList::Many(vec![DEFAULT_SCOPE.to_string()])
}

fn default_num_retries() -> u32 {
    RetryConfig::default().max_retries
}

impl From<HookSection> for HookSettings {
    fn from(section: HookSection) -> Self {
        Self {
            scopes: section.scopes.into_vec(),
            timeout_seconds: section.timeout_seconds,
            retry: RetryConfig {
                max_retries: section.num_retries,
                ..RetryConfig::default()
            },
        }
    }
}

/// Configuration backed by a TOML document with environment overrides.
#[derive(Debug, Clone, Default)]
pub struct TomlConfiguration {
    table: toml::Table,
}

impl FromStr for TomlConfiguration {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self {
            table: toml::from_str(s)?,
        })
    }
}

impl TomlConfiguration {
    /// Loads configuration from the default location.
    ///
    /// A missing file is treated as an empty configuration, so every lookup
    /// reports [`ConfigError::NotFound`] unless overridden from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined or the
    /// file exists but cannot be read or parsed.
    pub fn load_default() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            debug!("No configuration file at {}, using defaults", path.display());
            return Ok(Self::default().with_env_overrides());
        }

        Self::load(&path)
    }

    /// Loads configuration from `path` and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = contents.parse()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config.with_env_overrides())
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("cloudhook");

        Ok(config_dir.join("config.toml"))
    }

    /// Applies overrides from `CLOUDHOOK__<SECTION>__<KEY>` variables in the
    /// process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::vars())
    }

    /// Applies overrides from `(name, value)` pairs using the environment
    /// variable naming scheme. Pairs that do not match the scheme are ignored.
    ///
    /// Values are read as TOML values (`8080`, `true`, `["a", "b"]`); anything
    /// that does not parse is kept as a plain string.
    #[must_use]
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in vars {
            let Some((section, key)) = parse_override_name(name.as_ref()) else {
                continue;
            };

            let slot = self
                .table
                .entry(section)
                .or_insert_with(|| toml::Value::Table(toml::Table::new()));
            if !slot.is_table() {
                *slot = toml::Value::Table(toml::Table::new());
            }
            if let Some(table) = slot.as_table_mut() {
                table.insert(key, parse_override_value(value.into()));
            }
        }
        self
    }

    fn section(&self, section: &str) -> Option<&toml::Value> {
        self.table.get(section)
    }

    /// Deserializes a whole section.
    ///
    /// A missing section deserializes from an empty table, so serde defaults
    /// apply.
    fn decode_section<T>(&self, section: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.section(section)
            .cloned()
            .unwrap_or_else(|| toml::Value::Table(toml::Table::new()))
            .try_into()
            .map_err(|source| ConfigError::Decode {
                section: section.to_string(),
                source,
            })
    }
}

impl ConfigurationService for TomlConfiguration {
    fn get_boolean(&self, section: &str, key: &str) -> Result<bool> {
        let value = self
            .section(section)
            .and_then(toml::Value::as_table)
            .and_then(|t| t.get(key))
            .ok_or_else(|| ConfigError::not_found(section, key))?;

        let parsed = match value {
            toml::Value::Boolean(b) => Some(*b),
            toml::Value::Integer(0) => Some(false),
            toml::Value::Integer(1) => Some(true),
            toml::Value::String(s) => parse_bool(s),
            _ => None,
        };
        parsed.ok_or_else(|| ConfigError::invalid(section, key, "boolean"))
    }

    fn get_proxy_config(&self) -> Result<ProxyDescriptor> {
        if self.section(PROXY_SECTION).is_none() {
            return Err(ConfigError::not_found(PROXY_SECTION, "proxy_host"));
        }
        self.decode_section(PROXY_SECTION)
    }

    fn settings(&self) -> Result<HookSettings> {
        self.decode_section::<HookSection>(HOOK_SECTION)
            .map(HookSettings::from)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "on" => Some(true),
        "false" | "f" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_override_value(raw: String) -> toml::Value {
    raw.parse().unwrap_or(toml::Value::String(raw))
}

fn parse_override_name(name: &str) -> Option<(String, String)> {
    let rest = name.strip_prefix(ENV_PREFIX)?.strip_prefix("__")?;
    let (section, key) = rest.split_once("__")?;
    if section.is_empty() || key.is_empty() {
        return None;
    }
    Some((section.to_lowercase(), key.to_lowercase()))
}
