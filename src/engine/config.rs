//! Engine configuration
//!
//! Sources, lowest precedence first: [`EngineConfig::default`], a TOML
//! document, then `REXVM_*` environment variables.
//!
//! ```toml
//! jit_enabled = true
//! backref_policy = "defer"
//! native_backtrack_capacity = 20000
//! trace = false
//!
//! [cache_policy]
//! kind = "lru"
//! capacity = 128
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::cache::CachePolicy;
use crate::backend::hybrid::HybridConfig;
use crate::backend::jit::{BackrefPolicy, DEFAULT_BACKTRACK_CAPACITY, JIT_ENABLED};

/// `true` / `false` override for native compilation
pub const ENV_JIT: &str = "REXVM_JIT";
/// LRU retention size; `0` selects the weak-only cache
pub const ENV_CACHE_CAPACITY: &str = "REXVM_CACHE_CAPACITY";
/// Native backtrack stack capacity
pub const ENV_NATIVE_BACKTRACK_CAPACITY: &str = "REXVM_NATIVE_BACKTRACK_CAPACITY";
/// Per-step interpreter tracing
pub const ENV_TRACE: &str = "REXVM_TRACE";

/// Errors while loading configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read
    Io { path: PathBuf, source: std::io::Error },
    /// TOML syntax or schema error
    Parse(toml::de::Error),
    /// A value is out of range or malformed
    InvalidValue { key: String, value: String, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Failed to read config file {}: {}", path.display(), source)
            }
            Self::Parse(err) => write!(f, "Invalid config: {}", err),
            Self::InvalidValue { key, value, reason } => {
                write!(f, "Invalid value {:?} for {}: {}", value, key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Settings of an [`super::Engine`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempt native compilation of new handles
    pub jit_enabled: bool,
    /// Native handling of backreferences
    pub backref_policy: BackrefPolicy,
    /// Backtrack stack capacity of one native attempt
    pub native_backtrack_capacity: usize,
    /// Per-step interpreter tracing
    pub trace: bool,
    /// Pattern cache retention
    pub cache_policy: CachePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            jit_enabled: JIT_ENABLED,
            backref_policy: BackrefPolicy::default(),
            native_backtrack_capacity: DEFAULT_BACKTRACK_CAPACITY,
            trace: false,
            cache_policy: CachePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `REXVM_*` variables from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `REXVM_*` overrides read through `lookup`
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_JIT) {
            self.jit_enabled = parse_bool(ENV_JIT, &value)?;
        }
        if let Some(value) = lookup(ENV_CACHE_CAPACITY) {
            self.cache_policy = match parse_usize(ENV_CACHE_CAPACITY, &value)? {
                0 => CachePolicy::Weak,
                capacity => CachePolicy::Lru { capacity },
            };
        }
        if let Some(value) = lookup(ENV_NATIVE_BACKTRACK_CAPACITY) {
            self.native_backtrack_capacity = parse_usize(ENV_NATIVE_BACKTRACK_CAPACITY, &value)?;
        }
        if let Some(value) = lookup(ENV_TRACE) {
            self.trace = parse_bool(ENV_TRACE, &value)?;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.native_backtrack_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "native_backtrack_capacity".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        if self.cache_policy == (CachePolicy::Lru { capacity: 0 }) {
            return Err(ConfigError::InvalidValue {
                key: "cache_policy.capacity".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1",
            });
        }
        Ok(self)
    }

    /// Matcher configuration for new handles
    pub fn hybrid_config(&self) -> HybridConfig {
        let config = HybridConfig {
            jit_enabled: self.jit_enabled,
            backref_policy: self.backref_policy,
            native_backtrack_capacity: self.native_backtrack_capacity,
            ..HybridConfig::default()
        };
        if self.trace {
            config.with_trace()
        } else {
            config
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a boolean",
        }),
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected a non-negative integer",
    })
}
