mod loader;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
    /// The loaded values violate a cross-field rule.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Validation(details) => {
                write!(f, "Config validation errors:")?;
                for detail in details {
                    write!(f, "\n  - {detail}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Keys read by [`ApiConfig`]. Each one can be overridden by the
/// environment variable `ROUTEKIT_<KEY>` (dots become underscores).
pub const CONFIG_KEYS: &[&str] = &[
    "openapi.title",
    "openapi.version",
    "openapi.description",
    "openapi.servers",
    "pagination.default_per_page",
    "pagination.max_per_page",
    "storage.dialect",
];

/// Flattened key/value view of a configuration source.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    values: HashMap<String, ConfigValue>,
}

impl RawConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(Self { values })
    }

    /// Load a YAML file; a missing file yields an empty config.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_file(path.as_ref(), &mut values)?;
        Ok(Self { values })
    }

    /// Overlay `ROUTEKIT_*` environment variables for the known keys.
    pub fn apply_env(&mut self) {
        for key in CONFIG_KEYS {
            if let Ok(val) = std::env::var(loader::env_var_for(key)) {
                tracing::debug!(key, "Config key overridden from environment");
                self.values.insert((*key).to_string(), ConfigValue::String(val));
            }
        }
    }

    pub fn get<T: FromConfigValue>(&self, key: &str) -> Result<T, ConfigError> {
        match self.values.get(key) {
            Some(v) => T::from_config_value(v, key),
            None => Err(ConfigError::NotFound(key.to_string())),
        }
    }

    pub fn get_or<T: FromConfigValue>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.values.get(key) {
            Some(ConfigValue::Null) | None => Ok(default),
            Some(v) => T::from_config_value(v, key),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }
}

/// Document metadata for the assembled OpenAPI document.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiSection {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub servers: Vec<String>,
}

impl Default for OpenApiSection {
    fn default() -> Self {
        Self {
            title: "API".into(),
            version: "0.1.0".into(),
            description: None,
            servers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_per_page: u64,
    pub max_per_page: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            max_per_page: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSection {
    /// `sqlite`, `postgres` or `generic`.
    pub dialect: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            dialect: "sqlite".into(),
        }
    }
}

/// Typed application configuration.
///
/// Resolution order (lowest to highest priority):
/// 1. built-in defaults
/// 2. the YAML file
/// 3. `.env` file (loaded into the process environment, never overwriting)
/// 4. `ROUTEKIT_*` environment variables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiConfig {
    pub openapi: OpenApiSection,
    pub pagination: PaginationConfig,
    pub storage: StorageSection,
}

impl ApiConfig {
    /// Parse YAML without consulting the environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Self::from_raw(&RawConfig::from_yaml_str(yaml)?)
    }

    /// Load `path`, then `.env`, then the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut raw = RawConfig::from_file(path)?;
        let _ = dotenvy::dotenv();
        raw.apply_env();
        Self::from_raw(&raw)
    }

    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            openapi: OpenApiSection {
                title: raw.get_or("openapi.title", defaults.openapi.title)?,
                version: raw.get_or("openapi.version", defaults.openapi.version)?,
                description: raw.get_or("openapi.description", None)?,
                servers: raw.get_or("openapi.servers", Vec::new())?,
            },
            pagination: PaginationConfig {
                default_per_page: raw.get_or(
                    "pagination.default_per_page",
                    defaults.pagination.default_per_page,
                )?,
                max_per_page: raw
                    .get_or("pagination.max_per_page", defaults.pagination.max_per_page)?,
            },
            storage: StorageSection {
                dialect: raw.get_or("storage.dialect", defaults.storage.dialect)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        let p = &self.pagination;
        if p.default_per_page < 1 {
            problems.push("pagination.default_per_page: must be at least 1".to_string());
        }
        if p.max_per_page < 1 {
            problems.push("pagination.max_per_page: must be at least 1".to_string());
        }
        if p.default_per_page > p.max_per_page {
            problems.push(format!(
                "pagination.default_per_page: {} exceeds max_per_page {}",
                p.default_per_page, p.max_per_page
            ));
        }
        if !matches!(self.storage.dialect.as_str(), "sqlite" | "postgres" | "generic") {
            problems.push(format!(
                "storage.dialect: unknown dialect '{}'",
                self.storage.dialect
            ));
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_yaml() {
        let raw = RawConfig::from_yaml_str(
            "openapi:\n  title: Users\n  servers:\n    - https://a.example\npagination:\n  max_per_page: 50\n",
        )
        .unwrap();
        assert_eq!(raw.get::<String>("openapi.title").unwrap(), "Users");
        assert_eq!(raw.get::<u64>("pagination.max_per_page").unwrap(), 50);
        assert_eq!(
            raw.get::<Vec<String>>("openapi.servers").unwrap(),
            vec!["https://a.example".to_string()]
        );
        assert!(matches!(
            raw.get::<String>("missing"),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn type_mismatch_names_the_key() {
        let raw = RawConfig::from_yaml_str("pagination:\n  max_per_page: lots\n").unwrap();
        let err = raw.get::<u64>("pagination.max_per_page").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config type mismatch for 'pagination.max_per_page': expected i64"
        );
    }

    #[test]
    fn defaults_apply_to_empty_document() {
        let config = ApiConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ApiConfig::default());
        assert_eq!(config.pagination.default_per_page, 20);
        assert_eq!(config.pagination.max_per_page, 100);
    }

    #[test]
    fn default_above_max_is_rejected() {
        let err = ApiConfig::from_yaml_str(
            "pagination:\n  default_per_page: 200\n  max_per_page: 100\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref d) if d.len() == 1));
    }

    #[test]
    fn unknown_dialect_is_rejected() {
        let err = ApiConfig::from_yaml_str("storage:\n  dialect: oracle\n").unwrap_err();
        assert!(err.to_string().contains("unknown dialect 'oracle'"));
    }

    #[test]
    fn env_var_names() {
        assert_eq!(
            loader::env_var_for("pagination.max_per_page"),
            "ROUTEKIT_PAGINATION_MAX_PER_PAGE"
        );
    }
}
