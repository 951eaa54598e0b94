//! Relation engine configuration
//!
//! Loaded from environment variables: start from defaults, override whatever
//! is set, reject values that do not parse.

use std::env;

use thiserror::Error;

/// Environment variable toggling the empty through-set short-circuit
pub const SHORT_CIRCUIT_EMPTY_THROUGH_ENV: &str = "DOCREL_SHORT_CIRCUIT_EMPTY_THROUGH";

/// Environment variable toggling foreign key value coercion
pub const COERCE_FOREIGN_KEYS_ENV: &str = "DOCREL_COERCE_FOREIGN_KEYS";

/// Configuration error type
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// Tunables for relation resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationConfig {
    /// Return an empty cursor without querying the target collection when a
    /// through relation resolves to an empty id set
    pub short_circuit_empty_through: bool,
    /// Stringify numeric and boolean foreign key values before matching them
    /// against target identities
    pub coerce_foreign_keys: bool,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            short_circuit_empty_through: false,
            coerce_foreign_keys: true,
        }
    }
}

impl RelationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(value) = env::var(SHORT_CIRCUIT_EMPTY_THROUGH_ENV) {
            config.short_circuit_empty_through =
                parse_bool("short_circuit_empty_through", &value)?;
        }

        if let Ok(value) = env::var(COERCE_FOREIGN_KEYS_ENV) {
            config.coerce_foreign_keys = parse_bool("coerce_foreign_keys", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment, falling back to defaults
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_else(|error| {
            tracing::warn!("Ignoring relation config from environment: {}", error);
            Self::default()
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Every combination of the current flags is valid.
        Ok(())
    }

    /// Builder-style setter for the empty through-set short-circuit
    pub fn with_short_circuit_empty_through(mut self, enabled: bool) -> Self {
        self.short_circuit_empty_through = enabled;
        self
    }

    /// Builder-style setter for foreign key coercion
    pub fn with_coerce_foreign_keys(mut self, enabled: bool) -> Self {
        self.coerce_foreign_keys = enabled;
        self
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid_value(
            field,
            value,
            "a boolean (true/false, 1/0, yes/no, on/off)",
        )),
    }
}
