//! Mock server configuration, read from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `MOCK_BIND` | `0.0.0.0:$PORT` | listen address |
//! | `PORT` | `8080` | port when `MOCK_BIND` is unset |
//! | `MOCK_SEED` | `42` | synthesis seed |
//! | `MOCK_TOTAL_REVIEWS` | `500` | reviews per app |
//! | `MOCK_LOG_JSON` | `false` | JSON log lines |

use std::env;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TOTAL_REVIEWS: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name}='{value}' is not a valid {expected}")]
    InvalidVar {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConfig {
    pub bind: String,
    pub seed: u64,
    pub total_reviews: usize,
    pub log_json: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            bind: format!("0.0.0.0:{DEFAULT_PORT}"),
            seed: DEFAULT_SEED,
            total_reviews: DEFAULT_TOTAL_REVIEWS,
            log_json: false,
        }
    }
}

impl MockConfig {
    /// # Errors
    ///
    /// [`ConfigError::InvalidVar`] when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = match lookup("MOCK_BIND") {
            Some(bind) => bind,
            None => {
                let port: u16 = parsed(&lookup, "PORT", "port number")?.unwrap_or(DEFAULT_PORT);
                format!("0.0.0.0:{port}")
            }
        };
        Ok(Self {
            bind,
            seed: parsed(&lookup, "MOCK_SEED", "unsigned integer")?.unwrap_or(DEFAULT_SEED),
            total_reviews: parsed(&lookup, "MOCK_TOTAL_REVIEWS", "review count")?
                .unwrap_or(DEFAULT_TOTAL_REVIEWS),
            log_json: lookup("MOCK_LOG_JSON").is_some_and(|v| env_bool(&v)),
        })
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name,
                value,
                expected,
            })
        })
        .transpose()
}

fn env_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
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
    fn defaults_apply_when_nothing_is_set() {
        assert_eq!(MockConfig::from_lookup(lookup(&[])).unwrap(), MockConfig::default());
    }

    #[test]
    fn port_is_used_only_without_explicit_bind() {
        let config = MockConfig::from_lookup(lookup(&[("PORT", "9000")])).unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        let config =
            MockConfig::from_lookup(lookup(&[("PORT", "9000"), ("MOCK_BIND", "127.0.0.1:7000")]))
                .unwrap();
        assert_eq!(config.bind, "127.0.0.1:7000");
    }

    #[test]
    fn numeric_variables_are_validated() {
        let config =
            MockConfig::from_lookup(lookup(&[("MOCK_SEED", "7"), ("MOCK_TOTAL_REVIEWS", "25")]))
                .unwrap();
        assert_eq!((config.seed, config.total_reviews), (7, 25));
        assert!(matches!(
            MockConfig::from_lookup(lookup(&[("MOCK_TOTAL_REVIEWS", "many")])),
            Err(ConfigError::InvalidVar {
                name: "MOCK_TOTAL_REVIEWS",
                ..
            })
        ));
    }
}
