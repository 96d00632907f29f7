//! Connection targets and configuration
//!
//! A target is either `:memory:` or a URL of the form
//! `memory://[name][?autocommit=on|off&foreign_keys=on|off]`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Target for a private, unnamed in-memory database
pub const MEMORY_TARGET: &str = ":memory:";

/// The only URL scheme arclite accepts
pub const MEMORY_SCHEME: &str = "memory";

/// Name given to databases opened without one
pub const DEFAULT_DATABASE_NAME: &str = "main";

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Database name, used in logs and by the CLI prompt
    pub name: String,
    /// Commit each statement outside an explicit transaction immediately
    pub auto_commit: bool,
    /// Check REFERENCES constraints when writes are applied
    pub foreign_keys: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DATABASE_NAME.to_string(),
            auto_commit: true,
            foreign_keys: true,
        }
    }
}

impl ConnectionConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the auto-commit default for new connections
    pub fn auto_commit(mut self, auto_commit: bool) -> Self {
        self.auto_commit = auto_commit;
        self
    }

    /// Enable or disable foreign key enforcement
    pub fn foreign_keys(mut self, foreign_keys: bool) -> Self {
        self.foreign_keys = foreign_keys;
        self
    }

    /// Parse a connect target
    pub fn parse(target: &str) -> Result<Self> {
        let target = target.trim();
        if target == MEMORY_TARGET {
            return Ok(Self::default());
        }

        let url = TargetUrl::parse(target)?;
        let mut config = Self::default();
        if !url.name.is_empty() {
            config.name = url.name;
        }

        for (key, value) in &url.options {
            let enabled = parse_switch(key, value)?;
            match key.as_str() {
                "autocommit" => config.auto_commit = enabled,
                "foreign_keys" => config.foreign_keys = enabled,
                _ => return Err(Error::Connection(format!("unknown option '{}'", key))),
            }
        }

        Ok(config)
    }
}

impl FromStr for ConnectionConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Parsed target URL components
/// Format: memory://[name][?key=value&...]
#[derive(Debug, Clone, PartialEq)]
pub struct TargetUrl {
    /// URL scheme, always "memory" once parsed
    pub scheme: String,
    /// Database name, possibly empty
    pub name: String,
    /// Query options in the order given
    pub options: Vec<(String, String)>,
}

impl TargetUrl {
    /// Parse a target URL string
    pub fn parse(url: &str) -> Result<Self> {
        if url.is_empty() {
            return Err(Error::Connection("empty connection target".to_string()));
        }

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| Error::Connection(format!("invalid target '{}': missing scheme", url)))?;

        if !scheme.eq_ignore_ascii_case(MEMORY_SCHEME) {
            return Err(Error::Connection(format!(
                "unsupported scheme '{}', expected '{}'",
                scheme, MEMORY_SCHEME
            )));
        }

        // Split name from query
        let (name, query) = match rest.split_once('?') {
            Some((name, query)) => (name, Some(query)),
            None => (rest, None),
        };

        if let Some(bad) = name.chars().find(|c| matches!(c, '/' | '@' | ':' | '&' | '=')) {
            return Err(Error::Connection(format!(
                "invalid character '{}' in database name '{}'",
                bad, name
            )));
        }

        let mut options = Vec::new();
        if let Some(query) = query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    Error::Connection(format!("option '{}' needs a value", pair))
                })?;
                options.push((key.to_ascii_lowercase(), value.to_string()));
            }
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            name: name.to_string(),
            options,
        })
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.name)?;
        for (i, (key, value)) in self.options.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}

fn parse_switch(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(Error::Connection(format!(
            "invalid value '{}' for option '{}', expected on or off",
            value, key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConnectionConfig::new()
            .name("ledger")
            .auto_commit(false)
            .foreign_keys(false);

        assert_eq!(config.name, "ledger");
        assert!(!config.auto_commit);
        assert!(!config.foreign_keys);
    }

    #[test]
    fn test_memory_target() {
        assert_eq!(ConnectionConfig::parse(":memory:").unwrap(), ConnectionConfig::default());
    }

    #[test]
    fn test_target_url_full() {
        let url = TargetUrl::parse("memory://bank?autocommit=off&foreign_keys=on").unwrap();
        assert_eq!(url.scheme, "memory");
        assert_eq!(url.name, "bank");
        assert_eq!(
            url.options,
            vec![
                ("autocommit".to_string(), "off".to_string()),
                ("foreign_keys".to_string(), "on".to_string())
            ]
        );
        assert_eq!(url.to_string(), "memory://bank?autocommit=off&foreign_keys=on");

        let config: ConnectionConfig = "memory://bank?autocommit=off".parse().unwrap();
        assert_eq!(config.name, "bank");
        assert!(!config.auto_commit);
        assert!(config.foreign_keys);
    }

    #[test]
    fn test_target_url_minimal() {
        let config = ConnectionConfig::parse("memory://").unwrap();
        assert_eq!(config.name, DEFAULT_DATABASE_NAME);

        let config = ConnectionConfig::parse("memory://?foreign_keys=off").unwrap();
        assert!(!config.foreign_keys);
    }

    #[test]
    fn test_malformed_targets() {
        for target in [
            "",
            "bank.db",
            "postgres://localhost:5432/db",
            "memory://a/b",
            "memory://bank?autocommit",
            "memory://bank?autocommit=maybe",
            "memory://bank?cache=on",
        ] {
            assert!(
                matches!(ConnectionConfig::parse(target), Err(Error::Connection(_))),
                "target {:?} should be rejected",
                target
            );
        }
    }
}
