//! # Configuration
//!
//! A small string key/value store, loaded from `UPLOADTHING_*` environment
//! variables or set programmatically. Handler construction reads a
//! [`UtConfigSnapshot`] once, so configuration problems surface before the
//! first request.
//!
//! ```rust
//! use ut_core::UtConfig;
//!
//! let mut config = UtConfig::new();
//! config.set("secret", "sk_live_xxx");
//!
//! let snap = config.snapshot();
//! assert_eq!(snap.get("secret"), Some("sk_live_xxx"));
//! assert_eq!(snap.api_url(), "https://api.uploadthing.com");
//! ```
//!
//! Environment variables map to keys by stripping the prefix, lowercasing
//! and turning `_` into `.`:
//!
//! ```bash
//! export UPLOADTHING_SECRET=sk_live_xxx     # secret
//! export UPLOADTHING_URL=https://my.app     # url (callback base)
//! export UPLOADTHING_API_URL=http://ingest  # api.url
//! export UPLOADTHING_LOG_LEVEL=debug        # log.level
//! ```

use std::collections::HashMap;

pub const ENV_PREFIX: &str = "UPLOADTHING_";
pub const DEFAULT_API_URL: &str = "https://api.uploadthing.com";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

pub const KEY_SECRET: &str = "secret";
pub const KEY_CALLBACK_URL: &str = "url";
pub const KEY_API_URL: &str = "api.url";
pub const KEY_LOG_LEVEL: &str = "log.level";
pub const KEY_BODY_LIMIT: &str = "body.limit";

#[derive(Debug, Default, Clone)]
pub struct UtConfig {
    values: HashMap<String, String>,
}

impl UtConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Load every `UPLOADTHING_*` variable from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Load from an explicit list of `(name, value)` pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::new();
        for (key, value) in vars {
            if let Some(stripped) = key.as_ref().strip_prefix(ENV_PREFIX) {
                let normalized = stripped.to_lowercase().replace('_', ".");
                config.set(normalized, value);
            }
        }
        config
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style [`UtConfig::set`].
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> UtConfigSnapshot {
        UtConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct UtConfigSnapshot {
    map: HashMap<String, String>,
}

impl UtConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map
            .get(key)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }

    pub fn secret(&self) -> Option<&str> {
        self.get(KEY_SECRET)
    }

    pub fn api_url(&self) -> &str {
        self.get(KEY_API_URL)
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
    }

    pub fn callback_url(&self) -> Option<&str> {
        self.get(KEY_CALLBACK_URL)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.get(KEY_LOG_LEVEL)
    }

    pub fn body_limit(&self) -> usize {
        self.get_usize(KEY_BODY_LIMIT).unwrap_or(DEFAULT_BODY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_names_are_normalized() {
        let config = UtConfig::from_vars([
            ("UPLOADTHING_SECRET", "sk_test"),
            ("UPLOADTHING_API_URL", "http://localhost:9000/"),
            ("UPLOADTHING_LOG_LEVEL", "debug"),
            ("PATH", "/usr/bin"),
        ]);
        let snap = config.snapshot();
        assert_eq!(snap.secret(), Some("sk_test"));
        assert_eq!(snap.api_url(), "http://localhost:9000");
        assert_eq!(snap.log_level(), Some("debug"));
        assert!(!config.has("path"));
    }

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let snap = UtConfig::new().with("secret", "  ").snapshot();
        assert_eq!(snap.secret(), None);
        assert_eq!(snap.api_url(), DEFAULT_API_URL);
        assert_eq!(snap.body_limit(), DEFAULT_BODY_LIMIT);
        assert_eq!(snap.callback_url(), None);
    }
}
