//! Settings for the binary: endpoint, timeout, bind address, failure policy.
//!
//! Sources, lowest precedence first: built-in defaults, the `--config` TOML
//! file, command-line flags. Session parameters (key, model, sampling) are
//! never read from or written to a file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thinkchain_agent::FailurePolicy;
use thinkchain_gateway::{Error, ProviderConfig, Result};

pub const DEFAULT_BIND: &str = "127.0.0.1:7860";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub bind: Option<String>,
    pub failure_policy: Option<FailurePolicy>,
    pub headers: HashMap<String, String>,
}

impl Settings {
    /// Read a settings file. A missing file is an error: it was asked for explicitly.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;

        toml::from_str(&content).map_err(|e| {
            Error::config_invalid(format!("failed to parse {}: {}", path.display(), e))
                .with_operation("settings::load")
                .set_source(e)
        })
    }

    /// Merge with `other`, preferring values from `other` when present
    pub fn merge(&self, other: &Self) -> Self {
        let mut headers = self.headers.clone();
        headers.extend(other.headers.clone());

        Self {
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            bind: other.bind.clone().or_else(|| self.bind.clone()),
            failure_policy: other.failure_policy.or(self.failure_policy),
            headers,
        }
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::new();
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(secs);
        }
        for (key, value) in &self.headers {
            config = config.with_header(key.clone(), value.clone());
        }
        config
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let bind = self.bind.as_deref().unwrap_or(DEFAULT_BIND);
        bind.parse().map_err(|e| {
            Error::config_invalid(format!("invalid bind address '{}': {}", bind, e))
                .with_context("param", "bind")
        })
    }

    pub fn policy(&self) -> FailurePolicy {
        self.failure_policy.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use thinkchain_gateway::ErrorKind;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr().unwrap().to_string(), DEFAULT_BIND);
        assert_eq!(settings.policy(), FailurePolicy::Halt);
        assert_eq!(settings.provider_config(), ProviderConfig::new());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "http://localhost:9000/v1"
timeout_secs = 45
failure_policy = "pass-through"

[headers]
x-team = "research"
"#
        )
        .unwrap();

        let settings = Settings::load_from_file(file.path()).unwrap();
        assert_eq!(settings.timeout_secs, Some(45));
        assert_eq!(settings.policy(), FailurePolicy::PassThrough);

        let provider = settings.provider_config();
        assert_eq!(provider.base_url, "http://localhost:9000/v1");
        assert_eq!(provider.timeout_secs, Some(45));
        assert_eq!(provider.headers["x-team"], "research");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = \"should-not-live-here\"").unwrap();

        let err = Settings::load_from_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load_from_file(Path::new("/nonexistent/thinkchain.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_merge_prefers_other() {
        let file = Settings {
            base_url: Some("http://file".into()),
            timeout_secs: Some(10),
            bind: Some("0.0.0.0:8080".into()),
            ..Default::default()
        };
        let flags = Settings {
            timeout_secs: Some(99),
            ..Default::default()
        };

        let merged = file.merge(&flags);
        assert_eq!(merged.base_url.as_deref(), Some("http://file"));
        assert_eq!(merged.timeout_secs, Some(99));
        assert_eq!(merged.bind_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_bad_bind_address() {
        let settings = Settings {
            bind: Some("localhost".into()),
            ..Default::default()
        };
        assert_eq!(settings.bind_addr().unwrap_err().kind(), ErrorKind::ConfigInvalid);
    }
}
