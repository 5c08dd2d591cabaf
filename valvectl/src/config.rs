//! `valvectl.toml` loading.
//!
//! ```toml
//! base_url = "http://localhost:9099"
//! api_prefix = "/v1"
//! token = "${env:PIPELINES_API_KEY}"
//! timeout_secs = 30
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::fs;
use valveform::api::ApiConfig;

use crate::utils::replace_env_placeholders;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "valvectl.toml";

/// Backend used when neither the config nor the command line names one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:9099";

/// Connection settings for the pipeline backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtlConfig {
    /// Backend origin, e.g. `http://localhost:9099`.
    pub base_url: String,
    /// Prefix put between the origin and `/api/...`.
    pub api_prefix: Option<String>,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for CtlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: None,
            token: None,
            timeout_secs: None,
        }
    }
}

/// Values from the command line that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub api_prefix: Option<String>,
    pub token: Option<String>,
}

impl CtlConfig {
    /// Load the config.
    ///
    /// An explicit `path` must exist. Without one, `valvectl.toml` in the
    /// working directory is used if present, else the defaults.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            debug!("no {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.expand_env()?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn expand_env(&mut self) -> anyhow::Result<()> {
        self.base_url = replace_env_placeholders(&self.base_url)?;
        for value in [&mut self.api_prefix, &mut self.token].into_iter().flatten() {
            *value = replace_env_placeholders(value)?;
        }
        if self.token.as_deref() == Some("") {
            self.token = None;
        }
        Ok(())
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.base_url {
            self.base_url = url;
        }
        if overrides.api_prefix.is_some() {
            self.api_prefix = overrides.api_prefix;
        }
        if overrides.token.is_some() {
            self.token = overrides.token;
        }
    }

    /// Client settings for [`valveform::api::PipelineClient`].
    pub fn api_config(&self) -> ApiConfig {
        let mut api = ApiConfig::new(self.base_url.clone());
        api.api_prefix = self.api_prefix.clone();
        api.token = self.token.clone();
        api.timeout = self.timeout_secs.map(Duration::from_secs);
        api
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_partial() {
        let config = CtlConfig::parse("api_prefix = \"/v1\"").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_prefix.as_deref(), Some("/v1"));
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        assert!(CtlConfig::parse("timeout_secs = \"soon\"").is_err());
    }

    #[tokio::test]
    async fn test_load_expands_env() {
        unsafe {
            std::env::set_var("VALVECTL_CONFIG_TEST_TOKEN", "abc123");
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_url = \"http://backend:9099\"\ntoken = \"${{env:VALVECTL_CONFIG_TEST_TOKEN}}\"\ntimeout_secs = 5"
        )
        .unwrap();

        let config = CtlConfig::load(Some(file.path())).await.unwrap();
        assert_eq!(config.base_url, "http://backend:9099");
        assert_eq!(config.token.as_deref(), Some("abc123"));

        let api = config.api_config();
        assert_eq!(api.timeout, Some(Duration::from_secs(5)));
        assert_eq!(api.root(), "http://backend:9099");
    }

    #[tokio::test]
    async fn test_unset_token_is_dropped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "token = \"${{env:VALVECTL_CONFIG_TEST_UNSET}}\"").unwrap();
        let config = CtlConfig::load(Some(file.path())).await.unwrap();
        assert_eq!(config.token, None);
    }

    #[tokio::test]
    async fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(CtlConfig::load(Some(&missing)).await.is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = CtlConfig {
            token: Some("file".into()),
            ..Default::default()
        };
        config.apply(Overrides {
            base_url: Some("http://other".into()),
            api_prefix: None,
            token: Some("cli".into()),
        });
        assert_eq!(config.base_url, "http://other");
        assert_eq!(config.token.as_deref(), Some("cli"));
        assert_eq!(config.api_prefix, None);
    }
}
