//! Application context.
//!
//! [`AppContext`] holds the loaded configuration and the HTTP client built
//! from it. Every subcommand runs against one context.

use std::future::Future;

use valveform::api::PipelineClient;

use crate::{config::CtlConfig, utils::prompt_yes_no};

/// The main application context holding all state.
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Effective configuration, file values merged with CLI overrides.
    pub config: CtlConfig,
    /// Client for the pipeline backend.
    pub client: PipelineClient,
}

impl AppContext {
    /// Creates a context for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built, e.g. because the
    /// token is not a valid header value.
    pub fn new(config: CtlConfig) -> anyhow::Result<Self> {
        let client = PipelineClient::new(&config.api_config())?;
        debug!("backend root {}", config.api_config().root());
        Ok(Self { config, client })
    }
}

/// Ask on the terminal without blocking the runtime.
///
/// The returned future owns its copy of the question, so the function
/// itself can be handed to [`valveform::session::ValveSession::switch_to`]
/// as a `Confirm`.
pub fn ask(message: &str) -> impl Future<Output = bool> + Send + use<> {
    let message = message.to_string();
    async move {
        tokio::task::spawn_blocking(move || prompt_yes_no(&message))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_config() {
        let config = CtlConfig {
            base_url: "http://backend:9099/".into(),
            api_prefix: Some("None".into()),
            ..Default::default()
        };
        let ctx = AppContext::new(config).unwrap();
        assert_eq!(ctx.config.api_config().root(), "http://backend:9099");
    }

    #[test]
    fn test_bad_token_is_rejected() {
        let config = CtlConfig {
            token: Some("line\nbreak".into()),
            ..Default::default()
        };
        assert!(AppContext::new(config).is_err());
    }
}
