//! Shared HTTP transport handed to every provider at construction.

use std::time::Duration;

use reqwest::Client;

use crate::error::ConfigError;
use crate::models::HttpConfig;

pub fn build_http_client(config: &HttpConfig) -> Result<Client, ConfigError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone());

    if let Some(proxy) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| ConfigError::ValidationError(format!("invalid proxy {proxy}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ConfigError::ValidationError(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_client() {
        assert!(build_http_client(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let config = HttpConfig {
            proxy: Some("::not a url::".to_string()),
            ..HttpConfig::default()
        };
        assert!(build_http_client(&config).is_err());
    }
}
