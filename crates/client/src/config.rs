use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use serde::Deserialize;

use crate::Error;

/// Builder for [`ClientConfig`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientConfigBuilder {
    api_key: String,
    model: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Creates a builder with the given API key.
    #[inline]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            timeout: None,
        }
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the base URL of the service, without the `/v1` suffix.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the request timeout. Each client has its own default.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    ///
    /// Missing fields are not reported here, the clients check them when
    /// they are constructed.
    #[inline]
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            api_key: self.api_key,
            model: self.model.unwrap_or_default(),
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_default(),
            timeout: self.timeout,
        }
    }
}

impl Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Configuration for the one-api clients.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ClientConfig {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) timeout: Option<Duration>,
}

impl ClientConfig {
    /// Returns the model identifier.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the base URL, without trailing slashes.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the configured timeout, if any.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        let missing: Vec<_> = [
            ("base URL", &self.base_url),
            ("API key", &self.api_key),
            ("model", &self.model),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::Config(format!("missing {}", missing.join(", "))))
    }

    #[inline]
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[inline]
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The language model section of a pipeline configuration.
///
/// Every field is optional so that the section can be deserialized as-is;
/// missing values are reported when a client is constructed.
#[derive(Clone, Default, PartialEq, Deserialize)]
pub struct LanguageModelConfig {
    /// Base URL of the service.
    #[serde(default)]
    pub api_base: Option<String>,
    /// The API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// The model identifier.
    #[serde(default)]
    pub model: Option<String>,
    /// Request timeout in seconds. Zero means the client default.
    #[serde(default)]
    pub request_timeout: Option<f64>,
}

impl LanguageModelConfig {
    /// Converts this section into a [`ClientConfigBuilder`].
    pub fn into_builder(self) -> ClientConfigBuilder {
        let mut builder =
            ClientConfigBuilder::with_api_key(self.api_key.unwrap_or_default());
        if let Some(model) = self.model {
            builder = builder.with_model(model);
        }
        if let Some(base_url) = self.api_base {
            builder = builder.with_base_url(base_url);
        }
        let timeout = self
            .request_timeout
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
        if let Some(timeout) = timeout {
            builder = builder.with_timeout(timeout);
        }
        builder
    }
}

impl From<LanguageModelConfig> for ClientConfig {
    #[inline]
    fn from(config: LanguageModelConfig) -> Self {
        config.into_builder().build()
    }
}

impl Debug for LanguageModelConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageModelConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use oneapi_model::ErrorKind;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_build() {
        let config = ClientConfigBuilder::with_api_key("sk-secret")
            .with_base_url("http://localhost:3000//")
            .with_model("qwen-plus")
            .build();
        assert_eq!(config.base_url(), "http://localhost:3000");
        assert_eq!(config.model(), "qwen-plus");
        assert_eq!(config.timeout(), None);
        assert_eq!(
            config.endpoint("/v1/embeddings"),
            "http://localhost:3000/v1/embeddings"
        );
        assert_eq!(config.bearer(), "Bearer sk-secret");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfigBuilder::with_api_key("sk-secret")
            .with_model("qwen-plus");
        assert!(!format!("{config:?}").contains("sk-secret"));
        assert!(!format!("{:?}", config.build()).contains("sk-secret"));
    }

    #[test]
    fn test_validate() {
        let config = ClientConfigBuilder::with_api_key("")
            .with_base_url("http://localhost:3000")
            .with_model("qwen-plus")
            .build();
        let err = config.validate().unwrap_err();
        assert_eq!(oneapi_model::ProviderError::kind(&err), ErrorKind::Config);
        assert!(err.to_string().contains("API key"));

        let err = ClientConfigBuilder::with_api_key("sk")
            .with_base_url("/")
            .build()
            .validate()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("base URL"));
        assert!(message.contains("model"));
    }

    #[test]
    fn test_language_model_config() {
        let section: LanguageModelConfig = serde_json::from_value(json!({
            "api_base": "http://one-api:3000/",
            "api_key": "sk-secret",
            "model": "text-embedding-v3",
            "request_timeout": 30.5
        }))
        .unwrap();
        assert!(!format!("{section:?}").contains("sk-secret"));

        let config = ClientConfig::from(section);
        assert_eq!(config.base_url(), "http://one-api:3000");
        assert_eq!(config.model(), "text-embedding-v3");
        assert_eq!(config.timeout(), Some(Duration::from_millis(30_500)));

        let section: LanguageModelConfig =
            serde_json::from_value(json!({ "request_timeout": 0 })).unwrap();
        let config = ClientConfig::from(section);
        assert_eq!(config.timeout(), None);
        assert!(config.validate().is_err());
    }
}
