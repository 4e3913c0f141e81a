//! Render endpoint resolution.
//!
//! The render client never reads global configuration; it is handed an
//! [`EndpointResolver`] at construction and asks it for the endpoint on every
//! render. Resolution cannot fail: any lookup problem yields an empty string,
//! and the request against it fails through the client's normal error path.

use std::future::Future;

use serde_json::Value;

use crate::transport::{HttpTransport, TransportError};

/// Plugin identifier the host keys the render configuration by.
pub const DEFAULT_PLUGIN_NAME: &str = "plugin-tikz";

/// Configuration group holding the endpoint.
pub const DEFAULT_CONFIG_GROUP: &str = "basic";

/// Key of the endpoint within [`DEFAULT_CONFIG_GROUP`].
pub const DEFAULT_CONFIG_KEY: &str = "tikzRenderApi";

/// Supplies the render service URL at call time.
pub trait EndpointResolver: Send + Sync {
    /// Resolve the endpoint, returning an empty string when unavailable.
    fn resolve(&self) -> impl Future<Output = String> + Send;
}

/// A pre-resolved endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticEndpoint(pub String);

impl StaticEndpoint {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }
}

impl EndpointResolver for StaticEndpoint {
    async fn resolve(&self) -> String {
        self.0.clone()
    }
}

/// Failure to fetch a plugin's JSON configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFetchError {
    #[error("request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fetches a plugin's JSON configuration from the host application.
pub trait PluginConfigSource: Send + Sync {
    /// Fetch the configuration object for `plugin`, grouped by setting group.
    fn fetch_json_config(
        &self,
        plugin: &str,
    ) -> impl Future<Output = Result<Value, ConfigFetchError>> + Send;
}

/// Reads plugin configuration from the host console API.
#[derive(Debug, Clone)]
pub struct ConsoleConfigSource<T> {
    transport: T,
    console_url: String,
}

impl<T: HttpTransport> ConsoleConfigSource<T> {
    pub fn new(transport: T, console_url: &str) -> Self {
        Self {
            transport,
            console_url: console_url.trim_end_matches('/').to_owned(),
        }
    }

    fn config_url(&self, plugin: &str) -> String {
        format!(
            "{}/apis/api.console.halo.run/v1alpha1/plugins/{plugin}/json-config",
            self.console_url
        )
    }
}

impl<T: HttpTransport> PluginConfigSource for ConsoleConfigSource<T> {
    async fn fetch_json_config(&self, plugin: &str) -> Result<Value, ConfigFetchError> {
        let response = self.transport.get(&self.config_url(plugin)).await?;
        if !response.is_success() {
            return Err(ConfigFetchError::Status(response.status));
        }
        Ok(serde_json::from_str(&response.body)?)
    }
}

/// Resolves the endpoint from the plugin's JSON configuration on every call.
///
/// The endpoint lives at `{group}.{key}`, `basic.tikzRenderApi` by default.
#[derive(Debug, Clone)]
pub struct PluginConfigResolver<S> {
    source: S,
    plugin: String,
    group: String,
    key: String,
}

impl<S: PluginConfigSource> PluginConfigResolver<S> {
    /// Resolver for the default plugin name and endpoint path.
    pub fn new(source: S) -> Self {
        Self {
            source,
            plugin: DEFAULT_PLUGIN_NAME.to_owned(),
            group: DEFAULT_CONFIG_GROUP.to_owned(),
            key: DEFAULT_CONFIG_KEY.to_owned(),
        }
    }

    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = plugin.into();
        self
    }

    #[must_use]
    pub fn with_path(mut self, group: impl Into<String>, key: impl Into<String>) -> Self {
        self.group = group.into();
        self.key = key.into();
        self
    }
}

impl<S: PluginConfigSource> EndpointResolver for PluginConfigResolver<S> {
    async fn resolve(&self) -> String {
        match self.source.fetch_json_config(&self.plugin).await {
            Ok(config) => {
                let endpoint = endpoint_from_config(&config, &self.group, &self.key);
                if endpoint.is_empty() {
                    tracing::warn!(
                        plugin = %self.plugin,
                        path = %format!("{}.{}", self.group, self.key),
                        "Render endpoint not configured"
                    );
                }
                endpoint
            }
            Err(e) => {
                tracing::warn!(plugin = %self.plugin, error = %e, "Failed to fetch plugin configuration");
                String::new()
            }
        }
    }
}

fn endpoint_from_config(config: &Value, group: &str, key: &str) -> String {
    config
        .get(group)
        .and_then(|g| g.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}
