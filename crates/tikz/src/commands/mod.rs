//! CLI command implementations.

pub(crate) mod inspect;
pub(crate) mod refresh;
pub(crate) mod render;

use std::io::{Read, Write};
use std::path::Path;

use tikz_config::Config;
use tikz_render::{
    ConsoleConfigSource, EndpointResolver, PluginConfigResolver, RenderClient, StaticEndpoint,
    UreqTransport,
};

pub(crate) use inspect::InspectArgs;
pub(crate) use refresh::RefreshArgs;
pub(crate) use render::RenderArgs;

/// Endpoint chosen from configuration.
pub(crate) enum CliEndpoint {
    /// Explicit endpoint, or empty when nothing is configured.
    Static(StaticEndpoint),
    /// Looked up from the host console on each render.
    Plugin(PluginConfigResolver<ConsoleConfigSource<UreqTransport>>),
}

impl CliEndpoint {
    /// Pick the resolver: explicit endpoint, then plugin lookup, then empty.
    pub(crate) fn from_config(config: &Config, transport: &UreqTransport) -> Self {
        if let Some(endpoint) = &config.render.endpoint {
            return Self::Static(StaticEndpoint::new(endpoint.clone()));
        }
        match &config.plugin.console_url {
            Some(console_url) => {
                let source = ConsoleConfigSource::new(transport.clone(), console_url);
                Self::Plugin(
                    PluginConfigResolver::new(source)
                        .with_plugin(config.plugin.name.clone())
                        .with_path(config.plugin.group.clone(), config.plugin.key.clone()),
                )
            }
            None => {
                tracing::warn!("No render endpoint configured");
                Self::Static(StaticEndpoint::default())
            }
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::Plugin(_) => "plugin",
        }
    }
}

impl EndpointResolver for CliEndpoint {
    async fn resolve(&self) -> String {
        match self {
            Self::Static(endpoint) => endpoint.resolve().await,
            Self::Plugin(resolver) => resolver.resolve().await,
        }
    }
}

pub(crate) type CliClient = RenderClient<UreqTransport, CliEndpoint>;

/// Build the render client described by `config`.
pub(crate) fn build_client(config: &Config) -> CliClient {
    let transport = UreqTransport::new(config.render.timeout());
    let endpoint = CliEndpoint::from_config(config, &transport);
    tracing::info!(
        endpoint = endpoint.describe(),
        timeout_secs = config.render.timeout_secs,
        "Render client ready"
    );
    RenderClient::new(transport, endpoint)
}

/// Read `path`, or stdin when no path is given.
pub(crate) fn read_input(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

/// Write `content` to `path`, or stdout when no path is given.
pub(crate) fn write_output(path: Option<&Path>, content: &str) -> std::io::Result<()> {
    match path {
        Some(path) => std::fs::write(path, content),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()
        }
    }
}
