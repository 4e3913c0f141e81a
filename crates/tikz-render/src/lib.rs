//! TikZ rendering via a remote render service.
//!
//! This crate turns TikZ source into displayable markup:
//! - [`RenderClient`] posts `{"input": source}` to the render service and
//!   folds every failure into an error panel, so callers always get markup
//! - [`EndpointResolver`] supplies the service URL at call time, either
//!   pre-resolved ([`StaticEndpoint`]) or read from the host application's
//!   plugin configuration ([`PluginConfigResolver`])
//! - [`HttpTransport`] is the network seam; [`UreqTransport`] drives ureq from
//!   tokio's blocking pool
//!
//! # Example
//!
//! ```ignore
//! use tikz_render::{RenderClient, StaticEndpoint, UreqTransport};
//!
//! let client = RenderClient::new(
//!     UreqTransport::default(),
//!     StaticEndpoint::new("https://tikz.example.com/render"),
//! );
//! let svg = client.render(r"\draw (0,0) -- (1,1);", &()).await;
//! ```

mod client;
mod consts;
mod endpoint;
mod markup;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod transport;

pub use client::{BusyGuard, RenderClient, RenderError, RenderHooks, RenderOutcome};
pub use endpoint::{
    ConfigFetchError, ConsoleConfigSource, DEFAULT_CONFIG_GROUP, DEFAULT_CONFIG_KEY,
    DEFAULT_PLUGIN_NAME, EndpointResolver, PluginConfigResolver, PluginConfigSource,
    StaticEndpoint,
};
pub use markup::{error_markup, escape_html, placeholder_markup};
#[cfg(feature = "mock")]
pub use mock::{MockReply, MockTransport, RecordedRequest};
pub use transport::{HttpResponse, HttpTransport, TransportError, UreqTransport, create_agent};
