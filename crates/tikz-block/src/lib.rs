//! TikZ diagram block for rich-text documents.
//!
//! This crate models a document block holding TikZ source and the cached
//! render of that source:
//! - [`TikzBlock`] holds the persisted attributes and converts to and from the
//!   stored `<tikz data-type="tikz">` container
//! - [`TikzNodeKind`] describes the block to a host editor (schema, parse
//!   rule, insert actions)
//! - [`RenderController`] drives renders through a
//!   [`tikz_render::RenderClient`] and is the only writer of the cache
//! - [`scan`] and [`refresh`] work on whole stored documents
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tikz_block::{RenderController, TikzBlock};
//! use tikz_render::{RenderClient, StaticEndpoint, UreqTransport};
//!
//! let client = Arc::new(RenderClient::new(
//!     UreqTransport::default(),
//!     StaticEndpoint::new("https://tikz.example.com/render"),
//! ));
//! let controller = RenderController::new(TikzBlock::new(), client);
//! controller.edit(r"\draw (0,0) circle (1);").await;
//! println!("{}", controller.block().render_html());
//! ```

mod block;
mod controller;
mod document;
mod error;
mod kind;

pub use block::{DATA_TYPE, TAG_NAME, TikzBlock};
pub use controller::{RenderController, RenderState};
pub use document::{BlockSpan, CacheState, RefreshPolicy, RefreshReport, Refreshed, refresh, scan};
pub use error::BlockError;
pub use kind::{
    AttributeSpec, InsertAction, InsertSurface, NodeKind, NodeSpec, ParseRule, TikzNodeKind,
};
