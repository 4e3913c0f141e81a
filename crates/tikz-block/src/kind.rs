//! Node kind descriptor for registering the TikZ block with a host editor.
//!
//! The host framework is not modeled here; [`NodeKind`] is the contract it
//! needs: an attribute schema, a parse rule, a serialize rule, and the entry
//! points that insert a new block. View binding goes through
//! [`RenderController`](crate::RenderController) and its hooks.

use crate::block::{DATA_TYPE, TAG_NAME, TikzBlock};
use crate::error::BlockError;

/// Schema entry for one node attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpec {
    pub name: &'static str,
    /// Value for a freshly inserted node; `None` means null.
    pub default: Option<&'static str>,
    /// Whether the attribute is written to the stored element as an attribute.
    pub rendered: bool,
}

/// Element selector a parse rule matches: `tag[data-type="..."]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseRule {
    pub tag: &'static str,
    pub data_type: &'static str,
}

impl ParseRule {
    /// CSS-style selector, e.g. `tikz[data-type="tikz"]`.
    #[must_use]
    pub fn selector(&self) -> String {
        format!(r#"{}[data-type="{}"]"#, self.tag, self.data_type)
    }
}

/// Static description of a document node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSpec {
    pub name: &'static str,
    pub group: &'static str,
    pub inline: bool,
    /// Content is code; the editor does not apply marks inside it.
    pub code: bool,
    /// Edited as a single unit.
    pub atom: bool,
    pub attributes: &'static [AttributeSpec],
    pub parse_rule: ParseRule,
}

/// Where an insertion entry point is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertSurface {
    Toolbox,
    CommandMenu,
}

/// User-invocable entry point that inserts a new block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertAction {
    pub surface: InsertSurface,
    pub priority: u32,
    pub title: &'static str,
    pub keywords: &'static [&'static str],
}

impl InsertAction {
    /// The block the action inserts: default-valued, not rendered.
    #[must_use]
    pub fn insert(&self) -> TikzBlock {
        TikzBlock::new()
    }
}

/// A document node kind the host editor can register.
pub trait NodeKind {
    type Node;

    fn spec(&self) -> &'static NodeSpec;

    /// Parse a stored element, `Ok(None)` if it does not match the parse rule.
    fn parse_html(&self, html: &str) -> Result<Option<Self::Node>, BlockError>;

    fn render_html(&self, node: &Self::Node) -> String;

    fn insert_actions(&self) -> &'static [InsertAction];
}

static TIKZ_ATTRIBUTES: [AttributeSpec; 2] = [
    AttributeSpec {
        name: "content",
        default: Some(""),
        rendered: true,
    },
    AttributeSpec {
        name: "svg",
        default: None,
        rendered: false,
    },
];

static TIKZ_SPEC: NodeSpec = NodeSpec {
    name: "tikz",
    group: "block",
    inline: false,
    code: true,
    atom: true,
    attributes: &TIKZ_ATTRIBUTES,
    parse_rule: ParseRule {
        tag: TAG_NAME,
        data_type: DATA_TYPE,
    },
};

const INSERT_TITLE: &str = "TikZ 编辑块";

static TIKZ_INSERT_ACTIONS: [InsertAction; 2] = [
    InsertAction {
        surface: InsertSurface::Toolbox,
        priority: 100,
        title: INSERT_TITLE,
        keywords: &[],
    },
    InsertAction {
        surface: InsertSurface::CommandMenu,
        priority: 100,
        title: INSERT_TITLE,
        keywords: &["tikz"],
    },
];

/// The TikZ block node kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TikzNodeKind;

impl NodeKind for TikzNodeKind {
    type Node = TikzBlock;

    fn spec(&self) -> &'static NodeSpec {
        &TIKZ_SPEC
    }

    fn parse_html(&self, html: &str) -> Result<Option<TikzBlock>, BlockError> {
        TikzBlock::parse_html(html)
    }

    fn render_html(&self, node: &TikzBlock) -> String {
        node.render_html()
    }

    fn insert_actions(&self) -> &'static [InsertAction] {
        &TIKZ_INSERT_ACTIONS
    }
}
