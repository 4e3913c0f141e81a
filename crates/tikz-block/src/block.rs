//! TikZ block attributes and their stored HTML form.
//!
//! A block is stored as a single container element:
//!
//! ```html
//! <tikz data-type="tikz" content="\draw (0,0) -- (1,1);"><svg ...>...</svg></tikz>
//! ```
//!
//! `content` round-trips as an attribute. The rendered markup is never an
//! attribute: it is read from the container's first child element (only when
//! that child is an `<svg>` root) and written back as the container's inner
//! content. A container without an `<svg>` child means "not rendered yet".

use std::borrow::Cow;
use std::fmt::Write;
use std::sync::LazyLock;

use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::error::BlockError;

/// Container element name.
pub const TAG_NAME: &str = "tikz";

/// Value of the container's `data-type` attribute.
pub const DATA_TYPE: &str = "tikz";

const DATA_TYPE_ATTR: &str = "data-type";
const CONTENT_ATTR: &str = "content";

/// A TikZ block: diagram source plus the cached render of that source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TikzBlock {
    /// `None` when the stored container had no `content` attribute.
    content: Option<String>,
    rendered: Option<String>,
    /// Other container attributes, in document order.
    passthrough: Vec<(String, String)>,
}

impl TikzBlock {
    /// Empty block, as inserted by the editor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            content: Some(String::new()),
            rendered: None,
            passthrough: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::new()
        }
    }

    /// Stored `content` attribute; `None` if the container lacked one.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Source text to render. Absent content renders like empty content.
    pub fn source(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Cached markup from the last completed render, if any.
    pub fn rendered_markup(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    /// Attributes carried through from the stored container.
    pub fn passthrough_attrs(&self) -> &[(String, String)] {
        &self.passthrough
    }

    /// Replace the source text, dropping the now-stale cache.
    pub(crate) fn set_content(&mut self, content: String) {
        self.content = Some(content);
        self.rendered = None;
    }

    pub(crate) fn set_rendered_markup(&mut self, markup: String) {
        self.rendered = Some(markup);
    }

    /// Parse a stored container element.
    ///
    /// Returns `Ok(None)` when the first element is not a
    /// `tikz[data-type="tikz"]` container.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError`] if the container markup is malformed.
    pub fn parse_html(html: &str) -> Result<Option<Self>, BlockError> {
        let mut reader = Reader::from_str(html);

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let Some(block) = Self::from_container(&reader, &e)? else {
                        return Ok(None);
                    };
                    let rendered = read_first_child_svg(&mut reader, html)?;
                    return Ok(Some(Self { rendered, ..block }));
                }
                Event::Empty(e) => return Self::from_container(&reader, &e),
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Read container attributes, or `None` if `e` is not a block container.
    fn from_container(reader: &Reader<&[u8]>, e: &BytesStart) -> Result<Option<Self>, BlockError> {
        if !e.local_name().as_ref().eq_ignore_ascii_case(TAG_NAME.as_bytes()) {
            return Ok(None);
        }

        let decoder = reader.decoder();
        let mut data_type = None;
        let mut content = None;
        let mut passthrough = Vec::new();

        for attr in e.html_attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .decode_and_unescape_value_with(decoder, resolve_html5_entity)
                .map_or_else(
                    |_| unescape_lenient(&String::from_utf8_lossy(&attr.value)),
                    Cow::into_owned,
                );
            match key.as_str() {
                DATA_TYPE_ATTR => data_type = Some(value),
                CONTENT_ATTR => content = Some(value),
                _ => passthrough.push((key, value)),
            }
        }

        if data_type.as_deref() != Some(DATA_TYPE) {
            return Ok(None);
        }

        Ok(Some(Self {
            content,
            rendered: None,
            passthrough,
        }))
    }

    /// Serialize to the stored container form.
    ///
    /// With a cache, the container carries only `data-type` and `content`
    /// and the cached markup becomes its child. Without one, it is an empty
    /// container carrying passthrough attributes as well.
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut out = String::with_capacity(
            64 + self.source().len() + self.rendered.as_ref().map_or(0, String::len),
        );
        write!(out, r#"<{TAG_NAME} {DATA_TYPE_ATTR}="{DATA_TYPE}""#).unwrap();
        if let Some(content) = &self.content {
            write_attr(&mut out, CONTENT_ATTR, content);
        }

        match &self.rendered {
            Some(markup) => {
                out.push('>');
                out.push_str(markup);
            }
            None => {
                for (key, value) in &self.passthrough {
                    write_attr(&mut out, key, value);
                }
                out.push('>');
            }
        }

        write!(out, "</{TAG_NAME}>").unwrap();
        out
    }
}

fn write_attr(out: &mut String, key: &str, value: &str) {
    write!(out, r#" {key}="{}""#, escape_attr(value)).unwrap();
}

/// Escape an attribute value, including newlines so multi-line source
/// survives attribute-value normalization.
fn escape_attr(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\n' => result.push_str("&#10;"),
            '\r' => result.push_str("&#13;"),
            '\t' => result.push_str("&#9;"),
            _ => result.push(ch),
        }
    }
    result
}

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").expect("invalid entity regex")
});

/// Unescape entity by entity, keeping unknown references as written.
///
/// Used when the value as a whole does not unescape, e.g. `&bogus;`, so the
/// remaining valid references in it are still resolved.
fn unescape_lenient(raw: &str) -> String {
    ENTITY_RE
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let entity = &caps[0];
            unescape_with(entity, resolve_html5_entity)
                .map_or_else(|_| entity.to_owned(), Cow::into_owned)
        })
        .into_owned()
}

/// Capture the container's first child element if it is an `<svg>` root.
///
/// Text and comments before the child are skipped. The child is returned
/// exactly as written, including its own tags.
fn read_first_child_svg(reader: &mut Reader<&[u8]>, html: &str) -> Result<Option<String>, BlockError> {
    loop {
        let start = position(reader);
        match reader.read_event()? {
            Event::Start(e) => {
                let is_svg = is_svg_root(&e);
                reader.read_to_end(e.name())?;
                let end = position(reader);
                return Ok(is_svg.then(|| html.get(start..end)).flatten().map(str::to_owned));
            }
            Event::Empty(e) => {
                let end = position(reader);
                return Ok(is_svg_root(&e)
                    .then(|| html.get(start..end))
                    .flatten()
                    .map(str::to_owned));
            }
            Event::End(_) | Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn is_svg_root(e: &BytesStart) -> bool {
    e.local_name().as_ref().eq_ignore_ascii_case(b"svg")
}

fn position(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><g><path d="M0 0L20 10"/></g></svg>"#;

    fn parse(html: &str) -> TikzBlock {
        TikzBlock::parse_html(html).unwrap().unwrap()
    }

    #[test]
    fn test_new_block_is_empty() {
        let block = TikzBlock::new();
        assert_eq!(block.content(), Some(""));
        assert_eq!(block.rendered_markup(), None);
    }

    #[test]
    fn test_parse_content_tri_state() {
        let absent = parse(r#"<tikz data-type="tikz"></tikz>"#);
        let empty = parse(r#"<tikz data-type="tikz" content=""></tikz>"#);
        let set = parse(r#"<tikz data-type="tikz" content="\draw (0,0);"></tikz>"#);

        assert_eq!(absent.content(), None);
        assert_eq!(absent.source(), "");
        assert_eq!(empty.content(), Some(""));
        assert_eq!(set.content(), Some(r"\draw (0,0);"));
    }

    #[test]
    fn test_parse_svg_child() {
        let html = format!(r#"<tikz data-type="tikz" content="x">{SVG}</tikz>"#);
        assert_eq!(parse(&html).rendered_markup(), Some(SVG));
    }

    #[test]
    fn test_parse_svg_after_whitespace_and_comment() {
        let html = format!("<tikz data-type=\"tikz\" content=\"x\">\n  <!-- cached -->\n  {SVG}\n</tikz>");
        assert_eq!(parse(&html).rendered_markup(), Some(SVG));
    }

    #[test]
    fn test_parse_self_closing_svg_child() {
        let html = r#"<tikz data-type="tikz" content="x"><svg width="1" height="1"/></tikz>"#;
        assert_eq!(
            parse(html).rendered_markup(),
            Some(r#"<svg width="1" height="1"/>"#)
        );
    }

    #[test]
    fn test_parse_non_svg_child_is_unset() {
        let html = r#"<tikz data-type="tikz" content="x"><div class="tikz-render-error"><p>boom</p></div></tikz>"#;
        let block = parse(html);
        assert_eq!(block.content(), Some("x"));
        assert_eq!(block.rendered_markup(), None);
    }

    #[test]
    fn test_parse_only_first_child_counts() {
        let html = format!(r#"<tikz data-type="tikz" content="x"><p>note</p>{SVG}</tikz>"#);
        assert_eq!(parse(&html).rendered_markup(), None);
    }

    #[test]
    fn test_parse_text_only_is_unset() {
        let block = parse(r#"<tikz data-type="tikz" content="x">stray text</tikz>"#);
        assert_eq!(block.rendered_markup(), None);
    }

    #[test]
    fn test_parse_self_closing_container() {
        let block = parse(r#"<tikz data-type="tikz" content="x" />"#);
        assert_eq!(block.content(), Some("x"));
        assert_eq!(block.rendered_markup(), None);
    }

    #[test]
    fn test_parse_rejects_other_elements() {
        assert_eq!(TikzBlock::parse_html("<p>hi</p>").unwrap(), None);
        assert_eq!(
            TikzBlock::parse_html(r#"<tikz data-type="mermaid"></tikz>"#).unwrap(),
            None
        );
        assert_eq!(TikzBlock::parse_html("<tikz></tikz>").unwrap(), None);
        assert_eq!(TikzBlock::parse_html("").unwrap(), None);
    }

    #[test]
    fn test_parse_unescapes_content() {
        let block = parse(
            r#"<tikz data-type="tikz" content="\draw[-&gt;] (0,0) -- (1,0) node {&quot;a&quot; &amp; b};"></tikz>"#,
        );
        assert_eq!(
            block.content(),
            Some(r#"\draw[->] (0,0) -- (1,0) node {"a" & b};"#)
        );
    }

    #[test]
    fn test_parse_resolves_html_entities_with_xml_escapes() {
        let html = r#"<tikz data-type="tikz" content="\matrix { a &amp; b };&nbsp;x"></tikz>"#;
        let block = parse(html);
        assert_eq!(block.content(), Some("\\matrix { a & b };\u{a0}x"));

        let reparsed = parse(&block.render_html());
        assert_eq!(reparsed.content(), Some("\\matrix { a & b };\u{a0}x"));
    }

    #[test]
    fn test_parse_keeps_unknown_entity_and_resolves_the_rest() {
        let block = parse(r#"<tikz data-type="tikz" content="a &amp; b &bogus; &#65;"></tikz>"#);
        assert_eq!(block.content(), Some("a & b &bogus; A"));

        let bare = parse(r#"<tikz data-type="tikz" content="\matrix { a & b \\ c &amp; d };"></tikz>"#);
        assert_eq!(bare.content(), Some(r"\matrix { a & b \\ c & d };"));
    }

    #[test]
    fn test_parse_keeps_passthrough_attrs() {
        let block = parse(r#"<tikz data-type="tikz" content="x" class="wide" id="fig-1"></tikz>"#);
        assert_eq!(
            block.passthrough_attrs(),
            &[
                ("class".to_owned(), "wide".to_owned()),
                ("id".to_owned(), "fig-1".to_owned())
            ]
        );
    }

    #[test]
    fn test_parse_malformed_is_error() {
        let result = TikzBlock::parse_html(r#"<tikz data-type="tikz" content="x"><svg><g></g></tikz>"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_render_without_cache() {
        let block = TikzBlock::with_content(r"\draw (0,0) -- (1,1);");
        assert_eq!(
            block.render_html(),
            r#"<tikz data-type="tikz" content="\draw (0,0) -- (1,1);"></tikz>"#
        );
    }

    #[test]
    fn test_render_with_cache_injects_child() {
        let mut block = TikzBlock::with_content("x");
        block.set_rendered_markup(SVG.to_owned());
        assert_eq!(
            block.render_html(),
            format!(r#"<tikz data-type="tikz" content="x">{SVG}</tikz>"#)
        );
    }

    #[test]
    fn test_render_passthrough_only_without_cache() {
        let mut block = parse(r#"<tikz data-type="tikz" content="x" class="wide"></tikz>"#);
        assert_eq!(
            block.render_html(),
            r#"<tikz data-type="tikz" content="x" class="wide"></tikz>"#
        );

        block.set_rendered_markup(SVG.to_owned());
        assert!(!block.render_html().contains("class="));
    }

    #[test]
    fn test_render_omits_absent_content() {
        let block = parse(r#"<tikz data-type="tikz"></tikz>"#);
        assert_eq!(block.render_html(), r#"<tikz data-type="tikz"></tikz>"#);
    }

    #[test]
    fn test_round_trip_without_cache() {
        let block = TikzBlock::with_content("X");
        let parsed = parse(&block.render_html());
        assert_eq!(parsed.content(), Some("X"));
        assert_eq!(parsed.rendered_markup(), None);
    }

    #[test]
    fn test_round_trip_with_cache() {
        let mut block = TikzBlock::with_content("X");
        block.set_rendered_markup(SVG.to_owned());

        let parsed = parse(&block.render_html());

        assert_eq!(parsed.content(), Some("X"));
        assert_eq!(parsed.rendered_markup(), Some(SVG));
    }

    #[test]
    fn test_round_trip_multiline_source() {
        let source = "\\begin{tikzpicture}\n\t\\draw[->] (0,0) -- (2,0) node[right] {$x$};\n\\end{tikzpicture}";
        let block = TikzBlock::with_content(source);
        assert_eq!(parse(&block.render_html()).content(), Some(source));
    }

    #[test]
    fn test_set_content_clears_cache() {
        let mut block = TikzBlock::with_content("a");
        block.set_rendered_markup(SVG.to_owned());

        block.set_content("b".to_owned());

        assert_eq!(block.content(), Some("b"));
        assert_eq!(block.rendered_markup(), None);
    }
}
