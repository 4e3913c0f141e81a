//! Error types for block parsing.

/// Error while reading a stored block container.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BlockError {
    /// Container markup is not well-formed.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed attribute on the container.
    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
}
