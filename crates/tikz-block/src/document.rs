//! TikZ blocks inside a whole stored document.
//!
//! Documents are HTML, not XML, so containers are located with a regex that
//! respects quoted attribute values, and only each container is handed to the
//! XML parser. Refreshing renders every selected block concurrently, each
//! through its own [`RenderController`], and splices the re-serialized
//! containers back in place.

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::task::JoinSet;

use tikz_render::{EndpointResolver, HttpTransport, RenderClient, placeholder_markup};

use crate::block::TikzBlock;
use crate::controller::RenderController;

/// Opening `<tikz ...>` tag; `>` inside quoted attribute values does not end it.
static OPEN_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<tikz(?:[\s/](?:[^>"']|"[^"]*"|'[^']*')*)?>"#).expect("invalid open tag regex")
});

static CLOSE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</tikz\s*>").expect("invalid close tag regex"));

/// Start of any child element (comments and text do not count).
static CHILD_ELEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z]").expect("invalid child element regex"));

/// What a stored container holds in place of a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// First child is an `<svg>` root.
    Rendered,
    /// Nothing to show yet: no child element, or a blank block holding
    /// only the input prompt.
    Pending,
    /// A child element that is not a graphic, such as a stored error panel.
    Invalid,
}

impl CacheState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rendered => "rendered",
            Self::Pending => "pending",
            Self::Invalid => "invalid",
        }
    }
}

/// A block found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan {
    /// Byte range of the container in the document.
    pub range: Range<usize>,
    pub block: TikzBlock,
    pub cache: CacheState,
}

/// Find every `tikz[data-type="tikz"]` container in `html`.
///
/// Containers that fail to parse are skipped with a warning.
pub fn scan(html: &str) -> Vec<BlockSpan> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(open) = OPEN_TAG_RE.find_at(html, pos) {
        let (inner, end) = if open.as_str().ends_with("/>") {
            ("", open.end())
        } else if let Some(close) = CLOSE_TAG_RE.find_at(html, open.end()) {
            (&html[open.end()..close.start()], close.end())
        } else {
            tracing::warn!(offset = open.start(), "Unclosed tikz container");
            break;
        };

        let range = open.start()..end;
        let raw = &html[range.clone()];
        match TikzBlock::parse_html(raw) {
            Ok(Some(block)) => {
                let cache = cache_state(&block, inner);
                spans.push(BlockSpan { range, block, cache });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(offset = range.start, error = %e, "Skipping malformed tikz container");
            }
        }
        pos = end;
    }

    spans
}

fn cache_state(block: &TikzBlock, inner: &str) -> CacheState {
    if block.rendered_markup().is_some() {
        CacheState::Rendered
    } else if is_blank_placeholder(block, inner) {
        CacheState::Pending
    } else if CHILD_ELEMENT_RE.is_match(inner) {
        CacheState::Invalid
    } else {
        CacheState::Pending
    }
}

/// Blank source whose stored child is only the input prompt.
fn is_blank_placeholder(block: &TikzBlock, inner: &str) -> bool {
    block.source().trim().is_empty() && inner.trim() == placeholder_markup()
}

/// Which blocks a refresh re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Only blocks without a usable cached graphic.
    #[default]
    Missing,
    /// Every block.
    All,
}

/// Counts from a document refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshReport {
    /// Blocks re-rendered to a graphic or placeholder.
    pub rendered: usize,
    /// Blocks left untouched by the policy.
    pub skipped: usize,
    /// Blocks whose render produced an error panel.
    pub failed: usize,
}

/// A refreshed document.
#[derive(Debug, Clone)]
pub struct Refreshed {
    pub html: String,
    pub report: RefreshReport,
}

/// Re-render the blocks of `html` selected by `policy`.
///
/// Blocks render concurrently with no shared state. Each selected container
/// is replaced by its re-serialized form; everything else is left as is.
pub async fn refresh<T, E>(
    html: &str,
    client: Arc<RenderClient<T, E>>,
    policy: RefreshPolicy,
) -> Refreshed
where
    T: HttpTransport + 'static,
    E: EndpointResolver + 'static,
{
    let mut report = RefreshReport::default();
    let mut tasks = JoinSet::new();

    for (index, span) in scan(html).into_iter().enumerate() {
        if policy == RefreshPolicy::Missing && span.cache == CacheState::Rendered {
            report.skipped += 1;
            continue;
        }
        let controller = RenderController::new(span.block, Arc::clone(&client));
        let range = span.range;
        tasks.spawn(async move {
            let outcome = controller.render().await;
            (index, range, controller.block(), outcome.is_failure())
        });
    }

    let mut replacements = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, range, block, failed)) => {
                if failed {
                    report.failed += 1;
                } else {
                    report.rendered += 1;
                }
                replacements.push((index, range, block.render_html()));
            }
            Err(e) => {
                tracing::error!(error = %e, "TikZ render task failed");
                report.failed += 1;
            }
        }
    }

    replacements.sort_by_key(|(index, ..)| *index);
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for (_, range, container) in replacements {
        out.push_str(&html[last..range.start]);
        out.push_str(&container);
        last = range.end;
    }
    out.push_str(&html[last..]);

    tracing::info!(
        rendered = report.rendered,
        skipped = report.skipped,
        failed = report.failed,
        "Document refreshed"
    );

    Refreshed { html: out, report }
}
