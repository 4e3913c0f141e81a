//! `tikz inspect` command implementation.

use std::fmt::Write;
use std::path::PathBuf;

use clap::Args;
use tikz_block::{BlockSpan, CacheState, scan};

use super::read_input;
use crate::error::CliError;
use crate::output::Output;

/// Longest source excerpt shown per block.
const EXCERPT_CHARS: usize = 48;

/// Arguments for the inspect command.
#[derive(Args)]
pub(crate) struct InspectArgs {
    /// HTML document containing TikZ blocks.
    file: PathBuf,
}

impl InspectArgs {
    /// Execute the inspect command.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let html = read_input(Some(&self.file))?;
        let spans = scan(&html);

        if spans.is_empty() {
            output.warning(&format!("No TikZ blocks in {}", self.file.display()));
            return Ok(());
        }

        for (index, span) in spans.iter().enumerate() {
            let line = describe(index, span);
            match span.cache {
                CacheState::Rendered => output.success(&line),
                CacheState::Pending => output.info(&line),
                CacheState::Invalid => output.warning(&line),
            }
        }
        output.detail(&summary(&spans));
        Ok(())
    }
}

fn describe(index: usize, span: &BlockSpan) -> String {
    format!(
        "#{:<3} {:<8} bytes {}..{}  {}",
        index + 1,
        span.cache.as_str(),
        span.range.start,
        span.range.end,
        excerpt(span.block.source())
    )
}

fn summary(spans: &[BlockSpan]) -> String {
    let mut out = format!("{} block(s):", spans.len());
    for state in [CacheState::Rendered, CacheState::Pending, CacheState::Invalid] {
        let count = spans.iter().filter(|s| s.cache == state).count();
        let _ = write!(out, " {count} {}", state.as_str());
    }
    out
}

/// First line of the source, shortened to [`EXCERPT_CHARS`].
fn excerpt(source: &str) -> String {
    let line = source.trim().lines().next().unwrap_or_default();
    if line.is_empty() {
        return "(empty)".to_owned();
    }
    if line.chars().count() > EXCERPT_CHARS {
        let short: String = line.chars().take(EXCERPT_CHARS).collect();
        format!("{short}…")
    } else {
        line.to_owned()
    }
}
