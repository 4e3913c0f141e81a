//! `tikz refresh` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tikz_block::{RefreshPolicy, RefreshReport, refresh};
use tikz_config::Config;

use super::{build_client, read_input, write_output};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the refresh command.
#[derive(Args)]
pub(crate) struct RefreshArgs {
    /// HTML document containing TikZ blocks.
    file: PathBuf,

    /// Re-render every block, not only those without a cached graphic.
    #[arg(long)]
    all: bool,

    /// Write the document here instead of updating it in place.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RefreshArgs {
    /// Execute the refresh command.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or written, or if any
    /// block failed to render. The document is written either way.
    pub(crate) async fn execute(self, config: &Config) -> Result<(), CliError> {
        let output = Output::new();
        let html = read_input(Some(&self.file))?;
        let policy = if self.all {
            RefreshPolicy::All
        } else {
            RefreshPolicy::Missing
        };

        let client = Arc::new(build_client(config));
        let refreshed = refresh(&html, client, policy).await;
        let report = refreshed.report;

        let target = self.output.as_deref().unwrap_or(&self.file);
        let written = needs_write(report, self.output.is_some());
        if written {
            write_output(Some(target), &refreshed.html)?;
        }

        output.info(&format!(
            "{} rendered, {} skipped, {} failed",
            report.rendered, report.skipped, report.failed
        ));
        if report.failed > 0 {
            return Err(CliError::BlocksFailed {
                count: report.failed,
            });
        }
        if written {
            output.success(&format!("Updated {}", target.display()));
        } else {
            output.detail(&format!("{} is up to date", target.display()));
        }
        Ok(())
    }
}

/// The document is rewritten when a block changed or an explicit output
/// path was given.
fn needs_write(report: RefreshReport, explicit_output: bool) -> bool {
    explicit_output || report.rendered + report.failed > 0
}
