//! `tikz render` command implementation.

use std::path::PathBuf;

use clap::Args;
use tikz_config::Config;
use tikz_render::RenderOutcome;

use super::{build_client, read_input, write_output};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// File with TikZ source (default: read stdin).
    file: Option<PathBuf>,

    /// Write markup to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// The markup is always written, including the error panel of a failed
    /// render; the command still fails in that case.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read, output cannot be written,
    /// or the render service reports a failure.
    pub(crate) async fn execute(self, config: &Config) -> Result<(), CliError> {
        let source = read_input(self.file.as_deref())?;
        let client = build_client(config);

        let outcome = client.render_outcome(&source, &()).await;
        if outcome == RenderOutcome::Placeholder {
            Output::new().warning("Source is empty; wrote placeholder");
        }
        let failure = outcome.failure_message().map(str::to_owned);

        write_output(self.output.as_deref(), &outcome.into_markup())?;

        if let Some(message) = failure {
            return Err(CliError::Render(message));
        }
        if let Some(path) = &self.output {
            Output::new().success(&format!("Wrote {}", path.display()));
        }
        Ok(())
    }
}
