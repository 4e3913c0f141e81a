//! Environment variable expansion for configuration strings.

use std::sync::LazyLock;

use regex::Regex;

use crate::ConfigError;

/// A braced `${...}` reference; bare `$name` never matches.
static BRACED_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{[^}]*\}").expect("invalid braced variable regex"));

/// Expand `${VAR}` and `${VAR:-default}` references in a config value.
///
/// Bare `$VAR` is left alone so URLs containing dollar signs pass through,
/// also when the value contains braced references.
/// `field` names the config key in the error when a variable is unset.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(value.len());
    let mut last = 0;

    for reference in BRACED_VAR_RE.find_iter(value) {
        out.push_str(&value[last..reference.start()]);
        out.push_str(&expand_reference(reference.as_str(), field)?);
        last = reference.end();
    }
    out.push_str(&value[last..]);

    Ok(out)
}

fn expand_reference(reference: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env_with_context(reference, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var)
            .map(Some)
            .map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Name of a variable that was referenced but not set.
struct UnsetVar(String);
