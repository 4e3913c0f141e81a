//! Internal constants for TikZ rendering.

use std::time::Duration;

/// Default HTTP timeout for render requests (30 seconds).
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shown in place of a diagram when the source is blank.
pub(crate) const PLACEHOLDER_MARKUP: &str =
    r#"<p style="color: #999; font-style: italic;">请输入 TikZ 代码</p>"#;

/// Error panel title.
pub(crate) const ERROR_TITLE: &str = "TikZ 渲染错误";

/// Error panel hint below the message.
pub(crate) const ERROR_HINT: &str = "请检查代码语法是否正确。";

/// Message used when a failure carries no description.
pub(crate) const UNKNOWN_ERROR: &str = "未知错误";
