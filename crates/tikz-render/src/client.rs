//! TikZ render client.
//!
//! Sends TikZ source to the render service and normalizes every outcome into
//! displayable markup:
//! - blank source: placeholder prompt, no request, no hooks
//! - 2xx: response body verbatim
//! - non-2xx: error panel with the server's `message`, else `HTTP <status>`
//! - transport failure: error panel with the failure description
//!
//! [`RenderClient::render`] never fails. Hooks wrap the request so a busy
//! indicator can be shown and is always cleared once the request settles.

use serde::Serialize;
use serde_json::Value;

use crate::consts::UNKNOWN_ERROR;
use crate::endpoint::EndpointResolver;
use crate::markup::{error_markup, placeholder_markup};
use crate::transport::{HttpResponse, HttpTransport, TransportError};

/// Observer of a render request's lifetime.
///
/// `on_start` fires before the request is issued; `on_complete` fires exactly
/// once after it settles, whatever the outcome. Neither fires for blank source.
pub trait RenderHooks: Send + Sync {
    fn on_start(&self) {}
    fn on_complete(&self) {}
}

/// No-op hooks.
impl RenderHooks for () {}

/// Holds the busy signal for the duration of a request.
///
/// Acquiring calls `on_start`; dropping calls `on_complete`, so the release
/// also happens when the render future is dropped mid-flight or unwinds.
pub struct BusyGuard<'a, H: RenderHooks + ?Sized> {
    hooks: &'a H,
}

impl<'a, H: RenderHooks + ?Sized> BusyGuard<'a, H> {
    pub fn acquire(hooks: &'a H) -> Self {
        hooks.on_start();
        Self { hooks }
    }
}

impl<H: RenderHooks + ?Sized> Drop for BusyGuard<'_, H> {
    fn drop(&mut self) {
        self.hooks.on_complete();
    }
}

/// Why a render produced an error panel instead of a diagram.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The service answered with a non-success status.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// No complete response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl RenderError {
    /// Message for the error panel, if the failure carries one.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Transport(e) => e.message(),
            other => Some(other.to_string()),
        }
    }

    /// Build the error for a non-success response.
    ///
    /// Prefers the `message` field of a JSON body and falls back to
    /// `HTTP <status>` when the field is missing, empty or the body is not JSON.
    fn from_response(response: &HttpResponse) -> Self {
        let message = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| match body.get("message")? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::String(_) | Value::Null | Value::Bool(false) => None,
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| format!("HTTP {}", response.status));
        Self::Http {
            status: response.status,
            message,
        }
    }
}

/// Result of a render with its kind preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Service returned vector-graphic markup.
    Graphic(String),
    /// Source was blank; nothing was requested.
    Placeholder,
    /// Render failed; the message is shown in an error panel.
    Failed(Option<String>),
}

impl RenderOutcome {
    /// Markup to display for this outcome.
    #[must_use]
    pub fn into_markup(self) -> String {
        match self {
            Self::Graphic(svg) => svg,
            Self::Placeholder => placeholder_markup().to_owned(),
            Self::Failed(message) => error_markup(message.as_deref()),
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Message shown for a failed render, `None` unless this is a failure.
    ///
    /// A missing or blank message reads as the generic unknown-error text,
    /// as in the error panel.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(
                message
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(UNKNOWN_ERROR),
            ),
            Self::Graphic(_) | Self::Placeholder => None,
        }
    }
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    input: &'a str,
}

/// Client for the remote TikZ render service.
#[derive(Debug, Clone)]
pub struct RenderClient<T, E> {
    transport: T,
    endpoint: E,
}

impl<T: HttpTransport, E: EndpointResolver> RenderClient<T, E> {
    /// Create a client sending requests through `transport` to the endpoint
    /// `endpoint` resolves on each call.
    pub fn new(transport: T, endpoint: E) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Render `source` to displayable markup.
    ///
    /// Never fails: errors become an error panel. See [`RenderHooks`] for when
    /// hooks fire.
    pub async fn render<H: RenderHooks + ?Sized>(&self, source: &str, hooks: &H) -> String {
        self.render_outcome(source, hooks).await.into_markup()
    }

    /// Render `source`, keeping the outcome kind.
    pub async fn render_outcome<H: RenderHooks + ?Sized>(
        &self,
        source: &str,
        hooks: &H,
    ) -> RenderOutcome {
        if source.trim().is_empty() {
            return RenderOutcome::Placeholder;
        }

        let _busy = BusyGuard::acquire(hooks);
        match self.try_render(source).await {
            Ok(svg) => RenderOutcome::Graphic(svg),
            Err(e) => {
                tracing::error!(error = %e, "TikZ render failed");
                RenderOutcome::Failed(e.message())
            }
        }
    }

    async fn try_render(&self, source: &str) -> Result<String, RenderError> {
        let endpoint = self.endpoint.resolve().await;
        let body = serde_json::to_string(&RenderRequest { input: source })?;

        tracing::debug!(endpoint = %endpoint, bytes = source.len(), "Sending TikZ render request");
        let response = self.transport.post_json(&endpoint, body).await?;

        if !response.is_success() {
            return Err(RenderError::from_response(&response));
        }
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::endpoint::StaticEndpoint;
    use crate::mock::{MockReply, MockTransport};

    const ENDPOINT: &str = "https://tikz.example.com/render";
    const SOURCE: &str = r"\begin{tikzpicture}\draw (0,0) -- (1,1);\end{tikzpicture}";
    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><path d="M0 0L10 10"/></svg>"#;

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<&'static str>>,
        completions: AtomicUsize,
    }

    impl RenderHooks for RecordingHooks {
        fn on_start(&self) {
            self.events.lock().unwrap().push("start");
        }

        fn on_complete(&self) {
            self.completions.fetch_add(1, Ordering::SeqCst);
            self.events.lock().unwrap().push("complete");
        }
    }

    fn client(transport: MockTransport) -> RenderClient<MockTransport, StaticEndpoint> {
        RenderClient::new(transport, StaticEndpoint::new(ENDPOINT))
    }

    #[tokio::test]
    async fn test_blank_source_returns_placeholder() {
        let client = client(MockTransport::new());
        let hooks = RecordingHooks::default();

        for source in ["", "   ", "\n\t  \n"] {
            let html = client.render(source, &hooks).await;
            assert_eq!(html, placeholder_markup());
        }

        assert!(hooks.events.lock().unwrap().is_empty());
        assert!(client.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn test_success_returns_body_verbatim() {
        let client = client(MockTransport::new().on_post(SOURCE, MockReply::ok(SVG)));
        let hooks = RecordingHooks::default();

        let html = client.render(SOURCE, &hooks).await;

        assert_eq!(html, SVG);
        assert_eq!(*hooks.events.lock().unwrap(), vec!["start", "complete"]);
    }

    type EventLog = std::sync::Arc<Mutex<Vec<&'static str>>>;

    /// Transport and hooks appending to the same log.
    struct SharedLog(EventLog);

    impl HttpTransport for SharedLog {
        async fn post_json(&self, _url: &str, _body: String) -> Result<HttpResponse, TransportError> {
            self.0.lock().unwrap().push("request");
            Ok(HttpResponse {
                status: 200,
                body: SVG.to_owned(),
            })
        }

        async fn get(&self, _url: &str) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Aborted)
        }
    }

    impl RenderHooks for SharedLog {
        fn on_start(&self) {
            self.0.lock().unwrap().push("start");
        }

        fn on_complete(&self) {
            self.0.lock().unwrap().push("complete");
        }
    }

    #[tokio::test]
    async fn test_start_fires_before_request() {
        let log = EventLog::default();
        let client = RenderClient::new(
            SharedLog(std::sync::Arc::clone(&log)),
            StaticEndpoint::new(ENDPOINT),
        );
        let hooks = SharedLog(std::sync::Arc::clone(&log));

        let html = client.render(SOURCE, &hooks).await;

        assert_eq!(html, SVG);
        assert_eq!(*log.lock().unwrap(), vec!["start", "request", "complete"]);
    }

    #[test]
    fn test_failure_message_falls_back_to_unknown_error() {
        assert_eq!(RenderOutcome::Failed(None).failure_message(), Some("未知错误"));
        assert_eq!(
            RenderOutcome::Failed(Some("  ".to_owned())).failure_message(),
            Some("未知错误")
        );
        assert_eq!(
            RenderOutcome::Failed(Some("bad node".to_owned())).failure_message(),
            Some("bad node")
        );
        assert_eq!(RenderOutcome::Placeholder.failure_message(), None);
        assert_eq!(RenderOutcome::Graphic(SVG.to_owned()).failure_message(), None);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let client = client(MockTransport::new().on_post(SOURCE, MockReply::ok(SVG)));

        client.render(SOURCE, &()).await;

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, ENDPOINT);
        let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "input": SOURCE }));
    }

    #[tokio::test]
    async fn test_http_error_uses_server_message() {
        let client = client(MockTransport::new().on_post(
            SOURCE,
            MockReply::status(422, r#"{"message":"syntax error at line 3"}"#),
        ));
        let hooks = RecordingHooks::default();

        let html = client.render(SOURCE, &hooks).await;

        assert!(html.contains("tikz-render-error"));
        assert!(html.contains("syntax error at line 3"));
        assert_eq!(hooks.completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_http_error_unparseable_body_uses_status() {
        let client = client(
            MockTransport::new().on_post(SOURCE, MockReply::status(500, "Internal Server Error")),
        );

        let html = client.render(SOURCE, &()).await;

        assert!(html.contains("tikz-render-error"));
        assert!(html.contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_http_error_without_message_uses_status() {
        let client =
            client(MockTransport::new().on_post(SOURCE, MockReply::status(400, r#"{"error":"x"}"#)));

        let outcome = client.render_outcome(SOURCE, &()).await;

        assert_eq!(outcome, RenderOutcome::Failed(Some("HTTP 400".to_owned())));
    }

    #[tokio::test]
    async fn test_transport_failure_without_message_uses_fallback() {
        let client = client(
            MockTransport::new().on_post(SOURCE, MockReply::failure(TransportError::Aborted)),
        );
        let hooks = RecordingHooks::default();

        let html = client.render(SOURCE, &hooks).await;

        assert!(html.contains("未知错误"));
        assert_eq!(*hooks.events.lock().unwrap(), vec!["start", "complete"]);
    }

    #[tokio::test]
    async fn test_transport_failure_shows_description() {
        let client = client(MockTransport::new().on_post(
            SOURCE,
            MockReply::failure(TransportError::Request("connection refused".to_owned())),
        ));

        let html = client.render(SOURCE, &()).await;

        assert!(html.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_empty_endpoint_still_attempts_request() {
        let client = RenderClient::new(MockTransport::new(), StaticEndpoint::default());
        let hooks = RecordingHooks::default();

        let outcome = client.render_outcome(SOURCE, &hooks).await;

        assert!(outcome.is_failure());
        assert_eq!(client.transport().requests()[0].url, "");
        assert_eq!(hooks.completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_complete_fires_once_per_render() {
        let client = client(
            MockTransport::new()
                .on_post("a", MockReply::ok(SVG))
                .on_post("b", MockReply::status(500, "")),
        );
        let hooks = RecordingHooks::default();

        for source in ["a", "b", "c", " "] {
            client.render(source, &hooks).await;
        }

        assert_eq!(hooks.completions.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_fires_when_render_is_dropped() {
        let client = client(MockTransport::new().on_post(
            SOURCE,
            MockReply::ok(SVG).delayed(std::time::Duration::from_secs(60)),
        ));
        let hooks = RecordingHooks::default();

        let render = client.render(SOURCE, &hooks);
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_secs(1), render).await;

        assert!(timed_out.is_err());
        assert_eq!(*hooks.events.lock().unwrap(), vec!["start", "complete"]);
    }

    #[test]
    fn test_error_from_response_message_kinds() {
        let response = |body: &str| HttpResponse {
            status: 422,
            body: body.to_owned(),
        };

        assert_eq!(
            RenderError::from_response(&response(r#"{"message":""}"#)).to_string(),
            "HTTP 422"
        );
        assert_eq!(
            RenderError::from_response(&response(r#"{"message":null}"#)).to_string(),
            "HTTP 422"
        );
        assert_eq!(
            RenderError::from_response(&response(r#"{"message":7}"#)).to_string(),
            "7"
        );
        assert_eq!(
            RenderError::from_response(&response("[]")).to_string(),
            "HTTP 422"
        );
    }
}
