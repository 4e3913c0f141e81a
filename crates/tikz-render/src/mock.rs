//! Scripted HTTP transport for testing.
//!
//! Provides [`MockTransport`] for exercising the render pipeline without a
//! render service. Replies are keyed by the `input` field of POST bodies and
//! by URL for GET requests, and can be delayed to script overlapping renders.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::transport::{HttpResponse, HttpTransport, TransportError};

/// Scripted reply to a single request.
#[derive(Debug, Clone)]
pub struct MockReply {
    result: Result<HttpResponse, TransportError>,
    delay: Duration,
}

impl MockReply {
    /// HTTP 200 with `body`.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    /// Response with an arbitrary status.
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            result: Ok(HttpResponse {
                status,
                body: body.into(),
            }),
            delay: Duration::ZERO,
        }
    }

    /// Failure before any response is received.
    #[must_use]
    pub fn failure(error: TransportError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    /// Settle only after `delay` has elapsed.
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Request observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Option<String>,
}

/// In-memory transport returning scripted replies.
///
/// Requests without a scripted reply fail with [`TransportError::Request`].
#[derive(Debug, Default)]
pub struct MockTransport {
    posts: Mutex<HashMap<String, MockReply>>,
    gets: Mutex<HashMap<String, MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to POSTs whose JSON `input` equals `input`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn on_post(self, input: impl Into<String>, reply: MockReply) -> Self {
        self.posts.lock().unwrap().insert(input.into(), reply);
        self
    }

    /// Reply to GETs of `url`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn on_get(self, url: impl Into<String>, reply: MockReply) -> Self {
        self.gets.lock().unwrap().insert(url.into(), reply);
        self
    }

    /// Requests received so far, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, url: &str, body: Option<String>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            url: url.to_owned(),
            body,
        });
    }
}

fn input_of(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("input")?.as_str().map(str::to_owned)
}

async fn settle(reply: Option<MockReply>, what: &str) -> Result<HttpResponse, TransportError> {
    let Some(reply) = reply else {
        return Err(TransportError::Request(format!("no mock reply for {what}")));
    };
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    reply.result
}

impl HttpTransport for MockTransport {
    async fn post_json(&self, url: &str, body: String) -> Result<HttpResponse, TransportError> {
        let reply = input_of(&body).and_then(|input| self.posts.lock().unwrap().get(&input).cloned());
        self.record("POST", url, Some(body));
        settle(reply, url).await
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let reply = self.gets.lock().unwrap().get(url).cloned();
        self.record("GET", url, None);
        settle(reply, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{ConsoleConfigSource, EndpointResolver, PluginConfigResolver};

    const CONFIG_URL: &str =
        "https://blog.example.com/apis/api.console.halo.run/v1alpha1/plugins/plugin-tikz/json-config";

    #[tokio::test]
    async fn test_console_source_resolves_endpoint() {
        let transport = MockTransport::new().on_get(
            CONFIG_URL,
            MockReply::ok(r#"{"basic":{"tikzRenderApi":"https://tikz.example.com/render"}}"#),
        );
        let resolver =
            PluginConfigResolver::new(ConsoleConfigSource::new(transport, "https://blog.example.com/"));

        assert_eq!(resolver.resolve().await, "https://tikz.example.com/render");
    }

    #[tokio::test]
    async fn test_console_source_error_status_is_empty() {
        let transport = MockTransport::new().on_get(CONFIG_URL, MockReply::status(403, "{}"));
        let resolver =
            PluginConfigResolver::new(ConsoleConfigSource::new(transport, "https://blog.example.com"));

        assert_eq!(resolver.resolve().await, "");
    }

    #[tokio::test]
    async fn test_console_source_bad_json_is_empty() {
        let transport = MockTransport::new().on_get(CONFIG_URL, MockReply::ok("<html>"));
        let resolver =
            PluginConfigResolver::new(ConsoleConfigSource::new(transport, "https://blog.example.com"));

        assert_eq!(resolver.resolve().await, "");
    }

    #[tokio::test]
    async fn test_unscripted_request_fails() {
        let transport = MockTransport::new();
        let result = transport.get("https://nowhere.example.com").await;

        assert!(matches!(result, Err(TransportError::Request(_))));
        assert_eq!(transport.requests().len(), 1);
    }
}
