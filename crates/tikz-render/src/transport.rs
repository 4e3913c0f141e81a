//! HTTP transport for the render service and host console.
//!
//! [`HttpTransport`] is the seam between rendering logic and the network.
//! [`UreqTransport`] is the production implementation: ureq is blocking, so
//! each request runs on tokio's blocking pool and the caller suspends at the
//! `.await` until the service answers.

use std::future::Future;
use std::time::Duration;

use ureq::Agent;

use crate::consts::DEFAULT_TIMEOUT;

/// Status and body of a completed HTTP exchange.
///
/// Any status is a completed exchange; interpreting non-2xx codes is up to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure before a complete response was received.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection, TLS, timeout or invalid URL.
    #[error("{0}")]
    Request(String),
    /// Response arrived but its body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
    /// The request task ended without producing a result. Carries no
    /// description worth showing to the user.
    #[error("request aborted")]
    Aborted,
}

impl TransportError {
    /// Human-readable description, if the failure carries one.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Request(msg) if msg.trim().is_empty() => None,
            Self::Aborted => None,
            other => Some(other.to_string()),
        }
    }
}

/// Issues HTTP requests on behalf of the renderer.
pub trait HttpTransport: Send + Sync {
    /// POST `body` as `application/json` to `url`.
    fn post_json(
        &self,
        url: &str,
        body: String,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;

    /// GET `url`.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Create HTTP agent with the specified timeout.
///
/// Status codes are not turned into errors so that error bodies stay readable.
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Blocking ureq agent driven from tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// Create a transport whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl HttpTransport for UreqTransport {
    async fn post_json(&self, url: &str, body: String) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let url = url.to_owned();
        run_blocking(move || {
            let response = agent
                .post(&url)
                .header("Content-Type", "application/json")
                .send(body.as_bytes())
                .map_err(|e| TransportError::Request(e.to_string()))?;
            read_response(response)
        })
        .await
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let url = url.to_owned();
        run_blocking(move || {
            let response = agent
                .get(&url)
                .header("Accept", "application/json")
                .call()
                .map_err(|e| TransportError::Request(e.to_string()))?;
            read_response(response)
        })
        .await
    }
}

async fn run_blocking<F>(f: F) -> Result<HttpResponse, TransportError>
where
    F: FnOnce() -> Result<HttpResponse, TransportError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "HTTP request task failed");
            Err(TransportError::Aborted)
        }
    }
}

fn read_response(
    response: ureq::http::Response<ureq::Body>,
) -> Result<HttpResponse, TransportError> {
    let status = response.status().as_u16();
    let body = response
        .into_body()
        .read_to_string()
        .map_err(|e| TransportError::Body(e.to_string()))?;
    Ok(HttpResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success() {
        let ok = HttpResponse {
            status: 204,
            body: String::new(),
        };
        let err = HttpResponse {
            status: 422,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!err.is_success());
    }

    #[test]
    fn test_transport_error_message() {
        assert_eq!(
            TransportError::Request("connection refused".to_owned()).message(),
            Some("connection refused".to_owned())
        );
        assert_eq!(TransportError::Request(String::new()).message(), None);
        assert_eq!(TransportError::Aborted.message(), None);
        assert!(
            TransportError::Body("eof".to_owned())
                .message()
                .unwrap()
                .contains("eof")
        );
    }

    #[tokio::test]
    async fn test_ureq_transport_empty_url_fails() {
        let transport = UreqTransport::new(Duration::from_secs(1));
        let result = transport.post_json("", "{}".to_owned()).await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
