//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! `Transport` is the single seam between the deterministic core and real
//! I/O. Status codes are always returned as data so that status
//! interpretation stays in `envelope`; only failures where no response came
//! back become errors, and those are always `ApiError::Transport`.

use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, ApiError> + Send + Sync,
{
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self(request)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        // Disable ureq's status-code-as-error behavior so 4xx/5xx responses
        // come back as data.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout())
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn transport_error(err: ureq::Error) -> ApiError {
    ApiError::Transport {
        timed_out: matches!(err, ureq::Error::Timeout(_)),
        message: format!("Unable to reach server: {err}"),
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        // Query strings may carry patient names; keep them out of the logs.
        let route = request.path.split('?').next().unwrap_or_default();
        debug!(method = %request.method, path = route, "dispatching request");

        let agent = &self.agent;
        let headers = request.headers.as_slice();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(agent.get(&request.path), headers).call(),
            (HttpMethod::Delete, _) => with_headers(agent.delete(&request.path), headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(agent.post(&request.path), headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => {
                with_headers(agent.post(&request.path), headers).send_empty()
            }
            (HttpMethod::Put, Some(body)) => {
                with_headers(agent.put(&request.path), headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => {
                with_headers(agent.put(&request.path), headers).send_empty()
            }
        };

        let mut response = result.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        // The status is already known; undecodable bytes must not hide it.
        let bytes = response.body_mut().read_to_vec().map_err(transport_error)?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        trace!(status, path = route, "response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
