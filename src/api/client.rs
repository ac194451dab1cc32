use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::Config;
use crate::types::ChatRequest;
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;
use tracing::debug;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// HTTP client for the upstream agent endpoint.
#[derive(Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    api_url: String,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl AgentClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            #[cfg(test)]
            mock_stream_producer: None,
        })
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: "http://localhost:8000/chat".to_string(),
            mock_stream_producer: Some(mock_producer),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// POSTs the request and returns the raw event-stream body.
    pub async fn create_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(request);
            }
        }

        let request_url = self.api_url.clone();
        if debug_payload_enabled() {
            emit_debug_payload(&request_url, request);
        }

        debug!(
            url = %request_url,
            messages = request.messages.len(),
            session_id = request.session_id.as_deref().unwrap_or("<new>"),
            "opening agent stream"
        );

        let response = self
            .http
            .post(&request_url)
            .header("accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &request_url))?
            .error_for_status()
            .map_err(|error| map_api_request_error(error, &request_url))?;

        let request_url_for_stream = request_url.clone();
        let stream = response.bytes_stream().map(move |item| {
            item.map_err(|error| map_api_request_error(error, &request_url_for_stream))
        });
        Ok(Box::pin(stream))
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(request_url) {
        return anyhow!(
            "cannot reach local agent endpoint '{}': {}. Start the agent backend or update DESKSURF_API_URL.",
            request_url,
            error
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach agent endpoint '{}': {}", request_url, error);
    }
    if error.is_timeout() {
        return anyhow!("agent request to '{}' timed out: {}", request_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!("HTTP error! status: {}", status.as_u16());
    }
    anyhow!("agent request to '{}' failed: {}", request_url, error)
}
