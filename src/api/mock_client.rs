use crate::api::client::{ByteStream, MockStreamProducer};
use crate::types::ChatRequest;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::sync::{Arc, Mutex};

pub enum MockResponse {
    /// SSE frames, each terminated with a blank line if it lacks one.
    Frames(Vec<String>),
    /// Chunks delivered verbatim.
    Raw(Vec<String>),
    /// Chunks delivered verbatim, then a body that never yields again.
    Hang(Vec<String>),
    /// The request itself fails.
    Fail(String),
    /// Frames followed by a transport error mid-body.
    BrokenAfter(Vec<String>, String),
}

#[derive(Clone, Default)]
pub struct MockAgentClient {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockAgentClient {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn framed(frames: Vec<String>) -> Vec<Result<Bytes>> {
    frames
        .into_iter()
        .map(|s| {
            let framed = if s.ends_with("\n\n") {
                s
            } else {
                format!("{s}\n\n")
            };
            Ok(Bytes::from(framed))
        })
        .collect()
}

impl MockStreamProducer for MockAgentClient {
    fn create_mock_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        self.requests.lock().unwrap().push(request.clone());

        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(anyhow!("MockAgentClient: No more responses configured"));
        }

        match responses_guard.remove(0) {
            MockResponse::Frames(frames) => Ok(Box::pin(stream::iter(framed(frames)))),
            MockResponse::Raw(chunks) => Ok(Box::pin(stream::iter(
                chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))),
            ))),
            MockResponse::Hang(chunks) => Ok(Box::pin(
                stream::iter(chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))))
                    .chain(stream::pending()),
            )),
            MockResponse::Fail(message) => Err(anyhow!(message)),
            MockResponse::BrokenAfter(frames, message) => {
                let mut items = framed(frames);
                items.push(Err(anyhow!(message)));
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }
}
