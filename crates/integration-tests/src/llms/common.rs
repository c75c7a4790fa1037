use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// A request as the mock provider received it.
#[derive(Clone, Debug)]
pub struct ReceivedRequest {
    pub body: Value,
    /// The key from the provider specific authentication header.
    pub api_key: Option<String>,
}

/// Shared log of the requests a mock received. Clone it before spawning the mock.
#[derive(Clone, Debug, Default)]
pub struct RequestLog(Arc<Mutex<Vec<ReceivedRequest>>>);

impl RequestLog {
    pub(super) fn record(&self, request: ReceivedRequest) {
        self.0.lock().unwrap().push(request);
    }

    pub fn all(&self) -> Vec<ReceivedRequest> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent request. Panics when nothing was received.
    pub fn last(&self) -> ReceivedRequest {
        self.0
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("the mock provider received no request")
    }
}

/// How a mock misbehaves.
#[derive(Clone, Debug)]
pub(super) enum Failure {
    /// Reject the request with 401.
    Auth(String),
    /// Reject the request with 500.
    Internal(String),
    /// Start streaming, then send an error event instead of finishing.
    MidStream(String),
}

/// Searches the message contents for trigger words and returns the matching response.
pub(super) fn find_custom_response(messages: &Value, custom_responses: &BTreeMap<String, String>) -> Option<String> {
    let messages = messages.as_array()?;

    for content in messages.iter().filter_map(|message| message["content"].as_str()) {
        for (trigger, response) in custom_responses {
            if content.contains(trigger) {
                return Some(response.clone());
            }
        }
    }

    None
}

/// Splits a response into word sized deltas, keeping the whitespace.
pub(super) fn deltas(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(' ')
}
