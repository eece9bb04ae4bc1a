//! Scripted in-memory gateway for handler tests.

use std::sync::Mutex;

use async_trait::async_trait;
use attio_core::ToolError;
use reqwest::Method;
use serde_json::{Map, Value};

use crate::gateway::{ApiRequest, Gateway};

type Script = (Method, String, Result<Value, ToolError>);

/// Serves canned responses keyed by method and path and records every
/// request it receives. Unscripted requests fail with a 404.
#[derive(Default)]
pub(crate) struct FakeGateway {
    script: Vec<Script>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, method: Method, path: &str, body: Value) -> Self {
        self.script.push((method, path.to_string(), Ok(body)));
        self
    }

    pub(crate) fn fail(mut self, method: Method, path: &str, error: ToolError) -> Self {
        self.script.push((method, path.to_string(), Err(error)));
        self
    }

    pub(crate) fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn only_call(&self) -> ApiRequest {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one call, got {calls:?}");
        calls.into_iter().next().expect("one call")
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn send(&self, request: ApiRequest) -> Result<Value, ToolError> {
        self.calls.lock().expect("calls lock").push(request.clone());
        self.script
            .iter()
            .find(|(method, path, _)| *method == request.method && *path == request.path)
            .map(|(_, _, response)| response.clone())
            .unwrap_or_else(|| {
                Err(ToolError::Remote {
                    status: 404,
                    message: format!("no scripted response for {} {}", request.method, request.path),
                })
            })
    }
}

pub(crate) fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
