//! In-memory transport for deterministic client tests

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// What the scripted backend does with one call.
pub enum Scripted {
    Respond(u16, String),
    RespondAfter(Duration, u16, String),
    Fail(TransportError),
}

impl Scripted {
    pub fn json(status: u16, body: &str) -> Self {
        Scripted::Respond(status, body.to_string())
    }
}

/// One call as seen by the scripted backend.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<String>,
}

type Handler = Box<dyn Fn(&TransportRequest) -> Scripted + Send + Sync>;

/// Records every call and answers through a closure.
pub struct ScriptedTransport {
    handler: Handler,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&TransportRequest) -> Scripted + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.path == path)
            .collect()
    }
}

/// Bearer token on a request, without the scheme prefix.
pub fn bearer(request: &TransportRequest) -> Option<String> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + '_>> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: request.method.to_string(),
            path: request.url.path().to_string(),
            authorization: bearer(&request),
            body: request
                .body
                .as_ref()
                .map(|b| String::from_utf8_lossy(b).into_owned()),
        });
        let scripted = (self.handler)(&request);

        Box::pin(async move {
            let (status, body) = match scripted {
                Scripted::Respond(status, body) => (status, body),
                Scripted::RespondAfter(delay, status, body) => {
                    tokio::time::sleep(delay).await;
                    (status, body)
                }
                Scripted::Fail(err) => return Err(err),
            };
            Ok(TransportResponse {
                status: StatusCode::from_u16(status).unwrap(),
                body: Bytes::from(body),
            })
        })
    }
}
