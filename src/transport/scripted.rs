//! In-memory transport for unit tests
//!
//! Responses are scripted per locator. A response may be gated on a
//! [`Notify`](tokio::sync::Notify) so a test decides exactly when it completes,
//! which makes window bounds and abort timing deterministic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{FetchRequest, FetchResponse, Transport};
use crate::error::{Error, Result};
use crate::progress::ProgressSink;
use crate::types::{Payload, PayloadKind};

#[derive(Clone)]
enum Outcome {
    Respond {
        status: u16,
        body: Vec<u8>,
        charset: Option<String>,
    },
    NetworkError(String),
}

#[derive(Clone)]
struct Script {
    outcome: Outcome,
    gate: Option<Arc<Notify>>,
    delay: Option<Duration>,
}

/// Scripted [`Transport`] recording dispatch order and peak concurrency
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Script>>,
    sent: Mutex<Vec<FetchRequest>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }

    /// Respond 200 with `body` as soon as the request is made.
    pub(crate) fn ok(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.script(
            url,
            Script {
                outcome: Outcome::Respond {
                    status: 200,
                    body: body.into(),
                    charset: None,
                },
                gate: None,
                delay: None,
            },
        );
    }

    /// Respond 200 after `delay`.
    pub(crate) fn ok_after(&self, url: &str, body: impl Into<Vec<u8>>, delay: Duration) {
        self.script(
            url,
            Script {
                outcome: Outcome::Respond {
                    status: 200,
                    body: body.into(),
                    charset: None,
                },
                gate: None,
                delay: Some(delay),
            },
        );
    }

    /// Respond with `status` and an empty body.
    pub(crate) fn status(&self, url: &str, status: u16) {
        self.script(
            url,
            Script {
                outcome: Outcome::Respond {
                    status,
                    body: Vec::new(),
                    charset: None,
                },
                gate: None,
                delay: None,
            },
        );
    }

    /// Respond 200 with raw `body` declared in `charset`.
    pub(crate) fn ok_encoded(&self, url: &str, body: impl Into<Vec<u8>>, charset: &str) {
        self.script(
            url,
            Script {
                outcome: Outcome::Respond {
                    status: 200,
                    body: body.into(),
                    charset: Some(charset.to_string()),
                },
                gate: None,
                delay: None,
            },
        );
    }

    /// Fail at the network level.
    pub(crate) fn network_error(&self, url: &str, message: &str) {
        self.script(
            url,
            Script {
                outcome: Outcome::NetworkError(message.to_string()),
                gate: None,
                delay: None,
            },
        );
    }

    /// Respond 200 with `body` once the returned gate is notified.
    pub(crate) fn gated(&self, url: &str, body: impl Into<Vec<u8>>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.script(
            url,
            Script {
                outcome: Outcome::Respond {
                    status: 200,
                    body: body.into(),
                    charset: None,
                },
                gate: Some(Arc::clone(&gate)),
                delay: None,
            },
        );
        gate
    }

    /// Locators in the order they were requested
    pub(crate) fn sent_urls(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    /// Full requests in the order they were made
    pub(crate) fn sent_requests(&self) -> Vec<FetchRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Highest number of requests that were in flight at once
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Requests currently in flight (dropped requests are not counted)
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: FetchRequest, progress: ProgressSink) -> Result<FetchResponse> {
        let script = self.scripts.lock().unwrap().get(&request.url).cloned();
        self.sent.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let Some(script) = script else {
            return Ok(FetchResponse {
                status: 404,
                status_text: "Not Found".to_string(),
                payload: Payload::Binary(Vec::new()),
                charset: None,
            });
        };

        progress.report(0, None);
        if let Some(gate) = &script.gate {
            gate.notified().await;
        }
        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        match script.outcome {
            Outcome::NetworkError(message) => Err(Error::Other(message)),
            Outcome::Respond { status, body, charset } => {
                let len = body.len() as u64;
                progress.report(len, Some(len));
                // Undeclared text is handed over decoded, like a transport that
                // decodes bodies itself.
                let payload = match (request.kind, &charset) {
                    (PayloadKind::Text, None) => Payload::Text(String::from_utf8_lossy(&body).into_owned()),
                    _ => Payload::Binary(body),
                };
                let status_text = match status {
                    200 => "OK",
                    404 => "Not Found",
                    500 => "Internal Server Error",
                    _ => "",
                };
                Ok(FetchResponse {
                    status,
                    status_text: status_text.to_string(),
                    payload,
                    charset,
                })
            }
        }
    }
}
