//! The request/response concept.
//!
//! `Requesting.request` records an inbound request and hands out its id.
//! Rules react to it like any other action and, eventually, dispatch
//! `Requesting.respond` with the same id. Whoever is waiting on that id is
//! woken with the response fields.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use concord_engine::{ActionSignature, Concept};
use concord_foundation::{Error, Record, Result, record};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Concept name rules refer to.
pub const NAME: &str = "Requesting";

const ACTIONS: &[&str] = &["request", "respond"];
const QUERIES: &[&str] = &["_awaitResponse"];

// =============================================================================
// Pending Requests
// =============================================================================

#[derive(Debug)]
struct Pending {
    path: String,
    response: Option<Record>,
    waiters: Vec<oneshot::Sender<Record>>,
}

// =============================================================================
// Requesting
// =============================================================================

/// Tracks inbound requests until someone responds to them.
///
/// | Operation | Arguments | Result |
/// |---|---|---|
/// | `request` | `path`, optional `request` id, any other fields | `{request}` or `{error}` |
/// | `respond` | `request`, any other fields | `{request}` or `{error}` |
/// | `_awaitResponse` | `request` | `[{response}]` once responded, else `[]` |
#[derive(Debug, Default)]
pub struct Requesting {
    next_id: AtomicU64,
    requests: Mutex<HashMap<String, Pending>>,
}

impl Requesting {
    /// Creates an empty concept.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signature of one of this concept's operations.
    #[must_use]
    pub fn signature(operation: &str) -> ActionSignature {
        ActionSignature::new(NAME, operation)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Pending>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of requests not yet forgotten.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no requests are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The path a request was made for.
    #[must_use]
    pub fn path(&self, request: &str) -> Option<String> {
        self.lock().get(request).map(|p| p.path.clone())
    }

    /// The response so far, if any.
    #[must_use]
    pub fn response(&self, request: &str) -> Option<Record> {
        self.lock().get(request).and_then(|p| p.response.clone())
    }

    /// Stops tracking a request, returning its response if it had one.
    ///
    /// Anyone still waiting on it is woken with an error.
    pub fn forget(&self, request: &str) -> Option<Record> {
        self.lock().remove(request).and_then(|p| p.response)
    }

    /// Waits until `request` has a response.
    ///
    /// Returns at once if the response is already there.
    ///
    /// # Errors
    /// Unknown request, the request was forgotten while waiting, or no
    /// response within `timeout`.
    pub async fn wait_for(&self, request: &str, timeout: Duration) -> Result<Record> {
        let receiver = {
            let mut requests = self.lock();
            let pending = requests
                .get_mut(request)
                .ok_or_else(|| Error::internal(format!("unknown request: {request}")))?;
            if let Some(response) = &pending.response {
                return Ok(response.clone());
            }
            let (sender, receiver) = oneshot::channel();
            pending.waiters.push(sender);
            receiver
        };

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(Error::internal(format!(
                "request {request} was forgotten before it was answered"
            ))),
            Err(_) => Err(Error::timeout(
                format!("{NAME}.request {request}"),
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Hands out a fresh request id without recording anything.
    ///
    /// A caller that passes this id to `request` knows which entry to
    /// `forget` even if the cascade behind the request fails.
    #[must_use]
    pub fn next_request_id(&self) -> String {
        format!("req-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn request(&self, args: &Record) -> Record {
        let Some(path) = args.get_str("path") else {
            return Record::error("request is missing a path");
        };
        let id = match args.get_str("request") {
            Some(id) => id.to_string(),
            None => self.next_request_id(),
        };

        let mut requests = self.lock();
        if requests.contains_key(&id) {
            return Record::error(format!("request {id} is already open"));
        }
        requests.insert(
            id.clone(),
            Pending {
                path: path.to_string(),
                response: None,
                waiters: Vec::new(),
            },
        );
        debug!(request = %id, path, "request received");
        record! { "request" => id }
    }

    fn respond(&self, args: &Record) -> Record {
        let Some(id) = args.get_str("request") else {
            return Record::error("respond is missing a request");
        };
        let mut requests = self.lock();
        let Some(pending) = requests.get_mut(id) else {
            return Record::error(format!("unknown request: {id}"));
        };
        if pending.response.is_some() {
            return Record::error(format!("request {id} has already been answered"));
        }

        let response = args.without("request");
        for waiter in pending.waiters.drain(..) {
            // The waiter may have timed out already.
            let _ = waiter.send(response.clone());
        }
        trace!(request = id, %response, "request answered");
        pending.response = Some(response);
        record! { "request" => id }
    }
}

#[async_trait]
impl Concept for Requesting {
    fn name(&self) -> &str {
        NAME
    }

    fn actions(&self) -> &[&str] {
        ACTIONS
    }

    fn queries(&self) -> &[&str] {
        QUERIES
    }

    async fn perform(&self, action: &str, args: Record) -> Result<Record> {
        match action {
            "request" => Ok(self.request(&args)),
            "respond" => Ok(self.respond(&args)),
            other => Err(Error::unknown_action(NAME, other)),
        }
    }

    async fn query(&self, query: &str, args: Record) -> Result<Vec<Record>> {
        match query {
            "_awaitResponse" => Ok(args
                .get_str("request")
                .and_then(|id| self.response(id))
                .map(|response| vec![record! { "response" => response.into_value() }])
                .unwrap_or_default()),
            other => Err(Error::unknown_query(NAME, other)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
