//! Request sequencing for interactive callers.
//!
//! A session tracks the most recent classification request. Starting a new
//! request cancels the one in flight, and a result that arrives for a request
//! that is no longer current is dropped instead of overwriting newer state.

use crate::classifier::{validate_message, Classification, Classifier};
use crate::error::{ClassifyError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

pub type RequestId = u64;

/// What a caller can observe about the latest request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState {
    /// Nothing has been requested yet, or the last request was withdrawn.
    Idle,
    Pending {
        request_id: RequestId,
    },
    Succeeded {
        request_id: RequestId,
        classification: Classification,
    },
    Failed {
        request_id: RequestId,
        error: String,
    },
}

struct Inflight {
    request_id: RequestId,
    token: CancellationToken,
}

struct SessionInner {
    next_id: RequestId,
    inflight: Option<Inflight>,
    state: RequestState,
}

/// The current request's handle on the session. Settles the request when
/// dropped unsettled, so an abandoned future never leaves it `Pending`.
struct PendingRequest<'a> {
    session: &'a ClassificationSession,
    request_id: RequestId,
    token: CancellationToken,
    settled: bool,
}

impl PendingRequest<'_> {
    fn settle(mut self, result: &Result<Classification>) {
        self.settled = true;
        self.session.finish(self.request_id, result);
    }
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        if !self.settled {
            log::debug!("Request {} abandoned before completing", self.request_id);
            self.token.cancel();
            self.session.finish(self.request_id, &Err(ClassifyError::Cancelled));
        }
    }
}

pub struct ClassificationSession {
    classifier: Arc<Classifier>,
    inner: Mutex<SessionInner>,
}

impl ClassificationSession {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self {
            classifier,
            inner: Mutex::new(SessionInner {
                next_id: 1,
                inflight: None,
                state: RequestState::Idle,
            }),
        }
    }

    pub fn state(&self) -> RequestState {
        self.lock().state.clone()
    }

    /// Classify `text`, superseding any request still in flight.
    ///
    /// Blank input is rejected without touching the session state. A
    /// superseded request resolves to [`ClassifyError::Cancelled`]. If the
    /// returned future is dropped before it resolves, the request is recorded
    /// as failed with [`ClassifyError::Cancelled`] rather than left pending.
    pub async fn classify(&self, text: &str) -> Result<Classification> {
        let text = validate_message(text)?;
        let pending = self.begin();

        let result = tokio::select! {
            _ = pending.token.cancelled() => Err(ClassifyError::Cancelled),
            result = self.classifier.classify(text) => result,
        };

        pending.settle(&result);
        result
    }

    /// Withdraw the request in flight, if any, and return to `Idle`.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if let Some(inflight) = inner.inflight.take() {
            log::debug!("Cancelling request {}", inflight.request_id);
            inflight.token.cancel();
            inner.state = RequestState::Idle;
        }
    }

    fn begin(&self) -> PendingRequest<'_> {
        let mut inner = self.lock();
        let request_id = inner.next_id;
        inner.next_id += 1;

        if let Some(previous) = inner.inflight.take() {
            log::debug!(
                "Request {request_id} supersedes request {}",
                previous.request_id
            );
            previous.token.cancel();
        }

        let token = CancellationToken::new();
        inner.inflight = Some(Inflight {
            request_id,
            token: token.clone(),
        });
        inner.state = RequestState::Pending { request_id };
        PendingRequest {
            session: self,
            request_id,
            token,
            settled: false,
        }
    }

    fn finish(&self, request_id: RequestId, result: &Result<Classification>) {
        let mut inner = self.lock();
        let is_current = inner
            .inflight
            .as_ref()
            .is_some_and(|inflight| inflight.request_id == request_id);

        if !is_current {
            log::warn!("Discarding stale result for request {request_id}");
            return;
        }

        inner.inflight = None;
        inner.state = match result {
            Ok(classification) => RequestState::Succeeded {
                request_id,
                classification: classification.clone(),
            },
            Err(e) => {
                log::warn!("Request {request_id} failed: {e}");
                RequestState::Failed {
                    request_id,
                    error: e.to_string(),
                }
            }
        };
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
