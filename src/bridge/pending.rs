//! Correlation table for in-flight requests
//!
//! Each entry is removed exactly once: by its result, by the unmount of its
//! view, or by the caller giving up on registration. Results for unknown ids
//! (late, duplicate or invented) are ignored.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use super::types::{CommandError, RequestId, ViewId};

pub type Outcome = Result<Value, CommandError>;

struct PendingRequest {
    sender: oneshot::Sender<Outcome>,
    view_id: ViewId,
    command: &'static str,
    issued_at: Instant,
}

/// What happened to a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Handed to the waiting caller
    Delivered,
    /// The caller stopped waiting; the result was discarded
    Abandoned,
    /// No such request in flight
    Unknown,
}

/// A request outstanding for longer than expected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleRequest {
    pub request_id: RequestId,
    pub view_id: ViewId,
    pub command: &'static str,
    pub age: Duration,
}

pub struct PendingRequests {
    entries: Mutex<HashMap<RequestId, PendingRequest>>,
    /// 0 = unlimited
    max_in_flight: usize,
}

impl PendingRequests {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_in_flight,
        }
    }

    /// Start tracking a request and return the receiving end of its result
    pub fn register(
        &self,
        request_id: RequestId,
        view_id: ViewId,
        command: &'static str,
    ) -> Result<oneshot::Receiver<Outcome>, CommandError> {
        let mut entries = self.entries.lock();
        if self.max_in_flight > 0 && entries.len() >= self.max_in_flight {
            return Err(CommandError::TooManyInFlight {
                limit: self.max_in_flight,
            });
        }

        let (sender, receiver) = oneshot::channel();
        entries.insert(
            request_id,
            PendingRequest {
                sender,
                view_id,
                command,
                issued_at: Instant::now(),
            },
        );
        Ok(receiver)
    }

    /// Stop tracking a request without resolving it
    pub fn forget(&self, request_id: RequestId) -> bool {
        self.entries.lock().remove(&request_id).is_some()
    }

    /// Hand `outcome` to the caller waiting on `request_id`
    pub fn resolve(&self, request_id: RequestId, outcome: Outcome) -> Resolution {
        // Removal happens under the lock, so a second completion finds nothing.
        let Some(pending) = self.entries.lock().remove(&request_id) else {
            tracing::warn!(request_id = %request_id, "Completion for unknown request ignored");
            return Resolution::Unknown;
        };

        match pending.sender.send(outcome) {
            Ok(()) => {
                tracing::debug!(
                    request_id = %request_id,
                    view_id = %pending.view_id,
                    command = pending.command,
                    elapsed_ms = pending.issued_at.elapsed().as_millis() as u64,
                    "Request completed"
                );
                Resolution::Delivered
            }
            Err(_) => {
                tracing::debug!(
                    request_id = %request_id,
                    view_id = %pending.view_id,
                    command = pending.command,
                    "Caller stopped waiting, result discarded"
                );
                Resolution::Abandoned
            }
        }
    }

    /// Fail every request addressed to `view_id`; returns how many were failed
    pub fn reject_view(&self, view_id: ViewId, error: CommandError) -> usize {
        let rejected: Vec<(RequestId, PendingRequest)> = {
            let mut entries = self.entries.lock();
            let ids: Vec<RequestId> = entries
                .iter()
                .filter(|(_, pending)| pending.view_id == view_id)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| entries.remove(&id).map(|pending| (id, pending)))
                .collect()
        };

        let count = rejected.len();
        for (request_id, pending) in rejected {
            tracing::debug!(
                request_id = %request_id,
                view_id = %view_id,
                command = pending.command,
                "Rejecting in-flight request"
            );
            let _ = pending.sender.send(Err(error.clone()));
        }
        count
    }

    /// Requests outstanding for at least `older_than`, oldest first
    pub fn stale(&self, older_than: Duration) -> Vec<StaleRequest> {
        let entries = self.entries.lock();
        let mut stale: Vec<StaleRequest> = entries
            .iter()
            .filter_map(|(request_id, pending)| {
                let age = pending.issued_at.elapsed();
                (age >= older_than).then(|| StaleRequest {
                    request_id: *request_id,
                    view_id: pending.view_id,
                    command: pending.command,
                    age,
                })
            })
            .collect();
        stale.sort_by(|a, b| b.age.cmp(&a.age));
        stale
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Forgets a registered request on drop until [`Undispatched::dispatched`]
///
/// A caller dropped between registration and queueing would otherwise hold
/// its slot until the view is unmounted.
pub struct Undispatched<'a> {
    pending: &'a PendingRequests,
    request_id: Option<RequestId>,
}

impl<'a> Undispatched<'a> {
    pub fn new(pending: &'a PendingRequests, request_id: RequestId) -> Self {
        Self {
            pending,
            request_id: Some(request_id),
        }
    }

    /// The request reached its surface; its entry now waits for a result
    pub fn dispatched(mut self) {
        self.request_id = None;
    }
}

impl Drop for Undispatched<'_> {
    fn drop(&mut self) {
        if let Some(request_id) = self.request_id.take() {
            if self.pending.forget(request_id) {
                tracing::debug!(request_id = %request_id, "Undispatched request forgotten");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_once() {
        let pending = PendingRequests::new(0);
        let id = RequestId::new(1);
        let receiver = pending.register(id, ViewId::new(1), "saveCurrentDocument").unwrap();

        assert_eq!(pending.resolve(id, Ok(json!(true))), Resolution::Delivered);
        assert_eq!(pending.resolve(id, Ok(json!(false))), Resolution::Unknown);
        assert_eq!(receiver.await.unwrap(), Ok(json!(true)));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_abandoned_result_is_discarded() {
        let pending = PendingRequests::new(0);
        let id = RequestId::new(5);
        let receiver = pending.register(id, ViewId::new(1), "getPageSize").unwrap();
        drop(receiver);
        assert_eq!(pending.resolve(id, Ok(json!({}))), Resolution::Abandoned);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_in_flight_limit() {
        let pending = PendingRequests::new(2);
        let view = ViewId::new(1);
        let _a = pending.register(RequestId::new(1), view, "getPageSize").unwrap();
        let _b = pending.register(RequestId::new(2), view, "getPageSize").unwrap();
        assert!(matches!(
            pending.register(RequestId::new(3), view, "getPageSize"),
            Err(CommandError::TooManyInFlight { limit: 2 })
        ));

        assert!(pending.forget(RequestId::new(1)));
        assert!(pending.register(RequestId::new(3), view, "getPageSize").is_ok());
    }

    #[tokio::test]
    async fn test_reject_view_only_touches_that_view() {
        let pending = PendingRequests::new(0);
        let first = pending.register(RequestId::new(1), ViewId::new(1), "getAllAnnotations").unwrap();
        let _other = pending.register(RequestId::new(2), ViewId::new(2), "getAllAnnotations").unwrap();

        let rejected = pending.reject_view(ViewId::new(1), CommandError::ViewDisposed(ViewId::new(1)));
        assert_eq!(rejected, 1);
        assert_eq!(first.await.unwrap(), Err(CommandError::ViewDisposed(ViewId::new(1))));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_stale_requests() {
        let pending = PendingRequests::new(0);
        let _a = pending.register(RequestId::new(1), ViewId::new(1), "getThumbnails").unwrap();
        assert_eq!(pending.stale(Duration::ZERO).len(), 1);
        assert!(pending.stale(Duration::from_secs(3600)).is_empty());
    }

    #[test]
    fn test_undispatched_guard_frees_the_slot() {
        let pending = PendingRequests::new(1);
        let id = RequestId::new(3);
        let _receiver = pending.register(id, ViewId::new(1), "getPageSize").unwrap();
        drop(Undispatched::new(&pending, id));
        assert!(pending.is_empty());

        let id = RequestId::new(4);
        let _receiver = pending.register(id, ViewId::new(1), "getPageSize").unwrap();
        Undispatched::new(&pending, id).dispatched();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.resolve(id, Ok(json!(null))), Resolution::Delivered);
    }
}
