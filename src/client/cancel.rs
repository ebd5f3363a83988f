//! Request cancellation.
//!
//! Every dispatched request is tied to a [`CancelHandle`]. The endpoint keeps
//! track of the most recently dispatched one in a [`LastRequest`] slot, which
//! callers read through `Endpoint::last_request()` to abort the latest call.
//!
//! The slot is cleared only by the request that currently owns it: when an
//! older request settles after a newer one was dispatched, the newer handle
//! stays tracked.

use crate::error::{EndpointError, Result};
use futures::future::{self, Either};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Cancellation handle for one in-flight request.
///
/// Cloning the handle shares the underlying token: cancelling any clone
/// cancels the request.
///
/// # Examples
///
/// ```
/// use endpoint_http::client::CancelHandle;
///
/// let handle = CancelHandle::new();
/// let other = handle.clone();
/// other.abort();
/// assert!(handle.is_aborted());
/// assert!(handle.same_request(&other));
/// ```
#[derive(Debug, Clone)]
pub struct CancelHandle {
    id: Uuid,
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a fresh, uncancelled handle.
    pub fn new() -> Self {
        CancelHandle {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
        }
    }

    /// Unique id of the request this handle belongs to.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Abort the request.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Whether [`abort`](Self::abort) has been called.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether both handles belong to the same request.
    pub fn same_request(&self, other: &CancelHandle) -> bool {
        self.id == other.id
    }

    /// Drive `fut` to completion unless the handle is aborted first.
    pub(crate) async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_aborted() {
            return Err(EndpointError::Aborted);
        }

        let cancelled = self.token.cancelled();
        futures::pin_mut!(fut);
        futures::pin_mut!(cancelled);

        match future::select(fut, cancelled).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(EndpointError::Aborted),
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot holding the handle of the most recently dispatched request.
#[derive(Debug, Default)]
pub(crate) struct LastRequest {
    slot: Mutex<Option<CancelHandle>>,
}

impl LastRequest {
    /// Track `handle` as the latest request, replacing any previous one.
    ///
    /// The slot is settled when the returned guard is dropped, including when
    /// the request future itself is dropped before completing.
    pub(crate) fn track(self: &Arc<Self>, handle: &CancelHandle) -> TrackedRequest {
        *self.slot.lock() = Some(handle.clone());
        TrackedRequest {
            last: Arc::clone(self),
            handle: handle.clone(),
        }
    }

    /// Clear the slot if it still tracks `handle`. Returns whether it did.
    fn settle(&self, handle: &CancelHandle) -> bool {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(current) if current.same_request(handle) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// The tracked handle, if any.
    pub(crate) fn get(&self) -> Option<CancelHandle> {
        self.slot.lock().clone()
    }
}

/// Keeps a request tracked in its [`LastRequest`] slot until dropped.
#[derive(Debug)]
#[must_use = "dropping the guard settles the request immediately"]
pub(crate) struct TrackedRequest {
    last: Arc<LastRequest>,
    handle: CancelHandle,
}

impl Drop for TrackedRequest {
    fn drop(&mut self) {
        self.last.settle(&self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_handles_are_unique() {
        let a = CancelHandle::new();
        let b = CancelHandle::new();
        assert!(!a.same_request(&b));
        assert!(a.same_request(&a.clone()));
    }

    #[test]
    fn test_settle_only_clears_matching_handle() {
        let last = Arc::new(LastRequest::default());
        let older = CancelHandle::new();
        let newer = CancelHandle::new();

        let older_guard = last.track(&older);
        let newer_guard = last.track(&newer);

        drop(older_guard);
        assert!(last.get().unwrap().same_request(&newer));

        drop(newer_guard);
        assert!(last.get().is_none());
    }

    #[test]
    fn test_settle_reports_whether_slot_cleared() {
        let last = LastRequest::default();
        let handle = CancelHandle::new();
        *last.slot.lock() = Some(handle.clone());

        assert!(!last.settle(&CancelHandle::new()));
        assert!(last.settle(&handle));
        assert!(last.get().is_none());
    }

    #[tokio::test]
    async fn test_dropped_future_settles_slot() {
        let last = Arc::new(LastRequest::default());
        let handle = CancelHandle::new();

        let pending = {
            let last = last.clone();
            let handle = handle.clone();
            async move {
                let _tracked = last.track(&handle);
                handle
                    .run(async {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok::<_, EndpointError>(())
                    })
                    .await
            }
        };

        let timed_out = tokio::time::timeout(Duration::from_millis(20), pending).await;
        assert!(timed_out.is_err());
        assert!(last.get().is_none());
    }

    #[tokio::test]
    async fn test_run_completes_when_not_aborted() {
        let handle = CancelHandle::new();
        let result = handle.run(async { Ok::<_, EndpointError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_run_returns_aborted() {
        let handle = CancelHandle::new();
        let aborter = handle.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            aborter.abort();
        });

        let result = handle
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, EndpointError>(())
            })
            .await;

        assert!(matches!(result, Err(EndpointError::Aborted)));
    }

    #[tokio::test]
    async fn test_run_short_circuits_when_already_aborted() {
        let handle = CancelHandle::new();
        handle.abort();
        let result = handle.run(async { Ok::<_, EndpointError>(()) }).await;
        assert!(result.unwrap_err().is_aborted());
    }
}
