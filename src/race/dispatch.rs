//! Exactly-once delivery of a race result.
//!
//! The result is always posted to the executor captured when the race
//! started, never run inline from the attempt that produced it.

use crate::base::neterror::NetError;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::runtime::Handle;

type Handler<T> = Box<dyn FnOnce(Result<T, NetError>) + Send>;

/// Owns the caller's completion handler until the race finishes.
pub struct CompletionDispatcher<T> {
    handler: Mutex<Option<Handler<T>>>,
    executor: Handle,
}

impl<T: Send + 'static> CompletionDispatcher<T> {
    pub fn new<F>(executor: Handle, handler: F) -> Self
    where
        F: FnOnce(Result<T, NetError>) + Send + 'static,
    {
        Self {
            handler: Mutex::new(Some(Box::new(handler))),
            executor,
        }
    }

    /// Posts `result` to the handler's executor.
    ///
    /// Returns false (and drops `result`) if the handler already ran.
    pub fn complete(&self, result: Result<T, NetError>) -> bool {
        let handler = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handler {
            Some(handler) => {
                self.executor.spawn(async move { handler(result) });
                true
            }
            None => {
                tracing::warn!("race completion requested twice; dropping result");
                false
            }
        }
    }

    /// Returns true once a result has been handed off.
    pub fn is_completed(&self) -> bool {
        self.handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl<T> fmt::Debug for CompletionDispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self
            .handler
            .lock()
            .map(|h| h.is_some())
            .unwrap_or(false);
        f.debug_struct("CompletionDispatcher")
            .field("pending", &pending)
            .finish_non_exhaustive()
    }
}
