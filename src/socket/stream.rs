//! Connector abstraction and the caller-visible destination slot.
//!
//! A [`Connector`] opens one fresh transport per call and drives a single
//! outbound connect. The race owns one such future per attempt; dropping the
//! future cancels the connect and closes its socket.

use crate::base::neterror::NetError;
use std::{
    fmt,
    future::Future,
    net::{IpAddr, SocketAddr, SocketAddrV4, SocketAddrV6},
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::runtime::Handle;

/// Alias for the `Future` type returned by a connector.
pub type Connecting<S> = Pin<Box<dyn Future<Output = Result<S, NetError>> + Send>>;

/// Opens transports to single endpoints.
///
/// Chromium equivalent: the per-address step of `TransportConnectJob`.
/// Implementations must be thread-safe; every attempt of a race shares one
/// connector.
pub trait Connector: Send + Sync + 'static {
    /// The connected transport handed to the caller.
    type Stream: Send + 'static;

    /// Creates a new socket and connects it to `endpoint`.
    ///
    /// No socket may be created before the returned future is first polled.
    fn connect(&self, endpoint: SocketAddr) -> Connecting<Self::Stream>;
}

/// Blanket implementation for Arc-wrapped connectors.
impl<C: Connector + ?Sized> Connector for Arc<C> {
    type Stream = C::Stream;

    fn connect(&self, endpoint: SocketAddr) -> Connecting<Self::Stream> {
        (**self).connect(endpoint)
    }
}

/// Anything that names a single transport address.
///
/// Lets the race accept resolver entries or other richer element types and
/// hand the winning element back unchanged.
pub trait ToEndpoint {
    fn endpoint(&self) -> SocketAddr;
}

impl ToEndpoint for SocketAddr {
    fn endpoint(&self) -> SocketAddr {
        *self
    }
}

impl ToEndpoint for SocketAddrV4 {
    fn endpoint(&self) -> SocketAddr {
        SocketAddr::V4(*self)
    }
}

impl ToEndpoint for SocketAddrV6 {
    fn endpoint(&self) -> SocketAddr {
        SocketAddr::V6(*self)
    }
}

impl ToEndpoint for (IpAddr, u16) {
    fn endpoint(&self) -> SocketAddr {
        SocketAddr::new(self.0, self.1)
    }
}

impl<T: ToEndpoint + ?Sized> ToEndpoint for &T {
    fn endpoint(&self) -> SocketAddr {
        (**self).endpoint()
    }
}

/// The caller's stream slot that a race connects.
///
/// Clones share the same slot. Only the winning attempt of a race writes to
/// it; whatever the slot held before is dropped (closed) at that point.
/// Attempts are spawned on the runtime the destination belongs to.
pub struct Destination<S> {
    slot: Arc<Mutex<Option<S>>>,
    executor: Handle,
}

impl<S> Destination<S> {
    /// Creates an empty destination bound to the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime, like `Handle::current`.
    pub fn new() -> Self {
        Self::with_executor(Handle::current())
    }

    /// Creates an empty destination bound to `executor`.
    pub fn with_executor(executor: Handle) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            executor,
        }
    }

    /// Creates a destination that already holds a stream.
    ///
    /// The stream is dropped when a race connects this destination.
    pub fn with_stream(stream: S, executor: Handle) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(stream))),
            executor,
        }
    }

    /// Returns true if the slot holds a stream.
    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Moves the connected stream out, leaving the slot empty.
    pub fn take(&self) -> Option<S> {
        self.lock().take()
    }

    /// The runtime attempts for this destination run on.
    pub fn executor(&self) -> &Handle {
        &self.executor
    }

    /// Stores `stream`, returning the previous contents.
    pub(crate) fn replace(&self, stream: S) -> Option<S> {
        self.lock().replace(stream)
    }

    fn lock(&self) -> MutexGuard<'_, Option<S>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> Clone for Destination<S> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            executor: self.executor.clone(),
        }
    }
}

impl<S> Default for Destination<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for Destination<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
