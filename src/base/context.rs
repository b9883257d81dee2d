//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into context-rich `NetError` variants.

use crate::base::neterror::NetError;
use std::io;
use std::net::SocketAddr;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Add the endpoint being connected to an IO error.
    ///
    /// # Example
    /// ```ignore
    /// use eyeballs::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await.connect_context(addr)?;
    /// // Error: "Connection to 192.0.2.1:443 failed: connection refused"
    /// ```
    fn connect_context(self, endpoint: SocketAddr) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connect_context(self, endpoint: SocketAddr) -> Result<T, NetError> {
        self.map_err(|e| NetError::connection_failed_to(endpoint, e))
    }
}
