//! Transport plumbing for the connect race.
//!
//! - [`stream`]: the [`Connector`](stream::Connector) seam and the caller's
//!   [`Destination`](stream::Destination) slot
//! - [`tcp`]: the TCP connector with per-family bind addresses

pub mod stream;
pub mod tcp;

pub use stream::{Connecting, Connector, Destination, ToEndpoint};
pub use tcp::{TcpConnector, TcpConnectorConfig};
