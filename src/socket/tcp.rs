//! TCP connector used by the race in production.
//!
//! Each call creates a fresh `TcpSocket` for the endpoint's family, binds it
//! to the configured local address for that family (if any), and connects.

use super::stream::{Connecting, Connector};
use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use serde::{Deserialize, Serialize};
use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::net::{TcpSocket, TcpStream};

/// Per-socket options applied by [`TcpConnector`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConnectorConfig {
    /// Local address IPv4 sockets bind to before connecting
    pub local_address_ipv4: Option<Ipv4Addr>,
    /// Local address IPv6 sockets bind to before connecting
    pub local_address_ipv6: Option<Ipv6Addr>,
    /// Set TCP_NODELAY on connected streams
    pub nodelay: bool,
    /// Upper bound for a single attempt's connect
    pub connect_timeout: Option<Duration>,
}

impl TcpConnectorConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the IPv4 local bind address.
    pub fn local_address_ipv4(mut self, addr: Option<Ipv4Addr>) -> Self {
        self.local_address_ipv4 = addr;
        self
    }

    /// Set the IPv6 local bind address.
    pub fn local_address_ipv6(mut self, addr: Option<Ipv6Addr>) -> Self {
        self.local_address_ipv6 = addr;
        self
    }

    /// Enable or disable TCP_NODELAY.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Set the per-attempt connect timeout.
    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn local_address_for(&self, endpoint: &SocketAddr) -> Option<SocketAddr> {
        match endpoint {
            SocketAddr::V4(_) => self
                .local_address_ipv4
                .map(|ip| SocketAddr::new(IpAddr::V4(ip), 0)),
            SocketAddr::V6(_) => self
                .local_address_ipv6
                .map(|ip| SocketAddr::new(IpAddr::V6(ip), 0)),
        }
    }
}

/// Connects plain TCP sockets.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    config: Arc<TcpConnectorConfig>,
}

impl TcpConnector {
    /// Creates a connector with default socket options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector with the given socket options.
    pub fn with_config(config: TcpConnectorConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &TcpConnectorConfig {
        &self.config
    }

    async fn connect_one(
        config: &TcpConnectorConfig,
        endpoint: SocketAddr,
    ) -> Result<TcpStream, NetError> {
        let socket = match endpoint {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .connect_context(endpoint)?;

        if let Some(local) = config.local_address_for(&endpoint) {
            tracing::trace!(%endpoint, %local, "binding attempt socket");
            socket.bind(local).connect_context(endpoint)?;
        }

        let stream = match config.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, socket.connect(endpoint)).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "connect attempt timed out",
                )),
            },
            None => socket.connect(endpoint).await,
        }
        .connect_context(endpoint)?;

        if config.nodelay {
            stream.set_nodelay(true).connect_context(endpoint)?;
        }

        Ok(stream)
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, endpoint: SocketAddr) -> Connecting<TcpStream> {
        let config = Arc::clone(&self.config);
        Box::pin(async move { Self::connect_one(&config, endpoint).await })
    }
}
