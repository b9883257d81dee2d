use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Internet disconnected")]
    InternetDisconnected,
    #[error("Address invalid")]
    AddressInvalid,
    #[error("Address unreachable")]
    AddressUnreachable,
    #[error("Connection timed out")]
    ConnectionTimedOut,
    #[error("Network access denied")]
    NetworkAccessDenied,
    #[error("Address in use")]
    AddressInUse,

    // Race Errors
    #[error("No endpoints to connect to")]
    NoEndpoints,

    /// Connect failure that keeps the endpoint and the OS error around.
    #[error("Connection to {endpoint} failed: {source}")]
    ConnectionFailedTo {
        endpoint: SocketAddr,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::InternetDisconnected => -106,
            NetError::AddressInvalid => -108,
            NetError::AddressUnreachable => -109,
            NetError::ConnectionTimedOut => -118,
            NetError::NetworkAccessDenied => -138,
            NetError::AddressInUse => -147,
            // Custom codes start at -910, clear of the Blob range
            NetError::NoEndpoints => -910,
            NetError::ConnectionFailedTo { source, .. } => NetError::from(source.as_ref()).as_i32(),
            NetError::Unknown(code) => *code,
        }
    }

    /// Wraps an OS connect error together with the endpoint it came from.
    pub fn connection_failed_to(endpoint: SocketAddr, source: io::Error) -> Self {
        NetError::ConnectionFailedTo {
            endpoint,
            source: Arc::new(source),
        }
    }

    /// Returns true for the error produced by cancelling an attempt.
    pub fn is_aborted(&self) -> bool {
        match self {
            NetError::ConnectionAborted => true,
            NetError::ConnectionFailedTo { source, .. } => {
                source.kind() == io::ErrorKind::ConnectionAborted
            }
            _ => false,
        }
    }

    /// The endpoint this error is about, when it carries one.
    pub fn endpoint(&self) -> Option<SocketAddr> {
        match self {
            NetError::ConnectionFailedTo { endpoint, .. } => Some(*endpoint),
            _ => None,
        }
    }
}

impl PartialEq for NetError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                NetError::ConnectionFailedTo { endpoint: a, source: x },
                NetError::ConnectionFailedTo { endpoint: b, source: y },
            ) => a == b && x.kind() == y.kind(),
            (NetError::Unknown(a), NetError::Unknown(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Eq for NetError {}

impl From<&io::Error> for NetError {
    fn from(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
            io::ErrorKind::ConnectionAborted => NetError::ConnectionAborted,
            io::ErrorKind::TimedOut => NetError::ConnectionTimedOut,
            io::ErrorKind::AddrInUse => NetError::AddressInUse,
            io::ErrorKind::AddrNotAvailable | io::ErrorKind::InvalidInput => {
                NetError::AddressInvalid
            }
            io::ErrorKind::PermissionDenied => NetError::NetworkAccessDenied,
            io::ErrorKind::NotConnected => NetError::ConnectionClosed,
            _ => match err.raw_os_error() {
                // ENETUNREACH / EHOSTUNREACH on Linux and macOS
                Some(101) | Some(113) | Some(51) | Some(65) => NetError::AddressUnreachable,
                // ENETDOWN
                Some(100) | Some(50) => NetError::InternetDisconnected,
                _ => NetError::ConnectionFailed,
            },
        }
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        NetError::from(&err)
    }
}

impl From<i32> for NetError {
    fn from(code: i32) -> Self {
        match code {
            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -106 => NetError::InternetDisconnected,
            -108 => NetError::AddressInvalid,
            -109 => NetError::AddressUnreachable,
            -118 => NetError::ConnectionTimedOut,
            -138 => NetError::NetworkAccessDenied,
            -147 => NetError::AddressInUse,
            -910 => NetError::NoEndpoints,
            _ => NetError::Unknown(code),
        }
    }
}
