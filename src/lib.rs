//! # eyeballs
//!
//! Outbound connection establishment for proxies, in the style of
//! Chromium's `TransportConnectJob`.
//!
//! Given a resolved candidate list that may mix IPv4 and IPv6, `eyeballs`
//! races connects to every candidate and hands the caller exactly one
//! result: the first stream to connect, or the error of the last attempt
//! to fail.
//!
//! ## Features
//!
//! - **Happy Eyeballs**: IPv6 starts at once, IPv4 waits 200ms when both
//!   families are present
//! - **Loser cancellation**: the winner cancels every other attempt
//! - **Exactly-once completion**: results are posted to the caller's runtime
//! - **Sequential fallback** and address-family restriction
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eyeballs::race::ConnectRace;
//! use eyeballs::socket::{Destination, TcpConnector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let addrs = tokio::net::lookup_host("example.com:443").await.unwrap();
//!     let race = ConnectRace::new(TcpConnector::new());
//!     let destination = Destination::new();
//!     let winner = race.connect(&destination, addrs).await.unwrap();
//!     println!("Connected to {}", winner);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions
//! - [`socket`] - Connector seam, TCP connector, destination slot
//! - [`race`] - The connect race

pub mod base;
pub mod race;
pub mod socket;
