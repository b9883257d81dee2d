//! Happy Eyeballs connect race.
//!
//! Connects to the fastest reachable candidate of a resolved address list:
//! - [`classify`]: detects whether the list mixes IPv4 and IPv6
//! - [`schedule`]: holds IPv4 back behind a bias delay in mixed lists
//! - [`state`]: winner flag, outstanding counter and attempt table
//! - [`dispatch`]: posts the single result to the caller's executor
//! - [`connect`]: the [`ConnectRace`] orchestrator and its entry points
//! - [`config`]: [`RaceConfig`]

mod attempt;
pub mod classify;
pub mod config;
pub mod connect;
pub mod dispatch;
pub mod schedule;
pub mod state;

pub use classify::{classify, Families};
pub use config::{FamilyPreference, RaceConfig, DEFAULT_BIAS_DELAY};
pub use connect::{ConnectRace, RaceHandle, Winner};
pub use schedule::{DelayScheduler, Dispatch};
pub use state::AttemptPhase;
