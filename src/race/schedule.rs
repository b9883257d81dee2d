//! Per-attempt start decisions.

use super::classify::Families;
use std::net::SocketAddr;
use std::time::Duration;

/// When an attempt may begin connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Immediate,
    /// Wait this long, then start unless the race already has a winner.
    Delayed(Duration),
}

/// Holds IPv4 candidates back behind a fixed bias delay when the candidate
/// list mixes families. Single-family lists start everything at once.
#[derive(Debug, Clone, Copy)]
pub struct DelayScheduler {
    families: Families,
    bias_delay: Duration,
}

impl DelayScheduler {
    pub fn new(families: Families, bias_delay: Duration) -> Self {
        Self {
            families,
            bias_delay,
        }
    }

    pub fn schedule(&self, endpoint: &SocketAddr) -> Dispatch {
        if self.families.is_mixed() && endpoint.is_ipv4() {
            Dispatch::Delayed(self.bias_delay)
        } else {
            Dispatch::Immediate
        }
    }
}
