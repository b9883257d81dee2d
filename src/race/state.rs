//! State shared by every attempt of one race.
//!
//! The attempt table is sized once, before any attempt is spawned, and is
//! never resized. Cancellation only ever walks that fixed slice, so no lock
//! guards it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Lifecycle of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttemptPhase {
    Created = 0,
    Connecting = 1,
    Succeeded = 2,
    Failed = 3,
    Cancelled = 4,
    /// Delayed attempt that never started because the race was already won.
    Skipped = 5,
}

impl AttemptPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AttemptPhase::Connecting,
            2 => AttemptPhase::Succeeded,
            3 => AttemptPhase::Failed,
            4 => AttemptPhase::Cancelled,
            5 => AttemptPhase::Skipped,
            _ => AttemptPhase::Created,
        }
    }

    /// Terminal phases never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptPhase::Created | AttemptPhase::Connecting)
    }
}

/// Cancellation handle and phase of one attempt slot.
#[derive(Debug)]
pub(crate) struct AttemptHandle {
    endpoint: SocketAddr,
    cancel: Notify,
    phase: AtomicU8,
}

impl AttemptHandle {
    fn new(endpoint: SocketAddr) -> Self {
        Self {
            endpoint,
            cancel: Notify::new(),
            phase: AtomicU8::new(AttemptPhase::Created as u8),
        }
    }

    /// Signals the attempt to stop. The signal is kept until the attempt
    /// waits for it, so cancelling an attempt that has not started yet works.
    pub(crate) fn cancel(&self) {
        self.cancel.notify_one();
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.notified().await
    }

    pub(crate) fn set_phase(&self, phase: AttemptPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    pub(crate) fn phase(&self) -> AttemptPhase {
        AttemptPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }
}

/// Winner flag, outstanding counter and attempt table of one race.
#[derive(Debug)]
pub struct RaceState {
    winner: AtomicBool,
    outstanding: AtomicUsize,
    attempts: Box<[AttemptHandle]>,
}

impl RaceState {
    pub(crate) fn new<I>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = SocketAddr>,
    {
        let attempts: Box<[AttemptHandle]> =
            endpoints.into_iter().map(AttemptHandle::new).collect();
        Self {
            winner: AtomicBool::new(false),
            outstanding: AtomicUsize::new(attempts.len()),
            attempts,
        }
    }

    /// Returns true once some attempt has claimed the win.
    pub fn is_won(&self) -> bool {
        self.winner.load(Ordering::Acquire)
    }

    /// Single-assignment claim. Exactly one caller ever gets `true`.
    pub(crate) fn claim_winner(&self) -> bool {
        self.winner
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Marks one attempt finished. Returns true for the last one.
    ///
    /// A winner claims before it finishes, so the last finisher always
    /// observes the claim through this counter.
    pub(crate) fn finish_attempt(&self) -> bool {
        self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Attempts that have not finished yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub(crate) fn attempt(&self, slot: usize) -> Option<&AttemptHandle> {
        self.attempts.get(slot)
    }

    /// Signals every attempt except `winner`.
    pub(crate) fn cancel_others(&self, winner: usize) {
        for (slot, handle) in self.attempts.iter().enumerate() {
            if slot != winner && !handle.phase().is_terminal() {
                tracing::trace!(endpoint = %handle.endpoint(), "cancelling losing attempt");
                handle.cancel();
            }
        }
    }

    /// Signals every attempt that has not finished.
    pub(crate) fn cancel_all(&self) {
        for handle in self.attempts.iter() {
            if !handle.phase().is_terminal() {
                handle.cancel();
            }
        }
    }

    /// Snapshot of every attempt's phase, in slot order.
    pub fn phases(&self) -> Vec<AttemptPhase> {
        self.attempts.iter().map(AttemptHandle::phase).collect()
    }
}
