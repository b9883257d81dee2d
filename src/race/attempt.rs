//! One connect attempt within a race.

use super::dispatch::CompletionDispatcher;
use super::schedule::Dispatch;
use super::state::{AttemptPhase, RaceState};
use crate::base::neterror::NetError;
use crate::socket::stream::{Connector, Destination};
use std::net::SocketAddr;
use std::sync::Arc;

/// A single candidate's connect task.
///
/// `slot`, `position`, `endpoint` and `dispatch` are owned by the attempt.
/// Every other field is shared with the race and its other attempts. The
/// socket itself only exists inside [`Attempt::run`] and is owned there until
/// it is either moved into `destination` or dropped.
pub(crate) struct Attempt<C: Connector> {
    /// Index into the race's attempt table.
    pub(crate) slot: usize,
    /// Index in the caller's candidate list, reported on success.
    pub(crate) position: usize,
    pub(crate) endpoint: SocketAddr,
    pub(crate) dispatch: Dispatch,
    /// Shared: winner flag, counter and cancel signals.
    pub(crate) state: Arc<RaceState>,
    /// Shared: creates this attempt's socket.
    pub(crate) connector: Arc<C>,
    /// Shared with the caller; written only by the winner.
    pub(crate) destination: Destination<C::Stream>,
    /// Shared: fires once per race.
    pub(crate) completion: Arc<CompletionDispatcher<usize>>,
}

impl<C: Connector> Attempt<C> {
    pub(crate) async fn run(self) {
        let Some(handle) = self.state.attempt(self.slot) else {
            return;
        };

        if let Dispatch::Delayed(delay) = self.dispatch {
            let cancelled = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = handle.cancelled() => true,
            };

            if cancelled && !self.state.is_won() {
                self.on_failed(NetError::ConnectionAborted);
                return;
            }
            if self.state.is_won() {
                tracing::trace!(endpoint = %self.endpoint, "race already won, skipping delayed attempt");
                self.skip();
                return;
            }
        }

        handle.set_phase(AttemptPhase::Connecting);
        tracing::trace!(endpoint = %self.endpoint, slot = self.slot, "attempt connecting");

        let outcome = tokio::select! {
            biased;
            _ = handle.cancelled() => Err(NetError::ConnectionAborted),
            result = self.connector.connect(self.endpoint) => result,
        };

        match outcome {
            Ok(stream) => self.on_connected(stream),
            Err(err) => self.on_failed(err),
        }
    }

    /// Marks a never-started attempt as finished without reporting.
    pub(crate) fn skip(&self) {
        if let Some(handle) = self.state.attempt(self.slot) {
            handle.set_phase(AttemptPhase::Skipped);
        }
        self.state.finish_attempt();
    }

    fn on_connected(&self, stream: C::Stream) {
        if !self.state.claim_winner() {
            tracing::trace!(endpoint = %self.endpoint, "connected after race was won, closing");
            self.set_phase(AttemptPhase::Cancelled);
            drop(stream);
            self.state.finish_attempt();
            return;
        }

        self.set_phase(AttemptPhase::Succeeded);
        if let Some(previous) = self.destination.replace(stream) {
            drop(previous);
        }
        self.state.cancel_others(self.slot);
        self.state.finish_attempt();

        tracing::debug!(endpoint = %self.endpoint, position = self.position, "attempt won race");
        self.completion.complete(Ok(self.position));
    }

    fn on_failed(&self, err: NetError) {
        if err.is_aborted() {
            self.set_phase(AttemptPhase::Cancelled);
        } else {
            self.set_phase(AttemptPhase::Failed);
        }

        let last = self.state.finish_attempt();
        if last && !self.state.is_won() {
            tracing::debug!(endpoint = %self.endpoint, error = %err, "last attempt failed");
            self.completion.complete(Err(err));
        } else {
            tracing::trace!(endpoint = %self.endpoint, error = %err, "attempt failed");
        }
    }

    fn set_phase(&self, phase: AttemptPhase) {
        if let Some(handle) = self.state.attempt(self.slot) {
            handle.set_phase(phase);
        }
    }
}
