//! The connect race orchestrator.
//!
//! Given resolved candidates, spawns one [`Attempt`] per candidate on the
//! destination's runtime, staggering IPv4 behind IPv6 when both are present,
//! and reports the first success (or the last failure) exactly once.

use super::attempt::Attempt;
use super::classify::classify;
use super::config::RaceConfig;
use super::dispatch::CompletionDispatcher;
use super::schedule::{DelayScheduler, Dispatch};
use super::state::{AttemptPhase, RaceState};
use crate::base::neterror::NetError;
use crate::socket::stream::{Connector, Destination, ToEndpoint};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Races connects to a list of candidates.
///
/// # Example
///
/// ```rust,ignore
/// use eyeballs::race::ConnectRace;
/// use eyeballs::socket::{Destination, TcpConnector};
///
/// let race = ConnectRace::new(TcpConnector::new());
/// let destination = Destination::new();
/// let winner = race.connect(&destination, resolved_addrs).await?;
/// let stream = destination.take().expect("connected");
/// ```
pub struct ConnectRace<C> {
    connector: Arc<C>,
    config: RaceConfig,
}

impl<C> Clone for ConnectRace<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            config: self.config.clone(),
        }
    }
}

impl<C> std::fmt::Debug for ConnectRace<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRace")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The element a race connected to, with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner<T> {
    pub position: usize,
    pub item: T,
}

/// Handle to a started race.
#[derive(Debug, Clone)]
pub struct RaceHandle {
    state: Arc<RaceState>,
    completion: Arc<CompletionDispatcher<usize>>,
}

impl RaceHandle {
    /// Stops every unfinished attempt.
    ///
    /// If no attempt has won yet, the race completes with
    /// `NetError::ConnectionAborted` once the last attempt winds down.
    pub fn cancel(&self) {
        self.state.cancel_all();
    }

    /// Returns true once the result has been posted to the handler.
    pub fn is_completed(&self) -> bool {
        self.completion.is_completed()
    }

    /// Returns true once some attempt has won.
    pub fn is_won(&self) -> bool {
        self.state.is_won()
    }

    /// Attempts that are still running or waiting on the bias delay.
    pub fn outstanding(&self) -> usize {
        self.state.outstanding()
    }

    /// Phase of each attempt, in the order attempts were created.
    pub fn phases(&self) -> Vec<AttemptPhase> {
        self.state.phases()
    }
}

/// Cancels the race if the awaiting future is dropped early.
struct CancelOnDrop(RaceHandle);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if !self.0.is_completed() {
            self.0.cancel();
        }
    }
}

impl<C: Connector> ConnectRace<C> {
    /// Creates a race with default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, RaceConfig::default())
    }

    pub fn with_config(connector: C, config: RaceConfig) -> Self {
        Self {
            connector: Arc::new(connector),
            config,
        }
    }

    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Starts a race and reports through `handler`.
    ///
    /// `handler` receives the position of the winning candidate in
    /// `candidates`, or the error of the last attempt to finish. It runs
    /// exactly once, as a task on `handler_executor`. Attempts run on the
    /// destination's executor.
    pub fn start<F>(
        &self,
        destination: &Destination<C::Stream>,
        candidates: &[SocketAddr],
        handler_executor: &Handle,
        handler: F,
    ) -> RaceHandle
    where
        F: FnOnce(Result<usize, NetError>) + Send + 'static,
    {
        let completion = Arc::new(CompletionDispatcher::new(handler_executor.clone(), handler));
        let allowed = self.config.filter(candidates);
        let state = Arc::new(RaceState::new(allowed.iter().map(|(_, e)| *e)));
        let handle = RaceHandle {
            state: Arc::clone(&state),
            completion: Arc::clone(&completion),
        };

        if allowed.is_empty() {
            tracing::debug!(candidates = candidates.len(), "no endpoints to race");
            completion.complete(Err(NetError::NoEndpoints));
            return handle;
        }

        let families = classify(allowed.iter().map(|(_, e)| e));
        let scheduler = DelayScheduler::new(families, self.config.bias_delay);
        tracing::debug!(
            candidates = allowed.len(),
            mixed = families.is_mixed(),
            sequential = !self.config.happy_eyeballs,
            "starting connect race"
        );

        // The attempt table is complete before anything is spawned.
        let attempts: Vec<Attempt<C>> = allowed
            .iter()
            .enumerate()
            .map(|(slot, (position, endpoint))| Attempt {
                slot,
                position: *position,
                endpoint: *endpoint,
                dispatch: if self.config.happy_eyeballs {
                    scheduler.schedule(endpoint)
                } else {
                    Dispatch::Immediate
                },
                state: Arc::clone(&state),
                connector: Arc::clone(&self.connector),
                destination: destination.clone(),
                completion: Arc::clone(&completion),
            })
            .collect();

        let executor = destination.executor();
        if self.config.happy_eyeballs {
            for attempt in attempts {
                executor.spawn(attempt.run());
            }
        } else {
            executor.spawn(run_sequential(attempts, state));
        }

        handle
    }

    /// Connects to the first reachable endpoint of `endpoints`.
    pub async fn connect<I>(
        &self,
        destination: &Destination<C::Stream>,
        endpoints: I,
    ) -> Result<SocketAddr, NetError>
    where
        I: IntoIterator,
        I::Item: ToEndpoint,
    {
        let candidates: Vec<SocketAddr> =
            endpoints.into_iter().map(|e| e.endpoint()).collect();
        let position = self.race(destination, &candidates).await?;
        candidates.get(position).copied().ok_or(NetError::NoEndpoints)
    }

    /// Consumes `iter` and returns the element that won.
    pub async fn connect_iter<I>(
        &self,
        destination: &Destination<C::Stream>,
        iter: I,
    ) -> Result<Winner<I::Item>, NetError>
    where
        I: IntoIterator,
        I::Item: ToEndpoint,
    {
        let items: Vec<I::Item> = iter.into_iter().collect();
        let candidates: Vec<SocketAddr> = items.iter().map(ToEndpoint::endpoint).collect();
        let position = self.race(destination, &candidates).await?;
        let item = items
            .into_iter()
            .nth(position)
            .ok_or(NetError::NoEndpoints)?;
        Ok(Winner { position, item })
    }

    /// Races a borrowed range and returns a reference to the winner.
    ///
    /// An empty range fails with `NoEndpoints` without touching any element.
    pub async fn connect_range<'a, T>(
        &self,
        destination: &Destination<C::Stream>,
        range: &'a [T],
    ) -> Result<(usize, &'a T), NetError>
    where
        T: ToEndpoint,
    {
        let candidates: Vec<SocketAddr> = range.iter().map(ToEndpoint::endpoint).collect();
        let position = self.race(destination, &candidates).await?;
        range
            .get(position)
            .map(|item| (position, item))
            .ok_or(NetError::NoEndpoints)
    }

    async fn race(
        &self,
        destination: &Destination<C::Stream>,
        candidates: &[SocketAddr],
    ) -> Result<usize, NetError> {
        let (tx, rx) = oneshot::channel();
        let handle = self.start(destination, candidates, &Handle::current(), move |result| {
            let _ = tx.send(result);
        });
        let _guard = CancelOnDrop(handle);

        // The sender only disappears if the runtime dropped the handler task
        rx.await.unwrap_or(Err(NetError::ConnectionAborted))
    }
}

/// Tries attempts strictly one after another, in candidate order.
///
/// Uses the same winner/counter protocol as the concurrent race, so the
/// first success wins and the last failure is reported.
async fn run_sequential<C: Connector>(attempts: Vec<Attempt<C>>, state: Arc<RaceState>) {
    let mut attempts = attempts.into_iter();
    for attempt in attempts.by_ref() {
        attempt.run().await;
        if state.is_won() {
            break;
        }
    }
    for rest in attempts {
        rest.skip();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::stream::Connecting;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Connector whose outcome per endpoint is scripted.
    #[derive(Default)]
    struct ScriptedConnector {
        outcomes: HashMap<SocketAddr, (Duration, bool)>,
        created: AtomicUsize,
    }

    impl ScriptedConnector {
        fn with(mut self, addr: &str, latency_ms: u64, ok: bool) -> Self {
            self.outcomes
                .insert(addr.parse().unwrap(), (Duration::from_millis(latency_ms), ok));
            self
        }
    }

    impl Connector for ScriptedConnector {
        type Stream = SocketAddr;

        fn connect(&self, endpoint: SocketAddr) -> Connecting<SocketAddr> {
            self.created.fetch_add(1, Ordering::SeqCst);
            let (latency, ok) = self
                .outcomes
                .get(&endpoint)
                .copied()
                .unwrap_or((Duration::ZERO, false));
            Box::pin(async move {
                tokio::time::sleep(latency).await;
                if ok {
                    Ok(endpoint)
                } else {
                    Err(NetError::ConnectionRefused)
                }
            })
        }
    }

    fn addrs(list: &[&str]) -> Vec<SocketAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_success() {
        let race = ConnectRace::new(ScriptedConnector::default().with("192.0.2.1:80", 10, true));
        let dest = Destination::new();

        let winner = race.connect(&dest, addrs(&["192.0.2.1:80"])).await.unwrap();
        assert_eq!(winner, "192.0.2.1:80".parse::<SocketAddr>().unwrap());
        assert_eq!(dest.take(), Some(winner));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_creates_no_sockets() {
        let race = ConnectRace::new(ScriptedConnector::default());
        let dest = Destination::new();

        let err = race.connect(&dest, Vec::<SocketAddr>::new()).await.unwrap_err();
        assert_eq!(err, NetError::NoEndpoints);
        assert_eq!(race.connector().created.load(Ordering::SeqCst), 0);
        assert!(!dest.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_family_filter_to_empty() {
        let race = ConnectRace::with_config(
            ScriptedConnector::default().with("192.0.2.1:80", 1, true),
            RaceConfig::new().family(crate::race::config::FamilyPreference::V6Only),
        );
        let dest = Destination::new();

        let err = race.connect(&dest, addrs(&["192.0.2.1:80"])).await.unwrap_err();
        assert_eq!(err, NetError::NoEndpoints);
        assert_eq!(race.connector().created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_family_filter_reports_original_position() {
        let race = ConnectRace::with_config(
            ScriptedConnector::default()
                .with("[2001:db8::1]:80", 1, true)
                .with("192.0.2.1:80", 1, true),
            RaceConfig::new().family(crate::race::config::FamilyPreference::V4Only),
        );
        let dest = Destination::new();
        let list = addrs(&["[2001:db8::1]:80", "192.0.2.1:80"]);

        let (position, item) = race.connect_range(&dest, &list).await.unwrap();
        assert_eq!(position, 1);
        assert_eq!(*item, list[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_v4_skipped_after_v6_wins() {
        let race = ConnectRace::new(
            ScriptedConnector::default()
                .with("[2001:db8::1]:80", 10, true)
                .with("192.0.2.1:80", 1, true),
        );
        let dest = Destination::new();
        let (tx, rx) = oneshot::channel();

        let handle = race.start(
            &dest,
            &addrs(&["192.0.2.1:80", "[2001:db8::1]:80"]),
            &Handle::current(),
            move |r| {
                let _ = tx.send(r);
            },
        );

        assert_eq!(rx.await.unwrap(), Ok(1));
        // Let the v4 timer fire
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(handle.phases(), vec![AttemptPhase::Skipped, AttemptPhase::Succeeded]);
        assert_eq!(handle.outstanding(), 0);
        // Only the v6 socket was ever created
        assert_eq!(race.connector().created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_mode_tries_in_order() {
        let race = ConnectRace::with_config(
            ScriptedConnector::default()
                .with("192.0.2.1:80", 5, false)
                .with("192.0.2.2:80", 5, true)
                .with("192.0.2.3:80", 1, true),
            RaceConfig::new().happy_eyeballs(false),
        );
        let dest = Destination::new();
        let (tx, rx) = oneshot::channel();

        let handle = race.start(
            &dest,
            &addrs(&["192.0.2.1:80", "192.0.2.2:80", "192.0.2.3:80"]),
            &Handle::current(),
            move |r| {
                let _ = tx.send(r);
            },
        );

        // The third would be faster, but sequential mode never reaches it
        assert_eq!(rx.await.unwrap(), Ok(1));
        tokio::task::yield_now().await;
        assert_eq!(
            handle.phases(),
            vec![AttemptPhase::Failed, AttemptPhase::Succeeded, AttemptPhase::Skipped]
        );
        assert_eq!(race.connector().created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_mode_all_fail() {
        let race = ConnectRace::with_config(
            ScriptedConnector::default()
                .with("192.0.2.1:80", 5, false)
                .with("192.0.2.2:80", 5, false),
            RaceConfig::new().happy_eyeballs(false),
        );
        let dest = Destination::new();

        let err = race
            .connect(&dest, addrs(&["192.0.2.1:80", "192.0.2.2:80"]))
            .await
            .unwrap_err();
        assert_eq!(err, NetError::ConnectionRefused);
        assert!(!dest.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reports_aborted() {
        let race = ConnectRace::new(
            ScriptedConnector::default()
                .with("192.0.2.1:80", 60_000, true)
                .with("192.0.2.2:80", 60_000, true),
        );
        let dest = Destination::new();
        let (tx, rx) = oneshot::channel();

        let handle = race.start(
            &dest,
            &addrs(&["192.0.2.1:80", "192.0.2.2:80"]),
            &Handle::current(),
            move |r| {
                let _ = tx.send(r);
            },
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let err = rx.await.unwrap().unwrap_err();
        assert!(err.is_aborted());
        assert!(!dest.is_connected());
        assert_eq!(
            handle.phases(),
            vec![AttemptPhase::Cancelled, AttemptPhase::Cancelled]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_bias_delay() {
        let race = ConnectRace::new(
            ScriptedConnector::default()
                .with("[2001:db8::1]:80", 60_000, true)
                .with("192.0.2.1:80", 1, true),
        );
        let dest = Destination::new();
        let (tx, rx) = oneshot::channel();

        let handle = race.start(
            &dest,
            &addrs(&["[2001:db8::1]:80", "192.0.2.1:80"]),
            &Handle::current(),
            move |r| {
                let _ = tx.send(r);
            },
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        assert!(rx.await.unwrap().unwrap_err().is_aborted());
        // The held-back v4 attempt never opened a socket
        assert_eq!(race.connector().created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_future_cancels_race() {
        let race = ConnectRace::new(
            ScriptedConnector::default().with("192.0.2.1:80", 60_000, true),
        );
        let dest = Destination::new();

        let result = tokio::time::timeout(
            Duration::from_millis(100),
            race.connect(&dest, addrs(&["192.0.2.1:80"])),
        )
        .await;
        assert!(result.is_err());

        // Give the cancelled attempt a chance to wind down
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!dest.is_connected());
    }
}
