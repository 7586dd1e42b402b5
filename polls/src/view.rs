//! One poll as a user sees it: tallies, live mode and voting.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use passvote_live::{LiveEvent, LiveStreamClient, StreamSource};
use passvote_reconcile::{ReconciliationState, VoteEngine};
use passvote_session::SessionStore;
use passvote_types::{ClientError, OptionId, PollId, PollSnapshot};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::PollService;

/// Default ceiling on a vote submission before it is rolled back.
pub const DEFAULT_VOTE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewConfig {
    pub vote_timeout: Duration,
    /// Reload the poll from the service once a vote settles.
    pub refresh_after_vote: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            vote_timeout: DEFAULT_VOTE_TIMEOUT,
            refresh_after_vote: true,
        }
    }
}

/// What changed after a live event was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewUpdate {
    Connected,
    Updated,
    /// The owner reset the poll.
    Reset { vote_cleared: bool },
    /// The poll closed; live mode is already off.
    Closed,
    StreamError(String),
}

enum VoteStep {
    Settled(Result<(), ClientError>),
    Live(Option<LiveEvent>),
    TimedOut,
}

/// Drives one poll: owns its reconciliation engine and live connection.
pub struct PollView<P, S> {
    service: Arc<P>,
    live: LiveStreamClient<S>,
    engine: VoteEngine,
    events: Option<mpsc::UnboundedReceiver<LiveEvent>>,
    backlog: VecDeque<ViewUpdate>,
    session: Option<SessionStore>,
    config: ViewConfig,
}

impl<P: PollService, S: StreamSource> PollView<P, S> {
    pub fn new(
        service: Arc<P>,
        live: LiveStreamClient<S>,
        snapshot: PollSnapshot,
        config: ViewConfig,
    ) -> Self {
        Self {
            service,
            live,
            engine: VoteEngine::new(snapshot),
            events: None,
            backlog: VecDeque::new(),
            session: None,
            config,
        }
    }

    /// Fetch `poll_id` and build a view on it.
    pub async fn load(
        service: Arc<P>,
        live: LiveStreamClient<S>,
        poll_id: &PollId,
        config: ViewConfig,
    ) -> Result<Self, ClientError> {
        let snapshot = service.get_poll(poll_id).await?;
        Ok(Self::new(service, live, snapshot, config))
    }

    /// Votes then require a signed-in identity, and a rejected token signs
    /// the session out.
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    pub fn poll_id(&self) -> &PollId {
        &self.engine.snapshot().poll_id
    }

    pub fn snapshot(&self) -> &PollSnapshot {
        self.engine.snapshot()
    }

    pub fn state(&self) -> ReconciliationState {
        self.engine.state()
    }

    pub fn engine(&self) -> &VoteEngine {
        &self.engine
    }

    pub fn is_live(&self) -> bool {
        self.live.is_active()
    }

    /// Turn live mode on. Closed polls have no live mode; returns whether
    /// live mode is on afterwards.
    pub fn enable_live(&mut self) -> bool {
        if self.engine.is_closed() {
            debug!(poll_id = %self.poll_id(), "poll is closed, not enabling live mode");
            return false;
        }
        if self.live.is_active() {
            return true;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let poll_id = self.poll_id().clone();
        self.live.start(&poll_id, tx);
        self.events = Some(rx);
        true
    }

    /// Turn live mode off and close the connection. Idempotent.
    pub fn disable_live(&mut self) {
        self.live.stop();
        self.events = None;
    }

    /// Wait for the next change from the live stream.
    ///
    /// Updates that arrived while a vote was in flight come first. `None`
    /// once live mode is off and nothing is queued.
    pub async fn next_update(&mut self) -> Option<ViewUpdate> {
        if let Some(update) = self.backlog.pop_front() {
            return Some(update);
        }
        let event = self.events.as_mut()?.recv().await;
        match event {
            Some(event) => Some(self.apply_live_event(event)),
            None => {
                debug!(poll_id = %self.poll_id(), "live channel closed");
                self.disable_live();
                None
            }
        }
    }

    /// Reload the poll from the service.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let poll_id = self.poll_id().clone();
        match self.service.get_poll(&poll_id).await {
            Ok(snapshot) => {
                self.engine.replace_baseline(snapshot);
                Ok(())
            }
            Err(e) => {
                self.on_service_error(&e);
                Err(e)
            }
        }
    }

    /// Vote for `option_id`: apply it locally, submit it, then confirm or
    /// roll back. Live events keep being merged while the submission is in
    /// flight.
    pub async fn cast_vote(&mut self, option_id: &OptionId) -> Result<(), ClientError> {
        if let Some(session) = &self.session {
            if session.identity().is_none() {
                return Err(ClientError::Unauthorized);
            }
        }
        self.engine.apply_optimistic_vote(option_id)?;

        let service = Arc::clone(&self.service);
        let poll_id = self.poll_id().clone();
        let mut submission = service.vote(&poll_id, option_id);
        let deadline = tokio::time::sleep(self.config.vote_timeout);
        tokio::pin!(deadline);

        let result = loop {
            let step = tokio::select! {
                result = &mut submission => VoteStep::Settled(result),
                event = next_event(&mut self.events) => VoteStep::Live(event),
                _ = &mut deadline => VoteStep::TimedOut,
            };
            match step {
                VoteStep::Settled(result) => break result,
                VoteStep::Live(Some(event)) => {
                    let update = self.apply_live_event(event);
                    self.backlog.push_back(update);
                }
                VoteStep::Live(None) => self.disable_live(),
                VoteStep::TimedOut => {
                    break Err(ClientError::transport(format!(
                        "vote confirmation timed out after {}s",
                        self.config.vote_timeout.as_secs()
                    )))
                }
            }
        };

        match &result {
            Ok(()) => {
                self.engine.confirm_vote()?;
                info!(%poll_id, %option_id, "vote recorded");
            }
            Err(e) => {
                self.engine.rollback_vote()?;
                warn!(%poll_id, %option_id, "vote failed, rolled back: {e}");
                self.on_service_error(e);
            }
        }

        if self.config.refresh_after_vote && !matches!(result, Err(ClientError::Unauthorized)) {
            if let Err(e) = self.refresh().await {
                warn!(%poll_id, "refresh after vote failed: {e}");
            }
        }
        result
    }

    fn apply_live_event(&mut self, event: LiveEvent) -> ViewUpdate {
        match event {
            LiveEvent::Open => ViewUpdate::Connected,
            LiveEvent::Error(message) => ViewUpdate::StreamError(message),
            LiveEvent::Snapshot(live) => {
                let outcome = self.engine.merge_live_snapshot(&live);
                if outcome.closed {
                    self.disable_live();
                    ViewUpdate::Closed
                } else if outcome.reset {
                    ViewUpdate::Reset {
                        vote_cleared: outcome.vote_cleared,
                    }
                } else {
                    ViewUpdate::Updated
                }
            }
        }
    }

    fn on_service_error(&self, error: &ClientError) {
        if matches!(error, ClientError::Unauthorized) {
            if let Some(session) = &self.session {
                info!("session token rejected, signing out");
                session.clear();
            }
        }
    }
}

async fn next_event(events: &mut Option<mpsc::UnboundedReceiver<LiveEvent>>) -> Option<LiveEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
