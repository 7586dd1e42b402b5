//! The per-poll reconciliation engine.

use passvote_types::{LiveSnapshot, OptionId, PollOption, PollSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::VoteRejected;
use crate::merge::{self, MergeOutcome};

/// Provenance of the engine's current snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconciliationState {
    /// Straight from a full server load.
    #[default]
    ServerBaseline,
    /// A local vote has been applied and its submission has not settled.
    OptimisticPending,
    /// The service accepted the vote; the projection is trusted.
    OptimisticConfirmed,
    /// The submission failed and the projection was discarded.
    OptimisticFailed,
    /// The latest change came from the push stream.
    LiveMerged,
}

/// Canonical view of one poll's tallies as perceived by this client.
///
/// `current` is what callers display. `baseline` is the last snapshot the
/// server vouched for, without any unconfirmed local vote; live merges are
/// applied to both so a rollback lands on up-to-date counts.
#[derive(Clone, Debug)]
pub struct VoteEngine {
    baseline: PollSnapshot,
    current: PollSnapshot,
    state: ReconciliationState,
    pending: Option<OptionId>,
}

impl VoteEngine {
    pub fn new(snapshot: PollSnapshot) -> Self {
        Self {
            baseline: snapshot.clone(),
            current: snapshot,
            state: ReconciliationState::ServerBaseline,
            pending: None,
        }
    }

    /// Full replace from the poll service (initial load or refresh).
    pub fn replace_baseline(&mut self, snapshot: PollSnapshot) {
        if let Some(option_id) = self.pending.take() {
            debug!(%option_id, "baseline replaced while a vote was pending");
        }
        self.baseline = snapshot.clone();
        self.current = snapshot;
        self.state = ReconciliationState::ServerBaseline;
    }

    /// Apply the user's vote locally ahead of the network call.
    pub fn apply_optimistic_vote(&mut self, option_id: &OptionId) -> Result<(), VoteRejected> {
        self.current = merge::apply_vote(&self.current, option_id)?;
        self.pending = Some(option_id.clone());
        self.state = ReconciliationState::OptimisticPending;
        debug!(poll_id = %self.current.poll_id, %option_id, "optimistic vote applied");
        Ok(())
    }

    /// The service accepted the pending vote. Counts are left as they are.
    pub fn confirm_vote(&mut self) -> Result<(), VoteRejected> {
        let option_id = self.pending.take().ok_or(VoteRejected::NoPendingVote)?;
        self.baseline = self.current.clone();
        self.state = ReconciliationState::OptimisticConfirmed;
        debug!(poll_id = %self.current.poll_id, %option_id, "vote confirmed");
        Ok(())
    }

    /// The submission failed; restore the last server-confirmed snapshot.
    pub fn rollback_vote(&mut self) -> Result<(), VoteRejected> {
        let option_id = self.pending.take().ok_or(VoteRejected::NoPendingVote)?;
        self.current = self.baseline.clone();
        self.state = ReconciliationState::OptimisticFailed;
        debug!(poll_id = %self.current.poll_id, %option_id, "vote rolled back");
        Ok(())
    }

    /// Fold in one push-stream message.
    ///
    /// While a vote is pending the tag stays `OptimisticPending` and the
    /// pending vote survives everything but a reset.
    pub fn merge_live_snapshot(&mut self, live: &LiveSnapshot) -> MergeOutcome {
        let (merged, outcome) = merge::merge_live(&self.current, live);
        self.current = merged;

        if self.pending.is_some() {
            self.baseline = merge::merge_live(&self.baseline, live).0;
        } else {
            self.baseline = self.current.clone();
            self.state = ReconciliationState::LiveMerged;
        }

        if outcome.reset {
            info!(
                poll_id = %self.current.poll_id,
                vote_cleared = outcome.vote_cleared,
                "poll reset by its owner"
            );
        }
        if outcome.closed {
            info!(poll_id = %self.current.poll_id, "poll closed");
        }
        outcome
    }

    pub fn snapshot(&self) -> &PollSnapshot {
        &self.current
    }

    /// The last server-confirmed snapshot.
    pub fn baseline(&self) -> &PollSnapshot {
        &self.baseline
    }

    pub fn state(&self) -> ReconciliationState {
        self.state
    }

    pub fn pending_vote(&self) -> Option<&OptionId> {
        self.pending.as_ref()
    }

    pub fn has_voted(&self) -> bool {
        self.current.user_voted_option_id.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.current.is_closed
    }

    /// Share of the total for `option_id`, rounded to a whole percent.
    pub fn percentage(&self, option_id: &OptionId) -> u32 {
        let total = self.current.total_votes;
        match self.current.option(option_id) {
            Some(option) if total > 0 => {
                ((option.vote_count as f64 / total as f64) * 100.0).round() as u32
            }
            _ => 0,
        }
    }

    /// Options holding the highest non-zero count.
    pub fn leading_options(&self) -> Vec<&PollOption> {
        let max = self
            .current
            .options
            .iter()
            .map(|o| o.vote_count)
            .max()
            .unwrap_or(0);
        if max == 0 {
            return Vec::new();
        }
        self.current
            .options
            .iter()
            .filter(|o| o.vote_count == max)
            .collect()
    }

    pub fn options_by_display_order(&self) -> Vec<&PollOption> {
        let mut options: Vec<&PollOption> = self.current.options.iter().collect();
        options.sort_by_key(|o| o.display_order);
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passvote_types::LiveOption;

    fn engine() -> VoteEngine {
        VoteEngine::new(PollSnapshot::new(
            "p-1",
            "Lunch?",
            vec![
                PollOption::new("a", "Pizza", 6).with_display_order(1),
                PollOption::new("b", "Salad", 4).with_display_order(0),
            ],
        ))
    }

    fn live(a: u64, b: u64) -> LiveSnapshot {
        LiveSnapshot::new(a + b, vec![LiveOption::new("a", a), LiveOption::new("b", b)])
    }

    #[test]
    fn rollback_restores_baseline() {
        let mut engine = engine();
        engine.apply_optimistic_vote(&"a".into()).unwrap();
        engine.rollback_vote().unwrap();
        assert_eq!(engine.state(), ReconciliationState::OptimisticFailed);
        assert_eq!(engine.snapshot().total_votes, 10);
        assert!(!engine.has_voted());
    }

    #[test]
    fn confirm_without_pending_vote_is_rejected() {
        let mut engine = engine();
        assert_eq!(engine.confirm_vote(), Err(VoteRejected::NoPendingVote));
        assert_eq!(engine.rollback_vote(), Err(VoteRejected::NoPendingVote));
        assert_eq!(engine.state(), ReconciliationState::ServerBaseline);
    }

    #[test]
    fn live_merge_while_pending_keeps_vote_and_tag() {
        let mut engine = engine();
        engine.apply_optimistic_vote(&"a".into()).unwrap();
        engine.merge_live_snapshot(&live(6, 5));
        assert_eq!(engine.state(), ReconciliationState::OptimisticPending);
        assert_eq!(engine.snapshot().user_voted_option_id, Some("a".into()));
        assert_eq!(engine.pending_vote(), Some(&"a".into()));
    }

    #[test]
    fn rollback_after_live_merge_uses_live_counts() {
        let mut engine = engine();
        engine.apply_optimistic_vote(&"a".into()).unwrap();
        engine.merge_live_snapshot(&live(6, 5));
        engine.rollback_vote().unwrap();
        assert_eq!(engine.snapshot().option(&"b".into()).unwrap().vote_count, 5);
        assert_eq!(engine.snapshot().total_votes, 11);
        assert!(!engine.has_voted());
    }

    #[test]
    fn reset_while_pending_clears_vote_but_keeps_tag() {
        let mut engine = engine();
        engine.apply_optimistic_vote(&"a".into()).unwrap();
        let outcome = engine.merge_live_snapshot(&live(0, 0));
        assert!(outcome.vote_cleared);
        assert!(!engine.has_voted());
        assert_eq!(engine.state(), ReconciliationState::OptimisticPending);
        engine.confirm_vote().unwrap();
        assert_eq!(engine.state(), ReconciliationState::OptimisticConfirmed);
    }

    #[test]
    fn merge_without_pending_vote_is_tagged_live() {
        let mut engine = engine();
        engine.merge_live_snapshot(&live(7, 4));
        assert_eq!(engine.state(), ReconciliationState::LiveMerged);
        assert_eq!(engine.baseline(), engine.snapshot());
    }

    #[test]
    fn replace_baseline_drops_pending_vote() {
        let mut engine = engine();
        engine.apply_optimistic_vote(&"a".into()).unwrap();
        let fresh = self::engine().snapshot().clone();
        engine.replace_baseline(fresh);
        assert_eq!(engine.pending_vote(), None);
        assert_eq!(engine.state(), ReconciliationState::ServerBaseline);
    }

    #[test]
    fn display_helpers() {
        let engine = engine();
        assert_eq!(engine.percentage(&"a".into()), 60);
        assert_eq!(engine.percentage(&"missing".into()), 0);
        let leading: Vec<_> = engine.leading_options().iter().map(|o| o.text.as_str()).collect();
        assert_eq!(leading, vec!["Pizza"]);
        let ordered: Vec<_> = engine
            .options_by_display_order()
            .iter()
            .map(|o| o.text.as_str())
            .collect();
        assert_eq!(ordered, vec!["Salad", "Pizza"]);
    }

    #[test]
    fn empty_poll_has_no_leader() {
        let mut engine = engine();
        engine.merge_live_snapshot(&live(0, 0));
        assert!(engine.leading_options().is_empty());
        assert_eq!(engine.percentage(&"a".into()), 0);
    }
}
