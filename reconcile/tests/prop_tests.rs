//! Property-based tests for the reconciliation rules.

use passvote_reconcile::{ReconciliationState, VoteEngine};
use passvote_types::{LiveOption, LiveSnapshot, OptionId, PollOption, PollSnapshot};
use proptest::prelude::*;

fn arb_poll() -> impl Strategy<Value = PollSnapshot> {
    prop::collection::vec(0u64..1_000, 2..8).prop_map(|counts| {
        let options = counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                PollOption::new(format!("opt-{i}"), format!("Option {i}"), *count)
                    .with_display_order(i as u32)
            })
            .collect();
        PollSnapshot::new("poll", "A poll", options)
    })
}

fn live_from(counts: &[u64]) -> LiveSnapshot {
    LiveSnapshot::new(
        counts.iter().sum(),
        counts
            .iter()
            .enumerate()
            .map(|(i, count)| LiveOption::new(format!("opt-{i}"), *count))
            .collect(),
    )
}

proptest! {
    #[test]
    fn optimistic_vote_increments_exactly_one(poll in arb_poll(), pick in any::<prop::sample::Index>()) {
        let chosen = pick.get(&poll.options).option_id.clone();
        let mut engine = VoteEngine::new(poll.clone());
        engine.apply_optimistic_vote(&chosen).unwrap();

        let after = engine.snapshot();
        prop_assert_eq!(after.total_votes, poll.total_votes + 1);
        for (before, now) in poll.options.iter().zip(&after.options) {
            let expected = if before.option_id == chosen { before.vote_count + 1 } else { before.vote_count };
            prop_assert_eq!(now.vote_count, expected);
        }
        prop_assert_eq!(after.user_voted_option_id.as_ref(), Some(&chosen));
        prop_assert_eq!(engine.state(), ReconciliationState::OptimisticPending);
        prop_assert!(after.check_invariants().is_ok());
    }

    #[test]
    fn reset_always_clears_vote(poll in arb_poll(), pick in any::<prop::sample::Index>(), pending in any::<bool>()) {
        let chosen = pick.get(&poll.options).option_id.clone();
        let mut engine = VoteEngine::new(poll.clone());
        engine.apply_optimistic_vote(&chosen).unwrap();
        if !pending {
            engine.confirm_vote().unwrap();
        }

        let zeros = vec![0; poll.options.len()];
        let outcome = engine.merge_live_snapshot(&live_from(&zeros));
        prop_assert!(outcome.reset);
        prop_assert!(engine.snapshot().user_voted_option_id.is_none());
    }

    #[test]
    fn nonzero_message_preserves_vote(
        poll in arb_poll(),
        pick in any::<prop::sample::Index>(),
        bump in 1u64..50,
    ) {
        let chosen = pick.get(&poll.options).option_id.clone();
        let mut engine = VoteEngine::new(poll.clone());
        engine.apply_optimistic_vote(&chosen).unwrap();

        let mut counts: Vec<u64> = poll.options.iter().map(|o| o.vote_count).collect();
        counts[0] += bump;
        let outcome = engine.merge_live_snapshot(&live_from(&counts));

        prop_assert!(!outcome.reset);
        prop_assert_eq!(engine.snapshot().user_voted_option_id.as_ref(), Some(&chosen));
        prop_assert_eq!(engine.state(), ReconciliationState::OptimisticPending);
    }

    #[test]
    fn merged_snapshots_keep_invariants(
        poll in arb_poll(),
        counts in prop::collection::vec(0u64..1_000, 1..10),
        claimed_total in any::<u64>(),
    ) {
        let mut engine = VoteEngine::new(poll);
        let mut message = live_from(&counts);
        message.total_votes = claimed_total;
        engine.merge_live_snapshot(&message);
        prop_assert!(engine.snapshot().check_invariants().is_ok());
    }

    #[test]
    fn rollback_never_keeps_the_vote(poll in arb_poll(), pick in any::<prop::sample::Index>()) {
        let chosen: OptionId = pick.get(&poll.options).option_id.clone();
        let mut engine = VoteEngine::new(poll.clone());
        engine.apply_optimistic_vote(&chosen).unwrap();
        engine.rollback_vote().unwrap();
        prop_assert_eq!(engine.snapshot(), &poll);
    }
}
