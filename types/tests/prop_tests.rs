use proptest::prelude::*;

use passvote_types::{extract_error_message, LiveOption, LiveSnapshot, PollOption, PollSnapshot};

fn options_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..10_000, 0..12)
}

proptest! {
    /// Snapshots built from option counts always satisfy the tally invariant.
    #[test]
    fn new_snapshot_satisfies_invariants(counts in options_strategy()) {
        let options = counts
            .iter()
            .enumerate()
            .map(|(i, c)| PollOption::new(format!("o{i}"), format!("Option {i}"), *c))
            .collect();
        let poll = PollSnapshot::new("p", "title", options);
        prop_assert_eq!(poll.total_votes, counts.iter().sum::<u64>());
        prop_assert!(poll.check_invariants().is_ok());
    }

    /// Reset detection agrees with "total is zero and every count is zero".
    #[test]
    fn reset_detection_matches_definition(total in 0u64..3, counts in prop::collection::vec(0u64..3, 0..6)) {
        let live = LiveSnapshot::new(
            total,
            counts.iter().enumerate().map(|(i, c)| LiveOption::new(format!("o{i}"), *c)).collect(),
        );
        prop_assert_eq!(live.is_reset(), total == 0 && counts.iter().all(|c| *c == 0));
    }

    /// Error extraction never yields an empty message.
    #[test]
    fn extracted_message_is_never_empty(status in 400u16..600, body in ".*", json in any::<bool>()) {
        let content_type = if json { Some("application/json") } else { None };
        let msg = extract_error_message(status, content_type, &body);
        prop_assert!(!msg.is_empty());
    }

    /// Live snapshots survive a JSON round trip unchanged.
    #[test]
    fn live_snapshot_json_roundtrip(counts in prop::collection::vec(0u64..1000, 1..6), closed in any::<bool>()) {
        let total = counts.iter().sum();
        let live = LiveSnapshot::new(
            total,
            counts.iter().enumerate().map(|(i, c)| LiveOption::new(format!("o{i}"), *c)).collect(),
        )
        .closed(closed);
        let json = serde_json::to_string(&live).unwrap();
        let back: LiveSnapshot = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, live);
    }
}
