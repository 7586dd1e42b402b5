//! Pure merge functions, one per update source.
//!
//! Each takes the snapshot it applies to by reference and returns a new one;
//! the engine decides which snapshot (current or baseline) they run against.

use passvote_types::{LiveSnapshot, OptionId, PollOption, PollSnapshot};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::VoteRejected;

/// What a live merge changed, for the subscriber to react to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// The message was an all-zero tally.
    pub reset: bool,
    /// The merged snapshot is closed; live mode should stop.
    pub closed: bool,
    /// A vote the user held was discarded by a reset.
    pub vote_cleared: bool,
}

/// Project a vote for `option_id` onto `snapshot`.
///
/// Increments the option and the total by exactly one and records the vote.
pub fn apply_vote(
    snapshot: &PollSnapshot,
    option_id: &OptionId,
) -> Result<PollSnapshot, VoteRejected> {
    if snapshot.is_closed {
        return Err(VoteRejected::PollClosed);
    }
    if let Some(voted) = &snapshot.user_voted_option_id {
        return Err(VoteRejected::AlreadyVoted(voted.clone()));
    }

    let mut next = snapshot.clone();
    let option = next
        .option_mut(option_id)
        .ok_or_else(|| VoteRejected::UnknownOption(option_id.clone()))?;
    option.vote_count += 1;
    next.total_votes += 1;
    next.user_voted_option_id = Some(option_id.clone());
    Ok(next)
}

/// Merge a push-stream message into `current`.
///
/// Counts and closure come from the message. Option text and display order
/// stay as they are; options the message names but `current` lacks are
/// appended. The user's vote is kept unless the message is a reset, which
/// also zeroes options the message leaves out.
pub fn merge_live(current: &PollSnapshot, live: &LiveSnapshot) -> (PollSnapshot, MergeOutcome) {
    let reset = live.is_reset();
    let mut next = current.clone();

    for incoming in &live.options {
        match next.option_mut(&incoming.id) {
            Some(option) => {
                option.vote_count = incoming.vote_count;
                if option.text.is_empty() {
                    if let Some(text) = &incoming.option_text {
                        option.text = text.clone();
                    }
                }
            }
            None => {
                let display_order = incoming.display_order.unwrap_or_else(|| {
                    next.options
                        .iter()
                        .map(|o| o.display_order + 1)
                        .max()
                        .unwrap_or(0)
                });
                next.options.push(
                    PollOption::new(
                        incoming.id.clone(),
                        incoming.option_text.clone().unwrap_or_default(),
                        incoming.vote_count,
                    )
                    .with_display_order(display_order),
                );
            }
        }
    }

    if reset {
        for option in next
            .options
            .iter_mut()
            .filter(|o| !live.options.iter().any(|l| l.id == o.option_id))
        {
            option.vote_count = 0;
        }
    }

    let sum = next.tally_sum();
    if live.total_votes != sum {
        warn!(
            poll_id = %next.poll_id,
            total_votes = live.total_votes,
            sum,
            "live tally total disagrees with option counts, using the sum"
        );
    }
    next.total_votes = sum;

    if let Some(is_closed) = live.is_closed {
        next.is_closed = is_closed;
    }
    if let Some(title) = &live.title {
        next.title = title.clone();
    }

    let vote_cleared = reset && current.user_voted_option_id.is_some();
    next.user_voted_option_id = if reset {
        None
    } else {
        current
            .user_voted_option_id
            .clone()
            .or_else(|| live.user_voted_option_id.clone())
            .filter(|voted| next.option(voted).is_some())
    };

    let outcome = MergeOutcome {
        reset,
        closed: next.is_closed,
        vote_cleared,
    };
    (next, outcome)
}
