//! Plain-text rendering of polls for the terminal.

use std::fmt::Write;

use passvote_reconcile::VoteEngine;
use passvote_types::{PollSummary, UserPoll};

/// The current view of a poll: header line, then one line per option in
/// display order. The caller's own vote is marked with `*`.
pub fn poll(engine: &VoteEngine) -> String {
    let snapshot = engine.snapshot();
    let status = if snapshot.is_closed { "closed" } else { "open" };
    let mut out = format!(
        "{} [{}] {} votes ({})\n",
        snapshot.title, status, snapshot.total_votes, snapshot.poll_id
    );

    let voted = snapshot.user_voted_option_id.as_ref();
    let width = snapshot.options.iter().map(|o| o.text.len()).max().unwrap_or(0);
    for option in engine.options_by_display_order() {
        let marker = if voted == Some(&option.option_id) { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "  {marker} {:<width$}  {:>4} ({:>3}%)  [{}]",
            option.text,
            option.vote_count,
            engine.percentage(&option.option_id),
            option.option_id,
        );
    }
    out
}

pub fn summaries(polls: &[PollSummary]) -> String {
    if polls.is_empty() {
        return "no polls\n".to_string();
    }
    let mut out = String::new();
    for p in polls {
        let status = if p.is_live { "open" } else { "closed" };
        let _ = writeln!(out, "{}  {:<6}  {:>5} votes  {}", p.id, status, p.total_votes, p.title);
    }
    out
}

pub fn user_polls(polls: &[UserPoll]) -> String {
    if polls.is_empty() {
        return "no polls\n".to_string();
    }
    let mut out = String::new();
    for p in polls {
        let status = if p.is_closed { "closed" } else { "open" };
        let _ = writeln!(out, "{}  {:<6}  {:>5} votes  {}", p.id, status, p.total_votes, p.title);
    }
    out
}
