//! Vote reconciliation for one poll.
//!
//! Three sources update a poll's tallies: the full snapshot from the poll
//! service, the user's own optimistic vote, and the push stream. The
//! [`VoteEngine`] folds them together under fixed precedence rules and tags
//! the result with a [`ReconciliationState`]. The rules themselves live as
//! pure functions in [`merge`].

pub mod engine;
pub mod error;
pub mod merge;

pub use engine::{ReconciliationState, VoteEngine};
pub use error::VoteRejected;
pub use merge::{apply_vote, merge_live, MergeOutcome};
