//! Poll service access and the per-poll view.
//!
//! [`HttpPollClient`] speaks the poll service's REST endpoints.
//! [`PollView`] combines it with a [`VoteEngine`](passvote_reconcile::VoteEngine)
//! and a [`LiveStreamClient`](passvote_live::LiveStreamClient) to give one
//! consistent picture of a poll while the user votes and watches live.

pub mod client;
pub mod view;

pub use client::{CreatePollResponse, CreatedPoll, HttpPollClient, PollService};
pub use view::{PollView, ViewConfig, ViewUpdate, DEFAULT_VOTE_TIMEOUT};
