//! Poll snapshots as served by the poll service and its push stream.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::ids::{OptionId, PollId, UserId};

/// One option of a poll with its current tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    #[serde(rename = "id")]
    pub option_id: OptionId,
    #[serde(rename = "option_text", default)]
    pub text: String,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub display_order: u32,
}

impl PollOption {
    pub fn new(option_id: impl Into<OptionId>, text: impl Into<String>, vote_count: u64) -> Self {
        Self {
            option_id: option_id.into(),
            text: text.into(),
            vote_count,
            display_order: 0,
        }
    }

    pub fn with_display_order(mut self, display_order: u32) -> Self {
        self.display_order = display_order;
        self
    }
}

/// The full view of one poll as perceived by the current client.
///
/// Returned by `GET /polls/:id`. `user_voted_option_id` is only populated
/// when the request carried a session token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    #[serde(rename = "id")]
    pub poll_id: PollId,
    pub title: String,
    #[serde(default)]
    pub creator_id: Option<UserId>,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub user_voted_option_id: Option<OptionId>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
}

/// A snapshot that breaks one of the tally invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("total_votes is {total} but option counts sum to {sum}")]
    TotalMismatch { total: u64, sum: u64 },

    #[error("voted option {0} is not part of the poll")]
    UnknownVotedOption(OptionId),

    #[error("option {0} appears more than once")]
    DuplicateOption(OptionId),
}

impl PollSnapshot {
    /// Build a snapshot whose total is derived from the option counts.
    pub fn new(poll_id: impl Into<PollId>, title: impl Into<String>, options: Vec<PollOption>) -> Self {
        let total_votes = options.iter().map(|o| o.vote_count).sum();
        Self {
            poll_id: poll_id.into(),
            title: title.into(),
            creator_id: None,
            is_closed: false,
            total_votes,
            options,
            user_voted_option_id: None,
            created_at: None,
            closed_at: None,
        }
    }

    pub fn option(&self, option_id: &OptionId) -> Option<&PollOption> {
        self.options.iter().find(|o| &o.option_id == option_id)
    }

    pub fn option_mut(&mut self, option_id: &OptionId) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|o| &o.option_id == option_id)
    }

    /// Sum of all option counts.
    pub fn tally_sum(&self) -> u64 {
        self.options.iter().map(|o| o.vote_count).sum()
    }

    /// Check `total_votes == Σ vote_count`, option uniqueness and that the
    /// user's vote (if any) names an existing option.
    pub fn check_invariants(&self) -> Result<(), SnapshotError> {
        for (idx, option) in self.options.iter().enumerate() {
            if self.options[..idx]
                .iter()
                .any(|o| o.option_id == option.option_id)
            {
                return Err(SnapshotError::DuplicateOption(option.option_id.clone()));
            }
        }

        let sum = self.tally_sum();
        if sum != self.total_votes {
            return Err(SnapshotError::TotalMismatch {
                total: self.total_votes,
                sum,
            });
        }

        if let Some(voted) = &self.user_voted_option_id {
            if self.option(voted).is_none() {
                return Err(SnapshotError::UnknownVotedOption(voted.clone()));
            }
        }

        Ok(())
    }
}

/// Tally entry of a push-stream message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveOption {
    pub id: OptionId,
    pub vote_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<u32>,
}

/// A partial snapshot delivered by `GET /polls/:id/results`.
///
/// The stream is count-only: it never re-asserts which option the current
/// user voted for, so `user_voted_option_id` is normally absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub total_votes: u64,
    pub options: Vec<LiveOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_closed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_voted_option_id: Option<OptionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl LiveSnapshot {
    pub fn new(total_votes: u64, options: Vec<LiveOption>) -> Self {
        Self {
            total_votes,
            options,
            is_closed: None,
            user_voted_option_id: None,
            title: None,
        }
    }

    pub fn closed(mut self, is_closed: bool) -> Self {
        self.is_closed = Some(is_closed);
        self
    }

    /// An all-zero tally: the poll owner reset the poll.
    pub fn is_reset(&self) -> bool {
        self.total_votes == 0 && self.options.iter().all(|o| o.vote_count == 0)
    }
}

impl LiveOption {
    pub fn new(id: impl Into<OptionId>, vote_count: u64) -> Self {
        Self {
            id: id.into(),
            vote_count,
            option_text: None,
            display_order: None,
        }
    }
}

/// Which polls a listing should return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollFilter {
    All,
    #[default]
    Open,
    Closed,
}

impl PollFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    fn admits(&self, is_open: bool) -> bool {
        match self {
            Self::All => true,
            Self::Open => is_open,
            Self::Closed => !is_open,
        }
    }
}

impl fmt::Display for PollFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown poll filter '{other}' (expected all, open or closed)")),
        }
    }
}

/// Entry of the public poll listing (`GET /polls`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSummary {
    pub id: PollId,
    pub title: String,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
}

impl PollSummary {
    pub fn matches(&self, filter: PollFilter) -> bool {
        filter.admits(self.is_live)
    }
}

/// Entry of a user's own poll listing (`GET /polls/user/:id`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoll {
    pub id: PollId,
    pub title: String,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub total_votes: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
}

impl UserPoll {
    pub fn matches(&self, filter: PollFilter) -> bool {
        filter.admits(!self.is_closed)
    }
}
