//! Engine precondition failures.

use passvote_types::{ClientError, OptionId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteRejected {
    #[error("You have already voted on this poll")]
    AlreadyVoted(OptionId),

    #[error("This poll is closed")]
    PollClosed,

    #[error("option {0} is not part of this poll")]
    UnknownOption(OptionId),

    #[error("no vote is awaiting confirmation")]
    NoPendingVote,
}

impl From<VoteRejected> for ClientError {
    fn from(e: VoteRejected) -> Self {
        ClientError::Validation(e.to_string())
    }
}
