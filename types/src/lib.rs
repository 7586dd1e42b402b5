//! Shared types for passvote.
//!
//! Every other crate in the workspace builds on these: identifiers, the
//! signed-in identity, poll snapshots (full and live-stream partial), the
//! error taxonomy and local input validation.

pub mod error;
pub mod identity;
pub mod ids;
pub mod poll;
pub mod validation;

pub use error::{
    extract_error_message, response_message, ClientError, Severity, UNREACHABLE_MESSAGE,
};
pub use identity::Identity;
pub use ids::{OptionId, PollId, UserId};
pub use poll::{
    LiveOption, LiveSnapshot, PollFilter, PollOption, PollSnapshot, PollSummary, SnapshotError,
    UserPoll,
};
pub use validation::{validate_username, PollDraft};
