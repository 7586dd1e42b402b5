//! Live poll tallies over server-sent events.
//!
//! [`LiveStreamClient`] keeps at most one connection open to
//! `GET /polls/:id/results`, parses each message into a
//! [`LiveSnapshot`](passvote_types::LiveSnapshot) and hands it to a
//! [`LiveObserver`]. Reconnection is the [`StreamSource`]'s job.

pub mod client;
pub mod error;
pub mod message;
pub mod source;
pub mod sse;

pub use client::{LiveEvent, LiveObserver, LiveStreamClient};
pub use error::LiveError;
pub use message::parse_live_message;
pub use source::{HttpEventSource, ReconnectPolicy, StreamEvent, StreamSource};
pub use sse::{SseDecoder, SseEvent};
