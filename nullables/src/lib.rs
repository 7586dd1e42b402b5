//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the client (platform authenticator,
//! identity service, poll service, push stream) sits behind a trait. This
//! crate provides test-friendly implementations that:
//! - Return scripted results
//! - Record every call for later assertions
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod authenticator;
pub mod identity;
pub mod polls;
pub mod stream;

pub use authenticator::NullAuthenticator;
pub use identity::{IdentityCall, NullIdentityService};
pub use polls::NullPollService;
pub use stream::NullStreamSource;
