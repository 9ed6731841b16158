//! Test utilities for the AniDB registry client
//!
//! This crate provides a scripted registry channel and canned replies for
//! testing the protocol layer without a network.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{ReplyBuilder, fixtures};
pub use mocks::{MockChannel, ScriptedReply};
