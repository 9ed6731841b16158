//! Mock implementations for testing

mod channel;

pub use channel::{MockChannel, ScriptedReply};
