//! Reply builders and fixtures

pub mod fixtures;
mod reply;

pub use reply::ReplyBuilder;
