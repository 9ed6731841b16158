//! AniDB Registry Core Library
//!
//! Protocol core for the AniDB metadata registry: adaptive rate limiting, ban
//! tracking, command rendering and typed reply parsing, behind a serialized
//! per-session connection handler.

pub mod config;
pub mod protocol;

// Re-export main types
pub use config::{RegistryConfig, ServerConfig};
pub use protocol::{
    BanChannel, BanEvent, BanTracker, Command, CommandKind, ConnectionHandler, Lookup,
    ProtocolError, RegistryChannel, RegistryClient, Reply, Response, Result, RetryAdvice,
    TypedResult, UdpChannel,
};
