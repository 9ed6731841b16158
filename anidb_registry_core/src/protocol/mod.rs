//! AniDB registry protocol
//!
//! Layered from the wire up:
//! - `transport`: the channel boundary and its UDP implementation
//! - `messages`: typed commands, reply grammar and per-kind parsers
//! - `rate_limit` and `ban`: the throttling and suspension state every send respects
//! - `connection`: the single serialized send path of a session
//! - `client`: one typed call per command kind

pub mod ban;
pub mod client;
pub mod connection;
pub mod error;
pub mod mask;
pub mod messages;
pub mod rate_limit;
pub mod transport;

// Re-export main types
pub use ban::{BanChannel, BanCooldowns, BanEvent, BanState, BanTracker};
pub use client::RegistryClient;
pub use connection::ConnectionHandler;
pub use error::{ProtocolError, ReplyCode, Result, RetryAdvice};
pub use messages::{Command, CommandKind, Lookup, Reply, Response, ResponseParser, TypedResult};
pub use rate_limit::{RateLimitConfig, RateLimiter, RateLimiterSnapshot};
pub use transport::{RegistryChannel, TransportError, UdpChannel};

/// Largest datagram the registry sends or accepts (fits PPPoE links)
pub const MAX_PACKET_SIZE: usize = 1400;

pub const DEFAULT_SERVER: &str = "api.anidb.net";

pub const DEFAULT_PORT: u16 = 9000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_constants() {
        assert_eq!(MAX_PACKET_SIZE, 1400);
        assert_eq!(DEFAULT_SERVER, "api.anidb.net");
        assert_eq!(DEFAULT_PORT, 9000);
    }
}
