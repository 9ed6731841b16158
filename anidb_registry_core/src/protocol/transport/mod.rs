//! Channel boundary between the protocol layer and the network
//!
//! The protocol layer only needs one thing from the network: send a command
//! over an authenticated session and get one reply back within a deadline.
//! [`RegistryChannel`] is that contract; [`UdpChannel`] implements it over
//! tokio's UDP socket.

mod socket;

pub use socket::UdpChannel;

use crate::protocol::error::ProtocolError;
use crate::protocol::messages::Reply;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failures below the protocol
#[derive(Error, Debug)]
pub enum TransportError {
    /// No reply within the deadline
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    /// Socket failure
    #[error("Transport I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The reply was empty or all zero bytes
    ///
    /// The registry answers this way to a banned client, and it cannot be told
    /// apart from a dead connection.
    #[error("Registry silently dropped the reply")]
    SilentDrop,
}

impl From<TransportError> for ProtocolError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(elapsed) => ProtocolError::Timeout(elapsed),
            TransportError::Io(io) => ProtocolError::Network(io),
            TransportError::SilentDrop => ProtocolError::Network(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "registry silently dropped the reply",
            )),
        }
    }
}

/// A connected, authenticated channel to the registry
///
/// Implementations attach the session, enforce the reply deadline, and parse
/// the reply header. They never retry.
#[async_trait]
pub trait RegistryChannel: Send + Sync {
    async fn send(&self, wire: &str) -> Result<Reply, TransportError>;
}

#[async_trait]
impl<T: RegistryChannel + ?Sized> RegistryChannel for Arc<T> {
    async fn send(&self, wire: &str) -> Result<Reply, TransportError> {
        (**self).send(wire).await
    }
}

/// Mask credentials in wire text before it reaches a log
pub fn mask_secrets(wire: &str) -> String {
    const SECRET_KEYS: [&str; 2] = ["s=", "pass="];

    let mut masked = String::with_capacity(wire.len());
    let mut rest = wire;
    while let Some(pos) = rest.find([' ', '&']) {
        masked.push_str(&mask_segment(&rest[..pos], &SECRET_KEYS));
        masked.push_str(&rest[pos..=pos]);
        rest = &rest[pos + 1..];
    }
    masked.push_str(&mask_segment(rest, &SECRET_KEYS));
    masked
}

fn mask_segment(segment: &str, keys: &[&str]) -> String {
    match keys.iter().find(|key| segment.starts_with(**key)) {
        Some(key) => format!("{key}****"),
        None => segment.to_string(),
    }
}
