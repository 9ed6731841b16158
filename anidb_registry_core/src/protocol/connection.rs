//! Serialized access to one authenticated registry session
//!
//! The registry allows one command in flight per session. Every physical send
//! goes through [`ConnectionHandler`], which is the only caller of the rate
//! limiter and the only writer of command-channel bans.

use crate::config::RegistryConfig;
use crate::protocol::ban::{BanChannel, BanEvent, BanTracker};
use crate::protocol::error::{ProtocolError, ReplyCode, Result};
use crate::protocol::messages::{
    Command, RegistryCommand, Reply, Response, ResponseParser, TypedResult, log_outcome,
};
use crate::protocol::rate_limit::{RateLimitConfig, RateLimiter, RateLimiterSnapshot};
use crate::protocol::transport::{RegistryChannel, TransportError};
use chrono::Utc;
use log::{debug, trace};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

/// Owner of the send path for one session
pub struct ConnectionHandler {
    channel: Arc<dyn RegistryChannel>,
    limiter: RateLimiter,
    bans: Arc<BanTracker>,
    exchange: Arc<Mutex<()>>,
}

impl std::fmt::Debug for ConnectionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("limiter", &self.limiter)
            .field("bans", &self.bans)
            .finish_non_exhaustive()
    }
}

impl ConnectionHandler {
    pub fn new(
        channel: Arc<dyn RegistryChannel>,
        rate_limit: RateLimitConfig,
        bans: Arc<BanTracker>,
    ) -> Self {
        Self {
            channel,
            limiter: RateLimiter::new(rate_limit),
            bans,
            exchange: Arc::new(Mutex::new(())),
        }
    }

    /// Build a handler with a fresh ban tracker from configuration
    pub fn from_config(channel: Arc<dyn RegistryChannel>, config: &RegistryConfig) -> Self {
        Self::new(
            channel,
            config.rate_limit.clone(),
            Arc::new(BanTracker::new(config.bans.clone())),
        )
    }

    /// Issue one typed command and parse its reply
    pub async fn execute<C: RegistryCommand>(&self, command: &C) -> TypedResult<C::Output> {
        let wire = command.encode()?;
        let reply = self.round_trip(wire).await?;

        let result = command.parse_reply(&reply);
        log_outcome(C::KIND, &result);
        result
    }

    /// Issue a command chosen at runtime
    pub async fn run(&self, command: &Command) -> Result<Response> {
        let wire = command.encode()?;
        let reply = self.round_trip(wire).await?;
        ResponseParser::parse(command, &reply)
    }

    /// Shared ban state, for cheap pre-checks by job producers
    pub fn bans(&self) -> &Arc<BanTracker> {
        &self.bans
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BanEvent> {
        self.bans.subscribe()
    }

    pub fn rate_limit_status(&self) -> RateLimiterSnapshot {
        self.limiter.snapshot()
    }

    async fn round_trip(&self, wire: String) -> Result<Reply> {
        self.ensure_not_banned()?;

        let guard = Arc::clone(&self.exchange).lock_owned().await;
        // A ban may have landed while we queued
        self.ensure_not_banned()?;

        self.limiter.ensure().await;
        // or while we waited for our slot
        self.ensure_not_banned()?;

        // Once sent, the exchange finishes even if the caller goes away, so a
        // late reply can never be read as the answer to the next command. The
        // ban verdict is recorded before the lock is released.
        let channel = Arc::clone(&self.channel);
        let bans = Arc::clone(&self.bans);
        let exchange = tokio::spawn(async move {
            let outcome = settle(&bans, channel.send(&wire).await);
            drop(guard);
            outcome
        });

        match exchange.await {
            Ok(outcome) => outcome,
            Err(join_err) => Err(ProtocolError::Network(std::io::Error::other(join_err))),
        }
    }

    fn ensure_not_banned(&self) -> Result<()> {
        let state = self.bans.state(BanChannel::Command);
        if state.is_banned_at(Utc::now()) {
            debug!("Skipping send, command channel banned until {}", state.expires_at);
            return Err(ProtocolError::banned(BanChannel::Command, state.expires_at));
        }
        Ok(())
    }
}

/// Turn a raw exchange into a reply, recording a command ban when the
/// registry signals one
fn settle(bans: &BanTracker, reply: std::result::Result<Reply, TransportError>) -> Result<Reply> {
    match reply {
        Ok(reply) if reply.code == ReplyCode::BANNED => {
            debug!("Registry replied {}: {}", reply.code, reply.message);
            Err(ban_now(bans))
        }
        Ok(reply) => {
            trace!("Reply {} received", reply.code);
            Ok(reply)
        }
        Err(TransportError::SilentDrop) => Err(ban_now(bans)),
        Err(err) => Err(err.into()),
    }
}

fn ban_now(bans: &BanTracker) -> ProtocolError {
    let state = bans.record_ban(BanChannel::Command, Utc::now());
    ProtocolError::banned(BanChannel::Command, state.expires_at)
}
