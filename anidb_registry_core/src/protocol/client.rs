//! Typed call surface over one registry session
//!
//! Each call returns a [`TypedResult`]: the record, [`Lookup::NotFound`] when
//! the registry says the entity does not exist, or a [`ProtocolError`]. No call
//! retries on its own; use [`ProtocolError::retry_advice`] to decide.
//!
//! [`Lookup::NotFound`]: crate::protocol::messages::Lookup::NotFound
//! [`ProtocolError`]: crate::protocol::error::ProtocolError
//! [`ProtocolError::retry_advice`]: crate::protocol::error::ProtocolError::retry_advice

use crate::config::RegistryConfig;
use crate::protocol::ban::{BanEvent, BanTracker};
use crate::protocol::connection::ConnectionHandler;
use crate::protocol::error::Result;
use crate::protocol::messages::{
    CalendarCommand, CalendarEntry, Command, CreatorCommand, CreatorRecord, EpisodeCommand,
    EpisodeRecord, FileCommand, FileRecord, GroupCommand, GroupStatusCommand, ReleaseGroupRecord,
    ReleaseGroupStatus, Response, TypedResult, UpdatedAnimeList, UpdatedCommand,
};
use crate::protocol::rate_limit::RateLimiterSnapshot;
use crate::protocol::transport::RegistryChannel;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Registry client bound to one authenticated channel
#[derive(Debug)]
pub struct RegistryClient {
    connection: ConnectionHandler,
}

impl RegistryClient {
    pub fn new(connection: ConnectionHandler) -> Self {
        Self { connection }
    }

    pub fn from_config(channel: Arc<dyn RegistryChannel>, config: &RegistryConfig) -> Self {
        Self::new(ConnectionHandler::from_config(channel, config))
    }

    /// Upcoming anime air dates
    pub async fn get_calendar(&self) -> TypedResult<Vec<CalendarEntry>> {
        self.connection.execute(&CalendarCommand).await
    }

    /// Identify a file by size and ED2K hash
    pub async fn get_file(&self, size: u64, ed2k: &str) -> TypedResult<FileRecord> {
        self.connection.execute(&FileCommand::new(size, ed2k)).await
    }

    pub async fn get_episode(&self, episode_id: u64) -> TypedResult<EpisodeRecord> {
        self.connection.execute(&EpisodeCommand::new(episode_id)).await
    }

    pub async fn get_release_group(&self, group_id: u64) -> TypedResult<ReleaseGroupRecord> {
        self.connection.execute(&GroupCommand::new(group_id)).await
    }

    /// Release groups working on an anime, with their progress
    pub async fn get_release_group_status(
        &self,
        anime_id: u64,
    ) -> TypedResult<Vec<ReleaseGroupStatus>> {
        self.connection
            .execute(&GroupStatusCommand::new(anime_id))
            .await
    }

    pub async fn get_creator(&self, creator_id: u64) -> TypedResult<CreatorRecord> {
        self.connection.execute(&CreatorCommand::new(creator_id)).await
    }

    /// Anime whose records changed since `since`
    pub async fn get_updated_anime(&self, since: DateTime<Utc>) -> TypedResult<UpdatedAnimeList> {
        self.connection.execute(&UpdatedCommand::new(since)).await
    }

    /// Issue a command chosen at runtime
    pub async fn run(&self, command: &Command) -> Result<Response> {
        self.connection.run(command).await
    }

    pub fn bans(&self) -> &Arc<BanTracker> {
        self.connection.bans()
    }

    /// Ban notifications, for status displays
    pub fn subscribe(&self) -> broadcast::Receiver<BanEvent> {
        self.connection.subscribe()
    }

    pub fn rate_limit_status(&self) -> RateLimiterSnapshot {
        self.connection.rate_limit_status()
    }
}
