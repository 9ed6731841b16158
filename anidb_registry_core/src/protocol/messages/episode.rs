//! EPISODE command: a single episode by id

use crate::protocol::error::{ReplyCode, Result};
use crate::protocol::messages::{
    CommandKind, Lookup, RegistryCommand, Reply, ReplyContext, TypedResult, require_positive,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// EPISODE command by episode id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeCommand {
    pub episode_id: u64,
}

impl EpisodeCommand {
    pub fn new(episode_id: u64) -> Self {
        Self { episode_id }
    }
}

impl RegistryCommand for EpisodeCommand {
    const KIND: CommandKind = CommandKind::Episode;
    type Output = EpisodeRecord;

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![("eid", self.episode_id.to_string())]
    }

    fn validate(&self) -> Result<()> {
        require_positive(self.episode_id, "episode id")
    }

    fn parse_reply(&self, reply: &Reply) -> TypedResult<Self::Output> {
        parse_reply(&self.wire(), reply)
    }
}

/// A parsed EPISODE reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeRecord {
    pub episode_id: u64,
    pub anime_id: u64,
    /// Length in minutes
    pub length: u32,
    pub rating: f32,
    pub votes: u32,
    /// Episode number as shown by the registry, e.g. `12` or `S2`
    pub number: String,
    pub english_title: String,
    pub romaji_title: Option<String>,
    pub kanji_title: Option<String>,
    pub aired_at: Option<DateTime<Utc>>,
    pub episode_type: Option<u8>,
}

pub(crate) fn parse_reply(command: &str, reply: &Reply) -> TypedResult<EpisodeRecord> {
    let ctx = ReplyContext::new(CommandKind::Episode, command, reply);
    match reply.code {
        ReplyCode::EPISODE => {
            let record = ctx.single_record()?;
            record.expect_fields(10, 11)?;
            Ok(Lookup::Found(EpisodeRecord {
                episode_id: record.number(0, "episode id")?,
                anime_id: record.number(1, "anime id")?,
                length: record.number(2, "length")?,
                rating: record.rating(3, "rating")?,
                votes: record.number(4, "votes")?,
                number: record.text(5)?,
                english_title: record.text(6)?,
                romaji_title: record.optional_text(7),
                kanji_title: record.optional_text(8),
                aired_at: record.optional_timestamp(9, "air date")?,
                episode_type: record.optional_number(10, "episode type")?,
            }))
        }
        ReplyCode::NO_SUCH_EPISODE => ctx.not_found(),
        _ => ctx.unhandled(),
    }
}
