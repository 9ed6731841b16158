//! UPDATED command: anime whose records changed since a point in time

use crate::protocol::error::{ProtocolError, ReplyCode, Result};
use crate::protocol::messages::{
    CommandKind, ITEM_SEPARATOR, Lookup, RegistryCommand, Reply, ReplyContext, TypedResult,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Entity selector for anime updates; the only one the registry serves
const ANIME_ENTITY: u8 = 1;

/// UPDATED command for anime changed since `since`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatedCommand {
    pub since: DateTime<Utc>,
}

impl UpdatedCommand {
    pub fn new(since: DateTime<Utc>) -> Self {
        Self { since }
    }
}

impl RegistryCommand for UpdatedCommand {
    const KIND: CommandKind = CommandKind::Updated;
    type Output = UpdatedAnimeList;

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("entity", ANIME_ENTITY.to_string()),
            ("time", self.since.timestamp().to_string()),
        ]
    }

    fn validate(&self) -> Result<()> {
        if self.since.timestamp() < 0 {
            return Err(ProtocolError::invalid_command(format!(
                "update time {} is before the unix epoch",
                self.since
            )));
        }
        Ok(())
    }

    fn parse_reply(&self, reply: &Reply) -> TypedResult<Self::Output> {
        parse_reply(&self.wire(), reply)
    }
}

/// A parsed UPDATED reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedAnimeList {
    pub count: u32,
    pub last_updated_at: DateTime<Utc>,
    pub anime_ids: Vec<u64>,
}

pub(crate) fn parse_reply(command: &str, reply: &Reply) -> TypedResult<UpdatedAnimeList> {
    let ctx = ReplyContext::new(CommandKind::Updated, command, reply);
    match reply.code {
        ReplyCode::UPDATED => {
            let record = ctx.single_record()?;
            record.expect_fields(4, 4)?;

            let entity: u8 = record.number(0, "entity")?;
            if entity != ANIME_ENTITY {
                return Err(ctx.error(format!("unsupported entity {entity}")));
            }

            let anime_ids = record
                .raw(3)?
                .split(ITEM_SEPARATOR)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| {
                    id.parse::<u64>()
                        .map_err(|_| ctx.error(format!("field 3 (anime ids) has `{id}`")))
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Lookup::Found(UpdatedAnimeList {
                count: record.number(1, "count")?,
                last_updated_at: record.timestamp(2, "last update")?,
                anime_ids,
            }))
        }
        ReplyCode::NO_UPDATES => ctx.not_found(),
        _ => ctx.unhandled(),
    }
}
