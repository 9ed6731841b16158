//! GROUP command: release group details

use crate::protocol::error::{ReplyCode, Result};
use crate::protocol::messages::{
    CommandKind, ITEM_SEPARATOR, LIST_SEPARATOR, Lookup, Record, RegistryCommand, Reply,
    ReplyContext, TypedResult, require_positive,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// GROUP command by group id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupCommand {
    pub group_id: u64,
}

impl GroupCommand {
    pub fn new(group_id: u64) -> Self {
        Self { group_id }
    }
}

impl RegistryCommand for GroupCommand {
    const KIND: CommandKind = CommandKind::Group;
    type Output = ReleaseGroupRecord;

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![("gid", self.group_id.to_string())]
    }

    fn validate(&self) -> Result<()> {
        require_positive(self.group_id, "group id")
    }

    fn parse_reply(&self, reply: &Reply) -> TypedResult<Self::Output> {
        parse_reply(&self.wire(), reply)
    }
}

/// Relation to another release group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupRelation {
    pub group_id: u64,
    pub relation_type: u8,
}

/// A parsed GROUP reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseGroupRecord {
    pub group_id: u64,
    pub rating: f32,
    pub votes: u32,
    pub anime_count: u32,
    pub file_count: u32,
    pub name: String,
    pub short_name: String,
    pub irc_channel: Option<String>,
    pub irc_server: Option<String>,
    pub url: Option<String>,
    pub picture: Option<String>,
    pub founded_at: Option<DateTime<Utc>>,
    pub disbanded_at: Option<DateTime<Utc>>,
    pub date_flags: Option<u32>,
    pub last_release_at: Option<DateTime<Utc>>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub relations: Vec<GroupRelation>,
}

pub(crate) fn parse_reply(command: &str, reply: &Reply) -> TypedResult<ReleaseGroupRecord> {
    let ctx = ReplyContext::new(CommandKind::Group, command, reply);
    match reply.code {
        ReplyCode::GROUP => {
            let record = ctx.single_record()?;
            record.expect_fields(11, 17)?;
            Ok(Lookup::Found(ReleaseGroupRecord {
                group_id: record.number(0, "group id")?,
                rating: record.rating(1, "rating")?,
                votes: record.number(2, "votes")?,
                anime_count: record.number(3, "anime count")?,
                file_count: record.number(4, "file count")?,
                name: record.text(5)?,
                short_name: record.text(6)?,
                irc_channel: record.optional_text(7),
                irc_server: record.optional_text(8),
                url: record.optional_text(9),
                picture: record.optional_text(10),
                founded_at: record.optional_timestamp(11, "founded")?,
                disbanded_at: record.optional_timestamp(12, "disbanded")?,
                date_flags: record.optional_number(13, "date flags")?,
                last_release_at: record.optional_timestamp(14, "last release")?,
                last_activity_at: record.optional_timestamp(15, "last activity")?,
                relations: parse_relations(&record, 16)?,
            }))
        }
        ReplyCode::NO_SUCH_GROUP => ctx.not_found(),
        _ => ctx.unhandled(),
    }
}

/// `'`-separated `gid,type` pairs; absent on older replies
fn parse_relations(record: &Record<'_>, index: usize) -> Result<Vec<GroupRelation>> {
    if index >= record.len() {
        return Ok(Vec::new());
    }

    record
        .raw(index)?
        .split(LIST_SEPARATOR)
        .filter(|item| !item.trim().is_empty())
        .map(|item| -> Result<GroupRelation> {
            let malformed = || {
                record
                    .context()
                    .error(format!("malformed group relation `{item}`"))
            };
            let (gid, kind) = item.split_once(ITEM_SEPARATOR).ok_or_else(malformed)?;
            Ok(GroupRelation {
                group_id: gid.trim().parse().map_err(|_| malformed())?,
                relation_type: kind.trim().parse().map_err(|_| malformed())?,
            })
        })
        .collect()
}
