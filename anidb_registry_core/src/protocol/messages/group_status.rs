//! GROUPSTATUS command: which release groups work on an anime, and how far
//! each has got

use crate::protocol::error::{ReplyCode, Result};
use crate::protocol::messages::{
    CommandKind, EpisodeRange, Lookup, Record, RegistryCommand, Reply, ReplyContext, TypedResult,
    has_release_gaps, require_positive,
};
use serde::Serialize;

/// GROUPSTATUS command by anime id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStatusCommand {
    pub anime_id: u64,
}

impl GroupStatusCommand {
    pub fn new(anime_id: u64) -> Self {
        Self { anime_id }
    }
}

impl RegistryCommand for GroupStatusCommand {
    const KIND: CommandKind = CommandKind::GroupStatus;
    type Output = Vec<ReleaseGroupStatus>;

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![("aid", self.anime_id.to_string())]
    }

    fn validate(&self) -> Result<()> {
        require_positive(self.anime_id, "anime id")
    }

    fn parse_reply(&self, reply: &Reply) -> TypedResult<Self::Output> {
        parse_reply(&self.wire(), self.anime_id, reply)
    }
}

/// How far a group has got with an anime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    Ongoing,
    Stalled,
    Complete,
    Dropped,
    Finished,
    SpecialsOnly,
    Other(u8),
}

impl CompletionState {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Ongoing,
            2 => Self::Stalled,
            3 => Self::Complete,
            4 => Self::Dropped,
            5 => Self::Finished,
            6 => Self::SpecialsOnly,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Ongoing => 1,
            Self::Stalled => 2,
            Self::Complete => 3,
            Self::Dropped => 4,
            Self::Finished => 5,
            Self::SpecialsOnly => 6,
            Self::Other(code) => *code,
        }
    }
}

/// One group's progress on an anime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseGroupStatus {
    pub anime_id: u64,
    pub group_id: u64,
    pub group_name: String,
    pub completion_state: CompletionState,
    pub last_episode_number: u32,
    pub rating: f32,
    pub votes: u32,
    pub released_episodes: Vec<String>,
    #[serde(skip)]
    released: EpisodeRange,
}

impl ReleaseGroupStatus {
    /// Whether the released episodes skip a number
    pub fn has_release_gaps(&self) -> bool {
        has_release_gaps(&self.released_episodes)
    }

    /// Whether the group has released the given episode label
    pub fn has_released(&self, episode: &str) -> bool {
        self.released.contains(episode)
    }

    pub fn released_range(&self) -> &EpisodeRange {
        &self.released
    }
}

pub(crate) fn parse_reply(
    command: &str,
    anime_id: u64,
    reply: &Reply,
) -> TypedResult<Vec<ReleaseGroupStatus>> {
    let ctx = ReplyContext::new(CommandKind::GroupStatus, command, reply);
    match reply.code {
        ReplyCode::GROUP_STATUS => ctx
            .records()
            .map(|record| parse_record(&record, anime_id))
            .collect::<Result<Vec<_>>>()
            .map(Lookup::Found),
        ReplyCode::NO_GROUPS_FOUND | ReplyCode::NO_SUCH_ANIME => ctx.not_found(),
        _ => ctx.unhandled(),
    }
}

fn parse_record(record: &Record<'_>, anime_id: u64) -> Result<ReleaseGroupStatus> {
    record.expect_fields(7, 7)?;

    let range_text = record.raw(6)?;
    let released = EpisodeRange::parse(range_text).map_err(|err| {
        record
            .context()
            .error(format!("field 6 (episode range): {err}"))
    })?;

    Ok(ReleaseGroupStatus {
        anime_id,
        group_id: record.number(0, "group id")?,
        group_name: record.text(1)?,
        completion_state: CompletionState::from_code(record.number(2, "completion state")?),
        last_episode_number: record.number(3, "last episode")?,
        rating: record.rating(4, "rating")?,
        votes: record.number(5, "votes")?,
        released_episodes: released.expand(),
        released,
    })
}
