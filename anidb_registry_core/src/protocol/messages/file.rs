//! FILE command: resolve a file by size and ED2K hash
//!
//! The request always carries the same masks, so the reply grammar is fixed:
//!
//! ```text
//! fid|aid|eid|gid|mylistId|otherEps|deprecated|state|quality|source|
//! audioLangs|subLangs|description|filename|mylistState|mylistFileState|
//! viewCount|viewDate
//! ```

use crate::protocol::error::{ProtocolError, ReplyCode, Result};
use crate::protocol::mask::{amask, fmask};
use crate::protocol::messages::{
    CommandKind, ITEM_SEPARATOR, LIST_SEPARATOR, Lookup, Record, RegistryCommand, Reply,
    ReplyContext, TypedResult,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of fields selected by the FILE masks, `fid` included
pub const FILE_FIELD_COUNT: usize = 18;

/// Length of an ED2K hash in hex digits
const ED2K_HEX_LEN: usize = 32;

/// FILE command by size and ED2K hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommand {
    pub size: u64,
    pub ed2k: String,
}

impl FileCommand {
    pub fn new(size: u64, ed2k: impl Into<String>) -> Self {
        Self {
            size,
            ed2k: ed2k.into(),
        }
    }
}

impl RegistryCommand for FileCommand {
    const KIND: CommandKind = CommandKind::File;
    type Output = FileRecord;

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("size", self.size.to_string()),
            ("ed2k", self.ed2k.to_ascii_lowercase()),
            ("fmask", fmask::CROSS_REFERENCE.render()),
            ("amask", amask::NONE.render()),
        ]
    }

    fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(ProtocolError::invalid_command(
                "file size must be a positive integer",
            ));
        }
        if self.ed2k.len() != ED2K_HEX_LEN || !self.ed2k.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ProtocolError::invalid_command(format!(
                "ed2k hash must be {ED2K_HEX_LEN} hex digits, got `{}`",
                self.ed2k
            )));
        }
        Ok(())
    }

    fn parse_reply(&self, reply: &Reply) -> TypedResult<Self::Output> {
        parse_reply(&self.wire(), reply)
    }
}

/// Link between a file and an episode it contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpisodeCrossRef {
    pub episode_id: u64,
    /// Share of the episode covered by the file
    pub percentage: u8,
}

/// Bit set describing the file's CRC, version and censorship
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FileState(u16);

impl FileState {
    pub const CRC_OK: u16 = 1;
    pub const CRC_ERR: u16 = 2;
    pub const IS_V2: u16 = 4;
    pub const IS_V3: u16 = 8;
    pub const IS_V4: u16 = 16;
    pub const IS_V5: u16 = 32;
    pub const UNCENSORED: u16 = 64;
    pub const CENSORED: u16 = 128;
    pub const CHAPTERED: u16 = 4096;

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    fn has(&self, flag: u16) -> bool {
        self.0 & flag != 0
    }

    /// Release version; 1 unless a version bit is set
    pub fn version(&self) -> u8 {
        if self.has(Self::IS_V5) {
            5
        } else if self.has(Self::IS_V4) {
            4
        } else if self.has(Self::IS_V3) {
            3
        } else if self.has(Self::IS_V2) {
            2
        } else {
            1
        }
    }

    /// `None` when the registry does not know
    pub fn censored(&self) -> Option<bool> {
        if self.has(Self::CENSORED) {
            Some(true)
        } else if self.has(Self::UNCENSORED) {
            Some(false)
        } else {
            None
        }
    }

    /// `None` when the CRC was never checked
    pub fn crc_matches(&self) -> Option<bool> {
        if self.has(Self::CRC_OK) {
            Some(true)
        } else if self.has(Self::CRC_ERR) {
            Some(false)
        } else {
            None
        }
    }

    pub fn chaptered(&self) -> bool {
        self.has(Self::CHAPTERED)
    }
}

/// Release quality as rated by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
    Corrupted,
    EyeCancer,
    Unknown,
}

impl Quality {
    pub fn from_registry(text: &str) -> Self {
        match normalize_label(text).as_str() {
            "veryhigh" => Self::VeryHigh,
            "high" => Self::High,
            "med" | "medium" => Self::Medium,
            "low" => Self::Low,
            "verylow" => Self::VeryLow,
            "corrupted" => Self::Corrupted,
            "eyecancer" => Self::EyeCancer,
            _ => Self::Unknown,
        }
    }
}

/// Source media the release was made from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Tv,
    Dtv,
    HdTv,
    Dvd,
    HkDvd,
    HdDvd,
    BluRay,
    Vhs,
    Vcd,
    Svcd,
    LaserDisc,
    Camcorder,
    Web,
    Unknown,
}

impl Source {
    pub fn from_registry(text: &str) -> Self {
        match normalize_label(text).as_str() {
            "tv" => Self::Tv,
            "dtv" => Self::Dtv,
            "hdtv" => Self::HdTv,
            "dvd" => Self::Dvd,
            "hkdvd" => Self::HkDvd,
            "hddvd" => Self::HdDvd,
            "bluray" => Self::BluRay,
            "vhs" => Self::Vhs,
            "vcd" => Self::Vcd,
            "svcd" => Self::Svcd,
            "ld" => Self::LaserDisc,
            "camcorder" => Self::Camcorder,
            "www" => Self::Web,
            _ => Self::Unknown,
        }
    }
}

/// Lowercase with spaces and dashes removed, so `Blu-ray` and `bluray` agree
fn normalize_label(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The user's own list entry for this file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MyListEntry {
    pub mylist_id: u64,
    pub state: u8,
    pub file_state: u8,
    pub view_count: u32,
    pub viewed_at: Option<DateTime<Utc>>,
}

/// A fully parsed FILE reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub file_id: u64,
    pub anime_id: u64,
    pub group_id: Option<u64>,
    pub episodes: Vec<EpisodeCrossRef>,
    pub other_episodes: Vec<EpisodeCrossRef>,
    pub deprecated: bool,
    pub state: FileState,
    pub quality: Quality,
    pub source: Source,
    pub audio_languages: Vec<String>,
    pub subtitle_languages: Vec<String>,
    pub description: Option<String>,
    pub filename: String,
    pub mylist: Option<MyListEntry>,
}

impl FileRecord {
    pub fn version(&self) -> u8 {
        self.state.version()
    }

    pub fn censored(&self) -> Option<bool> {
        self.state.censored()
    }

    /// Every episode the file covers, primary links first
    pub fn all_episodes(&self) -> impl Iterator<Item = &EpisodeCrossRef> {
        self.episodes.iter().chain(self.other_episodes.iter())
    }
}

pub(crate) fn parse_reply(command: &str, reply: &Reply) -> TypedResult<FileRecord> {
    let ctx = ReplyContext::new(CommandKind::File, command, reply);
    match reply.code {
        ReplyCode::FILE => {
            let record = ctx.single_record()?;
            record.expect_fields(FILE_FIELD_COUNT, FILE_FIELD_COUNT)?;
            parse_record(&record).map(Lookup::Found)
        }
        ReplyCode::NO_SUCH_FILE => ctx.not_found(),
        _ => ctx.unhandled(),
    }
}

fn parse_record(record: &Record<'_>) -> Result<FileRecord> {
    let mylist_id: u64 = record.optional_number(4, "mylist id")?.unwrap_or(0);
    let mylist = if mylist_id > 0 {
        Some(MyListEntry {
            mylist_id,
            state: record.number(14, "mylist state")?,
            file_state: record.number(15, "mylist file state")?,
            view_count: record.number(16, "view count")?,
            viewed_at: record.optional_timestamp(17, "view date")?,
        })
    } else {
        None
    };

    Ok(FileRecord {
        file_id: record.number(0, "file id")?,
        anime_id: record.number(1, "anime id")?,
        episodes: parse_episode_refs(record, 2)?,
        group_id: record.optional_number(3, "group id")?.filter(|gid| *gid > 0),
        other_episodes: parse_other_episode_refs(record, 5)?,
        deprecated: record.flag(6, "deprecated")?,
        state: FileState::from_bits(record.number(7, "state")?),
        quality: Quality::from_registry(&record.text(8)?),
        source: Source::from_registry(&record.text(9)?),
        audio_languages: record.list(10)?,
        subtitle_languages: record.list(11)?,
        description: record.optional_text(12),
        filename: record.text(13)?,
        mylist,
    })
}

/// Primary episodes: one id, or a `'` list of `id` / `id,percent` items
///
/// Bare ids in a list share the file evenly.
fn parse_episode_refs(record: &Record<'_>, index: usize) -> Result<Vec<EpisodeCrossRef>> {
    let raw = record.raw(index)?;
    let items: Vec<&str> = raw
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        return Err(record
            .context()
            .error(format!("field {index} (episode id) is empty")));
    }

    let even_share = (100.0 / items.len() as f64).round() as u8;
    items
        .iter()
        .map(|item| parse_cross_ref(record, index, item, Some(even_share)))
        .collect()
}

/// Other episodes: a `'` list of `id,percent` pairs
fn parse_other_episode_refs(record: &Record<'_>, index: usize) -> Result<Vec<EpisodeCrossRef>> {
    record
        .raw(index)?
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_cross_ref(record, index, item, None))
        .collect()
}

fn parse_cross_ref(
    record: &Record<'_>,
    index: usize,
    item: &str,
    default_share: Option<u8>,
) -> Result<EpisodeCrossRef> {
    let malformed = || {
        record
            .context()
            .error(format!("field {index} has a malformed episode reference `{item}`"))
    };

    let (id, percentage) = match item.split_once(ITEM_SEPARATOR) {
        Some((id, percent)) => (id, percent.trim().parse::<u8>().map_err(|_| malformed())?),
        None => (item, default_share.ok_or_else(malformed)?),
    };
    let episode_id = id.trim().parse::<u64>().map_err(|_| malformed())?;
    if percentage > 100 {
        return Err(malformed());
    }

    Ok(EpisodeCrossRef {
        episode_id,
        percentage,
    })
}
