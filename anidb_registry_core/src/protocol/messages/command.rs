//! Command kind enumeration and the dynamic command wrapper
//!
//! Typed calls go through the [`RegistryCommand`] implementations directly;
//! [`Command`] exists for callers that pick the kind at runtime.

use crate::protocol::error::Result;
use crate::protocol::messages::{
    RegistryCommand, calendar::CalendarCommand, creator::CreatorCommand, episode::EpisodeCommand,
    file::FileCommand, group::GroupCommand, group_status::GroupStatusCommand,
    updated::UpdatedCommand,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every operation this layer knows how to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    Calendar,
    File,
    Episode,
    Group,
    GroupStatus,
    Creator,
    Updated,
}

impl CommandKind {
    pub const ALL: [Self; 7] = [
        Self::Calendar,
        Self::File,
        Self::Episode,
        Self::Group,
        Self::GroupStatus,
        Self::Creator,
        Self::Updated,
    ];

    /// Leading verb of the wire command
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Calendar => "CALENDAR",
            Self::File => "FILE",
            Self::Episode => "EPISODE",
            Self::Group => "GROUP",
            Self::GroupStatus => "GROUPSTATUS",
            Self::Creator => "CREATOR",
            Self::Updated => "UPDATED",
        }
    }

    /// Name used on the command line and in JSON output
    pub fn name(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::File => "file",
            Self::Episode => "episode",
            Self::Group => "group",
            Self::GroupStatus => "group-status",
            Self::Creator => "creator",
            Self::Updated => "updated",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

impl FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s) || kind.verb().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown command kind `{s}`"))
    }
}

/// A command of any supported kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Calendar(CalendarCommand),
    File(FileCommand),
    Episode(EpisodeCommand),
    Group(GroupCommand),
    GroupStatus(GroupStatusCommand),
    Creator(CreatorCommand),
    Updated(UpdatedCommand),
}

impl Command {
    /// Create a CALENDAR command
    pub fn calendar() -> Self {
        Self::Calendar(CalendarCommand)
    }

    /// Create a FILE lookup by size and ED2K hash
    pub fn file(size: u64, ed2k: impl Into<String>) -> Self {
        Self::File(FileCommand::new(size, ed2k))
    }

    /// Create an EPISODE command
    pub fn episode(episode_id: u64) -> Self {
        Self::Episode(EpisodeCommand::new(episode_id))
    }

    /// Create a GROUP command
    pub fn group(group_id: u64) -> Self {
        Self::Group(GroupCommand::new(group_id))
    }

    /// Create a GROUPSTATUS command
    pub fn group_status(anime_id: u64) -> Self {
        Self::GroupStatus(GroupStatusCommand::new(anime_id))
    }

    /// Create a CREATOR command
    pub fn creator(creator_id: u64) -> Self {
        Self::Creator(CreatorCommand::new(creator_id))
    }

    /// Create an UPDATED command
    pub fn updated(since: DateTime<Utc>) -> Self {
        Self::Updated(UpdatedCommand::new(since))
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Calendar(_) => CalendarCommand::KIND,
            Self::File(_) => FileCommand::KIND,
            Self::Episode(_) => EpisodeCommand::KIND,
            Self::Group(_) => GroupCommand::KIND,
            Self::GroupStatus(_) => GroupStatusCommand::KIND,
            Self::Creator(_) => CreatorCommand::KIND,
            Self::Updated(_) => UpdatedCommand::KIND,
        }
    }

    /// Validate and render the command for transmission
    pub fn encode(&self) -> Result<String> {
        match self {
            Self::Calendar(cmd) => cmd.encode(),
            Self::File(cmd) => cmd.encode(),
            Self::Episode(cmd) => cmd.encode(),
            Self::Group(cmd) => cmd.encode(),
            Self::GroupStatus(cmd) => cmd.encode(),
            Self::Creator(cmd) => cmd.encode(),
            Self::Updated(cmd) => cmd.encode(),
        }
    }

    /// Wire text without validation
    pub fn wire(&self) -> String {
        match self {
            Self::Calendar(cmd) => cmd.wire(),
            Self::File(cmd) => cmd.wire(),
            Self::Episode(cmd) => cmd.wire(),
            Self::Group(cmd) => cmd.wire(),
            Self::GroupStatus(cmd) => cmd.wire(),
            Self::Creator(cmd) => cmd.wire(),
            Self::Updated(cmd) => cmd.wire(),
        }
    }
}

/// Append the session key to an encoded command
pub fn with_session(wire: &str, session: &str) -> String {
    if wire.contains(' ') {
        format!("{wire}&s={session}")
    } else {
        format!("{wire} s={session}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in CommandKind::ALL {
            assert_eq!(kind.name().parse::<CommandKind>().unwrap(), kind);
            assert_eq!(kind.verb().parse::<CommandKind>().unwrap(), kind);
        }
        assert!("mylistadd".parse::<CommandKind>().is_err());
    }

    #[test]
    fn test_command_kinds() {
        assert_eq!(Command::calendar().kind(), CommandKind::Calendar);
        assert_eq!(Command::group_status(1).kind(), CommandKind::GroupStatus);
        assert_eq!(Command::creator(1).kind(), CommandKind::Creator);
    }

    #[test]
    fn test_command_encoding() {
        assert_eq!(Command::calendar().encode().unwrap(), "CALENDAR");
        assert_eq!(Command::group(7).encode().unwrap(), "GROUP gid=7");
        assert_eq!(
            Command::group_status(1612).encode().unwrap(),
            "GROUPSTATUS aid=1612"
        );
        assert_eq!(
            Command::creator(718).encode().unwrap(),
            "CREATOR creatorid=718"
        );
    }

    #[test]
    fn test_invalid_command_is_rejected_but_still_renders() {
        let cmd = Command::episode(0);
        assert!(cmd.encode().is_err());
        assert_eq!(cmd.wire(), "EPISODE eid=0");
    }

    #[test]
    fn test_with_session() {
        assert_eq!(with_session("GROUP gid=7", "abc12"), "GROUP gid=7&s=abc12");
        assert_eq!(with_session("CALENDAR", "abc12"), "CALENDAR s=abc12");
    }
}
