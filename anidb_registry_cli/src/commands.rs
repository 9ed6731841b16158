//! Command construction and reply handling shared by the subcommands

use anidb_registry_core::protocol::messages::{Reply, ResponseParser};
use anidb_registry_core::{Command, CommandKind, Response};
use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Subcommand;
use std::io::Read;
use std::path::Path;

/// A registry command described on the command line
#[derive(Subcommand, Debug, Clone)]
pub enum CommandSpec {
    /// Upcoming air dates
    Calendar,

    /// File by size and ED2K hash
    File {
        /// File size in bytes
        #[arg(long)]
        size: u64,

        /// ED2K hash (32 hex digits)
        #[arg(long)]
        ed2k: String,
    },

    /// Episode by id
    Episode { id: u64 },

    /// Release group by id
    Group { id: u64 },

    /// Release groups working on an anime
    GroupStatus { aid: u64 },

    /// Creator by id
    Creator { id: u64 },

    /// Anime updated since a unix timestamp
    Updated { since: i64 },
}

impl CommandSpec {
    pub fn to_command(&self) -> Result<Command> {
        let command = match self {
            Self::Calendar => Command::calendar(),
            Self::File { size, ed2k } => Command::file(*size, ed2k.as_str()),
            Self::Episode { id } => Command::episode(*id),
            Self::Group { id } => Command::group(*id),
            Self::GroupStatus { aid } => Command::group_status(*aid),
            Self::Creator { id } => Command::creator(*id),
            Self::Updated { since } => {
                let since = DateTime::from_timestamp(*since, 0)
                    .with_context(|| format!("Timestamp {since} is out of range"))?;
                Command::updated(since)
            }
        };
        Ok(command)
    }

    /// Validated wire text, without the session
    pub fn render(&self) -> Result<String> {
        Ok(self.to_command()?.encode()?)
    }
}

/// Read a captured reply from a file, or from stdin when no file is given
pub fn read_captured(input: Option<&Path>) -> Result<Reply> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read reply from stdin")?;
            raw
        }
    };

    Reply::parse(&raw).context("Captured text is not a registry reply")
}

/// Parse a captured reply for the given command kind
pub fn parse_captured(kind: CommandKind, anime_id: Option<u64>, reply: &Reply) -> Result<Response> {
    ResponseParser::parse_captured(kind, anime_id, reply)
        .with_context(|| format!("Failed to parse {} reply", kind.name()))
}

pub fn to_json(response: &Response) -> Result<String> {
    serde_json::to_string_pretty(response).context("Failed to serialize response")
}
