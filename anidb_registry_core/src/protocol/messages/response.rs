//! Raw replies and dispatch to the per-command parsers
//!
//! [`Reply`] is what the channel hands back: the status code, the header
//! message and the body. [`ResponseParser`] routes it to the parser of the
//! command kind that produced it. There is no generic fallback.

use crate::protocol::error::{ProtocolError, ReplyCode, Result};
use crate::protocol::messages::{
    CalendarEntry, Command, CommandKind, CreatorRecord, EpisodeRecord, FileRecord, Lookup,
    RegistryCommand, ReleaseGroupRecord, ReleaseGroupStatus, UpdatedAnimeList, calendar, creator,
    episode, file, group, group_status, log_outcome, updated,
};
use serde::Serialize;
use thiserror::Error;

/// A reply from the registry: `<code> <message>` then the body lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: ReplyCode,
    pub message: String,
    pub body: String,
}

/// The reply text does not start with a status code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed reply header: `{header}`")]
pub struct MalformedReply {
    pub header: String,
}

impl Reply {
    pub fn new(code: ReplyCode, message: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            body: body.into(),
        }
    }

    /// Split raw reply text into header and body
    pub fn parse(raw: &str) -> std::result::Result<Self, MalformedReply> {
        let raw = raw.trim_start_matches(['\r', '\n']);
        let (header, body) = raw.split_once('\n').unwrap_or((raw, ""));
        let header = header.trim_end_matches('\r');

        let (code_text, message) = header.split_once(' ').unwrap_or((header, ""));
        let code = match code_text.parse::<u16>() {
            Ok(code) if (100..=999).contains(&code) => code,
            _ => {
                return Err(MalformedReply {
                    header: header.to_string(),
                });
            }
        };

        Ok(Self {
            code: ReplyCode(code),
            message: message.trim().to_string(),
            body: body.trim_end_matches(['\r', '\n']).to_string(),
        })
    }
}

/// Parsed reply of any supported kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "kebab-case")]
pub enum Response {
    Calendar(Lookup<Vec<CalendarEntry>>),
    File(Lookup<Box<FileRecord>>),
    Episode(Lookup<EpisodeRecord>),
    Group(Lookup<ReleaseGroupRecord>),
    GroupStatus(Lookup<Vec<ReleaseGroupStatus>>),
    Creator(Lookup<CreatorRecord>),
    Updated(Lookup<UpdatedAnimeList>),
}

impl Response {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Calendar(_) => CommandKind::Calendar,
            Self::File(_) => CommandKind::File,
            Self::Episode(_) => CommandKind::Episode,
            Self::Group(_) => CommandKind::Group,
            Self::GroupStatus(_) => CommandKind::GroupStatus,
            Self::Creator(_) => CommandKind::Creator,
            Self::Updated(_) => CommandKind::Updated,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Calendar(lookup) => lookup.is_not_found(),
            Self::File(lookup) => lookup.is_not_found(),
            Self::Episode(lookup) => lookup.is_not_found(),
            Self::Group(lookup) => lookup.is_not_found(),
            Self::GroupStatus(lookup) => lookup.is_not_found(),
            Self::Creator(lookup) => lookup.is_not_found(),
            Self::Updated(lookup) => lookup.is_not_found(),
        }
    }
}

/// Routes replies to the parser registered for the originating command kind
pub struct ResponseParser;

impl ResponseParser {
    /// Parse the reply to `command`
    pub fn parse(command: &Command, reply: &Reply) -> Result<Response> {
        let response = match command {
            Command::Calendar(cmd) => Response::Calendar(Self::typed(cmd, reply)?),
            Command::File(cmd) => Response::File(Self::typed(cmd, reply)?.map(Box::new)),
            Command::Episode(cmd) => Response::Episode(Self::typed(cmd, reply)?),
            Command::Group(cmd) => Response::Group(Self::typed(cmd, reply)?),
            Command::GroupStatus(cmd) => Response::GroupStatus(Self::typed(cmd, reply)?),
            Command::Creator(cmd) => Response::Creator(Self::typed(cmd, reply)?),
            Command::Updated(cmd) => Response::Updated(Self::typed(cmd, reply)?),
        };
        Ok(response)
    }

    /// Parse a captured reply when only the command kind is known
    ///
    /// Group-status records do not repeat the anime id, so it must be supplied
    /// for that kind.
    pub fn parse_captured(
        kind: CommandKind,
        anime_id: Option<u64>,
        reply: &Reply,
    ) -> Result<Response> {
        let command = kind.verb();
        let response = match kind {
            CommandKind::Calendar => Response::Calendar(calendar::parse_reply(command, reply)?),
            CommandKind::File => Response::File(file::parse_reply(command, reply)?.map(Box::new)),
            CommandKind::Episode => Response::Episode(episode::parse_reply(command, reply)?),
            CommandKind::Group => Response::Group(group::parse_reply(command, reply)?),
            CommandKind::GroupStatus => {
                let anime_id = anime_id.ok_or_else(|| {
                    ProtocolError::invalid_command("group status replies need the anime id")
                })?;
                Response::GroupStatus(group_status::parse_reply(command, anime_id, reply)?)
            }
            CommandKind::Creator => Response::Creator(creator::parse_reply(command, reply)?),
            CommandKind::Updated => Response::Updated(updated::parse_reply(command, reply)?),
        };
        Ok(response)
    }

    fn typed<C: RegistryCommand>(command: &C, reply: &Reply) -> Result<Lookup<C::Output>> {
        let result = command.parse_reply(reply);
        log_outcome(C::KIND, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_header_and_body() {
        let reply = Reply::parse("297 CALENDAR\n6622|1251417600|0\n6623|1251417600|16\n").unwrap();
        assert_eq!(reply.code, ReplyCode::CALENDAR);
        assert_eq!(reply.message, "CALENDAR");
        assert_eq!(reply.body, "6622|1251417600|0\n6623|1251417600|16");
    }

    #[test]
    fn test_parse_reply_without_body() {
        let reply = Reply::parse("345 NO SUCH CREATOR").unwrap();
        assert_eq!(reply.code, ReplyCode::NO_SUCH_CREATOR);
        assert_eq!(reply.message, "NO SUCH CREATOR");
        assert!(reply.body.is_empty());

        let reply = Reply::parse("555\r\n").unwrap();
        assert_eq!(reply.code, ReplyCode::BANNED);
        assert!(reply.message.is_empty());
    }

    #[test]
    fn test_parse_reply_rejects_bad_header() {
        assert!(Reply::parse("").is_err());
        assert!(Reply::parse("BANNED").is_err());
        assert!(Reply::parse("42 TOO SHORT").is_err());
    }

    #[test]
    fn test_dispatch_by_command() {
        let reply = Reply::parse("345 NO SUCH CREATOR").unwrap();
        let response = ResponseParser::parse(&Command::creator(1), &reply).unwrap();
        assert_eq!(response.kind(), CommandKind::Creator);
        assert!(response.is_not_found());
    }

    #[test]
    fn test_no_generic_fallback() {
        // A perfectly valid calendar reply is still wrong for a creator lookup
        let reply = Reply::parse("297 CALENDAR\n6622|1251417600|0").unwrap();
        let err = ResponseParser::parse(&Command::creator(1), &reply).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedReply { .. }));
    }

    #[test]
    fn test_ban_code_is_unexpected_at_dispatch() {
        let reply = Reply::parse("555 BANNED\nleech").unwrap();
        let err = ResponseParser::parse(&Command::calendar(), &reply).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedReply { .. }));
    }

    #[test]
    fn test_parse_captured_group_status_needs_anime() {
        let reply = Reply::parse("225 GROUPSTATUS\n1612|MDAN|1|9|784|2|1-9").unwrap();
        assert!(matches!(
            ResponseParser::parse_captured(CommandKind::GroupStatus, None, &reply),
            Err(ProtocolError::InvalidCommand { .. })
        ));

        let response =
            ResponseParser::parse_captured(CommandKind::GroupStatus, Some(3), &reply).unwrap();
        match response {
            Response::GroupStatus(Lookup::Found(statuses)) => {
                assert_eq!(statuses.len(), 1);
                assert_eq!(statuses[0].anime_id, 3);
            }
            other => panic!("expected group status, got {other:?}"),
        }
    }
}
