//! Type-safe command and reply definitions for the registry protocol
//!
//! Every supported command kind has its own module holding the typed request,
//! the result record, and the reply parser. Parsers never guess: a field the
//! grammar promises to be numeric either parses or the whole reply is rejected
//! as [`ProtocolError::UnexpectedReply`].

pub mod calendar;
pub mod command;
pub mod creator;
pub mod episode;
pub mod episode_range;
pub mod file;
pub mod group;
pub mod group_status;
pub mod response;
pub mod updated;

pub use calendar::{CalendarCommand, CalendarDateFlags, CalendarEntry};
pub use command::{Command, CommandKind};
pub use creator::{CreatorCommand, CreatorRecord, CreatorType};
pub use episode::{EpisodeCommand, EpisodeRecord};
pub use episode_range::{EpisodeRange, EpisodeRangeError, EpisodeSpan, has_release_gaps};
pub use file::{EpisodeCrossRef, FileCommand, FileRecord, FileState, MyListEntry, Quality, Source};
pub use group::{GroupCommand, GroupRelation, ReleaseGroupRecord};
pub use group_status::{CompletionState, GroupStatusCommand, ReleaseGroupStatus};
pub use response::{MalformedReply, Reply, Response, ResponseParser};
pub use updated::{UpdatedAnimeList, UpdatedCommand};

use crate::protocol::error::{ProtocolError, ReplyCode, Result};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Field separator in reply records
pub const FIELD_SEPARATOR: char = '|';

/// Separator of multi-valued fields (episode lists, language lists)
pub const LIST_SEPARATOR: char = '\'';

/// Separator inside one list item, and of episode range lists
pub const ITEM_SEPARATOR: char = ',';

/// Newline encoding inside field values
pub const ENCODED_NEWLINE: &str = "<br />";

/// Quote encoding inside field values
pub const ENCODED_QUOTE: char = '`';

/// Outcome of a lookup that reached the registry and got a well-formed answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    /// The entity exists and was fully parsed
    Found(T),
    /// The registry says the entity does not exist
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    pub fn as_ref(&self) -> Lookup<&T> {
        match self {
            Self::Found(value) => Lookup::Found(value),
            Self::NotFound => Lookup::NotFound,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
        }
    }
}

impl<T> From<Lookup<T>> for Option<T> {
    fn from(lookup: Lookup<T>) -> Self {
        lookup.found()
    }
}

/// Result of one typed registry call
pub type TypedResult<T> = Result<Lookup<T>>;

/// A command that can be rendered to the wire and whose reply can be parsed
pub trait RegistryCommand: fmt::Debug + Send + Sync {
    /// The command kind, which fixes the verb and the reply grammar
    const KIND: CommandKind;

    /// Typed result of a successful lookup
    type Output: fmt::Debug + Send + 'static;

    /// Parameters in wire order
    fn parameters(&self) -> Vec<(&'static str, String)>;

    /// Reject commands that cannot succeed before they cost a send slot
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Parse the registry's reply to this command
    fn parse_reply(&self, reply: &Reply) -> TypedResult<Self::Output>;

    /// Wire text without validation, used as diagnostic context
    fn wire(&self) -> String {
        render_wire(Self::KIND.verb(), &self.parameters())
    }

    /// Validate and render the command for transmission
    fn encode(&self) -> Result<String> {
        self.validate()?;
        Ok(self.wire())
    }
}

/// Render a verb and its parameters as `VERB k=v&k=v`
pub fn render_wire(verb: &str, parameters: &[(&'static str, String)]) -> String {
    if parameters.is_empty() {
        return verb.to_string();
    }

    let rendered: Vec<String> = parameters
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    format!("{verb} {}", rendered.join("&"))
}

/// Reject an identifier the registry would never accept
pub(crate) fn require_positive(value: u64, name: &str) -> Result<()> {
    if value == 0 {
        return Err(ProtocolError::invalid_command(format!(
            "{name} must be a positive integer"
        )));
    }
    Ok(())
}

/// Decode a field value from the registry's escaping
///
/// `<br />` becomes a newline and a backtick becomes a single quote.
pub fn decode_value(value: &str) -> String {
    value
        .replace(ENCODED_NEWLINE, "\n")
        .replace(ENCODED_QUOTE, "'")
}

/// The reply being parsed and the command that produced it
///
/// Every parse failure is built from this so it carries the full raw context.
#[derive(Debug, Clone, Copy)]
pub struct ReplyContext<'a> {
    pub kind: CommandKind,
    pub command: &'a str,
    pub reply: &'a Reply,
}

impl<'a> ReplyContext<'a> {
    pub fn new(kind: CommandKind, command: &'a str, reply: &'a Reply) -> Self {
        Self {
            kind,
            command,
            reply,
        }
    }

    pub fn code(&self) -> ReplyCode {
        self.reply.code
    }

    /// Build the unexpected-reply error for this reply
    pub fn error(&self, reason: impl Into<String>) -> ProtocolError {
        ProtocolError::unexpected_reply(
            self.reply.code,
            self.command,
            self.reply.body.as_str(),
            reason,
        )
    }

    /// Non-empty body lines, each one record
    pub fn records(&self) -> impl Iterator<Item = Record<'a>> + use<'a> {
        let ctx = *self;
        let reply: &'a Reply = self.reply;
        reply
            .body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(move |line| Record::split(ctx, line))
    }

    /// The single record of a one-record reply
    pub fn single_record(&self) -> Result<Record<'a>> {
        let mut records = self.records();
        let first = records
            .next()
            .ok_or_else(|| self.error("reply body is empty"))?;
        if records.next().is_some() {
            return Err(self.error("expected exactly one record"));
        }
        Ok(first)
    }

    /// Map a not-found code to the sentinel
    pub fn not_found<T>(&self) -> TypedResult<T> {
        debug!("{} lookup: {}", self.kind, self.reply.code);
        Ok(Lookup::NotFound)
    }

    /// Handle a code the command kind has no parser for
    ///
    /// Session and server trouble is common to every kind; anything else is a
    /// grammar violation.
    pub fn unhandled<T>(&self) -> TypedResult<T> {
        let code = self.reply.code;
        if code.is_session_error() {
            return Err(ProtocolError::SessionRejected { code });
        }
        if code.is_server_error() {
            return Err(ProtocolError::server_error(code, self.reply.message.as_str()));
        }
        Err(self.error(format!("unrecognized reply code for {}", self.kind)))
    }
}

/// One pipe-delimited reply record with positional, strictly typed access
///
/// Empty fields are kept: positions are load-bearing.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    ctx: ReplyContext<'a>,
    fields: Vec<&'a str>,
}

impl<'a> Record<'a> {
    pub fn split(ctx: ReplyContext<'a>, line: &'a str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        Self {
            ctx,
            fields: line.split(FIELD_SEPARATOR).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fail unless the field count is within `min..=max`
    pub fn expect_fields(&self, min: usize, max: usize) -> Result<()> {
        let count = self.fields.len();
        if count < min || count > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            return Err(self
                .ctx
                .error(format!("expected {expected} fields, got {count}")));
        }
        Ok(())
    }

    /// Raw field text, without decoding
    pub fn raw(&self, index: usize) -> Result<&'a str> {
        self.fields
            .get(index)
            .copied()
            .ok_or_else(|| self.ctx.error(format!("missing field {index}")))
    }

    /// Decoded field text
    pub fn text(&self, index: usize) -> Result<String> {
        self.raw(index).map(decode_value)
    }

    /// Decoded text, `None` when the field is empty or absent
    pub fn optional_text(&self, index: usize) -> Option<String> {
        self.fields
            .get(index)
            .filter(|value| !value.is_empty())
            .map(|value| decode_value(value))
    }

    /// A field the grammar guarantees to be numeric
    pub fn number<T: FromStr>(&self, index: usize, name: &str) -> Result<T> {
        let raw = self.raw(index)?;
        raw.trim().parse().map_err(|_| {
            self.ctx
                .error(format!("field {index} ({name}) is not numeric: `{raw}`"))
        })
    }

    /// A numeric field that may be empty or absent
    pub fn optional_number<T: FromStr>(&self, index: usize, name: &str) -> Result<Option<T>> {
        match self.fields.get(index) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(_) => self.number(index, name).map(Some),
        }
    }

    /// A rating transmitted as an integer scaled by 100
    pub fn rating(&self, index: usize, name: &str) -> Result<f32> {
        let scaled: u32 = self.number(index, name)?;
        Ok(scaled as f32 / 100.0)
    }

    /// A unix timestamp field
    pub fn timestamp(&self, index: usize, name: &str) -> Result<DateTime<Utc>> {
        let secs: i64 = self.number(index, name)?;
        DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            self.ctx
                .error(format!("field {index} ({name}) is out of range: {secs}"))
        })
    }

    /// A unix timestamp where empty or `0` means unknown
    pub fn optional_timestamp(&self, index: usize, name: &str) -> Result<Option<DateTime<Utc>>> {
        match self.optional_number::<i64>(index, name)? {
            None | Some(0) => Ok(None),
            Some(_) => self.timestamp(index, name).map(Some),
        }
    }

    /// A boolean transmitted as `0`/`1`
    pub fn flag(&self, index: usize, name: &str) -> Result<bool> {
        match self.raw(index)?.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(self
                .ctx
                .error(format!("field {index} ({name}) is not a flag: `{other}`"))),
        }
    }

    /// A list field split on `'`, empty entries removed
    pub fn list(&self, index: usize) -> Result<Vec<String>> {
        Ok(self
            .raw(index)?
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(decode_value)
            .collect())
    }

    pub fn context(&self) -> &ReplyContext<'a> {
        &self.ctx
    }
}

/// Log the outcome of a parse the way operators expect to see it
pub(crate) fn log_outcome<T>(kind: CommandKind, result: &TypedResult<T>) {
    match result {
        Ok(Lookup::Found(_)) => debug!("{kind} lookup parsed"),
        Ok(Lookup::NotFound) => {}
        Err(ProtocolError::UnexpectedReply {
            code,
            command,
            body,
            reason,
        }) => warn!(
            "Unexpected reply to {kind}: {reason}; code {code}, command `{command}`, body:\n{body}"
        ),
        Err(err) => debug!("{kind} lookup failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(code: u16, body: &str) -> Reply {
        Reply::new(ReplyCode(code), "TEST", body)
    }

    #[test]
    fn test_render_wire() {
        assert_eq!(render_wire("CALENDAR", &[]), "CALENDAR");
        assert_eq!(
            render_wire("UPDATED", &[("entity", "1".into()), ("time", "42".into())]),
            "UPDATED entity=1&time=42"
        );
    }

    #[test]
    fn test_decode_value() {
        assert_eq!(decode_value("simple"), "simple");
        assert_eq!(decode_value("line1<br />line2"), "line1\nline2");
        assert_eq!(decode_value("it`s"), "it's");
        assert_eq!(decode_value("/path/to/file"), "/path/to/file");
    }

    #[test]
    fn test_record_keeps_empty_fields() {
        let reply = reply(220, "1||3|");
        let ctx = ReplyContext::new(CommandKind::File, "FILE", &reply);
        let record = ctx.single_record().unwrap();

        assert_eq!(record.len(), 4);
        assert_eq!(record.raw(1).unwrap(), "");
        assert_eq!(record.optional_text(1), None);
        assert_eq!(record.optional_number::<u64>(3, "gid").unwrap(), None);
        assert_eq!(record.number::<u64>(2, "x").unwrap(), 3);
    }

    #[test]
    fn test_non_numeric_field_is_rejected() {
        let reply = reply(245, "abc|name");
        let ctx = ReplyContext::new(CommandKind::Creator, "CREATOR creatorid=1", &reply);
        let record = ctx.single_record().unwrap();

        match record.number::<u64>(0, "creator id") {
            Err(ProtocolError::UnexpectedReply {
                code,
                command,
                body,
                ..
            }) => {
                assert_eq!(code, ReplyCode(245));
                assert_eq!(command, "CREATOR creatorid=1");
                assert_eq!(body, "abc|name");
            }
            other => panic!("expected unexpected reply, got {other:?}"),
        }
    }

    #[test]
    fn test_expect_fields() {
        let reply = reply(240, "1|2|3");
        let ctx = ReplyContext::new(CommandKind::Episode, "EPISODE eid=1", &reply);
        let record = ctx.single_record().unwrap();

        assert!(record.expect_fields(3, 3).is_ok());
        assert!(record.expect_fields(2, 4).is_ok());
        let err = record.expect_fields(10, 11).unwrap_err();
        assert!(err.to_string().contains("240"));
    }

    #[test]
    fn test_list_and_flag_fields() {
        let reply = reply(220, "japanese'english''|1|2");
        let ctx = ReplyContext::new(CommandKind::File, "FILE", &reply);
        let record = ctx.single_record().unwrap();

        assert_eq!(record.list(0).unwrap(), vec!["japanese", "english"]);
        assert!(record.flag(1, "deprecated").unwrap());
        assert!(record.flag(2, "deprecated").is_err());
    }

    #[test]
    fn test_unhandled_codes() {
        let session = reply(506, "");
        let ctx = ReplyContext::new(CommandKind::Group, "GROUP gid=1", &session);
        assert!(matches!(
            ctx.unhandled::<()>(),
            Err(ProtocolError::SessionRejected { .. })
        ));

        let busy = reply(602, "");
        let ctx = ReplyContext::new(CommandKind::Group, "GROUP gid=1", &busy);
        assert!(matches!(
            ctx.unhandled::<()>(),
            Err(ProtocolError::ServerError { .. })
        ));

        let odd = reply(299, "x");
        let ctx = ReplyContext::new(CommandKind::Group, "GROUP gid=1", &odd);
        assert!(matches!(
            ctx.unhandled::<()>(),
            Err(ProtocolError::UnexpectedReply { .. })
        ));
    }

    #[test]
    fn test_lookup_helpers() {
        let found = Lookup::Found(3);
        assert!(found.is_found());
        assert_eq!(found.as_ref().map(|v| v * 2), Lookup::Found(6));
        assert_eq!(Option::from(found), Some(3));

        let missing: Lookup<u32> = Lookup::NotFound;
        assert!(missing.is_not_found());
        assert_eq!(missing.found(), None);
    }
}
