//! CALENDAR command: upcoming and recently started anime

use crate::protocol::error::ReplyCode;
use crate::protocol::messages::{
    CommandKind, Lookup, RegistryCommand, Reply, ReplyContext, TypedResult,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// CALENDAR command; takes no parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarCommand;

impl RegistryCommand for CalendarCommand {
    const KIND: CommandKind = CommandKind::Calendar;
    type Output = Vec<CalendarEntry>;

    fn parameters(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn parse_reply(&self, reply: &Reply) -> TypedResult<Self::Output> {
        parse_reply(&self.wire(), reply)
    }
}

/// One calendar line: `aid|startUnix|dateFlags`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub anime_id: u64,
    pub release_date: DateTime<Utc>,
    pub date_flags: CalendarDateFlags,
}

/// Precision flags attached to calendar dates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CalendarDateFlags(u32);

impl CalendarDateFlags {
    pub const START_DAY_UNKNOWN: u32 = 1;
    pub const START_MONTH_UNKNOWN: u32 = 2;
    pub const END_DAY_UNKNOWN: u32 = 4;
    pub const END_MONTH_UNKNOWN: u32 = 8;
    pub const AIRING_FINISHED: u32 = 16;
    pub const START_YEAR_UNKNOWN: u32 = 32;
    pub const END_YEAR_UNKNOWN: u32 = 64;

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    /// Whether the start date is exact to the day
    pub fn start_is_exact(&self) -> bool {
        !self.contains(Self::START_DAY_UNKNOWN)
            && !self.contains(Self::START_MONTH_UNKNOWN)
            && !self.contains(Self::START_YEAR_UNKNOWN)
    }

    pub fn airing_finished(&self) -> bool {
        self.contains(Self::AIRING_FINISHED)
    }
}

pub(crate) fn parse_reply(command: &str, reply: &Reply) -> TypedResult<Vec<CalendarEntry>> {
    let ctx = ReplyContext::new(CommandKind::Calendar, command, reply);
    match reply.code {
        ReplyCode::CALENDAR => {
            let mut entries = Vec::new();
            for record in ctx.records() {
                record.expect_fields(3, 3)?;
                entries.push(CalendarEntry {
                    anime_id: record.number(0, "anime id")?,
                    release_date: record.timestamp(1, "start date")?,
                    date_flags: CalendarDateFlags::from_bits(record.number(2, "date flags")?),
                });
            }
            Ok(Lookup::Found(entries))
        }
        ReplyCode::CALENDAR_EMPTY => ctx.not_found(),
        _ => ctx.unhandled(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error::ProtocolError;

    #[test]
    fn test_calendar_line() {
        let reply = Reply::new(ReplyCode::CALENDAR, "CALENDAR", "6622|1251417600|0");
        let entries = CalendarCommand.parse_reply(&reply).unwrap().found().unwrap();

        assert_eq!(
            entries,
            vec![CalendarEntry {
                anime_id: 6622,
                release_date: DateTime::from_timestamp(1_251_417_600, 0).unwrap(),
                date_flags: CalendarDateFlags::from_bits(0),
            }]
        );
        assert!(entries[0].date_flags.start_is_exact());
    }

    #[test]
    fn test_calendar_multiple_lines() {
        let reply = Reply::new(
            ReplyCode::CALENDAR,
            "CALENDAR",
            "6622|1251417600|0\n7100|1252000000|17\n",
        );
        let entries = CalendarCommand.parse_reply(&reply).unwrap().found().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].date_flags.airing_finished());
        assert!(!entries[1].date_flags.start_is_exact());
    }

    #[test]
    fn test_calendar_empty() {
        let reply = Reply::new(ReplyCode::CALENDAR_EMPTY, "CALENDAR EMPTY", "");
        assert_eq!(CalendarCommand.parse_reply(&reply).unwrap(), Lookup::NotFound);
    }

    #[test]
    fn test_calendar_non_numeric_date() {
        let reply = Reply::new(ReplyCode::CALENDAR, "CALENDAR", "6622|soon|0");
        let err = CalendarCommand.parse_reply(&reply).unwrap_err();
        match err {
            ProtocolError::UnexpectedReply { code, body, .. } => {
                assert_eq!(code, ReplyCode::CALENDAR);
                assert_eq!(body, "6622|soon|0");
            }
            other => panic!("expected unexpected reply, got {other:?}"),
        }
    }

    #[test]
    fn test_calendar_wrong_field_count() {
        let reply = Reply::new(ReplyCode::CALENDAR, "CALENDAR", "6622|1251417600");
        assert!(CalendarCommand.parse_reply(&reply).is_err());
    }

    #[test]
    fn test_calendar_wire() {
        assert_eq!(CalendarCommand.encode().unwrap(), "CALENDAR");
    }
}
