//! CREATOR command: people and companies credited on anime

use crate::protocol::error::{ReplyCode, Result};
use crate::protocol::messages::{
    CommandKind, Lookup, RegistryCommand, Reply, ReplyContext, TypedResult, require_positive,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// CREATOR command by creator id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatorCommand {
    pub creator_id: u64,
}

impl CreatorCommand {
    pub fn new(creator_id: u64) -> Self {
        Self { creator_id }
    }
}

impl RegistryCommand for CreatorCommand {
    const KIND: CommandKind = CommandKind::Creator;
    type Output = CreatorRecord;

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![("creatorid", self.creator_id.to_string())]
    }

    fn validate(&self) -> Result<()> {
        require_positive(self.creator_id, "creator id")
    }

    fn parse_reply(&self, reply: &Reply) -> TypedResult<Self::Output> {
        parse_reply(&self.wire(), reply)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatorType {
    Person,
    Company,
    Collaboration,
    Other(u8),
}

impl CreatorType {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Person,
            2 => Self::Company,
            3 => Self::Collaboration,
            other => Self::Other(other),
        }
    }
}

/// A parsed CREATOR reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatorRecord {
    pub creator_id: u64,
    pub name: String,
    /// Name in the original script, when known
    pub original_name: Option<String>,
    pub creator_type: CreatorType,
    pub picture: Option<String>,
    pub url_english: Option<String>,
    pub url_japanese: Option<String>,
    pub wiki_english: Option<String>,
    pub wiki_japanese: Option<String>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

pub(crate) fn parse_reply(command: &str, reply: &Reply) -> TypedResult<CreatorRecord> {
    let ctx = ReplyContext::new(CommandKind::Creator, command, reply);
    match reply.code {
        ReplyCode::CREATOR => {
            let record = ctx.single_record()?;
            record.expect_fields(9, 10)?;
            Ok(Lookup::Found(CreatorRecord {
                creator_id: record.number(0, "creator id")?,
                original_name: record.optional_text(1),
                name: record.text(2)?,
                creator_type: CreatorType::from_code(record.number(3, "creator type")?),
                picture: record.optional_text(4),
                url_english: record.optional_text(5),
                url_japanese: record.optional_text(6),
                wiki_english: record.optional_text(7),
                wiki_japanese: record.optional_text(8),
                last_updated_at: record.optional_timestamp(9, "last update")?,
            }))
        }
        ReplyCode::NO_SUCH_CREATOR => ctx.not_found(),
        _ => ctx.unhandled(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error::ProtocolError;

    #[test]
    fn test_creator_wire() {
        assert_eq!(
            CreatorCommand::new(718).encode().unwrap(),
            "CREATOR creatorid=718"
        );
        assert!(CreatorCommand::new(0).encode().is_err());
    }

    #[test]
    fn test_parse_creator() {
        let reply = Reply::new(
            ReplyCode::CREATOR,
            "CREATOR",
            "718|宮崎駿|Miyazaki Hayao|1|1234.jpg||http://example.jp|Hayao_Miyazaki||1239494400",
        );
        let creator = CreatorCommand::new(718)
            .parse_reply(&reply)
            .unwrap()
            .found()
            .unwrap();

        assert_eq!(creator.creator_id, 718);
        assert_eq!(creator.name, "Miyazaki Hayao");
        assert_eq!(creator.original_name.as_deref(), Some("宮崎駿"));
        assert_eq!(creator.creator_type, CreatorType::Person);
        assert_eq!(creator.url_english, None);
        assert_eq!(creator.wiki_english.as_deref(), Some("Hayao_Miyazaki"));
        assert_eq!(
            creator.last_updated_at,
            DateTime::from_timestamp(1_239_494_400, 0)
        );
    }

    #[test]
    fn test_parse_company_without_update_time() {
        let reply = Reply::new(
            ReplyCode::CREATOR,
            "CREATOR",
            "4|スタジオジブリ|Studio Ghibli|2|||||",
        );
        let creator = CreatorCommand::new(4)
            .parse_reply(&reply)
            .unwrap()
            .found()
            .unwrap();
        assert_eq!(creator.creator_type, CreatorType::Company);
        assert_eq!(creator.last_updated_at, None);
    }

    #[test]
    fn test_creator_not_found() {
        let reply = Reply::new(ReplyCode::NO_SUCH_CREATOR, "NO SUCH CREATOR", "");
        let result = CreatorCommand::new(999_999).parse_reply(&reply);
        assert!(matches!(result, Ok(Lookup::NotFound)));
    }

    #[test]
    fn test_creator_session_rejected() {
        let reply = Reply::new(ReplyCode::LOGIN_FIRST, "LOGIN FIRST", "");
        assert!(matches!(
            CreatorCommand::new(1).parse_reply(&reply),
            Err(ProtocolError::SessionRejected { .. })
        ));
    }
}
