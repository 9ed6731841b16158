//! Builder for raw registry replies

use anidb_registry_core::protocol::ReplyCode;
use anidb_registry_core::protocol::messages::Reply;

/// Builder for raw reply text, header line included
///
/// Records are joined with newlines and fields with `|`, so tests can state
/// positional fields without counting separators by hand.
#[derive(Debug, Clone)]
pub struct ReplyBuilder {
    code: ReplyCode,
    message: String,
    records: Vec<String>,
}

impl ReplyBuilder {
    pub fn new(code: ReplyCode) -> Self {
        Self {
            code,
            message: code.description().to_string(),
            records: Vec::new(),
        }
    }

    /// Override the header message
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    /// Append one record built from positional fields
    pub fn with_record<S: AsRef<str>>(mut self, fields: &[S]) -> Self {
        let record = fields
            .iter()
            .map(|field| field.as_ref())
            .collect::<Vec<_>>()
            .join("|");
        self.records.push(record);
        self
    }

    /// Raw datagram text
    pub fn raw(&self) -> String {
        let mut raw = format!("{} {}", self.code.0, self.message);
        for record in &self.records {
            raw.push('\n');
            raw.push_str(record);
        }
        raw.push('\n');
        raw
    }

    pub fn build(&self) -> Reply {
        Reply::new(self.code, self.message.clone(), self.records.join("\n"))
    }
}
