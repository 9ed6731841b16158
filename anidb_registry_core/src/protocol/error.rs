//! Protocol-specific error types
//!
//! This module defines the outcome taxonomy for the registry communication
//! layer. "Not found" is deliberately absent: it is a normal result carried by
//! [`Lookup::NotFound`](crate::protocol::messages::Lookup), never an error.

use crate::protocol::ban::BanChannel;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol-specific error types
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The reply violates the known grammar for the command that produced it
    #[error("Unexpected reply to `{command}`: {code} ({reason})")]
    UnexpectedReply {
        code: ReplyCode,
        command: String,
        body: String,
        reason: String,
    },

    /// The channel is banned, either before sending or as signalled by the reply
    #[error("Registry {channel} channel banned until {resume_at}")]
    Banned {
        channel: BanChannel,
        resume_at: DateTime<Utc>,
    },

    /// No reply arrived within the transport deadline
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    /// Transport failure below the protocol
    #[error("Network failure: {0}")]
    Network(#[from] std::io::Error),

    /// The command was rejected before it was ever sent
    #[error("Invalid command: {message}")]
    InvalidCommand { message: String },

    /// The registry no longer accepts the session this channel carries
    #[error("Session rejected by registry: {code}")]
    SessionRejected { code: ReplyCode },

    /// Server-side trouble unrelated to the command itself
    #[error("Registry server error: {code} - {message}")]
    ServerError { code: ReplyCode, message: String },
}

impl ProtocolError {
    /// Create an unexpected reply error carrying the full raw context
    pub fn unexpected_reply(
        code: ReplyCode,
        command: impl Into<String>,
        body: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnexpectedReply {
            code,
            command: command.into(),
            body: body.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid command error
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: message.into(),
        }
    }

    /// Create a banned error
    pub fn banned(channel: BanChannel, resume_at: DateTime<Utc>) -> Self {
        Self::Banned { channel, resume_at }
    }

    /// Create a server error
    pub fn server_error(code: ReplyCode, message: impl Into<String>) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
        }
    }

    /// Check if this error is transient and can be retried right away
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::ServerError { .. }
        )
    }

    /// Check if this error indicates a need to re-authenticate
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::SessionRejected { .. })
    }

    /// Retry guidance for the scheduler that issued the command
    pub fn retry_advice(&self) -> RetryAdvice {
        match self {
            Self::Banned { resume_at, .. } => RetryAdvice::After(*resume_at),
            Self::SessionRejected { .. } => RetryAdvice::Reauthenticate,
            err if err.is_transient() => RetryAdvice::Retryable,
            _ => RetryAdvice::Never,
        }
    }
}

/// What the caller of a command may do next
///
/// This layer never retries on its own; the advice is derived from the
/// outcome kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAdvice {
    /// Do not retry (entity missing, or the grammar mapping needs fixing)
    Never,
    /// Safe to retry at the scheduler's discretion
    Retryable,
    /// Retry only once the ban is estimated to be lifted
    After(DateTime<Utc>),
    /// Re-establish the session before retrying
    Reauthenticate,
}

/// Three-digit status code returned by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReplyCode(pub u16);

impl ReplyCode {
    pub const GROUP_STATUS: Self = Self(225);
    pub const FILE: Self = Self(220);
    pub const EPISODE: Self = Self(240);
    pub const UPDATED: Self = Self(243);
    pub const CREATOR: Self = Self(245);
    pub const GROUP: Self = Self(250);
    pub const CALENDAR: Self = Self(297);

    pub const NO_SUCH_FILE: Self = Self(320);
    pub const NO_GROUPS_FOUND: Self = Self(325);
    pub const NO_SUCH_ANIME: Self = Self(330);
    pub const NO_SUCH_EPISODE: Self = Self(340);
    pub const NO_UPDATES: Self = Self(343);
    pub const NO_SUCH_CREATOR: Self = Self(345);
    pub const NO_SUCH_GROUP: Self = Self(350);
    pub const CALENDAR_EMPTY: Self = Self(397);

    pub const LOGIN_FIRST: Self = Self(501);
    pub const ILLEGAL_INPUT: Self = Self(505);
    pub const INVALID_SESSION: Self = Self(506);
    pub const BANNED: Self = Self(555);
    pub const UNKNOWN_COMMAND: Self = Self(598);

    pub const INTERNAL_SERVER_ERROR: Self = Self(600);
    pub const OUT_OF_SERVICE: Self = Self(601);
    pub const SERVER_BUSY: Self = Self(602);
    pub const NO_DATA: Self = Self(603);
    pub const TIMEOUT_DELAY_AND_RESUBMIT: Self = Self(604);

    /// Check if the reply code indicates success
    pub fn is_success(&self) -> bool {
        matches!(self.0, 200..=299)
    }

    /// Check if the reply code signals a rejected session
    pub fn is_session_error(&self) -> bool {
        matches!(*self, Self::LOGIN_FIRST | Self::INVALID_SESSION)
    }

    /// Check if the reply code signals server-side trouble
    pub fn is_server_error(&self) -> bool {
        matches!(self.0, 600..=604)
    }

    /// Get a human-readable description of the reply code
    pub fn description(&self) -> &'static str {
        match *self {
            Self::FILE => "FILE",
            Self::GROUP_STATUS => "GROUP STATUS",
            Self::EPISODE => "EPISODE",
            Self::UPDATED => "UPDATED",
            Self::CREATOR => "CREATOR",
            Self::GROUP => "GROUP",
            Self::CALENDAR => "CALENDAR",

            Self::NO_SUCH_FILE => "NO SUCH FILE",
            Self::NO_GROUPS_FOUND => "NO GROUPS FOUND",
            Self::NO_SUCH_ANIME => "NO SUCH ANIME",
            Self::NO_SUCH_EPISODE => "NO SUCH EPISODE",
            Self::NO_UPDATES => "NO UPDATES",
            Self::NO_SUCH_CREATOR => "NO SUCH CREATOR",
            Self::NO_SUCH_GROUP => "NO SUCH GROUP",
            Self::CALENDAR_EMPTY => "CALENDAR EMPTY",

            Self::LOGIN_FIRST => "LOGIN FIRST",
            Self::ILLEGAL_INPUT => "ILLEGAL INPUT OR ACCESS DENIED",
            Self::INVALID_SESSION => "INVALID SESSION",
            Self::BANNED => "BANNED",
            Self::UNKNOWN_COMMAND => "UNKNOWN COMMAND",

            Self::INTERNAL_SERVER_ERROR => "INTERNAL SERVER ERROR",
            Self::OUT_OF_SERVICE => "ANIDB OUT OF SERVICE",
            Self::SERVER_BUSY => "SERVER BUSY",
            Self::NO_DATA => "NO DATA",
            Self::TIMEOUT_DELAY_AND_RESUBMIT => "TIMEOUT - DELAY AND RESUBMIT",

            _ => "UNKNOWN RESPONSE CODE",
        }
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.description())
    }
}
