//! Error types for the IMAP engine.

use std::time::Duration;

use thiserror::Error;

use crate::types::Tag;

/// What the session was doing when a command failed.
///
/// LOGIN arguments are never stored here, only the redacted form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandContext {
    /// Tag of the failed command, if one was assigned.
    pub tag: Option<Tag>,
    /// Command text with credentials redacted.
    pub command: String,
    /// Raw tagged status line, if the server answered.
    pub status_line: Option<String>,
}

impl CommandContext {
    /// Context for a command that was sent under `tag`.
    #[must_use]
    pub fn new(tag: Tag, command: impl Into<String>) -> Self {
        Self {
            tag: Some(tag),
            command: command.into(),
            status_line: None,
        }
    }

    /// Context for a command that never got a tag.
    #[must_use]
    pub fn untagged(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Attaches the server's status line.
    #[must_use]
    pub fn with_status_line(mut self, line: Option<String>) -> Self {
        self.status_line = line;
        self
    }
}

impl std::fmt::Display for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{tag} {}", self.command)?,
            None => f.write_str(&self.command)?,
        }
        if let Some(line) = &self.status_line {
            write!(f, " -> {line}")?;
        }
        Ok(())
    }
}

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or record error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Host name not usable for TLS server name indication.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Not connected, connection lost, or the server refused the session.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Server closed the session with BYE.
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// Malformed server output.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte offset into the response.
        position: usize,
        /// What was wrong.
        message: String,
    },

    /// LOGIN was rejected.
    #[error("Authentication failed: {context}")]
    Authentication {
        /// The failed command.
        context: CommandContext,
    },

    /// SELECT or STATUS named a mailbox the server does not have.
    #[error("Mailbox not found: {mailbox} ({context})")]
    MailboxNotFound {
        /// Requested mailbox.
        mailbox: String,
        /// The failed command.
        context: CommandContext,
    },

    /// Server answered NO.
    #[error("Server returned NO: {context}")]
    No {
        /// The failed command.
        context: CommandContext,
    },

    /// Server answered BAD.
    #[error("Server returned BAD: {context}")]
    Bad {
        /// The failed command.
        context: CommandContext,
    },

    /// No tagged completion arrived in time. The session is now disconnected.
    #[error("Command timed out after {after:?}: {context}")]
    Timeout {
        /// Deadline that expired.
        after: Duration,
        /// The command that was in flight.
        context: CommandContext,
    },

    /// The session refused to queue another command.
    #[error("Session busy: a command is already in flight")]
    SessionBusy,

    /// Transport or protocol failure while a command was in flight.
    #[error("{source} ({context})")]
    Command {
        /// The command that was in flight.
        context: CommandContext,
        /// What went wrong.
        source: Box<Error>,
    },
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport, TLS, BYE or not connected.
    Connection,
    /// Credentials rejected.
    Authentication,
    /// Server output could not be parsed.
    ProtocolSyntax,
    /// A command deadline expired.
    CommandTimeout,
    /// The mailbox does not exist.
    MailboxNotFound,
    /// Queue full or rejecting.
    SessionBusy,
    /// Any other NO or BAD completion.
    Rejected,
}

impl Error {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Command { source, .. } => source.kind(),
            Self::Io(_) | Self::Tls(_) | Self::InvalidDnsName(_) | Self::Connection(_) | Self::Bye(_) => {
                ErrorKind::Connection
            }
            Self::Parse { .. } => ErrorKind::ProtocolSyntax,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::MailboxNotFound { .. } => ErrorKind::MailboxNotFound,
            Self::Timeout { .. } => ErrorKind::CommandTimeout,
            Self::SessionBusy => ErrorKind::SessionBusy,
            Self::No { .. } | Self::Bad { .. } => ErrorKind::Rejected,
        }
    }

    /// Command context, for errors tied to a specific command.
    #[must_use]
    pub const fn context(&self) -> Option<&CommandContext> {
        match self {
            Self::Command { context, .. }
            | Self::Authentication { context }
            | Self::MailboxNotFound { context, .. }
            | Self::No { context }
            | Self::Bad { context }
            | Self::Timeout { context, .. } => Some(context),
            _ => None,
        }
    }

    /// True when the session cannot be used afterwards.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connection
                | ErrorKind::ProtocolSyntax
                | ErrorKind::CommandTimeout
                | ErrorKind::Authentication
        )
    }

    /// The underlying error, with any command wrapper removed.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Command { source, .. } => source.root(),
            other => other,
        }
    }

    /// Attaches `context` unless the error already names its command.
    pub(crate) fn in_command(self, context: CommandContext) -> Self {
        if self.context().is_some() {
            return self;
        }
        Self::Command {
            context,
            source: Box::new(self),
        }
    }

    pub(crate) fn not_connected() -> Self {
        Self::Connection("session is disconnected".into())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
