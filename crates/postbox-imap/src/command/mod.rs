//! Commands and their wire encoding.

mod serialize;
mod tag_generator;
mod types;

use crate::types::{Mailbox, SequenceSet, Tag};

pub use serialize::{EncodedCommand, LITERAL_THRESHOLD};
pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, SearchCriteria, StatusAttribute, StoreAction};

use serialize::Writer;

/// A command the session can send.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// `CAPABILITY`
    Capability,
    /// `NOOP`
    Noop,
    /// `LOGOUT`
    Logout,
    /// `STARTTLS`
    StartTls,
    /// `LOGIN user pass`
    Login {
        /// User name.
        username: String,
        /// Password. Never logged.
        password: String,
    },
    /// `SELECT mailbox`
    Select {
        /// Mailbox to open.
        mailbox: Mailbox,
    },
    /// `STATUS mailbox (items)`
    Status {
        /// Mailbox to query.
        mailbox: Mailbox,
        /// Counters wanted.
        items: Vec<StatusAttribute>,
    },
    /// `SEARCH criteria`
    Search {
        /// Search key.
        criteria: SearchCriteria,
    },
    /// `FETCH set items`
    Fetch {
        /// Messages.
        sequence: SequenceSet,
        /// Items to return.
        items: Vec<FetchAttribute>,
    },
    /// `STORE set action (flags)`
    Store {
        /// Messages.
        sequence: SequenceSet,
        /// Flag change.
        action: StoreAction,
        /// Suppress the untagged FETCH echo.
        silent: bool,
    },
    /// `EXPUNGE`
    Expunge,
    /// `CLOSE`
    Close,
}

impl Command {
    /// Encodes the command under `tag`.
    ///
    /// With `literal_plus` the server accepted `LITERAL+`, so literals are
    /// sent inline as `{n+}` and the result is a single fragment.
    #[must_use]
    pub fn encode(&self, tag: &Tag, literal_plus: bool) -> EncodedCommand {
        let mut w = Writer::new(tag.as_str(), literal_plus);

        match self {
            Self::Capability => {
                w.raw(b"CAPABILITY");
            }
            Self::Noop => {
                w.raw(b"NOOP");
            }
            Self::Logout => {
                w.raw(b"LOGOUT");
            }
            Self::StartTls => {
                w.raw(b"STARTTLS");
            }
            Self::Login { username, password } => {
                w.raw(b"LOGIN ")
                    .astring(username.as_bytes())
                    .sp()
                    .astring(password.as_bytes());
            }
            Self::Select { mailbox } => {
                w.raw(b"SELECT ").astring(mailbox.as_str().as_bytes());
            }
            Self::Status { mailbox, items } => {
                w.raw(b"STATUS ").astring(mailbox.as_str().as_bytes()).raw(b" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.sp();
                    }
                    w.raw(item.as_str().as_bytes());
                }
                w.raw(b")");
            }
            Self::Search { criteria } => {
                w.raw(b"SEARCH ").raw(criteria.as_str().as_bytes());
            }
            Self::Fetch { sequence, items } => {
                w.raw(b"FETCH ")
                    .raw(sequence.to_string().as_bytes())
                    .sp()
                    .fetch_items(items);
            }
            Self::Store {
                sequence,
                action,
                silent,
            } => {
                let (name, flags) = action.parts();
                w.raw(b"STORE ")
                    .raw(sequence.to_string().as_bytes())
                    .sp()
                    .raw(name.as_bytes());
                if *silent {
                    w.raw(b".SILENT");
                }
                w.raw(b" (");
                for (i, flag) in flags.iter().enumerate() {
                    if i > 0 {
                        w.sp();
                    }
                    w.raw(flag.as_str().as_bytes());
                }
                w.raw(b")");
            }
            Self::Expunge => {
                w.raw(b"EXPUNGE");
            }
            Self::Close => {
                w.raw(b"CLOSE");
            }
        }

        w.finish()
    }

    /// Command keyword, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::StartTls => "STARTTLS",
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::Status { .. } => "STATUS",
            Self::Search { .. } => "SEARCH",
            Self::Fetch { .. } => "FETCH",
            Self::Store { .. } => "STORE",
            Self::Expunge => "EXPUNGE",
            Self::Close => "CLOSE",
        }
    }

    /// Command text without tag, safe to log or put into errors.
    #[must_use]
    pub fn redacted(&self) -> String {
        match self {
            Self::Login { username, .. } => format!("LOGIN {username} <redacted>"),
            other => {
                let bytes = other.encode(&Tag::new(""), true).to_bytes();
                let text = String::from_utf8_lossy(&bytes);
                text.trim_start().trim_end_matches("\r\n").to_string()
            }
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.redacted())
    }
}
