//! # postbox-imap
//!
//! An IMAP4rev1 client protocol engine: wire codec, response parser and a
//! session state machine that owns one TCP/TLS connection.
//!
//! ## Features
//!
//! - **Sans-I/O codec**: commands encode to byte fragments (with literals
//!   and `LITERAL+`), responses decode incrementally from a `BytesMut`
//! - **Single-owner session**: a worker task owns the transport; callers
//!   queue commands FIFO (or are rejected) and await their own completion
//! - **Deadlines**: a command without a tagged completion in time poisons
//!   the session instead of leaving the stream half-read
//! - **TLS via rustls**: implicit TLS or STARTTLS, with an explicit opt-in
//!   to skip certificate validation for test servers
//! - **Guaranteed release**: EXPUNGE + CLOSE + LOGOUT run exactly once when
//!   the session is disconnected or the last handle is dropped
//!
//! ## Quick Start
//!
//! ```ignore
//! use postbox_imap::{Config, SearchCriteria, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> postbox_imap::Result<()> {
//!     let config = Config::new("imap.example.com");
//!     let session = Session::connect(&config, SessionConfig::default()).await?;
//!
//!     session.authenticate("user@example.com", "password").await?;
//!     let status = session.select("INBOX").await?;
//!     println!("{} messages", status.exists);
//!
//!     let unread = session.search(SearchCriteria::Unseen).await?;
//!     println!("{} unread", unread.len());
//!
//!     session.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! ┌──────────────┐  greeting OK   ┌────────────────┐  LOGIN OK  ┌───────────────┐
//! │  Connecting  │ ─────────────→ │ Authenticating │ ─────────→ │ Authenticated │
//! └──────────────┘                └────────────────┘            └───────────────┘
//!        │  greeting PREAUTH                                      │         ▲
//!        └──────────────────────────────────────────────────→     │ SELECT  │ CLOSE
//!                                                                 ▼         │
//!                                                           ┌───────────────┐
//!                                                           │   Selected    │
//!                                                           └───────────────┘
//!
//! Any state ── LOGOUT / BYE / timeout / fatal error ──→ Disconnected (terminal)
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: incremental response framing
//! - [`command`]: commands, tag generation and wire encoding
//! - [`connection`]: transport configuration, TCP/TLS streams, framed I/O
//! - [`parser`]: sans-I/O response parser
//! - [`session`]: the session state machine
//! - [`types`]: flags, mailboxes, sequence sets and other protocol values

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod session;
pub mod types;

pub use codec::{Decoded, ResponseDecoder};
pub use command::{
    Command, EncodedCommand, FetchAttribute, SearchCriteria, StatusAttribute, StoreAction,
    TagGenerator,
};
pub use connection::{Config, ConfigBuilder, FramedStream, ImapStream, Security};
pub use error::{CommandContext, Error, ErrorKind, Result};
pub use parser::{
    Address, BodyStructure, Disposition, EmbeddedMessage, Envelope, FetchItem, MultiPart,
    Response, ResponseParser, SinglePart, StatusItem, UntaggedResponse,
};
pub use session::{
    CommandOutput, FetchedMessage, QueuePolicy, Session, SessionConfig, SessionInfo, SessionState,
};
pub use types::{
    Capabilities, Capability, Flag, Flags, Mailbox, MailboxStatus, ResponseCode, SeqNum,
    SequenceSet, Status, Tag, Uid, UidValidity,
};

/// Protocol revision spoken by the engine.
pub const IMAP_VERSION: &str = "IMAP4rev1";
