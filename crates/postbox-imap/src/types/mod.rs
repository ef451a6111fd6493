//! Core IMAP types.
//!
//! Plain value types shared by the codec, the parser and the session:
//! identifiers, flags, capabilities, response codes and mailbox status.

#![allow(clippy::missing_const_for_fn)]

mod capability;
mod flags;
mod identifiers;
mod mailbox;
mod response_code;
mod sequence;

pub use capability::{Capabilities, Capability, Status};
pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{Mailbox, MailboxStatus};
pub use response_code::ResponseCode;
pub use sequence::SequenceSet;
