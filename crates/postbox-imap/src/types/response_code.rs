//! Bracketed response codes (`[UIDVALIDITY 3857529045]` and friends).

use super::{Capability, Flag, SeqNum, Uid, UidValidity};

/// Response code attached to a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// `ALERT`: text must be shown to the user.
    Alert,
    /// `CAPABILITY ...` piggybacked on a greeting or LOGIN completion.
    Capability(Vec<Capability>),
    /// `PARSE`: the server could not parse a message.
    Parse,
    /// `PERMANENTFLAGS (...)`
    PermanentFlags(Vec<Flag>),
    /// `READ-ONLY`
    ReadOnly,
    /// `READ-WRITE`
    ReadWrite,
    /// `TRYCREATE`: target mailbox does not exist.
    TryCreate,
    /// `NONEXISTENT` (RFC 5530)
    Nonexistent,
    /// `AUTHENTICATIONFAILED` (RFC 5530)
    AuthenticationFailed,
    /// `UIDNEXT n`
    UidNext(Uid),
    /// `UIDVALIDITY n`
    UidValidity(UidValidity),
    /// `UNSEEN n`: first unseen sequence number.
    Unseen(SeqNum),
    /// Anything else, raw.
    Unknown(String),
}

impl ResponseCode {
    /// True for codes that say the mailbox does not exist.
    #[must_use]
    pub fn is_missing_mailbox(&self) -> bool {
        matches!(self, Self::Nonexistent | Self::TryCreate)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mailbox_codes() {
        assert!(ResponseCode::Nonexistent.is_missing_mailbox());
        assert!(ResponseCode::TryCreate.is_missing_mailbox());
        assert!(!ResponseCode::Alert.is_missing_mailbox());
    }
}
