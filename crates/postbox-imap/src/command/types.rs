//! Argument types for the commands the session sends.

use crate::types::Flag;

/// STATUS counters to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAttribute {
    /// `MESSAGES`
    Messages,
    /// `RECENT`
    Recent,
    /// `UIDNEXT`
    UidNext,
    /// `UIDVALIDITY`
    UidValidity,
    /// `UNSEEN`
    Unseen,
}

impl StatusAttribute {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "MESSAGES",
            Self::Recent => "RECENT",
            Self::UidNext => "UIDNEXT",
            Self::UidValidity => "UIDVALIDITY",
            Self::Unseen => "UNSEEN",
        }
    }
}

/// Data items of a FETCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// `FLAGS`
    Flags,
    /// `INTERNALDATE`
    InternalDate,
    /// `RFC822.SIZE`
    Rfc822Size,
    /// `ENVELOPE`
    Envelope,
    /// `BODYSTRUCTURE`
    BodyStructure,
    /// `UID`
    Uid,
    /// `BODY[section]` or `BODY.PEEK[section]`
    Body {
        /// Section, e.g. `1.2` or `HEADER`. `None` fetches the whole message.
        section: Option<String>,
        /// Use `BODY.PEEK` so `\Seen` is not set implicitly.
        peek: bool,
    },
}

/// STORE operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// `FLAGS`: replace.
    Set(Vec<Flag>),
    /// `+FLAGS`: add.
    Add(Vec<Flag>),
    /// `-FLAGS`: remove.
    Remove(Vec<Flag>),
}

impl StoreAction {
    pub(crate) fn parts(&self) -> (&'static str, &[Flag]) {
        match self {
            Self::Set(f) => ("FLAGS", f),
            Self::Add(f) => ("+FLAGS", f),
            Self::Remove(f) => ("-FLAGS", f),
        }
    }
}

/// SEARCH keys. Only the flag-state keys are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCriteria {
    /// `ALL`
    All,
    /// `UNSEEN`
    Unseen,
    /// `SEEN`
    Seen,
    /// `DELETED`
    Deleted,
    /// `UNDELETED`
    Undeleted,
    /// `FLAGGED`
    Flagged,
}

impl SearchCriteria {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Unseen => "UNSEEN",
            Self::Seen => "SEEN",
            Self::Deleted => "DELETED",
            Self::Undeleted => "UNDELETED",
            Self::Flagged => "FLAGGED",
        }
    }
}
