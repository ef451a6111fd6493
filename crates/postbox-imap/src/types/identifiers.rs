//! Tags, sequence numbers, UIDs and UIDVALIDITY.

use std::fmt;
use std::num::NonZeroU32;

/// Command tag.
///
/// Every command the session sends carries a fresh tag. The server echoes
/// it on the tagged completion, which is how the session finds the caller
/// waiting for that command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    /// Wraps a tag string.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! nonzero_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub NonZeroU32);

        impl $name {
            /// `None` for zero.
            #[must_use]
            pub fn new(n: u32) -> Option<Self> {
                NonZeroU32::new(n).map(Self)
            }

            /// The raw number.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

nonzero_id! {
    /// Message sequence number. 1-based, shifts on expunge.
    SeqNum
}

nonzero_id! {
    /// Persistent message identifier, valid for one [`UidValidity`].
    Uid
}

nonzero_id! {
    /// UIDVALIDITY of a mailbox. A change invalidates every UID seen before.
    UidValidity
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display_matches_input() {
        assert_eq!(Tag::new("A0007").to_string(), "A0007");
        assert_eq!(Tag::new("A0007"), Tag::new(String::from("A0007")));
    }

    #[test]
    fn test_zero_is_rejected() {
        assert!(SeqNum::new(0).is_none());
        assert!(Uid::new(0).is_none());
        assert!(UidValidity::new(0).is_none());
    }

    #[test]
    fn test_ordering_follows_value() {
        assert!(SeqNum::new(3).unwrap() < SeqNum::new(12).unwrap());
        assert_eq!(Uid::new(4711).unwrap().get(), 4711);
        assert_eq!(SeqNum::new(u32::MAX).unwrap().to_string(), u32::MAX.to_string());
    }
}
