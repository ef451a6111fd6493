//! Message sequence sets.

use super::SeqNum;

/// A set of message sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// One message.
    Single(SeqNum),
    /// Inclusive range.
    Range(SeqNum, SeqNum),
    /// `*`: the highest numbered message.
    All,
    /// Comma separated union.
    Set(Vec<Self>),
}

impl SequenceSet {
    /// A single message. `None` for zero.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        SeqNum::new(n).map(Self::Single)
    }

    /// An inclusive range. `None` if either end is zero.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        Some(Self::Range(SeqNum::new(start)?, SeqNum::new(end)?))
    }
}

impl From<SeqNum> for SequenceSet {
    fn from(n: SeqNum) -> Self {
        Self::Single(n)
    }
}

impl std::fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::All => f.write_str("*"),
            Self::Set(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(SequenceSet::single(7).unwrap().to_string(), "7");
        assert_eq!(SequenceSet::range(2, 9).unwrap().to_string(), "2:9");
        assert_eq!(SequenceSet::All.to_string(), "*");
        let union = SequenceSet::Set(vec![
            SequenceSet::single(1).unwrap(),
            SequenceSet::range(4, 6).unwrap(),
        ]);
        assert_eq!(union.to_string(), "1,4:6");
    }

    #[test]
    fn test_zero_is_not_a_message() {
        assert!(SequenceSet::single(0).is_none());
        assert!(SequenceSet::range(0, 3).is_none());
    }
}
