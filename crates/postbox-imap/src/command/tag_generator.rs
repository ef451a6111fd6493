//! Command tag generator.

use crate::types::Tag;

/// Produces `A0001`, `A0002`, ... for one session.
///
/// Owned by the session worker, so a plain counter is enough. Past `u32::MAX`
/// the counter wraps to 1 and the tag widens with an epoch suffix, so tags
/// stay unique for the life of the session without panicking.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    prefix: char,
    counter: u32,
    epoch: u32,
}

impl TagGenerator {
    /// Starts a sequence with the given prefix letter.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            prefix,
            counter: 0,
            epoch: 0,
        }
    }

    /// Returns the next unused tag.
    pub fn next_tag(&mut self) -> Tag {
        if self.counter == u32::MAX {
            self.counter = 0;
            self.epoch += 1;
        }
        self.counter += 1;
        if self.epoch == 0 {
            Tag(format!("{}{:04}", self.prefix, self.counter))
        } else {
            Tag(format!("{}{}x{:04}", self.prefix, self.epoch, self.counter))
        }
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_starts_at_one() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next_tag().as_str(), "A0001");
        assert_eq!(tags.next_tag().as_str(), "A0002");
    }

    #[test]
    fn test_custom_prefix_and_width() {
        let mut tags = TagGenerator::new('P');
        for _ in 0..99 {
            let _ = tags.next_tag();
        }
        assert_eq!(tags.next_tag().as_str(), "P0100");
    }

    #[test]
    fn test_unique_over_many_commands() {
        let mut tags = TagGenerator::default();
        let seen: HashSet<_> = (0..20_000).map(|_| tags.next_tag()).collect();
        assert_eq!(seen.len(), 20_000);
    }

    #[test]
    fn test_wraps_without_repeating() {
        let mut tags = TagGenerator::default();
        tags.counter = u32::MAX - 1;
        let last = tags.next_tag();
        let wrapped = tags.next_tag();
        assert_eq!(last.as_str(), format!("A{}", u32::MAX));
        assert_eq!(wrapped.as_str(), "A1x0001");
    }
}
