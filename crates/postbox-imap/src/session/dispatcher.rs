//! Pending-command table.
//!
//! Sans-I/O: the worker feeds it parsed responses and gets back finished
//! commands. Generic over the reply handle so it can be tested without
//! channels.

use std::collections::VecDeque;

use crate::error::CommandContext;
use crate::parser::UntaggedResponse;
use crate::types::{ResponseCode, Status, Tag};

struct Pending<R> {
    tag: Tag,
    context: CommandContext,
    reply: R,
    untagged: Vec<UntaggedResponse>,
}

/// A command whose tagged completion has arrived.
#[derive(Debug)]
pub struct Completion<R> {
    /// Reply handle given at registration.
    pub reply: R,
    /// Context given at registration, with the status line attached.
    pub context: CommandContext,
    /// Completion status.
    pub status: Status,
    /// Bracketed code of the completion.
    pub code: Option<ResponseCode>,
    /// Completion text.
    pub text: String,
    /// Untagged data received while the command was pending.
    pub untagged: Vec<UntaggedResponse>,
}

/// Tracks commands awaiting their tagged completion.
pub struct Dispatcher<R> {
    pending: VecDeque<Pending<R>>,
}

impl<R> Default for Dispatcher<R> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }
}

impl<R> Dispatcher<R> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a command sent under `tag`.
    ///
    /// Returns the reply back if `tag` is already pending.
    pub fn register(&mut self, tag: Tag, context: CommandContext, reply: R) -> Result<(), R> {
        if self.pending.iter().any(|p| p.tag == tag) {
            return Err(reply);
        }
        self.pending.push_back(Pending {
            tag,
            context,
            reply,
            untagged: Vec::new(),
        });
        Ok(())
    }

    /// Routes untagged data to the most recently sent command.
    ///
    /// Returns the data back when nothing is pending.
    pub fn on_untagged(&mut self, data: UntaggedResponse) -> Option<UntaggedResponse> {
        match self.pending.back_mut() {
            Some(p) => {
                p.untagged.push(data);
                None
            }
            None => Some(data),
        }
    }

    /// Resolves the command carrying `tag`.
    ///
    /// `None` if no such command is pending.
    pub fn on_tagged(
        &mut self,
        tag: &Tag,
        status: Status,
        code: Option<ResponseCode>,
        text: String,
    ) -> Option<Completion<R>> {
        let index = self.pending.iter().position(|p| &p.tag == tag)?;
        let p = self.pending.remove(index)?;
        let line = format!("{tag} {} {text}", status.as_str());
        Some(Completion {
            reply: p.reply,
            context: p.context.with_status_line(Some(line)),
            status,
            code,
            text,
            untagged: p.untagged,
        })
    }

    /// Removes every pending command, oldest first.
    pub fn drain(&mut self) -> Vec<(CommandContext, R)> {
        self.pending.drain(..).map(|p| (p.context, p.reply)).collect()
    }

    /// Number of pending commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn table(tags: &[&str]) -> Dispatcher<usize> {
        let mut d = Dispatcher::new();
        for (i, tag) in tags.iter().enumerate() {
            d.register(Tag::new(*tag), CommandContext::new(Tag::new(*tag), "NOOP"), i)
                .unwrap();
        }
        d
    }

    #[test]
    fn test_reordered_completions_reach_their_own_caller() {
        let mut d = table(&["A0001", "A0002", "A0003"]);

        let c = d
            .on_tagged(&Tag::new("A0003"), Status::No, None, "nope".into())
            .unwrap();
        assert_eq!(c.reply, 2);
        assert_eq!(c.status, Status::No);
        assert_eq!(c.context.status_line.as_deref(), Some("A0003 NO nope"));

        let c = d
            .on_tagged(&Tag::new("A0001"), Status::Ok, None, "done".into())
            .unwrap();
        assert_eq!(c.reply, 0);

        let c = d
            .on_tagged(&Tag::new("A0002"), Status::Ok, None, "done".into())
            .unwrap();
        assert_eq!(c.reply, 1);
        assert!(d.is_empty());
    }

    #[test]
    fn test_untagged_data_goes_to_the_newest_command() {
        let mut d = table(&["A0001"]);
        assert!(d.on_untagged(UntaggedResponse::Exists(4)).is_none());
        let c = d
            .on_tagged(&Tag::new("A0001"), Status::Ok, None, String::new())
            .unwrap();
        assert_eq!(c.untagged, vec![UntaggedResponse::Exists(4)]);
    }

    #[test]
    fn test_idle_untagged_data_is_handed_back() {
        let mut d: Dispatcher<()> = Dispatcher::new();
        assert_eq!(
            d.on_untagged(UntaggedResponse::Exists(9)),
            Some(UntaggedResponse::Exists(9))
        );
    }

    #[test]
    fn test_unknown_tag_resolves_nothing() {
        let mut d = table(&["A0001"]);
        assert!(d
            .on_tagged(&Tag::new("Z9"), Status::Ok, None, String::new())
            .is_none());
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_duplicate_tags_are_refused() {
        let mut d = table(&["A0001"]);
        let back = d.register(Tag::new("A0001"), CommandContext::untagged("NOOP"), 7);
        assert_eq!(back, Err(7));
    }

    #[test]
    fn test_drain_empties_in_send_order() {
        let mut d = table(&["A0001", "A0002"]);
        let drained: Vec<usize> = d.drain().into_iter().map(|(_, r)| r).collect();
        assert_eq!(drained, vec![0, 1]);
        assert!(d.is_empty());
    }
}
