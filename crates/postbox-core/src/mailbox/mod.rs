//! Mailbox operations on one selected mailbox.
//!
//! [`MailClient`] wraps a [`Session`] and turns the raw IMAP commands into
//! the values a mail reader needs: counts, headers, a preferred body and
//! decoded attachments.

mod convert;
mod model;
mod storage;

use std::path::{Path, PathBuf};

use postbox_imap::{
    ErrorKind, FetchAttribute, FetchItem, Flag, SearchCriteria, SeqNum, SequenceSet, Session,
    SessionState, StatusAttribute, StatusItem, StoreAction,
};
use postbox_mime::{BodyPart, MediaType, PartNumber, PartSource, fetch_bytes, resolve};
use tracing::{debug, info, warn};

use crate::account::AccountConfig;
use crate::error::{Error, Result};

pub use model::{Attachment, BodyFormat, Email, MessageHeader, MessageSummary};

/// A logged-in connection to one mailbox.
///
/// Dropping the client without calling [`close`](Self::close) still
/// releases the mailbox: the session worker expunges, closes and logs out
/// once the last handle is gone.
#[derive(Debug)]
pub struct MailClient {
    session: Session,
    config: AccountConfig,
}

impl MailClient {
    /// Connects to the account's server.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an invalid account, otherwise connection
    /// errors from the session.
    pub async fn connect(config: AccountConfig) -> Result<Self> {
        config.check()?;
        let session = Session::connect(&config.connection(), config.session()).await?;
        info!(host = %config.host, port = config.port(), "connected");
        Ok(Self { session, config })
    }

    /// Wraps a session that is already connected.
    #[must_use]
    pub const fn from_session(session: Session, config: AccountConfig) -> Self {
        Self { session, config }
    }

    /// Connects, logs in, runs `f` and closes the client on every path.
    ///
    /// # Errors
    ///
    /// Connection and login errors, or whatever `f` returns.
    pub async fn scope<T, F>(config: AccountConfig, password: &str, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&Self) -> Result<T>,
    {
        let client = Self::connect(config).await?;
        let outcome = match client.authenticate(password).await {
            Ok(()) => f(&client).await,
            Err(err) => Err(err),
        };
        client.close().await;
        outcome
    }

    /// The underlying session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The account this client was built from.
    #[must_use]
    pub const fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Logs in and selects the configured mailbox.
    ///
    /// # Errors
    ///
    /// Authentication failures (the session is then disconnected) and
    /// [`postbox_imap::Error::MailboxNotFound`].
    pub async fn authenticate(&self, password: &str) -> Result<()> {
        self.session
            .authenticate(&self.config.username, password)
            .await?;
        let status = self.session.select(self.config.mailbox.as_str()).await?;
        debug!(user = %self.config.username, exists = status.exists, "ready");
        Ok(())
    }

    /// Number of messages in the mailbox.
    ///
    /// The count the session already holds is used while it is younger than
    /// the account's `status_max_age`; otherwise `STATUS` refreshes it.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn total(&self) -> Result<u32> {
        let info = self.session.info();
        let max_age = self.config.status_max_age();
        let fresh = info.status_updated.is_some_and(|at| at.elapsed() < max_age);
        if fresh && info.mailbox.is_some_and(|m| m.as_str() == self.config.mailbox) {
            if let Some(status) = info.status {
                return Ok(status.exists);
            }
        }

        let items = self
            .session
            .status(self.config.mailbox.as_str(), vec![StatusAttribute::Messages])
            .await?;
        let messages = items.iter().find_map(|item| match item {
            StatusItem::Messages(n) => Some(*n),
            _ => None,
        });
        Ok(messages
            .or_else(|| self.session.info().status.map(|s| s.exists))
            .unwrap_or_default())
    }

    /// Sequence numbers of unseen messages.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn unread(&self) -> Result<Vec<u32>> {
        let ids = self.session.search(SearchCriteria::Unseen).await?;
        Ok(ids.into_iter().map(SeqNum::get).collect())
    }

    /// Flags, UID and internal date of one message.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn summary(&self, id: u32) -> Result<Option<MessageSummary>> {
        let Some(seq) = SeqNum::new(id) else {
            return Ok(None);
        };
        let messages = self
            .session
            .fetch(
                seq.into(),
                vec![
                    FetchAttribute::Uid,
                    FetchAttribute::Flags,
                    FetchAttribute::InternalDate,
                ],
            )
            .await?;
        Ok(messages
            .iter()
            .find(|m| m.seq == seq)
            .map(convert::summary))
    }

    /// Envelope data of one message.
    ///
    /// `None` for an unknown message and for mail from `mailer-daemon` or
    /// `postmaster`.
    ///
    /// # Errors
    ///
    /// Connection failures and timeouts. A NO or BAD for the message number
    /// counts as unknown.
    pub async fn header(&self, id: u32) -> Result<Option<MessageHeader>> {
        let Some(seq) = SeqNum::new(id) else {
            return Ok(None);
        };
        let fetched = self
            .session
            .fetch(
                seq.into(),
                vec![
                    FetchAttribute::Flags,
                    FetchAttribute::InternalDate,
                    FetchAttribute::Envelope,
                ],
            )
            .await;
        let messages = match fetched {
            Ok(messages) => messages,
            Err(err) if err.kind() == ErrorKind::Rejected => {
                debug!(id, error = %err, "header fetch rejected");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(messages
            .iter()
            .find(|m| m.seq == seq)
            .and_then(convert::header))
    }

    /// Body structure of one message. `None` for an unknown message.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn structure(&self, id: u32) -> Result<Option<BodyPart>> {
        let Some(seq) = SeqNum::new(id) else {
            return Ok(None);
        };
        let messages = self
            .session
            .fetch(seq.into(), vec![FetchAttribute::BodyStructure])
            .await?;
        Ok(messages
            .into_iter()
            .filter(|m| m.seq == seq)
            .flat_map(|m| m.items)
            .find_map(|item| match item {
                FetchItem::BodyStructure(structure) => Some(convert::body_part(&structure)),
                _ => None,
            }))
    }

    /// Body text in the preferred format.
    ///
    /// [`BodyFormat::Html`] falls back to `text/plain` when no HTML part
    /// has content. An empty string means the message has no text body.
    ///
    /// # Errors
    ///
    /// Fetch failures and parts that do not decode.
    pub async fn body(&self, id: u32, format: BodyFormat) -> Result<String> {
        let Some(seq) = SeqNum::new(id) else {
            return Ok(String::new());
        };
        let Some(tree) = self.structure(id).await? else {
            return Ok(String::new());
        };
        let source = BodySections::new(&self.session, seq);

        if format == BodyFormat::Html {
            if let Some(part) = resolve(&tree, &MediaType::text_html(), &source).await? {
                return Ok(part.text);
            }
            debug!(id, "no html body, trying plain text");
        }
        Ok(resolve(&tree, &MediaType::text_plain(), &source)
            .await?
            .map(|part| part.text)
            .unwrap_or_default())
    }

    /// Every part that declares a file name, decoded, in part order.
    ///
    /// # Errors
    ///
    /// Fetch failures and parts that do not decode.
    pub async fn attachments(&self, id: u32) -> Result<Vec<Attachment>> {
        let Some(seq) = SeqNum::new(id) else {
            return Ok(Vec::new());
        };
        let Some(tree) = self.structure(id).await? else {
            return Ok(Vec::new());
        };
        let source = BodySections::new(&self.session, seq);

        let mut attachments = Vec::new();
        for (part, leaf) in tree.attachments() {
            let Some(filename) = leaf.filename() else {
                continue;
            };
            let data = fetch_bytes(&source, &part, leaf).await?;
            attachments.push(Attachment {
                filename,
                data,
                part,
                media_type: leaf.mime_type(),
            });
        }
        Ok(attachments)
    }

    /// Saves every attachment of a message into `folder` and returns the
    /// written paths.
    ///
    /// The folder is created (mode `0755` on Unix) if it does not exist.
    /// Files with the same name are overwritten.
    ///
    /// # Errors
    ///
    /// Fetch failures and file system errors.
    pub async fn save_attachments(&self, id: u32, folder: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let attachments = self.attachments(id).await?;
        storage::save(folder.as_ref(), &attachments).await
    }

    /// Header, preferred body and attachments in one value.
    ///
    /// `None` when [`header`](Self::header) is `None`.
    ///
    /// # Errors
    ///
    /// As for the individual operations.
    pub async fn email(&self, id: u32) -> Result<Option<Email>> {
        let Some(header) = self.header(id).await? else {
            return Ok(None);
        };
        let body = self.body(id, BodyFormat::Html).await?;
        let attachments = self.attachments(id).await?;
        Ok(Some(Email {
            header,
            body,
            attachments,
        }))
    }

    /// Adds `\Seen`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMessage`] for message number zero, otherwise command
    /// failures.
    pub async fn mark_as_read(&self, id: u32) -> Result<()> {
        self.set_flag(id, Flag::Seen).await
    }

    /// Adds `\Deleted`. The message goes away at the next expunge.
    ///
    /// # Errors
    ///
    /// As for [`mark_as_read`](Self::mark_as_read).
    pub async fn delete(&self, id: u32) -> Result<()> {
        self.set_flag(id, Flag::Deleted).await
    }

    /// Adds one flag.
    ///
    /// # Errors
    ///
    /// As for [`mark_as_read`](Self::mark_as_read).
    pub async fn set_flag(&self, id: u32, flag: Flag) -> Result<()> {
        let seq = SeqNum::new(id).ok_or(Error::InvalidMessage(id))?;
        self.session
            .store(seq.into(), StoreAction::Add(vec![flag]))
            .await?;
        Ok(())
    }

    /// Removes one flag.
    ///
    /// # Errors
    ///
    /// As for [`mark_as_read`](Self::mark_as_read).
    pub async fn clear_flag(&self, id: u32, flag: Flag) -> Result<()> {
        let seq = SeqNum::new(id).ok_or(Error::InvalidMessage(id))?;
        self.session
            .store(seq.into(), StoreAction::Remove(vec![flag]))
            .await?;
        Ok(())
    }

    /// Expunges deleted messages and closes the mailbox.
    ///
    /// Afterwards the session is only authenticated; the release on
    /// [`close`](Self::close) then has nothing left to expunge.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn expunge_and_close(&self) -> Result<()> {
        let expunged = self.session.expunge().await?;
        debug!(count = expunged.len(), "expunged");
        self.session.close().await?;
        Ok(())
    }

    /// Releases the mailbox and logs out.
    ///
    /// While a mailbox is selected the session expunges and closes it
    /// first (unless the account disabled `expunge_on_close`).
    pub async fn close(self) {
        if self.session.state() == SessionState::Disconnected {
            warn!("closing a client whose session is already disconnected");
        }
        self.session.disconnect().await;
        info!(host = %self.config.host, "disconnected");
    }
}

/// Fetches `BODY[part]` of one message.
struct BodySections<'a> {
    session: &'a Session,
    seq: SeqNum,
}

impl<'a> BodySections<'a> {
    const fn new(session: &'a Session, seq: SeqNum) -> Self {
        Self { session, seq }
    }
}

impl PartSource for BodySections<'_> {
    type Error = Error;

    async fn fetch_part(&self, part: &PartNumber) -> Result<Vec<u8>> {
        let section = part.to_string();
        let messages = self
            .session
            .fetch(
                SequenceSet::from(self.seq),
                vec![FetchAttribute::Body {
                    section: Some(section.clone()),
                    peek: false,
                }],
            )
            .await?;
        Ok(messages
            .into_iter()
            .filter(|m| m.seq == self.seq)
            .flat_map(|m| m.items)
            .find_map(|item| match item {
                FetchItem::Body {
                    section: Some(s),
                    data,
                    ..
                } if s == section => Some(data.unwrap_or_default()),
                _ => None,
            })
            .unwrap_or_default())
    }
}
