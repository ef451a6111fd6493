//! Session state machine.
//!
//! A [`Session`] is a cheap handle to a worker task that exclusively owns
//! the transport. Handles send commands over a channel; the worker writes
//! them one at a time, matches the tagged completion and replies on a
//! oneshot. State changes are published on a watch channel, so
//! [`Session::state`] never waits on the wire.
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Authenticated <-> Selected
//!                      |               |               |              |
//!                      +---------------+-------+-------+--------------+
//!                                              v
//!                                        Disconnected (terminal)
//! ```
//!
//! Dropping the last handle, or calling [`Session::disconnect`], runs the
//! release sequence once: EXPUNGE and CLOSE if a mailbox is selected, then
//! LOGOUT, then the transport is shut down.

mod dispatcher;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Semaphore, mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::command::{Command, FetchAttribute, SearchCriteria, StatusAttribute, StoreAction};
use crate::connection::{self, Config, FramedStream, Security};
use crate::parser::{FetchItem, StatusItem, UntaggedResponse};
use crate::types::{Capabilities, Mailbox, MailboxStatus, ResponseCode, SeqNum, SequenceSet};
use crate::{Error, Result};

pub use dispatcher::{Completion, Dispatcher};
use worker::{Message, Request, Worker};

/// What happens when a command arrives while another is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Wait in line.
    #[default]
    Fifo,
    /// Fail at once with [`Error::SessionBusy`].
    Reject,
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport. Terminal once reached after a connect.
    Disconnected,
    /// Transport opening, greeting not yet read.
    Connecting,
    /// Greeting read, LOGIN required.
    Authenticating,
    /// Logged in, no mailbox selected.
    Authenticated,
    /// A mailbox is selected.
    Selected,
}

/// Session tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for each command's tagged completion.
    pub command_timeout: Duration,
    /// Behaviour for concurrent callers.
    pub queue_policy: QueuePolicy,
    /// Commands that may wait in the FIFO queue.
    pub queue_capacity: usize,
    /// Run EXPUNGE and CLOSE on release when a mailbox is selected.
    pub expunge_on_release: bool,
    /// Deadline for LOGOUT during release.
    pub logout_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(60),
            queue_policy: QueuePolicy::Fifo,
            queue_capacity: 32,
            expunge_on_release: true,
            logout_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    /// Default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-command deadline.
    #[must_use]
    pub const fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the queue policy.
    #[must_use]
    pub const fn queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue_policy = policy;
        self
    }

    /// Sets the FIFO queue capacity (at least one).
    #[must_use]
    pub const fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }

    /// Enables or disables EXPUNGE + CLOSE on release.
    #[must_use]
    pub const fn expunge_on_release(mut self, enabled: bool) -> Self {
        self.expunge_on_release = enabled;
        self
    }

    /// Sets the LOGOUT deadline used on release.
    #[must_use]
    pub const fn logout_timeout(mut self, timeout: Duration) -> Self {
        self.logout_timeout = timeout;
        self
    }
}

/// Snapshot of the session as last seen by the worker.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Lifecycle state.
    pub state: SessionState,
    /// Capabilities last advertised.
    pub capabilities: Capabilities,
    /// Selected mailbox.
    pub mailbox: Option<Mailbox>,
    /// Selected mailbox counters, kept fresh by unsolicited responses.
    pub status: Option<MailboxStatus>,
    /// When `status.exists` was last confirmed by the server.
    pub status_updated: Option<Instant>,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            state: SessionState::Connecting,
            capabilities: Capabilities::default(),
            mailbox: None,
            status: None,
            status_updated: None,
        }
    }
}

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Untagged data received while the command was in flight.
    pub untagged: Vec<UntaggedResponse>,
    /// Bracketed code of the tagged OK.
    pub code: Option<ResponseCode>,
    /// Text of the tagged OK.
    pub text: String,
}

/// FETCH data for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMessage {
    /// Sequence number.
    pub seq: SeqNum,
    /// Data items in server order.
    pub items: Vec<FetchItem>,
}

/// Handle to a running session.
///
/// Clones share the same worker. The worker releases the session when the
/// last clone is dropped.
#[derive(Debug, Clone)]
pub struct Session {
    sender: mpsc::Sender<Message>,
    info: watch::Receiver<SessionInfo>,
    gate: Option<Arc<Semaphore>>,
}

impl Session {
    /// Opens the transport, reads the greeting and negotiates STARTTLS when
    /// configured.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] for socket, TLS or greeting failures (including
    /// a BYE greeting).
    pub async fn connect(config: &Config, session_config: SessionConfig) -> Result<Self> {
        tracing::info!(
            host = %config.host,
            port = config.port,
            security = ?config.security,
            "connecting"
        );
        let stream = connection::connect(config).await?;
        let mut worker = Worker::new(FramedStream::new(stream), session_config.clone());
        worker.greet().await?;
        if config.security == Security::StartTls {
            worker
                .start_tls(&config.host, config.skip_cert_validation)
                .await?;
        }
        worker.ensure_capabilities().await?;
        Ok(Self::spawn(worker, &session_config))
    }

    /// Runs a session over an already connected stream.
    ///
    /// # Errors
    ///
    /// As for [`connect`](Self::connect), minus the transport setup.
    pub async fn from_stream<S>(stream: S, session_config: SessionConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut worker = Worker::new(FramedStream::new(stream), session_config.clone());
        worker.greet().await?;
        worker.ensure_capabilities().await?;
        Ok(Self::spawn(worker, &session_config))
    }

    fn spawn<S>(worker: Worker<S>, config: &SessionConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let info = worker.subscribe();
        tokio::spawn(worker.serve(receiver));
        let gate = match config.queue_policy {
            QueuePolicy::Fifo => None,
            QueuePolicy::Reject => Some(Arc::new(Semaphore::new(1))),
        };
        Self { sender, info, gate }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.info.borrow().state
    }

    /// Copy of the current session snapshot.
    #[must_use]
    pub fn info(&self) -> SessionInfo {
        self.info.borrow().clone()
    }

    /// Sends a command and waits for its completion.
    ///
    /// # Errors
    ///
    /// [`Error::SessionBusy`] under [`QueuePolicy::Reject`] while another
    /// command is queued or in flight, [`Error::Connection`] on a
    /// disconnected session, otherwise whatever the command produced.
    pub async fn execute(&self, command: Command) -> Result<CommandOutput> {
        if self.state() == SessionState::Disconnected {
            return Err(Error::not_connected());
        }
        let permit = match &self.gate {
            Some(gate) => Some(
                Arc::clone(gate)
                    .try_acquire_owned()
                    .map_err(|_| Error::SessionBusy)?,
            ),
            None => None,
        };

        let (reply, response) = oneshot::channel();
        let request = Request {
            command,
            reply,
            permit,
        };
        self.sender
            .send(Message::Command(request))
            .await
            .map_err(|_| Error::not_connected())?;
        response.await.map_err(|_| Error::not_connected())?
    }

    /// Logs in.
    ///
    /// # Errors
    ///
    /// [`Error::Authentication`] if the server refuses; the session is then
    /// disconnected.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<()> {
        self.execute(Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Selects a mailbox and returns its counters.
    ///
    /// # Errors
    ///
    /// [`Error::MailboxNotFound`] if the server answers NO.
    pub async fn select(&self, mailbox: impl Into<Mailbox>) -> Result<MailboxStatus> {
        self.execute(Command::Select {
            mailbox: mailbox.into(),
        })
        .await?;
        Ok(self.info.borrow().status.clone().unwrap_or_default())
    }

    /// Queries mailbox counters without selecting it.
    ///
    /// # Errors
    ///
    /// [`Error::MailboxNotFound`] if the server answers NO.
    pub async fn status(
        &self,
        mailbox: impl Into<Mailbox>,
        items: Vec<StatusAttribute>,
    ) -> Result<Vec<StatusItem>> {
        let output = self
            .execute(Command::Status {
                mailbox: mailbox.into(),
                items,
            })
            .await?;
        Ok(output
            .untagged
            .into_iter()
            .find_map(|data| match data {
                UntaggedResponse::Status { items, .. } => Some(items),
                _ => None,
            })
            .unwrap_or_default())
    }

    /// Searches the selected mailbox.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn search(&self, criteria: SearchCriteria) -> Result<Vec<SeqNum>> {
        let output = self.execute(Command::Search { criteria }).await?;
        Ok(output
            .untagged
            .into_iter()
            .filter_map(|data| match data {
                UntaggedResponse::Search(ids) => Some(ids),
                _ => None,
            })
            .flatten()
            .collect())
    }

    /// Fetches data items.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn fetch(
        &self,
        sequence: SequenceSet,
        items: Vec<FetchAttribute>,
    ) -> Result<Vec<FetchedMessage>> {
        let output = self.execute(Command::Fetch { sequence, items }).await?;
        Ok(fetched(output.untagged))
    }

    /// Changes flags and returns the updated flag data the server echoed.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn store(
        &self,
        sequence: SequenceSet,
        action: StoreAction,
    ) -> Result<Vec<FetchedMessage>> {
        let output = self
            .execute(Command::Store {
                sequence,
                action,
                silent: false,
            })
            .await?;
        Ok(fetched(output.untagged))
    }

    /// Permanently removes `\Deleted` messages, returning the expunged
    /// sequence numbers in server order.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn expunge(&self) -> Result<Vec<SeqNum>> {
        let output = self.execute(Command::Expunge).await?;
        Ok(output
            .untagged
            .into_iter()
            .filter_map(|data| match data {
                UntaggedResponse::Expunge(seq) => Some(seq),
                _ => None,
            })
            .collect())
    }

    /// Closes the selected mailbox.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn close(&self) -> Result<()> {
        self.execute(Command::Close).await.map(drop)
    }

    /// Sends NOOP, which also collects pending unsolicited updates.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn noop(&self) -> Result<()> {
        self.execute(Command::Noop).await.map(drop)
    }

    /// Asks the server for its capabilities.
    ///
    /// # Errors
    ///
    /// Command failures.
    pub async fn capability(&self) -> Result<Capabilities> {
        self.execute(Command::Capability).await?;
        Ok(self.info.borrow().capabilities.clone())
    }

    /// Releases the session and waits until the transport is closed.
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn disconnect(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(Message::Disconnect(ack)).await.is_ok() {
            let _ = done.await;
        }
    }
}

fn fetched(untagged: Vec<UntaggedResponse>) -> Vec<FetchedMessage> {
    untagged
        .into_iter()
        .filter_map(|data| match data {
            UntaggedResponse::Fetch { seq, items } => Some(FetchedMessage { seq, items }),
            _ => None,
        })
        .collect()
}
