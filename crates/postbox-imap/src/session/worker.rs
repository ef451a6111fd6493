//! The task that owns the transport.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{OwnedSemaphorePermit, mpsc, oneshot, watch};
use tokio::time::Instant;

use super::dispatcher::{Completion, Dispatcher};
use super::{CommandOutput, SessionConfig, SessionInfo, SessionState};
use crate::command::{Command, EncodedCommand, TagGenerator};
use crate::connection::{FramedStream, ImapStream};
use crate::error::CommandContext;
use crate::parser::{Response, StatusItem, UntaggedResponse};
use crate::types::{Capabilities, Capability, MailboxStatus, ResponseCode, Status, Tag};
use crate::{Error, Result};

pub(super) enum Message {
    Command(Request),
    Disconnect(oneshot::Sender<()>),
}

pub(super) struct Request {
    pub(super) command: Command,
    pub(super) reply: oneshot::Sender<Result<CommandOutput>>,
    pub(super) permit: Option<OwnedSemaphorePermit>,
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command(request) => write!(f, "Command({})", request.command.redacted()),
            Self::Disconnect(_) => f.write_str("Disconnect"),
        }
    }
}

pub(super) struct Worker<S> {
    framed: Option<FramedStream<S>>,
    config: SessionConfig,
    tags: TagGenerator,
    dispatcher: Dispatcher<Command>,
    info: SessionInfo,
    publisher: watch::Sender<SessionInfo>,
    bye: Option<String>,
}

impl<S> Worker<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(super) fn new(framed: FramedStream<S>, config: SessionConfig) -> Self {
        let info = SessionInfo::default();
        let (publisher, _) = watch::channel(info.clone());
        Self {
            framed: Some(framed),
            config,
            tags: TagGenerator::default(),
            dispatcher: Dispatcher::new(),
            info,
            publisher,
            bye: None,
        }
    }

    pub(super) fn subscribe(&self) -> watch::Receiver<SessionInfo> {
        self.publisher.subscribe()
    }

    /// Reads the server greeting.
    pub(super) async fn greet(&mut self) -> Result<()> {
        let deadline = self.config.command_timeout;
        let greeting = match tokio::time::timeout(deadline, self.read()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(self.poison(err).await),
            Err(_) => {
                self.close_transport().await;
                return Err(Error::Connection(format!(
                    "no greeting within {deadline:?}"
                )));
            }
        };

        let (state, code, text) = match greeting {
            Response::Untagged(UntaggedResponse::Ok { code, text }) => {
                (SessionState::Authenticating, code, text)
            }
            Response::Untagged(UntaggedResponse::PreAuth { code, text }) => {
                (SessionState::Authenticated, code, text)
            }
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                self.close_transport().await;
                return Err(Error::Connection(format!("server refused connection: {text}")));
            }
            other => {
                self.close_transport().await;
                return Err(Error::Connection(format!("unexpected greeting: {other:?}")));
            }
        };

        if let Some(ResponseCode::Capability(caps)) = code {
            self.info.capabilities = Capabilities::new(caps);
        }
        tracing::info!(state = ?state, greeting = %text, "server greeting received");
        self.set_state(state);
        Ok(())
    }

    /// Asks for capabilities if the greeting did not carry them.
    pub(super) async fn ensure_capabilities(&mut self) -> Result<()> {
        if self.info.capabilities.is_empty() {
            self.run(Command::Capability).await?;
        }
        Ok(())
    }

    pub(super) async fn serve(mut self, mut receiver: mpsc::Receiver<Message>) {
        loop {
            tokio::select! {
                message = receiver.recv() => match message {
                    Some(Message::Command(request)) => {
                        let Request { command, reply, permit } = request;
                        let result = self.run(command).await;
                        drop(permit);
                        let _ = reply.send(result);
                    }
                    Some(Message::Disconnect(ack)) => {
                        self.release().await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        self.release().await;
                        break;
                    }
                },
                response = read_idle(&mut self.framed) => match response {
                    Ok(response) => self.on_idle(response),
                    Err(err) => {
                        let err = self.poison(err).await;
                        tracing::warn!(error = %err, "connection lost while idle");
                    }
                },
            }
        }
        tracing::debug!("session worker stopped");
    }

    /// Runs one command under the configured deadline.
    pub(super) async fn run(&mut self, command: Command) -> Result<CommandOutput> {
        let deadline = self.config.command_timeout;
        self.run_with_deadline(command, deadline).await
    }

    async fn run_with_deadline(
        &mut self,
        command: Command,
        deadline: Duration,
    ) -> Result<CommandOutput> {
        if self.framed.is_none() {
            return Err(Error::not_connected());
        }

        let tag = self.tags.next_tag();
        let context = CommandContext::new(tag.clone(), command.redacted());
        let encoded = command.encode(&tag, self.info.capabilities.literal_plus());
        if self
            .dispatcher
            .register(tag.clone(), context.clone(), command)
            .is_err()
        {
            return Err(Error::Connection(format!("tag {tag} is already in flight")));
        }
        tracing::debug!(tag = %tag, command = %context.command, "sending command");

        match tokio::time::timeout(deadline, self.exchange(&tag, &encoded)).await {
            Ok(Ok(completion)) => self.finish(completion).await,
            Ok(Err(err)) => Err(self.poison(err).await.in_command(context)),
            Err(_) => {
                tracing::warn!(tag = %tag, after = ?deadline, "command timed out, closing session");
                self.poison(Error::Connection("command timed out".into()))
                    .await;
                Err(Error::Timeout {
                    after: deadline,
                    context,
                })
            }
        }
    }

    /// Writes every fragment, pausing for `+` between literals, and reads
    /// until the tagged completion.
    async fn exchange(&mut self, tag: &Tag, encoded: &EncodedCommand) -> Result<Completion<Command>> {
        let fragments = encoded.fragments();
        for (i, fragment) in fragments.iter().enumerate() {
            self.write(fragment).await?;
            if i + 1 == fragments.len() {
                break;
            }
            loop {
                match self.read().await? {
                    Response::Continuation { .. } => break,
                    response => {
                        if let Some(completion) = self.route(response) {
                            tracing::debug!(tag = %tag, "command completed before literal was sent");
                            return Ok(completion);
                        }
                    }
                }
            }
        }

        loop {
            let response = self.read().await?;
            if let Some(completion) = self.route(response) {
                return Ok(completion);
            }
        }
    }

    fn route(&mut self, response: Response) -> Option<Completion<Command>> {
        match response {
            Response::Tagged {
                tag,
                status,
                code,
                text,
            } => {
                let completion = self.dispatcher.on_tagged(&tag, status, code, text);
                if completion.is_none() {
                    tracing::warn!(tag = %tag, "completion for unknown tag ignored");
                }
                completion
            }
            Response::Untagged(data) => {
                self.observe(&data);
                if let Some(data) = self.dispatcher.on_untagged(data) {
                    tracing::debug!(?data, "untagged data with no command pending");
                }
                None
            }
            Response::Continuation { text } => {
                tracing::warn!(?text, "unexpected continuation request ignored");
                None
            }
        }
    }

    fn on_idle(&mut self, response: Response) {
        match response {
            Response::Untagged(data) => {
                self.observe(&data);
                self.publish();
            }
            other => tracing::warn!(?other, "unexpected response while idle"),
        }
    }

    /// Applies untagged data to the session snapshot.
    fn observe(&mut self, data: &UntaggedResponse) {
        let selected = self.info.state == SessionState::Selected;
        match data {
            UntaggedResponse::Capability(caps) => {
                self.info.capabilities = Capabilities::new(caps.clone());
            }
            UntaggedResponse::Exists(n) if selected => {
                if let Some(status) = self.info.status.as_mut() {
                    status.exists = *n;
                    self.info.status_updated = Some(Instant::now());
                }
            }
            UntaggedResponse::Expunge(_) if selected => {
                if let Some(status) = self.info.status.as_mut() {
                    status.exists = status.exists.saturating_sub(1);
                }
            }
            UntaggedResponse::Recent(n) if selected => {
                if let Some(status) = self.info.status.as_mut() {
                    status.recent = *n;
                }
            }
            UntaggedResponse::Flags(flags) if selected => {
                if let Some(status) = self.info.status.as_mut() {
                    status.flags = flags.clone();
                }
            }
            UntaggedResponse::Bye { text, .. } => {
                tracing::info!(reason = %text, "server sent BYE");
                self.bye = Some(text.clone());
            }
            UntaggedResponse::Ok {
                code: Some(ResponseCode::Alert),
                text,
            }
            | UntaggedResponse::No {
                code: Some(ResponseCode::Alert),
                text,
            } => {
                tracing::warn!(alert = %text, "server alert");
            }
            _ => {}
        }
    }

    async fn finish(&mut self, completion: Completion<Command>) -> Result<CommandOutput> {
        let Completion {
            reply: command,
            context,
            status,
            code,
            text,
            untagged,
        } = completion;

        if let Some(ResponseCode::Capability(caps)) = &code {
            self.info.capabilities = Capabilities::new(caps.clone());
        }

        if status == Status::Ok {
            tracing::debug!(command = %context.command, "command completed");
            self.on_success(&command, &untagged).await;
            self.publish();
            Ok(CommandOutput {
                untagged,
                code,
                text,
            })
        } else {
            let err = self.on_failure(command, status, &code, context).await;
            self.publish();
            Err(err)
        }
    }

    async fn on_success(&mut self, command: &Command, untagged: &[UntaggedResponse]) {
        match command {
            Command::Login { .. } => {
                tracing::info!("authenticated");
                self.set_state(SessionState::Authenticated);
            }
            Command::Select { mailbox } => {
                let status = mailbox_status(untagged);
                tracing::info!(mailbox = %mailbox, exists = status.exists, "mailbox selected");
                self.info.mailbox = Some(mailbox.clone());
                self.info.status = Some(status);
                self.info.status_updated = Some(Instant::now());
                self.set_state(SessionState::Selected);
            }
            Command::Status { mailbox, .. } if self.info.mailbox.as_ref() == Some(mailbox) => {
                let messages = untagged.iter().find_map(|data| match data {
                    UntaggedResponse::Status { items, .. } => {
                        items.iter().find_map(|item| match item {
                            StatusItem::Messages(n) => Some(*n),
                            _ => None,
                        })
                    }
                    _ => None,
                });
                if let (Some(n), Some(status)) = (messages, self.info.status.as_mut()) {
                    status.exists = n;
                    self.info.status_updated = Some(Instant::now());
                }
            }
            Command::Close => {
                self.info.mailbox = None;
                self.info.status = None;
                self.info.status_updated = None;
                self.set_state(SessionState::Authenticated);
            }
            Command::Logout => self.close_transport().await,
            _ => {}
        }
    }

    async fn on_failure(
        &mut self,
        command: Command,
        status: Status,
        code: &Option<ResponseCode>,
        context: CommandContext,
    ) -> Error {
        let was_select = matches!(command, Command::Select { .. });
        match command {
            Command::Login { .. } => {
                tracing::warn!(status = status.as_str(), "login rejected, closing session");
                self.close_transport().await;
                Error::Authentication { context }
            }
            Command::Select { mailbox } | Command::Status { mailbox, .. }
                if status == Status::No
                    || code.as_ref().is_some_and(ResponseCode::is_missing_mailbox) =>
            {
                if was_select && self.info.state == SessionState::Selected {
                    self.info.mailbox = None;
                    self.info.status = None;
                    self.set_state(SessionState::Authenticated);
                }
                Error::MailboxNotFound {
                    mailbox: mailbox.to_string(),
                    context,
                }
            }
            _ if status == Status::No => Error::No { context },
            _ => Error::Bad { context },
        }
    }

    /// EXPUNGE and CLOSE if a mailbox is selected, then LOGOUT, then shut
    /// the transport. No-op once disconnected.
    async fn release(&mut self) {
        if self.framed.is_none() {
            return;
        }
        tracing::debug!(state = ?self.info.state, "releasing session");

        if self.info.state == SessionState::Selected && self.config.expunge_on_release {
            for command in [Command::Expunge, Command::Close] {
                if let Err(err) = self.run(command).await {
                    tracing::warn!(error = %err, "release step failed");
                    break;
                }
            }
        }

        if self.framed.is_some() {
            let deadline = self.config.logout_timeout;
            if let Err(err) = self.run_with_deadline(Command::Logout, deadline).await {
                tracing::warn!(error = %err, "logout failed");
            }
        }
        self.close_transport().await;
    }

    /// Fails everything in flight, drops the transport and maps a lost
    /// connection after BYE to [`Error::Bye`].
    async fn poison(&mut self, err: Error) -> Error {
        for (context, _) in self.dispatcher.drain() {
            tracing::debug!(command = %context, "abandoning command");
        }
        let err = match (err, self.bye.take()) {
            (Error::Connection(_) | Error::Io(_), Some(text)) => Error::Bye(text),
            (err, _) => err,
        };
        if self.framed.is_some() {
            tracing::warn!(error = %err, "session poisoned, closing transport");
        }
        self.close_transport().await;
        err
    }

    async fn close_transport(&mut self) {
        if let Some(mut framed) = self.framed.take() {
            if let Err(err) = framed.shutdown().await {
                tracing::debug!(error = %err, "transport shutdown failed");
            }
        }
        self.info.mailbox = None;
        self.info.status = None;
        self.info.status_updated = None;
        if self.info.state != SessionState::Disconnected {
            tracing::info!("disconnected");
        }
        self.set_state(SessionState::Disconnected);
    }

    async fn read(&mut self) -> Result<Response> {
        match self.framed.as_mut() {
            Some(framed) => framed.read_response().await,
            None => Err(Error::not_connected()),
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        match self.framed.as_mut() {
            Some(framed) => framed.write_all(bytes).await,
            None => Err(Error::not_connected()),
        }
    }

    fn set_state(&mut self, state: SessionState) {
        self.info.state = state;
        self.publish();
    }

    fn publish(&self) {
        self.publisher.send_replace(self.info.clone());
    }
}

impl Worker<ImapStream> {
    /// Upgrades the transport with STARTTLS. Capabilities are re-read
    /// afterwards because pre-TLS ones cannot be trusted.
    pub(super) async fn start_tls(&mut self, host: &str, skip_cert_validation: bool) -> Result<()> {
        if !self.info.capabilities.is_empty()
            && !self.info.capabilities.has(&Capability::StartTls)
        {
            self.close_transport().await;
            return Err(Error::Connection(
                "server does not advertise STARTTLS".to_string(),
            ));
        }

        self.run(Command::StartTls).await?;
        let framed = self.framed.take().ok_or_else(Error::not_connected)?;
        if framed.has_buffered_input() {
            self.close_transport().await;
            return Err(Error::Connection(
                "unexpected data after STARTTLS response".to_string(),
            ));
        }
        match framed
            .into_inner()
            .upgrade_to_tls(host, skip_cert_validation)
            .await
        {
            Ok(stream) => self.framed = Some(FramedStream::new(stream)),
            Err(err) => {
                self.close_transport().await;
                return Err(err);
            }
        }
        tracing::info!("transport upgraded to TLS");

        self.info.capabilities = Capabilities::default();
        self.run(Command::Capability).await?;
        Ok(())
    }
}

async fn read_idle<S>(framed: &mut Option<FramedStream<S>>) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match framed.as_mut() {
        Some(framed) => framed.read_response().await,
        None => std::future::pending().await,
    }
}

/// Builds mailbox counters from the untagged data of a SELECT.
fn mailbox_status(untagged: &[UntaggedResponse]) -> MailboxStatus {
    let mut status = MailboxStatus::default();
    for data in untagged {
        match data {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Flags(flags) => status.flags = flags.clone(),
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
                ResponseCode::UidNext(uid) => status.uid_next = Some(*uid),
                ResponseCode::Unseen(seq) => status.unseen = Some(*seq),
                ResponseCode::PermanentFlags(flags) => {
                    status.permanent_flags = flags.iter().cloned().collect();
                }
                ResponseCode::ReadOnly => status.read_only = true,
                _ => {}
            },
            _ => {}
        }
    }
    status
}
