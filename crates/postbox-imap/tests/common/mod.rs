//! In-memory scripted IMAP server for session tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

/// What the server does with one command.
pub enum Reply {
    /// Write these bytes. `{tag}` is replaced with the command's tag.
    Send(String),
    /// Say nothing.
    Silent,
    /// Write these bytes, then hang up.
    SendAndClose(String),
}

/// Shared record of every command the server received, tag stripped.
pub type Log = Arc<Mutex<Vec<String>>>;

pub struct FakeServer {
    pub log: Log,
    pub handle: JoinHandle<()>,
}

impl FakeServer {
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| c.as_str() == command).count()
    }

    /// Waits for the server to see the client hang up.
    pub async fn finished(self) -> Vec<String> {
        self.handle.await.unwrap();
        self.log.lock().unwrap().clone()
    }
}

/// Starts a server that writes `greeting` and answers each command with
/// `handler(command)`. Returns the client end of the pipe.
pub fn start<F>(greeting: &str, mut handler: F) -> (DuplexStream, FakeServer)
where
    F: FnMut(&str) -> Reply + Send + 'static,
{
    let (client, server) = tokio::io::duplex(64 * 1024);
    let log: Log = Arc::default();
    let greeting = greeting.to_string();
    let server_log = Arc::clone(&log);

    let handle = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut read = BufReader::new(read);
        if write.write_all(greeting.as_bytes()).await.is_err() {
            return;
        }

        while let Some(line) = read_command(&mut read, &mut write).await {
            let (tag, command) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            server_log.lock().unwrap().push(command.to_string());
            match handler(command) {
                Reply::Send(out) => {
                    let out = out.replace("{tag}", tag);
                    if write.write_all(out.as_bytes()).await.is_err() {
                        break;
                    }
                }
                Reply::Silent => {}
                Reply::SendAndClose(out) => {
                    let _ = write.write_all(out.replace("{tag}", tag).as_bytes()).await;
                    break;
                }
            }
        }
    });

    (client, FakeServer { log, handle })
}

/// Reads one command, answering synchronizing literals with `+`. Literal
/// payloads stay inline in the returned text.
async fn read_command<R, W>(read: &mut BufReader<R>, write: &mut W) -> Option<String>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut command = Vec::new();
    loop {
        let mut line = Vec::new();
        if read.read_until(b'\n', &mut line).await.ok()? == 0 {
            return None;
        }
        command.extend_from_slice(&line);
        let Some((len, sync)) = literal(&line) else {
            break;
        };
        if sync {
            write.write_all(b"+ Ready for literal data\r\n").await.ok()?;
        }
        let mut payload = vec![0; len];
        read.read_exact(&mut payload).await.ok()?;
        command.extend_from_slice(&payload);
    }
    let text = String::from_utf8_lossy(&command);
    Some(text.trim_end_matches("\r\n").to_string())
}

fn literal(line: &[u8]) -> Option<(usize, bool)> {
    let text = std::str::from_utf8(line).ok()?.strip_suffix("}\r\n")?;
    let open = text.rfind('{')?;
    let digits = &text[open + 1..];
    match digits.strip_suffix('+') {
        Some(n) => Some((n.parse().ok()?, false)),
        None => Some((digits.parse().ok()?, true)),
    }
}

/// Handler for the commands every test needs.
pub fn standard(command: &str) -> Reply {
    let upper = command.to_ascii_uppercase();
    if upper.starts_with("LOGIN") {
        Reply::Send("{tag} OK LOGIN completed\r\n".into())
    } else if upper.starts_with("SELECT") {
        Reply::Send(
            "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)\r\n\
             * 3 EXISTS\r\n\
             * 0 RECENT\r\n\
             * OK [UIDVALIDITY 42] UIDs valid\r\n\
             {tag} OK [READ-WRITE] SELECT completed\r\n"
                .into(),
        )
    } else if upper == "CAPABILITY" {
        Reply::Send("* CAPABILITY IMAP4rev1\r\n{tag} OK CAPABILITY completed\r\n".into())
    } else if upper == "LOGOUT" {
        Reply::Send("* BYE logging out\r\n{tag} OK LOGOUT completed\r\n".into())
    } else {
        Reply::Send(format!("{{tag}} OK {} completed\r\n", first_word(&upper)))
    }
}

fn first_word(command: &str) -> &str {
    command.split(' ').next().unwrap_or(command)
}

pub const GREETING: &str = "* OK [CAPABILITY IMAP4rev1] test server ready\r\n";
