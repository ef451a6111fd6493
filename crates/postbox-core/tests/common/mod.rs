//! A scripted IMAP server on a loopback socket, holding one mailbox.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use postbox_core::{AccountConfig, Security};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const PASSWORD: &str = "secret";

/// One message as the server stores it.
#[derive(Clone)]
pub struct Message {
    pub flags: Vec<String>,
    pub internal_date: String,
    pub envelope: String,
    pub structure: String,
    /// `(section, raw bytes)` pairs served for `BODY[section]`.
    pub sections: Vec<(String, Vec<u8>)>,
}

impl Message {
    pub fn new(from: (&str, &str, &str), subject: &str, structure: &str) -> Self {
        Self {
            flags: Vec::new(),
            internal_date: "01-Jul-2025 09:30:05 +0200".into(),
            envelope: envelope(from, subject),
            structure: structure.into(),
            sections: Vec::new(),
        }
    }

    pub fn section(mut self, section: &str, data: &str) -> Self {
        self.sections.push((section.into(), data.as_bytes().to_vec()));
        self
    }

    pub fn flagged(mut self, flag: &str) -> Self {
        self.flags.push(flag.into());
        self
    }

    fn flag_list(&self) -> String {
        format!("({})", self.flags.join(" "))
    }
}

/// ENVELOPE with `from = (name, mailbox, host)`; an empty name is NIL.
pub fn envelope(from: (&str, &str, &str), subject: &str) -> String {
    let (name, mailbox, host) = from;
    let name = if name.is_empty() {
        "NIL".to_string()
    } else {
        format!("\"{name}\"")
    };
    let sender = format!("(({name} NIL \"{mailbox}\" \"{host}\"))");
    format!(
        "(\"Tue, 1 Jul 2025 09:30:05 +0200\" \"{subject}\" {sender} {sender} \
         ((\"Help Desk\" NIL \"help\" \"example.org\")) \
         ((NIL NIL \"ada\" \"example.com\")(NIL NIL \"bob\" \"example.com\")) \
         NIL NIL NIL \"<m@example.com>\")"
    )
}

pub const PLAIN_ONLY: &str =
    "(\"TEXT\" \"PLAIN\" (\"CHARSET\" \"utf-8\") NIL NIL \"7BIT\" 12 1 NIL NIL NIL)";

pub const ALTERNATIVE: &str = "((\"TEXT\" \"PLAIN\" (\"CHARSET\" \"utf-8\") NIL NIL \"7BIT\" 5 1 NIL NIL NIL)\
     (\"TEXT\" \"HTML\" (\"CHARSET\" \"utf-8\") NIL NIL \"QUOTED-PRINTABLE\" 20 1 NIL NIL NIL) \
     \"ALTERNATIVE\" (\"BOUNDARY\" \"alt\") NIL NIL)";

pub const BASE64_HTML: &str = "((\"TEXT\" \"PLAIN\" (\"CHARSET\" \"utf-8\") NIL NIL \"7BIT\" 5 1 NIL NIL NIL)\
     (\"TEXT\" \"HTML\" (\"CHARSET\" \"utf-8\") NIL NIL \"BASE64\" 12 1 NIL NIL NIL) \
     \"ALTERNATIVE\" (\"BOUNDARY\" \"alt\") NIL NIL)";

pub const WITH_ATTACHMENTS: &str = "((\"TEXT\" \"PLAIN\" (\"CHARSET\" \"utf-8\") NIL NIL \"7BIT\" 5 1 NIL NIL NIL)\
     (\"APPLICATION\" \"PDF\" (\"NAME\" \"ignored.pdf\") NIL NIL \"BASE64\" 12 NIL \
     (\"ATTACHMENT\" (\"FILENAME\" \"report.pdf\")) NIL NIL)\
     (\"TEXT\" \"CSV\" (\"NAME\" \"../data.csv\") NIL NIL \"QUOTED-PRINTABLE\" 9 1 NIL NIL NIL NIL) \
     \"MIXED\" (\"BOUNDARY\" \"mix\") NIL NIL)";

/// Shared record of every command the server received, tag stripped.
pub type Log = Arc<Mutex<Vec<String>>>;

pub struct FakeServer {
    pub log: Log,
    pub messages: Arc<Mutex<Vec<Message>>>,
    pub handle: JoinHandle<()>,
}

impl FakeServer {
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| c.as_str() == command).count()
    }

    /// Waits until the client hangs up and returns the command log.
    pub async fn finished(self) -> Vec<String> {
        self.handle.await.unwrap();
        self.log.lock().unwrap().clone()
    }
}

/// Serves `messages` as INBOX to exactly one client. Returns an account
/// that points at it.
pub async fn serve(messages: Vec<Message>) -> (AccountConfig, FakeServer) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let log: Log = Arc::default();
    let store = Arc::new(Mutex::new(messages));

    let server_log = Arc::clone(&log);
    let server_store = Arc::clone(&store);
    let handle = tokio::spawn(async move {
        let Ok((socket, _)) = listener.accept().await else {
            return;
        };
        let (read, mut write) = socket.into_split();
        let mut read = BufReader::new(read);
        if write
            .write_all(b"* OK [CAPABILITY IMAP4rev1 LITERAL+] fake ready\r\n")
            .await
            .is_err()
        {
            return;
        }
        while let Some(line) = read_command(&mut read, &mut write).await {
            let (tag, command) = line.split_once(' ').unwrap_or((line.as_str(), ""));
            server_log.lock().unwrap().push(command.to_string());
            let (reply, hang_up) = {
                let mut messages = server_store.lock().unwrap();
                answer(command, &mut messages)
            };
            let reply = reply.replace("{tag}", tag);
            if write.write_all(reply.as_bytes()).await.is_err() || hang_up {
                break;
            }
        }
    });

    let mut config = AccountConfig::new("127.0.0.1", "ada");
    config.port = Some(port);
    config.security = Security::None;
    config.connect_timeout_secs = 5;
    config.command_timeout_secs = 5;
    (
        config,
        FakeServer {
            log,
            messages: store,
            handle,
        },
    )
}

/// Produces the response to one command and whether to hang up after it.
fn answer(command: &str, messages: &mut Vec<Message>) -> (String, bool) {
    let mut words = command.splitn(3, ' ');
    let verb = words.next().unwrap_or_default().to_ascii_uppercase();
    let first = words.next().unwrap_or_default();
    let rest = words.next().unwrap_or_default();

    let reply = match verb.as_str() {
        "LOGIN" => {
            if command == format!("LOGIN ada {PASSWORD}") {
                "{tag} OK LOGIN completed\r\n".to_string()
            } else {
                "{tag} NO [AUTHENTICATIONFAILED] invalid credentials\r\n".to_string()
            }
        }
        "SELECT" if first == "INBOX" => format!(
            "* FLAGS (\\Seen \\Deleted \\Flagged)\r\n* {} EXISTS\r\n* 0 RECENT\r\n\
             * OK [UIDVALIDITY 7] ok\r\n{{tag}} OK [READ-WRITE] SELECT completed\r\n",
            messages.len()
        ),
        "SELECT" => "{tag} NO [NONEXISTENT] no such mailbox\r\n".to_string(),
        "STATUS" => format!(
            "* STATUS INBOX (MESSAGES {})\r\n{{tag}} OK STATUS completed\r\n",
            messages.len()
        ),
        "SEARCH" => {
            let unseen: String = messages
                .iter()
                .enumerate()
                .filter(|(_, m)| !m.flags.iter().any(|f| f == "\\Seen"))
                .map(|(i, _)| format!(" {}", i + 1))
                .collect();
            format!("* SEARCH{unseen}\r\n{{tag}} OK SEARCH completed\r\n")
        }
        "FETCH" => fetch(first, rest, messages),
        "STORE" => store(first, rest, messages),
        "EXPUNGE" => {
            let mut out = String::new();
            for n in (1..=messages.len()).rev() {
                if messages[n - 1].flags.iter().any(|f| f == "\\Deleted") {
                    messages.remove(n - 1);
                    out.push_str(&format!("* {n} EXPUNGE\r\n"));
                }
            }
            out + "{tag} OK EXPUNGE completed\r\n"
        }
        "LOGOUT" => {
            return ("* BYE bye\r\n{tag} OK LOGOUT completed\r\n".to_string(), true);
        }
        "CAPABILITY" => {
            "* CAPABILITY IMAP4rev1 LITERAL+\r\n{tag} OK CAPABILITY completed\r\n".to_string()
        }
        other => format!("{{tag}} OK {other} completed\r\n"),
    };
    (reply, false)
}

fn message_index(id: &str, messages: &[Message]) -> Option<usize> {
    let n: usize = id.parse().ok()?;
    (1..=messages.len()).contains(&n).then(|| n - 1)
}

fn fetch(id: &str, items: &str, messages: &mut [Message]) -> String {
    let Some(index) = message_index(id, messages) else {
        return "{tag} BAD invalid message sequence number\r\n".to_string();
    };
    let message = &mut messages[index];
    let data = match items {
        "(FLAGS INTERNALDATE ENVELOPE)" => format!(
            "FLAGS {} INTERNALDATE \"{}\" ENVELOPE {}",
            message.flag_list(),
            message.internal_date,
            message.envelope
        ),
        "(UID FLAGS INTERNALDATE)" => format!(
            "UID {} FLAGS {} INTERNALDATE \"{}\"",
            100 + index,
            message.flag_list(),
            message.internal_date
        ),
        "BODYSTRUCTURE" => format!("BODYSTRUCTURE {}", message.structure),
        section if section.starts_with("BODY[") => {
            let name = section.trim_start_matches("BODY[").trim_end_matches(']');
            let raw = message
                .sections
                .iter()
                .find(|(s, _)| s == name)
                .map(|(_, raw)| raw.clone())
                .unwrap_or_default();
            if !message.flags.iter().any(|f| f == "\\Seen") {
                message.flags.push("\\Seen".into());
            }
            format!(
                "BODY[{name}] {{{}}}\r\n{}",
                raw.len(),
                String::from_utf8_lossy(&raw)
            )
        }
        _ => return "{tag} BAD unsupported fetch\r\n".to_string(),
    };
    format!("* {id} FETCH ({data})\r\n{{tag}} OK FETCH completed\r\n")
}

fn store(id: &str, rest: &str, messages: &mut [Message]) -> String {
    let Some(index) = message_index(id, messages) else {
        return "{tag} BAD invalid message sequence number\r\n".to_string();
    };
    let Some((action, flags)) = rest.split_once(' ') else {
        return "{tag} BAD missing flags\r\n".to_string();
    };
    let flags: Vec<String> = flags
        .trim_matches(|c| c == '(' || c == ')')
        .split(' ')
        .filter(|f| !f.is_empty())
        .map(ToString::to_string)
        .collect();
    let message = &mut messages[index];
    match action {
        "+FLAGS" => {
            for flag in flags {
                if !message.flags.contains(&flag) {
                    message.flags.push(flag);
                }
            }
        }
        "-FLAGS" => message.flags.retain(|f| !flags.contains(f)),
        _ => message.flags = flags,
    }
    format!(
        "* {id} FETCH (FLAGS {})\r\n{{tag}} OK STORE completed\r\n",
        message.flag_list()
    )
}

/// Reads one command, answering synchronizing literals with `+`.
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
