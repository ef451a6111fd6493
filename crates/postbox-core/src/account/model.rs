//! Account model types.

use std::time::Duration;

use postbox_imap::{QueuePolicy, SessionConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Security/encryption mode for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Security {
    /// No encryption (not recommended).
    None,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::Tls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }

    /// Get default port for the security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        self.transport().default_port()
    }

    const fn transport(self) -> postbox_imap::Security {
        match self {
            Self::None => postbox_imap::Security::None,
            Self::Tls => postbox_imap::Security::Implicit,
            Self::StartTls => postbox_imap::Security::StartTls,
        }
    }
}

/// How a second command is handled while one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Queueing {
    /// Wait in line.
    #[default]
    Fifo,
    /// Fail immediately with a busy error.
    Reject,
}

/// One mailbox on one IMAP account.
///
/// The password is deliberately absent: it is handed to
/// [`MailClient::authenticate`](crate::MailClient::authenticate) and never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Server hostname.
    pub host: String,
    /// Server port. Defaults to the port of the security mode.
    #[serde(default)]
    pub port: Option<u16>,
    /// Security mode.
    #[serde(default)]
    pub security: Security,
    /// Accept any server certificate. Only for test servers.
    #[serde(default)]
    pub skip_cert_validation: bool,
    /// Username for LOGIN.
    pub username: String,
    /// Mailbox selected after login.
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    /// TCP connect plus TLS handshake deadline, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Per-command deadline, in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// How long a message count stays fresh before `total()` asks again.
    #[serde(default = "default_status_max_age")]
    pub status_max_age_secs: u64,
    /// Queueing policy for concurrent callers.
    #[serde(default)]
    pub queueing: Queueing,
    /// Expunge deleted messages when the client is closed.
    #[serde(default = "default_true")]
    pub expunge_on_close: bool,
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

const fn default_connect_timeout() -> u64 {
    30
}

const fn default_command_timeout() -> u64 {
    60
}

const fn default_status_max_age() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

impl AccountConfig {
    /// Account on `host` for `username` with every other field defaulted.
    #[must_use]
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::default(),
            skip_cert_validation: false,
            username: username.into(),
            mailbox: default_mailbox(),
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_secs: default_command_timeout(),
            status_max_age_secs: default_status_max_age(),
            queueing: Queueing::default(),
            expunge_on_close: true,
        }
    }

    /// Parses an account from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serde`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Port to connect to.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.security.default_port())
    }

    /// Freshness window for the cached message count.
    #[must_use]
    pub const fn status_max_age(&self) -> Duration {
        Duration::from_secs(self.status_max_age_secs)
    }

    /// Transport settings for the IMAP engine.
    #[must_use]
    pub fn connection(&self) -> postbox_imap::Config {
        postbox_imap::Config::builder(&self.host)
            .port(self.port())
            .security(self.security.transport())
            .skip_cert_validation(self.skip_cert_validation)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .build()
    }

    /// Session settings for the IMAP engine.
    #[must_use]
    pub fn session(&self) -> SessionConfig {
        let policy = match self.queueing {
            Queueing::Fifo => QueuePolicy::Fifo,
            Queueing::Reject => QueuePolicy::Reject,
        };
        SessionConfig::new()
            .command_timeout(Duration::from_secs(self.command_timeout_secs))
            .queue_policy(policy)
            .expunge_on_release(self.expunge_on_close)
    }

    /// Checks the account and folds every problem into one error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing each invalid field.
    pub fn check(&self) -> Result<()> {
        super::validate_account(self).map_err(|errors| {
            let messages: Vec<&str> = errors.iter().map(|e| e.message()).collect();
            Error::Config(messages.join(", "))
        })
    }
}
