//! Transport configuration.

use std::time::Duration;

/// How the transport is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plaintext TCP. Credentials travel in the clear.
    None,
    /// Plaintext TCP upgraded with STARTTLS before login.
    StartTls,
    /// TLS from the first byte.
    #[default]
    Implicit,
}

impl Security {
    /// Well-known port for this mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None | Self::StartTls => 143,
            Self::Implicit => 993,
        }
    }
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host name, also used for SNI and certificate checks.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Accept any server certificate. Off unless explicitly enabled.
    pub skip_cert_validation: bool,
    /// Deadline for TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
}

impl Config {
    /// Implicit TLS on port 993 with certificate validation.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self::builder(host).build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    skip_cert_validation: bool,
    connect_timeout: Duration,
}

impl ConfigBuilder {
    fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            skip_cert_validation: false,
            connect_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the port. Defaults to the security mode's well-known port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Disables certificate validation. For test servers with self-signed
    /// certificates only.
    #[must_use]
    pub const fn skip_cert_validation(mut self, skip: bool) -> Self {
        self.skip_cert_validation = skip;
        self
    }

    /// Sets the connect deadline.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            skip_cert_validation: self.skip_cert_validation,
            connect_timeout: self.connect_timeout,
        }
    }
}
