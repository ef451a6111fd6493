//! Server capabilities and completion status.

/// Status word of a tagged completion or status response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command completed.
    Ok,
    /// Command failed for operational reasons.
    No,
    /// Command was malformed or not allowed.
    Bad,
    /// Greeting: already authenticated.
    PreAuth,
    /// Server is closing the connection.
    Bye,
}

impl Status {
    /// Returns true for `OK` and `PREAUTH`.
    #[must_use]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::PreAuth)
    }

    /// Wire spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::No => "NO",
            Self::Bad => "BAD",
            Self::PreAuth => "PREAUTH",
            Self::Bye => "BYE",
        }
    }
}

/// A capability the server advertised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1` (RFC 3501)
    Imap4Rev1,
    /// `IMAP4rev2` (RFC 9051)
    Imap4Rev2,
    /// `STARTTLS`
    StartTls,
    /// `LOGINDISABLED`
    LoginDisabled,
    /// `LITERAL+` (RFC 7888)
    LiteralPlus,
    /// `LITERAL-` (RFC 7888)
    LiteralMinus,
    /// `IDLE` (RFC 2177)
    Idle,
    /// `AUTH=<mechanism>`
    Auth(String),
    /// Anything else.
    Unknown(String),
}

impl Capability {
    /// Parses one capability atom.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IMAP4REV2" => Self::Imap4Rev2,
            "STARTTLS" => Self::StartTls,
            "LOGINDISABLED" => Self::LoginDisabled,
            "LITERAL+" => Self::LiteralPlus,
            "LITERAL-" => Self::LiteralMinus,
            "IDLE" => Self::Idle,
            _ => upper.strip_prefix("AUTH=").map_or_else(
                || Self::Unknown(s.to_string()),
                |mech| Self::Auth(mech.to_string()),
            ),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Imap4Rev1 => f.write_str("IMAP4rev1"),
            Self::Imap4Rev2 => f.write_str("IMAP4rev2"),
            Self::StartTls => f.write_str("STARTTLS"),
            Self::LoginDisabled => f.write_str("LOGINDISABLED"),
            Self::LiteralPlus => f.write_str("LITERAL+"),
            Self::LiteralMinus => f.write_str("LITERAL-"),
            Self::Idle => f.write_str("IDLE"),
            Self::Auth(mech) => write!(f, "AUTH={mech}"),
            Self::Unknown(s) => f.write_str(s),
        }
    }
}

/// The capability set last reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities(Vec<Capability>);

impl Capabilities {
    /// Wraps a parsed capability list.
    #[must_use]
    pub fn new(caps: Vec<Capability>) -> Self {
        Self(caps)
    }

    /// Returns true if the capability was advertised.
    #[must_use]
    pub fn has(&self, cap: &Capability) -> bool {
        self.0.contains(cap)
    }

    /// Whether non-synchronizing literals may be sent.
    #[must_use]
    pub fn literal_plus(&self) -> bool {
        self.has(&Capability::LiteralPlus)
    }

    /// Returns true if nothing has been reported yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the advertised capabilities.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.0.iter()
    }
}
