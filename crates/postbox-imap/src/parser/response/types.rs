//! Data carried by parsed responses.

use crate::types::{Capability, Flags, Mailbox, ResponseCode, SeqNum, Uid, UidValidity};

/// One item of a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// `FLAGS (...)`
    Flags(Flags),
    /// `INTERNALDATE "..."`, unparsed.
    InternalDate(String),
    /// `RFC822.SIZE n`
    Rfc822Size(u32),
    /// `ENVELOPE (...)`
    Envelope(Box<Envelope>),
    /// `UID n`
    Uid(Uid),
    /// `BODY[section]<origin> data`
    Body {
        /// Section text between the brackets, `None` for the whole message.
        section: Option<String>,
        /// Partial fetch origin.
        origin: Option<u32>,
        /// Raw payload. `None` when the server sent NIL.
        data: Option<Vec<u8>>,
    },
    /// `BODYSTRUCTURE (...)`
    BodyStructure(BodyStructure),
}

/// ENVELOPE structure. Strings are still RFC 2047 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Envelope {
    /// `Date:` header.
    pub date: Option<String>,
    /// `Subject:` header.
    pub subject: Option<String>,
    /// `From:`
    pub from: Vec<Address>,
    /// `Sender:`
    pub sender: Vec<Address>,
    /// `Reply-To:`
    pub reply_to: Vec<Address>,
    /// `To:`
    pub to: Vec<Address>,
    /// `Cc:`
    pub cc: Vec<Address>,
    /// `Bcc:`
    pub bcc: Vec<Address>,
    /// `In-Reply-To:`
    pub in_reply_to: Option<String>,
    /// `Message-ID:`
    pub message_id: Option<String>,
}

/// Address as the server splits it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route, obsolete.
    pub adl: Option<String>,
    /// Local part.
    pub mailbox: Option<String>,
    /// Domain.
    pub host: Option<String>,
}

impl Address {
    /// `mailbox@host`, if both halves are present.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(m), Some(h)) => Some(format!("{m}@{h}")),
            _ => None,
        }
    }
}

/// BODYSTRUCTURE of a message or of one of its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyStructure {
    /// A non-multipart body.
    Single(SinglePart),
    /// A `multipart/*` body.
    Multipart(MultiPart),
}

/// Fields of a non-multipart body. Type and subtype are upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SinglePart {
    /// Top-level media type, e.g. `TEXT`.
    pub media_type: String,
    /// Subtype, e.g. `PLAIN`. Empty when the server sent NIL.
    pub subtype: String,
    /// Content-Type parameters in wire order.
    pub params: Vec<(String, String)>,
    /// `Content-ID`
    pub id: Option<String>,
    /// `Content-Description`
    pub description: Option<String>,
    /// `Content-Transfer-Encoding`
    pub encoding: String,
    /// Encoded size in octets.
    pub size: u32,
    /// Line count, present for `TEXT/*` and `MESSAGE/RFC822`.
    pub lines: Option<u32>,
    /// Envelope and structure of an encapsulated `MESSAGE/RFC822`.
    pub message: Option<Box<EmbeddedMessage>>,
    /// `Content-Disposition`, from the extension data.
    pub disposition: Option<Disposition>,
}

/// An encapsulated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedMessage {
    /// Its envelope.
    pub envelope: Envelope,
    /// Its structure.
    pub body: BodyStructure,
}

/// Fields of a `multipart/*` body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiPart {
    /// Children in order.
    pub parts: Vec<BodyStructure>,
    /// Subtype, upper-cased (`MIXED`, `ALTERNATIVE`, ...).
    pub subtype: String,
    /// Parameters such as the boundary.
    pub params: Vec<(String, String)>,
    /// `Content-Disposition`, rarely set on a multipart.
    pub disposition: Option<Disposition>,
}

/// `Content-Disposition` value and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// `attachment`, `inline`, ... as sent.
    pub kind: String,
    /// Parameters such as `filename`.
    pub params: Vec<(String, String)>,
}

/// One item of a STATUS response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusItem {
    /// `MESSAGES n`
    Messages(u32),
    /// `RECENT n`
    Recent(u32),
    /// `UIDNEXT n`
    UidNext(Uid),
    /// `UIDVALIDITY n`
    UidValidity(UidValidity),
    /// `UNSEEN n`
    Unseen(u32),
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`
    Ok {
        /// Bracketed code.
        code: Option<ResponseCode>,
        /// Human readable text.
        text: String,
    },
    /// `* NO`
    No {
        /// Bracketed code.
        code: Option<ResponseCode>,
        /// Human readable text.
        text: String,
    },
    /// `* BAD`
    Bad {
        /// Bracketed code.
        code: Option<ResponseCode>,
        /// Human readable text.
        text: String,
    },
    /// `* PREAUTH` (greeting only)
    PreAuth {
        /// Bracketed code.
        code: Option<ResponseCode>,
        /// Human readable text.
        text: String,
    },
    /// `* BYE`
    Bye {
        /// Bracketed code.
        code: Option<ResponseCode>,
        /// Human readable text.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<Capability>),
    /// `* FLAGS (...)`
    Flags(Flags),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(SeqNum),
    /// `* n FETCH (...)`
    Fetch {
        /// Message the data belongs to.
        seq: SeqNum,
        /// Items in server order.
        items: Vec<FetchItem>,
    },
    /// `* SEARCH ...`
    Search(Vec<SeqNum>),
    /// `* STATUS mailbox (...)`
    Status {
        /// Mailbox the counters belong to.
        mailbox: Mailbox,
        /// Counters.
        items: Vec<StatusItem>,
    },
    /// Any other keyword (`LIST`, `ENABLED`, `ID`, ...), ignored by the session.
    Other(String),
}
