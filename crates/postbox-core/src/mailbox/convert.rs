//! Shapes IMAP response data into core and MIME values.

use chrono::{DateTime, FixedOffset};
use postbox_imap::{Address, BodyStructure, Envelope, FetchItem, FetchedMessage, Flags, SinglePart};
use postbox_mime::encoding::decode_rfc2047;
use postbox_mime::{BodyPart, Disposition, Leaf, TransferEncoding};

use super::model::{MessageHeader, MessageSummary};

/// Sender mailboxes whose messages are never shown as headers.
const BOUNCE_SENDERS: [&str; 2] = ["mailer-daemon", "postmaster"];

/// Converts a wire BODYSTRUCTURE into the typed tree.
pub fn body_part(structure: &BodyStructure) -> BodyPart {
    match structure {
        BodyStructure::Single(part) => BodyPart::Leaf(leaf(part)),
        BodyStructure::Multipart(multi) => BodyPart::Multipart {
            subtype: multi.subtype.to_ascii_lowercase(),
            children: multi.parts.iter().map(body_part).collect(),
        },
    }
}

fn leaf(part: &SinglePart) -> Leaf {
    let subtype = Some(part.subtype.to_ascii_lowercase()).filter(|s| !s.is_empty());
    Leaf {
        media_type: part.media_type.to_ascii_lowercase(),
        subtype,
        params: lower_names(&part.params),
        encoding: TransferEncoding::parse(&part.encoding),
        disposition: part.disposition.as_ref().map(|d| Disposition {
            kind: d.kind.to_ascii_lowercase(),
            params: lower_names(&d.params),
        }),
        id: part.id.clone(),
        size: part.size,
    }
}

fn lower_names(params: &[(String, String)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
        .collect()
}

/// Flags, UID and internal date of a FETCH result.
pub fn summary(message: &FetchedMessage) -> MessageSummary {
    let mut summary = MessageSummary {
        seq: message.seq.get(),
        uid: None,
        flags: Flags::default(),
        internal_date: None,
    };
    for item in &message.items {
        match item {
            FetchItem::Uid(uid) => summary.uid = Some(uid.get()),
            FetchItem::Flags(flags) => summary.flags = flags.clone(),
            FetchItem::InternalDate(date) => summary.internal_date = parse_internal_date(date),
            _ => {}
        }
    }
    summary
}

/// Builds a header from `FLAGS INTERNALDATE ENVELOPE` data.
///
/// `None` when the server sent no envelope or the sender is a bounce
/// address.
pub fn header(message: &FetchedMessage) -> Option<MessageHeader> {
    let envelope = message.items.iter().find_map(|item| match item {
        FetchItem::Envelope(envelope) => Some(envelope.as_ref()),
        _ => None,
    })?;
    let sender = envelope.from.first();
    if sender.is_some_and(is_bounce_sender) {
        tracing::debug!(seq = message.seq.get(), "skipping bounce sender");
        return None;
    }

    let summary = summary(message);
    let reply_to = envelope.reply_to.first();
    Some(MessageHeader {
        seq: summary.seq,
        date: header_date(envelope).or(summary.internal_date),
        from: sender.map(sender_address).unwrap_or_default(),
        name: sender.and_then(display_name).unwrap_or_default(),
        subject: envelope
            .subject
            .as_deref()
            .map(decode_rfc2047)
            .unwrap_or_default(),
        reply_to: reply_to.and_then(address),
        reply_to_name: reply_to.and_then(display_name),
        to: envelope.to.iter().filter_map(address).collect(),
        flags: summary.flags,
    })
}

fn is_bounce_sender(address: &Address) -> bool {
    address.mailbox.as_deref().is_some_and(|mailbox| {
        BOUNCE_SENDERS
            .iter()
            .any(|bounce| mailbox.eq_ignore_ascii_case(bounce))
    })
}

/// `mailbox@host` with the mailbox lower-cased.
fn sender_address(address: &Address) -> String {
    let mailbox = address.mailbox.as_deref().unwrap_or_default().to_lowercase();
    match address.host.as_deref() {
        Some(host) => format!("{mailbox}@{host}"),
        None => mailbox,
    }
}

fn address(address: &Address) -> Option<String> {
    match (&address.mailbox, &address.host) {
        (Some(m), Some(h)) => Some(format!("{m}@{h}")),
        (Some(m), None) => Some(m.clone()),
        _ => None,
    }
}

fn display_name(address: &Address) -> Option<String> {
    address
        .name
        .as_deref()
        .map(decode_rfc2047)
        .filter(|name| !name.is_empty())
}

fn header_date(envelope: &Envelope) -> Option<DateTime<FixedOffset>> {
    let raw = envelope.date.as_deref()?.trim();
    // Drop a trailing zone comment such as "(UTC)".
    let raw = match raw.rfind(" (") {
        Some(at) if raw.ends_with(')') => &raw[..at],
        _ => raw,
    };
    DateTime::parse_from_rfc2822(raw).ok()
}

/// Parses `17-Jul-1996 02:44:25 -0700`.
fn parse_internal_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw.trim(), "%d-%b-%Y %H:%M:%S %z").ok()
}
