//! FETCH data: envelopes, BODYSTRUCTURE and body sections.

use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;
use crate::Result;

use super::helpers::parse_flag_list;
use super::types::{
    Address, BodyStructure, Disposition, EmbeddedMessage, Envelope, FetchItem, MultiPart,
    SinglePart,
};

/// Parses the parenthesized item list of `* n FETCH (...)`.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => match name.to_ascii_uppercase().as_str() {
                "FLAGS" => {
                    lexer.expect_space()?;
                    items.push(FetchItem::Flags(parse_flag_list(lexer)?));
                }
                "UID" => {
                    lexer.expect_space()?;
                    let n = lexer.read_number()?;
                    let uid = Uid::new(n).ok_or_else(|| lexer.error("UID must not be 0"))?;
                    items.push(FetchItem::Uid(uid));
                }
                "RFC822.SIZE" => {
                    lexer.expect_space()?;
                    items.push(FetchItem::Rfc822Size(lexer.read_number()?));
                }
                "INTERNALDATE" => {
                    lexer.expect_space()?;
                    if let Some(date) = lexer.read_nstring()? {
                        items.push(FetchItem::InternalDate(date));
                    }
                }
                "ENVELOPE" => {
                    lexer.expect_space()?;
                    items.push(FetchItem::Envelope(Box::new(parse_envelope(lexer)?)));
                }
                "BODYSTRUCTURE" => {
                    lexer.expect_space()?;
                    items.push(FetchItem::BodyStructure(parse_body_structure(lexer)?));
                }
                "BODY" if lexer.peek() == Some(b' ') => {
                    // Non-extensible BODY form, same grammar minus extension data.
                    lexer.expect_space()?;
                    items.push(FetchItem::BodyStructure(parse_body_structure(lexer)?));
                }
                "BODY" | "BINARY" | "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
                    let (section, origin) = parse_section_and_origin(lexer)?;
                    lexer.expect_space()?;
                    let data = lexer.read_nstring_bytes()?;
                    items.push(FetchItem::Body {
                        section,
                        origin,
                        data,
                    });
                }
                _ => skip_value(lexer)?,
            },
            token => return Err(lexer.error(&format!("unexpected {token:?} in FETCH"))),
        }
    }

    Ok(items)
}

/// Parses an optional `[section]` and `<origin>` after `BODY`.
fn parse_section_and_origin(lexer: &mut Lexer<'_>) -> Result<(Option<String>, Option<u32>)> {
    let mut section = None;
    if lexer.peek() == Some(b'[') {
        lexer.advance();
        let rest = lexer.remaining();
        let len = rest
            .iter()
            .position(|&b| b == b']')
            .ok_or_else(|| lexer.error("unterminated body section"))?;
        let text = String::from_utf8_lossy(&rest[..len]).into_owned();
        lexer.skip(len + 1);
        if !text.is_empty() {
            section = Some(text);
        }
    }

    let mut origin = None;
    if lexer.peek() == Some(b'<') {
        lexer.advance();
        let rest = lexer.remaining();
        let len = rest
            .iter()
            .position(|&b| b == b'>')
            .ok_or_else(|| lexer.error("unterminated origin"))?;
        origin = std::str::from_utf8(&rest[..len]).ok().and_then(|s| s.parse().ok());
        lexer.skip(len + 1);
    }

    Ok((section, origin))
}

/// Parses an ENVELOPE structure.
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::LParen)?;

    let date = lexer.read_nstring()?;
    lexer.expect_space()?;
    let subject = lexer.read_nstring()?;
    lexer.expect_space()?;
    let from = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let sender = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let reply_to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let cc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let bcc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let in_reply_to = lexer.read_nstring()?;
    lexer.expect_space()?;
    let message_id = lexer.read_nstring()?;

    lexer.expect(Token::RParen)?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

/// Parses NIL or a list of addresses.
pub fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break Ok(addresses);
                    }
                    Some(b'(') => addresses.push(parse_address(lexer)?),
                    Some(b' ') => {
                        lexer.advance();
                    }
                    _ => break Err(lexer.error("malformed address list")),
                }
            }
        }
        token => Err(lexer.error(&format!("expected address list, got {token:?}"))),
    }
}

fn parse_address(lexer: &mut Lexer<'_>) -> Result<Address> {
    lexer.expect(Token::LParen)?;
    let name = lexer.read_nstring()?;
    lexer.expect_space()?;
    let adl = lexer.read_nstring()?;
    lexer.expect_space()?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect_space()?;
    let host = lexer.read_nstring()?;
    lexer.expect(Token::RParen)?;

    Ok(Address {
        name,
        adl,
        mailbox,
        host,
    })
}

/// Parses BODYSTRUCTURE, including the disposition from the extension data.
///
/// ```text
/// single:    ("TEXT" "PLAIN" params id desc enc size lines md5 disp lang loc)
/// message:   ("MESSAGE" "RFC822" params id desc enc size envelope body lines ...)
/// multipart: ((part)(part) "MIXED" params disp lang loc)
/// ```
pub fn parse_body_structure(lexer: &mut Lexer<'_>) -> Result<BodyStructure> {
    lexer.expect(Token::LParen)?;

    let body = if lexer.peek() == Some(b'(') {
        BodyStructure::Multipart(parse_multipart(lexer)?)
    } else {
        BodyStructure::Single(parse_single_part(lexer)?)
    };

    skip_to_close_paren(lexer)?;
    Ok(body)
}

fn parse_multipart(lexer: &mut Lexer<'_>) -> Result<MultiPart> {
    let mut parts = Vec::new();
    while lexer.peek() == Some(b'(') {
        parts.push(parse_body_structure(lexer)?);
        lexer.skip_spaces();
    }

    let subtype = lexer.read_nstring()?.unwrap_or_default().to_ascii_uppercase();

    let mut params = Vec::new();
    let mut disposition = None;
    if next_extension(lexer) {
        params = parse_body_params(lexer)?;
        if next_extension(lexer) {
            disposition = parse_disposition(lexer)?;
        }
    }

    Ok(MultiPart {
        parts,
        subtype,
        params,
        disposition,
    })
}

fn parse_single_part(lexer: &mut Lexer<'_>) -> Result<SinglePart> {
    let media_type = lexer.read_nstring()?.unwrap_or_default().to_ascii_uppercase();
    lexer.expect_space()?;
    let subtype = lexer.read_nstring()?.unwrap_or_default().to_ascii_uppercase();
    lexer.expect_space()?;
    let params = parse_body_params(lexer)?;
    lexer.expect_space()?;
    let id = lexer.read_nstring()?;
    lexer.expect_space()?;
    let description = lexer.read_nstring()?;
    lexer.expect_space()?;
    let encoding = lexer.read_nstring()?.unwrap_or_default();
    lexer.expect_space()?;
    let size = lexer.read_number()?;

    let mut part = SinglePart {
        media_type,
        subtype,
        params,
        id,
        description,
        encoding,
        size,
        ..SinglePart::default()
    };

    if part.media_type == "MESSAGE" && part.subtype == "RFC822" && next_extension(lexer) {
        let envelope = parse_envelope(lexer)?;
        lexer.expect_space()?;
        let body = parse_body_structure(lexer)?;
        lexer.expect_space()?;
        part.lines = Some(lexer.read_number()?);
        part.message = Some(Box::new(EmbeddedMessage { envelope, body }));
    } else if part.media_type == "TEXT" && next_extension(lexer) {
        part.lines = Some(lexer.read_number()?);
    }

    // body-ext-1part: md5 [disposition [language [location]]]
    if next_extension(lexer) {
        skip_value(lexer)?;
        if next_extension(lexer) {
            part.disposition = parse_disposition(lexer)?;
        }
    }

    Ok(part)
}

/// Consumes the separating space if another field follows.
fn next_extension(lexer: &mut Lexer<'_>) -> bool {
    if lexer.peek() == Some(b' ') && lexer.remaining().get(1) != Some(&b')') {
        lexer.advance();
        true
    } else {
        false
    }
}

/// Parses NIL or `("key" "value" ...)`.
fn parse_body_params(lexer: &mut Lexer<'_>) -> Result<Vec<(String, String)>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut params = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        break Ok(params);
                    }
                    Some(b' ') => {
                        lexer.advance();
                    }
                    Some(_) => {
                        let key = lexer.read_astring()?;
                        lexer.expect_space()?;
                        let value = lexer.read_nstring()?.unwrap_or_default();
                        params.push((key, value));
                    }
                    None => break Err(lexer.error("unterminated parameter list")),
                }
            }
        }
        token => Err(lexer.error(&format!("expected body parameters, got {token:?}"))),
    }
}

/// Parses NIL or `("ATTACHMENT" params)`.
fn parse_disposition(lexer: &mut Lexer<'_>) -> Result<Option<Disposition>> {
    match lexer.next_token()? {
        Token::Nil => Ok(None),
        Token::LParen => {
            let kind = lexer.read_astring()?;
            lexer.skip_spaces();
            let params = if lexer.peek() == Some(b')') {
                Vec::new()
            } else {
                parse_body_params(lexer)?
            };
            lexer.expect(Token::RParen)?;
            Ok(Some(Disposition { kind, params }))
        }
        // Some servers send a bare string here.
        Token::QuotedString(kind) => Ok(Some(Disposition {
            kind,
            params: Vec::new(),
        })),
        token => Err(lexer.error(&format!("expected disposition, got {token:?}"))),
    }
}

/// Skips to and consumes the `)` closing the current list.
fn skip_to_close_paren(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 1usize;
    while depth > 0 {
        match lexer.next_token()? {
            Token::LParen => depth += 1,
            Token::RParen => depth -= 1,
            Token::Eof | Token::Crlf => return Err(lexer.error("unbalanced parentheses")),
            _ => {}
        }
    }
    Ok(())
}

/// Skips one value: atom, number, string, literal or a nested list.
fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    lexer.skip_spaces();
    // `BODY[...]`-like names carry their section inline.
    if lexer.peek() == Some(b'[') {
        parse_section_and_origin(lexer)?;
        lexer.skip_spaces();
    }
    match lexer.next_token()? {
        Token::LParen => skip_to_close_paren(lexer),
        Token::RParen | Token::Crlf | Token::Eof => Err(lexer.error("missing FETCH item value")),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    fn structure(input: &[u8]) -> BodyStructure {
        let mut lexer = Lexer::new(input);
        parse_body_structure(&mut lexer).unwrap()
    }

    #[test]
    fn test_text_part_with_lines() {
        let BodyStructure::Single(part) =
            structure(b"(\"text\" \"plain\" (\"charset\" \"us-ascii\") NIL NIL \"7bit\" 25 1)")
        else {
            panic!("expected single part");
        };
        assert_eq!(part.media_type, "TEXT");
        assert_eq!(part.subtype, "PLAIN");
        assert_eq!(part.params, vec![("charset".into(), "us-ascii".into())]);
        assert_eq!(part.size, 25);
        assert_eq!(part.lines, Some(1));
        assert!(part.disposition.is_none());
    }

    #[test]
    fn test_attachment_disposition_is_kept() {
        let input = b"(\"application\" \"pdf\" (\"name\" \"a.pdf\") NIL NIL \"base64\" 4096 NIL (\"attachment\" (\"filename\" \"report.pdf\")) NIL NIL)";
        let BodyStructure::Single(part) = structure(input) else {
            panic!("expected single part");
        };
        let disposition = part.disposition.unwrap();
        assert_eq!(disposition.kind, "attachment");
        assert_eq!(disposition.params, vec![("filename".into(), "report.pdf".into())]);
    }

    #[test]
    fn test_multipart_alternative_with_extension_data() {
        let input = b"((\"text\" \"plain\" (\"charset\" \"utf-8\") NIL NIL \"quoted-printable\" 10 1 NIL NIL NIL)(\"text\" \"html\" (\"charset\" \"utf-8\") NIL NIL \"base64\" 20 1 NIL NIL NIL) \"alternative\" (\"boundary\" \"b1\") NIL NIL)";
        let BodyStructure::Multipart(multi) = structure(input) else {
            panic!("expected multipart");
        };
        assert_eq!(multi.subtype, "ALTERNATIVE");
        assert_eq!(multi.parts.len(), 2);
        assert_eq!(multi.params, vec![("boundary".into(), "b1".into())]);
    }

    #[test]
    fn test_multipart_without_extension_data() {
        let input = b"((\"text\" \"plain\" NIL NIL NIL \"7bit\" 3 1)(\"image\" \"png\" NIL NIL NIL \"base64\" 8) \"mixed\")";
        let BodyStructure::Multipart(multi) = structure(input) else {
            panic!("expected multipart");
        };
        assert_eq!(multi.subtype, "MIXED");
        let BodyStructure::Single(image) = &multi.parts[1] else {
            panic!("expected single part");
        };
        assert_eq!(image.lines, None);
    }

    #[test]
    fn test_embedded_message() {
        let input = b"(\"message\" \"rfc822\" NIL NIL NIL \"7bit\" 300 (NIL \"inner\" NIL NIL NIL NIL NIL NIL NIL NIL) (\"text\" \"plain\" NIL NIL NIL \"7bit\" 5 1) 12)";
        let BodyStructure::Single(part) = structure(input) else {
            panic!("expected single part");
        };
        assert_eq!(part.lines, Some(12));
        let message = part.message.unwrap();
        assert_eq!(message.envelope.subject.as_deref(), Some("inner"));
        assert!(matches!(message.body, BodyStructure::Single(_)));
    }

    #[test]
    fn test_body_section_from_literal() {
        let mut lexer = Lexer::new(b"(BODY[1.2] {6}\r\nhi\r\nyo UID 9)");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(
            items[0],
            FetchItem::Body {
                section: Some("1.2".into()),
                origin: None,
                data: Some(b"hi\r\nyo".to_vec()),
            }
        );
        assert_eq!(items[1], FetchItem::Uid(Uid::new(9).unwrap()));
    }

    #[test]
    fn test_body_section_from_quoted_string() {
        let mut lexer = Lexer::new(b"(BODY[1] \"short text\")");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert!(matches!(
            &items[0],
            FetchItem::Body { data: Some(d), .. } if d == b"short text"
        ));
    }

    #[test]
    fn test_unknown_items_are_skipped() {
        let mut lexer = Lexer::new(b"(X-GM-LABELS (\\Inbox \"Work\") MODSEQ (7) FLAGS (\\Seen))");
        let items = parse_fetch_response(&mut lexer).unwrap();
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], FetchItem::Flags(f) if f.is_seen()));
    }

    #[test]
    fn test_envelope_addresses() {
        let input = b"(\"Mon, 7 Feb 1994 21:52:25 -0800\" \"Hi\" ((\"Ada\" NIL \"ada\" \"example.org\")) NIL NIL ((NIL NIL \"bob\" \"example.net\")) NIL NIL NIL \"<id@x>\")";
        let mut lexer = Lexer::new(input);
        let envelope = parse_envelope(&mut lexer).unwrap();
        assert_eq!(envelope.from[0].name.as_deref(), Some("Ada"));
        assert_eq!(envelope.to[0].email().as_deref(), Some("bob@example.net"));
        assert!(envelope.reply_to.is_empty());
        assert_eq!(envelope.message_id.as_deref(), Some("<id@x>"));
    }

    #[test]
    fn test_zero_uid_rejected() {
        let mut lexer = Lexer::new(b"(UID 0)");
        assert!(parse_fetch_response(&mut lexer).is_err());
    }
}
