//! Small grammar pieces shared by the response parsers.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{Capability, Flag, Flags, Mailbox, ResponseCode, SeqNum, Uid, UidValidity};
use crate::Result;

use super::types::StatusItem;

fn nonzero<T>(lexer: &Lexer<'_>, value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| lexer.error(&format!("{what} must not be 0")))
}

/// Parses `[CODE ...]`. Unknown codes are skipped up to the closing bracket.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;
    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "NONEXISTENT" => ResponseCode::Nonexistent,
        "AUTHENTICATIONFAILED" => ResponseCode::AuthenticationFailed,
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidNext(nonzero(lexer, Uid::new(n), "UIDNEXT")?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidValidity(nonzero(lexer, UidValidity::new(n), "UIDVALIDITY")?)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::Unseen(nonzero(lexer, SeqNum::new(n), "UNSEEN")?)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?.into_iter().collect())
        }
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    while lexer.peek().is_some_and(|b| b != b']' && b != b'\r') {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses the space separated atoms after `CAPABILITY`.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        if let Token::Atom(s) = lexer.next_token()? {
            caps.push(Capability::parse(s));
        }
    }
    Ok(caps)
}

/// Parses `(\Flag ...)`. `\*` in PERMANENTFLAGS is kept as a keyword.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;
    let mut flags = Flags::new();
    loop {
        match lexer.peek() {
            Some(b')') => {
                lexer.advance();
                break;
            }
            Some(b' ') => {
                lexer.advance();
            }
            Some(b'\\') if lexer.remaining().starts_with(b"\\*") => {
                lexer.skip(2);
                flags.insert(Flag::Keyword("\\*".into()));
            }
            _ => match lexer.next_token()? {
                Token::Atom(s) => flags.insert(Flag::parse(s)),
                token => return Err(lexer.error(&format!("unexpected {token:?} in flag list"))),
            },
        }
    }
    Ok(flags)
}

/// Parses the numbers after `SEARCH`.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<SeqNum>> {
    let mut nums = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Number(n) => nums.extend(SeqNum::new(n)),
            // Trailing space before CRLF on some servers.
            Token::Crlf => break,
            token => return Err(lexer.error(&format!("unexpected {token:?} in SEARCH"))),
        }
    }
    Ok(nums)
}

/// Parses `mailbox (NAME n ...)` after `STATUS`.
pub fn parse_status_response(lexer: &mut Lexer<'_>) -> Result<(Mailbox, Vec<StatusItem>)> {
    let name = lexer.read_astring()?;
    lexer.expect_space()?;
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(attr) => {
                lexer.expect_space()?;
                let value = lexer.read_number()?;
                let item = match attr.to_ascii_uppercase().as_str() {
                    "MESSAGES" => Some(StatusItem::Messages(value)),
                    "RECENT" => Some(StatusItem::Recent(value)),
                    "UNSEEN" => Some(StatusItem::Unseen(value)),
                    "UIDNEXT" => Uid::new(value).map(StatusItem::UidNext),
                    "UIDVALIDITY" => UidValidity::new(value).map(StatusItem::UidValidity),
                    _ => None,
                };
                items.extend(item);
            }
            token => return Err(lexer.error(&format!("unexpected {token:?} in STATUS"))),
        }
    }

    Ok((Mailbox::new(name), items))
}

/// Takes the rest of the line as text and consumes the CRLF.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let remaining = lexer.remaining();
    let end = remaining
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(remaining.len());
    lexer.skip(end + 2);
    String::from_utf8_lossy(&remaining[..end]).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_flags_with_wildcard() {
        let mut lexer = Lexer::new(b"[PERMANENTFLAGS (\\Seen \\Deleted \\*)]");
        let ResponseCode::PermanentFlags(flags) = parse_response_code(&mut lexer).unwrap() else {
            panic!("expected PERMANENTFLAGS");
        };
        assert_eq!(flags.len(), 3);
        assert_eq!(flags[2], Flag::Keyword("\\*".into()));
    }

    #[test]
    fn test_unknown_code_is_skipped() {
        let mut lexer = Lexer::new(b"[X-WEIRD 1 2 (3)] rest");
        assert_eq!(
            parse_response_code(&mut lexer).unwrap(),
            ResponseCode::Unknown("X-WEIRD".into())
        );
        assert_eq!(lexer.remaining(), b" rest");
    }

    #[test]
    fn test_zero_uidvalidity_is_rejected() {
        let mut lexer = Lexer::new(b"[UIDVALIDITY 0]");
        assert!(parse_response_code(&mut lexer).is_err());
    }

    #[test]
    fn test_status_counters() {
        let mut lexer = Lexer::new(b"\"Sent Items\" (MESSAGES 12 UNSEEN 3 X-FOO 1)");
        let (mailbox, items) = parse_status_response(&mut lexer).unwrap();
        assert_eq!(mailbox.as_str(), "Sent Items");
        assert_eq!(items, vec![StatusItem::Messages(12), StatusItem::Unseen(3)]);
    }

    #[test]
    fn test_empty_search() {
        let mut lexer = Lexer::new(b"\r\n");
        assert!(parse_search_response(&mut lexer).unwrap().is_empty());
    }

    #[test]
    fn test_text_without_crlf_runs_to_end() {
        let mut lexer = Lexer::new(b"done");
        assert_eq!(read_text_until_crlf(&mut lexer), "done");
        assert!(lexer.is_eof());
    }
}
