//! Response parser.
//!
//! Turns one complete response (as framed by [`crate::codec::ResponseDecoder`])
//! into a [`Response`].

#![allow(clippy::missing_errors_doc)]

mod fetch;
mod helpers;
mod types;

pub use types::{
    Address, BodyStructure, Disposition, EmbeddedMessage, Envelope, FetchItem, MultiPart,
    SinglePart, StatusItem, UntaggedResponse,
};

use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::Result;

use helpers::{
    parse_capability_data, parse_flag_list, parse_response_code, parse_search_response,
    parse_status_response, read_text_until_crlf,
};

/// A parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Completion of the command carrying `tag`.
    Tagged {
        /// Tag of the completed command.
        tag: Tag,
        /// OK, NO or BAD.
        status: Status,
        /// Bracketed code.
        code: Option<ResponseCode>,
        /// Human readable text.
        text: String,
    },
    /// Server data not tied to a tag.
    Untagged(UntaggedResponse),
    /// `+` request to send the next literal.
    Continuation {
        /// Text after the `+`, if any.
        text: Option<String>,
    },
}

impl Response {
    /// Renders a tagged completion back into its status line, for diagnostics.
    #[must_use]
    pub fn status_line(&self) -> Option<String> {
        match self {
            Self::Tagged {
                tag, status, text, ..
            } => Some(format!("{tag} {} {text}", status.as_str())),
            _ => None,
        }
    }
}

/// Stateless entry point.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses one complete response, CRLF included.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer),
            Token::Plus => Ok(Self::parse_continuation(&mut lexer)),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, tag),
            Token::Number(n) => Self::parse_tagged(&mut lexer, &n.to_string()),
            token => Err(lexer.error(&format!("expected '*', '+' or a tag, got {token:?}"))),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag: &str) -> Result<Response> {
        if !tag.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-') {
            return Err(lexer.error(&format!("malformed tag {tag:?}")));
        }
        lexer.expect_space()?;
        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag: Tag::new(tag),
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        lexer.expect_space()?;

        let data = match lexer.next_token()? {
            Token::Atom(keyword) => match keyword.to_ascii_uppercase().as_str() {
                "OK" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    return Ok(Response::Untagged(UntaggedResponse::Ok { code, text }));
                }
                "NO" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    return Ok(Response::Untagged(UntaggedResponse::No { code, text }));
                }
                "BAD" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    return Ok(Response::Untagged(UntaggedResponse::Bad { code, text }));
                }
                "PREAUTH" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    return Ok(Response::Untagged(UntaggedResponse::PreAuth { code, text }));
                }
                "BYE" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    return Ok(Response::Untagged(UntaggedResponse::Bye { code, text }));
                }
                "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
                "FLAGS" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Flags(parse_flag_list(lexer)?)
                }
                "SEARCH" => UntaggedResponse::Search(parse_search_response(lexer)?),
                "STATUS" => {
                    lexer.expect_space()?;
                    let (mailbox, items) = parse_status_response(lexer)?;
                    UntaggedResponse::Status { mailbox, items }
                }
                other => {
                    let keyword = other.to_string();
                    read_text_until_crlf(lexer);
                    return Ok(Response::Untagged(UntaggedResponse::Other(keyword)));
                }
            },
            Token::Number(n) => {
                lexer.expect_space()?;
                let keyword = lexer.read_atom_string()?;
                match keyword.to_ascii_uppercase().as_str() {
                    "EXISTS" => UntaggedResponse::Exists(n),
                    "RECENT" => UntaggedResponse::Recent(n),
                    "EXPUNGE" => UntaggedResponse::Expunge(
                        SeqNum::new(n).ok_or_else(|| lexer.error("EXPUNGE of message 0"))?,
                    ),
                    "FETCH" => {
                        let seq = SeqNum::new(n).ok_or_else(|| lexer.error("FETCH of message 0"))?;
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_response(lexer)?;
                        UntaggedResponse::Fetch { seq, items }
                    }
                    _ => {
                        let keyword = keyword.to_string();
                        read_text_until_crlf(lexer);
                        return Ok(Response::Untagged(UntaggedResponse::Other(keyword)));
                    }
                }
            }
            token => return Err(lexer.error(&format!("unexpected {token:?} after '*'"))),
        };

        Self::finish(lexer)?;
        Ok(Response::Untagged(data))
    }

    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let text = read_text_until_crlf(lexer);
        Response::Continuation {
            text: (!text.is_empty()).then_some(text),
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let word = lexer.read_atom_string()?;
        match word.to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(lexer.error(&format!("invalid status {word:?}"))),
        }
    }

    // Some servers omit the text after the status word, so the space is optional.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };
        if lexer.peek() == Some(b' ') {
            lexer.advance();
        }
        Ok((code, read_text_until_crlf(lexer)))
    }

    fn finish(lexer: &mut Lexer<'_>) -> Result<()> {
        lexer.skip_spaces();
        match lexer.next_token()? {
            Token::Crlf | Token::Eof => Ok(()),
            token => Err(lexer.error(&format!("trailing {token:?} after response data"))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use crate::types::{Capability, Flag, ResponseCode};

    use super::*;
    use crate::Error;

    fn untagged(input: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(input).unwrap() {
            Response::Untagged(data) => data,
            other => panic!("expected untagged data, got {other:?}"),
        }
    }

    #[test]
    fn test_greeting_with_capabilities() {
        let data = untagged(b"* OK [CAPABILITY IMAP4rev1 LITERAL+ AUTH=PLAIN] ready\r\n");
        let UntaggedResponse::Ok {
            code: Some(ResponseCode::Capability(caps)),
            text,
        } = data
        else {
            panic!("expected OK with capabilities");
        };
        assert!(caps.contains(&Capability::LiteralPlus));
        assert_eq!(text, "ready");
    }

    #[test]
    fn test_tagged_no_with_code() {
        let response = ResponseParser::parse(b"A0004 NO [NONEXISTENT] No such mailbox\r\n").unwrap();
        assert_eq!(
            response,
            Response::Tagged {
                tag: Tag::new("A0004"),
                status: Status::No,
                code: Some(ResponseCode::Nonexistent),
                text: "No such mailbox".into(),
            }
        );
        assert_eq!(
            response.status_line().as_deref(),
            Some("A0004 NO No such mailbox")
        );
    }

    #[test]
    fn test_tagged_without_text() {
        let response = ResponseParser::parse(b"A0001 OK\r\n").unwrap();
        assert!(matches!(response, Response::Tagged { status: Status::Ok, ref text, .. } if text.is_empty()));
    }

    #[test]
    fn test_malformed_tag_is_rejected() {
        let err = ResponseParser::parse(b"A\\1 OK done\r\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_message_counters() {
        assert_eq!(untagged(b"* 18 EXISTS\r\n"), UntaggedResponse::Exists(18));
        assert_eq!(
            untagged(b"* 3 EXPUNGE\r\n"),
            UntaggedResponse::Expunge(SeqNum::new(3).unwrap())
        );
        assert!(ResponseParser::parse(b"* 0 EXPUNGE\r\n").is_err());
    }

    #[test]
    fn test_flags_response() {
        let UntaggedResponse::Flags(flags) = untagged(b"* FLAGS (\\Answered \\Seen)\r\n") else {
            panic!("expected FLAGS");
        };
        assert!(flags.contains(&Flag::Answered));
    }

    #[test]
    fn test_search_results() {
        let UntaggedResponse::Search(hits) = untagged(b"* SEARCH 2 3 7\r\n") else {
            panic!("expected SEARCH");
        };
        assert_eq!(hits.iter().map(|s| s.get()).collect::<Vec<_>>(), vec![2, 3, 7]);
    }

    #[test]
    fn test_fetch_with_literal_body() {
        let UntaggedResponse::Fetch { seq, items } =
            untagged(b"* 5 FETCH (BODY[TEXT] {5}\r\nhello FLAGS (\\Seen))\r\n")
        else {
            panic!("expected FETCH");
        };
        assert_eq!(seq.get(), 5);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_unknown_untagged_keyword_is_tolerated() {
        assert_eq!(
            untagged(b"* LIST (\\HasNoChildren) \"/\" INBOX\r\n"),
            UntaggedResponse::Other("LIST".into())
        );
    }

    #[test]
    fn test_continuation_text() {
        assert_eq!(
            ResponseParser::parse(b"+ go ahead\r\n").unwrap(),
            Response::Continuation {
                text: Some("go ahead".into())
            }
        );
        assert_eq!(
            ResponseParser::parse(b"+\r\n").unwrap(),
            Response::Continuation { text: None }
        );
    }

    #[test]
    fn test_trailing_garbage_after_data() {
        assert!(ResponseParser::parse(b"* 4 EXISTS junk\r\n").is_err());
    }
}
