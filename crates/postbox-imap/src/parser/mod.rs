//! Sans-I/O response parser.
//!
//! - [`lexer`] splits a complete response into tokens.
//! - [`response`] builds typed [`Response`] values from those tokens.
//!
//! ```
//! use postbox_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* 12 EXISTS\r\n").unwrap();
//! assert_eq!(response, Response::Untagged(UntaggedResponse::Exists(12)));
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{
    Address, BodyStructure, Disposition, EmbeddedMessage, Envelope, FetchItem, MultiPart,
    Response, ResponseParser, SinglePart, StatusItem, UntaggedResponse,
};
