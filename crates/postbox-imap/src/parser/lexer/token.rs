//! Lexer tokens.

/// One token of server output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Bare atom. `\Seen` style flags are lexed as a single atom.
    Atom(&'a str),
    /// Quoted string with escapes removed.
    QuotedString(String),
    /// Literal payload (`{n}` or `{n+}` followed by n raw bytes).
    Literal(Vec<u8>),
    /// All-digit atom.
    Number(u32),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// A single space.
    Space,
    /// `*`
    Asterisk,
    /// `+`
    Plus,
    /// `NIL` in any case.
    Nil,
    /// `\r\n`
    Crlf,
    /// No input left.
    Eof,
}
