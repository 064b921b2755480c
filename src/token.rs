/// A lexical token of the dialect.
///
/// Two tokens are equal iff their kind matches and, for the valued kinds
/// (`Number`, `Id`, `String`, `Char`), their payloads match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(i64),
    Id(String),
    String(String),
    Char(char),

    // Keywords
    Class,
    Return,
    If,
    Else,
    Def,
    Print,
    And,
    Or,
    Not,
    None,
    True,
    False,

    // Two-character comparison operators
    Eq,
    NotEq,
    LessOrEq,
    GreaterOrEq,

    // Structural
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl Token {
    /// Tokens that already terminate a logical line; they suppress the
    /// synthetic `Newline` emitted at end of input.
    pub(crate) fn is_line_terminator(&self) -> bool {
        matches!(self, Token::Newline | Token::Dedent | Token::Eof)
    }
}
