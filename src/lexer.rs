use thiserror::Error;

use crate::token::Token;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexerError {
    #[error("Indent parsing error at position {position}")]
    IndentParsing { position: usize },
    #[error("String parsing error at position {position}")]
    StringParsing { position: usize },
    #[error("Operator parsing error at position {position}")]
    OperatorParsing { position: usize },
    #[error("Unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("Invalid integer literal '{literal}' at position {position}")]
    InvalidIntegerLiteral { literal: String, position: usize },
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
}

pub type LexResult<T> = Result<T, LexerError>;

/// On-demand tokenizer over a source string.
///
/// Indentation is significant: every logical line must be indented a multiple
/// of two spaces, and `Indent`/`Dedent` tokens are emitted one per 2-space
/// step whenever the line's indentation differs from the running level.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    current: Token,
    /// Running block indent level, in columns.
    indent: usize,
    /// Spaces counted at the start of the current logical line.
    line_indent: usize,
}

impl<'a> Lexer<'a> {
    /// Reads any leading indentation and primes the first token.
    pub fn new(input: &'a str) -> LexResult<Self> {
        let mut lexer = Self {
            input,
            pos: 0,
            current: Token::Newline,
            indent: 0,
            line_indent: 0,
        };
        lexer.line_indent = lexer.read_line_indent()?;
        lexer.next()?;
        Ok(lexer)
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Advances to and returns the next token. Once `Eof` is reached, every
    /// further call keeps returning `Eof`.
    pub fn next(&mut self) -> LexResult<&Token> {
        loop {
            // A comment runs to the end of the line; the newline itself is
            // handled below.
            if self.peek_char() == Some('#') {
                self.consume_while(|c| c != '\n');
            }

            if self.peek_char() == Some('\n') {
                self.consume_char();
                self.line_indent = self.read_line_indent()?;
                if self.current != Token::Newline {
                    self.current = Token::Newline;
                    return Ok(&self.current);
                }
                // Runs of blank lines collapse into the Newline already
                // emitted.
                continue;
            }

            if self.line_indent > self.indent {
                self.indent += 2;
                self.current = Token::Indent;
                return Ok(&self.current);
            }
            if self.line_indent < self.indent {
                self.indent -= 2;
                self.current = Token::Dedent;
                return Ok(&self.current);
            }

            let Some(ch) = self.peek_char() else {
                // End of input: terminate the last logical line, then close
                // any open blocks (the dedent branch above) before Eof.
                self.line_indent = 0;
                self.current = if self.current.is_line_terminator() {
                    Token::Eof
                } else {
                    Token::Newline
                };
                return Ok(&self.current);
            };

            let token = match ch {
                c if c.is_ascii_digit() => self.read_number()?,
                quote @ ('\'' | '"') => {
                    self.consume_char();
                    self.read_string(quote)?
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(),
                '!' | '=' | '<' | '>' => {
                    self.consume_char();
                    self.read_comparison(ch)?
                }
                '+' | '-' | '*' | '/' | ':' | '(' | ')' | '.' | ',' => {
                    self.consume_char();
                    Token::Char(ch)
                }
                ' ' => {
                    self.consume_while(|c| c == ' ');
                    continue;
                }
                character => {
                    return Err(LexerError::UnexpectedCharacter {
                        character,
                        position: self.pos,
                    });
                }
            };

            self.current = token;
            return Ok(&self.current);
        }
    }

    /// Asserts that the current token equals `expected` (kind and payload).
    pub fn expect(&self, expected: &Token) -> LexResult<&Token> {
        if self.current == *expected {
            Ok(&self.current)
        } else {
            Err(self.unexpected(format!("{expected:?}")))
        }
    }

    /// Asserts that the current token is an identifier and returns its name.
    pub fn expect_id(&self) -> LexResult<&str> {
        match &self.current {
            Token::Id(name) => Ok(name),
            _ => Err(self.unexpected("an identifier".to_string())),
        }
    }

    pub fn expect_next(&mut self, expected: &Token) -> LexResult<&Token> {
        self.next()?;
        self.expect(expected)
    }

    pub fn expect_next_id(&mut self) -> LexResult<&str> {
        self.next()?;
        self.expect_id()
    }

    fn unexpected(&self, expected: String) -> LexerError {
        LexerError::UnexpectedToken {
            expected,
            found: format!("{:?}", self.current),
        }
    }

    fn read_line_indent(&mut self) -> LexResult<usize> {
        let spaces = self.consume_while(|c| c == ' ');
        if spaces % 2 == 1 {
            return Err(LexerError::IndentParsing { position: self.pos });
        }
        Ok(spaces)
    }

    fn read_number(&mut self) -> LexResult<Token> {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_digit());
        let literal = &self.input[start..self.pos];
        let value = literal
            .parse::<i64>()
            .map_err(|_| LexerError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                position: start,
            })?;
        Ok(Token::Number(value))
    }

    fn read_string(&mut self, quote: char) -> LexResult<Token> {
        let start = self.pos;
        let mut content = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') | Some('\r') => {
                    return Err(LexerError::StringParsing { position: start });
                }
                Some('\\') => {
                    self.consume_char();
                    match self.consume_char() {
                        Some('n') => content.push('\n'),
                        Some('t') => content.push('\t'),
                        Some('\'') => content.push('\''),
                        Some('"') => content.push('"'),
                        Some(other) => content.push(other),
                        None => return Err(LexerError::StringParsing { position: start }),
                    }
                }
                Some(c) if c == quote => {
                    self.consume_char();
                    return Ok(Token::String(content));
                }
                Some(c) => {
                    self.consume_char();
                    content.push(c);
                }
            }
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');
        match &self.input[start..self.pos] {
            "class" => Token::Class,
            "return" => Token::Return,
            "if" => Token::If,
            "else" => Token::Else,
            "def" => Token::Def,
            "print" => Token::Print,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "None" => Token::None,
            "True" => Token::True,
            "False" => Token::False,
            ident => Token::Id(ident.to_string()),
        }
    }

    /// `first` is one of `! = < >`, already consumed.
    fn read_comparison(&mut self, first: char) -> LexResult<Token> {
        if self.peek_char() == Some('=') {
            self.consume_char();
            let token = match first {
                '=' => Token::Eq,
                '!' => Token::NotEq,
                '<' => Token::LessOrEq,
                _ => Token::GreaterOrEq,
            };
            return Ok(token);
        }
        match first {
            '=' | '<' | '>' => Ok(Token::Char(first)),
            _ => Err(LexerError::OperatorParsing { position: self.pos }),
        }
    }

    fn consume_while<P>(&mut self, keep: P) -> usize
    where
        P: Fn(char) -> bool,
    {
        let mut count = 0;
        while let Some(c) = self.peek_char() {
            if !keep(c) {
                break;
            }
            self.consume_char();
            count += 1;
        }
        count
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}

/// Drains a full token stream, `Eof` included. Mostly useful for tests.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(input)?;
    let mut tokens = vec![lexer.current().clone()];
    while *lexer.current() != Token::Eof {
        tokens.push(lexer.next()?.clone());
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn id(name: &str) -> Token {
        Token::Id(name.to_string())
    }

    fn string(content: &str) -> Token {
        Token::String(content.to_string())
    }

    #[test]
    fn lexes_class_with_method() {
        let input = indoc! {"
            class Dog:
              def bark(self):
                return 'woof'
        "};
        let tokens = tokenize(input).expect("tokenize should succeed");
        let expected = vec![
            Token::Class,
            id("Dog"),
            Token::Char(':'),
            Token::Newline,
            Token::Indent,
            Token::Def,
            id("bark"),
            Token::Char('('),
            id("self"),
            Token::Char(')'),
            Token::Char(':'),
            Token::Newline,
            Token::Indent,
            Token::Return,
            string("woof"),
            Token::Newline,
            Token::Dedent,
            Token::Dedent,
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn lexes_comparison_operators() {
        let tokens = tokenize("a == b != c <= d >= e < f > g = 1\n").expect("tokenize");
        let expected = vec![
            id("a"),
            Token::Eq,
            id("b"),
            Token::NotEq,
            id("c"),
            Token::LessOrEq,
            id("d"),
            Token::GreaterOrEq,
            id("e"),
            Token::Char('<'),
            id("f"),
            Token::Char('>'),
            id("g"),
            Token::Char('='),
            Token::Number(1),
            Token::Newline,
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn decodes_string_escapes_in_both_quote_styles() {
        let tokens = tokenize("x = 'a\\nb\\t\\'c' + \"d\\\"e\"\n").expect("tokenize");
        let expected = vec![
            id("x"),
            Token::Char('='),
            string("a\nb\t'c"),
            Token::Char('+'),
            string("d\"e"),
            Token::Newline,
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn skips_comments_and_comment_only_lines() {
        let with_comments = indoc! {"
            # leading comment
            x = 1  # trailing comment
            # a whole commented line
            y = 2
        "};
        let without_comments = indoc! {"
            x = 1
            y = 2
        "};
        assert_eq!(
            tokenize(with_comments).expect("tokenize"),
            tokenize(without_comments).expect("tokenize"),
        );
    }

    #[test]
    fn collapses_blank_lines_into_one_newline() {
        let tokens = tokenize("x = 1\n\n\n\ny = 2\n").expect("tokenize");
        let expected = vec![
            id("x"),
            Token::Char('='),
            Token::Number(1),
            Token::Newline,
            id("y"),
            Token::Char('='),
            Token::Number(2),
            Token::Newline,
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn emits_one_indent_per_two_space_step() {
        let input = "if x:\n    y = 1\n";
        let tokens = tokenize(input).expect("tokenize");
        let expected = vec![
            Token::If,
            id("x"),
            Token::Char(':'),
            Token::Newline,
            Token::Indent,
            Token::Indent,
            id("y"),
            Token::Char('='),
            Token::Number(1),
            Token::Newline,
            Token::Dedent,
            Token::Dedent,
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn terminates_last_line_and_flushes_dedents_without_trailing_newline() {
        let tokens = tokenize("if x:\n  y = 1").expect("tokenize");
        let expected = vec![
            Token::If,
            id("x"),
            Token::Char(':'),
            Token::Newline,
            Token::Indent,
            id("y"),
            Token::Char('='),
            Token::Number(1),
            Token::Newline,
            Token::Dedent,
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn eof_is_sticky() {
        let mut lexer = Lexer::new("x").expect("lexer");
        assert_eq!(*lexer.current(), id("x"));
        assert_eq!(*lexer.next().expect("next"), Token::Newline);
        assert_eq!(*lexer.next().expect("next"), Token::Eof);
        assert_eq!(*lexer.next().expect("next"), Token::Eof);
        assert_eq!(*lexer.next().expect("next"), Token::Eof);
    }

    #[test]
    fn errors_on_odd_indentation() {
        let err = tokenize("if x:\n   y = 1\n").expect_err("expected indent failure");
        assert!(matches!(err, LexerError::IndentParsing { .. }));
        assert!(err.to_string().contains("Indent parsing error"));
    }

    #[test]
    fn errors_on_unterminated_string() {
        let err = tokenize("x = 'abc\n").expect_err("expected string failure");
        assert!(matches!(err, LexerError::StringParsing { .. }));

        let err = tokenize("x = 'abc").expect_err("expected string failure at eof");
        assert!(matches!(err, LexerError::StringParsing { .. }));
    }

    #[test]
    fn errors_on_lone_exclamation_mark() {
        let err = tokenize("x = 1 ! 2\n").expect_err("expected operator failure");
        assert!(matches!(err, LexerError::OperatorParsing { .. }));
    }

    #[test]
    fn errors_on_unexpected_character() {
        let err = tokenize("x = 1 @ 2\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexerError::UnexpectedCharacter {
                character: '@',
                position: 6
            }
        );
    }

    #[test]
    fn errors_on_integer_overflow() {
        let err = tokenize("n = 99999999999999999999999999\n").expect_err("expected overflow");
        assert!(matches!(err, LexerError::InvalidIntegerLiteral { .. }));
    }

    #[test]
    fn expect_checks_kind_and_payload() {
        let mut lexer = Lexer::new("x = 42\n").expect("lexer");
        assert_eq!(lexer.expect_id().expect("id"), "x");
        assert!(lexer.expect(&Token::Newline).is_err());
        assert_eq!(
            *lexer.expect_next(&Token::Char('=')).expect("equals"),
            Token::Char('=')
        );
        assert_eq!(
            *lexer.expect_next(&Token::Number(42)).expect("number"),
            Token::Number(42)
        );
        assert!(lexer.expect_next_id().is_err());
    }

    #[test]
    fn primes_first_token_past_leading_blank_lines() {
        let mut lexer = Lexer::new("\n\n# comment\nx = 1\n").expect("lexer");
        assert_eq!(*lexer.current(), id("x"));
        assert_eq!(*lexer.next().expect("next"), Token::Char('='));
    }
}
