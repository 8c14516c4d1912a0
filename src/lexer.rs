use std::{collections::HashMap, sync::LazyLock};

use tracing::trace;

use crate::ast::{Token, TokenKind};

/// Reserved words, matched against the uppercased identifier text.
static KEYWORDS: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    HashMap::from([
        ("LIST", TokenKind::List),
        ("TABLE", TokenKind::Table),
        ("TASK", TokenKind::Task),
        ("FROM", TokenKind::From),
        ("WHERE", TokenKind::Where),
        ("SORT", TokenKind::Sort),
        ("LIMIT", TokenKind::Limit),
        ("GROUP", TokenKind::Group),
        ("BY", TokenKind::By),
        ("ASC", TokenKind::Asc),
        ("DESC", TokenKind::Desc),
        ("AND", TokenKind::And),
        ("OR", TokenKind::Or),
        ("NOT", TokenKind::Not),
        ("CONTAINS", TokenKind::Contains),
        ("TRUE", TokenKind::Boolean),
        ("FALSE", TokenKind::Boolean),
    ])
});

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn is_tag_char(ch: char) -> bool {
        ch.is_alphanumeric() || matches!(ch, '_' | '-' | '/')
    }

    fn is_identifier_char(ch: char) -> bool {
        ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
    }

    fn read_while(&mut self, accept: fn(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if accept(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Reads a quoted string. Only the closing quote can be escaped; an
    /// unterminated string runs to the end of the input.
    fn read_string(&mut self, quote: char) -> String {
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return result;
                }
                '\\' if self.peek_char(1) == Some(quote) => {
                    result.push(quote);
                    self.advance();
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        result
    }

    fn read_link(&mut self) -> String {
        let mut result = String::new();
        self.advance();
        self.advance(); // `[[`

        while let Some(ch) = self.current_char() {
            if ch == ']' && self.peek_char(1) == Some(']') {
                self.advance();
                self.advance();
                return result;
            }
            result.push(ch);
            self.advance();
        }

        result
    }

    fn read_number(&mut self) -> String {
        let mut number = String::new();
        let mut is_float = false;

        if self.current_char() == Some('-') {
            number.push('-');
            self.advance();
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        number
    }

    fn single(&mut self, kind: TokenKind, width: usize) -> Token {
        let start = self.position;
        let text: String = self.input[start..start + width].iter().collect();
        self.position += width;
        Token::new(kind, text, start)
    }

    /// Returns the next token, or `Eof` once the input is exhausted.
    ///
    /// Characters that start no token are skipped.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            let start = self.position;

            let Some(ch) = self.current_char() else {
                return Token::new(TokenKind::Eof, "", start);
            };

            match ch {
                '#' if self.peek_char(1).is_some_and(Self::is_tag_char) => {
                    self.advance();
                    let tag = self.read_while(Self::is_tag_char);
                    return Token::new(TokenKind::Tag, tag, start);
                }
                '"' | '\'' => {
                    let text = self.read_string(ch);
                    return Token::new(TokenKind::String, text, start);
                }
                '[' if self.peek_char(1) == Some('[') => {
                    let text = self.read_link();
                    return Token::new(TokenKind::Link, text, start);
                }
                '!' if self.peek_char(1) == Some('=') => return self.single(TokenKind::NotEq, 2),
                '>' if self.peek_char(1) == Some('=') => return self.single(TokenKind::GtEq, 2),
                '<' if self.peek_char(1) == Some('=') => return self.single(TokenKind::LtEq, 2),
                '!' => return self.single(TokenKind::Not, 1),
                '=' => return self.single(TokenKind::Eq, 1),
                '>' => return self.single(TokenKind::Gt, 1),
                '<' => return self.single(TokenKind::Lt, 1),
                '(' => return self.single(TokenKind::LParen, 1),
                ')' => return self.single(TokenKind::RParen, 1),
                ',' => return self.single(TokenKind::Comma, 1),
                '.' => return self.single(TokenKind::Dot, 1),
                c if c.is_ascii_digit()
                    || (c == '-' && self.peek_char(1).is_some_and(|d| d.is_ascii_digit())) =>
                {
                    let number = self.read_number();
                    return Token::new(TokenKind::Number, number, start);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let ident = self.read_while(Self::is_identifier_char);
                    let upper = ident.to_uppercase();

                    return match KEYWORDS.get(upper.as_str()) {
                        Some(TokenKind::Boolean) => {
                            Token::new(TokenKind::Boolean, upper.to_lowercase(), start)
                        }
                        Some(kind) => Token::new(*kind, ident, start),
                        None => Token::new(TokenKind::Identifier, ident, start),
                    };
                }
                other => {
                    trace!(character = %other, position = start, "skipping unrecognized character");
                    self.advance();
                }
            }
        }
    }

    /// Consumes the lexer and returns every token, ending with `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}

/// Tokenizes `input` into a token list terminated by `Eof`.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).tokenize()
}

#[test]
fn test_keywords_are_case_insensitive() {
    let mut lexer = Lexer::new("list Table tAsK where");
    assert_eq!(lexer.next_token().kind, TokenKind::List);
    assert_eq!(lexer.next_token().kind, TokenKind::Table);
    assert_eq!(lexer.next_token().kind, TokenKind::Task);
    assert_eq!(lexer.next_token().kind, TokenKind::Where);
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
}

#[test]
fn test_booleans_are_lowercased() {
    let mut lexer = Lexer::new("TRUE False");
    let t = lexer.next_token();
    assert_eq!((t.kind, t.text.as_str()), (TokenKind::Boolean, "true"));
    let f = lexer.next_token();
    assert_eq!((f.kind, f.text.as_str()), (TokenKind::Boolean, "false"));
}

#[test]
fn test_where_clause() {
    let kinds: Vec<TokenKind> = tokenize("WHERE priority >= 2")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Where,
            TokenKind::Identifier,
            TokenKind::GtEq,
            TokenKind::Number,
            TokenKind::Eof
        ]
    );
}
