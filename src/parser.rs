use std::{fmt, mem};

use crate::{
    ast::{
        CompareOp, Expression, FieldPath, FromClause, LogicalOp, Operand, Query, QueryType,
        SortDirection, SortKey, Token, TokenKind,
    },
    lexer::Lexer,
    value::Value,
};

/// Grammar violation, with the character offset of the offending token.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: std::vec::IntoIter<Token>,
    current_token: Token,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Parser::from_tokens(lexer.tokenize())
    }

    /// Builds a parser over an already tokenized input.
    ///
    /// A missing trailing `Eof` is tolerated.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut tokens = tokens.into_iter();
        let current_token = tokens
            .next()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, "", 0));
        Parser {
            tokens,
            current_token,
        }
    }

    /// Moves to the next token and returns the one just left.
    fn advance(&mut self) -> Token {
        let next = match self.tokens.next() {
            Some(token) => token,
            None => Token::new(TokenKind::Eof, "", self.current_token.position),
        };
        mem::replace(&mut self.current_token, next)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_token.is(kind)
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if !self.check(kind) {
            return Err(self.unexpected(&format!("Expected {}", kind)));
        }
        Ok(self.advance())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let found = match self.current_token.kind {
            TokenKind::Eof => "end of input".to_string(),
            kind => format!("{} '{}'", kind, self.current_token.text),
        };
        ParseError::new(
            format!("{}, found {}", expected, found),
            self.current_token.position,
        )
    }

    /// Parse a complete query and require the input to end after it.
    pub fn parse_query(&mut self) -> ParseResult<Query> {
        let query_type = match self.current_token.kind {
            TokenKind::List => QueryType::List,
            TokenKind::Table => QueryType::Table,
            TokenKind::Task => QueryType::Task,
            _ => return Err(self.unexpected("Expected LIST, TABLE or TASK")),
        };
        self.advance();

        let mut fields = vec![];
        if self.check(TokenKind::Identifier) {
            fields.push(self.parse_field_path()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                fields.push(self.parse_field_path()?);
            }
        }

        let from = if self.check(TokenKind::From) {
            Some(self.parse_from()?)
        } else {
            None
        };

        let where_clause = if self.check(TokenKind::Where) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        let group_by = if self.check(TokenKind::Group) {
            self.advance();
            self.expect(TokenKind::By)?;
            Some(self.parse_field_path()?)
        } else {
            None
        };

        let mut sort = vec![];
        if self.check(TokenKind::Sort) {
            self.advance();
            sort.push(self.parse_sort_key()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                sort.push(self.parse_sort_key()?);
            }
        }

        let limit = if self.check(TokenKind::Limit) {
            self.advance();
            Some(self.parse_limit()?)
        } else {
            None
        };

        if !self.check(TokenKind::Eof) {
            return Err(self.unexpected("Expected end of query"));
        }

        Ok(Query {
            query_type,
            fields,
            from,
            where_clause,
            group_by,
            sort,
            limit,
        })
    }

    /// `IDENTIFIER ('.' IDENTIFIER)*`. The lexer already folds most dots into
    /// the identifier text, so both forms end up here.
    fn parse_field_path(&mut self) -> ParseResult<FieldPath> {
        let first = self.expect(TokenKind::Identifier)?;
        let mut segments = split_path(&first)?;

        while self.check(TokenKind::Dot) {
            self.advance();
            let next = self.expect(TokenKind::Identifier)?;
            segments.extend(split_path(&next)?);
        }

        Ok(FieldPath(segments))
    }

    fn parse_from(&mut self) -> ParseResult<FromClause> {
        self.advance(); // consume FROM
        let mut from = FromClause::default();

        self.parse_source(&mut from)?;
        while self.check(TokenKind::And) || self.check(TokenKind::Or) {
            self.advance();
            self.parse_source(&mut from)?;
        }

        Ok(from)
    }

    fn parse_source(&mut self, from: &mut FromClause) -> ParseResult<()> {
        match self.current_token.kind {
            TokenKind::Tag => from.tags.push(self.advance().text),
            TokenKind::String => from.folders.push(self.advance().text),
            TokenKind::Link => from.links.from.push(self.advance().text),
            TokenKind::Identifier if self.current_token.text.eq_ignore_ascii_case("outgoing") => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let link = self.expect(TokenKind::Link)?;
                self.expect(TokenKind::RParen)?;
                from.links.to.push(link.text);
            }
            _ => return Err(self.unexpected("Expected #tag, \"folder\" or [[link]] after FROM")),
        }
        Ok(())
    }

    fn parse_sort_key(&mut self) -> ParseResult<SortKey> {
        let field = self.parse_field_path()?;
        let direction = match self.current_token.kind {
            TokenKind::Asc => {
                self.advance();
                SortDirection::Asc
            }
            TokenKind::Desc => {
                self.advance();
                SortDirection::Desc
            }
            _ => SortDirection::Asc,
        };
        Ok(SortKey { field, direction })
    }

    fn parse_limit(&mut self) -> ParseResult<usize> {
        let token = self.expect(TokenKind::Number)?;
        token.text.parse::<usize>().map_err(|_| {
            ParseError::new(
                format!("LIMIT expects a non-negative integer, found '{}'", token.text),
                token.position,
            )
        })
    }

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_and()?;

        while self.check(TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;

            left = Expression::Logical {
                operator: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_not()?;

        while self.check(TokenKind::And) {
            self.advance();
            let right = self.parse_not()?;

            left = Expression::Logical {
                operator: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expression> {
        if self.check(TokenKind::Not) {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.current_token.kind {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Identifier | TokenKind::Contains => {
                if self.is_function_call() {
                    let (name, args) = self.parse_function_call()?;
                    match self.parse_comparison_tail()? {
                        Some((operator, value)) => Ok(Expression::Comparison {
                            left: Operand::Function { name, args },
                            operator,
                            value: Box::new(value),
                        }),
                        None => Ok(Expression::FunctionCall { name, args }),
                    }
                } else {
                    let path = self.parse_field_path()?;
                    match self.parse_comparison_tail()? {
                        Some((operator, value)) => Ok(Expression::Comparison {
                            left: Operand::Field(path),
                            operator,
                            value: Box::new(value),
                        }),
                        None => Ok(Expression::FieldRef(path)),
                    }
                }
            }
            TokenKind::String | TokenKind::Number | TokenKind::Boolean => {
                Ok(Expression::Literal(self.parse_literal()?))
            }
            _ => Err(self.unexpected("Expected field, function call or '('")),
        }
    }

    /// A function name directly followed by `(`. `contains` lexes as a
    /// keyword but is also a function name.
    fn is_function_call(&self) -> bool {
        (self.check(TokenKind::Identifier) || self.check(TokenKind::Contains))
            && self
                .tokens
                .as_slice()
                .first()
                .is_some_and(|next| next.is(TokenKind::LParen))
    }

    fn parse_function_call(&mut self) -> ParseResult<(String, Vec<Expression>)> {
        if !self.is_function_call() {
            return Err(self.unexpected("Expected function call"));
        }
        let name = self.advance().text;
        self.expect(TokenKind::LParen)?;

        let mut args = vec![];
        if !self.check(TokenKind::RParen) {
            args.push(self.parse_argument()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                args.push(self.parse_argument()?);
            }
        }

        self.expect(TokenKind::RParen)?;
        Ok((name, args))
    }

    fn parse_argument(&mut self) -> ParseResult<Expression> {
        match self.current_token.kind {
            TokenKind::Identifier | TokenKind::Contains if self.is_function_call() => {
                let (name, args) = self.parse_function_call()?;
                Ok(Expression::FunctionCall { name, args })
            }
            TokenKind::Identifier => Ok(Expression::FieldRef(self.parse_field_path()?)),
            TokenKind::String
            | TokenKind::Number
            | TokenKind::Boolean
            | TokenKind::Tag
            | TokenKind::Link => Ok(Expression::Literal(self.parse_literal()?)),
            _ => Err(self.unexpected("Expected function argument")),
        }
    }

    fn parse_comparison_tail(&mut self) -> ParseResult<Option<(CompareOp, Expression)>> {
        let operator = match self.current_token.kind {
            TokenKind::Eq => CompareOp::Equal,
            TokenKind::NotEq => CompareOp::NotEqual,
            TokenKind::Gt => CompareOp::GreaterThan,
            TokenKind::Lt => CompareOp::LessThan,
            TokenKind::GtEq => CompareOp::GreaterEqual,
            TokenKind::LtEq => CompareOp::LessEqual,
            TokenKind::Contains => CompareOp::Contains,
            _ => return Ok(None),
        };
        self.advance();

        let value = match self.current_token.kind {
            TokenKind::Identifier | TokenKind::Contains if self.is_function_call() => {
                let (name, args) = self.parse_function_call()?;
                Expression::FunctionCall { name, args }
            }
            // A bare word on the right is taken literally: `status = done`
            TokenKind::Identifier => Expression::Literal(Value::String(self.advance().text)),
            TokenKind::String
            | TokenKind::Number
            | TokenKind::Boolean
            | TokenKind::Tag
            | TokenKind::Link => Expression::Literal(self.parse_literal()?),
            _ => return Err(self.unexpected(&format!("Expected value after '{}'", operator))),
        };

        Ok(Some((operator, value)))
    }

    fn parse_literal(&mut self) -> ParseResult<Value> {
        let token = self.advance();
        match token.kind {
            TokenKind::String | TokenKind::Tag | TokenKind::Link => Ok(Value::String(token.text)),
            TokenKind::Boolean => Ok(Value::Boolean(token.text == "true")),
            TokenKind::Number => parse_number(&token),
            kind => Err(ParseError::new(
                format!("Expected literal, found {}", kind),
                token.position,
            )),
        }
    }
}

fn parse_number(token: &Token) -> ParseResult<Value> {
    let invalid = || ParseError::new(format!("Invalid number '{}'", token.text), token.position);

    if token.text.contains('.') {
        token
            .text
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid())
    } else {
        token
            .text
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| invalid())
    }
}

fn split_path(token: &Token) -> ParseResult<Vec<String>> {
    let segments: Vec<String> = token.text.split('.').map(str::to_string).collect();
    if segments.iter().any(String::is_empty) {
        return Err(ParseError::new(
            format!("Invalid field path '{}'", token.text),
            token.position,
        ));
    }
    Ok(segments)
}

/// Lexes and parses `input` into a [`Query`].
///
/// # Examples
///
/// ```
/// use vaultql::{parse, QueryType};
///
/// let query = parse("TABLE status FROM #project SORT priority DESC LIMIT 5").unwrap();
/// assert_eq!(query.query_type, QueryType::Table);
/// assert_eq!(query.limit, Some(5));
///
/// let err = parse("LIST FROM").unwrap_err();
/// assert_eq!(err.position, 9);
/// ```
pub fn parse(input: &str) -> Result<Query, ParseError> {
    Parser::new(Lexer::new(input)).parse_query()
}
