use std::fmt;

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Query types
    /// `LIST`
    List,
    /// `TABLE`
    Table,
    /// `TASK`
    Task,

    // Clauses
    /// `FROM`
    From,
    /// `WHERE`
    Where,
    /// `SORT`
    Sort,
    /// `LIMIT`
    Limit,
    /// `GROUP`
    Group,
    /// `BY`
    By,
    /// `ASC`
    Asc,
    /// `DESC`
    Desc,

    // Logical
    /// Logical AND (word, case-insensitive)
    And,
    /// Logical OR (word, case-insensitive)
    Or,
    /// `NOT` or a bare `!`
    Not,
    /// `CONTAINS`
    Contains,

    // Literals
    /// Quoted string, single or double quotes
    ///
    /// # Examples
    /// ```text
    /// "Work/Projects"
    /// 'done'
    /// ```
    String,

    /// Number with optional leading `-` and decimal point
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -3
    /// 2.5
    /// ```
    Number,

    /// `true` / `false`
    Boolean,

    /// Tag reference; the token text carries the tag without `#`
    ///
    /// # Examples
    /// ```text
    /// #project
    /// #area/work
    /// ```
    Tag,

    /// Wiki link; the token text is the text between `[[` and `]]`
    ///
    /// # Examples
    /// ```text
    /// [[Weekly Review]]
    /// ```
    Link,

    /// Field name or function name
    ///
    /// Starts with a letter or underscore, followed by letters, digits,
    /// `_`, `-` or `.`.
    ///
    /// # Examples
    /// ```text
    /// priority
    /// file.name
    /// due-date
    /// ```
    Identifier,

    // Punctuation
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `.`
    Dot,

    // Comparison
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    GtEq,
    /// `<=`
    LtEq,

    /// End of input
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::List => "LIST",
            TokenKind::Table => "TABLE",
            TokenKind::Task => "TASK",
            TokenKind::From => "FROM",
            TokenKind::Where => "WHERE",
            TokenKind::Sort => "SORT",
            TokenKind::Limit => "LIMIT",
            TokenKind::Group => "GROUP",
            TokenKind::By => "BY",
            TokenKind::Asc => "ASC",
            TokenKind::Desc => "DESC",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Contains => "CONTAINS",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Boolean => "boolean",
            TokenKind::Tag => "tag",
            TokenKind::Link => "link",
            TokenKind::Identifier => "identifier",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Eq => "'='",
            TokenKind::NotEq => "'!='",
            TokenKind::Gt => "'>'",
            TokenKind::Lt => "'<'",
            TokenKind::GtEq => "'>='",
            TokenKind::LtEq => "'<='",
            TokenKind::Eof => "end of input",
        };
        f.write_str(name)
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Token text. For strings, tags and links this is the unwrapped content.
    pub text: String,
    /// Character offset of the token's first character in the source.
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
