/// Category of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Keyword,
    Number,
    Symbol,
    EndOfLine,
    EndOfInput,
    Error,
}

impl TokenKind {
    /// Short upper-case label used by the token dumper.
    pub fn label(self) -> &'static str {
        match self {
            TokenKind::Name => "NAME",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Number => "NUMBER",
            TokenKind::Symbol => "SYMBOL",
            TokenKind::EndOfLine => "EOL",
            TokenKind::EndOfInput => "EOI",
            TokenKind::Error => "ERROR",
        }
    }
}

/// An immutable `(kind, text)` pair.
///
/// Numbers keep their literal text (`"1.5e3f"`); the value is only read when
/// the interpreter evaluates the leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    kind: TokenKind,
    text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
        }
    }

    pub fn name(text: impl Into<String>) -> Self {
        Token::new(TokenKind::Name, text)
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Token::new(TokenKind::Keyword, text)
    }

    pub fn number(text: impl Into<String>) -> Self {
        Token::new(TokenKind::Number, text)
    }

    pub fn symbol(text: impl Into<String>) -> Self {
        Token::new(TokenKind::Symbol, text)
    }

    pub fn eol() -> Self {
        Token::new(TokenKind::EndOfLine, "\n")
    }

    pub fn eoi() -> Self {
        Token::new(TokenKind::EndOfInput, "")
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::EndOfLine => write!(f, "\\n"),
            TokenKind::EndOfInput => write!(f, "EOI"),
            _ => write!(f, "{}", self.text),
        }
    }
}
