use turtle_logo::{Lexer, Token, TokenKind};

/// Prints a token stream one token per line, tagged with its source line.
pub struct TokenDumper {
    pub color: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self { color: true }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const RED: &'static str = "\x1b[31m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    /// Drains `lexer`, printing every token up to and including END-OF-INPUT.
    pub fn dump(&self, lexer: &mut Lexer) {
        while lexer.has_next() {
            let token = lexer.next_token();
            println!("{}", self.format_one(lexer.token_line(), &token));
        }
    }

    fn format_one(&self, line: usize, token: &Token) -> String {
        let (colr, reset) = if self.color {
            (Self::color(token.kind()), Self::RESET)
        } else {
            ("", "")
        };
        format!(
            "[{:03}] {}{:<8} {}{}",
            line,
            colr,
            token.kind().label(),
            token,
            reset
        )
    }

    fn color(kind: TokenKind) -> &'static str {
        match kind {
            TokenKind::EndOfLine | TokenKind::EndOfInput => Self::DIM,
            TokenKind::Number => Self::CYN,
            TokenKind::Name => Self::YEL,
            TokenKind::Keyword => Self::BLU,
            TokenKind::Symbol => Self::MAG,
            TokenKind::Error => Self::RED,
        }
    }
}
