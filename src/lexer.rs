use std::collections::HashSet;

use crate::token::{Token, TokenKind};

/// Scanner states. Each call to `scan` starts in `Ready` and returns as soon
/// as one token is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    InName,
    InNumber,
    InDecimal,
    InExponent,
    InSlash,
    InComment,
}

/// On-demand tokenizer for turtle programs.
///
/// The whole source is read up front and a single blank is appended, so every
/// token is terminated by a character and the final blank produces the
/// END-OF-INPUT token. The lexer remembers the last token it delivered and can
/// hand it out once more after `push_back`.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    token_line: usize,
    keywords: HashSet<String>,
    last: Option<Token>,
    pushed_back: bool,
}

impl Lexer {
    pub fn new<I, S>(source: &str, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chars: Vec<char> = source.chars().collect();
        chars.push(' ');
        Lexer {
            source: chars,
            pos: 0,
            line: 1,
            token_line: 1,
            keywords: keywords.into_iter().map(Into::into).collect(),
            last: None,
            pushed_back: false,
        }
    }

    /// Returns true while at least one more token can be delivered.
    pub fn has_next(&self) -> bool {
        self.pushed_back || self.pos < self.source.len()
    }

    /// Re-delivers the most recent token on the next call to `next_token`.
    ///
    /// Does nothing before the first token has been produced. Pushing back
    /// twice in a row still replays the token only once.
    pub fn push_back(&mut self) {
        if self.last.is_some() {
            self.pushed_back = true;
        }
    }

    /// 1-based line of the scan position.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based line on which the most recently delivered token starts. A
    /// pushed-back token keeps its line.
    pub fn token_line(&self) -> usize {
        self.token_line
    }

    /// Returns the next token.
    ///
    /// # Panics
    /// If the stream is exhausted; check `has_next` first.
    pub fn next_token(&mut self) -> Token {
        match self.next() {
            Some(token) => token,
            None => panic!("no tokens remain; callers must check has_next() first"),
        }
    }

    /// Drains the remaining tokens, END-OF-INPUT included.
    pub fn tokenize(&mut self) -> Vec<Token> {
        self.by_ref().collect()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    /// Returns the last consumed character to the input.
    fn back_up(&mut self) {
        self.pos -= 1;
        if self.source[self.pos] == '\n' {
            self.line -= 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.source.len()
    }

    fn name_or_keyword(&self, text: String) -> Token {
        if self.keywords.contains(&text) {
            Token::keyword(text)
        } else {
            Token::name(text)
        }
    }

    fn scan(&mut self) -> Option<Token> {
        let mut state = State::Ready;
        let mut text = String::new();

        while let Some(ch) = self.advance() {
            match state {
                State::Ready => {
                    if ch == '\n' {
                        self.token_line = self.line - 1;
                        return Some(Token::eol());
                    }
                    if ch.is_whitespace() {
                        if self.at_end() {
                            self.token_line = self.line;
                            return Some(Token::eoi());
                        }
                        continue;
                    }
                    self.token_line = self.line;
                    text.push(ch);
                    state = if is_name_start(ch) {
                        State::InName
                    } else if ch.is_ascii_digit() {
                        State::InNumber
                    } else if ch == '.' {
                        State::InDecimal
                    } else if ch == '/' {
                        State::InSlash
                    } else {
                        return Some(Token::symbol(text));
                    };
                }
                State::InSlash => {
                    if ch == '/' {
                        state = State::InComment;
                    } else {
                        self.back_up();
                        return Some(Token::symbol(text));
                    }
                }
                State::InComment => {
                    if ch == '\n' {
                        return Some(Token::eol());
                    }
                    if self.at_end() {
                        return Some(Token::eoi());
                    }
                }
                State::InName => {
                    if is_name_part(ch) {
                        text.push(ch);
                    } else {
                        self.back_up();
                        return Some(self.name_or_keyword(text));
                    }
                }
                State::InNumber => match ch {
                    c if c.is_ascii_digit() => text.push(c),
                    '.' => {
                        text.push(ch);
                        state = State::InDecimal;
                    }
                    'e' | 'E' => {
                        text.push(ch);
                        state = State::InExponent;
                    }
                    c if is_suffix(c) => {
                        text.push(c);
                        return Some(Token::number(text));
                    }
                    _ => {
                        self.back_up();
                        return Some(Token::number(text));
                    }
                },
                State::InDecimal => match ch {
                    c if c.is_ascii_digit() => text.push(c),
                    'e' | 'E' if text != "." => {
                        text.push(ch);
                        state = State::InExponent;
                    }
                    c if is_suffix(c) => {
                        text.push(c);
                        return Some(finish_suffixed(text));
                    }
                    _ => {
                        self.back_up();
                        return Some(if text == "." {
                            Token::symbol(text)
                        } else {
                            Token::number(text)
                        });
                    }
                },
                State::InExponent => match ch {
                    c if c.is_ascii_digit() => text.push(c),
                    c if is_suffix(c) => {
                        text.push(c);
                        return Some(finish_suffixed(text));
                    }
                    '+' | '-' => {
                        let after_marker = ends_with_marker(&text);
                        text.push(ch);
                        if !after_marker {
                            return Some(Token::new(TokenKind::Error, text));
                        }
                    }
                    _ => {
                        self.back_up();
                        return Some(if ends_with_marker(&text) {
                            Token::new(TokenKind::Error, text)
                        } else {
                            Token::number(text)
                        });
                    }
                },
            }
        }

        None
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.pushed_back {
            self.pushed_back = false;
            return self.last.clone();
        }
        let token = self.scan()?;
        self.last = Some(token.clone());
        Some(token)
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_name_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Single/double precision suffixes accepted after a numeric literal.
fn is_suffix(ch: char) -> bool {
    matches!(ch, 'f' | 'F' | 'd' | 'D')
}

fn ends_with_marker(text: &str) -> bool {
    text.ends_with(['e', 'E'])
}

/// A suffix must follow a digit: `1.5f` is a number, `1.f` and `1e+f` are not.
fn finish_suffixed(text: String) -> Token {
    let mut chars = text.chars().rev();
    chars.next();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => Token::number(text),
        _ => Token::new(TokenKind::Error, text),
    }
}
