//! Lexical scanner: turns a byte-oriented source buffer into a lazy sequence
//! of [`Token`]s, one `scan_token()` call at a time.
//!
//! The scanner never buffers more than the lexeme currently being built
//! (`start..current`); the one-token lookahead pair lives in the compiler,
//! not here.

use crate::token::{Token, TokenKind};

pub struct Scanner<'src> {
    source: &'src str,
    bytes: &'src [u8],
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Scanner<'src> {
    /// Resets start, current, and line to begin scanning `source`.
    ///
    /// Callers guarantee `source` outlives the scan and is ASCII-compatible
    /// byte-oriented text; other source encodings are not supported.
    pub fn new(source: &'src str) -> Self {
        Scanner {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.current]
        }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.bytes.len() {
            0
        } else {
            self.bytes[self.current + 1]
        }
    }

    fn advance(&mut self) -> u8 {
        let c = self.bytes[self.current];
        self.current += 1;
        c
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.bytes[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token::from_source(kind, self.source, self.start, self.current - self.start, self.line)
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token::error(message, self.source, self.line)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' => {
                    self.advance();
                }
                b'\n' => {
                    self.line += 1;
                    self.advance();
                }
                b'/' => {
                    if self.peek_next() == b'/' {
                        while self.peek() != b'\n' && !self.is_at_end() {
                            self.advance();
                        }
                    } else {
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    /// Produces the next token. Deterministic and pure with respect to
    /// scanner state. Idempotent once `Eof` has been returned: further
    /// calls keep returning `Eof` since `current` never regresses past the
    /// end of the buffer.
    pub fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace_and_comments();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof);
        }

        let c = self.advance();

        if is_alpha(c) {
            return self.identifier();
        }
        if is_digit(c) {
            return self.number();
        }

        match c {
            b'(' => self.make_token(TokenKind::LeftParen),
            b')' => self.make_token(TokenKind::RightParen),
            b'{' => self.make_token(TokenKind::LeftBrace),
            b'}' => self.make_token(TokenKind::RightBrace),
            b';' => self.make_token(TokenKind::Semicolon),
            b',' => self.make_token(TokenKind::Comma),
            b'.' => self.make_token(TokenKind::Dot),
            b'-' => self.make_token(TokenKind::Minus),
            b'+' => self.make_token(TokenKind::Plus),
            b'/' => self.make_token(TokenKind::Slash),
            b'*' => self.make_token(TokenKind::Star),
            b'!' => {
                let kind = if self.matches(b'=') { TokenKind::BangEqual } else { TokenKind::Bang };
                self.make_token(kind)
            }
            b'=' => {
                let kind = if self.matches(b'=') { TokenKind::EqualEqual } else { TokenKind::Equal };
                self.make_token(kind)
            }
            b'<' => {
                let kind = if self.matches(b'=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.make_token(kind)
            }
            b'>' => {
                let kind = if self.matches(b'=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.make_token(kind)
            }
            b'|' => {
                if self.matches(b'|') {
                    self.make_token(TokenKind::Or)
                } else {
                    self.error_token("Invalid operator. Did you mean '||'?")
                }
            }
            b'&' => {
                if self.matches(b'&') {
                    self.make_token(TokenKind::And)
                } else {
                    self.error_token("Invalid operator. Did you mean '&&'?")
                }
            }
            b'"' => self.string(),
            _ => self.error_token("Unexpected character"),
        }
    }

    fn string(&mut self) -> Token<'src> {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            return self.error_token("Unterminated string");
        }
        self.advance(); // closing quote
        self.make_token(TokenKind::String)
    }

    fn consume_digits(&mut self) {
        while is_digit(self.peek()) {
            self.advance();
        }
    }

    fn number(&mut self) -> Token<'src> {
        self.consume_digits();

        if self.peek() == b'.' && is_digit(self.peek_next()) {
            self.advance();
            self.consume_digits();
        }

        if self.peek() == b'e' && is_digit(self.peek_next()) {
            self.advance();
            self.consume_digits();
        }

        self.make_token(TokenKind::Number)
    }

    /// Classifies the just-scanned identifier via the hand-rolled
    /// first-letter trie. Faithfully reproduces the `t` branch's
    /// fall-through into the `v` branch for any `tX` identifier where `X`
    /// is neither `h` nor `r` — a known quirk of the classic C switch this
    /// trie is modeled on, kept (and documented) rather than fixed.
    fn identifier(&mut self) -> Token<'src> {
        while is_alpha(self.peek()) || is_digit(self.peek()) {
            self.advance();
        }
        let text = &self.source[self.start..self.current];
        self.make_token(identifier_kind(text))
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

fn rest_matches(text: &str, start: usize, rest: &str) -> bool {
    text.len() == start + rest.len() && &text[start..] == rest
}

fn identifier_kind(text: &str) -> TokenKind {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return TokenKind::Identifier;
    }
    match bytes[0] {
        b'a' if rest_matches(text, 1, "nd") => TokenKind::And,
        b'c' if rest_matches(text, 1, "lass") => TokenKind::Class,
        b'e' if rest_matches(text, 1, "lse") => TokenKind::Else,
        b'f' if text.len() > 1 => match bytes[1] {
            b'a' if rest_matches(text, 2, "lse") => TokenKind::False,
            b'o' if rest_matches(text, 2, "r") => TokenKind::For,
            b'u' if rest_matches(text, 2, "n") => TokenKind::Fun,
            _ => TokenKind::Identifier,
        },
        b'i' if rest_matches(text, 1, "f") => TokenKind::If,
        b'n' if rest_matches(text, 1, "il") => TokenKind::Nil,
        b'o' if rest_matches(text, 1, "r") => TokenKind::Or,
        b'p' if rest_matches(text, 1, "rint") => TokenKind::Print,
        b'r' if rest_matches(text, 1, "eturn") => TokenKind::Return,
        b's' if rest_matches(text, 1, "uper") => TokenKind::Super,
        // `t` falls through to `v` when the second letter isn't `h`/`r`,
        // exactly like the original C `identifierType()` switch (missing
        // `break` between `case 't':` and `case 'v':`).
        b't' | b'v' => {
            if bytes[0] == b't' && text.len() > 1 {
                match bytes[1] {
                    // Immediate return, match or not: the original's inner
                    // `case 'h'`/`case 'r'` each `return` outright.
                    b'h' => return if rest_matches(text, 2, "is") { TokenKind::This } else { TokenKind::Identifier },
                    b'r' => return if rest_matches(text, 2, "ue") { TokenKind::True } else { TokenKind::Identifier },
                    _ => {}
                }
            }
            if rest_matches(text, 1, "ar") {
                TokenKind::Var
            } else {
                TokenKind::Identifier
            }
        }
        b'w' if rest_matches(text, 1, "hile") => TokenKind::While,
        _ => TokenKind::Identifier,
    }
}
