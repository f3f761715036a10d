//! The Pratt-style single-pass compiler: parses tokens from a [`Scanner`]
//! and emits bytecode directly into a [`Chunk`], with no intermediate AST.

use std::fmt;

use crate::chunk::{Chunk, OpCode};
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};
use crate::value::Value;
use crate::vm::Vm;

/// A single compile-time diagnostic. Plain data — compile never throws;
/// diagnostics accumulate and are reported after the fact.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub line: u32,
    pub message: String,
    qualifier: Qualifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Qualifier {
    /// `Error` tokens carry no location qualifier.
    None,
    /// EOF: `"Error"` immediately followed by `"at end"` — no space. This
    /// reproduces the original's missing-space quirk byte-for-byte; kept
    /// for byte-level compatibility with existing diagnostic-format tests.
    AtEnd,
    AtLexeme(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.qualifier {
            Qualifier::None => {}
            Qualifier::AtEnd => write!(f, "at end")?,
            Qualifier::AtLexeme(lexeme) => write!(f, " at '{lexeme}'")?,
        }
        write!(f, ": {}", self.message)
    }
}

/// Ten precedence levels, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn one_higher(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }
}

/// A tagged handler identifier rather than a function pointer, so the rule
/// table stays a plain data table instead of holding indirect calls.
/// Dispatched through a single `match` in [`Compiler::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseFn {
    None,
    Grouping,
    Unary,
    Binary,
    Number,
    StringLit,
    Literal,
    Variable,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    prefix: ParseFn,
    infix: ParseFn,
    precedence: Precedence,
}

const fn rule(prefix: ParseFn, infix: ParseFn, precedence: Precedence) -> Rule {
    Rule { prefix, infix, precedence }
}

/// Rule table. `Equal`'s infix handler is conventionally `Binary` with
/// precedence `None` in a table modeled closely on this one, but that
/// combination can never be reached by `parse_precedence` (no caller ever
/// parses at a precedence `<= None` other than the top-level
/// `parse_precedence(Assignment)` loop condition, which excludes it). We
/// therefore give `Equal` no handlers at all; a loose `=` still surfaces
/// as "Invalid assignment target" via the `can_assign` check in
/// `parse_precedence`, or as "Expected expression" if it appears in prefix
/// position — matching observable behavior either way.
fn get_rule(kind: TokenKind) -> Rule {
    use Precedence::*;
    use TokenKind::*;
    match kind {
        LeftParen => rule(ParseFn::Grouping, ParseFn::None, None),
        RightParen => rule(ParseFn::None, ParseFn::None, None),
        LeftBrace => rule(ParseFn::None, ParseFn::None, None),
        RightBrace => rule(ParseFn::None, ParseFn::None, None),
        Comma => rule(ParseFn::None, ParseFn::None, None),
        Dot => rule(ParseFn::None, ParseFn::None, None),
        Minus => rule(ParseFn::Unary, ParseFn::Binary, Term),
        Plus => rule(ParseFn::None, ParseFn::Binary, Term),
        Semicolon => rule(ParseFn::None, ParseFn::None, None),
        Slash => rule(ParseFn::None, ParseFn::Binary, Factor),
        Star => rule(ParseFn::None, ParseFn::Binary, Factor),
        Bang => rule(ParseFn::Unary, ParseFn::None, None),
        BangEqual => rule(ParseFn::None, ParseFn::Binary, Equality),
        Equal => rule(ParseFn::None, ParseFn::None, None),
        EqualEqual => rule(ParseFn::None, ParseFn::Binary, Equality),
        Greater => rule(ParseFn::None, ParseFn::Binary, Comparison),
        GreaterEqual => rule(ParseFn::None, ParseFn::Binary, Comparison),
        Less => rule(ParseFn::None, ParseFn::Binary, Comparison),
        LessEqual => rule(ParseFn::None, ParseFn::Binary, Comparison),
        Identifier => rule(ParseFn::Variable, ParseFn::None, None),
        String => rule(ParseFn::StringLit, ParseFn::None, None),
        Number => rule(ParseFn::Number, ParseFn::None, None),
        And | Class | Else | For | Fun | If | Or | Print | Return | Super | This | Var | While => {
            rule(ParseFn::None, ParseFn::None, None)
        }
        False | Nil | True => rule(ParseFn::Literal, ParseFn::None, None),
        Error | Eof => rule(ParseFn::None, ParseFn::None, None),
    }
}

/// Tokens that begin a statement; used to re-synchronise after a parse
/// error.
fn is_statement_boundary(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Class
            | TokenKind::Fun
            | TokenKind::Var
            | TokenKind::For
            | TokenKind::If
            | TokenKind::While
            | TokenKind::Print
            | TokenKind::Return
    )
}

struct Parser<'src> {
    previous: Token<'src>,
    current: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    diagnostics: Vec<CompileError>,
}

pub struct Compiler<'src, 'chunk, 'vm> {
    scanner: Scanner<'src>,
    parser: Parser<'src>,
    chunk: &'chunk mut Chunk,
    vm: &'vm mut Vm,
}

/// Compiles `source` into `chunk`, using `vm` to intern string constants.
/// Returns `true` iff no error was reported. On `false`, `chunk` may
/// contain partial output and must not be executed. Diagnostics are
/// returned rather than printed directly — each one's exact wire format
/// is reconstructed by its `Display` impl, and the caller (the CLI shell,
/// or a test) decides where that text goes.
pub fn compile(source: &str, chunk: &mut Chunk, vm: &mut Vm) -> (bool, Vec<CompileError>) {
    let compiler = Compiler::new(source, chunk, vm);
    compiler.run()
}

impl<'src, 'chunk, 'vm> Compiler<'src, 'chunk, 'vm> {
    fn new(source: &'src str, chunk: &'chunk mut Chunk, vm: &'vm mut Vm) -> Self {
        let scanner = Scanner::new(source);
        // Both slots start out as the same sentinel; neither is ever read
        // before the first `advance()` call in `run()` overwrites `current`
        // with the real first token (and shuffles this sentinel into
        // `previous`, where it stays unread until a real token follows it).
        let sentinel = Token::error("<before first token>", source, 1);
        Compiler {
            scanner,
            parser: Parser {
                previous: sentinel,
                current: sentinel,
                had_error: false,
                panic_mode: false,
                diagnostics: Vec::new(),
            },
            chunk,
            vm,
        }
    }

    fn run(mut self) -> (bool, Vec<CompileError>) {
        tracing::trace!("compile started");
        // Primes `current` with the first real token, skipping and
        // reporting any leading `Error` tokens exactly like every other
        // `advance()` call.
        self.advance();
        while !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::Eof, "Expected end of input");
        self.end_compiler();
        tracing::debug!(had_error = self.parser.had_error, constants = self.chunk.constants().len(), "compile finished");
        (!self.parser.had_error, self.parser.diagnostics)
    }

    // ---------------------------------------------------------------- core

    fn advance(&mut self) {
        self.parser.previous = self.parser.current;
        loop {
            self.parser.current = self.scanner.scan_token();
            if self.parser.current.kind != TokenKind::Error {
                break;
            }
            self.error_at_current(self.parser.current.text());
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.parser.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.parser.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn error(&mut self, message: &str) {
        let token = self.parser.previous;
        self.error_at(token, message);
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.parser.current;
        self.error_at(token, message);
    }

    /// No-op while panic mode is set. Otherwise records a [`CompileError`],
    /// logs it, and sets both sticky flags.
    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.parser.panic_mode {
            return;
        }
        self.parser.panic_mode = true;
        self.parser.had_error = true;

        let qualifier = match token.kind {
            TokenKind::Eof => Qualifier::AtEnd,
            TokenKind::Error => Qualifier::None,
            _ => Qualifier::AtLexeme(token.text().to_string()),
        };
        let diagnostic = CompileError { line: token.line, message: message.to_string(), qualifier };
        tracing::warn!(line = token.line, message, "compile error");
        self.parser.diagnostics.push(diagnostic);
    }

    /// Discards tokens until just after a `;`, or until the current token
    /// starts a new statement, or EOF. Clears panic mode on entry.
    fn synchronize(&mut self) {
        tracing::trace!(line = self.parser.current.line, "synchronizing after parse error");
        self.parser.panic_mode = false;
        while self.parser.current.kind != TokenKind::Eof {
            if self.parser.previous.kind == TokenKind::Semicolon {
                return;
            }
            if is_statement_boundary(self.parser.current.kind) {
                return;
            }
            self.advance();
        }
    }

    fn current_line(&self) -> u32 {
        self.parser.previous.line
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.current_line();
        self.chunk.write_byte(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    fn emit_ops(&mut self, a: OpCode, b: OpCode) {
        self.emit_op(a);
        self.emit_op(b);
    }

    fn emit_return(&mut self) {
        self.emit_op(OpCode::Return);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk.add_constant(value) {
            Some(index) => index,
            None => {
                self.error("Too many constants in one chunk");
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op(OpCode::Constant);
        self.emit_byte(index);
    }

    fn end_compiler(&mut self) {
        self.emit_return();
    }

    // ------------------------------------------------------------- grammar

    fn declaration(&mut self) {
        if self.matches(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.parser.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expected variable name");
        if self.matches(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expected ';' after variable declaration");
        self.emit_op(OpCode::DefineGlobal);
        self.emit_byte(global);
    }

    fn statement(&mut self) {
        if self.matches(TokenKind::Print) {
            self.print_statement();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expected ';' after expression");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression");
        self.emit_op(OpCode::Pop);
    }

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_variable(&mut self, error_message: &str) -> u8 {
        self.consume(TokenKind::Identifier, error_message);
        self.identifier_constant(self.parser.previous)
    }

    fn identifier_constant(&mut self, name: Token<'src>) -> u8 {
        let text = name.text();
        // The identifier's own bytes (no surrounding quotes to strip, unlike
        // string literals) become a constant-pool string, interned like any
        // other string value.
        let interned = self.vm.intern(text.as_bytes());
        self.make_constant(Value::Obj(interned))
    }

    /// The core Pratt loop.
    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;

        let prefix = get_rule(self.parser.previous.kind).prefix;
        if prefix == ParseFn::None {
            self.error("Expected expression");
            return;
        }
        self.apply(prefix, can_assign);

        while precedence <= get_rule(self.parser.current.kind).precedence {
            self.advance();
            let infix = get_rule(self.parser.previous.kind).infix;
            self.apply(infix, can_assign);
        }

        if can_assign && self.matches(TokenKind::Equal) {
            self.error("Invalid assignment target");
        }
    }

    /// Single dispatch switch over the tagged handler, replacing a
    /// function-pointer table.
    fn apply(&mut self, parse_fn: ParseFn, can_assign: bool) {
        match parse_fn {
            ParseFn::None => unreachable!("apply called with ParseFn::None"),
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::StringLit => self.string(),
            ParseFn::Literal => self.literal(),
            ParseFn::Variable => self.variable(can_assign),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expected ')' after expression");
    }

    fn number(&mut self) {
        let text = self.parser.previous.text();
        let value: f64 = text.parse().expect("scanner only ever produces well-formed number lexemes");
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self) {
        let lexeme = self.parser.previous.text();
        debug_assert!(lexeme.len() >= 2);
        let contents = &lexeme.as_bytes()[1..lexeme.len() - 1];
        let interned = self.vm.intern(contents);
        self.emit_constant(Value::Obj(interned));
    }

    fn literal(&mut self) {
        match self.parser.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            _ => unreachable!(),
        }
    }

    fn unary(&mut self) {
        let operator = self.parser.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Bang => self.emit_op(OpCode::Not),
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self) {
        let operator = self.parser.previous.kind;
        let rule = get_rule(operator);
        self.parse_precedence(rule.precedence.one_higher());
        match operator {
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            _ => unreachable!(),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.parser.previous;
        let arg = self.identifier_constant(name);
        if can_assign && self.matches(TokenKind::Equal) {
            self.expression();
            self.emit_op(OpCode::SetGlobal);
            self.emit_byte(arg);
        } else {
            self.emit_op(OpCode::GetGlobal);
            self.emit_byte(arg);
        }
    }
}

#[cfg(test)]
mod tests;
