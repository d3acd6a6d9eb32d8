//! Lexer: turns source text into a flat token stream.
//!
//! Mirrors `original_source/src/interpreter/lexer.c`'s two-mode state
//! machine: `Mode::Any` tokenizes expressions/keywords/operators, while
//! `Mode::ShellArgList` accumulates bare words as `TextLit` tokens until it
//! hits something that only makes sense outside a command argument list
//! (newline, `}`, `;`, `|`, `<`, `>`, `&`, EOF), at which point it hands
//! control back to `Mode::Any`.

use crate::token::{keyword_lookup, Position, Span, Token, TokenType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Any,
    ShellArgList,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    start: usize,
    pos: usize,
    line: usize,
    had_error: bool,
    tokens: Vec<Token>,
    errors: Vec<String>,
    mode: Mode,
    /// One entry per currently open `(`, recording whether the mode was
    /// `ShellArgList` at the moment it was opened. On the matching `)` we pop
    /// and restore that mode — mirrors the original's recursive
    /// `lex_lparen`/`lex_rparen`, where a parenthesized subshell or call
    /// embedded in a command's argument list is lexed entirely in `Any` mode
    /// and control returns to accumulating shell words only once its own
    /// closing paren is consumed.
    paren_stack: Vec<bool>,
}

pub struct LexResult {
    pub tokens: Vec<Token>,
    pub had_error: bool,
    pub errors: Vec<String>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
            had_error: false,
            tokens: Vec::new(),
            errors: Vec::new(),
            mode: Mode::Any,
            paren_stack: Vec::new(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> u8 {
        if self.at_end() { 0 } else { self.input[self.pos] }
    }

    fn peek_ahead(&self, n: usize) -> u8 {
        let i = self.pos + n;
        if i >= self.input.len() { 0 } else { self.input[i] }
    }

    fn advance(&mut self) -> u8 {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn matches(&mut self, c: u8) -> bool {
        if self.peek() == c {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn lexeme(&self) -> &'a str {
        std::str::from_utf8(&self.input[self.start..self.pos]).unwrap_or("")
    }

    fn emit(&mut self, kind: TokenType) {
        let span = Span::new(self.start, self.pos);
        let lexeme = self.lexeme().to_string();
        self.tokens.push(Token::new(kind, lexeme, self.line, span));
    }

    fn emit_text(&mut self) {
        // Flushes whatever has been scanned so far as a bare TextLit word,
        // used when `ShellArgList` hits a delimiter without having emitted
        // anything yet for the current run.
        if self.pos > self.start {
            self.emit(TokenType::TextLit);
        }
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.had_error = true;
        self.errors.push(format!("[line {}]: {}", self.line, msg.into()));
    }

    fn is_numeric(c: u8) -> bool {
        c.is_ascii_digit()
    }

    fn is_valid_ident_char(c: u8) -> bool {
        c.is_ascii_alphanumeric() || c == b'_' || c == b'-'
    }

    fn is_alpha(c: u8) -> bool {
        c.is_ascii_alphabetic() || c == b'_'
    }

    pub fn lex(mut self) -> LexResult {
        loop {
            self.start = self.pos;
            if self.at_end() {
                self.emit(TokenType::Eof);
                break;
            }
            match self.mode {
                Mode::Any => self.lex_any(),
                Mode::ShellArgList => self.lex_shell_arg_list(),
            }
        }
        LexResult { tokens: self.tokens, had_error: self.had_error, errors: self.errors }
    }

    /// Restores the mode that was active when the paren just closed was
    /// opened: `ShellArgList` if it was opened mid shell-argument-list
    /// (resume accumulating words, as the original's `lex_shell_arg_list`
    /// does after calling `lex_lparen`), `Any` otherwise (as
    /// `lex_rparen`'s `STATE_FN(lex_any)` does). An unmatched `)` leaves
    /// `Any` mode in place.
    fn close_paren(&mut self) {
        let was_shell_arg_list = self.paren_stack.pop().unwrap_or(false);
        self.mode = if was_shell_arg_list { Mode::ShellArgList } else { Mode::Any };
    }

    fn lex_any(&mut self) {
        let c = self.advance();
        use TokenType::*;
        match c {
            b' ' | b'\t' | 0x0b => {}
            b';' | b'\n' => {
                if c == b'\n' {
                    self.line += 1;
                }
                self.emit(Newline);
            }
            b'(' => {
                // `lex_any` only runs while `mode == Any`, so a `(` reached
                // here was never opened from inside a shell argument list.
                self.emit(LParen);
                self.paren_stack.push(false);
            }
            b')' => {
                self.emit(RParen);
                self.close_paren();
            }
            b'[' => self.emit(LBracket),
            b']' => self.emit(RBracket),
            b'{' => self.emit(LBrace),
            b'}' => self.emit(RBrace),
            b',' => self.emit(Comma),
            b':' => self.emit(Colon),
            b'`' => self.emit(Backtick),
            b'=' => {
                if self.matches(b'=') { self.emit(EqualEqual) } else { self.emit(Equal) }
            }
            b'&' => {
                if self.matches(b'&') { self.emit(AmpAmp) } else { self.emit(Amp) }
            }
            b'|' => {
                if self.matches(b'|') { self.emit(PipePipe) } else { self.emit(Pipe) }
            }
            b'!' => {
                if self.matches(b'=') { self.emit(BangEqual) } else { self.emit(Bang) }
            }
            b'>' => {
                if self.matches(b'=') {
                    self.emit(GreaterEqual)
                } else if self.matches(b'>') {
                    self.emit(GreaterGreater)
                } else {
                    self.emit(Greater)
                }
            }
            b'<' => {
                if self.matches(b'=') { self.emit(LessEqual) } else { self.emit(Less) }
            }
            b'.' => {
                if self.peek() == b'/' {
                    self.emit(Dot);
                    self.mode = Mode::ShellArgList;
                } else if self.matches(b'.') {
                    self.emit(DotDot);
                } else {
                    self.emit(Dot);
                }
            }
            b'@' => {
                if self.matches(b'[') { self.emit(AtLBracket) } else { self.emit(At) }
            }
            b'+' => {
                if self.matches(b'=') { self.emit(PlusEqual) } else { self.emit(Plus) }
            }
            b'-' => {
                if self.matches(b'=') { self.emit(MinusEqual) } else { self.emit(Minus) }
            }
            b'%' => {
                if self.matches(b'=') { self.emit(PercentEqual) } else { self.emit(Percent) }
            }
            b'/' => {
                if self.matches(b'/') {
                    if self.matches(b'=') { self.emit(SlashSlashEqual) } else { self.emit(SlashSlash) }
                } else if self.matches(b'=') {
                    self.emit(SlashEqual)
                } else {
                    self.emit(Slash)
                }
            }
            b'*' => {
                if self.matches(b'*') {
                    if self.matches(b'=') { self.emit(StarStarEqual) } else { self.emit(StarStar) }
                } else if self.matches(b'=') {
                    self.emit(StarEqual)
                } else {
                    self.emit(Star)
                }
            }
            b'$' => self.lex_access(),
            b'"' | b'\'' => self.lex_string(c),
            b'#' => self.lex_comment(),
            _ => {
                if Self::is_numeric(c) {
                    self.lex_number();
                } else if Self::is_alpha(c) {
                    self.lex_identifier();
                } else {
                    self.error(format!("Unrecognized character '{}'", c as char));
                }
            }
        }
    }

    fn lex_shell_arg_list(&mut self) {
        let c = self.peek();
        use TokenType::*;
        match c {
            b' ' | b'\t' | 0x0b => {
                self.emit_text();
                while matches!(self.peek(), b' ' | b'\t' | 0x0b) {
                    self.advance();
                }
                self.start = self.pos;
            }
            b'$' => {
                self.emit_text();
                self.start = self.pos;
                self.advance();
                self.lex_access();
            }
            b'"' | b'\'' => {
                self.emit_text();
                self.start = self.pos;
                let q = self.advance();
                self.lex_string(q);
            }
            b'(' => {
                self.emit_text();
                self.start = self.pos;
                self.advance();
                self.emit(LParen);
                self.paren_stack.push(true);
                self.mode = Mode::Any;
            }
            b')' => {
                self.emit_text();
                self.start = self.pos;
                self.advance();
                self.emit(RParen);
                self.close_paren();
            }
            b'\n' | b'}' | b';' | b'|' | b'<' | b'>' | b'&' => {
                self.emit_text();
                self.mode = Mode::Any;
            }
            0 if self.at_end() => {
                self.emit_text();
                self.mode = Mode::Any;
            }
            _ => {
                self.advance();
            }
        }
    }

    fn lex_number(&mut self) {
        // optional base prefix
        if self.peek() == b'0' && matches!(self.peek_ahead(1), b'x' | b'b' | b'B') {
            // handled by the default decimal path above already consuming the
            // leading digit; re-derive base from the lookahead.
        }
        if self.input[self.start] == b'0' && matches!(self.peek(), b'x' | b'b' | b'B') {
            let marker = self.peek();
            self.advance();
            let digit_ok: fn(u8) -> bool = if marker == b'x' {
                |c| c.is_ascii_hexdigit()
            } else {
                |c| c == b'0' || c == b'1'
            };
            let mut any = false;
            while digit_ok(self.peek()) || self.peek() == b'_' {
                if self.peek() != b'_' {
                    any = true;
                }
                self.advance();
            }
            if !any {
                self.error("Malformed numeric literal");
            }
            self.emit(TokenType::Num);
            return;
        }
        while Self::is_numeric(self.peek()) || self.peek() == b'_' {
            self.advance();
        }
        if self.peek() == b'.' && self.peek_ahead(1) != b'.' && Self::is_numeric(self.peek_ahead(1)) {
            self.advance();
            while Self::is_numeric(self.peek()) || self.peek() == b'_' {
                self.advance();
            }
        }
        self.emit(TokenType::Num);
    }

    fn lex_identifier(&mut self) {
        while Self::is_valid_ident_char(self.peek()) {
            self.advance();
        }
        let word = self.lexeme();
        if let Some(kw) = keyword_lookup(word) {
            self.emit(kw);
            return;
        }
        let prev_allows_ident = matches!(
            self.tokens.last().map(|t| t.kind),
            Some(
                TokenType::Var
                    | TokenType::Loop
                    | TokenType::Comma
                    | TokenType::As
                    | TokenType::Equal
                    | TokenType::Func
            )
        );
        if prev_allows_ident {
            self.emit(TokenType::Ident);
        } else {
            self.emit(TokenType::TextLit);
            self.mode = Mode::ShellArgList;
        }
    }

    fn lex_access(&mut self) {
        // `$` already consumed by caller.
        self.start = self.pos;
        if self.peek() == b'?' {
            self.advance();
            self.emit(TokenType::Access);
            return;
        }
        if !Self::is_alpha(self.peek()) {
            self.error("Illegal identifier name following '$'");
            return;
        }
        while Self::is_valid_ident_char(self.peek()) {
            self.advance();
        }
        self.emit(TokenType::Access);
    }

    fn lex_string(&mut self, quote: u8) {
        // opening quote already consumed.
        loop {
            if self.at_end() {
                self.error("Unterminated string");
                return;
            }
            let c = self.peek();
            if c == quote {
                self.advance();
                break;
            }
            if c == b'\n' {
                self.line += 1;
                self.advance();
                continue;
            }
            if quote == b'"' && c == b'\\' {
                self.advance();
                match self.peek() {
                    b'n' | b'\\' | b'"' => {
                        self.advance();
                    }
                    _ => {
                        self.error("Unknown escape sequence");
                        while !self.at_end() && self.peek() != quote {
                            self.advance();
                        }
                        if !self.at_end() {
                            self.advance();
                        }
                        return;
                    }
                }
                continue;
            }
            self.advance();
        }
        // multi-line continuation: trailing whitespace, `\`, trailing
        // whitespace, newline, then another string of the same quote type.
        let save = self.pos;
        let save_line = self.line;
        loop {
            while matches!(self.peek(), b' ' | b'\t') {
                self.advance();
            }
            if self.peek() != b'\\' {
                break;
            }
            let after_backslash = self.pos + 1;
            let mut look = after_backslash;
            while look < self.input.len() && matches!(self.input[look], b' ' | b'\t') {
                look += 1;
            }
            if look >= self.input.len() || self.input[look] != b'\n' {
                break;
            }
            self.pos = look + 1;
            self.line += 1;
            while matches!(self.peek(), b' ' | b'\t') {
                self.advance();
            }
            if self.peek() != quote {
                self.error("Expected another string after '\\'.");
                return;
            }
            self.advance();
            loop {
                if self.at_end() {
                    self.error("Unterminated string");
                    return;
                }
                let c = self.peek();
                if c == quote {
                    self.advance();
                    break;
                }
                if c == b'\n' {
                    self.line += 1;
                }
                self.advance();
            }
        }
        let _ = save;
        let _ = save_line;
        self.emit(TokenType::Str);
    }

    fn lex_comment(&mut self) {
        while !self.at_end() && self.peek() != b'\n' {
            self.advance();
        }
    }
}

pub fn lex(input: &str) -> LexResult {
    Lexer::new(input).lex()
}

#[allow(dead_code)]
fn current_position(line: usize, offset: usize) -> Position {
    Position { line, column: 0, offset }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType::*;

    fn kinds(src: &str) -> Vec<TokenType> {
        lex(src).tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_arithmetic() {
        assert_eq!(kinds("1 + 2 * 3"), vec![Num, Plus, Num, Star, Num, Eof]);
    }

    #[test]
    fn lexes_var_decl() {
        assert_eq!(kinds("var x = 1"), vec![Var, Ident, Equal, Num, Eof]);
    }

    #[test]
    fn shell_word_after_bare_identifier() {
        let toks = lex("echo hello world");
        assert_eq!(toks.tokens[0].kind, TextLit);
        assert_eq!(toks.tokens[1].kind, TextLit);
        assert_eq!(toks.tokens[2].kind, TextLit);
    }

    #[test]
    fn access_dollar_question() {
        assert_eq!(kinds("$?"), vec![Access, Eof]);
    }

    #[test]
    fn range_operator() {
        assert_eq!(kinds("0..10"), vec![Num, DotDot, Num, Eof]);
    }

    #[test]
    fn string_escapes() {
        let toks = lex("\"a\\nb\"");
        assert_eq!(toks.tokens[0].kind, Str);
        assert!(!toks.had_error);
    }

    #[test]
    fn unknown_escape_is_error() {
        let toks = lex("\"a\\qb\"");
        assert!(toks.had_error);
    }

    #[test]
    fn shell_arg_list_resumes_after_nested_parens() {
        // `cmd (1+2) world` — the parenthesized expression argument is lexed
        // in `Any` mode, but the following bare word must still come back as
        // a `TextLit` shell argument rather than an `Ident`.
        let toks = lex("cmd (1+2) world");
        assert_eq!(
            toks.tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TextLit, LParen, Num, Plus, Num, RParen, TextLit, Eof]
        );
    }

    #[test]
    fn subshell_in_any_mode_resumes_any_after_close() {
        // `(echo hi)` opened while in `Any` mode (e.g. as a grouped
        // statement) switches into `ShellArgList` for `echo hi`, and must
        // hand back to `Any` mode once its own `)` is consumed.
        let toks = lex("(echo hi) + 1");
        assert_eq!(
            toks.tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![LParen, TextLit, TextLit, RParen, Plus, Num, Eof]
        );
    }
}
