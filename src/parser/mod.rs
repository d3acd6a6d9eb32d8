//! Recursive-descent parser with precedence climbing and bounded
//! multi-error accumulation, following
//! `original_source/src/interpreter/parser.c`'s grammar.

use crate::ast::{Expr, ExprId, Literal, RedirKind, Redirection, Stmt, StmtId, StrPart};
use crate::token::{Token, TokenType};
use std::rc::Rc;

const MAX_PARSE_ERRORS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    ExpectedRBrace,
    Other,
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {}]: {}", self.line, self.message)
    }
}

pub struct ParseResult {
    pub statements: Vec<StmtId>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn expects_continuation(&self) -> bool {
        self.errors.len() == 1 && self.errors[0].kind == ParseErrorKind::ExpectedRBrace
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    source_line: usize,
}

pub fn parse(tokens: Vec<Token>) -> ParseResult {
    let mut parser = Parser { tokens, pos: 0, errors: Vec::new(), source_line: 0 };
    let mut statements = Vec::new();
    parser.ignore(TokenType::Newline);
    while !parser.is_at_end() && parser.errors.len() < MAX_PARSE_ERRORS {
        let stmt = parser.declaration();
        statements.push(stmt);
        parser.ignore(TokenType::Newline);
    }
    ParseResult { statements, errors: parser.errors }
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenType {
        self.peek().kind
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenType::Eof
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        self.source_line = tok.line;
        if !self.is_at_end() {
            self.pos += 1;
        }
        tok
    }

    fn backup(&mut self) {
        if self.pos > 0 {
            self.pos -= 1;
        }
    }

    fn check(&self, kinds: &[TokenType]) -> bool {
        kinds.contains(&self.peek_kind())
    }

    fn match_any(&mut self, kinds: &[TokenType]) -> bool {
        if self.check(kinds) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn ignore(&mut self, kind: TokenType) {
        while self.peek_kind() == kind {
            self.advance();
        }
    }

    fn consume(&mut self, kind: TokenType, msg: &str) -> Token {
        if self.peek_kind() != kind {
            let pet = if kind == TokenType::RBrace {
                ParseErrorKind::ExpectedRBrace
            } else {
                ParseErrorKind::Other
            };
            self.error(msg, pet);
            self.backup();
        }
        self.advance()
    }

    fn error(&mut self, msg: &str, kind: ParseErrorKind) {
        let line = if matches!(self.peek_kind(), TokenType::Eof | TokenType::Newline) && self.pos != 0 {
            self.tokens[self.pos - 1].line
        } else {
            self.peek().line
        };
        self.errors.push(ParseError { message: msg.to_string(), line, kind });
        self.advance();
    }

    fn newline(&mut self) {
        self.consume(TokenType::Newline, "Expected newline or semicolon");
        self.ignore(TokenType::Newline);
    }

    fn expr_promotion(&mut self) {
        if self.check(&[TokenType::RBrace, TokenType::AmpAmp, TokenType::PipePipe]) {
            return;
        }
        self.newline();
    }

    // ---- statements ----

    fn declaration(&mut self) -> StmtId {
        self.ignore(TokenType::Newline);
        let stmt = if self.match_any(&[TokenType::Var]) {
            self.var_decl_start()
        } else {
            self.and_or()
        };
        self.ignore(TokenType::Newline);
        stmt
    }

    /// `'var' ident '=' expr` or `'var' ident {',' ident} '=' expr`. Matches
    /// `var_decl_start` in `original_source/src/interpreter/parser.c`: a
    /// bare comma-separated name list, no parentheses.
    fn var_decl_start(&mut self) -> StmtId {
        let line = self.source_line;
        let name = self.consume(TokenType::Ident, "Expected variable name").lexeme;
        if self.match_any(&[TokenType::Equal]) {
            let init = self.top_level_expr();
            self.expr_promotion();
            return Rc::new(Stmt::Var { name, init: Some(init), line });
        }
        if self.match_any(&[TokenType::Comma]) {
            let mut names = vec![name];
            loop {
                names.push(self.consume(TokenType::Ident, "Expected variable name").lexeme);
                if !self.match_any(&[TokenType::Comma]) {
                    break;
                }
            }
            self.consume(TokenType::Equal, "Expected variable definition");
            let init = self.top_level_expr();
            self.expr_promotion();
            return Rc::new(Stmt::SeqVar { names, init, line });
        }
        self.expr_promotion();
        Rc::new(Stmt::Var { name, init: None, line })
    }

    /// A single `expression()`, promoted to an `Expr::Sequence` if followed
    /// by a bare comma — used for both declaration initializers and
    /// assignment targets/values (`top_level_expr` in the original).
    fn top_level_expr(&mut self) -> ExprId {
        let line = self.source_line;
        let first = self.expression();
        if !self.match_any(&[TokenType::Comma]) {
            return first;
        }
        let mut items = vec![first];
        loop {
            self.ignore(TokenType::Newline);
            items.push(self.expression());
            if !self.match_any(&[TokenType::Comma]) {
                break;
            }
        }
        Rc::new(Expr::Sequence { items, line })
    }

    fn and_or(&mut self) -> StmtId {
        let mut left = self.statement();
        loop {
            if self.check(&[TokenType::AmpAmp, TokenType::PipePipe]) {
                let op = self.advance().kind;
                self.ignore(TokenType::Newline);
                let right = self.statement();
                let line = left.line();
                left = Rc::new(Stmt::AndOr { left, op, right, line });
            } else {
                break;
            }
        }
        left
    }

    fn statement(&mut self) -> StmtId {
        if self.match_any(&[TokenType::Loop]) {
            return self.loop_stmt();
        }
        if self.match_any(&[TokenType::Assert]) {
            return self.assert_stmt();
        }
        if self.match_any(&[TokenType::If]) {
            return self.if_stmt();
        }
        if self.match_any(&[TokenType::Break]) {
            let line = self.source_line;
            self.expr_promotion();
            return Rc::new(Stmt::Break { levels: 1, line });
        }
        if self.match_any(&[TokenType::Continue]) {
            let line = self.source_line;
            self.expr_promotion();
            return Rc::new(Stmt::Continue { levels: 1, line });
        }
        if self.match_any(&[TokenType::Return]) {
            let line = self.source_line;
            let value = if self.check(&[TokenType::Newline, TokenType::RBrace, TokenType::Eof]) {
                None
            } else {
                Some(self.expression())
            };
            self.expr_promotion();
            return Rc::new(Stmt::Return { value, line });
        }
        if self.check(&[TokenType::TextLit, TokenType::Dot]) {
            return self.pipeline_stmt();
        }
        if self.check(&[TokenType::LBrace]) {
            return self.block();
        }
        self.assignment_stmt()
    }

    fn loop_stmt(&mut self) -> StmtId {
        let line = self.source_line;
        // `loop { }` (infinite), `loop cond { }`, `loop x in iterable { }`
        if self.check(&[TokenType::LBrace]) {
            let body = self.block();
            return Rc::new(Stmt::Loop { condition: None, body, line });
        }
        if self.check(&[TokenType::Ident]) && self.check_ahead(1, &[TokenType::In]) {
            let binding = self.advance().lexeme;
            self.advance(); // `in`
            let iterable = self.expression();
            let body = self.block();
            return Rc::new(Stmt::IterLoop { binding, iterable, body, line });
        }
        let condition = self.expression();
        let body = self.block();
        Rc::new(Stmt::Loop { condition: Some(condition), body, line })
    }

    fn check_ahead(&self, n: usize, kinds: &[TokenType]) -> bool {
        let idx = self.pos + n;
        if idx >= self.tokens.len() {
            return false;
        }
        kinds.contains(&self.tokens[idx].kind)
    }

    fn assert_stmt(&mut self) -> StmtId {
        let line = self.source_line;
        let expr = self.expression();
        self.expr_promotion();
        Rc::new(Stmt::Assert { expr, line })
    }

    /// `'if' expr block [('elif' ... ) | ('else' block)]`. An `elif`
    /// recurses into `if_stmt` directly (its own `Stmt::If` becomes the
    /// `else_body`), matching the original's `if_stmt` rather than flattening
    /// into a clause list.
    fn if_stmt(&mut self) -> StmtId {
        let line = self.source_line;
        let condition = self.expression();
        let body = self.block();
        self.ignore(TokenType::Newline);
        let else_body = if self.match_any(&[TokenType::Elif]) {
            Some(self.if_stmt())
        } else if self.match_any(&[TokenType::Else]) {
            Some(self.block())
        } else {
            None
        };
        Rc::new(Stmt::If { clauses: vec![(condition, body)], else_body, line })
    }

    fn block(&mut self) -> StmtId {
        let line = self.source_line;
        self.consume(TokenType::LBrace, "Expected '{'");
        self.ignore(TokenType::Newline);
        let mut statements = Vec::new();
        while !self.check(&[TokenType::RBrace, TokenType::Eof]) {
            statements.push(self.declaration());
            self.ignore(TokenType::Newline);
        }
        self.consume(TokenType::RBrace, "Expected '}'");
        Rc::new(Stmt::Block { statements, line })
    }

    /// Came from seeing `TextLit`/`Dot` in `statement()`. `cmd_stmt`, then
    /// optionally a `>`/`>>`/`<` redirect, then optionally a `|`-chained
    /// further command — matching `pipeline_stmt`/`redirect_stmt` in the
    /// original exactly (redirection and piping apply only to commands, not
    /// to plain assignment/expression statements).
    fn pipeline_stmt(&mut self) -> StmtId {
        let left = self.cmd_stmt();
        let kind = match self.peek_kind() {
            TokenType::Greater => Some(RedirKind::Out),
            TokenType::GreaterGreater => Some(RedirKind::Append),
            TokenType::Less => Some(RedirKind::In),
            _ => None,
        };
        if let Some(kind) = kind {
            self.advance();
            let target = self.expression();
            let line = left.line();
            return Rc::new(Stmt::Redirect { inner: left, redirection: Redirection { kind, target }, line });
        }
        if !self.match_any(&[TokenType::Pipe]) {
            return left;
        }
        self.ignore(TokenType::Newline);
        if !self.check(&[TokenType::Dot]) {
            self.consume(TokenType::TextLit, "Expected shell command after pipe symbol");
            self.backup();
        }
        let line = left.line();
        let right = self.pipeline_stmt();
        Rc::new(Stmt::Pipeline { left, right, line })
    }

    /// Came from `TextLit`/`Dot`: command name, then every subsequent
    /// `single()` expression up to an arg-end token.
    fn cmd_stmt(&mut self) -> StmtId {
        let line = self.source_line;
        let name = self.advance().lexeme;
        let mut args = Vec::new();
        while !self.is_arg_end() {
            args.push(self.single());
        }
        Rc::new(Stmt::Cmd { name, args, redirections: Vec::new(), line })
    }

    fn is_arg_end(&self) -> bool {
        use TokenType::*;
        self.check(&[
            Newline, Eof, Pipe, PipePipe, Greater, GreaterGreater, Less, Amp, AmpAmp, RParen, RBrace,
        ])
    }

    /// `target = value` / `target op= value`, or a bare expression statement
    /// (auto-printed by the evaluator unless it's a call). `target` is
    /// whatever `top_level_expr` parses — `exec`'s `Stmt::Assign` handling
    /// decides at runtime whether it's a plain/subscript/sequence-unpack
    /// assignment, matching `assignment_stmt`/`exec_assign` in the original.
    fn assignment_stmt(&mut self) -> StmtId {
        let line = self.source_line;
        let expr = self.top_level_expr();
        let Some(op) = self.assign_op() else {
            self.expr_promotion();
            return Rc::new(Stmt::Expression { expr, line });
        };
        let value = self.top_level_expr();
        self.expr_promotion();
        Rc::new(Stmt::Assign { target: expr, op, value, line })
    }

    fn assign_op(&mut self) -> Option<Option<TokenType>> {
        use TokenType::*;
        let op = match self.peek_kind() {
            Equal => None,
            PlusEqual => Some(Plus),
            MinusEqual => Some(Minus),
            StarEqual => Some(Star),
            SlashEqual => Some(Slash),
            SlashSlashEqual => Some(SlashSlash),
            StarStarEqual => Some(StarStar),
            PercentEqual => Some(Percent),
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    // ---- expressions ----

    fn expression(&mut self) -> ExprId {
        self.logical_or()
    }

    fn logical_or(&mut self) -> ExprId {
        let mut left = self.logical_and();
        while self.check(&[TokenType::Or]) {
            let line = self.advance().line;
            let right = self.logical_and();
            left = Rc::new(Expr::Binary { op: TokenType::Or, left, right, line });
        }
        left
    }

    fn logical_and(&mut self) -> ExprId {
        let mut left = self.equality();
        while self.check(&[TokenType::And]) {
            let line = self.advance().line;
            let right = self.equality();
            left = Rc::new(Expr::Binary { op: TokenType::And, left, right, line });
        }
        left
    }

    fn equality(&mut self) -> ExprId {
        let mut left = self.comparison();
        while self.check(&[TokenType::EqualEqual, TokenType::BangEqual]) {
            let op_tok = self.advance();
            let right = self.comparison();
            left = Rc::new(Expr::Binary { op: op_tok.kind, left, right, line: op_tok.line });
        }
        left
    }

    fn comparison(&mut self) -> ExprId {
        let mut left = self.term();
        while self.check(&[TokenType::Greater, TokenType::GreaterEqual, TokenType::Less, TokenType::LessEqual]) {
            let op_tok = self.advance();
            let right = self.term();
            left = Rc::new(Expr::Binary { op: op_tok.kind, left, right, line: op_tok.line });
        }
        left
    }

    fn term(&mut self) -> ExprId {
        let mut left = self.factor();
        while self.check(&[TokenType::Plus, TokenType::Minus]) {
            let op_tok = self.advance();
            let right = self.factor();
            left = Rc::new(Expr::Binary { op: op_tok.kind, left, right, line: op_tok.line });
        }
        left
    }

    fn factor(&mut self) -> ExprId {
        let mut left = self.exponentiation();
        while self.check(&[TokenType::Star, TokenType::Slash, TokenType::SlashSlash, TokenType::Percent]) {
            let op_tok = self.advance();
            let right = self.exponentiation();
            left = Rc::new(Expr::Binary { op: op_tok.kind, left, right, line: op_tok.line });
        }
        left
    }

    fn exponentiation(&mut self) -> ExprId {
        let left = self.unary();
        if self.check(&[TokenType::StarStar]) {
            let line = self.advance().line;
            let right = self.exponentiation(); // right-associative
            return Rc::new(Expr::Binary { op: TokenType::StarStar, left, right, line });
        }
        left
    }

    fn unary(&mut self) -> ExprId {
        if self.check(&[TokenType::Minus, TokenType::Not, TokenType::Bang]) {
            let op_tok = self.advance();
            let operand = self.unary();
            return Rc::new(Expr::Unary { op: op_tok.kind, operand, line: op_tok.line });
        }
        self.single()
    }

    /// Base of the precedence ladder: `( cmd… )` subshell / parenthesized
    /// grouping-or-tuple / subscript chain / access / primary, followed by
    /// at most one of `in expr`, `.. expr`, `as type`, `(args…)` call —
    /// matching `single`/`subshell` in the original exactly, including the
    /// leading-`..expr` → `0..expr` rewrite.
    fn single(&mut self) -> ExprId {
        let mut left = if self.match_any(&[TokenType::LParen]) {
            if self.check(&[TokenType::TextLit, TokenType::Dot]) {
                self.subshell()
            } else {
                self.backup();
                self.subscript_chain()
            }
        } else if self.check(&[TokenType::DotDot]) {
            Rc::new(Expr::Literal { value: Literal::Num(0.0), line: self.peek().line })
        } else {
            self.subscript_chain()
        };

        if self.match_any(&[TokenType::In]) {
            let line = self.source_line;
            let right = self.expression();
            return Rc::new(Expr::Binary { op: TokenType::In, left, right, line });
        }
        if self.match_any(&[TokenType::DotDot]) {
            let line = self.source_line;
            let right = self.expression();
            return Rc::new(Expr::Binary { op: TokenType::DotDot, left, right, line });
        }
        if self.match_any(&[TokenType::As]) {
            let line = self.source_line;
            let type_name = self.consume(TokenType::Ident, "Expected type name after cast").lexeme;
            return Rc::new(Expr::Cast { expr: left, type_name, line });
        }
        if self.match_any(&[TokenType::LParen]) {
            let line = self.source_line;
            let mut args = Vec::new();
            if !self.check(&[TokenType::RParen]) {
                loop {
                    args.push(self.expression());
                    if !self.match_any(&[TokenType::Comma]) {
                        break;
                    }
                }
            }
            self.consume(TokenType::RParen, "Expected ')'");
            left = Rc::new(Expr::Call { callee: left, args, line });
        }
        left
    }

    fn subscript_chain(&mut self) -> ExprId {
        let mut expr = self.access();
        while self.match_any(&[TokenType::LBracket]) {
            let line = self.source_line;
            let index = self.expression();
            self.consume(TokenType::RBracket, "Expected ']'");
            expr = Rc::new(Expr::Subscript { target: expr, index, line });
        }
        expr
    }

    fn access(&mut self) -> ExprId {
        if self.check(&[TokenType::Access]) {
            let tok = self.advance();
            return Rc::new(Expr::Access { name: tok.lexeme, line: tok.line });
        }
        self.primary()
    }

    /// Came from `(`: a subshell wraps a single nested command/pipeline (and
    /// its redirects), not a block.
    fn subshell(&mut self) -> ExprId {
        let line = self.source_line;
        let body = self.pipeline_stmt();
        self.consume(TokenType::RParen, "Expected ')' after subshell");
        Rc::new(Expr::Subshell { body, line })
    }

    fn primary(&mut self) -> ExprId {
        let line = self.peek().line;
        if self.check(&[TokenType::True]) {
            self.advance();
            return Rc::new(Expr::Literal { value: Literal::Bool(true), line });
        }
        if self.check(&[TokenType::False]) {
            self.advance();
            return Rc::new(Expr::Literal { value: Literal::Bool(false), line });
        }
        if self.check(&[TokenType::None_]) {
            self.advance();
            return Rc::new(Expr::Literal { value: Literal::None, line });
        }
        if self.check(&[TokenType::Num]) {
            let tok = self.advance();
            let n: f64 = tok.lexeme.parse().unwrap_or(f64::NAN);
            return Rc::new(Expr::Literal { value: Literal::Num(n), line });
        }
        if self.check(&[TokenType::TextLit]) {
            let tok = self.advance();
            return Rc::new(Expr::Str { parts: vec![StrPart::Text(tok.lexeme)], is_bare: true, line });
        }
        if self.check(&[TokenType::Str]) {
            let tok = self.advance();
            return Rc::new(Expr::Str { parts: self.split_interpolation(&tok.lexeme), is_bare: false, line });
        }
        if self.check(&[TokenType::LBracket]) {
            return self.list_lit();
        }
        if self.check(&[TokenType::At, TokenType::AtLBracket]) {
            return self.map_or_tuple_lit();
        }
        if self.check(&[TokenType::LParen]) {
            return self.grouping_or_tuple();
        }
        if self.check(&[TokenType::Func]) {
            return self.func_def();
        }
        if self.check(&[TokenType::Ident]) {
            let tok = self.advance();
            return Rc::new(Expr::Access { name: tok.lexeme, line });
        }
        self.error("Expected expression", ParseErrorKind::Other);
        Rc::new(Expr::Literal { value: Literal::None, line })
    }

    fn split_interpolation(&self, raw: &str) -> Vec<StrPart> {
        // `$name` sequences inside a quoted string are string interpolation;
        // everything else is literal text.
        let mut parts = Vec::new();
        let mut buf = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '$' && chars.peek().map(|c| c.is_alphabetic() || *c == '_').unwrap_or(false) {
                if !buf.is_empty() {
                    parts.push(StrPart::Text(std::mem::take(&mut buf)));
                }
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '-' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                parts.push(StrPart::Interp(Rc::new(Expr::Access { name, line: 0 })));
            } else {
                buf.push(c);
            }
        }
        if !buf.is_empty() || parts.is_empty() {
            parts.push(StrPart::Text(buf));
        }
        parts
    }

    fn list_lit(&mut self) -> ExprId {
        let line = self.source_line;
        self.advance(); // [
        self.ignore(TokenType::Newline);
        let mut items = Vec::new();
        while !self.check(&[TokenType::RBracket]) {
            items.push(self.expression());
            self.ignore(TokenType::Newline);
            if !self.match_any(&[TokenType::Comma]) {
                break;
            }
            self.ignore(TokenType::Newline);
        }
        self.ignore(TokenType::Newline);
        self.consume(TokenType::RBracket, "Expected ']'");
        Rc::new(Expr::List { items, line })
    }

    fn map_or_tuple_lit(&mut self) -> ExprId {
        let line = self.source_line;
        self.advance(); // @ or @[
        if self.previous().kind == TokenType::At {
            self.consume(TokenType::LBracket, "Expected '['");
        }
        self.ignore(TokenType::Newline);
        let mut entries = Vec::new();
        while !self.check(&[TokenType::RBracket]) {
            let key = self.expression();
            self.consume(TokenType::Colon, "Expected ':'");
            let value = self.expression();
            entries.push((key, value));
            self.ignore(TokenType::Newline);
            if !self.match_any(&[TokenType::Comma]) {
                break;
            }
            self.ignore(TokenType::Newline);
        }
        self.ignore(TokenType::Newline);
        self.consume(TokenType::RBracket, "Expected ']'");
        Rc::new(Expr::Map { entries, line })
    }

    fn grouping_or_tuple(&mut self) -> ExprId {
        let line = self.source_line;
        self.advance(); // (
        let first = self.expression();
        if self.match_any(&[TokenType::Comma]) {
            let mut items = vec![first];
            loop {
                items.push(self.expression());
                if !self.match_any(&[TokenType::Comma]) {
                    break;
                }
            }
            self.consume(TokenType::RParen, "Expected ')'");
            return Rc::new(Expr::Tuple { items, line });
        }
        self.consume(TokenType::RParen, "Expected ')'");
        Rc::new(Expr::Grouping { inner: first, line })
    }

    fn func_def(&mut self) -> ExprId {
        let line = self.source_line;
        self.advance(); // func
        let mut params = Vec::new();
        if self.check(&[TokenType::Ident]) {
            loop {
                params.push(self.advance().lexeme);
                if !self.match_any(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        let body = self.block();
        Rc::new(Expr::Function { params, body, line })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_src(src: &str) -> ParseResult {
        let lexed = lex(src);
        assert!(!lexed.had_error, "lex errors: {:?}", lexed.errors);
        parse(lexed.tokens)
    }

    #[test]
    fn parses_var_decl() {
        let r = parse_src("var x = 1 + 2\n");
        assert!(r.errors.is_empty());
        assert_eq!(r.statements.len(), 1);
    }

    #[test]
    fn parses_if_else() {
        let r = parse_src("if true { var x = 1 } else { var x = 2 }\n");
        assert!(r.errors.is_empty(), "{:?}", r.errors);
    }

    #[test]
    fn continuation_on_missing_rbrace() {
        let r = parse_src("if true {\n");
        assert!(r.expects_continuation());
    }

    #[test]
    fn parses_function_literal_and_call() {
        // A bare `f(1, 2)` statement would lex `f` as a `TextLit` shell
        // command name (statement-leading bare words only become `Ident`
        // after `var`/`loop`/`,`/`as`/`=`/`func`), so calling a `var`-bound
        // function as a standalone statement requires the `$`-access form.
        let r = parse_src("var f = func a, b { return a + b }\n$f(1, 2)\n");
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        assert_eq!(r.statements.len(), 2);
        match &*r.statements[1] {
            Stmt::Expression { expr, .. } => assert!(expr.is_call()),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn bare_call_like_word_is_a_shell_command() {
        // Without the `$`, `f(1, 2)` is a command named `f` whose sole
        // argument is the tuple `(1, 2)` — the parenthesized text is parsed
        // via `single()`'s normal grouping/tuple path, not as a call.
        let r = parse_src("f(1, 2)\n");
        assert!(r.errors.is_empty(), "{:?}", r.errors);
        assert_eq!(r.statements.len(), 1);
        match &*r.statements[0] {
            Stmt::Cmd { name, args, .. } => {
                assert_eq!(name, "f");
                assert_eq!(args.len(), 1);
                assert!(matches!(&*args[0], Expr::Tuple { .. }));
            }
            other => panic!("expected command statement, got {:?}", other),
        }
    }
}
