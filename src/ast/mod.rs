//! Abstract syntax tree node families.
//!
//! Expr/Stmt are tagged enums rather than the original's struct-per-kind +
//! common header (`Expr` base struct with an `ExprType` tag in C); Rust's
//! enum gives the same dispatch without a manual vtable for the tree shape
//! itself (the *value* system still uses a vtable, see `crate::value`).

use crate::token::TokenType;
use std::rc::Rc;

pub type ExprId = Rc<Expr>;
pub type StmtId = Rc<Stmt>;

#[derive(Debug, Clone)]
pub enum Expr {
    Unary { op: TokenType, operand: ExprId, line: usize },
    Binary { op: TokenType, left: ExprId, right: ExprId, line: usize },
    Literal { value: Literal, line: usize },
    Access { name: String, line: usize },
    Subscript { target: ExprId, index: ExprId, line: usize },
    Subshell { body: StmtId, line: usize },
    /// `is_bare`: came from an unquoted shell word (`TextLit` token) rather
    /// than a quoted string literal. Bare words never contain interpolation
    /// (`$name` inside one lexes as a separate `Access` token, not a part of
    /// this node) and evaluate to a `text_lit` value rather than a heap
    /// `str` — see `eval_str`.
    Str { parts: Vec<StrPart>, is_bare: bool, line: usize },
    List { items: Vec<ExprId>, line: usize },
    Tuple { items: Vec<ExprId>, line: usize },
    Map { entries: Vec<(ExprId, ExprId)>, line: usize },
    Function { params: Vec<String>, body: StmtId, line: usize },
    Sequence { items: Vec<ExprId>, line: usize },
    Grouping { inner: ExprId, line: usize },
    Cast { expr: ExprId, type_name: String, line: usize },
    Call { callee: ExprId, args: Vec<ExprId>, line: usize },
}

#[derive(Debug, Clone)]
pub enum StrPart {
    Text(String),
    Interp(ExprId),
}

#[derive(Debug, Clone)]
pub enum Literal {
    Num(f64),
    Bool(bool),
    None,
    Range(i64, i64),
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Unary { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Literal { line, .. }
            | Expr::Access { line, .. }
            | Expr::Subscript { line, .. }
            | Expr::Subshell { line, .. }
            | Expr::Str { line, .. }
            | Expr::List { line, .. }
            | Expr::Tuple { line, .. }
            | Expr::Map { line, .. }
            | Expr::Function { line, .. }
            | Expr::Sequence { line, .. }
            | Expr::Grouping { line, .. }
            | Expr::Cast { line, .. }
            | Expr::Call { line, .. } => *line,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call { .. })
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression { expr: ExprId, line: usize },
    Var { name: String, init: Option<ExprId>, line: usize },
    SeqVar { names: Vec<String>, init: ExprId, line: usize },
    Loop { condition: Option<ExprId>, body: StmtId, line: usize },
    IterLoop { binding: String, iterable: ExprId, body: StmtId, line: usize },
    If { clauses: Vec<(ExprId, StmtId)>, else_body: Option<StmtId>, line: usize },
    Cmd { name: String, args: Vec<ExprId>, redirections: Vec<Redirection>, line: usize },
    /// `target = value` / `target op= value`. `target` may itself be a
    /// `Sequence` of bare-comma access expressions (`$a, $b = 1, 2`), in
    /// which case `value` must evaluate to a matching `Sequence` — resolved
    /// at exec time, matching the original's `exec_assign`/
    /// `exec_assign_unpack` dispatch on `stmt->var->type`.
    Assign { target: ExprId, op: Option<TokenType>, value: ExprId, line: usize },
    Block { statements: Vec<StmtId>, line: usize },
    Pipeline { left: StmtId, right: StmtId, line: usize },
    Assert { expr: ExprId, line: usize },
    AndOr { left: StmtId, op: TokenType, right: StmtId, line: usize },
    Redirect { inner: StmtId, redirection: Redirection, line: usize },
    Break { levels: u32, line: usize },
    Continue { levels: u32, line: usize },
    Return { value: Option<ExprId>, line: usize },
}

#[derive(Debug, Clone)]
pub struct Redirection {
    pub kind: RedirKind,
    pub target: ExprId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirKind {
    Out,
    Append,
    In,
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::Expression { line, .. }
            | Stmt::Var { line, .. }
            | Stmt::SeqVar { line, .. }
            | Stmt::Loop { line, .. }
            | Stmt::IterLoop { line, .. }
            | Stmt::If { line, .. }
            | Stmt::Cmd { line, .. }
            | Stmt::Assign { line, .. }
            | Stmt::Block { line, .. }
            | Stmt::Pipeline { line, .. }
            | Stmt::Assert { line, .. }
            | Stmt::AndOr { line, .. }
            | Stmt::Redirect { line, .. }
            | Stmt::Break { line, .. }
            | Stmt::Continue { line, .. }
            | Stmt::Return { line, .. } => *line,
        }
    }
}
