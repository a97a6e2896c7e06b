use std::{rc::Rc, sync::atomic::{AtomicUsize, Ordering}};

use crate::lexer::Token;

use super::Literal;

/// Identifies a single node in the tree, independently of what it contains.
///
/// Two syntactically identical variable references are still distinct nodes and
/// may live at different scope depths, so resolution results are keyed by this
/// id rather than by the node's contents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

impl ExprId {
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
pub enum Expr {
    Array(Vec<Expr>, Token),
    Assign(ExprId, Token, Option<Box<Expr>>, Box<Expr>),
    Binary(Box<Expr>, Token, Box<Expr>),
    Block(Vec<Expr>),
    Break(Token),
    Call(Box<Expr>, Vec<Expr>, Token),
    Fun(Rc<FunDecl>),
    Grouping(Box<Expr>),
    Import(Token),
    Index(Box<Expr>, Box<Expr>, Option<Box<Expr>>, Token),
    Literal(Literal),
    Logical(Box<Expr>, Token, Box<Expr>),
    Match(Token, Box<Expr>, Vec<Case>),
    Pattern(Pattern),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>, Token),
    Unary(Token, Box<Expr>),
    Var(ExprId, Token),
    VarDef(Token, Option<Box<Expr>>),
    While(Token, Option<Box<Expr>>, Box<Expr>),
}

/// A function definition; shared between the tree and every closure created from it.
#[derive(Debug)]
pub struct FunDecl {
    pub name: Option<Token>,
    pub params: Vec<Token>,
    pub body: Expr,
}

#[derive(Debug)]
pub struct Case {
    pub arrow: Token,
    pub condition: Expr,
    pub body: Expr,
}

#[derive(Debug)]
pub enum Pattern {
    Or(Box<Expr>, Token, Box<Expr>),
    Wildcard(Token),
}

pub trait ExprVisitor<T> {
    fn visit_expr(&mut self, expr: &Expr) -> T {
        match expr {
            Expr::Array(elements, close) => {
                self.visit_array(elements, close)
            },
            Expr::Assign(id, name, index, value) => {
                self.visit_assign(*id, name, index.as_deref(), value)
            },
            Expr::Binary(left, op, right) => {
                self.visit_binary(left, op, right)
            },
            Expr::Block(exprs) => {
                self.visit_block(exprs)
            },
            Expr::Break(keyword) => {
                self.visit_break(keyword)
            },
            Expr::Call(callee, args, close) => {
                self.visit_call(callee, args, close)
            },
            Expr::Fun(decl) => {
                self.visit_fun(decl)
            },
            Expr::Grouping(expr) => {
                self.visit_grouping(expr)
            },
            Expr::Import(file) => {
                self.visit_import(file)
            },
            Expr::Index(callee, index, upper, close) => {
                self.visit_index(callee, index, upper.as_deref(), close)
            },
            Expr::Literal(value) => {
                self.visit_literal(value)
            },
            Expr::Logical(left, op, right) => {
                self.visit_logical(left, op, right)
            },
            Expr::Match(keyword, scrutinee, cases) => {
                self.visit_match(keyword, scrutinee, cases)
            },
            Expr::Pattern(pattern) => {
                self.visit_pattern(pattern)
            },
            Expr::Ternary(cond, then_branch, else_branch, op) => {
                self.visit_ternary(cond, then_branch, else_branch, op)
            },
            Expr::Unary(op, expr) => {
                self.visit_unary(op, expr)
            },
            Expr::Var(id, name) => {
                self.visit_var_ref(*id, name)
            },
            Expr::VarDef(name, init) => {
                self.visit_var_def(name, init.as_deref())
            },
            Expr::While(keyword, cond, body) => {
                self.visit_while(keyword, cond.as_deref(), body)
            },
        }
    }

    fn visit_array(&mut self, elements: &[Expr], close: &Token) -> T;

    fn visit_assign(&mut self, id: ExprId, name: &Token, index: Option<&Expr>, value: &Expr) -> T;

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> T;

    fn visit_block(&mut self, exprs: &[Expr]) -> T;

    fn visit_break(&mut self, keyword: &Token) -> T;

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], close: &Token) -> T;

    fn visit_fun(&mut self, decl: &Rc<FunDecl>) -> T;

    fn visit_grouping(&mut self, expr: &Expr) -> T;

    fn visit_import(&mut self, file: &Token) -> T;

    fn visit_index(&mut self, callee: &Expr, index: &Expr, upper: Option<&Expr>, close: &Token) -> T;

    fn visit_literal(&mut self, value: &Literal) -> T;

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> T;

    fn visit_match(&mut self, keyword: &Token, scrutinee: &Expr, cases: &[Case]) -> T;

    fn visit_pattern(&mut self, pattern: &Pattern) -> T;

    fn visit_ternary(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr, op: &Token) -> T;

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> T;

    fn visit_var_ref(&mut self, id: ExprId, name: &Token) -> T;

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> T;

    fn visit_while(&mut self, keyword: &Token, cond: Option<&Expr>, body: &Expr) -> T;
}
