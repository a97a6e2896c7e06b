use std::rc::Rc;

use crate::lexer::Token;

use super::{Case, Expr, ExprId, ExprVisitor, FunDecl, Literal, Pattern};

/// Renders a tree as an S-expression, used by `--debug` and the parser tests.
pub struct AstPrinter{}

impl AstPrinter {
    fn parenthesize<'a, I: IntoIterator<Item = &'a Expr>>(&mut self, name: &str, exprs: I) -> String {
        let mut s = format!("({}", name);
        for expr in exprs {
            s.push(' ');
            s.push_str(&self.visit_expr(expr));
        }
        s.push(')');
        s
    }
}

impl ExprVisitor<String> for AstPrinter {
    fn visit_array(&mut self, elements: &[Expr], _close: &Token) -> String {
        self.parenthesize("array", elements)
    }

    fn visit_assign(&mut self, _id: ExprId, name: &Token, index: Option<&Expr>, value: &Expr) -> String {
        match index {
            Some(index) => format!("(assign {}[{}] {})", name.lexeme(), self.visit_expr(index), self.visit_expr(value)),
            None => format!("(assign {} {})", name.lexeme(), self.visit_expr(value)),
        }
    }

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> String {
        self.parenthesize(op.lexeme(), [left, right])
    }

    fn visit_block(&mut self, exprs: &[Expr]) -> String {
        self.parenthesize("block", exprs)
    }

    fn visit_break(&mut self, _keyword: &Token) -> String {
        "break".to_string()
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], _close: &Token) -> String {
        let mut s = format!("(call {}", self.visit_expr(callee));
        for arg in args {
            s.push(' ');
            s.push_str(&self.visit_expr(arg));
        }
        s.push(')');
        s
    }

    fn visit_fun(&mut self, decl: &Rc<FunDecl>) -> String {
        let name = decl.name.as_ref().map(|n| n.lexeme()).unwrap_or("<anon>");
        let params: Vec<&str> = decl.params.iter().map(|p| p.lexeme()).collect();
        format!("(defun {} ({}) {})", name, params.join(" "), self.visit_expr(&decl.body))
    }

    fn visit_grouping(&mut self, expr: &Expr) -> String {
        self.parenthesize("group", [expr])
    }

    fn visit_import(&mut self, file: &Token) -> String {
        match file.literal() {
            Some(path) => format!("(import {})", path),
            None => format!("(import {})", file.lexeme()),
        }
    }

    fn visit_index(&mut self, callee: &Expr, index: &Expr, upper: Option<&Expr>, _close: &Token) -> String {
        match upper {
            Some(upper) => self.parenthesize("slice", [callee, index, upper]),
            None => self.parenthesize("index", [callee, index]),
        }
    }

    fn visit_literal(&mut self, value: &Literal) -> String {
        value.to_string()
    }

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> String {
        self.parenthesize(op.lexeme(), [left, right])
    }

    fn visit_match(&mut self, _keyword: &Token, scrutinee: &Expr, cases: &[Case]) -> String {
        let mut s = format!("(match {}", self.visit_expr(scrutinee));
        for case in cases {
            s.push(' ');
            s.push_str(&self.parenthesize("case", [&case.condition, &case.body]));
        }
        s.push(')');
        s
    }

    fn visit_pattern(&mut self, pattern: &Pattern) -> String {
        match pattern {
            Pattern::Or(left, _, right) => self.parenthesize("|", [left.as_ref(), right.as_ref()]),
            Pattern::Wildcard(_) => "_".to_string(),
        }
    }

    fn visit_ternary(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr, _op: &Token) -> String {
        self.parenthesize("?:", [cond, then_branch, else_branch])
    }

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> String {
        self.parenthesize(op.lexeme(), [expr])
    }

    fn visit_var_ref(&mut self, _id: ExprId, name: &Token) -> String {
        name.lexeme().to_string()
    }

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> String {
        self.parenthesize(&format!("var {}", name.lexeme()), init)
    }

    fn visit_while(&mut self, _keyword: &Token, cond: Option<&Expr>, body: &Expr) -> String {
        self.parenthesize("while", cond.into_iter().chain([body]))
    }
}
