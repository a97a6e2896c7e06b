use std::rc::Rc;

use crate::{
    ast::{Case, Expr, ExprId, ExprVisitor, FunDecl, Literal, Pattern},
    errors::{self, RuntimeError},
    lexer::{Token, TokenKind},
    FoxError,
};

use super::{value::{element_index, slice}, Flow, Fun, Interpreter, Value};

/// Unwraps the value of an evaluated node, passing a `break` straight up to the caller.
macro_rules! value {
    ($flow:expr) => {
        match $flow {
            Flow::Value(value) => value,
            flow @ Flow::Break(_) => return Ok(flow),
        }
    };
}

impl Interpreter {
    fn lookup(&self, id: ExprId, name: &Token) -> Result<Value, FoxError> {
        let result = match self.locals.get(&id) {
            Some(hops) => self.env.get_at(*hops, name.lexeme()),
            None => self.globals.get(name.lexeme()),
        };

        result.map_err(|e| errors::runtime(name, e))
    }

    fn block_members(&mut self, exprs: &[Expr]) -> Result<Flow, FoxError> {
        let mut last = Value::Null;
        for expr in exprs {
            last = value!(self.evaluate(expr)?);
        }

        Ok(Flow::Value(last))
    }

    /// Whether a case condition accepts the scrutinee, as a boolean value.
    fn case_matches(&mut self, condition: &Expr, scrutinee: &Value) -> Result<Flow, FoxError> {
        match condition {
            Expr::Pattern(Pattern::Wildcard(_)) => Ok(Flow::Value(Value::Bool(true))),
            Expr::Pattern(Pattern::Or(left, _, right)) => {
                if value!(self.case_matches(left, scrutinee)?).is_truthy() {
                    return Ok(Flow::Value(Value::Bool(true)));
                }

                self.case_matches(right, scrutinee)
            },
            condition => {
                let value = value!(self.evaluate(condition)?);
                Ok(Flow::Value(Value::Bool(value == *scrutinee)))
            },
        }
    }
}

impl ExprVisitor<Result<Flow, FoxError>> for Interpreter {
    fn visit_array(&mut self, elements: &[Expr], _close: &Token) -> Result<Flow, FoxError> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            values.push(value!(self.evaluate(element)?));
        }

        Ok(Flow::Value(Value::array(values)))
    }

    fn visit_assign(&mut self, id: ExprId, name: &Token, index: Option<&Expr>, value: &Expr) -> Result<Flow, FoxError> {
        let index = match index {
            Some(index) => Some(value!(self.evaluate(index)?)),
            None => None,
        };
        let value = value!(self.evaluate(value)?);

        let result = match (self.locals.get(&id), &index) {
            (Some(hops), None) => self.env.assign_at(*hops, name.lexeme(), value.clone()),
            (Some(hops), Some(index)) => self.env.assign_element_at(*hops, name.lexeme(), index, value.clone()),
            (None, None) => self.globals.assign(name.lexeme(), value.clone()),
            (None, Some(index)) => self.globals.assign_element(name.lexeme(), index, value.clone()),
        };

        result.map_err(|e| errors::runtime(name, e))?;
        Ok(Flow::Value(value))
    }

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Flow, FoxError> {
        let left = value!(self.evaluate(left)?);
        let right = value!(self.evaluate(right)?);

        let value = match (op.kind(), &left, &right) {
            (TokenKind::EqualEqual, _, _) => Value::Bool(left == right),
            (TokenKind::BangEqual, _, _) => Value::Bool(left != right),

            (TokenKind::Plus, Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (TokenKind::Plus, Value::String(_), _) | (TokenKind::Plus, _, Value::String(_)) => {
                Value::String(format!("{}{}", left, right))
            },
            (TokenKind::Plus, _, _) => return Err(errors::runtime(
                op,
                RuntimeError::InvalidAddition(left.type_name().to_string(), right.type_name().to_string()),
            )),

            (TokenKind::Slash, Value::Number(_), Value::Number(b)) if *b == 0.0 => {
                return Err(errors::runtime(op, RuntimeError::DivideByZero))
            },

            (kind, Value::Number(a), Value::Number(b)) => match kind {
                TokenKind::Minus => Value::Number(a - b),
                TokenKind::Star => Value::Number(a * b),
                TokenKind::Slash => Value::Number(a / b),
                TokenKind::Greater => Value::Bool(a > b),
                TokenKind::GreaterEqual => Value::Bool(a >= b),
                TokenKind::Less => Value::Bool(a < b),
                TokenKind::LessEqual => Value::Bool(a <= b),
                _ => return Err(errors::system(
                    format!("We received an unexpected binary operator '{}'.", op.lexeme()),
                    "This is a bug in the interpreter, please report it with example code.",
                )),
            },

            _ => return Err(errors::runtime(
                op,
                RuntimeError::OperandsNotNumbers(left.type_name().to_string(), right.type_name().to_string()),
            )),
        };

        Ok(Flow::Value(value))
    }

    fn visit_block(&mut self, exprs: &[Expr]) -> Result<Flow, FoxError> {
        let env = self.env.branch();
        let old_env = std::mem::replace(&mut self.env, env);
        tracing::trace!(members = exprs.len(), "entering block frame");

        let result = self.block_members(exprs);

        self.env = old_env;
        result
    }

    fn visit_break(&mut self, keyword: &Token) -> Result<Flow, FoxError> {
        Ok(Flow::Break(keyword.clone()))
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], close: &Token) -> Result<Flow, FoxError> {
        let callee = value!(self.evaluate(callee)?);

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(value!(self.evaluate(arg)?));
        }

        let fun = match callee {
            Value::Function(fun) => fun,
            other => return Err(errors::runtime(close, RuntimeError::NotCallable(other.type_name().to_string()))),
        };

        if fun.arity() != values.len() {
            return Err(errors::runtime(close, RuntimeError::Arity { expected: fun.arity(), got: values.len() }));
        }

        tracing::trace!(function = %fun, args = values.len(), "calling function");
        fun.call(self, values, close).map(Flow::Value)
    }

    fn visit_fun(&mut self, decl: &Rc<FunDecl>) -> Result<Flow, FoxError> {
        let fun = Value::Function(Fun::closure(decl.clone(), self.env.clone()));
        if let Some(name) = &decl.name {
            self.env.define(name.lexeme(), fun.clone());
        }

        Ok(Flow::Value(fun))
    }

    fn visit_grouping(&mut self, expr: &Expr) -> Result<Flow, FoxError> {
        self.evaluate(expr)
    }

    fn visit_import(&mut self, file: &Token) -> Result<Flow, FoxError> {
        self.import(file).map(Flow::Value)
    }

    fn visit_index(&mut self, callee: &Expr, index: &Expr, upper: Option<&Expr>, close: &Token) -> Result<Flow, FoxError> {
        let target = value!(self.evaluate(callee)?);
        let elements = match &target {
            Value::Array(elements) => elements.clone(),
            other => return Err(errors::runtime(close, RuntimeError::NotAnArray(other.type_name().to_string()))),
        };

        if elements.borrow().is_empty() {
            return Err(errors::runtime(close, RuntimeError::EmptyArray));
        }

        let lower = value!(self.evaluate(index)?);
        let value = match upper {
            Some(upper) => {
                let upper = value!(self.evaluate(upper)?);
                let elements = elements.borrow();
                slice(&elements, &lower, &upper)
            },
            None => {
                let elements = elements.borrow();
                element_index(&lower, elements.len()).map(|i| elements[i].clone())
            },
        };

        value.map(Flow::Value).map_err(|e| errors::runtime(close, e))
    }

    fn visit_literal(&mut self, value: &Literal) -> Result<Flow, FoxError> {
        Ok(Flow::Value(value.into()))
    }

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Flow, FoxError> {
        let left = value!(self.evaluate(left)?);

        let short_circuits = match op.kind() {
            TokenKind::Or => left.is_truthy(),
            _ => !left.is_truthy(),
        };

        if short_circuits {
            Ok(Flow::Value(left))
        } else {
            self.evaluate(right)
        }
    }

    fn visit_match(&mut self, _keyword: &Token, scrutinee: &Expr, cases: &[Case]) -> Result<Flow, FoxError> {
        let scrutinee = value!(self.evaluate(scrutinee)?);

        for case in cases {
            if value!(self.case_matches(&case.condition, &scrutinee)?).is_truthy() {
                return self.evaluate(&case.body);
            }
        }

        Ok(Flow::Value(Value::Null))
    }

    /// Patterns are only built as case conditions, where `case_matches` handles them.
    fn visit_pattern(&mut self, pattern: &Pattern) -> Result<Flow, FoxError> {
        let token = match pattern {
            Pattern::Or(_, pipe, _) => pipe,
            Pattern::Wildcard(wildcard) => wildcard,
        };

        Err(errors::system(
            format!("Reached the case pattern '{}' outside of a match case.", token.lexeme()),
            "This is a bug in the interpreter, please report it with example code.",
        ))
    }

    fn visit_ternary(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr, _op: &Token) -> Result<Flow, FoxError> {
        if value!(self.evaluate(cond)?).is_truthy() {
            self.evaluate(then_branch)
        } else {
            self.evaluate(else_branch)
        }
    }

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> Result<Flow, FoxError> {
        let right = value!(self.evaluate(expr)?);

        match (op.kind(), right) {
            (TokenKind::Minus, Value::Number(n)) => Ok(Flow::Value(Value::Number(-n))),
            (TokenKind::Minus, other) => Err(errors::runtime(op, RuntimeError::OperandNotNumber(other.type_name().to_string()))),
            (_, other) => Ok(Flow::Value(Value::Bool(!other.is_truthy()))),
        }
    }

    fn visit_var_ref(&mut self, id: ExprId, name: &Token) -> Result<Flow, FoxError> {
        self.lookup(id, name).map(Flow::Value)
    }

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> Result<Flow, FoxError> {
        let value = match init {
            Some(init) => value!(self.evaluate(init)?),
            None => Value::Null,
        };

        self.env.define(name.lexeme(), value.clone());
        Ok(Flow::Value(value))
    }

    fn visit_while(&mut self, _keyword: &Token, cond: Option<&Expr>, body: &Expr) -> Result<Flow, FoxError> {
        let mut last = Value::Null;
        let mut iterations = 0usize;

        loop {
            if let Some(cond) = cond {
                match self.evaluate(cond)? {
                    Flow::Value(value) if value.is_truthy() => {},
                    _ => break,
                }
            }

            match self.evaluate(body)? {
                Flow::Value(value) => last = value,
                Flow::Break(_) => break,
            }

            iterations += 1;
        }

        tracing::trace!(iterations, "loop finished");
        Ok(Flow::Value(last))
    }
}
