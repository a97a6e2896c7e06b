use std::{fmt::{Debug, Display}, rc::Rc};

use crate::{ast::FunDecl, errors::{self, RuntimeError}, lexer::Token, FoxError};

use super::{env::Environment, Flow, Interpreter, Value};

#[derive(Clone)]
pub enum Fun {
    Native(Rc<NativeFun>),
    Closure(Rc<Closure>),
}

impl Fun {
    pub fn native<T: Fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError> + 'static, S: Into<String>>(name: S, arity: usize, fun: T) -> Self {
        Fun::Native(Rc::new(NativeFun::new(name, arity, fun)))
    }

    pub fn closure(decl: Rc<FunDecl>, env: Environment) -> Self {
        Fun::Closure(Rc::new(Closure { decl, closure: env }))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Fun::Native(fun) => Some(fun.name()),
            Fun::Closure(closure) => closure.name(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Fun::Native(fun) => fun.arity(),
            Fun::Closure(closure) => closure.arity(),
        }
    }

    /// Invokes the function with already evaluated arguments; `close` locates any failure.
    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>, close: &Token) -> Result<Value, FoxError> {
        match self {
            Fun::Native(fun) => fun.call(interpreter, args).map_err(|e| errors::runtime(close, e)),
            Fun::Closure(closure) => closure.call(interpreter, args),
        }
    }
}

impl Display for Fun {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Fun::Native(_) => write!(f, "<native fn>"),
            Fun::Closure(closure) => match closure.name() {
                Some(name) => write!(f, "<fn {}>", name),
                None => write!(f, "<fn>"),
            },
        }
    }
}

impl Debug for Fun {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl PartialEq for Fun {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Fun::Native(fun1), Fun::Native(fun2)) => Rc::ptr_eq(fun1, fun2),
            (Fun::Closure(closure1), Fun::Closure(closure2)) => Rc::ptr_eq(closure1, closure2),
            _ => false,
        }
    }
}

pub struct NativeFun {
    pub name: String,
    pub arity: usize,
    #[allow(clippy::type_complexity)]
    pub fun: Box<dyn Fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError>>,
}

impl NativeFun {
    pub fn new<T: Fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError> + 'static, S: Into<String>>(name: S, arity: usize, fun: T) -> Self {
        Self { name: name.into(), arity, fun: Box::new(fun) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, RuntimeError> {
        (self.fun)(interpreter, args)
    }
}

pub struct Closure {
    pub decl: Rc<FunDecl>,
    pub closure: Environment,
}

impl Closure {
    pub fn name(&self) -> Option<&str> {
        self.decl.name.as_ref().map(|name| name.lexeme())
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, FoxError> {
        let env = self.closure.branch();
        self.decl.params.iter().zip(args).for_each(|(param, value)| {
            env.define(param.lexeme(), value);
        });

        tracing::trace!(function = self.name().unwrap_or("<anonymous>"), "entering call frame");

        let old_env = std::mem::replace(&mut interpreter.env, env);
        let result = interpreter.evaluate(&self.decl.body);
        interpreter.env = old_env;

        match result? {
            Flow::Value(value) => Ok(value),
            Flow::Break(keyword) => Err(errors::runtime(&keyword, RuntimeError::BreakOutsideLoop)),
        }
    }
}
