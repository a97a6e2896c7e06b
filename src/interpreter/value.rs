use std::{cell::RefCell, rc::Rc};

use crate::{ast::Literal, errors::RuntimeError};

use super::Fun;

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Function(Fun),
}

impl Value {
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Only `null` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            _ => true
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
        }
    }
}

/// Arrays which are currently being compared or printed, used to stop at cycles.
type ArrayPtr = *const RefCell<Vec<Value>>;

impl Value {
    fn eq_nested(&self, other: &Self, visiting: &mut Vec<(ArrayPtr, ArrayPtr)>) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
                if Rc::ptr_eq(a, b) || visiting.contains(&pair) {
                    return true;
                }

                visiting.push(pair);
                let (a, b) = (a.borrow(), b.borrow());
                let equal = a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| crate::grow_stack(|| x.eq_nested(y, visiting)));
                visiting.pop();

                equal
            },
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }

    fn fmt_nested(&self, f: &mut std::fmt::Formatter, visiting: &mut Vec<ArrayPtr>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(elements) => {
                let ptr = Rc::as_ptr(elements);
                if visiting.contains(&ptr) {
                    return write!(f, "[...]");
                }

                visiting.push(ptr);
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    crate::grow_stack(|| element.fmt_nested(f, visiting))?;
                }
                visiting.pop();

                write!(f, "]")
            },
            Value::Function(fun) => write!(f, "{}", fun),
        }
    }
}

impl PartialEq for Value {
    /// Arrays compare element-wise; an array reached again while comparing it counts as equal.
    fn eq(&self, other: &Self) -> bool {
        self.eq_nested(other, &mut Vec::new())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.fmt_nested(f, &mut Vec::new())
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({:?})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Array(_) => write!(f, "Array({})", self),
            Value::Function(fun) => write!(f, "Function({:?})", fun),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

/// Converts an index value to an integer, truncating any fractional part.
pub(super) fn as_index(index: &Value) -> Result<i64, RuntimeError> {
    match index {
        Value::Number(n) if n.is_finite() => Ok(n.trunc() as i64),
        other => Err(RuntimeError::InvalidIndex(other.to_string())),
    }
}

/// Checks that `index` addresses an existing element of an array of length `len`.
pub(super) fn element_index(index: &Value, len: usize) -> Result<usize, RuntimeError> {
    let i = as_index(index)?;
    if i < 0 || i as usize >= len {
        return Err(RuntimeError::IndexOutOfBounds(i));
    }

    Ok(i as usize)
}

pub(super) fn set_element(target: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    let Value::Array(elements) = target else {
        return Err(RuntimeError::NotAnArray(target.type_name().to_string()));
    };

    let mut elements = elements.borrow_mut();
    if elements.is_empty() {
        return Err(RuntimeError::EmptyArray);
    }

    let i = element_index(index, elements.len())?;
    elements[i] = value;
    Ok(())
}

/// Copies `elements[lower..upper]` into a new array.
///
/// The lower bound must address an element, the upper bound is exclusive and may
/// equal the length, and the bounds may not cross.
pub(super) fn slice(elements: &[Value], lower: &Value, upper: &Value) -> Result<Value, RuntimeError> {
    let start = element_index(lower, elements.len())?;

    let end = as_index(upper)?;
    if end < 0 || end as usize > elements.len() {
        return Err(RuntimeError::UpperBoundOutOfBounds(end));
    }

    if start as i64 > end {
        return Err(RuntimeError::InvertedSlice { lower: start as i64, upper: end });
    }

    Ok(Value::array(elements[start..end as usize].to_vec()))
}
