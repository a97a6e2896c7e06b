mod expr;
pub mod printer;
mod parser;
mod value;

pub use expr::{Case, Expr, ExprId, ExprVisitor, FunDecl, Pattern};
pub use parser::Parser;
pub use value::Literal;
