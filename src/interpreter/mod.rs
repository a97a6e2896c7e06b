mod env;
mod fun;
mod import;
mod inter;
mod natives;
mod value;
mod visitor;

pub use env::Environment;
pub use fun::{Closure, Fun, NativeFun};
pub use import::library_source;
pub use inter::{Config, Flow, Interpreter, NestedErrors};
pub use value::Value;
