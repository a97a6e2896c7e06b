mod core;
pub mod ast;
pub mod analysis;
pub mod cmdline;
pub mod lexer;
pub mod interpreter;

pub use crate::core::errors::{self, FoxError};
pub use crate::core::{CaptureOutput, ScriptedInput};

/// Remaining stack below which a deeper recursion step allocates a new segment.
const RED_ZONE: usize = 100 * 1024;

/// Size of each freshly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, growing the stack first when the current one is close to exhausted.
///
/// Wraps the recursive entry points of the parser, resolver and interpreter so
/// that deeply nested programs don't overflow the host stack.
#[inline]
pub(crate) fn grow_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
