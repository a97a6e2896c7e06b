mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};

use crate::FoxError;

/// Scans the whole source, returning the tokens alongside every lexical error found.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<FoxError>) {
    let mut tokens = Vec::new();
    let mut errs = Vec::new();

    for token in Scanner::new(source) {
        match token {
            Ok(token) => tokens.push(token),
            Err(err) => errs.push(err),
        }
    }

    (tokens, errs)
}
