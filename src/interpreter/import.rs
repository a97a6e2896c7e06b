use std::path::Path;

use crate::{ast::Literal, errors::{self, RuntimeError}, lexer::Token, FoxError};

use super::{Interpreter, Value};

/// Source for the bundled libraries which can be imported by name.
pub fn library_source(name: &str) -> Option<&'static str> {
    match name {
        "arrays" => Some(include_str!("../../stdlib/arrays.fox")),
        "io" => Some(include_str!("../../stdlib/io.fox")),
        _ => None,
    }
}

impl Interpreter {
    /// Evaluates an imported file, or bundled library, returning its last value.
    pub(super) fn import(&mut self, file: &Token) -> Result<Value, FoxError> {
        let path = match file.literal() {
            Some(Literal::String(path)) => path.clone(),
            _ => return Err(errors::runtime(file, RuntimeError::Import {
                path: file.lexeme().to_string(),
                reason: "imports must name a file using a string".to_string(),
            })),
        };

        let import_error = |reason: String| errors::runtime(file, RuntimeError::Import { path: path.clone(), reason });

        let (source, base_dir, target) = match library_source(&path) {
            Some(source) => (source.to_string(), self.base_dir.clone(), None),
            None => {
                let target = self.base_dir.join(&path);
                let source = std::fs::read_to_string(&target).map_err(|e| import_error(e.to_string()))?;
                let base_dir = target.parent().map(Path::to_path_buf).unwrap_or_default();
                let target = target.canonicalize().unwrap_or(target);
                (source, base_dir, Some(target))
            },
        };

        if let Some(target) = &target {
            if self.importing.contains(target) {
                return Err(import_error("the file is already being imported".to_string()));
            }

            self.importing.push(target.clone());
        }

        tracing::debug!(path = %path, "entering import");
        let result = self.evaluate_nested(&source, base_dir);
        tracing::debug!(path = %path, ok = result.is_ok(), "leaving import");

        if target.is_some() {
            self.importing.pop();
        }

        self.settle_nested(&path, result).map_err(import_error)
    }
}
