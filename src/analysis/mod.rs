use std::path::Path;

use fnv::FnvHashMap;

use crate::{ast::{Expr, ExprId}, interpreter::NestedErrors, FoxError};

mod resolver;

/// Hop counts for every variable node which refers to a local binding.
///
/// Nodes without an entry are looked up by name in the global frame at run time.
pub type Locals = FnvHashMap<ExprId, usize>;

/// Resolves every variable reference in the forest, recording hop counts into `locals`.
///
/// Relative imports are checked against `base_dir`. Errors inside an imported file
/// are reported here under `NestedErrors::Propagate` and only logged under `Contain`.
/// Errors are accumulated rather than raised, and the caller should skip evaluation
/// if any are returned.
pub fn resolve(forest: &[Expr], locals: &mut Locals, base_dir: &Path, nested_errors: NestedErrors) -> Vec<FoxError> {
    let mut resolver = resolver::Resolver::new(locals, base_dir.to_path_buf(), nested_errors);
    let errs = resolver.resolve_all(forest);

    tracing::debug!(expressions = forest.len(), errors = errs.len(), "resolved forest");
    errs
}
