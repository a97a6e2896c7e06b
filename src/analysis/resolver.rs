use std::{collections::HashSet, path::{Path, PathBuf}, rc::Rc};

use fnv::FnvHashMap;

use crate::{
    ast::{Case, Expr, ExprId, ExprVisitor, FunDecl, Literal, Parser, Pattern},
    errors,
    interpreter::{library_source, NestedErrors},
    lexer::{tokenize, Token},
    FoxError,
};

use super::Locals;

pub(super) struct Resolver<'a> {
    scopes: Vec<FnvHashMap<String, bool>>,
    locals: &'a mut Locals,
    base_dir: PathBuf,
    importing: Vec<PathBuf>,
    nested_errors: NestedErrors,
}

impl<'a> Resolver<'a> {
    pub fn new(locals: &'a mut Locals, base_dir: PathBuf, nested_errors: NestedErrors) -> Self {
        Self {
            scopes: Vec::new(),
            locals,
            base_dir,
            importing: Vec::new(),
            nested_errors,
        }
    }

    pub fn resolve_all(&mut self, forest: &[Expr]) -> Vec<FoxError> {
        forest.iter().flat_map(|expr| self.resolve(expr)).collect()
    }

    fn resolve(&mut self, expr: &Expr) -> Vec<FoxError> {
        crate::grow_stack(|| self.visit_expr(expr))
    }

    fn declare(&mut self, name: &Token) -> Vec<FoxError> {
        let Some(scope) = self.scopes.last_mut() else {
            return Vec::new();
        };

        if scope.contains_key(name.lexeme()) {
            return vec![errors::resolve(
                name,
                format!("Variable '{}' is already declared in this scope.", name.lexeme()),
                "Use `assign` to give the existing variable a new value, or pick a different name.",
            )];
        }

        scope.insert(name.lexeme().to_string(), false);
        Vec::new()
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme().to_string(), true);
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (hops, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme()) {
                self.locals.insert(id, hops);
                return;
            }
        }
    }

    fn resolve_function(&mut self, decl: &FunDecl) -> Vec<FoxError> {
        self.scopes.push(FnvHashMap::default());

        let mut errs = Vec::new();
        let mut known_params = HashSet::new();
        for param in decl.params.iter() {
            if !known_params.insert(param.lexeme()) {
                errs.push(errors::resolve(
                    param,
                    format!("Duplicate parameter '{}' in function definition.", param.lexeme()),
                    "Make sure you are not using the same parameter name twice.",
                ));
            }

            self.define(param);
        }

        errs.append(&mut self.resolve(&decl.body));

        self.scopes.pop();
        errs
    }

    /// Lexes, parses and resolves an imported file so that its mistakes are reported up front.
    fn check_import_file(&mut self, file: &Token, path: &str, target: PathBuf) -> Vec<FoxError> {
        let canonical = target.canonicalize().unwrap_or_else(|_| target.clone());
        if self.importing.contains(&canonical) {
            tracing::debug!(path = %target.display(), "skipping re-entrant import");
            return Vec::new();
        }

        let source = match std::fs::read_to_string(&target) {
            Ok(source) => source,
            Err(err) => return vec![errors::resolve(
                file,
                format!("Could not read the imported file '{}': {}.", target.display(), err),
                "Make sure that the file exists and that you have permissions to access it.",
            )],
        };

        let (tokens, mut nested) = tokenize(&source);
        let (forest, mut parse_errs) = Parser::parse(tokens);
        nested.append(&mut parse_errs);

        if nested.is_empty() {
            let mut scratch = Locals::default();
            let mut importing = self.importing.clone();
            importing.push(canonical);

            let mut resolver = Resolver {
                scopes: Vec::new(),
                locals: &mut scratch,
                base_dir: target.parent().map(Path::to_path_buf).unwrap_or_default(),
                importing,
                nested_errors: self.nested_errors,
            };
            nested = resolver.resolve_all(&forest);
        }

        if !nested.is_empty() && self.nested_errors == NestedErrors::Contain {
            tracing::warn!(path, errors = nested.len(), "imported file contains errors, it will evaluate to null");
            return Vec::new();
        }

        nested.into_iter().map(|err| errors::resolve(
            file,
            format!("The imported file '{}' contains an error. {}", path, err),
            "Fix the errors in the imported file before importing it.",
        )).collect()
    }
}

impl ExprVisitor<Vec<FoxError>> for Resolver<'_> {
    fn visit_array(&mut self, elements: &[Expr], _close: &Token) -> Vec<FoxError> {
        elements.iter().flat_map(|e| self.resolve(e)).collect()
    }

    fn visit_assign(&mut self, id: ExprId, name: &Token, index: Option<&Expr>, value: &Expr) -> Vec<FoxError> {
        let errs = vec![
            index.map(|i| self.resolve(i)).unwrap_or_default(),
            self.resolve(value),
        ].into_iter().flatten().collect();

        self.resolve_local(id, name);
        errs
    }

    fn visit_binary(&mut self, left: &Expr, _op: &Token, right: &Expr) -> Vec<FoxError> {
        vec![
            self.resolve(left),
            self.resolve(right),
        ].into_iter().flatten().collect()
    }

    fn visit_block(&mut self, exprs: &[Expr]) -> Vec<FoxError> {
        self.scopes.push(FnvHashMap::default());
        let errs = exprs.iter().flat_map(|e| self.resolve(e)).collect();
        self.scopes.pop();

        errs
    }

    fn visit_break(&mut self, _keyword: &Token) -> Vec<FoxError> {
        Vec::new()
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], _close: &Token) -> Vec<FoxError> {
        vec![
            self.resolve(callee),
            args.iter().flat_map(|arg| self.resolve(arg)).collect(),
        ].into_iter().flatten().collect()
    }

    fn visit_fun(&mut self, decl: &Rc<FunDecl>) -> Vec<FoxError> {
        let mut errs = Vec::new();
        if let Some(name) = &decl.name {
            errs.append(&mut self.declare(name));
            self.define(name);
        }

        errs.append(&mut self.resolve_function(decl));
        errs
    }

    fn visit_grouping(&mut self, expr: &Expr) -> Vec<FoxError> {
        self.resolve(expr)
    }

    fn visit_import(&mut self, file: &Token) -> Vec<FoxError> {
        let Some(Literal::String(path)) = file.literal() else {
            return vec![errors::resolve(file, "Imports must name a file using a string.", "Import files like `import(\"path/to/file.fox\")`.")];
        };

        if library_source(path).is_some() {
            return Vec::new();
        }

        let target = self.base_dir.join(path);
        if !target.is_file() {
            return vec![errors::resolve(
                file,
                format!("Could not find the imported file '{}'.", target.display()),
                "Import paths are relative to the directory of the importing file.",
            )];
        }

        self.check_import_file(file, path, target)
    }

    fn visit_index(&mut self, callee: &Expr, index: &Expr, upper: Option<&Expr>, _close: &Token) -> Vec<FoxError> {
        vec![
            self.resolve(callee),
            self.resolve(index),
            upper.map(|u| self.resolve(u)).unwrap_or_default(),
        ].into_iter().flatten().collect()
    }

    fn visit_literal(&mut self, _value: &Literal) -> Vec<FoxError> {
        Vec::new()
    }

    fn visit_logical(&mut self, left: &Expr, _op: &Token, right: &Expr) -> Vec<FoxError> {
        vec![
            self.resolve(left),
            self.resolve(right),
        ].into_iter().flatten().collect()
    }

    fn visit_match(&mut self, _keyword: &Token, scrutinee: &Expr, cases: &[Case]) -> Vec<FoxError> {
        let mut errs = self.resolve(scrutinee);
        for case in cases {
            errs.append(&mut self.resolve(&case.condition));
            errs.append(&mut self.resolve(&case.body));
        }

        errs
    }

    fn visit_pattern(&mut self, pattern: &Pattern) -> Vec<FoxError> {
        match pattern {
            Pattern::Or(left, _, right) => vec![
                self.resolve(left),
                self.resolve(right),
            ].into_iter().flatten().collect(),
            Pattern::Wildcard(_) => Vec::new(),
        }
    }

    fn visit_ternary(&mut self, cond: &Expr, then_branch: &Expr, else_branch: &Expr, _op: &Token) -> Vec<FoxError> {
        vec![
            self.resolve(cond),
            self.resolve(then_branch),
            self.resolve(else_branch),
        ].into_iter().flatten().collect()
    }

    fn visit_unary(&mut self, _op: &Token, expr: &Expr) -> Vec<FoxError> {
        self.resolve(expr)
    }

    fn visit_var_ref(&mut self, id: ExprId, name: &Token) -> Vec<FoxError> {
        if self.scopes.last().and_then(|s| s.get(name.lexeme())) == Some(&false) {
            return vec![errors::resolve(
                name,
                format!("Cannot read local variable '{}' in its own initializer.", name.lexeme()),
                "Make sure you are not masking a variable with the same name and try using a different name for this variable if you are.",
            )];
        }

        self.resolve_local(id, name);
        Vec::new()
    }

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> Vec<FoxError> {
        let mut errs = self.declare(name);
        if let Some(init) = init {
            errs.append(&mut self.resolve(init));
        }

        self.define(name);
        errs
    }

    fn visit_while(&mut self, _keyword: &Token, cond: Option<&Expr>, body: &Expr) -> Vec<FoxError> {
        vec![
            cond.map(|c| self.resolve(c)).unwrap_or_default(),
            self.resolve(body),
        ].into_iter().flatten().collect()
    }
}
