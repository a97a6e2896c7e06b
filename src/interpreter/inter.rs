use std::{io::{BufRead, Write}, path::PathBuf};

use crate::{
    analysis::{self, Locals},
    ast::{Expr, ExprVisitor, Parser},
    errors::{self, RuntimeError},
    lexer::{tokenize, Token},
    FoxError,
};

use super::{env::Environment, natives, Value};

/// What happens when an import or `eval()` fails part way through.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum NestedErrors {
    /// The failure becomes a runtime error at the import or `eval()` call site.
    #[default]
    Propagate,
    /// The failure is logged and the nested evaluation yields `null`.
    Contain,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub nested_errors: NestedErrors,
}

/// The outcome of evaluating a node: either a value, or a `break` unwinding towards its loop.
#[derive(Debug, Clone)]
pub enum Flow {
    Value(Value),
    Break(Token),
}

pub struct Interpreter {
    pub(super) globals: Environment,
    pub(super) env: Environment,
    pub(super) locals: Locals,
    pub(super) base_dir: PathBuf,
    pub(super) importing: Vec<PathBuf>,
    pub(super) config: Config,
    pub output: Box<dyn Write>,
    pub input: Box<dyn BufRead>,
}

impl Interpreter {
    /// Evaluates every root in order, returning the value of the last one.
    pub fn interpret(&mut self, forest: &[Expr]) -> Result<Value, FoxError> {
        let mut last = Value::Null;
        for expr in forest {
            last = match self.evaluate(expr)? {
                Flow::Value(value) => value,
                Flow::Break(keyword) => return Err(errors::runtime(&keyword, RuntimeError::BreakOutsideLoop)),
            };
        }

        Ok(last)
    }

    /// Lexes, parses and resolves `source` against this interpreter's locals table.
    pub fn compile(&mut self, source: &str) -> Result<Vec<Expr>, Vec<FoxError>> {
        let (tokens, mut errs) = tokenize(source);
        let (forest, mut parse_errs) = Parser::parse(tokens);
        errs.append(&mut parse_errs);

        tracing::debug!(expressions = forest.len(), errors = errs.len(), "parsed source");
        if !errs.is_empty() {
            return Err(errs);
        }

        let mut resolved = Locals::default();
        let errs = analysis::resolve(&forest, &mut resolved, &self.base_dir, self.config.nested_errors);
        if !errs.is_empty() {
            return Err(errs);
        }

        self.locals.extend(resolved);
        Ok(forest)
    }

    /// Compiles and then evaluates `source`.
    ///
    /// Static errors are all reported together; evaluation stops at the first runtime error.
    pub fn run(&mut self, source: &str) -> Result<Value, Vec<FoxError>> {
        let forest = self.compile(source)?;
        self.interpret(&forest).map_err(|err| vec![err])
    }

    pub(super) fn evaluate(&mut self, expr: &Expr) -> Result<Flow, FoxError> {
        crate::grow_stack(|| self.visit_expr(expr))
    }

    /// Runs `source` against the global frame with `base_dir` as the import root.
    ///
    /// The caller's frame and base directory are restored however the evaluation ends.
    pub(super) fn evaluate_nested(&mut self, source: &str, base_dir: PathBuf) -> Result<Value, Vec<FoxError>> {
        let previous_dir = std::mem::replace(&mut self.base_dir, base_dir);
        let previous_env = std::mem::replace(&mut self.env, self.globals.clone());

        let result = self.run(source);

        self.env = previous_env;
        self.base_dir = previous_dir;
        result
    }

    /// Applies the nested error policy, returning the failure text when it should propagate.
    pub(super) fn settle_nested(&self, origin: &str, result: Result<Value, Vec<FoxError>>) -> Result<Value, String> {
        let errs = match result {
            Ok(value) => return Ok(value),
            Err(errs) => errs,
        };

        let reason = errs.iter().map(|e| e.to_string()).collect::<Vec<String>>().join("\n");
        match self.config.nested_errors {
            NestedErrors::Propagate => Err(reason),
            NestedErrors::Contain => {
                tracing::warn!(origin, %reason, "nested evaluation failed, continuing with null");
                Ok(Value::Null)
            },
        }
    }

    pub fn with_output(self, output: Box<dyn Write>) -> Self {
        Self {
            output,
            ..self
        }
    }

    pub fn with_input(self, input: Box<dyn BufRead>) -> Self {
        Self {
            input,
            ..self
        }
    }

    pub fn with_base_dir<P: Into<PathBuf>>(self, base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..self
        }
    }

    pub fn with_config(self, config: Config) -> Self {
        Self {
            config,
            ..self
        }
    }

    pub fn into_output(self) -> Box<dyn Write> {
        self.output
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        let globals = Environment::new();
        natives::register(&globals);

        Self {
            env: globals.clone(),
            globals,
            locals: Locals::default(),
            base_dir: PathBuf::from("."),
            importing: Vec::new(),
            config: Config::default(),
            output: Box::new(std::io::stdout()),
            input: Box::new(std::io::BufReader::new(std::io::stdin())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{errors::RuntimeError, CaptureOutput, FoxError, ScriptedInput};

    use super::*;

    fn run(source: &str) -> Result<Value, Vec<FoxError>> {
        Interpreter::default().with_output(Box::new(CaptureOutput::new())).run(source)
    }

    fn display(source: &str) -> String {
        match run(source) {
            Ok(value) => value.to_string(),
            Err(errs) => panic!("expected {} to succeed, got {:?}", source, errs),
        }
    }

    fn runtime_error(source: &str) -> RuntimeError {
        match run(source) {
            Ok(value) => panic!("expected {} to fail, got {}", source, value),
            Err(errs) => {
                assert_eq!(errs.len(), 1, "a single runtime error is reported");
                errs[0].runtime_error().cloned().unwrap_or_else(|| panic!("expected a runtime error, got {}", errs[0]))
            },
        }
    }

    #[test]
    fn shadowing_restores_the_outer_binding() {
        assert_eq!(run("var(x, 10) { var(x, 20), x }"), Ok(Value::Number(20.0)));
        assert_eq!(run("var(x, 10) { var(x, 20), x } x"), Ok(Value::Number(10.0)));
    }

    #[test]
    fn block_declarations_are_not_visible_afterwards() {
        assert_eq!(runtime_error("{ var(inner, 1) } inner"), RuntimeError::UndefinedVariable("inner".to_string()));
    }

    #[test]
    fn block_value_is_the_last_member() {
        assert_eq!(display("var(log, 0) { assign(log, log + 1), assign(log, log + 1), log * 10 }"), "20");
        assert_eq!(display("{}"), "null");
    }

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!(display("1 + 2 * 3 - 4 / 2"), "5");
        assert_eq!(display("(1 + 2) * 3"), "9");
        assert_eq!(display("-2 * -3 > 5 == true"), "true");
        assert_eq!(display("10 - 4 - 3"), "3");
    }

    #[test]
    fn division() {
        assert_eq!(runtime_error("5 / 0"), RuntimeError::DivideByZero);
        assert_eq!(run("5 / 2"), Ok(Value::Number(2.5)));
    }

    #[test]
    fn addition_concatenates_strings() {
        assert_eq!(display(r#""a" + 1"#), "a1");
        assert_eq!(display(r#"1 + "a""#), "1a");
        assert_eq!(display(r#""n: " + null"#), "n: null");
        assert_eq!(
            runtime_error("true + 1"),
            RuntimeError::InvalidAddition("boolean".to_string(), "number".to_string())
        );
    }

    #[test]
    fn operands_must_be_numbers() {
        assert_eq!(runtime_error(r#"-"a""#), RuntimeError::OperandNotNumber("string".to_string()));
        assert_eq!(
            runtime_error(r#""a" < 1"#),
            RuntimeError::OperandsNotNumbers("string".to_string(), "number".to_string())
        );
    }

    #[test]
    fn equality_works_for_any_pair() {
        assert_eq!(display("null == null"), "true");
        assert_eq!(display("null == false"), "false");
        assert_eq!(display(r#"1 == "1""#), "false");
        assert_eq!(display("[1, [2]] == [1, [2]]"), "true");
        assert_eq!(display("[1] != [2]"), "true");
    }

    #[test]
    fn truthiness() {
        assert_eq!(display("!0"), "false");
        assert_eq!(display("!null"), "true");
        assert_eq!(display(r#"0 ? "yes" : "no""#), "yes");
        assert_eq!(display(r#""" ? "yes" : "no""#), "yes");
    }

    #[test]
    fn short_circuiting_skips_unneeded_branches() {
        assert_eq!(display("false and missing()"), "false");
        assert_eq!(display("true or missing()"), "true");
        assert_eq!(display("null or 3"), "3");
        assert_eq!(display("true ? 1 : missing()"), "1");
        assert_eq!(display("false ? missing() : 2"), "2");
    }

    #[test]
    fn arrays_and_indexing() {
        assert_eq!(runtime_error("var(xs, [1, 2, 3]) xs[3]"), RuntimeError::IndexOutOfBounds(3));
        assert_eq!(run("var(xs, [1, 2, 3]) xs[2]"), Ok(Value::Number(3.0)));
        assert_eq!(runtime_error("[][0]"), RuntimeError::EmptyArray);
        assert_eq!(runtime_error("var(n, 1) n[0]"), RuntimeError::NotAnArray("number".to_string()));
        assert_eq!(runtime_error(r#"[1][ "a" ]"#), RuntimeError::InvalidIndex("a".to_string()));
    }

    #[test]
    fn slices_copy_a_sub_range() {
        assert_eq!(display("[1, 2, 3, 4][1:3]"), "[2, 3]");
        assert_eq!(display("[1, 2, 3][0:3]"), "[1, 2, 3]");
        assert_eq!(runtime_error("[1, 2, 3][0:4]"), RuntimeError::UpperBoundOutOfBounds(4));
        assert_eq!(runtime_error("[1, 2, 3][2:1]"), RuntimeError::InvertedSlice { lower: 2, upper: 1 });
        assert_eq!(display("var(xs, [1, 2]) var(ys, xs[0:2]) assign(ys[0], 9) xs"), "[1, 2]");
    }

    #[test]
    fn element_assignment_mutates_in_place() {
        assert_eq!(display("var(xs, [1, 2, 3]) assign(xs[1], 20) xs"), "[1, 20, 3]");
        assert_eq!(display("{ var(xs, [1, 2]), assign(xs[0], 5), xs }"), "[5, 2]");
        assert_eq!(display("var(xs, [1, 2]) var(alias, xs) assign(alias[1], 7) xs"), "[1, 7]");
        assert_eq!(runtime_error("var(xs, [1]) assign(xs[1], 0)"), RuntimeError::IndexOutOfBounds(1));
    }

    #[test]
    fn matching() {
        assert_eq!(run(r#"match 6 { 5 => "five", 6 => "six" }"#), Ok(Value::String("six".to_string())));
        assert_eq!(run(r#"match 7 { 5 => "five", 6 => "six" }"#), Ok(Value::Null));
        assert_eq!(display(r#"match 7 { 5 => "five", 6 | 7 => "six or seven" }"#), "six or seven");
        assert_eq!(display(r#"match "x" { 1 => "one", _ => "other" }"#), "other");
        assert_eq!(display(r#"match 2 { 1 + 1 => "two", _ => "other" }"#), "two");
    }

    #[test]
    fn rejected_sources_leave_no_resolved_locals_behind() {
        let mut interpreter = Interpreter::default().with_output(Box::new(CaptureOutput::new()));
        assert!(interpreter.run("{ var(a, 1), a, var(a, 2) }").is_err());
        assert!(interpreter.locals.is_empty());

        assert_eq!(interpreter.run("{ var(a, 1), a }"), Ok(Value::Number(1.0)));
        assert_eq!(interpreter.locals.len(), 1);
    }

    #[test]
    fn patterns_outside_match_cases_are_internal_errors() {
        let mut interpreter = Interpreter::default().with_output(Box::new(CaptureOutput::new()));
        let wildcard = Expr::Pattern(crate::ast::Pattern::Wildcard(Token::new(crate::lexer::TokenKind::Underscore, "_", 1, 1)));
        assert!(matches!(interpreter.evaluate(&wildcard), Err(FoxError::System { .. })));
    }

    #[test]
    fn matching_evaluates_the_scrutinee_once() {
        assert_eq!(display("var(n, 0) match { assign(n, n + 1), 1 } { 0 => 0, 1 => 1, _ => 2 } n"), "1");
    }

    #[test]
    fn loops() {
        assert_eq!(run("while(false, 1)"), Ok(Value::Null));
        assert_eq!(display("var(i, 0) while(i < 3, assign(i, i + 1))"), "3");
        assert_eq!(display("var(i, 0) while({ assign(i, i + 1), i == 3 ? break : null }) i"), "3");
        assert_eq!(display("var(i, 0) while(true, { assign(i, i + 1), i < 5 ? i : break })"), "4");
    }

    #[test]
    fn break_outside_a_loop_is_an_error() {
        assert_eq!(runtime_error("break"), RuntimeError::BreakOutsideLoop);
        assert_eq!(runtime_error("1 + { break }"), RuntimeError::BreakOutsideLoop);
        assert_eq!(runtime_error("defun(f, () -> break) while(f())"), RuntimeError::BreakOutsideLoop);
    }

    #[test]
    fn calls() {
        assert_eq!(display("defun(add, (a, b) -> a + b) add(1, 2)"), "3");
        assert_eq!(display("defun(add, (a) -> (b) -> a + b) add(1)(2)"), "3");
        assert_eq!(runtime_error("defun(f, (a) -> a) f(1, 2)"), RuntimeError::Arity { expected: 1, got: 2 });
        assert_eq!(runtime_error("var(x, 1) x()"), RuntimeError::NotCallable("number".to_string()));
        assert_eq!(runtime_error("nope"), RuntimeError::UndefinedVariable("nope".to_string()));
        assert_eq!(display("defun(fib, (n) -> n < 2 ? n : fib(n - 1) + fib(n - 2)) fib(15)"), "610");
        assert_eq!(display("defun(f, () -> 1)"), "<fn f>");
        assert_eq!(display("defun(() -> 1)"), "<fn>");
        assert_eq!(display("clock"), "<native fn>");
    }

    #[test]
    fn closures_keep_their_defining_scope() {
        assert_eq!(display(r#"
            var(f, null)
            {
                var(a, "inner")
                assign(f, defun(() -> a))
            }
            var(a, "outer")
            f()
        "#), "inner");

        assert_eq!(display(r#"
            defun(counter, () -> {
                var(count, 0)
                () -> { assign(count, count + 1), count }
            })
            var(next, counter())
            next()
            next()
            next()
        "#), "3");
    }

    #[test]
    fn resolved_depths_match_runtime_frames() {
        assert_eq!(display("{ var(a, 1), { var(b, 2) }, { var(c, 3), { a + c } } }"), "4");

        assert_eq!(display(r#"
            var(a, "global")
            {
                defun(show, () -> a)
                var(first, show())
                var(a, "local")
                [first, show(), a]
            }
        "#), "[global, global, local]");

        assert_eq!(display(r#"
            {
                var(x, "outer")
                defun(get, () -> { { x } })
                {
                    var(x, "shadow")
                    get()
                }
            }
        "#), "outer");
    }

    #[test]
    fn definitions_persist_between_runs() {
        let mut interpreter = Interpreter::default().with_output(Box::new(CaptureOutput::new()));
        assert_eq!(interpreter.run("var(x, 41)"), Ok(Value::Number(41.0)));
        assert_eq!(interpreter.run("defun(inc, (n) -> n + 1)").map(|v| v.to_string()), Ok("<fn inc>".to_string()));
        assert_eq!(interpreter.run("inc(x)"), Ok(Value::Number(42.0)));
    }

    #[test]
    fn static_errors_skip_evaluation() {
        let output = CaptureOutput::new();
        let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));

        let errs = interpreter.run(r#"println("side effect") { var(a, 1), var(a, 2) }"#).expect_err("a resolve error");
        assert!(errs.iter().all(|e| e.is_static()));
        assert_eq!(output.take(), "");
    }

    #[test]
    fn natives_write_to_the_configured_output() {
        let output = CaptureOutput::new();
        let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));

        assert_eq!(interpreter.run(r#"println("hi") print(1 + 1)"#), Ok(Value::String("2".to_string())));
        assert_eq!(output.take(), "hi\n2");
    }

    #[test]
    fn natives_read_from_the_configured_input() {
        let output = CaptureOutput::new();
        let mut interpreter = Interpreter::default()
            .with_output(Box::new(output.clone()))
            .with_input(Box::new(std::io::BufReader::new(ScriptedInput::new("fox\n  x"))));

        assert_eq!(interpreter.run(r#"input("name? ")"#), Ok(Value::String("fox".to_string())));
        assert_eq!(interpreter.run("charToStr(getch())"), Ok(Value::String("x".to_string())));
        assert_eq!(interpreter.run("getch()"), Ok(Value::Null));
        assert_eq!(output.take(), "name? ");
    }

    #[test]
    fn eval_follows_the_nested_error_policy() {
        assert_eq!(run(r#"eval("1 + 2")"#), Ok(Value::Number(3.0)));
        assert!(matches!(runtime_error(r#"eval("1 / 0")"#), RuntimeError::Eval(_)));
        assert!(matches!(runtime_error(r#"eval("var(")"#), RuntimeError::Eval(_)));

        let mut contained = Interpreter::default()
            .with_output(Box::new(CaptureOutput::new()))
            .with_config(Config { nested_errors: NestedErrors::Contain });
        assert_eq!(contained.run(r#"eval("1 / 0")"#), Ok(Value::Null));
        assert_eq!(contained.run(r#"eval("var(")"#), Ok(Value::Null));
    }

    #[test]
    fn eval_sees_globals_but_not_locals() {
        assert_eq!(display(r#"var(g, 2) eval("g * 21")"#), "42");
        assert!(matches!(runtime_error(r#"{ var(l, 1), eval("l") }"#), RuntimeError::Eval(_)));
    }

    #[test]
    fn library_imports() {
        assert_eq!(display(r#"import("arrays") map([1, 2, 3], (x) -> x * 2)"#), "[2, 4, 6]");
        assert_eq!(display(r#"import("arrays") reduce(filter([1, 2, 3, 4], (x) -> x > 2), (acc, x) -> acc + x, 0)"#), "7");
        assert_eq!(display(r#"import("arrays") reverse(push([1, 2], 3))"#), "[3, 2, 1]");
        assert_eq!(display(r#"import("arrays") [contains([1, 2], 2), contains([1, 2], 5)]"#), "[true, false]");
    }

    #[test]
    fn file_imports_are_relative_to_the_importing_file() {
        let dir = std::env::temp_dir().join(format!("fox-imports-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("lib")).expect("create a scratch directory");
        std::fs::write(dir.join("lib").join("shapes.fox"), r#"import("square.fox") defun(cube, (n) -> n * square(n))"#).expect("write shapes.fox");
        std::fs::write(dir.join("lib").join("square.fox"), "defun(square, (n) -> n * n)").expect("write square.fox");
        std::fs::write(dir.join("lib").join("broken.fox"), "1 / 0").expect("write broken.fox");

        let mut interpreter = Interpreter::default()
            .with_output(Box::new(CaptureOutput::new()))
            .with_base_dir(&dir);

        let result = interpreter.run(r#"import("lib/shapes.fox") cube(3)"#);
        let base_dir = interpreter.base_dir.clone();
        let failed = interpreter.run(r#"import("lib/broken.fox")"#);
        let base_dir_after_failure = interpreter.base_dir.clone();

        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(result, Ok(Value::Number(27.0)));
        assert_eq!(base_dir, dir);
        assert!(matches!(
            failed.as_ref().map_err(|errs| errs[0].runtime_error().cloned()),
            Err(Some(RuntimeError::Import { .. }))
        ));
        assert_eq!(base_dir_after_failure, dir);
    }

    #[test]
    fn contained_imports_of_broken_files_yield_null() {
        let dir = std::env::temp_dir().join(format!("fox-contained-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create a scratch directory");
        std::fs::write(dir.join("syntax.fox"), "var(a 1)").expect("write syntax.fox");
        std::fs::write(dir.join("scoping.fox"), "{ var(a, 1), var(a, 2) }").expect("write scoping.fox");
        std::fs::write(dir.join("runtime.fox"), "1 / 0").expect("write runtime.fox");

        let mut interpreter = Interpreter::default()
            .with_output(Box::new(CaptureOutput::new()))
            .with_base_dir(&dir)
            .with_config(Config { nested_errors: NestedErrors::Contain });

        let syntax = interpreter.run(r#"[import("syntax.fox"), "after"]"#).map(|v| v.to_string());
        let scoping = interpreter.run(r#"import("scoping.fox")"#);
        let runtime = interpreter.run(r#"import("runtime.fox")"#);

        let mut propagating = Interpreter::default()
            .with_output(Box::new(CaptureOutput::new()))
            .with_base_dir(&dir);
        let propagated = propagating.run(r#"import("syntax.fox")"#);

        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(syntax, Ok("[null, after]".to_string()));
        assert_eq!(scoping, Ok(Value::Null));
        assert_eq!(runtime, Ok(Value::Null));
        assert!(matches!(propagated, Err(errs) if errs.iter().all(|e| e.is_static())));
    }
}
