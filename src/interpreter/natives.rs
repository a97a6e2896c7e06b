use std::io::{BufRead, Write};

use regex::Regex;

use crate::errors::RuntimeError;

use super::{env::Environment, value::set_element, Fun, Interpreter, Value};

fn native_error<S: Into<String>>(message: S) -> RuntimeError {
    RuntimeError::Native(message.into())
}

fn io_error(err: std::io::Error) -> RuntimeError {
    native_error(format!("Failed to access the console: {}.", err))
}

fn string_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str, RuntimeError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(native_error(format!("{}() expects a string, but got {}.", name, other.type_name()))),
    }
}

fn array_arg(name: &str, value: &Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::Array(elements) => Ok(elements.borrow().clone()),
        other => Err(native_error(format!("{}() expects an array, but got {}.", name, other.type_name()))),
    }
}

fn regex_arg(name: &str, value: &Value) -> Result<Regex, RuntimeError> {
    let pattern = string_arg(name, value)?;
    Regex::new(pattern).map_err(|e| native_error(format!("Invalid regex supplied to {}(): {}", name, e)))
}

/// Defines every native function in the global frame.
pub(super) fn register(globals: &Environment) {
    let define = |name: &str, arity: usize, fun: fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError>| {
        globals.define(name, Value::Function(Fun::native(name, arity, fun)));
    };

    define("clock", 0, |_, _| {
        let offset = std::time::SystemTime::now().duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_err(|_| native_error("Failed to get the current system time because the system clock is set before 1970-01-01T00:00:00Z."))?;

        Ok(Value::Number(offset.as_secs_f64()))
    });

    define("print", 1, |interpreter, args| {
        let text = args[0].to_string();
        write!(interpreter.output, "{}", text).map_err(io_error)?;
        interpreter.output.flush().map_err(io_error)?;
        Ok(Value::String(text))
    });

    define("println", 1, |interpreter, args| {
        let text = args[0].to_string();
        writeln!(interpreter.output, "{}", text).map_err(io_error)?;
        Ok(Value::String(text))
    });

    define("input", 1, |interpreter, args| {
        write!(interpreter.output, "{}", args[0]).map_err(io_error)?;
        interpreter.output.flush().map_err(io_error)?;

        let mut line = String::new();
        interpreter.input.read_line(&mut line).map_err(io_error)?;
        Ok(Value::String(line.trim_end_matches(['\r', '\n']).to_string()))
    });

    define("getch", 0, |interpreter, _| {
        loop {
            let buf = interpreter.input.fill_buf().map_err(io_error)?;
            let Some(&byte) = buf.first() else {
                return Ok(Value::Null);
            };

            interpreter.input.consume(1);
            if !byte.is_ascii_whitespace() {
                return Ok(Value::Number(byte as f64));
            }
        }
    });

    define("charToStr", 1, |_, args| match &args[0] {
        Value::Number(n) => char::from_u32(*n as u32)
            .map(|c| Value::String(c.to_string()))
            .ok_or_else(|| native_error(format!("'{}' is not a valid character code.", n))),
        other => Err(native_error(format!("charToStr() expects a numerical character code, but got {}.", other.type_name()))),
    });

    define("len", 1, |_, args| match &args[0] {
        Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
        Value::Array(elements) => Ok(Value::Number(elements.borrow().len() as f64)),
        other => Err(native_error(format!("Can only retrieve the length of strings and arrays, but got {}.", other.type_name()))),
    });

    define("eval", 1, |interpreter, args| {
        let source = string_arg("eval", &args[0])?;
        let base_dir = interpreter.base_dir.clone();

        let result = interpreter.evaluate_nested(source, base_dir);
        interpreter.settle_nested("eval", result).map_err(RuntimeError::Eval)
    });

    define("Array", 1, |_, args| match &args[0] {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => {
            let capacity = *n as usize;
            let mut elements = Vec::new();
            elements.try_reserve_exact(capacity)
                .map_err(|_| native_error(format!("Cannot allocate an array with {} elements.", n)))?;

            elements.resize(capacity, Value::Null);
            Ok(Value::array(elements))
        },
        other => Err(native_error(format!("'{}' is not a valid array capacity.", other))),
    });

    define("set", 3, |_, mut args| {
        let value = args.pop().unwrap_or(Value::Null);
        set_element(&args[0], &args[1], value)?;
        Ok(args[0].clone())
    });

    define("merge", 2, |_, args| {
        let mut merged = array_arg("merge", &args[0])?;
        merged.extend(array_arg("merge", &args[1])?);
        Ok(Value::array(merged))
    });

    define("split", 2, |_, args| {
        let text = string_arg("split", &args[0])?;
        let pattern = regex_arg("split", &args[1])?;
        Ok(Value::array(pattern.split(text).map(|s| Value::String(s.to_string())).collect()))
    });

    define("replace", 3, |_, args| {
        let text = string_arg("replace", &args[0])?;
        let pattern = regex_arg("replace", &args[1])?;
        let replacement = string_arg("replace", &args[2])?;
        Ok(Value::String(pattern.replace_all(text, replacement).into_owned()))
    });

    define("trim", 1, |_, args| {
        Ok(Value::String(string_arg("trim", &args[0])?.trim().to_string()))
    });

    define("typeOf", 1, |_, args| Ok(Value::String(args[0].type_name().to_string())));

    define("Number", 1, |_, args| match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        other => {
            let text = other.to_string();
            text.trim().parse::<f64>()
                .map(Value::Number)
                .map_err(|_| native_error(format!("Cannot parse '{}' as a number.", text)))
        },
    });
}

#[cfg(test)]
mod tests {
    use crate::{interpreter::{Interpreter, Value}, CaptureOutput};

    fn display(source: &str) -> String {
        let mut interpreter = Interpreter::default().with_output(Box::new(CaptureOutput::new()));
        match interpreter.run(source) {
            Ok(value) => value.to_string(),
            Err(errs) => errs.iter().map(|e| e.description()).collect::<Vec<_>>().join("\n"),
        }
    }

    #[test]
    fn strings() {
        assert_eq!(display(r#"len("fox")"#), "3");
        assert_eq!(display(r#"trim("  fox  ")"#), "fox");
        assert_eq!(display(r#"split("a, b,c", ",\s*")"#), "[a, b, c]");
        assert_eq!(display(r#"replace("a1b22", "[0-9]+", "-")"#), "a-b-");
        assert!(display(r#"split("a", "(")"#).starts_with("Invalid regex supplied to split()"));
    }

    #[test]
    fn arrays() {
        assert_eq!(display("Array(2)"), "[null, null]");
        assert_eq!(display("Array(0)"), "[]");
        assert_eq!(display("Array(1.5)"), "'1.5' is not a valid array capacity.");
        assert_eq!(display("Array(-1)"), "'-1' is not a valid array capacity.");
        assert_eq!(display("Array(100000000000000000000)"), "Cannot allocate an array with 100000000000000000000 elements.");
        assert_eq!(display("len([1, 2, 3])"), "3");
        assert_eq!(display("merge([1], [2, 3])"), "[1, 2, 3]");
        assert_eq!(display("var(xs, [1, 2]) set(xs, 0, 5) xs"), "[5, 2]");
        assert_eq!(display("set([1], 1, 5)"), "Array index out of bounds '1'.");
        assert_eq!(display("merge(1, [2])"), "merge() expects an array, but got number.");
    }

    #[test]
    fn conversions() {
        assert_eq!(display(r#"Number("12.5") + 1"#), "13.5");
        assert_eq!(display(r#"Number("fox")"#), "Cannot parse 'fox' as a number.");
        assert_eq!(display("charToStr(65)"), "A");
        assert_eq!(
            display(r#"[typeOf(null), typeOf(true), typeOf(1), typeOf("s"), typeOf([]), typeOf(len)]"#),
            "[null, boolean, number, string, array, function]"
        );
    }

    #[test]
    fn clock_returns_seconds() {
        let mut interpreter = Interpreter::default().with_output(Box::new(CaptureOutput::new()));
        assert!(matches!(interpreter.run("clock()"), Ok(Value::Number(n)) if n > 0.0));
    }
}
