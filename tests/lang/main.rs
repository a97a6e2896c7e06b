use std::path::Path;

use fox::{errors, interpreter::{library_source, Interpreter}, CaptureOutput, FoxError};

include!(concat!(env!("OUT_DIR"), "/tests/lang.rs"));

fn run_file(path: &str) -> Result<(), FoxError> {
    let content = std::fs::read(path)?;
    let content = std::str::from_utf8(&content).map_err(|_e| errors::system(
        "The file you provided is not a valid UTF-8 file.",
        "Make sure that the file is a valid UTF-8 file.",
    ))?;

    let expect_re = regex::RegexBuilder::new(r"//\s*expect: (.*)")
        .case_insensitive(true)
        .dot_matches_new_line(false)
        .build()
        .expect("regex should compile correctly");

    let expected: String = expect_re
        .captures_iter(content).map(|m| m.get(1).expect("expect expression should have a value").as_str())
        .collect::<Vec<&str>>()
        .join("\n");

    let runtime_error_re = regex::Regex::new(r"//\s*expect runtime error: (.*)").expect("regex should compile correctly");
    let expected_runtime_error = runtime_error_re.captures(content)
        .and_then(|m| m.get(1))
        .map(|m| m.as_str().trim().to_string());

    let output = CaptureOutput::new();
    let base_dir = Path::new(path).parent().map(Path::to_path_buf).unwrap_or_default();
    let mut interpreter = Interpreter::default()
        .with_output(Box::new(output.clone()))
        .with_base_dir(base_dir);

    let forest = match interpreter.compile(content) {
        Ok(forest) => forest,
        Err(errs) => {
            assert!(content.contains("// Error"), "Did not expect an error, got {:?}", errs);
            assert!(errs.iter().all(|e| e.is_static()), "Expected only static errors, got {:?}", errs);
            return Ok(());
        },
    };

    assert!(!content.contains("// Error"), "Expected an error to be raised.");

    match interpreter.interpret(&forest) {
        Ok(_) => assert!(
            expected_runtime_error.is_none() && !content.contains("// expect runtime error"),
            "Expected a runtime error to be raised."
        ),
        Err(err) => match &expected_runtime_error {
            Some(message) => assert_eq!(message, &err.description()),
            None => assert!(content.contains("// expect runtime error"), "Did not expect a runtime error, got {}", err),
        },
    }

    assert_eq!(expected.trim(), output.to_string().trim());

    Ok(())
}

#[test]
fn bundled_libraries_compile() {
    for entry in walkdir::WalkDir::new("stdlib").sort_by_file_name() {
        let entry = entry.expect("No issues opening the library file");
        if !entry.file_type().is_file() || entry.path().extension().map(|e| e != "fox").unwrap_or(true) {
            continue;
        }

        let path = entry.path();
        let source = std::fs::read_to_string(path).expect("library should be readable");
        let name = path.file_stem().and_then(|s| s.to_str()).expect("library should have a name");
        assert_eq!(library_source(name), Some(source.as_str()), "{} is not bundled under its own name", path.display());

        let mut interpreter = Interpreter::default().with_output(Box::new(CaptureOutput::new()));
        if let Err(errs) = interpreter.compile(&source) {
            panic!("{} failed to compile: {:?}", path.display(), errs);
        }
    }
}
