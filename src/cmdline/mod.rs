use crate::interpreter::{Config, NestedErrors};

#[derive(Debug, Default, Clone)]
pub struct CommandLineOptions {
    pub file: Option<String>,
    pub debug: bool,
    pub contain_nested_errors: bool,
}

impl CommandLineOptions {
    pub fn parse() -> Self {
        Self::from_args(std::env::args().skip(1))
    }

    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut options = CommandLineOptions::default();

        for arg in args {
            match arg.as_str() {
                "-d" | "--debug" => options.debug = true,
                "--contain-nested-errors" => options.contain_nested_errors = true,
                _ => {
                    if options.file.is_none() {
                        options.file = Some(arg);
                    } else {
                        tracing::warn!(argument = %arg, "ignoring unrecognized command line argument");
                    }
                }
            }
        }

        options
    }

    pub fn config(&self) -> Config {
        Config {
            nested_errors: if self.contain_nested_errors { NestedErrors::Contain } else { NestedErrors::Propagate },
        }
    }

    /// The filter directive used when `RUST_LOG` isn't set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug { "debug" } else { "warn" }
    }
}
