use std::{cell::RefCell, collections::VecDeque, io::Read, rc::Rc};

/// A writer which collects everything a program prints, for the REPL echo and for tests.
#[derive(Debug, Clone, Default)]
pub struct CaptureOutput {
    into: Rc<RefCell<String>>,
}

impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> String {
        std::mem::take(&mut *self.into.borrow_mut())
    }
}

impl std::io::Write for CaptureOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.into.borrow_mut().push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Display for CaptureOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.into.borrow())
    }
}

/// A reader fed from a fixed script of input, standing in for stdin.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    remaining: VecDeque<u8>,
}

impl ScriptedInput {
    pub fn new<S: AsRef<str>>(input: S) -> Self {
        Self { remaining: input.as_ref().bytes().collect() }
    }
}

impl Read for ScriptedInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.remaining.read(buf)
    }
}
