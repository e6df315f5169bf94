//! Output abstraction for the `print` built-in.
//!
//! Implement [`PrintWriter`] to capture or redirect interpreter output;
//! the default `StdPrint` writes to stdout.

use std::io::{self, Write as _};

/// Sink for everything the interpreted program prints.
pub trait PrintWriter {
    /// Called once per `print` call with the formatted line (no trailing
    /// newline; the writer decides the terminator).
    fn write_line(&mut self, line: &str);
}

/// Default writer: one line to stdout per `print` call.
#[derive(Debug, Default)]
pub struct StdPrint;

impl PrintWriter for StdPrint {
    fn write_line(&mut self, line: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
    }
}

/// Collects all output into a string, for tests and embedders.
#[derive(Debug, Default)]
pub struct CollectStringPrint(String);

impl CollectStringPrint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_output(self) -> String {
        self.0
    }
}

impl PrintWriter for CollectStringPrint {
    fn write_line(&mut self, line: &str) {
        self.0.push_str(line);
        self.0.push('\n');
    }
}

/// Discards all output.
#[derive(Debug, Default)]
pub struct NoPrint;

impl PrintWriter for NoPrint {
    fn write_line(&mut self, _line: &str) {}
}
