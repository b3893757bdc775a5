//! User-facing output for goal handlers.

use std::fmt;
use std::io::{self, Write};

/// Writer pair the goal handlers print through.
///
/// Stdout carries deliberate results (base URLs, completion notices) so
/// builds can capture them; progress and warnings go to stderr. Handlers
/// stay testable because both sides accept any [`Write`] implementation.
#[derive(Debug)]
pub struct GoalOutput<W, E> {
    stdout: W,
    stderr: E,
}

impl<W: Write, E: Write> GoalOutput<W, E> {
    /// Wraps the given writers.
    pub const fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Writes one line of deliberate output to stdout.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`io::Error`] when the writer fails.
    pub fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.stdout.write_fmt(args)?;
        self.stdout.write_all(b"\n")?;
        self.stdout.flush()
    }

    /// Writes one diagnostic line to stderr.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`io::Error`] when the writer fails.
    pub fn stderr_line(&mut self, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.stderr.write_fmt(args)?;
        self.stderr.write_all(b"\n")?;
        self.stderr.flush()
    }

    /// Releases the wrapped writers.
    pub fn into_parts(self) -> (W, E) {
        (self.stdout, self.stderr)
    }
}
