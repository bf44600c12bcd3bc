//! Build console sink
//!
//! The build host shows these lines to the user. Diagnostics go through `tracing`
//! instead.

use std::sync::Mutex;

use colored::Colorize;

/// Prefix of warning lines
pub const WARNING_PREFIX: &str = "WARNING: ";

/// Prefix of error lines
pub const ERROR_PREFIX: &str = "ERROR: ";

/// A line oriented console
pub trait Console: Send + Sync {
    /// Print one line
    fn line(&self, line: &str);

    /// Print a warning line
    fn warn(&self, message: &str) {
        self.line(&format!("{}{}", WARNING_PREFIX, message));
    }

    /// Print an error line
    fn error(&self, message: &str) {
        self.line(&format!("{}{}", ERROR_PREFIX, message));
    }
}

/// Console writing to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn line(&self, line: &str) {
        if let Some(rest) = line.strip_prefix(WARNING_PREFIX) {
            println!("{}{}", WARNING_PREFIX.yellow().bold(), rest);
        } else if let Some(rest) = line.strip_prefix(ERROR_PREFIX) {
            println!("{}{}", ERROR_PREFIX.red().bold(), rest);
        } else {
            println!("{}", line);
        }
    }
}

/// Console keeping every line in memory
#[derive(Debug, Default)]
pub struct BufferConsole {
    lines: Mutex<Vec<String>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines printed so far
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whole output joined with newlines
    pub fn contents(&self) -> String {
        self.lines().join("\n")
    }

    /// True if any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl Console for BufferConsole {
    fn line(&self, line: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_string()),
            Err(poisoned) => poisoned.into_inner().push(line.to_string()),
        }
    }
}
