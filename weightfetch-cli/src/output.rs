//! User-facing console output.

#[cfg(test)]
use std::cell::RefCell;

use console::{style, Term};

/// Where user-facing text goes.
///
/// Installer steps write through this trait so they can be tested without a
/// terminal.
pub trait Output {
    /// Print a line.
    fn println(&self, text: &str);

    /// Print without a trailing newline.
    fn print(&self, text: &str);

    /// Print an empty line.
    fn newline(&self) {
        self.println("");
    }

    /// Print a section header, e.g. `** DOWNLOADING WEIGHTS **`.
    fn header(&self, text: &str);

    /// Print an indented line.
    fn indented(&self, text: &str) {
        self.println(&format!("   {}", text));
    }

    /// Print a warning.
    fn warn(&self, text: &str);
}

/// Writes to stdout with `console` styling.
pub struct ConsoleOutput {
    term: Term,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for ConsoleOutput {
    fn println(&self, text: &str) {
        self.term.write_line(text).ok();
    }

    fn print(&self, text: &str) {
        self.term.write_str(text).ok();
    }

    fn header(&self, text: &str) {
        let line = format!("** {} **", text.to_uppercase());
        self.term
            .write_line(&style(line).bold().cyan().to_string())
            .ok();
    }

    fn warn(&self, text: &str) {
        self.term
            .write_line(&style(format!("** {}", text)).yellow().to_string())
            .ok();
    }
}

/// Collects output lines in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct BufferedOutput {
    lines: RefCell<Vec<String>>,
}

#[cfg(test)]
impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything printed so far, one entry per line.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }
}

#[cfg(test)]
impl Output for BufferedOutput {
    fn println(&self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }

    fn print(&self, text: &str) {
        self.println(text);
    }

    fn header(&self, text: &str) {
        self.println(&format!("** {} **", text.to_uppercase()));
    }

    fn warn(&self, text: &str) {
        self.println(&format!("** {}", text));
    }
}
