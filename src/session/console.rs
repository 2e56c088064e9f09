//! Line-oriented operator console.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Prompts the operator and shows messages.
pub trait Console: Send {
    /// Shows `message` and reads one line without its terminator.
    ///
    /// Returns `None` when input is exhausted.
    fn prompt(&mut self, message: &str) -> Option<String>;

    /// Shows one line.
    fn print(&mut self, line: &str);
}

/// Console on the process's stdin and stdout.
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    /// Creates a console on stdin/stdout.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Console for StdConsole {
    fn prompt(&mut self, message: &str) -> Option<String> {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{message}");
        let _ = stdout.flush();
        drop(stdout);

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn print(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Console fed from a fixed list of answers, recording everything shown.
///
/// Used for non-interactive runs and tests.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    answers: VecDeque<String>,
    prompts: Vec<String>,
    output: Vec<String>,
}

impl ScriptedConsole {
    /// Creates a console that answers prompts with `answers`, in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Prompts shown so far.
    #[must_use]
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Lines printed so far.
    #[must_use]
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Returns true if any printed line contains `needle`.
    #[must_use]
    pub fn printed(&self, needle: &str) -> bool {
        self.output.iter().any(|line| line.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn prompt(&mut self, message: &str) -> Option<String> {
        self.prompts.push(message.to_string());
        self.answers.pop_front()
    }

    fn print(&mut self, line: &str) {
        self.output.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_console_answers_in_order() {
        let mut console = ScriptedConsole::new(["one", "two"]);
        assert_eq!(console.prompt("a? ").as_deref(), Some("one"));
        assert_eq!(console.prompt("b? ").as_deref(), Some("two"));
        assert_eq!(console.prompt("c? "), None);
        assert_eq!(console.prompts(), ["a? ", "b? ", "c? "]);
    }

    #[test]
    fn test_scripted_console_records_output() {
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        console.print("hello world");
        assert!(console.printed("world"));
        assert!(!console.printed("absent"));
        assert_eq!(console.output().len(), 1);
    }
}
