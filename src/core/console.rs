//! The I/O surface a performance talks to.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Input and output for one run of the engine.
///
/// Inputs are returned raw; the engine decides whether they are acceptable.
pub trait Console {
    fn print(&mut self, text: &str) -> io::Result<()>;

    /// Supply the input for one character read. Anything other than exactly
    /// one Unicode scalar value is rejected by the engine.
    fn read_char(&mut self) -> io::Result<String>;

    /// Supply one token for an integer read.
    fn read_int(&mut self) -> io::Result<String>;

    /// Whether the engine should report every executed operation.
    fn debug(&self) -> bool {
        false
    }

    fn print_debug(&mut self, _text: &str) -> io::Result<()> {
        Ok(())
    }

    /// Called once as a run starts.
    fn clear(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Standard input and output, debug reports on standard error.
#[derive(Debug, Default)]
pub struct StdConsole {
    debug: bool,
    input: LineInput,
}

impl StdConsole {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            input: LineInput::default(),
        }
    }
}

impl Console for StdConsole {
    fn print(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }

    fn read_char(&mut self) -> io::Result<String> {
        self.input.read_char(&mut io::stdin().lock())
    }

    fn read_int(&mut self) -> io::Result<String> {
        self.input.read_int(&mut io::stdin().lock())
    }

    fn debug(&self) -> bool {
        self.debug
    }

    fn print_debug(&mut self, text: &str) -> io::Result<()> {
        writeln!(io::stderr().lock(), "{text}")
    }

    fn clear(&mut self) -> io::Result<()> {
        self.input.pending.clear();
        Ok(())
    }
}

/// Line-buffered input: character reads take one character of the current
/// line, integer reads take the rest of it.
#[derive(Debug, Default)]
struct LineInput {
    /// Characters of the current input line not yet consumed.
    pending: VecDeque<char>,
}

impl LineInput {
    fn read_char(&mut self, reader: &mut impl BufRead) -> io::Result<String> {
        if self.pending.is_empty() {
            self.next_line(reader)?;
        }
        Ok(self.pending.pop_front().map(String::from).unwrap_or_default())
    }

    fn read_int(&mut self, reader: &mut impl BufRead) -> io::Result<String> {
        // Skip the line ending a character read left behind, and blank lines.
        while self.pending.iter().all(|c| c.is_whitespace()) {
            self.pending.clear();
            if self.next_line(reader)? == 0 {
                break;
            }
        }
        let line: String = self.pending.drain(..).collect();
        Ok(line.trim().to_string())
    }

    /// Bytes read; 0 at end of input.
    fn next_line(&mut self, reader: &mut impl BufRead) -> io::Result<usize> {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        self.pending.extend(line.chars());
        Ok(read)
    }
}

/// Queued inputs and captured output.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    output: String,
    debug_log: Vec<String>,
    debug: bool,
    clears: usize,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Record a debug report for every operation.
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn debug_log(&self) -> &[String] {
        &self.debug_log
    }

    /// How many runs have started on this console.
    pub fn clears(&self) -> usize {
        self.clears
    }

    fn next_input(&mut self) -> io::Result<String> {
        self.inputs
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted input left"))
    }
}

impl Console for ScriptedConsole {
    fn print(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn read_char(&mut self) -> io::Result<String> {
        self.next_input()
    }

    fn read_int(&mut self) -> io::Result<String> {
        self.next_input()
    }

    fn debug(&self) -> bool {
        self.debug
    }

    fn print_debug(&mut self, text: &str) -> io::Result<()> {
        self.debug_log.push(text.to_string());
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        self.clears += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_inputs_run_out() {
        let mut console = ScriptedConsole::new(["a", "42"]);
        assert_eq!(console.read_char().unwrap(), "a");
        assert_eq!(console.read_int().unwrap(), "42");
        let err = console.read_int().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn integer_read_skips_leftover_line_ending() {
        let mut reader = io::Cursor::new("a\n42\n");
        let mut input = LineInput::default();
        assert_eq!(input.read_char(&mut reader).unwrap(), "a");
        assert_eq!(input.read_int(&mut reader).unwrap(), "42");
        assert_eq!(input.read_int(&mut reader).unwrap(), "");
    }

    #[test]
    fn integer_read_takes_rest_of_line() {
        let mut reader = io::Cursor::new("a42\n\n7\n");
        let mut input = LineInput::default();
        assert_eq!(input.read_char(&mut reader).unwrap(), "a");
        assert_eq!(input.read_int(&mut reader).unwrap(), "42");
        assert_eq!(input.read_int(&mut reader).unwrap(), "7");
        assert_eq!(input.read_int(&mut reader).unwrap(), "");
    }

    #[test]
    fn character_reads_see_line_endings() {
        let mut reader = io::Cursor::new("a\nb");
        let mut input = LineInput::default();
        assert_eq!(input.read_char(&mut reader).unwrap(), "a");
        assert_eq!(input.read_char(&mut reader).unwrap(), "\n");
        assert_eq!(input.read_char(&mut reader).unwrap(), "b");
        assert_eq!(input.read_char(&mut reader).unwrap(), "");
    }

    #[test]
    fn scripted_output_is_captured() {
        let mut console = ScriptedConsole::default();
        console.print("Hi").unwrap();
        console.print("!").unwrap();
        assert_eq!(console.output(), "Hi!");
        assert!(!console.debug());
        console.print_debug("ignored").unwrap();
        assert_eq!(console.debug_log(), ["ignored"]);
    }
}
