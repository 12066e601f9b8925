//! Line-oriented command shell over a `BrowseSession`
//!
//! Commands:
//!
//! - `ls`, `list` - list children of the current position
//! - `cd <step>`, `descend <step>` - step into a child (`..` steps out)
//! - `up`, `ascend` - step out
//! - `and`, `newgroup` - start a new AND-group from the current path
//! - `pwd` - show the current path
//! - `refresh` - re-index the browse root
//! - `exit`, `quit`, end of input - leave

use std::io::{BufRead, Write};

use super::errors::{BrowseError, BrowseResult};
use super::session::BrowseSession;

/// Prompt shown before each command
pub const PROMPT: &str = "(hods) > ";

/// Banner printed when the shell starts
pub const INTRO: &str = "Interactive document browser for HODS";

/// Whether the shell keeps reading after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command
    Continue,
    /// Leave the shell
    Exit,
}

/// Parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ls`, `list`
    List,
    /// `cd <step>`, `descend <step>`
    Descend(String),
    /// `up`, `ascend`
    Ascend,
    /// `and`, `newgroup`
    NewGroup,
    /// `pwd`
    CurrentPath,
    /// `refresh`
    Refresh,
    /// `exit`, `quit`, `EOF`
    Quit,
    /// Blank line
    Empty,
    /// Anything else, kept verbatim
    Unknown(String),
}

impl Command {
    /// Parses one input line
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (name, argument) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        match name {
            "" => Command::Empty,
            "ls" | "list" => Command::List,
            "cd" | "descend" => Command::Descend(argument.to_string()),
            "up" | "ascend" => Command::Ascend,
            "and" | "newgroup" => Command::NewGroup,
            "pwd" => Command::CurrentPath,
            "refresh" => Command::Refresh,
            "exit" | "quit" | "EOF" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Interactive shell reading commands from `input` and writing to `output`.
pub struct Shell<'s, 'a, R, W> {
    session: &'s mut BrowseSession<'a>,
    input: R,
    output: W,
}

impl<'s, 'a, R: BufRead, W: Write> Shell<'s, 'a, R, W> {
    /// Creates a shell over a session
    pub fn new(session: &'s mut BrowseSession<'a>, input: R, output: W) -> Self {
        Self {
            session,
            input,
            output,
        }
    }

    /// Runs until `exit` or end of input.
    pub fn run(&mut self) -> BrowseResult<()> {
        writeln!(self.output, "{}", INTRO)?;
        let mut line = String::new();
        loop {
            write!(self.output, "{}", PROMPT)?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(());
            }
            if self.execute(&Command::parse(&line))? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Executes one command, printing its output.
    ///
    /// Navigation refusals and index failures are printed and the shell
    /// carries on; only terminal I/O errors are returned.
    pub fn execute(&mut self, command: &Command) -> BrowseResult<Flow> {
        let result = match command {
            Command::Empty => Ok(()),
            Command::List => self.list(),
            Command::Descend(step) => self.session.descend(step),
            Command::Ascend => {
                self.session.ascend();
                Ok(())
            }
            Command::NewGroup => {
                self.session.new_group();
                Ok(())
            }
            Command::CurrentPath => {
                let path = self.session.current_path();
                writeln!(self.output, "{}", path)?;
                Ok(())
            }
            Command::Refresh => self.session.refresh().map(|_| ()),
            Command::Quit => return Ok(Flow::Exit),
            Command::Unknown(line) => {
                writeln!(self.output, "*** Unknown syntax: {}", line)?;
                Ok(())
            }
        };

        match result {
            Ok(()) => Ok(Flow::Continue),
            Err(BrowseError::Io(e)) => Err(e.into()),
            Err(e) => {
                writeln!(self.output, "{}", e)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn list(&mut self) -> BrowseResult<()> {
        let listing = self.session.list_children()?;
        for step in listing.steps() {
            writeln!(self.output, "{}", step)?;
        }
        Ok(())
    }
}
