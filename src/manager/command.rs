//! Operator command parsing.
//!
//! One input line becomes one [`Command`]. Verbs are matched
//! case-sensitively; only the first argument token is kept. A missing name
//! argument is not a parse error: the console reports the usage line.

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    List,
    Add(Option<String>),
    Remove(Option<String>),
    Show(Option<String>),
    Test,
    Quit,
    /// Unrecognized verb, carrying the trimmed input line.
    Unknown(String),
    /// Blank line.
    Empty,
}

impl Command {
    /// Parse one line of operator input.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let mut tokens = trimmed.split_whitespace();

        let Some(verb) = tokens.next() else {
            return Command::Empty;
        };
        let arg = tokens.next().map(str::to_string);

        match verb {
            "help" | "h" => Command::Help,
            "list" | "ls" => Command::List,
            "add" => Command::Add(arg),
            "remove" => Command::Remove(arg),
            "show" => Command::Show(arg),
            "test" => Command::Test,
            "quit" | "exit" | "q" => Command::Quit,
            _ => Command::Unknown(trimmed.to_string()),
        }
    }

    /// The canonical verb for name-bearing commands, used in usage lines.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::List => "list",
            Command::Add(_) => "add",
            Command::Remove(_) => "remove",
            Command::Show(_) => "show",
            Command::Test => "test",
            Command::Quit => "quit",
            Command::Unknown(_) => "unknown",
            Command::Empty => "",
        }
    }
}

/// Usage line for a command that requires a key name.
pub fn usage(verb: &str) -> String {
    format!("Usage: {} <key-name>", verb)
}
