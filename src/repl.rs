//! Line-oriented chat front end.
//!
//! Simple mode only understands `quit`; interactive mode adds `reset`,
//! `help`, and `schema`. Everything else is sent to the agent.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::agent::ChatSession;
use crate::catalog::SchemaCatalog;
use crate::error::Result;

const RULE: &str = "======================================================================";

/// Example questions shown by `help`, grouped by topic.
pub const EXAMPLE_QUESTIONS: &[(&str, &[&str])] = &[
    (
        "User search",
        &[
            "Find the user named User_1",
            "Show 5 female users",
            "List the 10 most recently joined users",
        ],
    ),
    (
        "Glucose data",
        &[
            "Show User_1's glucose data for the last 7 days",
            "Count User_1's glucose measurements",
            "What was User_1's glucose level yesterday?",
        ],
    ),
    (
        "Glucose analysis",
        &[
            "Analyse User_1's glucose",
            "Calculate User_1's average glucose level",
            "How many times did User_1 have hyperglycemia?",
        ],
    ),
];

/// Front end flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Simple,
    Interactive,
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Quit,
    Reset,
    Help,
    Schema,
    Ask(String),
}

impl Command {
    /// Parses a line; commands other than `quit` only exist in interactive mode.
    pub fn parse(line: &str, mode: Mode) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }

        let lower = trimmed.to_lowercase();
        match (lower.as_str(), mode) {
            ("quit" | "exit" | "q", _) => Self::Quit,
            ("reset" | "clear", Mode::Interactive) => Self::Reset,
            ("help" | "h" | "?", Mode::Interactive) => Self::Help,
            ("schema", Mode::Interactive) => Self::Schema,
            _ => Self::Ask(trimmed.to_string()),
        }
    }
}

/// Reads questions line by line and prints the agent's answers.
pub struct Repl {
    mode: Mode,
    catalog: Arc<SchemaCatalog>,
}

impl Repl {
    pub fn new(mode: Mode, catalog: Arc<SchemaCatalog>) -> Self {
        Self { mode, catalog }
    }

    /// Runs until `quit` or end of input.
    pub async fn run<R, W>(&self, session: &mut ChatSession, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        self.print_banner(out)?;
        let mut lines = input.lines();

        loop {
            write!(out, "{}", self.prompt())?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                break;
            };

            match Command::parse(&line, self.mode) {
                Command::Empty => continue,
                Command::Quit => {
                    writeln!(out, "\nGoodbye.")?;
                    break;
                }
                Command::Reset => {
                    session.reset();
                    writeln!(out, "\nConversation history cleared.\n")?;
                }
                Command::Help => self.print_examples(out)?,
                Command::Schema => {
                    writeln!(out, "\n{}\n", self.catalog.describe())?;
                }
                Command::Ask(question) => match session.chat(&question).await {
                    Ok(answer) => writeln!(out, "\nAgent: {}\n", answer)?,
                    Err(e) => {
                        tracing::error!(error = %e, "Chat failed");
                        writeln!(out, "\n{}\nPlease try again.\n", e.report())?;
                    }
                },
            }
        }

        Ok(())
    }

    fn prompt(&self) -> &'static str {
        match self.mode {
            Mode::Simple => "You: ",
            Mode::Interactive => "You> ",
        }
    }

    fn print_banner<W: Write>(&self, out: &mut W) -> Result<()> {
        let written = match self.mode {
            Mode::Simple => writeln!(
                out,
                "\nHealth Data AI Agent\n{}\nAsk questions in plain language. Type 'quit' to exit.\n",
                &RULE[..60]
            ),
            Mode::Interactive => writeln!(
                out,
                "\n{rule}\nHealth Data AI Assistant\n{rule}\n\n\
                 Ask in plain language; the assistant queries the database to answer.\n\n\
                 Commands:\n\
                 \x20 - quit, exit: leave the program\n\
                 \x20 - reset: clear the conversation history\n\
                 \x20 - help: show example questions\n\
                 \x20 - schema: show the database schema\n\
                 {rule}\n",
                rule = RULE
            ),
        };
        Ok(written?)
    }

    fn print_examples<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "\n{}\nExample questions\n{}\n", RULE, RULE)?;
        for (category, questions) in EXAMPLE_QUESTIONS {
            writeln!(out, "{}", category)?;
            for (i, question) in questions.iter().enumerate() {
                writeln!(out, "  {}. {}", i + 1, question)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}
