//! Line-oriented console adapter.
//!
//! [`ConsoleView`] and [`ConsoleRouter`] implement the presenter's ports by
//! writing plain text. [`Console`] turns typed [`Command`]s into intents and
//! drives whatever the router presented (the open editor, a pending retry).
//! Rows are numbered from 1 on screen and from 0 everywhere else.

use std::io::Write;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::warn;

use crate::detail::TaskEditor;
use crate::dispatch::{MainHandle, RetryAction, UserIntent};
use crate::display::TaskRow;
use crate::presenter::{TasksRouter, TasksView};

/// Help text listing every command.
pub const USAGE: &str = "\
Commands:
    list              Show the task list
    search <text>     Filter tasks by title (empty to clear)
    toggle <n>        Toggle completion of task n
    delete <n>        Delete task n
    share <n>         Share task n
    edit <n>          Edit task n
    new               Create a task
    title <text>      Set the title of the task being edited
    body <text>       Set the description of the task being edited
    save              Save the task being edited
    cancel            Discard the task being edited
    retry             Retry loading tasks
    help              Show this help
    quit              Exit";

/// Errors from parsing or executing a console command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Nothing was typed.
    #[error("empty command")]
    Empty,

    /// The command word is not known.
    #[error("unknown command: {0}")]
    Unknown(String),

    /// The command needs an argument that was not given.
    #[error("{0} requires an argument")]
    MissingArgument(&'static str),

    /// The row number is not a positive integer.
    #[error("invalid task number: {0}")]
    InvalidIndex(String),

    /// An editor command was given while nothing is being edited.
    #[error("no task is being edited")]
    NoEditor,
}

/// A parsed console command. Indices are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Search(String),
    Toggle(usize),
    Delete(usize),
    Share(usize),
    Edit(usize),
    New,
    Title(String),
    Body(String),
    Save,
    Cancel,
    Retry,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Err(CommandError::Empty),
            "list" | "ls" => Self::List,
            "search" => Self::Search(rest.to_string()),
            "toggle" => Self::Toggle(parse_index("toggle", rest)?),
            "delete" | "rm" => Self::Delete(parse_index("delete", rest)?),
            "share" => Self::Share(parse_index("share", rest)?),
            "edit" => Self::Edit(parse_index("edit", rest)?),
            "new" => Self::New,
            "title" => Self::Title(required("title", rest)?),
            "body" => Self::Body(required("body", rest)?),
            "save" => Self::Save,
            "cancel" => Self::Cancel,
            "retry" => Self::Retry,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(command)
    }
}

/// Converts a one-based row number to an index.
fn parse_index(command: &'static str, arg: &str) -> Result<usize, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingArgument(command));
    }
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(CommandError::InvalidIndex(arg.to_string())),
    }
}

fn required(command: &'static str, arg: &str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument(command))
    } else {
        Ok(arg.to_string())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    editor: Option<TaskEditor>,
    retry: Option<RetryAction>,
}

/// State shared between the router, which opens things, and the
/// [`Console`], which acts on them. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSession {
    state: Arc<Mutex<SessionState>>,
}

impl ConsoleSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an editor is open.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.lock().editor.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What the input loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Help,
    Quit,
}

/// Executes commands against the interactive context.
#[derive(Debug, Clone)]
pub struct Console {
    main: MainHandle,
    session: ConsoleSession,
}

impl Console {
    pub fn new(main: MainHandle, session: ConsoleSession) -> Self {
        Self { main, session }
    }

    /// Parses and executes one input line.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] if the line is not a valid command or an
    /// editor command is given with no editor open.
    pub fn execute_line(&self, line: &str) -> Result<Flow, CommandError> {
        self.execute(line.parse()?)
    }

    /// Executes one command.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NoEditor`] for editor commands when nothing is
    /// being edited.
    pub fn execute(&self, command: Command) -> Result<Flow, CommandError> {
        match command {
            Command::List => self.intent(UserIntent::Refresh),
            Command::Search(text) => self.intent(UserIntent::Search(text)),
            Command::Toggle(i) => self.intent(UserIntent::Toggle(i)),
            Command::Delete(i) => self.intent(UserIntent::Delete(i)),
            Command::Share(i) => self.intent(UserIntent::Share(i)),
            Command::Edit(i) => self.intent(UserIntent::Edit(i)),
            Command::New => self.intent(UserIntent::CreateNew),
            Command::Title(title) => self.with_editor(|editor| editor.set_title(title)),
            Command::Body(body) => self.with_editor(|editor| editor.set_body(body)),
            Command::Save => {
                let editor = self.take_editor()?;
                editor.save();
                Ok(Flow::Continue)
            }
            Command::Cancel => {
                self.take_editor()?.cancel();
                Ok(Flow::Continue)
            }
            Command::Retry => {
                let pending = self.session.lock().retry.take();
                match pending {
                    Some(retry) => retry.retry(),
                    None => self.main.retry_action().retry(),
                }
                Ok(Flow::Continue)
            }
            Command::Help => Ok(Flow::Help),
            Command::Quit => Ok(Flow::Quit),
        }
    }

    fn intent(&self, intent: UserIntent) -> Result<Flow, CommandError> {
        self.main.intent(intent);
        Ok(Flow::Continue)
    }

    fn with_editor(&self, edit: impl FnOnce(&mut TaskEditor)) -> Result<Flow, CommandError> {
        let mut state = self.session.lock();
        let editor = state.editor.as_mut().ok_or(CommandError::NoEditor)?;
        edit(editor);
        Ok(Flow::Continue)
    }

    fn take_editor(&self) -> Result<TaskEditor, CommandError> {
        self.session.lock().editor.take().ok_or(CommandError::NoEditor)
    }
}

/// Formats a row for display. `index` is zero-based.
#[must_use]
pub fn format_row(index: usize, row: &TaskRow) -> String {
    let mark = if row.completed { 'x' } else { ' ' };
    format!("{:>3}. [{mark}] {} | {} ({})", index + 1, row.title, row.body, row.date)
}

/// [`TasksView`] writing to `W`.
#[derive(Debug)]
pub struct ConsoleView<W> {
    out: W,
}

impl<W: Write + Send> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            warn!(error = %e, "Failed to write to console");
        }
    }
}

impl<W: Write + Send> TasksView for ConsoleView<W> {
    fn reload_all(&mut self, rows: &[TaskRow]) {
        if rows.is_empty() {
            self.emit("No tasks.");
            return;
        }
        let listing: Vec<String> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| format_row(i, row))
            .collect();
        self.emit(&listing.join("\n"));
    }

    fn reload_row(&mut self, index: usize, row: &TaskRow) {
        self.emit(&format_row(index, row));
    }

    fn row_deleted(&mut self, index: usize) {
        self.emit(&format!("Deleted task {}.", index + 1));
    }

    fn show_share_sheet(&mut self, text: &str) {
        self.emit(&format!("--- share ---\n{text}\n-------------"));
    }
}

/// [`TasksRouter`] writing to `W` and parking what it presents in a
/// [`ConsoleSession`].
#[derive(Debug)]
pub struct ConsoleRouter<W> {
    out: W,
    session: ConsoleSession,
}

impl<W: Write + Send> ConsoleRouter<W> {
    pub fn new(out: W, session: ConsoleSession) -> Self {
        Self { out, session }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            warn!(error = %e, "Failed to write to console");
        }
    }
}

impl<W: Write + Send> TasksRouter for ConsoleRouter<W> {
    fn show_task_detail(&mut self, editor: TaskEditor) {
        let text = format!(
            "Editing \"{}\": {}\n(use title, body, save or cancel)",
            editor.title(),
            editor.body()
        );
        if let Some(previous) = self.session.lock().editor.replace(editor) {
            previous.cancel();
        }
        self.emit(&text);
    }

    fn show_error_alert(&mut self, message: &str, retry: RetryAction) {
        self.session.lock().retry = Some(retry);
        self.emit(&format!("Error: {message}\n(type retry to try again)"));
    }
}
