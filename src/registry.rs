use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Lifecycle of a single command. Transitions are one-way:
/// Pending -> Running -> Success | Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl CommandStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandStatus::Success | CommandStatus::Failed)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandStatus::Pending => "pending",
            CommandStatus::Running => "running",
            CommandStatus::Success => "success",
            CommandStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Immutable description of one command to run.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Position in the display order, assigned after dropping empty args.
    pub index: usize,
    pub program: String,
    pub args: Vec<String>,
    /// The original command text, kept for display.
    pub full_command: String,
}

impl CommandSpec {
    /// Build a spec that runs `raw` through the shell, so pipes, `&&`,
    /// redirects and the rest of the shell syntax behave as typed.
    pub fn shell(index: usize, raw: &str) -> Self {
        Self {
            index,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), raw.to_string()],
            full_command: raw.to_string(),
        }
    }
}

/// Mutable runtime state of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandState {
    pub status: CommandStatus,
    /// Captured output lines, in arrival order. stdout and stderr lines are
    /// interleaved with no guaranteed relative order between the two streams.
    pub output: Vec<String>,
    /// Meaningful only once `status` is terminal.
    pub exit_code: i32,
}

impl CommandState {
    fn new() -> Self {
        Self {
            status: CommandStatus::Pending,
            output: Vec::new(),
            exit_code: 0,
        }
    }
}

struct CommandEntry {
    spec: CommandSpec,
    state: RwLock<CommandState>,
}

/// Shared registry of every command's spec and runtime state.
///
/// Each entry has its own reader/writer lock: the engine task that owns a
/// command writes it, the dashboard reads it concurrently. Mutators are
/// crate-private so nothing outside the runner can write. `complete` sets
/// status and exit code under one write lock, so a reader can never observe a
/// terminal status without its exit code.
#[derive(Clone)]
pub struct CommandRegistry {
    entries: Arc<Vec<CommandEntry>>,
}

impl CommandRegistry {
    pub fn new(specs: Vec<CommandSpec>) -> Self {
        let entries = specs
            .into_iter()
            .map(|spec| CommandEntry {
                spec,
                state: RwLock::new(CommandState::new()),
            })
            .collect();
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn spec(&self, index: usize) -> &CommandSpec {
        &self.entries[index].spec
    }

    /// Clone of the command's current state.
    pub fn snapshot(&self, index: usize) -> CommandState {
        self.read(index).clone()
    }

    pub fn status(&self, index: usize) -> CommandStatus {
        self.read(index).status
    }

    pub fn all_terminal(&self) -> bool {
        self.entries
            .iter()
            .all(|e| read_lock(&e.state).status.is_terminal())
    }

    pub fn any_failed(&self) -> bool {
        self.entries
            .iter()
            .any(|e| read_lock(&e.state).status == CommandStatus::Failed)
    }

    pub(crate) fn set_running(&self, index: usize) {
        let mut state = self.write(index);
        debug_assert_eq!(state.status, CommandStatus::Pending);
        state.status = CommandStatus::Running;
    }

    pub(crate) fn append_line(&self, index: usize, line: String) {
        self.write(index).output.push(line);
    }

    pub(crate) fn complete(&self, index: usize, status: CommandStatus, exit_code: i32) {
        debug_assert!(status.is_terminal());
        let mut state = self.write(index);
        debug_assert!(!state.status.is_terminal());
        state.status = status;
        state.exit_code = exit_code;
    }

    fn read(&self, index: usize) -> std::sync::RwLockReadGuard<'_, CommandState> {
        read_lock(&self.entries[index].state)
    }

    fn write(&self, index: usize) -> std::sync::RwLockWriteGuard<'_, CommandState> {
        self.entries[index]
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_lock(lock: &RwLock<CommandState>) -> std::sync::RwLockReadGuard<'_, CommandState> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}
