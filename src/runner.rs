use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::registry::{CommandRegistry, CommandStatus};

/// Incremental state-change notification sent to the dashboard.
///
/// Every event refers to a command by index; the registry has already been
/// mutated by the time the event is emitted, so a consumer that sees an event
/// can read the registry and find the change reflected there.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    StatusChanged {
        index: usize,
        status: CommandStatus,
    },
    OutputAppended {
        index: usize,
        line: String,
    },
    Completed {
        index: usize,
        status: CommandStatus,
        exit_code: i32,
    },
}

/// Run every command in the registry concurrently.
///
/// One engine task per command, all started immediately. `cancel` is the
/// shared kill switch: when `continue_on_error` is false, the first Failed
/// completion flips it and every still-running sibling shuts its process
/// down. Returns once every engine has recorded a terminal status.
pub async fn run_commands(
    registry: CommandRegistry,
    updates: mpsc::Sender<UpdateEvent>,
    cancel: Arc<watch::Sender<bool>>,
    continue_on_error: bool,
) {
    let mut engines = JoinSet::new();
    for index in 0..registry.len() {
        engines.spawn(run_single(
            registry.clone(),
            index,
            updates.clone(),
            cancel.subscribe(),
        ));
    }
    // Engines hold their own senders; dropping ours lets the channel close
    // once the last engine finishes.
    drop(updates);

    while let Some(res) = engines.join_next().await {
        match res {
            Ok(CommandStatus::Failed) if !continue_on_error => {
                cancel.send_replace(true);
            }
            Ok(_) => {}
            Err(err) => error!(error = %err, "engine task panicked"),
        }
    }
}

/// Execute one command: spawn, stream output, wait, record terminal state.
///
/// Always ends with a `Completed` event, whatever went wrong: spawn failures
/// and cancellation-induced kills both surface as Failed so no consumer is
/// left waiting on a command that silently vanished.
async fn run_single(
    registry: CommandRegistry,
    index: usize,
    updates: mpsc::Sender<UpdateEvent>,
    mut cancel_rx: watch::Receiver<bool>,
) -> CommandStatus {
    // Refuse to start if the run was already aborted.
    if *cancel_rx.borrow() {
        return finish(&registry, index, &updates, CommandStatus::Failed, 1).await;
    }

    registry.set_running(index);
    let _ = updates
        .send(UpdateEvent::StatusChanged {
            index,
            status: CommandStatus::Running,
        })
        .await;

    let spec = registry.spec(index).clone();
    debug!(index, command = %spec.full_command, "spawning");

    let mut child = match Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            warn!(index, command = %spec.full_command, error = %err, "spawn failed");
            return finish(&registry, index, &updates, CommandStatus::Failed, 1).await;
        }
    };

    let mut readers = JoinSet::new();
    if let Some(stdout) = child.stdout.take() {
        readers.spawn(stream_lines(stdout, registry.clone(), index, updates.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.spawn(stream_lines(stderr, registry.clone(), index, updates.clone()));
    }

    let exit = tokio::select! {
        res = child.wait() => res,
        // `wait_for` resolves to a borrow guard that isn't `Send`; drop it
        // inside the arm's future (map to `()`) so the select branch yields a
        // `Send` value and the whole future stays `Send`.
        Ok(()) = async { cancel_rx.wait_for(|cancelled| *cancelled).await.map(|_| ()) } => {
            debug!(index, command = %spec.full_command, "cancelled, killing process");
            if let Err(err) = child.start_kill() {
                warn!(index, error = %err, "failed to kill child process");
            }
            let res = child.wait().await;
            // Grandchildren of the shell can keep the pipes open past the
            // kill; stop the readers rather than waiting for EOF. Whatever
            // they already appended stays in the registry.
            readers.abort_all();
            res
        }
    };

    // The readers hit EOF once the process is gone; drain the tail of the
    // output before recording the terminal state, so `Completed` is the last
    // event this command emits.
    while readers.join_next().await.is_some() {}

    let (status, exit_code) = match exit {
        Ok(s) if s.success() => (CommandStatus::Success, 0),
        Ok(s) => (CommandStatus::Failed, s.code().unwrap_or(1)),
        Err(err) => {
            warn!(index, error = %err, "failed to reap child process");
            (CommandStatus::Failed, 1)
        }
    };

    finish(&registry, index, &updates, status, exit_code).await
}

/// Record the terminal state in the registry, then emit `Completed`.
async fn finish(
    registry: &CommandRegistry,
    index: usize,
    updates: &mpsc::Sender<UpdateEvent>,
    status: CommandStatus,
    exit_code: i32,
) -> CommandStatus {
    registry.complete(index, status, exit_code);
    let _ = updates
        .send(UpdateEvent::Completed {
            index,
            status,
            exit_code,
        })
        .await;
    status
}

/// Read one output stream line by line, appending each line to the registry
/// before emitting its `OutputAppended` event.
///
/// A closed update channel (dashboard gone) is not an error: the registry
/// stays authoritative and the stream keeps draining so the child never
/// blocks on a full pipe.
async fn stream_lines<R>(
    reader: R,
    registry: CommandRegistry,
    index: usize,
    updates: mpsc::Sender<UpdateEvent>,
) where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        registry.append_line(index, line.clone());
        let _ = updates.send(UpdateEvent::OutputAppended { index, line }).await;
    }
}
