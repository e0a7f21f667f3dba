use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use fanout::registry::{CommandRegistry, CommandSpec};
use fanout::runner::{run_commands, UpdateEvent};

pub fn shell_registry(raws: &[&str]) -> CommandRegistry {
    let specs = raws
        .iter()
        .enumerate()
        .map(|(i, raw)| CommandSpec::shell(i, raw))
        .collect();
    CommandRegistry::new(specs)
}

/// Drive a full run and collect every event the engines emit, in arrival
/// order. Returns once the channel closes, i.e. every engine has finished.
#[allow(dead_code)]
pub async fn run_collecting(
    registry: &CommandRegistry,
    continue_on_error: bool,
    capacity: usize,
) -> Vec<UpdateEvent> {
    let (tx, mut rx) = mpsc::channel(capacity);
    let (cancel_tx, _) = watch::channel(false);
    let runner = tokio::spawn(run_commands(
        registry.clone(),
        tx,
        Arc::new(cancel_tx),
        continue_on_error,
    ));

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    runner.await.unwrap();
    events
}
