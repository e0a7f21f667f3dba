pub mod render;
pub mod state;

use anyhow::{Context, Result};
use crossterm::{
    event::EventStream,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use std::io::stdout;
use tokio::sync::mpsc;

use crate::registry::CommandRegistry;
use crate::runner::UpdateEvent;
use state::ViewState;

/// Run the dashboard on the alternate screen until the run finishes or the
/// user quits, then restore the terminal.
pub async fn run_dashboard(
    registry: CommandRegistry,
    updates: mpsc::Receiver<UpdateEvent>,
    continue_on_error: bool,
    min_sidebar_width: u16,
) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = dashboard_loop(
        &mut terminal,
        registry,
        updates,
        continue_on_error,
        min_sidebar_width,
    )
    .await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

/// Single cooperative loop: draw, then wait on whichever arrives first, a
/// terminal input event or an update from the engines. Never busy-polls.
async fn dashboard_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    registry: CommandRegistry,
    mut updates: mpsc::Receiver<UpdateEvent>,
    continue_on_error: bool,
    min_sidebar_width: u16,
) -> Result<()> {
    let mut view = ViewState::new(registry.len(), min_sidebar_width);
    let mut input = EventStream::new();

    loop {
        terminal.draw(|f| render::draw(f, &view, &registry))?;

        tokio::select! {
            maybe_event = input.next() => {
                match maybe_event {
                    Some(Ok(event)) => {
                        if view.handle_event(&event) {
                            return Ok(());
                        }
                    }
                    Some(Err(err)) => return Err(err).context("reading terminal events"),
                    None => return Ok(()),
                }
            }
            maybe_update = updates.recv() => {
                match maybe_update {
                    Some(event) => {
                        if view.apply_update(&event, !continue_on_error) {
                            return Ok(());
                        }
                    }
                    // Channel closed: every engine has finished.
                    None => return Ok(()),
                }
            }
        }
    }
}
