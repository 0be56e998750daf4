pub mod app;
mod ui;

use std::{
    io::{self, Stdout},
    time::Duration,
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use crate::playback::PlaybackController;
use app::{Action, App};

const INPUT_POLL: Duration = Duration::from_millis(50);

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Runs the player screen until the user quits. The terminal is restored
/// even when the loop fails.
pub async fn run(controller: &PlaybackController) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, controller).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn event_loop(terminal: &mut Term, controller: &PlaybackController) -> Result<()> {
    let mut snapshots = controller.subscribe();
    let mut app = App::new(snapshots.borrow_and_update().clone());

    loop {
        if snapshots.has_changed().context("Playback stopped unexpectedly")? {
            app.update(snapshots.borrow_and_update().clone());
        }
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Key polling blocks; keep it off the playback task's worker.
        if !tokio::task::block_in_place(|| event::poll(INPUT_POLL))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            break;
        }

        match app.handle_key(key.code) {
            Action::Quit => break,
            Action::Send(command) => {
                debug!(?command, "key command");
                controller.try_send(command)?;
            }
            Action::Nothing => {}
        }
    }

    Ok(())
}
