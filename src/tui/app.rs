use crossterm::event::KeyCode;

use crate::playback::{Command, PlaybackState, Snapshot, Speed};

const SCRUB_STEP: f64 = 0.05;

/// What the event loop should do after a key press.
#[derive(Debug)]
pub enum Action {
    Send(Command),
    Quit,
    Nothing,
}

/// Terminal-side view state. Everything about playback comes from the
/// latest controller snapshot; the app only owns selection and scrubbing.
pub struct App {
    pub snapshot: Snapshot,
    pub selected: usize,
    pub scrub: Option<f64>,
    pub confirm_clear: bool,
}

impl App {
    pub fn new(snapshot: Snapshot) -> Self {
        let selected = snapshot.current_index.unwrap_or(0);
        Self {
            snapshot,
            selected,
            scrub: None,
            confirm_clear: false,
        }
    }

    pub fn update(&mut self, snapshot: Snapshot) {
        if snapshot.current_index != self.snapshot.current_index {
            if let Some(current) = snapshot.current_index {
                self.selected = current;
            }
        }
        self.selected = self.selected.min(snapshot.entries.len().saturating_sub(1));
        if !snapshot.adjusting && self.snapshot.adjusting {
            self.scrub = None;
        }
        self.snapshot = snapshot;
    }

    /// Gauge position: the scrub cursor while scrubbing, otherwise playback.
    pub fn progress(&self) -> f64 {
        self.scrub.unwrap_or(self.snapshot.position.fraction)
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Action {
        if self.confirm_clear {
            self.confirm_clear = false;
            return match code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Action::Send(Command::Clear),
                _ => Action::Nothing,
            };
        }

        if let Some(fraction) = self.scrub {
            match code {
                KeyCode::Left | KeyCode::Right => {
                    self.scrub = Some(step(fraction, code));
                    return Action::Nothing;
                }
                KeyCode::Enter => {
                    self.scrub = None;
                    return Action::Send(Command::EndSeek(fraction));
                }
                KeyCode::Esc => {
                    self.scrub = None;
                    return Action::Send(Command::CancelSeek);
                }
                _ => {}
            }
        }

        match code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('p') => Action::Send(Command::Play),
            KeyCode::Char(' ') => {
                if self.snapshot.state == PlaybackState::Playing {
                    Action::Send(Command::Pause)
                } else {
                    Action::Send(Command::Play)
                }
            }
            KeyCode::Char('s') => Action::Send(Command::Stop),
            KeyCode::Char('n') => Action::Send(Command::Next),
            KeyCode::Char('b') => Action::Send(Command::Previous),
            KeyCode::Char(c @ ('1' | '2' | '4' | '8')) => match c.to_string().parse::<Speed>() {
                Ok(speed) => Action::Send(Command::SetSpeed(speed)),
                Err(_) => Action::Nothing,
            },
            KeyCode::Char('c') => {
                self.confirm_clear = !self.snapshot.entries.is_empty();
                Action::Nothing
            }
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                Action::Nothing
            }
            KeyCode::Down => {
                if self.selected + 1 < self.snapshot.entries.len() {
                    self.selected += 1;
                }
                Action::Nothing
            }
            KeyCode::Enter if !self.snapshot.entries.is_empty() => {
                Action::Send(Command::PlayAt(self.selected))
            }
            KeyCode::Left | KeyCode::Right if self.snapshot.current_index.is_some() => {
                self.scrub = Some(step(self.snapshot.position.fraction, code));
                Action::Send(Command::BeginSeek)
            }
            _ => Action::Nothing,
        }
    }
}

fn step(fraction: f64, code: KeyCode) -> f64 {
    let delta = if code == KeyCode::Left { -SCRUB_STEP } else { SCRUB_STEP };
    (fraction + delta).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::position::DisplayPosition;
    use crate::state::MediaEntry;
    use std::path::PathBuf;

    fn snapshot(len: usize, current: Option<usize>, state: PlaybackState) -> Snapshot {
        let entries: Vec<MediaEntry> = (0..len)
            .map(|i| MediaEntry::new(PathBuf::from(format!("/media/{i}.mkv"))))
            .collect();
        Snapshot {
            state,
            current_index: current,
            entries: entries.into(),
            position: DisplayPosition {
                fraction: 0.5,
                elapsed_ms: 60_000,
                total_ms: 120_000,
            },
            ..Snapshot::default()
        }
    }

    #[test]
    fn space_toggles_between_play_and_pause() {
        let mut app = App::new(snapshot(2, Some(0), PlaybackState::Playing));
        assert!(matches!(app.handle_key(KeyCode::Char(' ')), Action::Send(Command::Pause)));

        app.update(snapshot(2, Some(0), PlaybackState::Paused));
        assert!(matches!(app.handle_key(KeyCode::Char(' ')), Action::Send(Command::Play)));
    }

    #[test]
    fn enter_plays_the_selected_row() {
        let mut app = App::new(snapshot(3, None, PlaybackState::Idle));
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected, 2);
        assert!(matches!(app.handle_key(KeyCode::Enter), Action::Send(Command::PlayAt(2))));
    }

    #[test]
    fn scrub_begins_moves_and_commits() {
        let mut app = App::new(snapshot(1, Some(0), PlaybackState::Playing));

        assert!(matches!(app.handle_key(KeyCode::Right), Action::Send(Command::BeginSeek)));
        assert!(matches!(app.handle_key(KeyCode::Right), Action::Nothing));
        assert!((app.progress() - 0.6).abs() < 1e-9);

        match app.handle_key(KeyCode::Enter) {
            Action::Send(Command::EndSeek(f)) => assert!((f - 0.6).abs() < 1e-9),
            other => panic!("expected EndSeek, got {other:?}"),
        }
        assert!(app.scrub.is_none());
    }

    #[test]
    fn escape_cancels_scrub() {
        let mut app = App::new(snapshot(1, Some(0), PlaybackState::Playing));
        app.handle_key(KeyCode::Left);
        assert!(matches!(app.handle_key(KeyCode::Esc), Action::Send(Command::CancelSeek)));
        assert_eq!(app.progress(), 0.5);
    }

    #[test]
    fn scrub_needs_current_media() {
        let mut app = App::new(snapshot(2, None, PlaybackState::Idle));
        assert!(matches!(app.handle_key(KeyCode::Right), Action::Nothing));
        assert!(app.scrub.is_none());
    }

    #[test]
    fn clear_asks_for_confirmation() {
        let mut app = App::new(snapshot(2, Some(0), PlaybackState::Playing));
        assert!(matches!(app.handle_key(KeyCode::Char('c')), Action::Nothing));
        assert!(app.confirm_clear);
        assert!(matches!(app.handle_key(KeyCode::Char('n')), Action::Nothing));
        assert!(!app.confirm_clear);

        app.handle_key(KeyCode::Char('c'));
        assert!(matches!(app.handle_key(KeyCode::Char('y')), Action::Send(Command::Clear)));
    }

    #[test]
    fn digit_keys_pick_speed() {
        let mut app = App::new(snapshot(1, Some(0), PlaybackState::Playing));
        assert!(matches!(
            app.handle_key(KeyCode::Char('4')),
            Action::Send(Command::SetSpeed(Speed::X4))
        ));
        assert!(matches!(app.handle_key(KeyCode::Char('3')), Action::Nothing));
    }

    #[test]
    fn selection_follows_current_and_stays_in_bounds() {
        let mut app = App::new(snapshot(3, Some(0), PlaybackState::Playing));
        app.update(snapshot(3, Some(2), PlaybackState::Playing));
        assert_eq!(app.selected, 2);

        app.update(snapshot(0, None, PlaybackState::Stopped));
        assert_eq!(app.selected, 0);
    }
}
