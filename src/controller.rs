use std::time::Duration;
use tracing::trace;

use crate::domain::{AppConfig, KennelError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, KennelError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                self.handle_key(key, model.raw_keyevents())
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    pub fn handle_key(&self, key: KeyEvent, raw: bool) -> Option<Message> {
        if raw {
            return Some(Message::RawKey(key));
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::FirstPage),
            KeyCode::Char('G') | KeyCode::End => Some(Message::LastPage),
            KeyCode::Char('+') => Some(Message::GrowPageSize),
            KeyCode::Char('-') => Some(Message::ShrinkPageSize),
            KeyCode::Char(c @ '1'..='9') => c.to_digit(10).map(|d| Message::SortBy(d as usize - 1)),
            KeyCode::Char(' ') => Some(Message::ToggleRow),
            KeyCode::Char('a') => Some(Message::ToggleAll),
            KeyCode::Char('d') => Some(Message::DeleteRow),
            KeyCode::Char('e') => Some(Message::ExportDocument),
            KeyCode::Char('x') => Some(Message::ExportDelimited),
            KeyCode::Char('s') => Some(Message::ToggleExportScope),
            KeyCode::Char('m') => Some(Message::ColumnPicker),
            KeyCode::Char('y') => Some(Message::CopySelection),
            KeyCode::Char('r') => Some(Message::Refresh),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('f') => Some(Message::Filter),
            KeyCode::Char('c') => Some(Message::ClearFilters),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn maps_table_keys() {
        let controller = Controller::new(&AppConfig::default());
        assert_eq!(controller.handle_key(key(KeyCode::Char('q')), false), Some(Message::Quit));
        assert_eq!(controller.handle_key(key(KeyCode::Char('1')), false), Some(Message::SortBy(0)));
        assert_eq!(controller.handle_key(key(KeyCode::Char('9')), false), Some(Message::SortBy(8)));
        assert_eq!(controller.handle_key(key(KeyCode::Char('0')), false), None);
        assert_eq!(controller.handle_key(key(KeyCode::Char(' ')), false), Some(Message::ToggleRow));
        assert_eq!(
            controller.handle_key(key(KeyCode::Char('s')), false),
            Some(Message::ToggleExportScope)
        );
    }

    #[test]
    fn raw_mode_forwards_keys() {
        let controller = Controller::new(&AppConfig::default());
        let q = key(KeyCode::Char('q'));
        assert_eq!(controller.handle_key(q, true), Some(Message::RawKey(q)));
    }
}
