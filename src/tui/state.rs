//! UI-thread state and key handling.
//!
//! Owned by the UI thread only. Everything shared with the controller comes in
//! through `Snapshot`; everything going out is a `KeyAction`.

use crate::model::LOGIN_REQUIRED_MESSAGE;
use crate::orchestrator::{Snapshot, UiCommand};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub const TAB_COMPOSE: usize = 0;
pub const TAB_HELP: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Role,
    Topic,
    History,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Role => Focus::Topic,
            Focus::Topic => Focus::History,
            Focus::History => Focus::Role,
        }
    }
}

/// Live control enablement, read from the orchestrator at key time.
#[derive(Debug, Clone, Copy)]
pub struct Controls {
    pub can_submit: bool,
    pub can_share: bool,
}

/// What the event loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Send(UiCommand),
    Copy(String),
    Quit,
}

#[derive(Debug, Default)]
pub struct UiState {
    pub tab: usize,
    pub focus: Focus,
    pub role: String,
    pub topic: String,
    pub history_selected: usize, // 0 = newest
    pub history_scroll_offset: usize,
    pub info: String,
}

impl UiState {
    /// Keep the selection inside the list after a history refresh.
    pub fn clamp_selection(&mut self, len: usize) {
        if len == 0 {
            self.history_selected = 0;
            self.history_scroll_offset = 0;
        } else if self.history_selected >= len {
            self.history_selected = len - 1;
        }
    }

    /// Scroll so the selection is visible in a list of `rows` rows.
    pub fn scroll_into_view(&mut self, rows: usize) {
        let rows = rows.max(1);
        if self.history_selected < self.history_scroll_offset {
            self.history_scroll_offset = self.history_selected;
        } else if self.history_selected >= self.history_scroll_offset + rows {
            self.history_scroll_offset = self.history_selected + 1 - rows;
        }
    }

    pub fn handle_key(&mut self, k: KeyEvent, snap: &Snapshot, controls: Controls) -> KeyAction {
        if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
            return KeyAction::Quit;
        }

        if self.tab == TAB_HELP {
            return match k.code {
                KeyCode::Char('q') => KeyAction::Quit,
                KeyCode::Esc | KeyCode::Tab | KeyCode::Char('?') => {
                    self.tab = TAB_COMPOSE;
                    KeyAction::None
                }
                _ => KeyAction::None,
            };
        }

        match (self.focus, k.code) {
            (_, KeyCode::Tab) => {
                self.focus = self.focus.next();
                KeyAction::None
            }
            (_, KeyCode::Enter) => self.submit(snap, controls.can_submit),
            (Focus::Role | Focus::Topic, KeyCode::Esc) => {
                self.focus = Focus::History;
                KeyAction::None
            }
            (Focus::Role, KeyCode::Backspace) => {
                self.role.pop();
                KeyAction::None
            }
            (Focus::Topic, KeyCode::Backspace) => {
                self.topic.pop();
                KeyAction::None
            }
            (Focus::Role, KeyCode::Char(c)) => {
                self.role.push(c);
                KeyAction::None
            }
            (Focus::Topic, KeyCode::Char(c)) => {
                self.topic.push(c);
                KeyAction::None
            }
            (Focus::History, KeyCode::Char('q')) => KeyAction::Quit,
            (Focus::History, KeyCode::Char('?')) => {
                self.tab = TAB_HELP;
                KeyAction::None
            }
            (Focus::History, KeyCode::Char('r')) => {
                self.info = "Refreshing history...".into();
                KeyAction::Send(UiCommand::RefreshHistory)
            }
            (Focus::History, KeyCode::Char('s')) => self.share_selected(snap, controls.can_share),
            (Focus::History, KeyCode::Char('y')) => {
                let text = snap.generation.result_text.clone();
                if text.is_empty() {
                    self.info = "Nothing to copy yet.".into();
                    KeyAction::None
                } else {
                    KeyAction::Copy(text)
                }
            }
            (Focus::History, KeyCode::Up | KeyCode::Char('k')) => {
                self.history_selected = self.history_selected.saturating_sub(1);
                KeyAction::None
            }
            (Focus::History, KeyCode::Down | KeyCode::Char('j')) => {
                if self.history_selected + 1 < snap.history.len() {
                    self.history_selected += 1;
                }
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    fn submit(&mut self, snap: &Snapshot, can_submit: bool) -> KeyAction {
        if !can_submit || snap.generation.is_loading {
            return KeyAction::None;
        }
        if self.role.trim().is_empty() || self.topic.trim().is_empty() {
            self.info = "Fill in both role and topic.".into();
            return KeyAction::None;
        }
        self.info.clear();
        KeyAction::Send(UiCommand::Generate {
            role: self.role.clone(),
            topic: self.topic.clone(),
        })
    }

    fn share_selected(&mut self, snap: &Snapshot, can_share: bool) -> KeyAction {
        let Some(item) = snap.history.get(self.history_selected) else {
            return KeyAction::None;
        };
        if !snap.logged_in {
            self.info = LOGIN_REQUIRED_MESSAGE.into();
            return KeyAction::None;
        }
        if !can_share {
            self.info = "A share is already in progress.".into();
            return KeyAction::None;
        }
        self.info.clear();
        KeyAction::Send(UiCommand::Share { item_id: item.id })
    }
}
