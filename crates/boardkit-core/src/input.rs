//! Input events, pointer tracking and keyboard shortcuts.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Whether a click should extend the selection instead of replacing it.
    pub fn extends_selection(&self) -> bool {
        self.shift || self.command()
    }
}

/// Pointer event in view (surface pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, modifiers: Modifiers },
    Move { position: Point },
    Up { position: Point },
    /// Wheel zoom; positive `delta` zooms in.
    Wheel { position: Point, delta: f64 },
}

/// Keys the engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Enter,
    Char(char),
    Other(String),
}

impl Key {
    /// Map a DOM-style key name (`"Escape"`, `"a"`, ...) to a key.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "Delete" | "Del" => Key::Delete,
            "Backspace" => Key::Backspace,
            "Enter" | "Return" => Key::Enter,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                    _ => Key::Other(name.to_string()),
                }
            }
        }
    }
}

/// Keyboard event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// The editing command bound to this key combination, if any.
    pub fn command(&self) -> Option<Command> {
        let cmd = self.modifiers.command();
        match &self.key {
            Key::Escape => Some(Command::Cancel),
            Key::Enter => Some(Command::FinalizePath),
            Key::Delete | Key::Backspace => Some(Command::DeleteSelection),
            Key::Char('c') if cmd => Some(Command::Copy),
            Key::Char('v') if cmd => Some(Command::Paste),
            Key::Char('a') if cmd => Some(Command::SelectAll),
            Key::Char('z') if cmd && self.modifiers.shift => Some(Command::Redo),
            Key::Char('z') if cmd => Some(Command::Undo),
            Key::Char('y') if cmd => Some(Command::Redo),
            _ => None,
        }
    }
}

/// Editing commands reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Cancel,
    FinalizePath,
    DeleteSelection,
    Copy,
    Paste,
    SelectAll,
    Undo,
    Redo,
}

/// Tracks the pointer between events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current pointer position in view coordinates.
    pub pointer_position: Point,
    /// Position at the event before, for deltas.
    pub previous_pointer_position: Point,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a pointer event. A press restarts delta tracking.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        let position = match event {
            PointerEvent::Down { position, .. } => {
                self.pointer_position = position;
                position
            }
            PointerEvent::Move { position }
            | PointerEvent::Up { position }
            | PointerEvent::Wheel { position, .. } => position,
        };
        self.previous_pointer_position = self.pointer_position;
        self.pointer_position = position;
    }

    /// Pointer movement since the previous event.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_position - self.previous_pointer_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_delta() {
        let mut input = InputState::new();
        input.handle_pointer_event(PointerEvent::Move {
            position: Point::new(10.0, 10.0),
        });
        input.handle_pointer_event(PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            modifiers: Modifiers::SHIFT,
        });
        assert_eq!(input.pointer_delta(), Vec2::ZERO);

        input.handle_pointer_event(PointerEvent::Move {
            position: Point::new(150.0, 120.0),
        });
        assert_eq!(input.pointer_delta(), Vec2::new(50.0, 20.0));

        input.handle_pointer_event(PointerEvent::Up {
            position: Point::new(155.0, 120.0),
        });
        assert_eq!(input.pointer_delta(), Vec2::new(5.0, 0.0));
    }

    #[test]
    fn test_key_names() {
        assert_eq!(Key::from_name("Escape"), Key::Escape);
        assert_eq!(Key::from_name("V"), Key::Char('v'));
        assert_eq!(Key::from_name("F5"), Key::Other("F5".into()));
    }

    #[test]
    fn test_shortcuts() {
        let ctrl = |c| KeyEvent::new(Key::Char(c), Modifiers::CTRL);
        assert_eq!(ctrl('c').command(), Some(Command::Copy));
        assert_eq!(ctrl('v').command(), Some(Command::Paste));
        assert_eq!(ctrl('a').command(), Some(Command::SelectAll));
        assert_eq!(ctrl('z').command(), Some(Command::Undo));
        assert_eq!(ctrl('y').command(), Some(Command::Redo));

        let redo = KeyEvent::new(
            Key::Char('z'),
            Modifiers {
                shift: true,
                meta: true,
                ..Modifiers::NONE
            },
        );
        assert_eq!(redo.command(), Some(Command::Redo));

        assert_eq!(KeyEvent::plain(Key::Char('c')).command(), None);
        assert_eq!(KeyEvent::plain(Key::Escape).command(), Some(Command::Cancel));
        assert_eq!(
            KeyEvent::plain(Key::Backspace).command(),
            Some(Command::DeleteSelection)
        );
    }
}
