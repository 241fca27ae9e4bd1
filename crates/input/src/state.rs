use glam::Vec2;

use crate::action::{MoveFlags, MoveKey};

/// Input sampled for one camera tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub flags: MoveFlags,
    /// Cursor travel since the previous tick, in cursor units.
    pub cursor_delta: Vec2,
}

/// Accumulates held keys and cursor travel between camera ticks.
///
/// Cursor motion only counts while a drag is active, mirroring a
/// click-and-drag mouse look. Each [`InputState::take_tick`] drains the
/// accumulated cursor travel; held keys persist until released.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: MoveFlags,
    cursor_delta: Vec2,
    dragging: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key(&mut self, key: MoveKey, pressed: bool) {
        self.held.set(key, pressed);
    }

    pub fn held(&self) -> MoveFlags {
        self.held
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Start a drag. Travel recorded before this point is discarded.
    pub fn begin_drag(&mut self) {
        self.dragging = true;
        self.cursor_delta = Vec2::ZERO;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
        self.cursor_delta = Vec2::ZERO;
    }

    /// Record raw cursor travel. Ignored unless a drag is active.
    pub fn cursor_moved(&mut self, delta: Vec2) {
        if self.dragging {
            self.cursor_delta += delta;
        }
    }

    /// Release every key, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held = MoveFlags::NONE;
        self.end_drag();
    }

    /// Sample the current input for one tick and reset the cursor travel.
    pub fn take_tick(&mut self) -> TickInput {
        let tick = TickInput {
            flags: self.held,
            cursor_delta: self.cursor_delta,
        };
        self.cursor_delta = Vec2::ZERO;
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_ignored_without_drag() {
        let mut input = InputState::new();
        input.cursor_moved(Vec2::new(5.0, 3.0));
        assert_eq!(input.take_tick().cursor_delta, Vec2::ZERO);
    }

    #[test]
    fn drag_accumulates_until_tick() {
        let mut input = InputState::new();
        input.begin_drag();
        input.cursor_moved(Vec2::new(1.0, 2.0));
        input.cursor_moved(Vec2::new(0.5, -1.0));
        let tick = input.take_tick();
        assert_eq!(tick.cursor_delta, Vec2::new(1.5, 1.0));
        assert_eq!(input.take_tick().cursor_delta, Vec2::ZERO);
    }

    #[test]
    fn held_keys_persist_across_ticks() {
        let mut input = InputState::new();
        input.set_key(MoveKey::Forward, true);
        assert!(input.take_tick().flags.forward);
        assert!(input.take_tick().flags.forward);
        input.set_key(MoveKey::Forward, false);
        assert!(input.take_tick().flags.is_empty());
    }

    #[test]
    fn clear_releases_everything() {
        let mut input = InputState::new();
        input.set_key(MoveKey::Up, true);
        input.begin_drag();
        input.cursor_moved(Vec2::ONE);
        input.clear();
        assert!(!input.is_dragging());
        assert_eq!(input.take_tick(), TickInput::default());
    }
}
