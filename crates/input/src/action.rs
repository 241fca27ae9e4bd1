/// A movement action the fly camera understands.
///
/// Window backends map raw key codes onto these; the camera never sees
/// platform key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKey {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
}

impl MoveKey {
    pub const ALL: [MoveKey; 6] = [
        MoveKey::Forward,
        MoveKey::Back,
        MoveKey::Left,
        MoveKey::Right,
        MoveKey::Up,
        MoveKey::Down,
    ];
}

/// Per-tick movement intent: which of the six directions are held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveFlags {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveFlags {
    /// No direction held.
    pub const NONE: MoveFlags = MoveFlags {
        forward: false,
        back: false,
        left: false,
        right: false,
        up: false,
        down: false,
    };

    pub fn with(mut self, key: MoveKey) -> Self {
        self.set(key, true);
        self
    }

    pub fn set(&mut self, key: MoveKey, held: bool) {
        match key {
            MoveKey::Forward => self.forward = held,
            MoveKey::Back => self.back = held,
            MoveKey::Left => self.left = held,
            MoveKey::Right => self.right = held,
            MoveKey::Up => self.up = held,
            MoveKey::Down => self.down = held,
        }
    }

    pub fn is_held(&self, key: MoveKey) -> bool {
        match key {
            MoveKey::Forward => self.forward,
            MoveKey::Back => self.back,
            MoveKey::Left => self.left,
            MoveKey::Right => self.right,
            MoveKey::Up => self.up,
            MoveKey::Down => self.down,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// Signed (right - left, forward - back) intent on the horizontal plane.
    pub fn horizontal_axes(&self) -> (f32, f32) {
        let across = axis(self.right, self.left);
        let forward = axis(self.forward, self.back);
        (across, forward)
    }

    /// Signed (up - down) intent along the world up axis.
    pub fn vertical_axis(&self) -> f32 {
        axis(self.up, self.down)
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    (positive as i32 - negative as i32) as f32
}
