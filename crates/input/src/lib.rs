//! Fly-camera input: movement actions, held-key and cursor accumulation,
//! and the fixed-rate tick clock that drives camera integration.
//!
//! # Invariants
//! - Platform key codes never leave the window backend; only [`MoveKey`]s do.
//! - Cursor travel is drained once per tick.

pub mod action;
mod state;
mod tick;

pub use action::{MoveFlags, MoveKey};
pub use state::{InputState, TickInput};
pub use tick::{DEFAULT_TICK_HZ, FixedTimestep};

pub fn crate_info() -> &'static str {
    "tessera-input v0.1.0"
}
