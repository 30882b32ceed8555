//! Puzzle logic
//!
//! Everything here is platform independent:
//! - Seeded RNG only (scrambles replay from `Settings::seed`)
//! - Tiles kept in row-major cell order
//! - Drawing goes through the `Surface` trait, never a concrete backend

pub mod board;
pub mod clock;
pub mod geometry;
pub mod session;
pub mod tile;

pub use board::{BoardPhase, InteractionOutcome, PointerButton, PuzzleBoard, RenderStyle};
pub use clock::{LevelClock, TimerToken};
pub use geometry::TileGeometry;
pub use session::{
    ClickOutcome, LevelSession, LoadRequest, LoadTicket, SessionPhase, StartOutcome,
    VictoryReport,
};
pub use tile::{Rotation, Tile};
