//! Blocka - an image-tile rotation puzzle
//!
//! Core modules:
//! - `sim`: Puzzle logic (grid geometry, tiles, board, level session)
//! - `filter`: Per-pixel filters applied to tiles
//! - `raster`: Drawing surface abstraction and a software implementation
//! - `source`: Image bank loading and cover-fit preparation
//! - `platform`: Browser canvas and image fetch (wasm32 only)
//! - `settings`: Configuration (difficulty, image bank, filter schedule)
//! - `records`: Best completion time per level

pub mod error;
pub mod filter;
pub mod platform;
pub mod raster;
pub mod records;
pub mod settings;
pub mod sim;
pub mod source;

pub use error::{BlockaError, ConfigError, FilterError, LoadError};
pub use filter::FilterKind;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    use std::time::Duration;

    /// Default side length of the square play canvas (pixels)
    pub const CANVAS_SIZE: u32 = 600;
    /// Difficulty used until the player picks another one
    pub const DEFAULT_DIFFICULTY: u32 = 6;

    /// Brightness multiplier used by the brightness filter
    pub const BRIGHTNESS_FACTOR: f32 = 1.3;

    /// How long the unfiltered image stays visible before the victory panel
    pub const REVEAL_DELAY: Duration = Duration::from_millis(500);
    /// Level clock period
    pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

    /// Canvas background (#14171b)
    pub const BACKGROUND: [u8; 4] = [0x14, 0x17, 0x1b, 0xff];
    /// Fill behind a cover-fit image (#000000)
    pub const LETTERBOX_FILL: [u8; 4] = [0x00, 0x00, 0x00, 0xff];
    /// Grid separator color (#2b323a)
    pub const GRID_COLOR: [u8; 4] = [0x2b, 0x32, 0x3a, 0xff];
    pub const GRID_LINE_WIDTH: f32 = 2.0;
}

/// Format whole seconds as `MM:SS`
#[inline]
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Parse a `#rrggbb` or `#rrggbbaa` hex color
pub fn parse_hex_color(s: &str) -> Option<[u8; 4]> {
    let hex = s.strip_prefix('#')?;
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some([channel(0)?, channel(2)?, channel(4)?, 0xff]),
        8 => Some([channel(0)?, channel(2)?, channel(4)?, channel(6)?]),
        _ => None,
    }
}
