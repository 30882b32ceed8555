//! Game settings
//!
//! Everything the host decides up front: canvas size, difficulty, which
//! images make up the bank and which filter each level uses. Persisted in
//! LocalStorage on the web, read from a JSON file natively.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::filter::FilterKind;
use crate::parse_hex_color;
use crate::raster::Color;
use crate::sim::{RenderStyle, TileGeometry};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Side length of the square board in pixels
    pub canvas_size: u32,
    /// Number of tiles (4, 6 and 8 have hand-tuned grids)
    pub difficulty: u32,
    /// Image URLs/paths, indexed by level modulo length
    pub image_bank: Vec<String>,
    /// Filter per level, indexed by level modulo length
    pub filter_schedule: Vec<FilterKind>,
    /// Fixed RNG seed for reproducible scrambles (None = random)
    pub seed: Option<u64>,

    // === Colors (#rrggbb) ===
    pub background: String,
    pub letterbox_fill: String,
    pub grid_color: String,
    pub grid_line_width: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_size: CANVAS_SIZE,
            difficulty: DEFAULT_DIFFICULTY,
            image_bank: (1..=6).map(|i| format!("./assets/gl-{}.jpg", i)).collect(),
            filter_schedule: vec![
                FilterKind::None, // practice level
                FilterKind::Grayscale,
                FilterKind::Brightness,
                FilterKind::Invert,
                FilterKind::Grayscale,
                FilterKind::Brightness,
            ],
            seed: None,

            background: "#14171b".to_string(),
            letterbox_fill: "#000000".to_string(),
            grid_color: "#2b323a".to_string(),
            grid_line_width: GRID_LINE_WIDTH,
        }
    }
}

impl Settings {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the game cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.difficulty == 0 {
            return Err(ConfigError::ZeroDifficulty);
        }
        if self.canvas_size == 0 {
            return Err(ConfigError::ZeroCanvas);
        }
        check_grid(self.difficulty, self.canvas_size)?;
        if self.image_bank.is_empty() {
            return Err(ConfigError::EmptyImageBank);
        }
        Ok(())
    }

    /// Filter for a level. An empty schedule means no filters.
    pub fn filter_for_level(&self, level: usize) -> FilterKind {
        if self.filter_schedule.is_empty() {
            return FilterKind::None;
        }
        self.filter_schedule[level % self.filter_schedule.len()]
    }

    /// Image-bank entry for a level
    pub fn image_for_level(&self, level: usize) -> Option<&str> {
        if self.image_bank.is_empty() {
            return None;
        }
        Some(self.image_bank[level % self.image_bank.len()].as_str())
    }

    fn color_or(value: &str, fallback: Color, name: &str) -> Color {
        parse_hex_color(value).unwrap_or_else(|| {
            log::warn!("Invalid {} color '{}', using default", name, value);
            fallback
        })
    }

    pub fn letterbox_color(&self) -> Color {
        Self::color_or(&self.letterbox_fill, LETTERBOX_FILL, "letterbox")
    }

    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            background: Self::color_or(&self.background, BACKGROUND, "background"),
            grid_color: Self::color_or(&self.grid_color, GRID_COLOR, "grid"),
            grid_line_width: self.grid_line_width.max(0.0),
        }
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "blocka_settings";

    /// Load settings from a JSON file (native only)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

/// Every cell of a `difficulty` grid must be at least one pixel each way
pub fn check_grid(difficulty: u32, canvas_size: u32) -> Result<(), ConfigError> {
    let geometry = TileGeometry::new(difficulty, canvas_size);
    if geometry.piece_width < 1.0 || geometry.piece_height < 1.0 {
        return Err(ConfigError::CellTooSmall {
            difficulty,
            canvas_size,
        });
    }
    Ok(())
}
