//! A single rotatable, filterable piece of the puzzle image

use std::sync::Arc;

use glam::Vec2;
use image::RgbaImage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::filter::{self, FilterFn, FilterKind};
use crate::raster::{Rect, Surface};

/// Quarter-turn rotation, clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Rotation for a degree value; any multiple of 90 is accepted
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(Self::ALL[degrees.rem_euclid(360) as usize / 90])
    }

    #[inline]
    pub fn radians(self) -> f32 {
        (self.degrees() as f32).to_radians()
    }

    /// (self - 90 + 360) mod 360
    pub fn left(self) -> Self {
        Self::ALL[(self as usize + 3) % 4]
    }

    /// (self + 90) mod 360
    pub fn right(self) -> Self {
        Self::ALL[(self as usize + 1) % 4]
    }
}

/// One piece of the board
#[derive(Debug, Clone)]
pub struct Tile {
    /// Region of the source image this tile shows
    source_rect: Rect,
    /// Where the tile's top-left corner lands on the surface
    target: Vec2,
    correct_rotation: Rotation,
    current_rotation: Rotation,
    filter_kind: FilterKind,
    /// Full unfiltered source image, shared by every tile of the board
    original: Arc<RgbaImage>,
    /// Filtered copy of just this tile's region
    filtered: Option<Arc<RgbaImage>>,
    filter_applied: bool,
}

impl Tile {
    /// Create a tile and scramble its rotation away from `correct_rotation`
    pub fn new<R: Rng + ?Sized>(
        original: Arc<RgbaImage>,
        source_rect: Rect,
        target: Vec2,
        correct_rotation: Rotation,
        filter_kind: FilterKind,
        rng: &mut R,
    ) -> Self {
        let mut tile = Self {
            source_rect,
            target,
            correct_rotation,
            current_rotation: correct_rotation,
            filter_kind,
            original,
            filtered: None,
            filter_applied: false,
        };
        tile.randomize_rotation(rng);
        tile
    }

    /// Pick uniformly among the three rotations that are not correct
    pub fn randomize_rotation<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let wrong: Vec<Rotation> = Rotation::ALL
            .into_iter()
            .filter(|&r| r != self.correct_rotation)
            .collect();
        self.current_rotation = wrong[rng.random_range(0..wrong.len())];
        log::debug!("Tile initialized at {}°", self.current_rotation.degrees());
    }

    pub fn rotate_left(&mut self) {
        self.current_rotation = self.current_rotation.left();
        log::debug!("Tile rotated to {}°", self.current_rotation.degrees());
    }

    pub fn rotate_right(&mut self) {
        self.current_rotation = self.current_rotation.right();
        log::debug!("Tile rotated to {}°", self.current_rotation.degrees());
    }

    #[inline]
    pub fn is_correct(&self) -> bool {
        self.current_rotation == self.correct_rotation
    }

    /// Force a rotation (hosts replaying a saved board, tests)
    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.current_rotation = rotation;
    }

    pub fn current_rotation(&self) -> Rotation {
        self.current_rotation
    }

    pub fn correct_rotation(&self) -> Rotation {
        self.correct_rotation
    }

    pub fn filter_kind(&self) -> FilterKind {
        self.filter_kind
    }

    pub fn filter_applied(&self) -> bool {
        self.filter_applied
    }

    pub fn source_rect(&self) -> Rect {
        self.source_rect
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Surface area the unrotated tile covers
    pub fn target_rect(&self) -> Rect {
        self.source_rect.at(self.target)
    }

    /// Filter this tile's region. Does nothing if already applied or if the
    /// tile has no filter.
    pub fn apply_filter(&mut self) -> Result<(), FilterError> {
        self.apply_filter_with(filter::apply_filter)
    }

    /// `apply_filter` through a caller-supplied round trip
    pub fn apply_filter_with(&mut self, apply: FilterFn) -> Result<(), FilterError> {
        if self.filter_applied || !self.filter_kind.is_active() {
            return Ok(());
        }
        log::debug!("Applying '{}' filter to tile", self.filter_kind.as_str());

        let (x, y, w, h) = self.source_rect.to_pixels();
        let region = image::imageops::crop_imm(&*self.original, x, y, w, h).to_image();
        let filtered = apply(&region, self.filter_kind)?;

        self.filtered = Some(Arc::new(filtered));
        self.filter_applied = true;
        Ok(())
    }

    /// Go back to the original pixels (kept in memory, no re-decode)
    pub fn remove_filter(&mut self) {
        if self.filter_applied {
            log::debug!("Removing filter from tile");
            self.filtered = None;
            self.filter_applied = false;
        }
    }

    /// Draw the tile rotated about its own center
    pub fn draw(&self, surface: &mut dyn Surface) {
        let center = self.target_rect().center();
        let radians = self.current_rotation.radians();
        match (&self.filtered, self.filter_applied) {
            (Some(filtered), true) => {
                let (w, h) = filtered.dimensions();
                let whole = Rect::new(0.0, 0.0, w as f32, h as f32);
                surface.draw_rotated(filtered, whole, center, radians);
            }
            _ => surface.draw_rotated(&self.original, self.source_rect, center, radians),
        }
    }
}
