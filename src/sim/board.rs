//! Puzzle board: the tiles of one level
//!
//! A board is built once per level from the letterboxed source image, takes
//! clicks while `Playing`, and freezes on `Solved`.

use std::sync::Arc;

use glam::Vec2;
use image::RgbaImage;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::geometry::TileGeometry;
use super::tile::{Rotation, Tile};
use crate::consts::*;
use crate::error::FilterError;
use crate::filter::{self, FilterFn, FilterKind};
use crate::raster::{Color, Surface};

/// Pointer button that produced a click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerButton {
    /// Left click, rotates counter-clockwise
    Primary,
    /// Right click / context menu, rotates clockwise
    Secondary,
}

/// Board lifecycle within a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardPhase {
    /// Accepting clicks
    Playing,
    /// Every tile upright, filters stripped, clicks ignored
    Solved,
}

/// Result of one click on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// Outside the grid, on an empty cell, or the board is not playing
    Ignored,
    /// A tile turned, puzzle not solved yet
    Rotated { index: usize },
    /// A tile turned and that completed the puzzle
    Solved { index: usize },
}

/// Colors used when rendering a board
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    pub background: Color,
    pub grid_color: Color,
    pub grid_line_width: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: BACKGROUND,
            grid_color: GRID_COLOR,
            grid_line_width: GRID_LINE_WIDTH,
        }
    }
}

/// All tiles for one level
#[derive(Debug, Clone)]
pub struct PuzzleBoard {
    geometry: TileGeometry,
    tiles: Vec<Tile>,
    /// Grid cell of each tile, parallel to `tiles`
    cells: Vec<(u32, u32)>,
    filter_kind: FilterKind,
    phase: BoardPhase,
    /// Session generation this board was built for
    generation: u64,
}

impl PuzzleBoard {
    /// Cut `source` into tiles and filter every tile.
    ///
    /// Tiles are created row-major, scrambled with `rng`, then filtered in
    /// parallel. If any tile fails to filter the whole build fails.
    pub fn build<R: Rng + ?Sized>(
        difficulty: u32,
        source: Arc<RgbaImage>,
        filter_kind: FilterKind,
        canvas_size: u32,
        rng: &mut R,
        generation: u64,
    ) -> Result<Self, FilterError> {
        Self::build_with(
            difficulty,
            source,
            filter_kind,
            canvas_size,
            rng,
            generation,
            filter::apply_filter,
        )
    }

    /// `build` with a caller-supplied filter round trip
    pub fn build_with<R: Rng + ?Sized>(
        difficulty: u32,
        source: Arc<RgbaImage>,
        filter_kind: FilterKind,
        canvas_size: u32,
        rng: &mut R,
        generation: u64,
        apply: FilterFn,
    ) -> Result<Self, FilterError> {
        let geometry = TileGeometry::new(difficulty, canvas_size);
        log::info!(
            "Building {} tiles ({}x{}), filter: {}",
            difficulty,
            geometry.rows,
            geometry.cols,
            filter_kind.as_str()
        );

        let cells: Vec<(u32, u32)> = geometry.cells().collect();
        let mut tiles: Vec<Tile> = cells
            .iter()
            .map(|&(row, col)| {
                let rect = geometry.cell_rect(row, col);
                Tile::new(
                    source.clone(),
                    rect,
                    rect.origin(),
                    Rotation::Deg0,
                    filter_kind,
                    &mut *rng,
                )
            })
            .collect();

        tiles
            .par_iter_mut()
            .try_for_each(|tile| tile.apply_filter_with(apply))?;

        for (i, tile) in tiles.iter().enumerate() {
            log::debug!(
                "  tile {}: {}° (correct {}°), filter {}",
                i,
                tile.current_rotation().degrees(),
                tile.correct_rotation().degrees(),
                tile.filter_kind().as_str()
            );
        }

        Ok(Self {
            geometry,
            tiles,
            cells,
            filter_kind,
            phase: BoardPhase::Playing,
            generation,
        })
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Mutable tile access for hosts that restore or script a board
    pub fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn filter_kind(&self) -> FilterKind {
        self.filter_kind
    }

    pub fn phase(&self) -> BoardPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Index of the tile occupying a grid cell
    pub fn tile_index_at(&self, row: u32, col: u32) -> Option<usize> {
        self.cells.iter().position(|&cell| cell == (row, col))
    }

    /// Rotate the tile under `pos`, then check for victory
    pub fn handle_interaction(&mut self, pos: Vec2, button: PointerButton) -> InteractionOutcome {
        if self.phase != BoardPhase::Playing {
            return InteractionOutcome::Ignored;
        }
        let Some((row, col)) = self.geometry.cell_at(pos) else {
            return InteractionOutcome::Ignored;
        };
        let Some(index) = self.tile_index_at(row, col) else {
            return InteractionOutcome::Ignored;
        };

        log::debug!("{:?} click on tile {} (row {}, col {})", button, index, row, col);
        let tile = &mut self.tiles[index];
        match button {
            PointerButton::Primary => tile.rotate_left(),
            PointerButton::Secondary => tile.rotate_right(),
        }

        if self.check_victory() {
            self.reveal();
            InteractionOutcome::Solved { index }
        } else {
            InteractionOutcome::Rotated { index }
        }
    }

    /// True iff every tile is at its correct rotation
    pub fn check_victory(&self) -> bool {
        self.tiles.iter().all(Tile::is_correct)
    }

    /// Freeze the board and strip every filter to show the original image
    pub fn reveal(&mut self) {
        self.phase = BoardPhase::Solved;
        for tile in &mut self.tiles {
            tile.remove_filter();
        }
    }

    /// Clear, draw tiles in order, then overlay the grid
    pub fn render(&self, surface: &mut dyn Surface, style: &RenderStyle) {
        surface.clear(style.background);
        for tile in &self.tiles {
            tile.draw(surface);
        }
        for (from, to) in self.geometry.grid_lines() {
            surface.stroke_line(from, to, style.grid_line_width, style.grid_color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::SoftwareSurface;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const SIZE: u32 = 60;

    /// Each 30x30 quadrant gets its own solid color
    fn quadrant_image() -> Arc<RgbaImage> {
        Arc::new(RgbaImage::from_fn(SIZE, SIZE, |x, y| {
            image::Rgba(match (x < 30, y < 30) {
                (true, true) => [200, 0, 0, 255],
                (false, true) => [0, 200, 0, 255],
                (true, false) => [0, 0, 200, 255],
                (false, false) => [100, 100, 100, 255],
            })
        }))
    }

    fn board(difficulty: u32, filter_kind: FilterKind) -> PuzzleBoard {
        let mut rng = Pcg32::seed_from_u64(42);
        PuzzleBoard::build(difficulty, quadrant_image(), filter_kind, SIZE, &mut rng, 1).unwrap()
    }

    fn solve(board: &mut PuzzleBoard) {
        for tile in board.tiles_mut() {
            tile.set_rotation(tile.correct_rotation());
        }
    }

    #[test]
    fn test_tile_counts() {
        assert_eq!(board(4, FilterKind::None).tile_count(), 4);
        assert_eq!(board(6, FilterKind::None).tile_count(), 6);
        assert_eq!(board(8, FilterKind::None).tile_count(), 8);
        assert_eq!(board(5, FilterKind::None).tile_count(), 5);
    }

    #[test]
    fn test_eight_leaves_center_empty() {
        let b = board(8, FilterKind::None);
        assert_eq!(b.tile_index_at(1, 1), None);
        assert_eq!(b.tile_index_at(1, 2), Some(4));
        assert_eq!(b.tile_index_at(2, 2), Some(7));
    }

    #[test]
    fn test_all_tiles_share_filter_and_start_filtered() {
        let b = board(4, FilterKind::Grayscale);
        assert!(b.tiles().iter().all(|t| t.filter_kind() == FilterKind::Grayscale));
        assert!(b.tiles().iter().all(Tile::filter_applied));
    }

    /// Fails only for the tile cut from the blue quadrant
    fn fail_on_blue(image: &RgbaImage, kind: FilterKind) -> Result<RgbaImage, FilterError> {
        if image.get_pixel(0, 0).0 == [0, 0, 200, 255] {
            return Err(FilterError::Encode("refused".to_string()));
        }
        filter::apply_filter(image, kind)
    }

    #[test]
    fn test_one_failing_tile_fails_whole_build() {
        let mut rng = Pcg32::seed_from_u64(42);
        let result = PuzzleBoard::build_with(
            4,
            quadrant_image(),
            FilterKind::Invert,
            SIZE,
            &mut rng,
            1,
            fail_on_blue,
        );
        assert!(matches!(result, Err(FilterError::Encode(_))));
    }

    #[test]
    fn test_sub_pixel_cells_fail_build() {
        let mut rng = Pcg32::seed_from_u64(1);
        let result = PuzzleBoard::build(4, quadrant_image(), FilterKind::Grayscale, 1, &mut rng, 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_board_not_solved() {
        let b = board(6, FilterKind::None);
        assert!(!b.check_victory());
        assert_eq!(b.phase(), BoardPhase::Playing);
    }

    #[test]
    fn test_check_victory_requires_every_tile() {
        let mut b = board(4, FilterKind::None);
        solve(&mut b);
        assert!(b.check_victory());
        let wrong = b.tiles()[2].correct_rotation().right();
        b.tiles_mut()[2].set_rotation(wrong);
        assert!(!b.check_victory());
    }

    #[test]
    fn test_primary_rotates_left_secondary_right() {
        let mut b = board(4, FilterKind::None);
        let before = b.tiles()[1].current_rotation();
        let outcome = b.handle_interaction(Vec2::new(45.0, 10.0), PointerButton::Primary);
        assert_eq!(outcome, InteractionOutcome::Rotated { index: 1 });
        assert_eq!(b.tiles()[1].current_rotation(), before.left());

        b.handle_interaction(Vec2::new(45.0, 10.0), PointerButton::Secondary);
        assert_eq!(b.tiles()[1].current_rotation(), before);
    }

    #[test]
    fn test_click_outside_ignored() {
        let mut b = board(4, FilterKind::None);
        let before: Vec<_> = b.tiles().iter().map(Tile::current_rotation).collect();
        assert_eq!(
            b.handle_interaction(Vec2::new(61.0, 5.0), PointerButton::Primary),
            InteractionOutcome::Ignored
        );
        assert_eq!(
            b.handle_interaction(Vec2::new(-3.0, 5.0), PointerButton::Primary),
            InteractionOutcome::Ignored
        );
        let after: Vec<_> = b.tiles().iter().map(Tile::current_rotation).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_click_turns_the_drawn_tile_on_uneven_canvas() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut b =
            PuzzleBoard::build(9, quadrant_image(), FilterKind::None, 100, &mut rng, 1).unwrap();
        assert_eq!(b.tiles()[1].target_rect().x, 33.0);
        let before: Vec<_> = b.tiles().iter().map(Tile::current_rotation).collect();

        // Past the drawn edge at x=33 but short of 100/3
        b.handle_interaction(Vec2::new(33.1, 5.0), PointerButton::Primary);
        assert_eq!(b.tiles()[0].current_rotation(), before[0]);
        assert_eq!(b.tiles()[1].current_rotation(), before[1].left());
    }

    #[test]
    fn test_click_on_empty_center_ignored() {
        let mut b = board(8, FilterKind::None);
        assert_eq!(
            b.handle_interaction(Vec2::new(30.0, 30.0), PointerButton::Primary),
            InteractionOutcome::Ignored
        );
    }

    #[test]
    fn test_winning_click_reveals_and_freezes() {
        let mut b = board(4, FilterKind::Invert);
        solve(&mut b);
        // Put tile 0 one quarter-turn clockwise off, a primary click fixes it
        let off = b.tiles()[0].correct_rotation().right();
        b.tiles_mut()[0].set_rotation(off);

        let outcome = b.handle_interaction(Vec2::new(5.0, 5.0), PointerButton::Primary);
        assert_eq!(outcome, InteractionOutcome::Solved { index: 0 });
        assert_eq!(b.phase(), BoardPhase::Solved);
        assert!(b.tiles().iter().all(|t| !t.filter_applied()));

        // Frozen
        assert_eq!(
            b.handle_interaction(Vec2::new(5.0, 5.0), PointerButton::Primary),
            InteractionOutcome::Ignored
        );
        assert!(b.check_victory());
    }

    #[test]
    fn test_render_solved_board_matches_source() {
        let mut b = board(4, FilterKind::Invert);
        solve(&mut b);
        b.reveal();

        let mut surface = SoftwareSurface::new(SIZE, SIZE);
        b.render(&mut surface, &RenderStyle::default());
        assert_eq!(surface.pixel(5, 5), Some([200, 0, 0, 255]));
        assert_eq!(surface.pixel(50, 5), Some([0, 200, 0, 255]));
        assert_eq!(surface.pixel(5, 50), Some([0, 0, 200, 255]));
        assert_eq!(surface.pixel(50, 50), Some([100, 100, 100, 255]));
        // Grid separator on the interior boundary
        assert_eq!(surface.pixel(30, 5), Some(GRID_COLOR));
        assert_eq!(surface.pixel(5, 29), Some(GRID_COLOR));
    }

    #[test]
    fn test_render_filtered_tiles() {
        let mut b = board(4, FilterKind::Invert);
        solve(&mut b);
        let mut surface = SoftwareSurface::new(SIZE, SIZE);
        b.render(&mut surface, &RenderStyle::default());
        assert_eq!(surface.pixel(5, 5), Some([55, 255, 255, 255]));
    }

    #[test]
    fn test_render_rotated_tile_in_place() {
        let mut b = board(4, FilterKind::None);
        solve(&mut b);
        b.tiles_mut()[3].set_rotation(Rotation::Deg180);
        let mut surface = SoftwareSurface::new(SIZE, SIZE);
        b.render(&mut surface, &RenderStyle::default());
        // A solid quadrant looks the same at any rotation, and stays in its cell
        assert_eq!(surface.pixel(45, 45), Some([100, 100, 100, 255]));
        assert_eq!(surface.pixel(5, 5), Some([200, 0, 0, 255]));
    }
}
