//! Grid partition of the square canvas
//!
//! Difficulty is the number of tiles. Known difficulties map to hand-picked
//! near-square grids; anything else gets `ceil(sqrt(n))` rows.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::raster::Rect;

/// Rows for a difficulty
pub fn rows_for(difficulty: u32) -> u32 {
    match difficulty {
        4 => 2,
        6 => 3,
        8 => 3,
        n => (n as f64).sqrt().ceil().max(1.0) as u32,
    }
}

/// Columns for a difficulty
pub fn cols_for(difficulty: u32) -> u32 {
    match difficulty {
        4 => 2,
        6 => 2,
        8 => 3,
        n => n.div_ceil(rows_for(n)).max(1),
    }
}

/// Grid layout for one board
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileGeometry {
    pub difficulty: u32,
    pub rows: u32,
    pub cols: u32,
    pub canvas_size: u32,
    pub piece_width: f32,
    pub piece_height: f32,
}

impl TileGeometry {
    pub fn new(difficulty: u32, canvas_size: u32) -> Self {
        let rows = rows_for(difficulty);
        let cols = cols_for(difficulty);
        Self {
            difficulty,
            rows,
            cols,
            canvas_size,
            piece_width: canvas_size as f32 / cols as f32,
            piece_height: canvas_size as f32 / rows as f32,
        }
    }

    /// Difficulty 8 plays on a 3x3 grid with the cell at row 1, col 1 left empty
    #[inline]
    pub fn skips_cell(&self, row: u32, col: u32) -> bool {
        self.difficulty == 8 && row == 1 && col == 1
    }

    /// Cells that hold a tile, row-major, capped at `difficulty`
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.rows)
            .flat_map(move |row| (0..self.cols).map(move |col| (row, col)))
            .filter(move |&(row, col)| !self.skips_cell(row, col))
            .take(self.difficulty as usize)
    }

    /// Pixel-aligned position of the `i`th column boundary
    #[inline]
    fn col_edge(&self, i: u32) -> f32 {
        (i as f32 * self.piece_width).round()
    }

    /// Pixel-aligned position of the `i`th row boundary
    #[inline]
    fn row_edge(&self, i: u32) -> f32 {
        (i as f32 * self.piece_height).round()
    }

    /// Pixel-aligned rect of a cell. Edges are rounded so neighbouring cells
    /// share a boundary even when the canvas does not divide evenly.
    pub fn cell_rect(&self, row: u32, col: u32) -> Rect {
        let (x0, x1) = (self.col_edge(col), self.col_edge(col + 1));
        let (y0, y1) = (self.row_edge(row), self.row_edge(row + 1));
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Grid cell under a pointer position, or `None` outside the canvas.
    ///
    /// Uses the same rounded edges as `cell_rect`, so a click always lands on
    /// the cell drawn under it.
    pub fn cell_at(&self, pos: Vec2) -> Option<(u32, u32)> {
        if !pos.is_finite() || pos.x < 0.0 || pos.y < 0.0 {
            return None;
        }
        let col = (0..self.cols).find(|&c| pos.x < self.col_edge(c + 1))?;
        let row = (0..self.rows).find(|&r| pos.y < self.row_edge(r + 1))?;
        Some((row, col))
    }

    /// Row-major index of a grid cell (`row * cols + col`)
    #[inline]
    pub fn index_of(&self, row: u32, col: u32) -> usize {
        (row * self.cols + col) as usize
    }

    /// Interior separator lines as `(from, to)` pairs: verticals first
    pub fn grid_lines(&self) -> Vec<(Vec2, Vec2)> {
        let size = self.canvas_size as f32;
        let verticals = (1..self.cols).map(|i| {
            let x = self.col_edge(i);
            (Vec2::new(x, 0.0), Vec2::new(x, size))
        });
        let horizontals = (1..self.rows).map(|i| {
            let y = self.row_edge(i);
            (Vec2::new(0.0, y), Vec2::new(size, y))
        });
        verticals.chain(horizontals).collect()
    }
}
