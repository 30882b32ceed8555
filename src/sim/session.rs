//! Level session
//!
//! Owns everything that outlives a single board: the level index, the
//! clock, best times and the RNG. A level starts in two steps so image
//! loading can be asynchronous on the host side:
//!
//! 1. `begin_level` picks the image and returns a `LoadRequest`
//! 2. the host fetches and decodes it, then calls `complete_load`
//!
//! Every request carries a generation ticket. Results for a ticket that is
//! no longer current (the player reset or moved on meanwhile) are dropped.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;
use image::DynamicImage;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::board::{InteractionOutcome, PointerButton, PuzzleBoard, RenderStyle};
use super::clock::{LevelClock, TimerToken};
use crate::consts::REVEAL_DELAY;
use crate::error::{BlockaError, ConfigError, LoadError};
use crate::filter::{self, FilterFn, FilterKind};
use crate::raster::{Color, Surface};
use crate::records::BestTimes;
use crate::settings::{Settings, check_grid};
use crate::source::{ImageSource, cover_fit};
use crate::format_time;

/// Where the current level is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No level running (menu, between levels, after a failed start)
    Idle,
    /// Image requested, board not built yet
    Loading,
    /// Board accepting clicks, clock running
    Playing,
    /// Puzzle solved, clock stopped
    Solved,
}

/// Identifies one level start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    generation: u64,
    level: usize,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn level(&self) -> usize {
        self.level
    }
}

/// What the host must load to start a level
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub url: String,
    /// Clock run that was interrupted by this start, if any
    pub superseded_timer: Option<TimerToken>,
}

/// Result of delivering a loaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Board built, clock running under `timer`
    Started {
        level: usize,
        filter: FilterKind,
        timer: TimerToken,
    },
    /// The ticket was out of date; nothing changed
    Stale,
}

/// Everything the host needs to show the victory panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VictoryReport {
    /// 0-based level index
    pub level: usize,
    pub seconds: u32,
    /// `MM:SS`
    pub formatted: String,
    pub new_best: bool,
    pub best_seconds: u32,
    /// Clock run to cancel
    pub timer: Option<TimerToken>,
    /// Keep the unfiltered image on screen this long before the panel
    pub reveal_delay: Duration,
    /// Level used the last image of the bank (next level wraps around)
    pub is_last_image: bool,
}

/// Result of a click routed through the session
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    Ignored,
    Rotated { index: usize },
    Solved(VictoryReport),
}

pub struct LevelSession {
    settings: Settings,
    rng: Pcg32,
    level: usize,
    generation: u64,
    phase: SessionPhase,
    pending: Option<LoadTicket>,
    board: Option<PuzzleBoard>,
    clock: LevelClock,
    best_times: BestTimes,
    style: RenderStyle,
    letterbox: Color,
    filter_fn: FilterFn,
}

impl LevelSession {
    /// Create a session. Uses `settings.seed` if set, otherwise a random seed.
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        let seed = settings.seed.unwrap_or_else(rand::random);
        Self::with_seed(settings, seed)
    }

    pub fn with_seed(settings: Settings, seed: u64) -> Result<Self, ConfigError> {
        settings.validate()?;
        log::info!(
            "Session created: {} images, difficulty {}, seed {}",
            settings.image_bank.len(),
            settings.difficulty,
            seed
        );
        Ok(Self {
            style: settings.render_style(),
            letterbox: settings.letterbox_color(),
            settings,
            rng: Pcg32::seed_from_u64(seed),
            level: 0,
            generation: 0,
            phase: SessionPhase::Idle,
            pending: None,
            board: None,
            clock: LevelClock::new(),
            best_times: BestTimes::new(),
            filter_fn: filter::apply_filter,
        })
    }

    /// Replace the tile filter round trip used by `complete_load`
    pub fn with_filter_fn(mut self, filter_fn: FilterFn) -> Self {
        self.filter_fn = filter_fn;
        self
    }

    /// Pick the image for the current level and enter `Loading`.
    ///
    /// Any level in progress is abandoned.
    pub fn begin_level(&mut self) -> Result<LoadRequest, LoadError> {
        let url = self
            .settings
            .image_for_level(self.level)
            .ok_or(LoadError::EmptyBank)?
            .to_string();

        let superseded_timer = self.clock.stop();
        if self.phase == SessionPhase::Playing {
            log::warn!("Abandoning level {} to restart it", self.level + 1);
        }

        self.generation += 1;
        let ticket = LoadTicket {
            generation: self.generation,
            level: self.level,
        };
        self.pending = Some(ticket);
        self.board = None;
        self.phase = SessionPhase::Loading;

        log::info!(
            "Starting level {} with image {}/{}: {}",
            self.level + 1,
            self.level % self.settings.image_bank.len() + 1,
            self.settings.image_bank.len(),
            url
        );
        Ok(LoadRequest {
            ticket,
            url,
            superseded_timer,
        })
    }

    /// Deliver the image requested by `begin_level`.
    ///
    /// On failure the level is aborted (phase back to `Idle`) and the error
    /// is returned; call `begin_level` again to retry. No partially built
    /// board is ever kept.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<DynamicImage, LoadError>,
    ) -> Result<StartOutcome, BlockaError> {
        if self.pending != Some(ticket) {
            log::debug!(
                "Dropping stale load for generation {} (current {})",
                ticket.generation,
                self.generation
            );
            return Ok(StartOutcome::Stale);
        }
        self.pending = None;

        let image = match result {
            Ok(image) => image,
            Err(e) => {
                log::error!("Level {} failed to load: {}", self.level + 1, e);
                self.phase = SessionPhase::Idle;
                return Err(e.into());
            }
        };

        let size = self.settings.canvas_size;
        let letterboxed = Arc::new(cover_fit(&image, size, self.letterbox));
        let filter = self.settings.filter_for_level(self.level);

        let board = match PuzzleBoard::build_with(
            self.settings.difficulty,
            letterboxed,
            filter,
            size,
            &mut self.rng,
            self.generation,
            self.filter_fn,
        ) {
            Ok(board) => board,
            Err(e) => {
                log::error!("Level {} failed to build: {}", self.level + 1, e);
                self.phase = SessionPhase::Idle;
                return Err(e.into());
            }
        };

        self.board = Some(board);
        let timer = self.clock.start();
        self.phase = SessionPhase::Playing;
        log::info!("Level {} ready", self.level + 1);

        Ok(StartOutcome::Started {
            level: self.level,
            filter,
            timer,
        })
    }

    /// Start the current level, loading synchronously from `source`
    pub fn start(&mut self, source: &dyn ImageSource) -> Result<StartOutcome, BlockaError> {
        let request = self.begin_level()?;
        let result = source.load(&request.url);
        self.complete_load(request.ticket, result)
    }

    /// Route a click to the board. A winning click stops the clock,
    /// records the time and returns the victory report.
    pub fn handle_click(&mut self, pos: Vec2, button: PointerButton) -> ClickOutcome {
        if self.phase != SessionPhase::Playing {
            return ClickOutcome::Ignored;
        }
        let Some(board) = self.board.as_mut() else {
            return ClickOutcome::Ignored;
        };

        match board.handle_interaction(pos, button) {
            InteractionOutcome::Ignored => ClickOutcome::Ignored,
            InteractionOutcome::Rotated { index } => ClickOutcome::Rotated { index },
            InteractionOutcome::Solved { .. } => ClickOutcome::Solved(self.finish_level()),
        }
    }

    /// Check the board without a click (after tiles were set directly).
    /// Returns the victory report if this solves the level.
    pub fn check_victory(&mut self) -> Option<VictoryReport> {
        if self.phase != SessionPhase::Playing {
            return None;
        }
        let board = self.board.as_mut()?;
        if !board.check_victory() {
            return None;
        }
        board.reveal();
        Some(self.finish_level())
    }

    fn finish_level(&mut self) -> VictoryReport {
        log::info!("Level {} complete!", self.level + 1);
        let timer = self.clock.stop();
        let seconds = self.clock.seconds();
        let new_best = self.best_times.record(self.level, seconds);
        self.phase = SessionPhase::Solved;

        VictoryReport {
            level: self.level,
            seconds,
            formatted: format_time(seconds),
            new_best,
            best_seconds: self.best_times.get(self.level).unwrap_or(seconds),
            timer,
            reveal_delay: REVEAL_DELAY,
            is_last_image: self.is_last_image(),
        }
    }

    /// One clock tick from the host. Returns false if `token` is stale and
    /// its callback should be cancelled.
    pub fn tick(&mut self, token: TimerToken) -> bool {
        self.clock.tick(token)
    }

    /// Move to the next level, wrapping after the last image.
    /// Returns the new level index; call `begin_level` to play it.
    pub fn advance(&mut self) -> usize {
        if self.clock.stop().is_some() {
            log::warn!("Advanced past level {} while it was running", self.level + 1);
        }
        self.level += 1;
        if self.level >= self.settings.image_bank.len() {
            self.level = 0;
            log::info!("All levels completed! Wrapping to level 1");
        }
        self.generation += 1;
        self.pending = None;
        self.board = None;
        self.phase = SessionPhase::Idle;
        self.level
    }

    /// Back to the menu: level 0, clock cleared, no board.
    /// Returns the clock run to cancel, if one was active.
    pub fn reset(&mut self) -> Option<TimerToken> {
        let token = self.clock.reset();
        self.level = 0;
        self.generation += 1;
        self.pending = None;
        self.board = None;
        self.phase = SessionPhase::Idle;
        log::info!("Back to menu");
        token
    }

    /// Change the tile count. Refused while a level is loading or playing.
    pub fn set_difficulty(&mut self, difficulty: u32) -> bool {
        if self.is_active() {
            log::warn!("Cannot change difficulty during a level");
            return false;
        }
        if difficulty == 0 {
            log::warn!("Ignoring difficulty 0");
            return false;
        }
        if let Err(e) = check_grid(difficulty, self.settings.canvas_size) {
            log::warn!("Ignoring difficulty {}: {}", difficulty, e);
            return false;
        }
        self.settings.difficulty = difficulty;
        self.board = None;
        log::info!("Difficulty set to {}", difficulty);
        true
    }

    /// Draw the board, or just the background when there is none
    pub fn render(&self, surface: &mut dyn Surface) {
        match &self.board {
            Some(board) => board.render(surface, &self.style),
            None => surface.clear(self.style.background),
        }
    }

    /// True between level start and victory
    pub fn is_active(&self) -> bool {
        matches!(self.phase, SessionPhase::Loading | SessionPhase::Playing)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// 0-based level index
    pub fn level(&self) -> usize {
        self.level
    }

    /// 1-based level number for display
    pub fn level_number(&self) -> usize {
        self.level + 1
    }

    pub fn is_last_image(&self) -> bool {
        self.level + 1 >= self.settings.image_bank.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.clock.seconds()
    }

    pub fn elapsed_display(&self) -> String {
        self.clock.display()
    }

    pub fn timer_token(&self) -> Option<TimerToken> {
        self.clock.token()
    }

    pub fn best_time(&self, level: usize) -> Option<u32> {
        self.best_times.get(level)
    }

    pub fn best_times(&self) -> &BestTimes {
        &self.best_times
    }

    pub fn board(&self) -> Option<&PuzzleBoard> {
        self.board.as_ref()
    }

    pub fn board_mut(&mut self) -> Option<&mut PuzzleBoard> {
        self.board.as_mut()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn difficulty(&self) -> u32 {
        self.settings.difficulty
    }
}
