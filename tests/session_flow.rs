//! Full level flows through the public API

use blocka::FilterKind;
use blocka::raster::{SoftwareSurface, Surface};
use blocka::settings::Settings;
use blocka::sim::{
    ClickOutcome, LevelSession, PointerButton, SessionPhase, StartOutcome, TimerToken,
};
use blocka::source::MemoryImageSource;
use image::{DynamicImage, Rgba, RgbaImage};

const SIZE: u32 = 60;

fn bank(len: usize) -> Vec<String> {
    (1..=len).map(|i| format!("./assets/gl-{}.jpg", i)).collect()
}

/// Quadrant image so every 2x2 tile is a distinct solid color
fn quadrants() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(SIZE, SIZE, |x, y| {
        Rgba(match (x < SIZE / 2, y < SIZE / 2) {
            (true, true) => [200, 40, 40, 255],
            (false, true) => [40, 200, 40, 255],
            (true, false) => [40, 40, 200, 255],
            (false, false) => [120, 120, 120, 255],
        })
    }))
}

fn source(urls: &[String]) -> MemoryImageSource {
    urls.iter()
        .fold(MemoryImageSource::new(), |src, url| src.with(url.clone(), quadrants()))
}

fn session(difficulty: u32, images: usize) -> (LevelSession, MemoryImageSource) {
    let urls = bank(images);
    let settings = Settings {
        canvas_size: SIZE,
        difficulty,
        image_bank: urls.clone(),
        seed: Some(2024),
        ..Settings::default()
    };
    (LevelSession::new(settings).unwrap(), source(&urls))
}

fn started_timer(outcome: StartOutcome) -> TimerToken {
    match outcome {
        StartOutcome::Started { timer, .. } => timer,
        StartOutcome::Stale => panic!("level did not start"),
    }
}

/// Click each tile with the primary button until upright; returns the
/// outcome of the final click
fn click_to_solve(session: &mut LevelSession) -> ClickOutcome {
    let centers: Vec<_> = session
        .board()
        .unwrap()
        .tiles()
        .iter()
        .map(|t| t.target_rect().center())
        .collect();
    let mut last = ClickOutcome::Ignored;
    for (i, center) in centers.into_iter().enumerate() {
        while !session.board().unwrap().tiles()[i].is_correct() {
            last = session.handle_click(center, PointerButton::Primary);
        }
    }
    last
}

#[test]
fn solving_by_clicks_reports_victory() {
    let (mut session, images) = session(4, 6);
    // Level 2 uses the grayscale filter
    session.advance();
    let timer = started_timer(session.start(&images).unwrap());
    assert!(session.board().unwrap().tiles().iter().all(|t| t.filter_applied()));

    for _ in 0..65 {
        assert!(session.tick(timer));
    }
    assert_eq!(session.elapsed_display(), "01:05");

    let ClickOutcome::Solved(report) = click_to_solve(&mut session) else {
        panic!("last click should solve the puzzle");
    };
    assert_eq!(report.level, 1);
    assert_eq!(report.formatted, "01:05");
    assert!(report.new_best);
    assert_eq!(report.timer, Some(timer));
    assert_eq!(report.reveal_delay.as_millis(), 500);
    assert!(!report.is_last_image);

    assert_eq!(session.phase(), SessionPhase::Solved);
    assert!(!session.tick(timer));
    assert_eq!(session.best_time(1), Some(65));
    assert!(session.board().unwrap().tiles().iter().all(|t| !t.filter_applied()));

    // Solved board ignores further clicks
    assert_eq!(
        session.handle_click(glam::Vec2::new(5.0, 5.0), PointerButton::Secondary),
        ClickOutcome::Ignored
    );

    // Revealed board shows the source image unfiltered
    let mut surface = SoftwareSurface::new(SIZE, SIZE);
    session.render(&mut surface);
    assert_eq!(surface.size(), (SIZE, SIZE));
    assert_eq!(surface.pixel(10, 10), Some([200, 40, 40, 255]));
    assert_eq!(surface.pixel(50, 50), Some([120, 120, 120, 255]));
}

#[test]
fn levels_wrap_after_last_image() {
    let (mut session, images) = session(4, 3);
    for expected in [1, 2, 0, 1] {
        assert_eq!(session.advance(), expected);
    }
    assert_eq!(session.level_number(), 2);

    let outcome = session.start(&images).unwrap();
    // Filter schedule indexes independently of the image bank
    assert!(matches!(
        outcome,
        StartOutcome::Started { level: 1, filter: FilterKind::Grayscale, .. }
    ));
}

#[test]
fn last_image_victory_offers_restart() {
    let (mut session, images) = session(4, 2);
    session.advance();
    started_timer(session.start(&images).unwrap());
    let ClickOutcome::Solved(report) = click_to_solve(&mut session) else {
        panic!("last click should solve the puzzle");
    };
    assert!(report.is_last_image);
    assert_eq!(session.advance(), 0);
}

#[test]
fn stale_load_after_menu_is_discarded() {
    let (mut session, images) = session(6, 6);
    let request = session.begin_level().unwrap();
    assert_eq!(session.phase(), SessionPhase::Loading);
    assert!(!session.set_difficulty(4));

    session.reset();
    let img = blocka::source::ImageSource::load(&images, &request.url).unwrap();
    assert_eq!(
        session.complete_load(request.ticket, Ok(img)).unwrap(),
        StartOutcome::Stale
    );
    assert!(session.board().is_none());
    assert_eq!(session.elapsed_display(), "00:00");
}

#[test]
fn eight_tiles_ignore_center_cell() {
    let (mut session, images) = session(8, 6);
    started_timer(session.start(&images).unwrap());
    let board = session.board().unwrap();
    assert_eq!(board.tile_count(), 8);

    let before: Vec<_> = board.tiles().iter().map(|t| t.current_rotation()).collect();
    let center = glam::Vec2::new(SIZE as f32 / 2.0, SIZE as f32 / 2.0);
    assert_eq!(
        session.handle_click(center, PointerButton::Primary),
        ClickOutcome::Ignored
    );
    let after: Vec<_> = session
        .board()
        .unwrap()
        .tiles()
        .iter()
        .map(|t| t.current_rotation())
        .collect();
    assert_eq!(before, after);

    // Bottom-right cell is the last tile, not an off-by-one neighbor
    let corner = glam::Vec2::new(SIZE as f32 - 2.0, SIZE as f32 - 2.0);
    assert_eq!(
        session.handle_click(corner, PointerButton::Secondary),
        ClickOutcome::Rotated { index: 7 }
    );
}

#[test]
fn same_seed_same_scramble() {
    let rotations = |seed| {
        let urls = bank(1);
        let settings = Settings {
            canvas_size: SIZE,
            difficulty: 6,
            image_bank: urls.clone(),
            seed: Some(seed),
            ..Settings::default()
        };
        let mut session = LevelSession::new(settings).unwrap();
        session.start(&source(&urls)).unwrap();
        session
            .board()
            .unwrap()
            .tiles()
            .iter()
            .map(|t| t.current_rotation())
            .collect::<Vec<_>>()
    };
    assert_eq!(rotations(7), rotations(7));
}
