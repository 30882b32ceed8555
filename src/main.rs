//! Blocka entry point
//!
//! On the web this wires the DOM (canvas, buttons, difficulty select, HUD)
//! to a `LevelSession`. Natively it runs a headless auto-solver over the
//! image bank, which is handy for checking assets and filters.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        HtmlButtonElement, HtmlCanvasElement, HtmlElement, HtmlSelectElement, MouseEvent,
    };

    use blocka::consts::*;
    use blocka::platform::{CanvasSurface, fetch_image};
    use blocka::sim::{
        ClickOutcome, LevelSession, PointerButton, SessionPhase, StartOutcome, TimerToken,
        VictoryReport,
    };
    use blocka::{Settings, format_time};

    /// Game instance shared by every DOM callback
    struct Game {
        session: LevelSession,
        surface: CanvasSurface,
        /// Clock run and the `setInterval` handle driving it
        interval: Option<(TimerToken, i32)>,
    }

    impl Game {
        fn render(&mut self) {
            self.session.render(&mut self.surface);
        }

        /// Clear the interval for `token` if it is the one we hold
        fn cancel_interval(&mut self, token: TimerToken) {
            if let Some((held, handle)) = self.interval {
                if held == token {
                    if let Some(window) = web_sys::window() {
                        window.clear_interval_with_handle(handle);
                    }
                    self.interval = None;
                    log::debug!("Interval cleared (token {})", token.id());
                }
            }
        }

        /// Canvas-relative click position in backing-store pixels
        fn click_position(&self, event: &MouseEvent) -> Vec2 {
            let canvas = self.surface.canvas();
            let rect = canvas.get_bounding_client_rect();
            let scale_x = canvas.width() as f64 / rect.width().max(1.0);
            let scale_y = canvas.height() as f64 / rect.height().max(1.0);
            Vec2::new(
                ((event.client_x() as f64 - rect.left()) * scale_x) as f32,
                ((event.client_y() as f64 - rect.top()) * scale_y) as f32,
            )
        }
    }

    fn document() -> Option<web_sys::Document> {
        web_sys::window()?.document()
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = document().and_then(|d| d.get_element_by_id(id)) {
            el.set_text_content(Some(text));
        }
    }

    fn set_display(id: &str, display: &str) {
        if let Some(el) = document()
            .and_then(|d| d.get_element_by_id(id))
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            let _ = el.style().set_property("display", display);
        }
    }

    fn set_start_enabled(enabled: bool) {
        if let Some(btn) = document()
            .and_then(|d| d.get_element_by_id("btnStart"))
            .and_then(|el| el.dyn_into::<HtmlButtonElement>().ok())
        {
            btn.set_disabled(!enabled);
        }
    }

    fn show_victory_panel(report: &VictoryReport) {
        set_text("finalTime", &report.formatted);
        set_text("bestTime", &format_time(report.best_seconds));
        set_text(
            "btnNext",
            if report.is_last_image {
                "Restart"
            } else {
                "Next level"
            },
        );
        set_display("victoryControls", "flex");
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Blocka starting...");

        let Some(document) = document() else {
            log::error!("No document, cannot start");
            return;
        };

        if let Some(loading) = document.get_element_by_id("mainLoader") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let Some(canvas) = document
            .get_element_by_id("blockaCanvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No #blockaCanvas element");
            return;
        };

        let mut settings = Settings::load();
        if settings.seed.is_none() {
            settings.seed = Some(js_sys::Date::now() as u64);
        }

        let Some(surface) = CanvasSurface::new(canvas.clone()) else {
            log::error!("Canvas has no 2d context");
            return;
        };
        surface.resize(settings.canvas_size);

        let difficulty = settings.difficulty;
        let session = match LevelSession::new(settings) {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Stored settings unusable ({}), using defaults", e);
                match LevelSession::new(Settings::default()) {
                    Ok(session) => session,
                    Err(e) => {
                        log::error!("Default settings rejected: {}", e);
                        return;
                    }
                }
            }
        };

        let game = Rc::new(RefCell::new(Game {
            session,
            surface,
            interval: None,
        }));
        game.borrow_mut().render();

        if let Some(select) = document
            .get_element_by_id("difficultySelect")
            .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok())
        {
            select.set_value(&difficulty.to_string());
        }
        set_text("levelValue", "1");
        set_text("timerValue", &format_time(0));
        set_display("victoryControls", "none");

        setup_canvas_handlers(&canvas, game.clone());
        setup_buttons(game.clone());
        setup_difficulty_select(game);

        log::info!("Blocka ready!");
    }

    /// Begin the current level and fetch its image in the background
    fn start_level(game: Rc<RefCell<Game>>) {
        let request = {
            let mut g = game.borrow_mut();
            match g.session.begin_level() {
                Ok(request) => {
                    if let Some(token) = request.superseded_timer {
                        g.cancel_interval(token);
                    }
                    request
                }
                Err(e) => {
                    log::error!("Cannot start level: {}", e);
                    return;
                }
            }
        };

        set_display("victoryControls", "none");
        set_start_enabled(false);

        wasm_bindgen_futures::spawn_local(async move {
            let result = fetch_image(&request.url).await;
            let mut g = game.borrow_mut();
            match g.session.complete_load(request.ticket, result) {
                Ok(StartOutcome::Started { level, timer, .. }) => {
                    set_text("levelValue", &(level + 1).to_string());
                    set_text("timerValue", &g.session.elapsed_display());
                    start_interval(&game, &mut g, timer);
                    g.render();
                }
                Ok(StartOutcome::Stale) => {}
                Err(e) => {
                    log::error!("Level failed to start: {}", e);
                    set_start_enabled(true);
                }
            }
        });
    }

    fn start_interval(game: &Rc<RefCell<Game>>, g: &mut Game, token: TimerToken) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let game = game.clone();
        let closure = Closure::<dyn FnMut()>::new(move || {
            let mut g = game.borrow_mut();
            if g.session.tick(token) {
                set_text("timerValue", &g.session.elapsed_display());
            } else {
                g.cancel_interval(token);
            }
        });
        match window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            TICK_INTERVAL.as_millis() as i32,
        ) {
            Ok(handle) => g.interval = Some((token, handle)),
            Err(e) => log::error!("Failed to start clock: {:?}", e),
        }
        closure.forget();
    }

    fn handle_click(game: &Rc<RefCell<Game>>, event: &MouseEvent, button: PointerButton) {
        let mut g = game.borrow_mut();
        let pos = g.click_position(event);
        match g.session.handle_click(pos, button) {
            ClickOutcome::Ignored => {}
            ClickOutcome::Rotated { .. } => g.render(),
            ClickOutcome::Solved(report) => {
                if let Some(token) = report.timer {
                    g.cancel_interval(token);
                }
                g.render();
                schedule_victory_panel(game.clone(), g.session.generation(), report);
            }
        }
    }

    /// Show the panel after the reveal delay, unless the player moved on
    fn schedule_victory_panel(game: Rc<RefCell<Game>>, generation: u64, report: VictoryReport) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let delay = report.reveal_delay.as_millis() as i32;
        let closure = Closure::once(move || {
            let g = game.borrow();
            if g.session.generation() == generation && g.session.phase() == SessionPhase::Solved {
                show_victory_panel(&report);
            }
        });
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay,
        );
        closure.forget();
    }

    fn setup_canvas_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Left click rotates counter-clockwise
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                handle_click(&game, &event, PointerButton::Primary);
            });
            let _ = canvas
                .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Right click rotates clockwise, no context menu
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                event.prevent_default();
                handle_click(&game, &event, PointerButton::Secondary);
            });
            let _ = canvas
                .add_event_listener_with_callback("contextmenu", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(game: Rc<RefCell<Game>>) {
        let Some(document) = document() else {
            return;
        };

        if let Some(btn) = document.get_element_by_id("btnStart") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                start_level(game.clone());
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("btnNext") {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                {
                    let mut g = game.borrow_mut();
                    if let Some(token) = g.session.timer_token() {
                        g.cancel_interval(token);
                    }
                    g.session.advance();
                }
                start_level(game.clone());
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("btnMenu") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = game.borrow_mut();
                if let Some(token) = g.session.reset() {
                    g.cancel_interval(token);
                }
                g.render();
                set_display("victoryControls", "none");
                set_start_enabled(true);
                set_text("levelValue", &g.session.level_number().to_string());
                set_text("timerValue", &g.session.elapsed_display());
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_difficulty_select(game: Rc<RefCell<Game>>) {
        let Some(select) = document()
            .and_then(|d| d.get_element_by_id("difficultySelect"))
            .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok())
        else {
            return;
        };

        let target = select.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let mut g = game.borrow_mut();
            let accepted = match target.value().parse::<u32>() {
                Ok(difficulty) => g.session.set_difficulty(difficulty),
                Err(_) => {
                    log::warn!("Ignoring difficulty '{}'", target.value());
                    false
                }
            };
            if accepted {
                g.session.settings().save();
                g.render();
            } else {
                // Put the control back in sync with the session
                target.set_value(&g.session.difficulty().to_string());
            }
        });
        let _ = select.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;

    use blocka::raster::SoftwareSurface;
    use blocka::sim::{ClickOutcome, LevelSession, PointerButton, StartOutcome, VictoryReport};
    use blocka::source::FsImageSource;
    use blocka::{BlockaError, Settings, format_time};

    const USAGE: &str = "usage: blocka [settings.json] [image-root] [output-dir]";

    /// Solve one level by left-clicking each tile until it is upright.
    /// Every click counts as one clock second.
    fn autosolve(session: &mut LevelSession) -> Option<VictoryReport> {
        let timer = session.timer_token()?;
        let targets: Vec<_> = session
            .board()?
            .tiles()
            .iter()
            .map(|tile| tile.target_rect().center())
            .collect();

        for (index, center) in targets.into_iter().enumerate() {
            for _ in 0..4 {
                if session.board()?.tiles()[index].is_correct() {
                    break;
                }
                session.tick(timer);
                if let ClickOutcome::Solved(report) =
                    session.handle_click(center, PointerButton::Primary)
                {
                    return Some(report);
                }
            }
        }
        None
    }

    pub fn run(args: &[String]) -> Result<(), BlockaError> {
        if args.iter().any(|a| a == "-h" || a == "--help") {
            println!("{}", USAGE);
            return Ok(());
        }

        let settings = match args.first() {
            Some(path) => Settings::load_from_path(path)?,
            None => Settings::load(),
        };
        let root = args.get(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        let out_dir = args.get(2).map(PathBuf::from);

        let source = FsImageSource::new(root);
        let levels = settings.image_bank.len();
        let mut session = LevelSession::new(settings)?;

        for _ in 0..levels {
            match session.start(&source)? {
                StartOutcome::Started { level, filter, .. } => {
                    log::info!("Level {} started (filter: {})", level + 1, filter.as_str());
                }
                StartOutcome::Stale => continue,
            }

            match autosolve(&mut session) {
                Some(report) => println!(
                    "Level {}: solved in {}{}",
                    report.level + 1,
                    report.formatted,
                    if report.new_best { " (new best)" } else { "" }
                ),
                None => log::warn!("Level {} could not be solved", session.level_number()),
            }

            if let Some(dir) = &out_dir {
                let size = session.settings().canvas_size;
                let mut surface = SoftwareSurface::new(size, size);
                session.render(&mut surface);
                let path = dir.join(format!("blocka-level-{}.png", session.level_number()));
                match surface.image().save(&path) {
                    Ok(()) => log::info!("Wrote {}", path.display()),
                    Err(e) => log::warn!("Could not write {}: {}", path.display(), e),
                }
            }

            session.advance();
        }

        println!("Best times:");
        for (level, seconds) in session.best_times().iter() {
            println!("  level {}: {}", level + 1, format_time(seconds));
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Blocka (native) starting...");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = native::run(&args) {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
