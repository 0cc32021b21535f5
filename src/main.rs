//! Knowledge Quest entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, KeyboardEvent};

    use knowledge_quest::audio::AudioManager;
    use knowledge_quest::consts::*;
    use knowledge_quest::platform::{self, LocalStore};
    use knowledge_quest::{LevelSession, Overlay, Screen, Subject};

    const QUESTIONS_URL: &str = "data/questions.json";

    /// Held movement keys
    #[derive(Default)]
    struct Keys {
        left: bool,
        right: bool,
        jump: bool,
    }

    /// Game instance holding all state
    struct Game {
        session: LevelSession<LocalStore>,
        audio: AudioManager,
        ctx: CanvasRenderingContext2d,
        ui: Element,
        hud: Element,
        keys: Keys,
        /// Hint revealed for the question on screen
        hint: Option<String>,
        /// Last markup written to the UI layer
        ui_html: String,
        hud_text: String,
    }

    impl Game {
        fn frame(&mut self, now: f64) {
            self.session
                .set_controls(self.keys.left, self.keys.right, self.keys.jump);
            self.session.frame(now);
            if self.session.episode().is_none() {
                self.hint = None;
            }
            self.play_cues();
            self.draw();
            self.update_ui(now);
        }

        fn play_cues(&mut self) {
            let enabled = self.session.profile().settings.audio;
            for cue in self.session.drain_cues() {
                if enabled {
                    self.audio.play(cue);
                }
            }
        }

        /// Dispatch a `data-action` from a clicked button
        fn action(&mut self, action: &str) {
            self.audio.resume();
            let now = platform::now_ms();
            let (verb, arg) = action.split_once(':').unwrap_or((action, ""));
            match verb {
                "play" | "worlds" => self.session.open_worlds(),
                "world" => {
                    if let Ok(subject) = arg.parse::<Subject>() {
                        self.session.select_world(subject);
                    }
                }
                "level" => {
                    if let Ok(level) = arg.parse() {
                        self.session.start_level(level);
                    }
                }
                "answer" => self.answer(arg.parse().ok(), now),
                "hint" => self.hint = self.session.reveal_hint(),
                "continue" => {
                    self.session.continue_after_results();
                }
                "pause" => {
                    self.session.toggle_pause();
                }
                "exit" => self.session.exit_level(),
                "audio" => {
                    let mut settings = self.session.profile().settings.clone();
                    settings.audio = !settings.audio;
                    self.audio.set_volume(settings.master_volume);
                    self.session.update_settings(settings);
                }
                _ => log::debug!("Unknown action {}", action),
            }
            self.play_cues();
            self.update_ui(now);
        }

        fn answer(&mut self, choice: Option<usize>, now: f64) {
            let Some(choice) = choice else { return };
            let before = self.session.episode().map(|e| e.question_number());
            if self.session.answer(choice, now).is_some() {
                let after = self.session.episode().map(|e| e.question_number());
                if after != before {
                    self.hint = None;
                }
            }
        }

        fn on_key(&mut self, key: &str, down: bool) {
            match key {
                "ArrowLeft" | "a" | "A" => self.keys.left = down,
                "ArrowRight" | "d" | "D" => self.keys.right = down,
                "ArrowUp" | "w" | "W" | " " => self.keys.jump = down,
                "p" | "P" | "Escape" if down => {
                    self.session.toggle_pause();
                }
                "1" | "2" | "3" | "4" if down => {
                    let choice = key.parse::<usize>().ok().map(|n| n - 1);
                    self.answer(choice, platform::now_ms());
                }
                _ => {}
            }
        }

        /// Draw the play field
        fn draw(&self) {
            let ctx = &self.ctx;
            let w = FIELD_WIDTH as f64;
            let h = FIELD_HEIGHT as f64;
            let Some(state) = self.session.attempt() else {
                ctx.set_fill_style_str("#0f172a");
                ctx.fill_rect(0.0, 0.0, w, h);
                return;
            };
            let theme = state.layout.theme;

            ctx.set_fill_style_str(theme.sky);
            ctx.fill_rect(0.0, 0.0, w, h);
            ctx.set_fill_style_str(theme.ground);
            ctx.fill_rect(0.0, GROUND_Y as f64, w, h - GROUND_Y as f64);

            if let Some(x) = state.checkpoint_x {
                ctx.set_fill_style_str("#facc15");
                ctx.fill_rect(x as f64, GROUND_Y as f64 - 70.0, 4.0, 70.0);
            }

            ctx.set_fill_style_str("#fbbf24");
            for coin in state.layout.coins.iter().filter(|c| !c.collected) {
                ctx.begin_path();
                let _ = ctx.arc(
                    coin.pos.x as f64,
                    coin.pos.y as f64,
                    coin.radius as f64,
                    0.0,
                    std::f64::consts::TAU,
                );
                ctx.fill();
            }

            ctx.set_fill_style_str("#dc2626");
            for o in &state.layout.obstacles {
                ctx.fill_rect(o.rect.x as f64, o.rect.y as f64, o.rect.w as f64, o.rect.h as f64);
            }

            let gate = &state.layout.gate;
            ctx.set_fill_style_str(if gate.open { "#22c55e" } else { theme.gate });
            ctx.fill_rect(
                gate.rect.x as f64,
                gate.rect.y as f64,
                gate.rect.w as f64,
                gate.rect.h as f64,
            );

            let body = state.body.rect();
            ctx.set_fill_style_str("#f8fafc");
            ctx.fill_rect(body.x as f64, body.y as f64, body.w as f64, body.h as f64);
        }

        /// Rewrite the DOM layers when their content changed
        fn update_ui(&mut self, now: f64) {
            let html = self.ui_markup();
            if html != self.ui_html {
                self.ui.set_inner_html(&html);
                self.ui_html = html;
            }

            let text = self
                .session
                .hud(now)
                .map(|h| {
                    let mut text = format!(
                        "{} L{}  Score {}  Stars {}  Time {}",
                        h.world, h.level, h.score, h.stars, h.clock
                    );
                    if let Some((n, total)) = h.question {
                        text.push_str(&format!("  Q{}/{}", n, total));
                    }
                    if let Some(secs) = h.question_secs {
                        text.push_str(&format!("  {}s", secs));
                    }
                    text
                })
                .unwrap_or_default();
            if text != self.hud_text {
                self.hud.set_text_content(Some(&text));
                self.hud_text = text;
            }
        }

        fn ui_markup(&self) -> String {
            match self.session.screen() {
                Screen::Start => format!(
                    "<div class=\"panel\"><h1>Knowledge Quest</h1><p>Welcome, {}!</p>{}{}</div>",
                    escape(&self.session.profile().name),
                    button("play", "Play"),
                    button(
                        "audio",
                        if self.session.profile().settings.audio {
                            "Sound: on"
                        } else {
                            "Sound: off"
                        }
                    ),
                ),
                Screen::WorldSelect => {
                    let worlds: String = Subject::ALL
                        .iter()
                        .map(|s| {
                            let label = format!(
                                "{} (best {})",
                                s.display_name(),
                                self.session.progress().best_score(*s)
                            );
                            button(&format!("world:{}", s.as_str()), &label)
                        })
                        .collect();
                    format!("<div class=\"panel\"><h2>Choose a world</h2>{}</div>", worlds)
                }
                Screen::LevelSelect(subject) => {
                    let levels: String = (1..=MAX_LEVEL)
                        .map(|level| {
                            if self.session.progress().is_unlocked(subject, level) {
                                button(&format!("level:{}", level), &format!("Level {}", level))
                            } else {
                                format!("<button disabled>Level {} (locked)</button>", level)
                            }
                        })
                        .collect();
                    format!(
                        "<div class=\"panel\"><h2>{}</h2>{}{}</div>",
                        subject.display_name(),
                        levels,
                        button("worlds", "Back")
                    )
                }
                Screen::Playing => self.play_markup(),
            }
        }

        fn play_markup(&self) -> String {
            match self.session.overlay() {
                Overlay::Results {
                    message,
                    can_continue,
                } => {
                    let next = if *can_continue {
                        button("continue", "Continue")
                    } else {
                        String::new()
                    };
                    return format!(
                        "<div class=\"modal\"><h2>Results</h2><p>{}</p>{}</div>",
                        escape(message),
                        next
                    );
                }
                Overlay::RedeemFailed => {
                    return format!(
                        "<div class=\"modal\"><p>Redeem failed! -{} points. Back to the checkpoint.</p></div>",
                        REDEEM_PENALTY
                    );
                }
                Overlay::LevelTransition { title, text } => {
                    return format!(
                        "<div class=\"modal\"><h2>{}</h2><p>{}</p></div>",
                        escape(title),
                        escape(text)
                    );
                }
                Overlay::None => {}
            }

            if let Some(episode) = self.session.episode() {
                let Some(q) = episode.current() else {
                    return String::new();
                };
                let title = if episode.is_gate() {
                    "Gate Quiz"
                } else {
                    "Redeem Challenge"
                };
                let choices: String = q
                    .choices
                    .iter()
                    .enumerate()
                    .map(|(i, c)| button(&format!("answer:{}", i), &format!("{}. {}", i + 1, c)))
                    .collect();
                let hint = match (&self.hint, episode.is_gate() && q.hint.is_some()) {
                    (Some(text), _) => format!("<p class=\"hint\">{}</p>", escape(text)),
                    (None, true) => button("hint", "Hint"),
                    (None, false) => String::new(),
                };
                return format!(
                    "<div class=\"modal\"><h2>{} {}/{}</h2><p>{}</p>{}{}</div>",
                    title,
                    episode.question_number(),
                    episode.total(),
                    escape(&q.prompt),
                    choices,
                    hint
                );
            }

            let paused = self.session.attempt().is_some_and(|s| s.paused);
            if paused {
                format!(
                    "<div class=\"modal\"><h2>Paused</h2>{}{}</div>",
                    button("pause", "Resume"),
                    button("exit", "Quit level")
                )
            } else {
                button("pause", "Pause")
            }
        }
    }

    fn button(action: &str, label: &str) -> String {
        format!("<button data-action=\"{}\">{}</button>", action, escape(label))
    }

    fn escape(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }

    /// Fetch the question file; any failure falls back to the built-ins
    async fn fetch_questions(window: &web_sys::Window) -> Option<String> {
        let response = JsFuture::from(window.fetch_with_str(QUESTIONS_URL))
            .await
            .ok()?;
        let response: web_sys::Response = response.dyn_into().ok()?;
        if !response.ok() {
            log::warn!("{} returned {}", QUESTIONS_URL, response.status());
            return None;
        }
        let text = JsFuture::from(response.text().ok()?).await.ok()?;
        text.as_string()
    }

    fn element(document: &Document, tag: &str, id: &str) -> Result<Element, JsValue> {
        if let Some(el) = document.get_element_by_id(id) {
            return Ok(el);
        }
        let el = document.create_element(tag)?;
        el.set_id(id);
        document
            .body()
            .ok_or_else(|| JsValue::from_str("no body"))?
            .append_child(&el)?;
        Ok(el)
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Knowledge Quest starting...");

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let canvas: HtmlCanvasElement = element(&document, "canvas", "canvas")?.dyn_into()?;
        canvas.set_width(FIELD_WIDTH as u32);
        canvas.set_height(FIELD_HEIGHT as u32);
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into()?;
        let hud = element(&document, "div", "hud")?;
        let ui = element(&document, "div", "ui")?;

        let questions = fetch_questions(&window).await;
        if questions.is_none() {
            log::warn!("Using built-in questions");
        }
        let session = LevelSession::new(
            platform::default_store(),
            questions.as_deref(),
            platform::run_seed(),
        );
        let audio = AudioManager::new(session.profile().settings.effective_volume());

        let game = Rc::new(RefCell::new(Game {
            session,
            audio,
            ctx,
            ui: ui.clone(),
            hud,
            keys: Keys::default(),
            hint: None,
            ui_html: String::new(),
            hud_text: String::new(),
        }));

        setup_ui_clicks(&ui, game.clone());
        setup_keyboard(&window, game.clone())?;

        request_animation_frame(game);
        log::info!("Knowledge Quest running!");
        Ok(())
    }

    /// One delegated click handler for every `data-action` button
    fn setup_ui_clicks(ui: &Element, game: Rc<RefCell<Game>>) {
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::MouseEvent| {
            let action = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .and_then(|el| el.closest("[data-action]").ok().flatten())
                .and_then(|el| el.get_attribute("data-action"));
            if let Some(action) = action {
                game.borrow_mut().action(&action);
            }
        });
        let _ = ui.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_keyboard(window: &web_sys::Window, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        for (kind, down) in [("keydown", true), ("keyup", false)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = event.key();
                if matches!(key.as_str(), " " | "ArrowUp" | "ArrowLeft" | "ArrowRight") {
                    event.prevent_default();
                }
                game.borrow_mut().on_key(&key, down);
            });
            window.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |_time: f64| {
            game_loop(game);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>) {
        // Wall clock, shared with answer timestamps
        game.borrow_mut().frame(platform::now_ms());
        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    if let Err(e) = wasm_game::run().await {
        log::error!("Startup failed: {:?}", e);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Knowledge Quest (native) starting...");
    log::info!("Native mode runs a scripted headless playthrough - use the wasm build to play");

    demo::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Headless playthrough of the math world: hold right, hop now and then,
/// answer every question correctly.
#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use knowledge_quest::persistence::MemoryStore;
    use knowledge_quest::platform;
    use knowledge_quest::{LevelSession, Overlay, Screen, Subject};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    const MAX_FRAMES: u32 = 60 * 60 * 5;

    pub fn run() {
        let mut session = LevelSession::new(MemoryStore::new(), None, platform::run_seed());
        session.open_worlds();
        session.select_world(Subject::Math);
        session.start_level(1);

        let mut now = 0.0;
        for frame in 0..MAX_FRAMES {
            now += FRAME_MS;
            let jump = frame % 40 < 20;
            session.set_controls(false, true, jump);
            session.frame(now);

            let answer = session
                .episode()
                .and_then(|e| e.current())
                .map(|q| q.answer_index);
            if let Some(choice) = answer {
                // Think for a moment
                now += 500.0;
                session.answer(choice, now);
            }

            if matches!(session.overlay(), Overlay::Results { .. }) {
                log::warn!("Attempt ended: {:?}", session.overlay());
                session.continue_after_results();
            }
            if session.screen() == Screen::WorldSelect {
                break;
            }
        }

        let progress = session.progress();
        println!(
            "Math: unlocked up to level {}, best score {}",
            progress.unlock_level(Subject::Math),
            progress.best_score(Subject::Math)
        );
    }
}
