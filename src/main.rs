//! Paddle Rally entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, TouchEvent};

    use paddle_rally::platform::{CanvasSurface, WebAudioPlatform};
    use paddle_rally::settings::device_class_from_query;
    use paddle_rally::{AudioSynthesisManager, GameLoopController, SessionSnapshot, Settings};

    /// Game instance holding all state
    struct Game {
        controller: GameLoopController<WebAudioPlatform>,
        surface: CanvasSurface,
        canvas: HtmlCanvasElement,
        last_snapshot: Option<SessionSnapshot>,
    }

    impl Game {
        /// Pointer y relative to the canvas
        fn canvas_y(&self, client_y: i32) -> f32 {
            let rect = self.canvas.get_bounding_client_rect();
            (client_y as f64 - rect.top()) as f32
        }

        fn render(&mut self) {
            self.controller.render(&mut self.surface);
        }

        /// Update HUD elements in DOM
        fn update_hud(&mut self) {
            let snapshot = self.controller.snapshot();
            if self.last_snapshot == Some(snapshot) {
                return;
            }
            self.last_snapshot = Some(snapshot);

            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };

            if let Some(el) = document.query_selector("#hud-score .hud-value").ok().flatten() {
                el.set_text_content(Some(&snapshot.score.to_string()));
            }
            if let Some(el) = document.query_selector("#hud-level .hud-value").ok().flatten() {
                el.set_text_content(Some(&snapshot.speed_level.to_string()));
            }
            if let Some(el) = document.get_element_by_id("status") {
                let message = if snapshot.game_over {
                    "Game over - click to play again"
                } else if snapshot.paused {
                    "Paused - click to resume"
                } else if !snapshot.running {
                    "Click to start"
                } else {
                    ""
                };
                el.set_text_content(Some(message));
                let _ = el.set_attribute("class", if message.is_empty() { "hidden" } else { "" });
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Paddle Rally starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        // Arena coordinates are CSS pixels so pointer positions map directly
        let width = canvas.client_width().max(0) as u32;
        let height = canvas.client_height().max(0) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .expect("no 2d context")
            .dyn_into()
            .expect("not a 2d context");

        let mut settings = Settings::load();
        let query = window.location().search().unwrap_or_default();
        if let Some(class) = device_class_from_query(&query) {
            log::info!("Device class override: {}", class.as_str());
            settings.audio.device_class = class;
            settings.save();
        }
        let audio = AudioSynthesisManager::new(WebAudioPlatform::detect(), &settings);
        let seed = js_sys::Date::now() as u64;
        let mut controller = GameLoopController::new(audio, seed);
        if !controller.mount(width as f32, height as f32) {
            log::error!("Canvas has no usable size; not starting");
            return;
        }

        let game = Rc::new(RefCell::new(Game {
            controller,
            surface: CanvasSurface::new(ctx, width as f32, height as f32),
            canvas: canvas.clone(),
            last_snapshot: None,
        }));

        {
            let mut g = game.borrow_mut();
            g.render();
            g.update_hud();
        }

        setup_input_handlers(&canvas, game.clone());
        setup_auto_pause(game.clone());
        setup_teardown(game);

        log::info!("Paddle Rally ready (seed {})", seed);
    }

    /// Start from a user gesture; subscribes to frames when asked to
    fn start(game: &Rc<RefCell<Game>>) {
        let subscribe = game.borrow_mut().controller.start();
        if subscribe {
            request_animation_frame(game.clone());
        }
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Mouse move -> paddle
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                let y = g.canvas_y(event.client_y());
                g.controller.pointer_moved(y);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Click -> start (user gesture unlocks audio)
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                start(&game);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch move -> paddle
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let mut g = game.borrow_mut();
                    let y = g.canvas_y(touch.client_y());
                    g.controller.pointer_moved(y);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start -> start
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let mut g = game.borrow_mut();
                    let y = g.canvas_y(touch.client_y());
                    g.controller.pointer_moved(y);
                }
                start(&game);
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard: space toggles, R resets
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                match event.key().as_str() {
                    " " => {
                        event.prevent_default();
                        let running = game.borrow().controller.session().running;
                        if running {
                            game.borrow_mut().controller.pause();
                        } else {
                            start(&game);
                        }
                    }
                    "r" | "R" => {
                        let mut g = game.borrow_mut();
                        g.controller.reset();
                        g.render();
                        g.update_hud();
                    }
                    _ => {}
                }
            });
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                let _ = document
                    .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            }
            closure.forget();
        }
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
        let keep_going = {
            let mut g = game.borrow_mut();
            let keep_going = g.controller.frame();
            g.render();
            g.update_hud();
            keep_going
        };

        if keep_going {
            request_animation_frame(game);
        }
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if g.controller.session().running {
                        g.controller.pause();
                        log::info!("Auto-paused (tab hidden)");
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                if g.controller.session().running {
                    g.controller.pause();
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Release audio when the page goes away
    fn setup_teardown(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            game.borrow_mut().controller.unmount();
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Paddle Rally (native) starting...");
    log::info!("Native mode is headless and silent - run with `trunk serve` for the web version");

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(42);
    headless::run(seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use paddle_rally::platform::NativeAudioPlatform;
    use paddle_rally::{AudioSynthesisManager, GameLoopController, Settings};

    const ARENA_WIDTH: f32 = 800.0;
    const ARENA_HEIGHT: f32 = 400.0;
    const MAX_FRAMES: u32 = 100_000;
    /// How far the autopilot may move the paddle per frame
    const AUTOPILOT_SPEED: f32 = 5.0;

    /// Play one session with a rate-limited autopilot and report the result
    pub fn run(seed: u64) {
        let settings = Settings::load();
        let audio = AudioSynthesisManager::new(NativeAudioPlatform::default(), &settings);
        let mut controller = GameLoopController::new(audio, seed);
        if !controller.mount(ARENA_WIDTH, ARENA_HEIGHT) {
            log::error!("Failed to mount headless arena");
            return;
        }
        controller.start();
        log::info!("Audio state: {:?}", controller.audio().state());

        let mut frames = 0;
        while frames < MAX_FRAMES {
            if let Some(world) = controller.world() {
                let paddle_center = world.player.center_y();
                let delta = (world.ball.pos.y - paddle_center)
                    .clamp(-AUTOPILOT_SPEED, AUTOPILOT_SPEED);
                controller.pointer_moved(paddle_center + delta);
            }
            frames += 1;
            if !controller.frame() {
                break;
            }
        }

        let snapshot = controller.snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(json) => log::info!("Session finished after {} frames: {}", frames, json),
            Err(err) => log::warn!("Could not serialize session: {}", err),
        }
        println!(
            "seed {}: score {}, level {}, {} frames{}",
            seed,
            snapshot.score,
            snapshot.speed_level,
            frames,
            if snapshot.game_over { "" } else { " (frame cap reached)" }
        );
        controller.unmount();
    }
}
