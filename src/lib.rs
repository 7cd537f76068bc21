//! Lunch Roulette core crate.
//!
//! A spinning wheel that picks one lunch menu from an editable list. The wheel
//! geometry, selection, spin state machine and confetti are plain Rust and run
//! natively under `cargo test`; `web` and `sw` bind them to the page and to the
//! offline service worker.

use wasm_bindgen::prelude::*;

pub mod app;
pub mod config;
pub mod confetti;
pub mod error;
pub mod menu;
pub mod resolver;
pub mod scheduler;
pub mod sector;
pub mod spin;
pub mod sw;
mod web;
pub mod worker;

pub use app::{Action, RouletteApp};
pub use config::{DEFAULT_MENUS, RouletteConfig, SpinDuration};
pub use error::RouletteError;

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    // Also runs inside the service worker; a second logger init is harmless.
    let _ = console_log::init_with_level(log::Level::Info);
}

// -----------------------------------------------------------------------------
// Page entrypoints
// -----------------------------------------------------------------------------

/// Build the roulette page. `config_json` may override any [`RouletteConfig`] field.
#[wasm_bindgen]
pub fn start_roulette(config_json: Option<String>) -> Result<(), JsValue> {
    let config = RouletteConfig::from_json(config_json.as_deref());
    web::start_roulette_mode(config)
}

/// Tear the page down, cancelling any running spin or confetti animation.
#[wasm_bindgen]
pub fn stop_roulette() {
    web::stop_roulette_mode();
}
