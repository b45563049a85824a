/// Tab Grouper - browser extension that sorts tabs by URL and splits
/// domain groups into their own windows
/// Built with Rust + WASM + Yew

pub mod compare;
pub mod grouping;
pub mod host;
pub mod menu;
pub mod operations;
pub mod storage;
pub mod tab_data;
pub mod uri;
mod background;
mod extension;
pub mod ui;

use extension::{ChromeApi, FirefoxApi, Namespace};
use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Pick the extension namespace once and register the background listeners
#[wasm_bindgen]
pub fn start_background() -> Result<(), JsValue> {
    let namespace = extension::detect_namespace().map_err(|e| JsValue::from_str(&e.to_string()))?;
    log::info!("using {:?} extension namespace", namespace);

    match namespace {
        Namespace::Browser => background::Background::install(FirefoxApi),
        Namespace::Chrome => background::Background::install(ChromeApi),
    }
    Ok(())
}

// Start the Yew app for the options page
#[wasm_bindgen]
pub fn start_options() {
    yew::Renderer::<ui::options::OptionsPage>::new().render();
}

// Re-export the comparator for JavaScript access: -1, 0 or 1
#[wasm_bindgen]
pub fn compare_urls(a: &str, b: &str) -> i32 {
    compare::compare_uris(a, b) as i32
}

// Host with `www` prefix stripped and case folded, if the URL has one
#[wasm_bindgen]
pub fn naked_host(url: &str) -> Option<String> {
    uri::reference_host(url).ok()
}
