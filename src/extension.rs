/// WebExtension API adapters for the `browser.*` and `chrome.*` namespaces
use crate::host::{
    CreateWindow, HostError, MoveProperties, PreferenceStore, TabInventory, TabMover, TabQuery,
    WindowInfo,
};
use crate::menu::MenuItem;
use crate::storage::Preferences;
use crate::tab_data::{Tab, TabId, WindowId};
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

mod firefox {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(catch, js_namespace = ["browser", "tabs"], js_name = query)]
        pub async fn tabs_query(query: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["browser", "tabs"], js_name = "move")]
        pub async fn tabs_move(tab_id: i32, properties: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["browser", "windows"], js_name = create)]
        pub async fn windows_create(properties: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["browser", "storage", "sync"], js_name = get)]
        pub async fn storage_get(keys: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["browser", "storage", "sync"], js_name = set)]
        pub async fn storage_set(items: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["browser", "menus"], js_name = removeAll)]
        pub async fn menus_remove_all() -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["browser", "menus"], js_name = create)]
        pub fn menus_create(properties: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["browser", "menus"], js_name = refresh)]
        pub async fn menus_refresh() -> Result<JsValue, JsValue>;

        #[wasm_bindgen(js_namespace = ["browser", "browserAction", "onClicked"], js_name = addListener)]
        pub fn on_action_clicked(listener: &Closure<dyn FnMut(JsValue)>);

        #[wasm_bindgen(js_namespace = ["browser", "menus", "onShown"], js_name = addListener)]
        pub fn on_menu_shown(listener: &Closure<dyn FnMut(JsValue, JsValue)>);

        #[wasm_bindgen(js_namespace = ["browser", "menus", "onClicked"], js_name = addListener)]
        pub fn on_menu_clicked(listener: &Closure<dyn FnMut(JsValue, JsValue)>);
    }
}

mod chrome {
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = query)]
        pub async fn tabs_query(query: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = get)]
        pub async fn tabs_get(tab_id: i32) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = "move")]
        pub async fn tabs_move(tab_id: i32, properties: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = create)]
        pub async fn windows_create(properties: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = get)]
        pub async fn storage_get(keys: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "sync"], js_name = set)]
        pub async fn storage_set(items: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["chrome", "contextMenus"], js_name = removeAll)]
        pub async fn menus_remove_all() -> Result<JsValue, JsValue>;

        #[wasm_bindgen(catch, js_namespace = ["chrome", "contextMenus"], js_name = create)]
        pub fn menus_create(properties: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(js_namespace = ["chrome", "action", "onClicked"], js_name = addListener)]
        pub fn on_action_clicked(listener: &Closure<dyn FnMut(JsValue)>);

        #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onActivated"], js_name = addListener)]
        pub fn on_tab_activated(listener: &Closure<dyn FnMut(JsValue)>);

        #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onUpdated"], js_name = addListener)]
        pub fn on_tab_updated(listener: &Closure<dyn FnMut(JsValue, JsValue, JsValue)>);

        #[wasm_bindgen(js_namespace = ["chrome", "contextMenus", "onClicked"], js_name = addListener)]
        pub fn on_menu_clicked(listener: &Closure<dyn FnMut(JsValue, JsValue)>);
    }
}

/// Chrome has no tab-strip menu context; offer the menu on the page and
/// the toolbar button instead.
const CHROME_CONTEXTS: &[&str] = &["page", "action"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Browser,
    Chrome,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClickInfo {
    menu_item_id: String,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveInfo {
    tab_id: TabId,
}

#[derive(serde::Deserialize)]
struct ChangeInfo {
    #[serde(default)]
    url: Option<String>,
}

#[derive(serde::Deserialize)]
struct ActiveFlag {
    #[serde(default)]
    active: bool,
}

fn to_js<T: Serialize + ?Sized>(what: &'static str, value: &T) -> Result<JsValue, HostError> {
    serde_wasm_bindgen::to_value(value).map_err(|e| HostError::Convert {
        what,
        message: e.to_string(),
    })
}

fn from_js<T: DeserializeOwned>(what: &'static str, value: JsValue) -> Result<T, HostError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| HostError::Convert {
        what,
        message: e.to_string(),
    })
}

fn call_failed(operation: &'static str) -> impl FnOnce(JsValue) -> HostError {
    move |e| HostError::Call {
        operation,
        message: format!("{:?}", e),
    }
}

/// Whether `globalThis[name].tabs` is an object.
fn has_tabs_api(global: &JsValue, name: &str) -> bool {
    js_sys::Reflect::get(global, &JsValue::from_str(name))
        .ok()
        .filter(JsValue::is_object)
        .and_then(|namespace| js_sys::Reflect::get(&namespace, &JsValue::from_str("tabs")).ok())
        .is_some_and(|tabs| tabs.is_object())
}

/// Prefer `browser.*` when present, fall back to `chrome.*`.
///
/// Firefox exposes the promise-based `browser.*` namespace with `menus` and
/// `browserAction`; Chrome exposes `chrome.*` with `contextMenus` and
/// `action`. The namespace is picked once for the lifetime of the script.
pub fn detect_namespace() -> Result<Namespace, HostError> {
    let global: JsValue = js_sys::global().into();
    if has_tabs_api(&global, "browser") {
        Ok(Namespace::Browser)
    } else if has_tabs_api(&global, "chrome") {
        Ok(Namespace::Chrome)
    } else {
        Err(HostError::Unavailable)
    }
}

/// Menu and event surface of an extension namespace, on top of the tab
/// capabilities.
#[allow(async_fn_in_trait)]
pub trait ExtensionApi: TabInventory + TabMover + PreferenceStore + 'static {
    async fn reset_menu(&self) -> Result<(), HostError>;

    fn create_menu_item(&self, item: &MenuItem) -> Result<(), HostError>;

    /// Redraw a menu that is already open.
    async fn refresh_menu(&self) -> Result<(), HostError>;

    fn on_toolbar_clicked(&self, handler: Rc<dyn Fn()>);

    /// Called with the tab the menu is about to be shown for.
    fn on_menu_context(&self, handler: Rc<dyn Fn(Tab)>);

    /// Called with the id of the chosen menu item.
    fn on_menu_clicked(&self, handler: Rc<dyn Fn(String)>);
}

macro_rules! tab_capabilities {
    ($adapter:ty, $api:ident) => {
        impl TabInventory for $adapter {
            async fn query_tabs(&self, query: &TabQuery) -> Result<Vec<Tab>, HostError> {
                let tabs = $api::tabs_query(to_js("tab query", query)?)
                    .await
                    .map_err(call_failed("tabs.query"))?;
                from_js("tabs", tabs)
            }
        }

        impl TabMover for $adapter {
            async fn move_tab(&self, tab_id: TabId, to: MoveProperties) -> Result<(), HostError> {
                $api::tabs_move(tab_id, to_js("move properties", &to)?)
                    .await
                    .map_err(call_failed("tabs.move"))?;
                Ok(())
            }

            async fn create_window(&self, seed: TabId) -> Result<WindowId, HostError> {
                let properties = to_js("window properties", &CreateWindow { tab_id: seed })?;
                let window = $api::windows_create(properties)
                    .await
                    .map_err(call_failed("windows.create"))?;
                let window: WindowInfo = from_js("window", window)?;
                Ok(window.id)
            }
        }

        impl PreferenceStore for $adapter {
            async fn load_preferences(&self) -> Result<Preferences, HostError> {
                let stored = $api::storage_get(to_js("storage keys", &Preferences::keys())?)
                    .await
                    .map_err(call_failed("storage.sync.get"))?;
                from_js("preferences", stored)
            }

            async fn save_preferences(&self, preferences: &Preferences) -> Result<(), HostError> {
                $api::storage_set(to_js("preferences", preferences)?)
                    .await
                    .map_err(call_failed("storage.sync.set"))?;
                Ok(())
            }
        }
    };
}

/// The `browser.*` namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirefoxApi;

tab_capabilities!(FirefoxApi, firefox);

impl ExtensionApi for FirefoxApi {
    async fn reset_menu(&self) -> Result<(), HostError> {
        firefox::menus_remove_all()
            .await
            .map_err(call_failed("menus.removeAll"))?;
        Ok(())
    }

    fn create_menu_item(&self, item: &MenuItem) -> Result<(), HostError> {
        firefox::menus_create(to_js("menu item", item)?).map_err(call_failed("menus.create"))?;
        Ok(())
    }

    async fn refresh_menu(&self) -> Result<(), HostError> {
        firefox::menus_refresh()
            .await
            .map_err(call_failed("menus.refresh"))?;
        Ok(())
    }

    fn on_toolbar_clicked(&self, handler: Rc<dyn Fn()>) {
        let listener = Closure::<dyn FnMut(JsValue)>::new(move |_tab: JsValue| handler());
        firefox::on_action_clicked(&listener);
        listener.forget();
    }

    fn on_menu_context(&self, handler: Rc<dyn Fn(Tab)>) {
        let listener = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |_info: JsValue, tab: JsValue| {
            match from_js::<Tab>("tab", tab) {
                Ok(tab) => handler(tab),
                Err(e) => warn!("menu shown without a tab: {}", e),
            }
        });
        firefox::on_menu_shown(&listener);
        listener.forget();
    }

    fn on_menu_clicked(&self, handler: Rc<dyn Fn(String)>) {
        let listener = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |info: JsValue, _tab: JsValue| {
            match from_js::<ClickInfo>("menu click", info) {
                Ok(info) => handler(info.menu_item_id),
                Err(e) => warn!("ignoring menu click: {}", e),
            }
        });
        firefox::on_menu_clicked(&listener);
        listener.forget();
    }
}

/// The `chrome.*` namespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeApi;

tab_capabilities!(ChromeApi, chrome);

impl ExtensionApi for ChromeApi {
    async fn reset_menu(&self) -> Result<(), HostError> {
        chrome::menus_remove_all()
            .await
            .map_err(call_failed("contextMenus.removeAll"))?;
        Ok(())
    }

    fn create_menu_item(&self, item: &MenuItem) -> Result<(), HostError> {
        let item = MenuItem {
            contexts: CHROME_CONTEXTS,
            ..item.clone()
        };
        chrome::menus_create(to_js("menu item", &item)?)
            .map_err(call_failed("contextMenus.create"))?;
        Ok(())
    }

    // Chrome builds the menu ahead of time, there is nothing to redraw.
    async fn refresh_menu(&self) -> Result<(), HostError> {
        Ok(())
    }

    fn on_toolbar_clicked(&self, handler: Rc<dyn Fn()>) {
        let listener = Closure::<dyn FnMut(JsValue)>::new(move |_tab: JsValue| handler());
        chrome::on_action_clicked(&listener);
        listener.forget();
    }

    /// Chrome has no `onShown`: rebuild whenever the active tab changes
    /// or navigates.
    fn on_menu_context(&self, handler: Rc<dyn Fn(Tab)>) {
        let on_activated = Rc::clone(&handler);
        let activated = Closure::<dyn FnMut(JsValue)>::new(move |info: JsValue| {
            let handler = Rc::clone(&on_activated);
            spawn_local(async move {
                match activated_tab(info).await {
                    Ok(tab) => handler(tab),
                    Err(e) => warn!("cannot rebuild menu for activated tab: {}", e),
                }
            });
        });
        chrome::on_tab_activated(&activated);
        activated.forget();

        let updated = Closure::<dyn FnMut(JsValue, JsValue, JsValue)>::new(
            move |_tab_id: JsValue, change: JsValue, tab: JsValue| {
                let navigated = from_js::<ChangeInfo>("change info", change)
                    .is_ok_and(|change| change.url.is_some());
                let active = from_js::<ActiveFlag>("tab", tab.clone()).is_ok_and(|flag| flag.active);
                if !(navigated && active) {
                    return;
                }
                match from_js::<Tab>("tab", tab) {
                    Ok(tab) => handler(tab),
                    Err(e) => warn!("cannot rebuild menu for updated tab: {}", e),
                }
            },
        );
        chrome::on_tab_updated(&updated);
        updated.forget();
    }

    fn on_menu_clicked(&self, handler: Rc<dyn Fn(String)>) {
        let listener = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |info: JsValue, _tab: JsValue| {
            match from_js::<ClickInfo>("menu click", info) {
                Ok(info) => handler(info.menu_item_id),
                Err(e) => warn!("ignoring menu click: {}", e),
            }
        });
        chrome::on_menu_clicked(&listener);
        listener.forget();
    }
}

async fn activated_tab(info: JsValue) -> Result<Tab, HostError> {
    let info: ActiveInfo = from_js("activation", info)?;
    let tab = chrome::tabs_get(info.tab_id)
        .await
        .map_err(call_failed("tabs.get"))?;
    from_js("tab", tab)
}

pub async fn load_preferences() -> Result<Preferences, HostError> {
    match detect_namespace()? {
        Namespace::Browser => FirefoxApi.load_preferences().await,
        Namespace::Chrome => ChromeApi.load_preferences().await,
    }
}

pub async fn save_preferences(preferences: &Preferences) -> Result<(), HostError> {
    match detect_namespace()? {
        Namespace::Browser => FirefoxApi.save_preferences(preferences).await,
        Namespace::Chrome => ChromeApi.save_preferences(preferences).await,
    }
}
