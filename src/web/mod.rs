//! Browser bindings for the extension.

use crate::error::{PlatformError, PlatformResult};
use crate::session::{PreferenceChange, PreferenceStore, Reloader};
use js_sys::{Array, Object, Reflect};
use log::debug;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[cfg(feature = "dom")]
mod dom;

#[cfg(feature = "dom")]
pub use dom::{observe_subtree, TimerScheduler, WeakElementSet, WebPage, WebSession};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = get, catch)]
    async fn storage_sync_get(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "storage", "onChanged"], js_name = addListener)]
    fn add_storage_listener(listener: &Closure<dyn FnMut(JsValue, JsValue)>);
}

/// `chrome.storage.sync`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChromeStorage;

impl PreferenceStore for ChromeStorage {
    async fn enabled(&self, key: &str) -> PlatformResult<Option<bool>> {
        let keys = Array::of1(&JsValue::from_str(key));
        let stored = storage_sync_get(keys.into())
            .await
            .map_err(|err| PlatformError::from_js_value("chrome.storage.sync.get", &err))?;
        let value = Reflect::get(&stored, &JsValue::from_str(key))
            .map_err(|err| PlatformError::from_js_value("chrome.storage.sync.get", &err))?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        value
            .as_bool()
            .map(Some)
            .ok_or_else(|| PlatformError::Preference(format!("`{key}` is not a boolean")))
    }
}

/// Reads a `chrome.storage.onChanged` payload. A key whose change cannot be
/// read is still reported, with both values unknown.
pub fn parse_changes(changes: &JsValue) -> HashMap<String, PreferenceChange> {
    let Some(changes) = changes.dyn_ref::<Object>() else {
        return HashMap::new();
    };
    Object::entries(changes)
        .iter()
        .filter_map(|entry| {
            let entry = entry.dyn_into::<Array>().ok()?;
            let key = entry.get(0).as_string()?;
            let change = serde_wasm_bindgen::from_value::<PreferenceChange>(entry.get(1))
                .unwrap_or_else(|err| {
                    debug!("unreadable change of `{key}`: {err}");
                    PreferenceChange::default()
                });
            Some((key, change))
        })
        .collect()
}

/// Subscribes to `chrome.storage.onChanged` for the lifetime of the page.
pub fn on_storage_changed<F>(mut listener: F)
where
    F: FnMut(HashMap<String, PreferenceChange>) + 'static,
{
    let closure = Closure::<dyn FnMut(JsValue, JsValue)>::new(move |changes: JsValue, _area: JsValue| {
        listener(parse_changes(&changes));
    });
    add_storage_listener(&closure);
    closure.forget();
}

/// `window.location.reload()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocationReloader;

impl Reloader for LocationReloader {
    fn reload(&self) -> PlatformResult<()> {
        web_sys::window()
            .ok_or(PlatformError::MissingGlobal("window"))?
            .location()
            .reload()
            .map_err(|err| PlatformError::from_js_value("location.reload", &err))
    }
}
