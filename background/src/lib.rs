//! Background worker: sets the default preference on install, flips it when
//! the toolbar icon is clicked and keeps the icon in sync with it.

use serde::{Deserialize, Serialize};
use unicoder::config::TARGET_HOST;

pub const ICON_ENABLED: &str = "icons/icon128.png";
pub const ICON_DISABLED: &str = "icons/icon128_d.png";

/// The subset of `chrome.tabs.Tab` the worker reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Tab {
    pub id: Option<i32>,
    pub url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TabChange {
    pub status: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StoredPreference {
    #[serde(rename = "unicoderEnabled")]
    pub enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IconPath {
    #[serde(rename = "128")]
    pub size_128: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IconDetails {
    pub tab_id: i32,
    pub path: IconPath,
}

pub fn is_hosted_url(url: Option<&str>) -> bool {
    url.is_some_and(|url| url.contains(TARGET_HOST))
}

/// New value after a toolbar click; an unset preference counts as enabled.
pub fn toggled(stored: Option<bool>) -> bool {
    !stored.unwrap_or(true)
}

pub fn icon_path(enabled: bool) -> &'static str {
    if enabled {
        ICON_ENABLED
    } else {
        ICON_DISABLED
    }
}

pub fn icon_details(tab_id: i32, enabled: bool) -> IconDetails {
    IconDetails {
        tab_id,
        path: IconPath {
            size_128: icon_path(enabled),
        },
    }
}

/// Icons are refreshed once a hosted tab finishes loading.
pub fn should_refresh_icon(change: &TabChange, tab: &Tab) -> bool {
    change.status.as_deref() == Some("complete") && is_hosted_url(tab.url.as_deref())
}

#[cfg(target_arch = "wasm32")]
mod worker {
    use super::*;
    use log::{error, info};
    use unicoder::config::ENABLED_KEY;
    use unicoder::error::{PlatformError, PlatformResult};
    use unicoder::session::read_enabled;
    use unicoder::web::ChromeStorage;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::spawn_local;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onInstalled"], js_name = addListener)]
        fn on_installed(listener: &Closure<dyn FnMut(JsValue)>);

        #[wasm_bindgen(js_namespace = ["chrome", "action", "onClicked"], js_name = addListener)]
        fn on_action_clicked(listener: &Closure<dyn FnMut(JsValue)>);

        #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onUpdated"], js_name = addListener)]
        fn on_tab_updated(listener: &Closure<dyn FnMut(i32, JsValue, JsValue)>);

        #[wasm_bindgen(js_namespace = ["chrome", "storage", "sync"], js_name = set, catch)]
        async fn storage_sync_set(items: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(js_namespace = ["chrome", "action"], js_name = setIcon, catch)]
        async fn action_set_icon(details: JsValue) -> Result<JsValue, JsValue>;

        #[wasm_bindgen(js_namespace = ["chrome", "tabs"], js_name = reload, catch)]
        async fn tabs_reload(tab_id: i32) -> Result<JsValue, JsValue>;
    }

    fn to_js<T: Serialize>(value: &T) -> PlatformResult<JsValue> {
        serde_wasm_bindgen::to_value(value).map_err(|err| PlatformError::Preference(err.to_string()))
    }

    async fn store_enabled(enabled: bool) -> PlatformResult<()> {
        storage_sync_set(to_js(&StoredPreference { enabled })?)
            .await
            .map_err(|err| PlatformError::from_js_value("chrome.storage.sync.set", &err))?;
        Ok(())
    }

    async fn update_icon(tab_id: i32, enabled: bool) -> PlatformResult<()> {
        action_set_icon(to_js(&icon_details(tab_id, enabled))?)
            .await
            .map_err(|err| PlatformError::from_js_value("chrome.action.setIcon", &err))?;
        Ok(())
    }

    async fn toggle(tab: Tab) -> PlatformResult<()> {
        let Some(tab_id) = tab.id else {
            return Ok(());
        };
        if !is_hosted_url(tab.url.as_deref()) {
            return Ok(());
        }
        let enabled = toggled(Some(read_enabled(&ChromeStorage, ENABLED_KEY).await));
        store_enabled(enabled).await?;
        update_icon(tab_id, enabled).await?;
        info!("toggled to {enabled}, reloading tab {tab_id}");
        tabs_reload(tab_id)
            .await
            .map_err(|err| PlatformError::from_js_value("chrome.tabs.reload", &err))?;
        Ok(())
    }

    async fn refresh_icon(tab_id: i32) -> PlatformResult<()> {
        let enabled = read_enabled(&ChromeStorage, ENABLED_KEY).await;
        update_icon(tab_id, enabled).await
    }

    fn report(result: PlatformResult<()>) {
        if let Err(err) = result {
            error!("{err}");
        }
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        unicoder::logging::init(unicoder::Config::default().log_level);

        let installed = Closure::<dyn FnMut(JsValue)>::new(|_details: JsValue| {
            spawn_local(async { report(store_enabled(true).await) });
        });
        on_installed(&installed);
        installed.forget();

        let clicked = Closure::<dyn FnMut(JsValue)>::new(|tab: JsValue| {
            match serde_wasm_bindgen::from_value::<Tab>(tab) {
                Ok(tab) => spawn_local(async move { report(toggle(tab).await) }),
                Err(err) => error!("unexpected tab payload: {err}"),
            }
        });
        on_action_clicked(&clicked);
        clicked.forget();

        let updated = Closure::<dyn FnMut(i32, JsValue, JsValue)>::new(
            |tab_id: i32, change: JsValue, tab: JsValue| {
                let change = serde_wasm_bindgen::from_value::<TabChange>(change).unwrap_or_default();
                let tab = serde_wasm_bindgen::from_value::<Tab>(tab).unwrap_or_default();
                if should_refresh_icon(&change, &tab) {
                    spawn_local(async move { report(refresh_icon(tab_id).await) });
                }
            },
        );
        on_tab_updated(&updated);
        updated.forget();
    }
}
