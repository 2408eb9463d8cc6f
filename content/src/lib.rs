//! Content script entry point: boots a session on GitHub pages.

#[cfg(target_arch = "wasm32")]
mod entry {
    use leptos::task::spawn_local;
    use log::{debug, error, warn};
    use unicoder::error::{PlatformError, PlatformResult};
    use unicoder::web::{
        observe_subtree, on_storage_changed, ChromeStorage, LocationReloader, TimerScheduler,
        WeakElementSet, WebPage, WebSession,
    };
    use unicoder::{logging, Config};
    use wasm_bindgen::prelude::*;

    async fn run(config: Config) -> PlatformResult<WebSession> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or(PlatformError::MissingGlobal("document"))?;
        let body = document
            .body()
            .ok_or(PlatformError::MissingGlobal("document.body"))?;

        let session = WebSession::activate(
            &config,
            &ChromeStorage,
            WebPage::new(document),
            TimerScheduler,
            WeakElementSet::default(),
        )
        .await;

        let watched = session.clone();
        observe_subtree(&body, move |records| {
            if let Err(err) = watched.on_mutations(&records) {
                warn!("could not schedule scan: {err}");
            }
        })?;

        let listening = session.clone();
        on_storage_changed(move |changes| {
            if let Err(err) = listening.on_storage_changed(&changes, &LocationReloader) {
                error!("reload failed: {err}");
            }
        });

        Ok(session)
    }

    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        let config = Config::default();
        logging::init(config.log_level);

        let hostname = web_sys::window()
            .and_then(|window| window.location().hostname().ok())
            .unwrap_or_default();
        if !config.is_target_host(&hostname) {
            debug!("not running on `{hostname}`");
            return;
        }

        spawn_local(async move {
            if let Err(err) = run(config).await {
                error!("activation failed: {err}");
            }
        });
    }
}
