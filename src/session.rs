//! One page lifetime of the converter.
//!
//! A [`Session`] owns the engine and watcher state behind a shared cell so the
//! mutation callback, the debounce timer and the preference listener can all
//! reach it from the single UI thread. A preference change tears the session
//! down and reloads the page instead of reconciling state in place.

use crate::config::Config;
use crate::engine::{ConversionEngine, Page, ProcessedSet, ScanReport};
use crate::error::PlatformResult;
use crate::watcher::{AddedNode, MutationRecord, MutationWatcher, Scheduler, WatchState};
use log::{debug, info, warn};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Key/value store holding the on/off preference.
#[allow(async_fn_in_trait)]
pub trait PreferenceStore {
    /// `Ok(None)` when the key was never written.
    async fn enabled(&self, key: &str) -> PlatformResult<Option<bool>>;
}

/// Restarts the current page.
pub trait Reloader {
    fn reload(&self) -> PlatformResult<()>;
}

/// One entry of a storage change notification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceChange {
    pub old_value: Option<bool>,
    pub new_value: Option<bool>,
}

/// Reads the preference; a missing key or an unreadable store means enabled.
pub async fn read_enabled<St: PreferenceStore>(store: &St, key: &str) -> bool {
    match store.enabled(key).await {
        Ok(Some(enabled)) => enabled,
        Ok(None) => true,
        Err(err) => {
            warn!("could not read `{key}`, assuming enabled: {err}");
            true
        }
    }
}

struct SessionState<P, S: Scheduler, M> {
    page: P,
    scheduler: S,
    engine: ConversionEngine<M>,
    watcher: MutationWatcher<S::Timer>,
}

pub struct Session<P, S: Scheduler, M> {
    enabled_key: Rc<str>,
    state: Rc<RefCell<Option<SessionState<P, S, M>>>>,
}

impl<P, S: Scheduler, M> Clone for Session<P, S, M> {
    fn clone(&self) -> Self {
        Self {
            enabled_key: self.enabled_key.clone(),
            state: self.state.clone(),
        }
    }
}

impl<P, S, M> Session<P, S, M>
where
    P: Page + 'static,
    S: Scheduler + 'static,
    S::Timer: 'static,
    M: ProcessedSet<P::Line> + 'static,
{
    pub fn new(config: &Config, page: P, scheduler: S, processed: M, enabled: bool) -> Self {
        Self {
            enabled_key: Rc::from(config.enabled_key.as_str()),
            state: Rc::new(RefCell::new(Some(SessionState {
                page,
                scheduler,
                engine: ConversionEngine::new(config, enabled, processed),
                watcher: MutationWatcher::new(config),
            }))),
        }
    }

    /// Reads the preference, builds the session and runs the first full scan.
    pub async fn activate<St: PreferenceStore>(
        config: &Config,
        store: &St,
        page: P,
        scheduler: S,
        processed: M,
    ) -> Self {
        let enabled = read_enabled(store, &config.enabled_key).await;
        info!("activating (enabled: {enabled})");
        let session = Self::new(config, page, scheduler, processed, enabled);
        session.scan();
        session
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.state
            .borrow()
            .as_ref()
            .is_some_and(|state| state.engine.is_enabled())
    }

    /// `None` once torn down.
    pub fn watch_state(&self) -> Option<WatchState> {
        self.state.borrow().as_ref().map(|state| state.watcher.state())
    }

    /// Full scan of the current candidate set.
    pub fn scan(&self) -> ScanReport {
        let mut guard = self.state.borrow_mut();
        let Some(state) = guard.as_mut() else {
            return ScanReport::default();
        };
        state.engine.scan(&state.page)
    }

    /// Handles one observer batch. Returns whether a scan is now scheduled
    /// because of it.
    pub fn on_mutations<N: AddedNode>(&self, records: &[MutationRecord<N>]) -> PlatformResult<bool> {
        let mut guard = self.state.borrow_mut();
        let Some(state) = guard.as_mut() else {
            return Ok(false);
        };
        if !state.engine.is_enabled() || !state.watcher.qualifies(records) {
            return Ok(false);
        }

        let weak = Rc::downgrade(&self.state);
        let enabled_key = self.enabled_key.clone();
        let task = Box::new(move || {
            if let Some(state) = weak.upgrade() {
                Self { enabled_key, state }.fire();
            }
        });
        state.watcher.arm(&state.scheduler, task)?;
        Ok(true)
    }

    fn fire(&self) -> ScanReport {
        let mut guard = self.state.borrow_mut();
        let Some(state) = guard.as_mut() else {
            return ScanReport::default();
        };
        state.watcher.fired();
        let report = state.engine.scan(&state.page);
        debug!(
            "debounced scan: {} candidates, {} converted",
            report.candidates, report.converted
        );
        report
    }

    /// Handles a storage change notification. Only a change of the enabled
    /// key matters; it tears the session down and reloads the page.
    pub fn on_storage_changed<R: Reloader>(
        &self,
        changes: &HashMap<String, PreferenceChange>,
        reloader: &R,
    ) -> PlatformResult<bool> {
        let Some(change) = changes.get(&*self.enabled_key) else {
            return Ok(false);
        };
        self.on_preference_change(*change, reloader)?;
        Ok(true)
    }

    pub fn on_preference_change<R: Reloader>(
        &self,
        change: PreferenceChange,
        reloader: &R,
    ) -> PlatformResult<()> {
        info!(
            "preference changed ({:?} -> {:?}), reloading",
            change.old_value, change.new_value
        );
        self.teardown();
        reloader.reload()
    }

    /// Cancels any pending scan and drops all engine state.
    pub fn teardown(&self) {
        let taken = self.state.borrow_mut().take();
        if let Some(mut state) = taken {
            state.watcher.disarm(&state.scheduler);
        }
    }
}
