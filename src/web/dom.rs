//! Page bindings: code lines, the processed set, timers and the body observer.

use crate::engine::{CodeLine, Page, ProcessedSet};
use crate::error::{PlatformError, PlatformResult};
use crate::session::Session;
use crate::watcher::{AddedNode, MutationRecord, Scheduler};
use js_sys::{Array, Object, WeakSet};
use leptos::prelude::{set_timeout_with_handle, TimeoutHandle};
use log::warn;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, MutationObserver, MutationObserverInit, Node};

pub type WebSession = Session<WebPage, TimerScheduler, WeakElementSet>;

pub struct WebPage {
    document: Document,
}

impl WebPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl Page for WebPage {
    type Line = Element;

    fn query_lines(&self, selector: &str) -> Vec<Element> {
        let list = match self.document.query_selector_all(selector) {
            Ok(list) => list,
            Err(err) => {
                warn!("{}", PlatformError::from_js_value("querySelectorAll", &err));
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|idx| list.get(idx))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }
}

impl CodeLine for Element {
    fn text(&self) -> Option<String> {
        self.text_content()
    }

    fn replace_text(&self, text: &str) {
        self.set_text_content(Some(text));
    }

    fn add_class(&self, class: &str) {
        if let Err(err) = self.class_list().add_1(class) {
            warn!("{}", PlatformError::from_js_value("classList.add", &err));
        }
    }
}

/// Converted elements, held weakly so removed lines can be collected.
pub struct WeakElementSet(WeakSet);

impl Default for WeakElementSet {
    fn default() -> Self {
        Self(WeakSet::new())
    }
}

impl ProcessedSet<Element> for WeakElementSet {
    fn contains(&self, line: &Element) -> bool {
        self.0.has(line.unchecked_ref::<Object>())
    }

    fn insert(&mut self, line: &Element) {
        self.0.add(line.unchecked_ref::<Object>());
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TimerScheduler;

impl Scheduler for TimerScheduler {
    type Timer = TimeoutHandle;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> PlatformResult<TimeoutHandle> {
        set_timeout_with_handle(task, delay)
            .map_err(|err| PlatformError::from_js_value("setTimeout", &err))
    }

    fn cancel(&self, timer: TimeoutHandle) {
        timer.clear();
    }
}

impl AddedNode for Node {
    fn contains_candidate(&self, selector: &str) -> bool {
        if self.node_type() != Node::ELEMENT_NODE {
            return false;
        }
        let Some(element) = self.dyn_ref::<Element>() else {
            return false;
        };
        element.matches(selector).unwrap_or(false)
            || element.query_selector(selector).ok().flatten().is_some()
    }
}

fn collect_records(batch: &Array) -> Vec<MutationRecord<Node>> {
    batch
        .iter()
        .filter_map(|value| value.dyn_into::<web_sys::MutationRecord>().ok())
        .filter(|record| record.type_() == "childList")
        .map(|record| {
            let added = record.added_nodes();
            MutationRecord::added((0..added.length()).filter_map(|idx| added.get(idx)).collect())
        })
        .filter(|record| !record.added.is_empty())
        .collect()
}

/// Observes every insertion below `root` for the lifetime of the page.
pub fn observe_subtree<F>(root: &HtmlElement, mut on_batch: F) -> PlatformResult<MutationObserver>
where
    F: FnMut(Vec<MutationRecord<Node>>) + 'static,
{
    let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(
        move |batch: Array, _observer: MutationObserver| {
            let records = collect_records(&batch);
            if !records.is_empty() {
                on_batch(records);
            }
        },
    );
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
        .map_err(|err| PlatformError::from_js_value("MutationObserver", &err))?;

    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer
        .observe_with_options(root, &options)
        .map_err(|err| PlatformError::from_js_value("MutationObserver.observe", &err))?;

    // No detach path: the observer lives until the page unloads.
    callback.forget();
    Ok(observer)
}
