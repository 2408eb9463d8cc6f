//! Debounced reaction to subtree insertions.
//!
//! The watcher never scans by itself. It decides whether a batch of mutation
//! records deserves a scan and keeps at most one timer armed; the session runs
//! the scan when that timer fires.

use crate::config::Config;
use crate::error::PlatformResult;
use std::time::Duration;

/// Nodes added by a single mutation record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord<N> {
    pub added: Vec<N>,
}

impl<N> MutationRecord<N> {
    pub fn added(nodes: Vec<N>) -> Self {
        Self { added: nodes }
    }
}

/// A node reported as inserted into the observed subtree.
pub trait AddedNode {
    /// True when the node is an element that matches `selector` or has a
    /// descendant that does. Text and comment nodes never match.
    fn contains_candidate(&self, selector: &str) -> bool;
}

/// Deferred callbacks, e.g. `setTimeout`.
pub trait Scheduler {
    type Timer;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> PlatformResult<Self::Timer>;
    fn cancel(&self, timer: Self::Timer);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    ScanPending,
}

pub struct MutationWatcher<T> {
    selector: String,
    delay: Duration,
    pending: Option<T>,
}

impl<T> MutationWatcher<T> {
    pub fn new(config: &Config) -> Self {
        Self {
            selector: config.candidate_selector(),
            delay: config.debounce,
            pending: None,
        }
    }

    pub fn state(&self) -> WatchState {
        if self.pending.is_some() {
            WatchState::ScanPending
        } else {
            WatchState::Idle
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether any record in the batch inserted a candidate line.
    pub fn qualifies<N: AddedNode>(&self, records: &[MutationRecord<N>]) -> bool {
        records
            .iter()
            .flat_map(|record| record.added.iter())
            .any(|node| node.contains_candidate(&self.selector))
    }

    /// Arms the debounce timer, replacing one that has not fired yet. If the
    /// new timer cannot be scheduled the pending one stays armed.
    pub fn arm<S>(&mut self, scheduler: &S, task: Box<dyn FnOnce()>) -> PlatformResult<()>
    where
        S: Scheduler<Timer = T>,
    {
        let timer = scheduler.schedule(self.delay, task)?;
        if let Some(previous) = self.pending.replace(timer) {
            scheduler.cancel(previous);
        }
        Ok(())
    }

    /// Marks the pending timer as fired.
    pub fn fired(&mut self) {
        self.pending = None;
    }

    pub fn disarm<S>(&mut self, scheduler: &S)
    where
        S: Scheduler<Timer = T>,
    {
        if let Some(timer) = self.pending.take() {
            scheduler.cancel(timer);
        }
    }
}
