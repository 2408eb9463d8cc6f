//! In-memory stand-ins for the browser used by unit tests.

use crate::engine::{CodeLine, Page};
use crate::error::{PlatformError, PlatformResult};
use crate::session::{PreferenceStore, Reloader};
use crate::watcher::{AddedNode, Scheduler};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::cell::{Cell, RefCell};
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Once;
use std::time::Duration;

thread_local! {
    static CAPTURED: RefCell<Option<Vec<(Level, String)>>> = const { RefCell::new(None) };
}

/// Records log lines emitted on the thread that is currently capturing.
struct CaptureLogger;

static CAPTURE_LOGGER: CaptureLogger = CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|captured| {
            if let Some(lines) = captured.borrow_mut().as_mut() {
                lines.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

/// Runs `f` and returns what it logged, with levels.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<(Level, String)>) {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let _ = log::set_logger(&CAPTURE_LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });
    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
    let out = f();
    let lines = CAPTURED
        .with(|captured| captured.borrow_mut().take())
        .unwrap_or_default();
    (out, lines)
}

/// Class names named by a selector list such as `.a, .b`.
fn selector_classes(selector: &str) -> Vec<&str> {
    selector
        .split(',')
        .filter_map(|part| part.trim().strip_prefix('.'))
        .collect()
}

#[derive(Debug, Default)]
struct LineState {
    text: Option<String>,
    markup: Option<String>,
    classes: Vec<String>,
    writes: usize,
}

#[derive(Clone, Debug)]
pub struct FakeLine {
    id: usize,
    state: Rc<RefCell<LineState>>,
}

impl PartialEq for FakeLine {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FakeLine {}

impl Hash for FakeLine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl FakeLine {
    pub fn current_text(&self) -> Option<String> {
        self.state.borrow().text.clone()
    }

    pub fn set_text_externally(&self, text: &str) {
        self.state.borrow_mut().text = Some(text.to_string());
    }

    pub fn set_markup(&self, markup: &str) {
        self.state.borrow_mut().markup = Some(markup.to_string());
    }

    pub fn markup(&self) -> Option<String> {
        self.state.borrow().markup.clone()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.state.borrow().classes.iter().any(|c| c == class)
    }

    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }

    fn matches(&self, selector: &str) -> bool {
        let classes = selector_classes(selector);
        self.state
            .borrow()
            .classes
            .iter()
            .any(|c| classes.contains(&c.as_str()))
    }
}

impl CodeLine for FakeLine {
    fn text(&self) -> Option<String> {
        self.current_text()
    }

    fn replace_text(&self, text: &str) {
        let mut state = self.state.borrow_mut();
        state.text = Some(text.to_string());
        state.markup = None;
        state.writes += 1;
    }

    fn add_class(&self, class: &str) {
        let mut state = self.state.borrow_mut();
        if !state.classes.iter().any(|c| c == class) {
            state.classes.push(class.to_string());
        }
    }
}

#[derive(Default)]
pub struct FakePage {
    lines: RefCell<Vec<FakeLine>>,
    queries: Cell<usize>,
}

impl FakePage {
    pub fn add_line(&self, class: &str, text: &str) -> FakeLine {
        self.push_line(class, Some(text.to_string()))
    }

    pub fn add_line_without_text(&self, class: &str) -> FakeLine {
        self.push_line(class, None)
    }

    fn push_line(&self, class: &str, text: Option<String>) -> FakeLine {
        let mut lines = self.lines.borrow_mut();
        let line = FakeLine {
            id: lines.len(),
            state: Rc::new(RefCell::new(LineState {
                text,
                classes: vec![class.to_string()],
                ..LineState::default()
            })),
        };
        lines.push(line.clone());
        line
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl Page for FakePage {
    type Line = FakeLine;

    fn query_lines(&self, selector: &str) -> Vec<FakeLine> {
        self.queries.set(self.queries.get() + 1);
        self.lines
            .borrow()
            .iter()
            .filter(|line| line.matches(selector))
            .cloned()
            .collect()
    }
}

/// Shares a page between the test body and the session under test.
impl Page for Rc<FakePage> {
    type Line = FakeLine;

    fn query_lines(&self, selector: &str) -> Vec<FakeLine> {
        self.as_ref().query_lines(selector)
    }
}

#[derive(Clone, Debug)]
pub enum FakeNode {
    Text(String),
    Element {
        class: String,
        children: Vec<FakeNode>,
    },
}

impl FakeNode {
    pub fn text(text: &str) -> Self {
        Self::Text(text.to_string())
    }

    pub fn element(class: &str, children: Vec<FakeNode>) -> Self {
        Self::Element {
            class: class.to_string(),
            children,
        }
    }
}

impl AddedNode for FakeNode {
    fn contains_candidate(&self, selector: &str) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Element { class, children } => {
                selector_classes(selector).contains(&class.as_str())
                    || children.iter().any(|child| child.contains_candidate(selector))
            }
        }
    }
}

struct Task {
    id: u64,
    due: Duration,
    run: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    tasks: Vec<Task>,
    scheduled: usize,
    cancelled: usize,
}

/// Manual clock: nothing runs until [`FakeScheduler::advance`].
#[derive(Clone, Default)]
pub struct FakeScheduler {
    clock: Rc<RefCell<Clock>>,
    fail_next: Rc<Cell<bool>>,
}

impl FakeScheduler {
    pub fn advance(&self, by: Duration) {
        let deadline = self.clock.borrow().now + by;
        loop {
            let next = {
                let mut clock = self.clock.borrow_mut();
                let due = clock
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, task)| task.due <= deadline)
                    .min_by_key(|(_, task)| (task.due, task.id))
                    .map(|(idx, _)| idx);
                match due {
                    Some(idx) => {
                        let task = clock.tasks.remove(idx);
                        clock.now = task.due;
                        Some(task)
                    }
                    None => None,
                }
            };
            match next {
                Some(task) => (task.run)(),
                None => break,
            }
        }
        self.clock.borrow_mut().now = deadline;
    }

    pub fn pending(&self) -> usize {
        self.clock.borrow().tasks.len()
    }

    pub fn scheduled(&self) -> usize {
        self.clock.borrow().scheduled
    }

    pub fn cancelled(&self) -> usize {
        self.clock.borrow().cancelled
    }

    pub fn fail_next_schedule(&self) {
        self.fail_next.set(true);
    }
}

impl Scheduler for FakeScheduler {
    type Timer = u64;

    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> PlatformResult<u64> {
        if self.fail_next.replace(false) {
            return Err(PlatformError::js("setTimeout", "timer quota exhausted"));
        }
        let mut clock = self.clock.borrow_mut();
        let id = clock.next_id;
        clock.next_id += 1;
        clock.scheduled += 1;
        let due = clock.now + delay;
        clock.tasks.push(Task { id, due, run: task });
        Ok(id)
    }

    fn cancel(&self, timer: u64) {
        let mut clock = self.clock.borrow_mut();
        let before = clock.tasks.len();
        clock.tasks.retain(|task| task.id != timer);
        if clock.tasks.len() != before {
            clock.cancelled += 1;
        }
    }
}

pub struct FakeStore {
    pub value: PlatformResult<Option<bool>>,
    pub reads: Cell<usize>,
}

impl FakeStore {
    pub fn with(value: PlatformResult<Option<bool>>) -> Self {
        Self {
            value,
            reads: Cell::new(0),
        }
    }
}

impl PreferenceStore for FakeStore {
    async fn enabled(&self, _key: &str) -> PlatformResult<Option<bool>> {
        self.reads.set(self.reads.get() + 1);
        self.value.clone()
    }
}

#[derive(Default)]
pub struct FakeReloader {
    pub reloads: Cell<usize>,
}

impl Reloader for FakeReloader {
    fn reload(&self) -> PlatformResult<()> {
        self.reloads.set(self.reloads.get() + 1);
        Ok(())
    }
}
