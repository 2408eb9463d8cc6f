//! `log` backend writing to the browser console.

use log::{Level, LevelFilter, Log, Metadata, Record};

const PREFIX: &str = "Unicoder";

pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Installs the console logger once; later calls only adjust the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

fn format_record(record: &Record) -> String {
    format!("{PREFIX}: {}", record.args())
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        write_console(record.level(), &format_record(record));
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
fn write_console(level: Level, message: &str) {
    use wasm_bindgen::JsValue;
    use web_sys::console;

    let message = JsValue::from_str(message);
    match level {
        Level::Error => console::error_1(&message),
        Level::Warn => console::warn_1(&message),
        Level::Info => console::info_1(&message),
        Level::Debug => console::log_1(&message),
        Level::Trace => console::debug_1(&message),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn write_console(level: Level, message: &str) {
    eprintln!("[{level}] {message}");
}
