use log::{Level, LevelFilter, Log, Metadata, Record};
use web_sys::console;

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}", record.target(), record.args());
        match record.level() {
            Level::Error => console::error_1(&line.into()),
            Level::Warn => console::warn_1(&line.into()),
            Level::Info => console::info_1(&line.into()),
            Level::Debug | Level::Trace => console::debug_1(&line.into()),
        }
    }

    fn flush(&self) {}
}

/// Installs the console logger. Later calls only adjust the level.
pub fn init(level: LevelFilter) {
    // set_logger fails once a logger is installed, which is fine here.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

/// Parses a level name as accepted by `setLogLevel`, e.g. `"debug"` or `"off"`.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}
