//! Minimal `log` backend.
//!
//! The library only logs through the `log` facade. Programs that have no logger of their
//! own can call [`init`] to get `[LEVEL target] message` lines on stderr.

use log::{LevelFilter, Log, Metadata, Record};

/// Writes every enabled record to stderr.
pub struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    pub fn new(level: LevelFilter) -> Self {
        StderrLogger { level }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install a [`StderrLogger`] as the global logger.
///
/// Fails if another logger is already installed.
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(StderrLogger::new(level)))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn respects_level() {
        let logger = StderrLogger::new(LevelFilter::Info);
        let meta = |level| Metadata::builder().level(level).target("push_bridge").build();
        assert!(logger.enabled(&meta(Level::Error)));
        assert!(logger.enabled(&meta(Level::Info)));
        assert!(!logger.enabled(&meta(Level::Debug)));
    }
}
