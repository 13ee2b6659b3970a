use crate::{logger::SUCCESS_TARGET, progress::Progress};
use log::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
    Success,
    Debug,
}

/// Receives every event the engine emits.
///
/// The engine never writes to the terminal itself.
pub trait Reporter: Send + Sync {
    fn report(&self, level: Level, message: &str);

    fn progress(&self, current: u64, total: u64, title: &str);

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn warning(&self, message: &str) {
        self.report(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.report(Level::Error, message);
    }

    fn success(&self, message: &str) {
        self.report(Level::Success, message);
    }

    fn debug(&self, message: &str) {
        self.report(Level::Debug, message);
    }
}

/// Forwards events to the `log` facade and draws progress on stderr.
///
/// Success messages use the [`SUCCESS_TARGET`] target.
pub struct LogReporter {
    progress: Progress,
}

impl LogReporter {
    pub fn new() -> Self {
        Self {
            progress: Progress::new(),
        }
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for LogReporter {
    fn report(&self, level: Level, message: &str) {
        self.progress.clear();

        match level {
            Level::Info => info!("{}", message),
            Level::Warning => warn!("{}", message),
            Level::Error => error!("{}", message),
            Level::Success => info!(target: SUCCESS_TARGET, "{}", message),
            Level::Debug => debug!("{}", message),
        }
    }

    fn progress(&self, current: u64, total: u64, title: &str) {
        if log::max_level() >= log::LevelFilter::Info {
            self.progress.render(current, total, title);
        }
    }
}
