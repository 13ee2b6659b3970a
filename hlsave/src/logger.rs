use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter, Metadata, Record};

/// Target used by [`crate::LogReporter`] for completion messages.
pub const SUCCESS_TARGET: &str = "success";

pub struct Logger;

impl Logger {
    /// Installs the logger, ignoring a second installation.
    pub fn init(level: LevelFilter) {
        static LOGGER: Logger = Logger;

        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    }
}

impl log::Log for Logger {
    /// Only records of this crate are shown, hyper and reqwest are noisy at
    /// debug level.
    fn enabled(&self, metadata: &Metadata) -> bool {
        let target = metadata.target();
        target == SUCCESS_TARGET || target.split("::").next() == Some(env!("CARGO_CRATE_NAME"))
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            match log::max_level() {
                LevelFilter::Off => (),
                LevelFilter::Error | LevelFilter::Warn | LevelFilter::Info => {
                    match (record.level(), record.target()) {
                        (Level::Info, SUCCESS_TARGET) => {
                            eprintln!("{} {}", "[DONE]".bold().green(), record.args());
                        }
                        (Level::Info, _) => {
                            eprintln!("{}", record.args());
                        }
                        _ => {
                            eprintln!("{} {}", label(record.level()), record.args());
                        }
                    }
                }
                LevelFilter::Debug | LevelFilter::Trace => {
                    let location = match (record.file(), record.line()) {
                        (Some(file), Some(line)) => format!("[{}:{}]", file, line).dimmed(),
                        _ => "[unk]".dimmed(),
                    };

                    eprintln!(
                        "{} {} {} {}",
                        label(record.level()),
                        record.target().dimmed(),
                        location,
                        record.args()
                    );
                }
            }
        }
    }

    fn flush(&self) {}
}

fn label(level: Level) -> ColoredString {
    match level {
        Level::Debug => "[DEBUG]".bold().blue(),
        Level::Error => "[ERROR]".bold().red(),
        Level::Info => "[INFO]".bold().green(),
        Level::Trace => "[TRACE]".bold().purple(),
        Level::Warn => "[WARN]".bold().yellow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    fn enabled(target: &str) -> bool {
        Logger.enabled(&Metadata::builder().level(Level::Debug).target(target).build())
    }

    #[test]
    fn dependency_records_are_dropped() {
        assert!(enabled("hlsave::downloader::fetch"));
        assert!(enabled(SUCCESS_TARGET));
        assert!(!enabled("hyper_util::client::legacy::pool"));
        assert!(!enabled("hlsave_extra"));
    }
}
