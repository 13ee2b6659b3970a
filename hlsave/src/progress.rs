use colored::Colorize;
use std::{
    io::{self, Write},
    sync::Mutex,
};

const BAR_WIDTH: u64 = 20;

/// Single-line progress output on stderr, redrawn in place.
pub struct Progress {
    active: Mutex<bool>,
}

impl Progress {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(false),
        }
    }

    pub fn render(&self, current: u64, total: u64, title: &str) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };

        let (filled, empty, percent) = bar(current, total);
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        // \x1B[2K clears the line
        let _ = write!(
            handle,
            "\r\x1B[2K{}{}{}:{}{}{}{}{}",
            "[".magenta(),
            title,
            "]".magenta(),
            "[".magenta(),
            filled,
            empty,
            "]".magenta(),
            format!("{:.2}%", percent).cyan(),
        );
        let _ = handle.flush();
        *active = true;
    }

    /// Moves off the progress line so a log line can be printed.
    pub fn clear(&self) {
        let Ok(mut active) = self.active.lock() else {
            return;
        };

        if *active {
            let mut handle = io::stderr().lock();
            let _ = write!(handle, "\r\x1B[2K");
            let _ = handle.flush();
            *active = false;
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

fn bar(current: u64, total: u64) -> (String, String, f64) {
    let total = total.max(1);
    let current = current.min(total);
    let cells = current * BAR_WIDTH / total;

    (
        "█".repeat(cells as usize),
        " ".repeat((BAR_WIDTH - cells) as usize),
        current as f64 / total as f64 * 100.0,
    )
}

#[cfg(test)]
mod tests {
    use super::bar;

    #[test]
    fn bar_cells() {
        let (filled, empty, percent) = bar(9, 20);
        assert_eq!(filled.chars().count(), 9);
        assert_eq!(empty.len(), 11);
        assert_eq!(format!("{:.2}", percent), "45.00");
    }

    #[test]
    fn bar_never_overflows() {
        let (filled, empty, percent) = bar(5, 0);
        assert_eq!(filled.chars().count(), 20);
        assert!(empty.is_empty());
        assert_eq!(percent, 100.0);
    }
}
