//! Formatted output to the `symbasis-output` logger.

use std::fmt;

use log;

const SYMBASIS_BANNER_LENGTH: usize = 80;

/// Logs a warning to the `symbasis-output` logger.
macro_rules! symbasis_warn {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::warn!(target: "symbasis-output", $fmt, $($($arg)*)?) }
}

/// Logs a main output line to the `symbasis-output` logger.
macro_rules! symbasis_output {
    ($fmt:expr $(, $($arg:tt)*)?) => { log::info!(target: "symbasis-output", $fmt, $($($arg)*)?) }
}

pub(crate) use {symbasis_output, symbasis_warn};

/// Logs a boxed section title to the `symbasis-output` logger.
pub(crate) fn log_title(title: &str) {
    let length = title.chars().count().max(SYMBASIS_BANNER_LENGTH - 6);
    let bar = "─".repeat(length);
    symbasis_output!("┌──{bar}──┐");
    symbasis_output!("│  {title:^length$}  │");
    symbasis_output!("└──{bar}──┘");
}

/// Writes an underlined subtitle.
pub(crate) fn write_subtitle(f: &mut fmt::Formatter<'_>, subtitle: &str) -> fmt::Result {
    writeln!(f, "{subtitle}")?;
    writeln!(f, "{}", "═".repeat(subtitle.chars().count()))
}

/// Logs an underlined subtitle to the `symbasis-output` logger.
pub(crate) fn log_subtitle(subtitle: &str) {
    symbasis_output!("{}", subtitle);
    symbasis_output!("{}", "═".repeat(subtitle.chars().count()));
}

/// Turns a boolean into `yes` or `no`.
pub(crate) fn nice_bool(b: bool) -> String {
    if b {
        "yes".to_string()
    } else {
        "no".to_string()
    }
}

/// A trait for logging displayable structures line by line.
pub(crate) trait SymBasisOutput: fmt::Display {
    /// Logs the display output, one log record per line.
    fn log_output_display(&self) {
        self.to_string().lines().for_each(|line| {
            symbasis_output!("{line}");
        })
    }
}

impl<T> SymBasisOutput for T where T: fmt::Display {}
