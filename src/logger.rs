//! Levelled, coloured diagnostics on stderr.
//!
//! A `Logger` is a plain value handed to every unit that reports anything;
//! there is no process-wide log level. Stdout is left alone because the GPU
//! writes guest output there.

use std::fmt;
use std::io::{self, Write};

use ansi_term::Colour::{Green, Purple, Red, Yellow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Logger {
    level: LogLevel,
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// True when messages at `level` would be printed. Hot paths check this
    /// before formatting anything.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    pub fn debug(&self, msg: impl fmt::Display) {
        self.log(LogLevel::Debug, msg);
    }

    pub fn info(&self, msg: impl fmt::Display) {
        self.log(LogLevel::Info, msg);
    }

    pub fn warn(&self, msg: impl fmt::Display) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn error(&self, msg: impl fmt::Display) {
        self.log(LogLevel::Error, msg);
    }

    fn log(&self, level: LogLevel, msg: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }
        let tag = level.to_string();
        let tag = match level {
            LogLevel::Debug => Green.paint(tag),
            LogLevel::Info => Yellow.paint(tag),
            LogLevel::Warn => Purple.paint(tag),
            LogLevel::Error => Red.bold().paint(tag),
        };
        let _ = writeln!(io::stderr().lock(), "[{}] {}", tag, msg);
    }
}
