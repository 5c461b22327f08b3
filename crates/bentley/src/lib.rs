//! Bentley - console logging for the hibiscus services
//!
//! ## Features
//!
//! - Leveled console output (verbose, info, success, warn, error) on stderr
//! - Multi-line message support with a consistent prefix on every line
//! - Format-aware macros: `bentley::info!("stored {count} records")`
//! - Optional persistent JSONL request logs (`daemon-logs` feature)
//!
//! Verbose lines are hidden unless [`set_verbose`] is on, and all console
//! output can be silenced process-wide with [`set_quiet`].

use colored::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "daemon-logs")]
pub mod daemon_logs;

static QUIET: AtomicBool = AtomicBool::new(false);
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Level {
  Verbose,
  Info,
  Success,
  Warn,
  Error,
}

impl Level {
  /// Short tag printed between brackets
  pub fn tag(self) -> &'static str {
    match self {
      Level::Verbose => "verb",
      Level::Info => "info",
      Level::Success => "sccs",
      Level::Warn => "warn",
      Level::Error => "error",
    }
  }

  fn color(self) -> Color {
    match self {
      Level::Verbose => Color::Cyan,
      Level::Info => Color::Blue,
      Level::Success => Color::Green,
      Level::Warn => Color::Yellow,
      Level::Error => Color::Red,
    }
  }

  /// Parse a level name as used in query strings ("info", "warn", ...)
  pub fn parse(name: &str) -> Option<Level> {
    match name.trim().to_ascii_lowercase().as_str() {
      "verbose" | "verb" => Some(Level::Verbose),
      "info" => Some(Level::Info),
      "success" | "sccs" => Some(Level::Success),
      "warn" | "warning" => Some(Level::Warn),
      "error" => Some(Level::Error),
      _ => None,
    }
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Level::Verbose => "verbose",
      Level::Info => "info",
      Level::Success => "success",
      Level::Warn => "warn",
      Level::Error => "error",
    };
    f.write_str(name)
  }
}

/// Silence (or re-enable) all console output
pub fn set_quiet(quiet: bool) {
  QUIET.store(quiet, Ordering::Relaxed);
}

/// Whether console output is currently silenced
pub fn is_quiet() -> bool {
  QUIET.load(Ordering::Relaxed)
}

/// Show (or hide) verbose-level console output; hidden by default
pub fn set_verbose(verbose: bool) {
  VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
  VERBOSE.load(Ordering::Relaxed)
}

/// Format the colored prefix for a level, padded so messages line up
pub fn format_prefix(level: Level) -> String {
  let tag = level.tag();
  let width = 7usize.saturating_sub(tag.len() + 2);
  format!("[{}]{:<width$}", tag.color(level.color()).bold(), "")
}

/// Write a message at the given level, one prefixed line per input line
pub fn log(level: Level, message: &str) {
  if is_quiet() || (level == Level::Verbose && !is_verbose()) {
    return;
  }

  let prefix = format_prefix(level);
  for line in message.lines() {
    eprintln!("{prefix} {line}");
  }
}

pub fn verbose(message: &str) {
  log(Level::Verbose, message);
}

/// Info level logging - general information
pub fn info(message: &str) {
  log(Level::Info, message);
}

/// Success level logging - something completed successfully
pub fn success(message: &str) {
  log(Level::Success, message);
}

/// Warning level logging - something needs attention
pub fn warn(message: &str) {
  log(Level::Warn, message);
}

/// Error level logging - something went wrong
pub fn error(message: &str) {
  log(Level::Error, message);
}

/// Macros for coverage-excluded logging - these expand with LCOV_EXCL_LINE at call sites
#[macro_export]
macro_rules! verbose {
  ($($arg:tt)*) => {
    $crate::verbose(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}
