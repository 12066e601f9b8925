//! Structured JSON logger for hods
//!
//! - One log line = one event
//! - `event` first, then `severity`, then fields sorted by key
//! - Lines are handed to the `log` facade; the binary decides where they go

use std::fmt;

use serde_json::{Map, Value};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-file and per-document detail
    Trace = 0,
    /// Command and refresh summaries
    Info = 1,
    /// Skipped files, rebuilt caches
    Warn = 2,
    /// Failed writes and restores
    Error = 3,
}

impl Severity {
    /// Name written in the `severity` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    /// Level used when handing the line to the `log` facade
    pub fn level(&self) -> log::Level {
        match self {
            Severity::Trace => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Emits one event line through the `log` facade.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let level = severity.level();
        if log::log_enabled!(target: "hods", level) {
            log::log!(target: "hods", level, "{}", Self::format_line(severity, event, fields));
        }
    }

    /// Render one event as a JSON object string
    pub fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut line = Map::new();
        line.insert("event".to_string(), Value::from(event));
        line.insert("severity".to_string(), Value::from(severity.as_str()));

        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);
        for (key, value) in sorted {
            if key == &"event" || key == &"severity" {
                continue;
            }
            line.insert((*key).to_string(), Value::from(*value));
        }

        Value::Object(line).to_string()
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severities_are_ordered() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(Severity::Trace.level(), log::Level::Debug);
        assert_eq!(Severity::Error.level(), log::Level::Error);
    }

    #[test]
    fn test_line_is_json() {
        let line = Logger::format_line(Severity::Info, "INDEX_OPENED", &[("path", "/tmp/cache")]);
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "INDEX_OPENED");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["path"], "/tmp/cache");
    }

    #[test]
    fn test_deterministic_ordering() {
        let a = Logger::format_line(Severity::Warn, "T", &[("zebra", "1"), ("apple", "2"), ("mango", "3")]);
        let b = Logger::format_line(Severity::Warn, "T", &[("mango", "3"), ("zebra", "1"), ("apple", "2")]);
        assert_eq!(a, b);
        assert!(a.find("event").unwrap() < a.find("severity").unwrap());
        assert!(a.find("severity").unwrap() < a.find("apple").unwrap());
        assert!(a.find("apple").unwrap() < a.find("mango").unwrap());
        assert!(a.find("mango").unwrap() < a.find("zebra").unwrap());
    }

    #[test]
    fn test_escapes_special_chars() {
        let line = Logger::format_line(Severity::Info, "T", &[("message", "hello \"world\"\nline2")]);
        assert!(!line.contains('\n'));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["message"], "hello \"world\"\nline2");
    }

    #[test]
    fn test_reserved_keys_not_overridden() {
        let line = Logger::format_line(Severity::Info, "REAL", &[("event", "fake")]);
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "REAL");
    }

    #[test]
    fn test_logging_without_logger_does_not_panic() {
        Logger::info("NO_LOGGER_INSTALLED", &[("a", "1")]);
        Logger::error("NO_LOGGER_INSTALLED", &[]);
    }
}
