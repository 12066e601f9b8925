//! Observability subsystem for hods
//!
//! Structured JSON event logging on top of the `log` facade.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use hods::observability::Logger;
//!
//! Logger::info("REFRESH_COMPLETE", &[("reparsed", "2")]);
//! ```

mod logger;

pub use logger::{Logger, Severity};
