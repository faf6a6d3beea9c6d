//! Utility modules.

/// Date/time parsing helpers shared by providers.
pub mod datetime;

/// Log sanitization utilities to keep message bodies and tokens out of logs.
pub mod log_sanitizer;
