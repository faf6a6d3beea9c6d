//! Capability provider implementations

/// Shared utilities used by provider implementations.
pub mod common;

mod google;
mod ics;
mod json_calendar;
mod outlook;

pub use google::GoogleProvider;
pub use ics::IcsProvider;
pub use json_calendar::JsonCalendarProvider;
pub use outlook::OutlookProvider;
