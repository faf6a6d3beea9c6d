//! Mailcal Orchestrator Core Library
//!
//! Multi-account orchestration over mail, calendar and contact providers:
//! - Account registry with atomic snapshot reloads
//! - Fan-out reads across accounts with per-account failure isolation
//! - Domain-based default-account routing for writes
//! - Bounded-concurrency batch mutations with a per-item ledger
//!
//! The account source and the token store are platform concerns, plugged in
//! through [`ConfigurationSource`] and [`mailcal_orchestrator_provider::TokenProvider`].

pub mod batch;
pub mod config;
pub mod error;
pub mod fanout;
pub mod registry;
pub mod resolver;
pub mod router;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use batch::{BatchExecutor, BatchItem, BatchItemResult, BatchResult};
pub use config::OrchestratorConfig;
pub use error::{CoreError, CoreResult, ErrorInfo, ErrorKind};
pub use fanout::{AccountSelector, FanoutExecutor, FanoutResult, FanoutWarning};
pub use registry::{AccountRegistry, AccountSnapshot};
pub use resolver::ProviderResolver;
pub use router::SmartRouter;
pub use services::ServiceContext;
pub use traits::{ConfigurationSource, InMemoryConfigurationSource};
