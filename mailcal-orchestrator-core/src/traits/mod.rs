//! Collaborator trait definitions

mod configuration_source;

pub use configuration_source::{ConfigurationSource, InMemoryConfigurationSource};
