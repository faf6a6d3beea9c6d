//! Platform adapters for MCP Server
//!
//! Bridge the core collaborator traits to what the host machine provides:
//! - **`JsonFileConfigurationSource`**: reads the account file and reports
//!   changes by polling its modification time.
//! - **`KeyringTokenProvider`**: reads OAuth tokens that the external auth
//!   flow stored in the system keyring. Read-only; tokens are never written.

mod config_file;
mod token_store;

pub use config_file::JsonFileConfigurationSource;
pub use token_store::KeyringTokenProvider;
