//! # mailcal-orchestrator-provider
//!
//! A unified capability abstraction over mail, calendar and contact backends.
//!
//! ## Supported Providers
//!
//! | Provider | Tag | Capabilities | Auth Method |
//! |----------|-----|--------------|-------------|
//! | [Microsoft 365](https://learn.microsoft.com/graph/) | `outlook` | mail, calendar, contacts (read-write) | OAuth bearer token |
//! | [Google Workspace](https://developers.google.com/workspace) | `google` | mail, calendar, contacts (read-write) | OAuth bearer token |
//! | ICS subscription feed | `ics` | calendar (read-only) | none |
//! | JSON calendar file | `json_calendar` | calendar (read-only) | none |
//!
//! Configuration tags are matched through a synonym table, see
//! [`ProviderType::from_tag`].
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)* — Use the platform's native TLS implementation.
//! - **`rustls`** — Use rustls. Recommended for cross-compilation.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mailcal_orchestrator_provider::{
//!     create_provider, Account, CapabilityProvider, EventQuery, ProviderType, TokenProvider,
//! };
//!
//! # async fn example(tokens: Arc<dyn TokenProvider>) -> mailcal_orchestrator_provider::Result<()> {
//! // 1. Describe the account (normally loaded from the account file)
//! let account = Account::new("work", "m365").with_domains(["acme.com"]);
//!
//! // 2. Create the provider for its tag
//! let ty = ProviderType::from_tag(&account.provider).unwrap();
//! let provider = create_provider(ty, tokens);
//!
//! // 3. Read the next week of events
//! let events = provider.list_events(&account, &EventQuery::upcoming(7, 50)).await?;
//! for event in &events {
//!     println!("{} {}", event.start, event.title);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All provider operations return [`Result<T, ProviderError>`](ProviderError).
//! The error enum provides structured variants for common failure modes:
//!
//! - [`ProviderError::Unauthenticated`] — no usable token, or the backend rejected it
//! - [`ProviderError::Unsupported`] — the backend cannot do this (writes on a feed)
//! - [`ProviderError::NotFound`] — message, event or contact not found
//! - [`ProviderError::FetchFailed`] — a feed or calendar file could not be read
//!
//! Transient HTTP errors (`NetworkError`, `Timeout`, `RateLimited`) are automatically
//! retried with exponential backoff. Feed providers serve their last good copy
//! when a refresh fails, see [`FeedCache`].

mod error;
mod factory;
mod feed_cache;
mod http_client;
mod providers;
mod traits;
mod types;
mod utils;

// Re-export error types
pub use error::{ProviderError, Result};

// Re-export factory functions
pub use factory::{create_provider, get_all_provider_metadata};

// Re-export public traits (internal traits are not exported)
pub use traits::{CapabilityProvider, TokenProvider};

// Re-export feed cache
pub use feed_cache::{CACHE_TTL_KEY, Cached, FeedCache, Freshness, ttl_from_config};

// Re-export types
pub use types::{
    Account, Attendee, AttendeeResponse, CalendarEvent, Capability, Contact, ContactQuery,
    CreateContactRequest, CreateEventRequest, EmailAddress, EventQuery, EventResponse,
    EventStatus, Message, MessageQuery, OutgoingMessage, ProviderCapabilities, ProviderConfigKey,
    ProviderMetadata, ProviderType, UpdateContactRequest, UpdateEventRequest,
};

// Re-export utils module
pub use utils::datetime;
pub use utils::log_sanitizer::truncate_for_log;

// Re-export concrete providers
pub use providers::{GoogleProvider, IcsProvider, JsonCalendarProvider, OutlookProvider};
