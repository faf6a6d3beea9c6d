//! 类型定义模块

mod account;
mod response;

pub use account::{AccountInfo, AccountStatusSummary};
pub use response::SendReceipt;

// Re-export provider 库的公共类型
pub use mailcal_orchestrator_provider::{
    Account, CalendarEvent, Capability, Contact, ContactQuery, CreateContactRequest,
    CreateEventRequest, EventQuery, EventResponse, Message, MessageQuery, OutgoingMessage,
    ProviderCapabilities, ProviderMetadata, ProviderType, UpdateContactRequest,
    UpdateEventRequest,
};
