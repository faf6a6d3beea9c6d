//! MCP tool parameter schemas
//!
//! Defines the input parameter structures for all MCP tools.
//! All structs derive `Debug`, `Deserialize`, and `JsonSchema` as required by rmcp.
//!
//! Multi-account reads take an optional `account_id`: omitted or `"all"`
//! queries every enabled account. Writes that create something take an
//! optional `account_id` too: omitted routes by the target address domain.

use mailcal_orchestrator_core::BatchItem;
use schemars::JsonSchema;
use serde::Deserialize;

// ============ Accounts ============

/// Parameters for `list_accounts` tool.
///
/// This tool takes no parameters, but we need an empty struct for the schema.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListAccountsParams {}

/// Parameters for `account_status` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AccountStatusParams {}

/// Parameters for `list_providers` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListProvidersParams {}

// ============ Mail ============

/// Parameters for `list_messages` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListMessagesParams {
    #[schemars(description = "Account ID to read from; omit or use \"all\" for every enabled account")]
    pub account_id: Option<String>,

    #[schemars(description = "Folder name (e.g. inbox, sentitems, archive); default: inbox")]
    pub folder: Option<String>,

    #[schemars(description = "Only return unread messages (default: false)")]
    pub unread_only: Option<bool>,

    #[schemars(description = "Maximum messages per account (default: 25, max: 100)")]
    pub limit: Option<u32>,
}

/// Parameters for `search_messages` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchMessagesParams {
    #[schemars(description = "Account ID to search; omit or use \"all\" for every enabled account")]
    pub account_id: Option<String>,

    #[schemars(description = "Full-text search query")]
    pub query: String,

    #[schemars(description = "Maximum messages per account (default: 25, max: 100)")]
    pub limit: Option<u32>,
}

/// Parameters for `get_message` and `delete_message` tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MessageRefParams {
    #[schemars(description = "The account ID owning the message")]
    pub account_id: String,

    #[schemars(description = "The message ID")]
    pub message_id: String,
}

/// Parameters for `send_message` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SendMessageParams {
    #[schemars(
        description = "Account ID to send from; omit to pick the account owning the first recipient's domain"
    )]
    pub account_id: Option<String>,

    #[schemars(description = "Recipient addresses")]
    pub to: Vec<String>,

    #[schemars(description = "CC addresses")]
    pub cc: Option<Vec<String>>,

    #[schemars(description = "BCC addresses")]
    pub bcc: Option<Vec<String>>,

    #[schemars(description = "Subject line")]
    pub subject: String,

    #[schemars(description = "Message body")]
    pub body: String,

    #[schemars(description = "Treat the body as HTML (default: false)")]
    pub html: Option<bool>,
}

/// Parameters for `mark_message` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MarkMessageParams {
    #[schemars(description = "The account ID owning the message")]
    pub account_id: String,

    #[schemars(description = "The message ID")]
    pub message_id: String,

    #[schemars(description = "true marks as read, false marks as unread")]
    pub read: bool,
}

/// Parameters for `move_message` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MoveMessageParams {
    #[schemars(description = "The account ID owning the message")]
    pub account_id: String,

    #[schemars(description = "The message ID")]
    pub message_id: String,

    #[schemars(description = "Destination folder (Outlook folder name or ID, Gmail label)")]
    pub folder: String,
}

// ============ Batches ============

/// One `(account, item)` pair of a batch.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchItemParams {
    #[schemars(description = "The account ID owning the item")]
    pub account_id: String,

    #[schemars(description = "The message, event or contact ID")]
    pub item_id: String,
}

impl From<BatchItemParams> for BatchItem {
    fn from(params: BatchItemParams) -> Self {
        Self::new(params.account_id, params.item_id)
    }
}

/// Parameters for `batch_delete_*` tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchItemsParams {
    #[schemars(description = "Items to process (max 100 by default)")]
    pub items: Vec<BatchItemParams>,
}

/// Parameters for `batch_mark_messages` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchMarkMessagesParams {
    #[schemars(description = "Messages to mark")]
    pub items: Vec<BatchItemParams>,

    #[schemars(description = "true marks as read, false marks as unread")]
    pub read: bool,
}

/// Parameters for `batch_move_messages` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchMoveMessagesParams {
    #[schemars(description = "Messages to move")]
    pub items: Vec<BatchItemParams>,

    #[schemars(description = "Destination folder")]
    pub folder: String,
}

/// Convert tool batch items into core batch items.
pub fn into_batch_items(items: Vec<BatchItemParams>) -> Vec<BatchItem> {
    items.into_iter().map(BatchItem::from).collect()
}

// ============ Calendar ============

/// Parameters for `list_events` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListEventsParams {
    #[schemars(description = "Account ID to read from; omit or use \"all\" for every enabled account")]
    pub account_id: Option<String>,

    #[schemars(description = "Window start (RFC3339 or YYYY-MM-DD); default: now")]
    pub start: Option<String>,

    #[schemars(description = "Window end (RFC3339 or YYYY-MM-DD); default: start + days")]
    pub end: Option<String>,

    #[schemars(description = "Window length in days when end is omitted (default: 7, max: 366)")]
    pub days: Option<u32>,

    #[schemars(description = "Maximum events per account (default: 50, max: 100)")]
    pub limit: Option<u32>,
}

/// Parameters for `get_event` and `delete_event` tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct EventRefParams {
    #[schemars(description = "The account ID owning the event")]
    pub account_id: String,

    #[schemars(description = "The event ID")]
    pub event_id: String,
}

/// Parameters for `create_event` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateEventParams {
    #[schemars(
        description = "Account ID to create the event in; omit to pick the account owning the first attendee's domain"
    )]
    pub account_id: Option<String>,

    #[schemars(description = "Event title")]
    pub title: String,

    #[schemars(description = "Start time (RFC3339, or YYYY-MM-DD for all-day events)")]
    pub start: String,

    #[schemars(description = "End time (RFC3339, or YYYY-MM-DD for all-day events)")]
    pub end: String,

    #[schemars(description = "All-day event (default: false)")]
    pub all_day: Option<bool>,

    #[schemars(description = "Event description")]
    pub description: Option<String>,

    #[schemars(description = "Event location")]
    pub location: Option<String>,

    #[schemars(description = "Attendee email addresses")]
    pub attendees: Option<Vec<String>>,
}

/// Parameters for `update_event` tool. Omitted fields are left unchanged.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateEventParams {
    #[schemars(description = "The account ID owning the event")]
    pub account_id: String,

    #[schemars(description = "The event ID")]
    pub event_id: String,

    #[schemars(description = "New title")]
    pub title: Option<String>,

    #[schemars(description = "New start time (RFC3339 or YYYY-MM-DD)")]
    pub start: Option<String>,

    #[schemars(description = "New end time (RFC3339 or YYYY-MM-DD)")]
    pub end: Option<String>,

    #[schemars(description = "New description")]
    pub description: Option<String>,

    #[schemars(description = "New location")]
    pub location: Option<String>,

    #[schemars(description = "Replacement attendee list")]
    pub attendees: Option<Vec<String>>,
}

/// Parameters for `respond_to_event` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RespondToEventParams {
    #[schemars(description = "The account ID owning the event")]
    pub account_id: String,

    #[schemars(description = "The event ID")]
    pub event_id: String,

    #[schemars(description = "Response: accept, decline or tentative")]
    pub response: String,

    #[schemars(description = "Optional message to the organizer")]
    pub comment: Option<String>,
}

// ============ Contacts ============

/// Parameters for `list_contacts` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListContactsParams {
    #[schemars(description = "Account ID to read from; omit or use \"all\" for every enabled account")]
    pub account_id: Option<String>,

    #[schemars(description = "Maximum contacts per account (default: 50, max: 100)")]
    pub limit: Option<u32>,
}

/// Parameters for `search_contacts` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchContactsParams {
    #[schemars(description = "Account ID to search; omit or use \"all\" for every enabled account")]
    pub account_id: Option<String>,

    #[schemars(description = "Name or email fragment")]
    pub query: String,

    #[schemars(description = "Maximum contacts per account (default: 50, max: 100)")]
    pub limit: Option<u32>,
}

/// Parameters for `get_contact` and `delete_contact` tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ContactRefParams {
    #[schemars(description = "The account ID owning the contact")]
    pub account_id: String,

    #[schemars(description = "The contact ID")]
    pub contact_id: String,
}

/// Parameters for `create_contact` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateContactParams {
    #[schemars(
        description = "Account ID to create the contact in; omit to pick the account owning the first email's domain"
    )]
    pub account_id: Option<String>,

    #[schemars(description = "Display name")]
    pub display_name: String,

    #[schemars(description = "Given name")]
    pub given_name: Option<String>,

    #[schemars(description = "Family name")]
    pub family_name: Option<String>,

    #[schemars(description = "Email addresses")]
    pub emails: Option<Vec<String>>,

    #[schemars(description = "Phone numbers")]
    pub phones: Option<Vec<String>>,

    #[schemars(description = "Company name")]
    pub company: Option<String>,

    #[schemars(description = "Job title")]
    pub job_title: Option<String>,
}

/// Parameters for `update_contact` tool. Omitted fields are left unchanged.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateContactParams {
    #[schemars(description = "The account ID owning the contact")]
    pub account_id: String,

    #[schemars(description = "The contact ID")]
    pub contact_id: String,

    #[schemars(description = "New display name")]
    pub display_name: Option<String>,

    #[schemars(description = "Replacement email list")]
    pub emails: Option<Vec<String>>,

    #[schemars(description = "Replacement phone list")]
    pub phones: Option<Vec<String>>,

    #[schemars(description = "New company name")]
    pub company: Option<String>,

    #[schemars(description = "New job title")]
    pub job_title: Option<String>,
}
