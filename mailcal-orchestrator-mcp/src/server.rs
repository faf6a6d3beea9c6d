//! MCP Server implementation for Mailcal Orchestrator.
//!
//! Exposes mail, calendar and contact tools over every configured account.
//! Reads fan out and return `{ items, warnings }`; batches return the full
//! per-item ledger.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
};
use serde::Serialize;

use mailcal_orchestrator_core::CoreError;
use mailcal_orchestrator_core::services::{
    AccountService, CalendarService, ContactService, MAX_PAGE_LIMIT, MailService, ServiceContext,
};
use mailcal_orchestrator_provider::{
    ContactQuery, CreateContactRequest, CreateEventRequest, EventQuery, EventResponse,
    MessageQuery, OutgoingMessage, ProviderError, UpdateContactRequest, UpdateEventRequest,
    datetime, truncate_for_log,
};

use crate::schemas::{
    AccountStatusParams, BatchItemsParams, BatchMarkMessagesParams, BatchMoveMessagesParams,
    ContactRefParams, CreateContactParams, CreateEventParams, EventRefParams, ListAccountsParams,
    ListContactsParams, ListEventsParams, ListMessagesParams, ListProvidersParams,
    MarkMessageParams, MessageRefParams, MoveMessageParams, RespondToEventParams,
    SearchContactsParams, SearchMessagesParams, SendMessageParams, UpdateContactParams,
    UpdateEventParams, into_batch_items,
};

const DEFAULT_MESSAGE_LIMIT: u32 = 25;
const DEFAULT_EVENT_LIMIT: u32 = 50;
const DEFAULT_CONTACT_LIMIT: u32 = 50;
const DEFAULT_EVENT_DAYS: u32 = 7;
const MAX_EVENT_DAYS: u32 = 366;

/// Sanitize error messages to prevent sensitive information leakage.
///
/// Logs the full error to stderr but returns a generic message to the client.
fn sanitize_internal_error(error: impl std::fmt::Display, context: &str) -> McpError {
    log::error!("{context} error: {error}");
    McpError::internal_error(
        format!("{context} failed - check server logs for details"),
        None,
    )
}

/// Map a core error to a tool error. Every error carries its `kind`.
///
/// Expected errors (unknown account, missing item, re-authentication needed,
/// unsupported operation, bad input) go back to the agent verbatim. Backend
/// and transient failures keep the backend's detail, truncated. Configuration
/// errors are sanitized.
fn map_core_error(error: &CoreError, context: &str) -> McpError {
    let kind = error.kind();
    if error.is_expected() {
        log::warn!("{context}: {error}");
        return McpError::invalid_params(
            error.to_string(),
            Some(serde_json::json!({ "kind": kind })),
        );
    }

    let CoreError::Provider(provider_error) = error else {
        log::error!("{context} error: {error}");
        return McpError::internal_error(
            format!("{context} failed - check server logs for details"),
            Some(serde_json::json!({ "kind": kind })),
        );
    };

    log::error!("{context} error: {provider_error}");
    let mut data = serde_json::json!({ "kind": kind });
    if let ProviderError::RemoteError {
        provider,
        status,
        raw_code,
        raw_message,
    } = provider_error
    {
        data["provider"] = serde_json::json!(provider);
        data["status"] = serde_json::json!(status);
        data["raw_code"] = serde_json::json!(raw_code);
        data["raw_message"] = serde_json::json!(truncate_for_log(raw_message));
    }
    McpError::internal_error(
        format!(
            "{context} failed: {}",
            truncate_for_log(&provider_error.to_string())
        ),
        Some(data),
    )
}

fn invalid_argument(message: String) -> McpError {
    McpError::invalid_params(message, Some(serde_json::json!({ "kind": "validation_failure" })))
}

/// Serialize a tool result as pretty JSON text content.
fn json_result<T: Serialize>(value: &T, context: &str) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| sanitize_internal_error(e, &format!("Serialize {context}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Result body for single-item writes that return nothing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteAck<'a> {
    success: bool,
    account_id: &'a str,
    item_id: &'a str,
}

fn ack<'a>(account_id: &'a str, item_id: &'a str) -> WriteAck<'a> {
    WriteAck {
        success: true,
        account_id,
        item_id,
    }
}

fn parse_time(value: &str, field: &str) -> Result<DateTime<Utc>, McpError> {
    datetime::parse_flexible(value).ok_or_else(|| {
        invalid_argument(format!(
            "invalid {field} '{value}', expected RFC3339 or YYYY-MM-DD"
        ))
    })
}

fn parse_optional_time(value: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>, McpError> {
    value.map(|v| parse_time(v, field)).transpose()
}

fn clamp_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_PAGE_LIMIT)
}

/// Build the event window from the tool arguments.
fn event_query(params: &ListEventsParams) -> Result<EventQuery, McpError> {
    let start = parse_optional_time(params.start.as_deref(), "start")?.unwrap_or_else(Utc::now);
    let end = match parse_optional_time(params.end.as_deref(), "end")? {
        Some(end) => end,
        None => {
            let days = params
                .days
                .unwrap_or(DEFAULT_EVENT_DAYS)
                .clamp(1, MAX_EVENT_DAYS);
            start + Duration::days(i64::from(days))
        }
    };
    if end < start {
        return Err(invalid_argument("end must not be before start".to_string()));
    }
    Ok(EventQuery {
        start,
        end,
        limit: clamp_limit(params.limit, DEFAULT_EVENT_LIMIT),
    })
}

/// MCP Server for Mailcal Orchestrator.
///
/// Provides AI agents with one view over several mail, calendar and contact
/// accounts through the Model Context Protocol.
#[derive(Clone)]
pub struct MailcalOrchestratorMcp {
    account_service: Arc<AccountService>,
    mail_service: Arc<MailService>,
    calendar_service: Arc<CalendarService>,
    contact_service: Arc<ContactService>,
    /// Tool router generated by macro.
    tool_router: ToolRouter<Self>,
}

impl MailcalOrchestratorMcp {
    /// Create a new MCP server instance.
    #[must_use]
    pub fn new(ctx: &Arc<ServiceContext>) -> Self {
        Self {
            account_service: Arc::new(AccountService::new(Arc::clone(ctx))),
            mail_service: Arc::new(MailService::new(Arc::clone(ctx))),
            calendar_service: Arc::new(CalendarService::new(Arc::clone(ctx))),
            contact_service: Arc::new(ContactService::new(Arc::clone(ctx))),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl MailcalOrchestratorMcp {
    // ============ Accounts ============

    #[tool(
        description = "List all configured accounts with their provider, domains and capabilities (mail, calendar, contacts, writable)"
    )]
    async fn list_accounts(
        &self,
        _params: Parameters<ListAccountsParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.account_service.list_accounts(), "accounts")
    }

    #[tool(
        description = "Summarize the loaded account configuration: totals, per-provider counts and accounts with an unknown provider"
    )]
    async fn account_status(
        &self,
        _params: Parameters<AccountStatusParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.account_service.account_status(), "account status")
    }

    #[tool(
        description = "List supported provider types with accepted tags, capabilities and per-account config keys"
    )]
    async fn list_providers(
        &self,
        _params: Parameters<ListProvidersParams>,
    ) -> Result<CallToolResult, McpError> {
        json_result(&self.account_service.list_providers(), "providers")
    }

    // ============ Mail ============

    #[tool(
        description = "List recent messages from one account or all accounts, newest first. Failing accounts are reported in warnings"
    )]
    async fn list_messages(
        &self,
        Parameters(params): Parameters<ListMessagesParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = MessageQuery {
            folder: params.folder,
            unread_only: params.unread_only.unwrap_or(false),
            limit: clamp_limit(params.limit, DEFAULT_MESSAGE_LIMIT),
        };
        let result = self
            .mail_service
            .list_messages(params.account_id.as_deref(), &query)
            .await
            .map_err(|e| map_core_error(&e, "List messages"))?;
        json_result(&result, "messages")
    }

    #[tool(description = "Full-text search messages in one account or all accounts")]
    async fn search_messages(
        &self,
        Parameters(params): Parameters<SearchMessagesParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .mail_service
            .search_messages(
                params.account_id.as_deref(),
                &params.query,
                clamp_limit(params.limit, DEFAULT_MESSAGE_LIMIT),
            )
            .await
            .map_err(|e| map_core_error(&e, "Search messages"))?;
        json_result(&result, "messages")
    }

    #[tool(description = "Get a single message including its body")]
    async fn get_message(
        &self,
        Parameters(params): Parameters<MessageRefParams>,
    ) -> Result<CallToolResult, McpError> {
        let message = self
            .mail_service
            .get_message(&params.account_id, &params.message_id)
            .await
            .map_err(|e| map_core_error(&e, "Get message"))?;
        json_result(&message, "message")
    }

    #[tool(
        description = "Send an email. Without account_id, sends from the account owning the first recipient's domain"
    )]
    async fn send_message(
        &self,
        Parameters(params): Parameters<SendMessageParams>,
    ) -> Result<CallToolResult, McpError> {
        let message = OutgoingMessage {
            to: params.to,
            cc: params.cc.unwrap_or_default(),
            bcc: params.bcc.unwrap_or_default(),
            subject: params.subject,
            body: params.body,
            html: params.html.unwrap_or(false),
        };
        let receipt = self
            .mail_service
            .send_message(params.account_id.as_deref(), &message)
            .await
            .map_err(|e| map_core_error(&e, "Send message"))?;
        json_result(&receipt, "send receipt")
    }

    #[tool(description = "Mark a message as read or unread")]
    async fn mark_message(
        &self,
        Parameters(params): Parameters<MarkMessageParams>,
    ) -> Result<CallToolResult, McpError> {
        self.mail_service
            .mark_message(&params.account_id, &params.message_id, params.read)
            .await
            .map_err(|e| map_core_error(&e, "Mark message"))?;
        json_result(&ack(&params.account_id, &params.message_id), "result")
    }

    #[tool(description = "Move a message to another folder (Gmail: apply the label)")]
    async fn move_message(
        &self,
        Parameters(params): Parameters<MoveMessageParams>,
    ) -> Result<CallToolResult, McpError> {
        self.mail_service
            .move_message(&params.account_id, &params.message_id, &params.folder)
            .await
            .map_err(|e| map_core_error(&e, "Move message"))?;
        json_result(&ack(&params.account_id, &params.message_id), "result")
    }

    #[tool(description = "Delete a message (moved to trash where the provider has one)")]
    async fn delete_message(
        &self,
        Parameters(params): Parameters<MessageRefParams>,
    ) -> Result<CallToolResult, McpError> {
        self.mail_service
            .delete_message(&params.account_id, &params.message_id)
            .await
            .map_err(|e| map_core_error(&e, "Delete message"))?;
        json_result(&ack(&params.account_id, &params.message_id), "result")
    }

    #[tool(
        description = "Delete several messages across accounts. Returns a per-item ledger; one failure does not stop the rest"
    )]
    async fn batch_delete_messages(
        &self,
        Parameters(params): Parameters<BatchItemsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .mail_service
            .batch_delete_messages(&into_batch_items(params.items))
            .await
            .map_err(|e| map_core_error(&e, "Batch delete messages"))?;
        json_result(&result, "batch result")
    }

    #[tool(description = "Mark several messages as read or unread across accounts. Returns a per-item ledger")]
    async fn batch_mark_messages(
        &self,
        Parameters(params): Parameters<BatchMarkMessagesParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .mail_service
            .batch_mark_messages(&into_batch_items(params.items), params.read)
            .await
            .map_err(|e| map_core_error(&e, "Batch mark messages"))?;
        json_result(&result, "batch result")
    }

    #[tool(description = "Move several messages to one folder across accounts. Returns a per-item ledger")]
    async fn batch_move_messages(
        &self,
        Parameters(params): Parameters<BatchMoveMessagesParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .mail_service
            .batch_move_messages(&into_batch_items(params.items), &params.folder)
            .await
            .map_err(|e| map_core_error(&e, "Batch move messages"))?;
        json_result(&result, "batch result")
    }

    // ============ Calendar ============

    #[tool(
        description = "List events in a time window from one account or all accounts (including ICS and JSON calendar feeds), sorted by start time"
    )]
    async fn list_events(
        &self,
        Parameters(params): Parameters<ListEventsParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = event_query(&params)?;
        let result = self
            .calendar_service
            .list_events(params.account_id.as_deref(), &query)
            .await
            .map_err(|e| map_core_error(&e, "List events"))?;
        json_result(&result, "events")
    }

    #[tool(description = "Get a single calendar event")]
    async fn get_event(
        &self,
        Parameters(params): Parameters<EventRefParams>,
    ) -> Result<CallToolResult, McpError> {
        let event = self
            .calendar_service
            .get_event(&params.account_id, &params.event_id)
            .await
            .map_err(|e| map_core_error(&e, "Get event"))?;
        json_result(&event, "event")
    }

    #[tool(
        description = "Create a calendar event. Without account_id, uses the account owning the first attendee's domain"
    )]
    async fn create_event(
        &self,
        Parameters(params): Parameters<CreateEventParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = CreateEventRequest {
            title: params.title,
            start: parse_time(&params.start, "start")?,
            end: parse_time(&params.end, "end")?,
            all_day: params.all_day.unwrap_or(false),
            description: params.description,
            location: params.location,
            attendees: params.attendees.unwrap_or_default(),
        };
        let event = self
            .calendar_service
            .create_event(params.account_id.as_deref(), &request)
            .await
            .map_err(|e| map_core_error(&e, "Create event"))?;
        json_result(&event, "event")
    }

    #[tool(description = "Update a calendar event. Omitted fields are left unchanged")]
    async fn update_event(
        &self,
        Parameters(params): Parameters<UpdateEventParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = UpdateEventRequest {
            title: params.title,
            start: parse_optional_time(params.start.as_deref(), "start")?,
            end: parse_optional_time(params.end.as_deref(), "end")?,
            description: params.description,
            location: params.location,
            attendees: params.attendees,
        };
        let event = self
            .calendar_service
            .update_event(&params.account_id, &params.event_id, &request)
            .await
            .map_err(|e| map_core_error(&e, "Update event"))?;
        json_result(&event, "event")
    }

    #[tool(description = "Delete a calendar event")]
    async fn delete_event(
        &self,
        Parameters(params): Parameters<EventRefParams>,
    ) -> Result<CallToolResult, McpError> {
        self.calendar_service
            .delete_event(&params.account_id, &params.event_id)
            .await
            .map_err(|e| map_core_error(&e, "Delete event"))?;
        json_result(&ack(&params.account_id, &params.event_id), "result")
    }

    #[tool(description = "Accept, decline or tentatively accept a meeting invitation")]
    async fn respond_to_event(
        &self,
        Parameters(params): Parameters<RespondToEventParams>,
    ) -> Result<CallToolResult, McpError> {
        let response: EventResponse = params.response.parse().map_err(invalid_argument)?;
        self.calendar_service
            .respond_to_event(
                &params.account_id,
                &params.event_id,
                response,
                params.comment.as_deref(),
            )
            .await
            .map_err(|e| map_core_error(&e, "Respond to event"))?;
        json_result(&ack(&params.account_id, &params.event_id), "result")
    }

    #[tool(description = "Delete several events across accounts. Returns a per-item ledger")]
    async fn batch_delete_events(
        &self,
        Parameters(params): Parameters<BatchItemsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .calendar_service
            .batch_delete_events(&into_batch_items(params.items))
            .await
            .map_err(|e| map_core_error(&e, "Batch delete events"))?;
        json_result(&result, "batch result")
    }

    // ============ Contacts ============

    #[tool(description = "List contacts from one account or all accounts, sorted by name")]
    async fn list_contacts(
        &self,
        Parameters(params): Parameters<ListContactsParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = ContactQuery {
            limit: clamp_limit(params.limit, DEFAULT_CONTACT_LIMIT),
        };
        let result = self
            .contact_service
            .list_contacts(params.account_id.as_deref(), &query)
            .await
            .map_err(|e| map_core_error(&e, "List contacts"))?;
        json_result(&result, "contacts")
    }

    #[tool(description = "Search contacts by name or email in one account or all accounts")]
    async fn search_contacts(
        &self,
        Parameters(params): Parameters<SearchContactsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .contact_service
            .search_contacts(
                params.account_id.as_deref(),
                &params.query,
                clamp_limit(params.limit, DEFAULT_CONTACT_LIMIT),
            )
            .await
            .map_err(|e| map_core_error(&e, "Search contacts"))?;
        json_result(&result, "contacts")
    }

    #[tool(description = "Get a single contact")]
    async fn get_contact(
        &self,
        Parameters(params): Parameters<ContactRefParams>,
    ) -> Result<CallToolResult, McpError> {
        let contact = self
            .contact_service
            .get_contact(&params.account_id, &params.contact_id)
            .await
            .map_err(|e| map_core_error(&e, "Get contact"))?;
        json_result(&contact, "contact")
    }

    #[tool(
        description = "Create a contact. Without account_id, uses the account owning the first email's domain"
    )]
    async fn create_contact(
        &self,
        Parameters(params): Parameters<CreateContactParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = CreateContactRequest {
            display_name: params.display_name,
            given_name: params.given_name,
            family_name: params.family_name,
            emails: params.emails.unwrap_or_default(),
            phones: params.phones.unwrap_or_default(),
            company: params.company,
            job_title: params.job_title,
        };
        let contact = self
            .contact_service
            .create_contact(params.account_id.as_deref(), &request)
            .await
            .map_err(|e| map_core_error(&e, "Create contact"))?;
        json_result(&contact, "contact")
    }

    #[tool(description = "Update a contact. Omitted fields are left unchanged")]
    async fn update_contact(
        &self,
        Parameters(params): Parameters<UpdateContactParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = UpdateContactRequest {
            display_name: params.display_name,
            emails: params.emails,
            phones: params.phones,
            company: params.company,
            job_title: params.job_title,
        };
        let contact = self
            .contact_service
            .update_contact(&params.account_id, &params.contact_id, &request)
            .await
            .map_err(|e| map_core_error(&e, "Update contact"))?;
        json_result(&contact, "contact")
    }

    #[tool(description = "Delete a contact")]
    async fn delete_contact(
        &self,
        Parameters(params): Parameters<ContactRefParams>,
    ) -> Result<CallToolResult, McpError> {
        self.contact_service
            .delete_contact(&params.account_id, &params.contact_id)
            .await
            .map_err(|e| map_core_error(&e, "Delete contact"))?;
        json_result(&ack(&params.account_id, &params.contact_id), "result")
    }

    #[tool(description = "Delete several contacts across accounts. Returns a per-item ledger")]
    async fn batch_delete_contacts(
        &self,
        Parameters(params): Parameters<BatchItemsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = self
            .contact_service
            .batch_delete_contacts(&into_batch_items(params.items))
            .await
            .map_err(|e| map_core_error(&e, "Batch delete contacts"))?;
        json_result(&result, "batch result")
    }
}

#[tool_handler]
impl ServerHandler for MailcalOrchestratorMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Mailcal Orchestrator MCP Server - One view over several mail, calendar and contact accounts \
                 (Microsoft 365, Google Workspace, ICS feeds, JSON calendar files). \
                 Use list_accounts to see available accounts. \
                 Read tools (list_messages, list_events, list_contacts, search_*) query every enabled account \
                 when account_id is omitted and report failing accounts in warnings. \
                 Create tools pick an account by the recipient/attendee domain when account_id is omitted. \
                 Batch tools return a per-item ledger."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
#[path = "test_mocks.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod test_mocks;

#[cfg(test)]
#[path = "server_tests.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;

#[cfg(test)]
#[path = "client_integration_tests.rs"]
#[allow(clippy::unwrap_used, clippy::panic, clippy::expect_used)]
mod client_integration_tests;
