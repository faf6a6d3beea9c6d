use super::*;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mailcal_orchestrator_core::{AccountRegistry, OrchestratorConfig, ProviderResolver};
use mailcal_orchestrator_provider::{
    Account, CalendarEvent, CapabilityProvider, Contact, EventStatus, Message,
    ProviderCapabilities, ProviderError, ProviderMetadata, ProviderType, Result as ProviderResult,
};

/// In-memory provider serving canned items, with per-account failures.
pub struct MockProvider {
    provider_type: ProviderType,
    capabilities: ProviderCapabilities,
    messages: Mutex<Vec<Message>>,
    events: Mutex<Vec<CalendarEvent>>,
    contacts: Mutex<Vec<Contact>>,
    failures: Mutex<HashMap<String, ProviderError>>,
    writes: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(provider_type: ProviderType, capabilities: ProviderCapabilities) -> Self {
        Self {
            provider_type,
            capabilities,
            messages: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            contacts: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn hosted(provider_type: ProviderType) -> Self {
        Self::new(provider_type, ProviderCapabilities::HOSTED)
    }

    pub fn with_message(self, account_id: &str, id: &str, subject: &str) -> Self {
        self.messages.lock().unwrap().push(Message {
            id: id.to_string(),
            account_id: account_id.to_string(),
            thread_id: None,
            subject: subject.to_string(),
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            received_at: Some(Utc::now()),
            snippet: None,
            body: Some(format!("body of {id}")),
            is_read: false,
            folder: Some("inbox".to_string()),
            has_attachments: false,
        });
        self
    }

    pub fn with_event(self, account_id: &str, id: &str, hours_from_now: i64) -> Self {
        let start = Utc::now() + Duration::hours(hours_from_now);
        self.events.lock().unwrap().push(CalendarEvent {
            id: id.to_string(),
            account_id: account_id.to_string(),
            title: format!("Event {id}"),
            description: None,
            location: None,
            start,
            end: start + Duration::hours(1),
            all_day: false,
            organizer: None,
            attendees: Vec::new(),
            status: EventStatus::Confirmed,
            web_link: None,
            read_only: !self.capabilities.writable,
        });
        self
    }

    pub fn with_contact(self, account_id: &str, id: &str, name: &str) -> Self {
        self.contacts.lock().unwrap().push(Contact {
            id: id.to_string(),
            account_id: account_id.to_string(),
            display_name: name.to_string(),
            emails: vec![format!("{}@example.com", name.to_lowercase())],
            phones: Vec::new(),
            company: None,
            job_title: None,
        });
        self
    }

    /// Every call for `account_id` fails with `error`.
    pub fn with_failure(self, account_id: &str, error: ProviderError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(account_id.to_string(), error);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn enter(&self, account: &Account) -> ProviderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.lock().unwrap().get(&account.id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn record(&self, op: &str, account: &Account, item_id: &str) {
        self.writes
            .lock()
            .unwrap()
            .push(format!("{op}:{}:{item_id}", account.id));
    }

    fn not_found(&self, resource: &str, id: &str) -> ProviderError {
        ProviderError::not_found(self.provider_type.as_str(), resource, id)
    }
}

#[async_trait]
impl CapabilityProvider for MockProvider {
    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Outlook,
            name: "Mock".to_string(),
            description: "Test provider".to_string(),
            aliases: Vec::new(),
            capabilities: ProviderCapabilities::HOSTED,
            config_keys: Vec::new(),
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    async fn list_messages(
        &self,
        account: &Account,
        query: &MessageQuery,
    ) -> ProviderResult<Vec<Message>> {
        if !self.capabilities.mail {
            return Err(self.unsupported("list_messages"));
        }
        self.enter(account)?;
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.account_id == account.id)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn get_message(&self, account: &Account, message_id: &str) -> ProviderResult<Message> {
        self.enter(account)?;
        self.messages
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.account_id == account.id && m.id == message_id)
            .cloned()
            .ok_or_else(|| self.not_found("message", message_id))
    }

    async fn send_message(&self, account: &Account, message: &OutgoingMessage) -> ProviderResult<()> {
        if !self.capabilities.writable {
            return Err(self.unsupported("send_message"));
        }
        self.enter(account)?;
        self.record("send", account, &message.subject);
        Ok(())
    }

    async fn delete_message(&self, account: &Account, message_id: &str) -> ProviderResult<()> {
        if !self.capabilities.writable {
            return Err(self.unsupported("delete_message"));
        }
        self.enter(account)?;
        self.record("delete_message", account, message_id);
        Ok(())
    }

    async fn list_events(
        &self,
        account: &Account,
        query: &EventQuery,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        self.enter(account)?;
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.account_id == account.id && query.overlaps(e))
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn get_event(&self, account: &Account, event_id: &str) -> ProviderResult<CalendarEvent> {
        self.enter(account)?;
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.account_id == account.id && e.id == event_id)
            .cloned()
            .ok_or_else(|| self.not_found("event", event_id))
    }

    async fn create_event(
        &self,
        account: &Account,
        req: &CreateEventRequest,
    ) -> ProviderResult<CalendarEvent> {
        if !self.capabilities.writable {
            return Err(self.unsupported("create_event"));
        }
        self.enter(account)?;
        self.record("create_event", account, &req.title);
        Ok(CalendarEvent {
            id: format!("new-{}", self.writes().len()),
            account_id: account.id.clone(),
            title: req.title.clone(),
            description: req.description.clone(),
            location: req.location.clone(),
            start: req.start,
            end: req.end,
            all_day: req.all_day,
            organizer: None,
            attendees: Vec::new(),
            status: EventStatus::Confirmed,
            web_link: None,
            read_only: false,
        })
    }

    async fn delete_event(&self, account: &Account, event_id: &str) -> ProviderResult<()> {
        if !self.capabilities.writable {
            return Err(self.unsupported("delete_event"));
        }
        self.enter(account)?;
        if event_id == "missing" {
            return Err(self.not_found("event", event_id));
        }
        self.record("delete_event", account, event_id);
        Ok(())
    }

    async fn respond_to_event(
        &self,
        account: &Account,
        event_id: &str,
        response: EventResponse,
        _comment: Option<&str>,
    ) -> ProviderResult<()> {
        if !self.capabilities.writable {
            return Err(self.unsupported("respond_to_event"));
        }
        self.enter(account)?;
        self.record(&format!("respond[{response}]"), account, event_id);
        Ok(())
    }

    async fn list_contacts(
        &self,
        account: &Account,
        query: &ContactQuery,
    ) -> ProviderResult<Vec<Contact>> {
        if !self.capabilities.contacts {
            return Err(self.unsupported("list_contacts"));
        }
        self.enter(account)?;
        Ok(self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.account_id == account.id)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }
}

/// Enabled account with the given provider tag and domains.
pub fn test_account(id: &str, provider: &str, domains: &[&str]) -> Account {
    Account::new(id, provider).with_domains(domains.iter().copied())
}

/// Build a server over `accounts`, resolving each provider type to its mock.
pub(super) fn build_server(
    accounts: Vec<Account>,
    providers: &[(ProviderType, Arc<MockProvider>)],
) -> MailcalOrchestratorMcp {
    build_server_with_config(accounts, providers, OrchestratorConfig::default())
}

pub(super) fn build_server_with_config(
    accounts: Vec<Account>,
    providers: &[(ProviderType, Arc<MockProvider>)],
    config: OrchestratorConfig,
) -> MailcalOrchestratorMcp {
    let registry = Arc::new(AccountRegistry::with_accounts(accounts));
    let resolver = providers
        .iter()
        .fold(ProviderResolver::empty(), |resolver, (ty, provider)| {
            resolver.with_provider(*ty, Arc::clone(provider) as Arc<dyn CapabilityProvider>)
        });
    let ctx = Arc::new(ServiceContext::new(registry, Arc::new(resolver), config));
    MailcalOrchestratorMcp::new(&ctx)
}

/// Extract the JSON body of a successful tool result.
pub(super) fn result_json(result: &CallToolResult) -> serde_json::Value {
    let text = result
        .content
        .first()
        .and_then(|c| c.raw.as_text())
        .map(|t| t.text.clone())
        .unwrap();
    serde_json::from_str(&text).unwrap()
}
