//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use mailcal_orchestrator_provider::{
    Account, CalendarEvent, Capability, CapabilityProvider, Contact, ContactQuery,
    CreateContactRequest, CreateEventRequest, EmailAddress, EventQuery, EventResponse,
    EventStatus, Message, MessageQuery, OutgoingMessage, ProviderCapabilities, ProviderError,
    ProviderMetadata, ProviderType, Result, TokenProvider, UpdateContactRequest,
    UpdateEventRequest,
};

use crate::config::OrchestratorConfig;
use crate::resolver::ProviderResolver;
use crate::registry::AccountRegistry;
use crate::services::ServiceContext;

// ===== NoTokens =====

/// Token source that never has a token.
pub struct NoTokens;

#[async_trait]
impl TokenProvider for NoTokens {
    async fn bearer_token(&self, _account_id: &str, _scopes: &[&str]) -> Option<String> {
        None
    }
}

// ===== MockProvider =====

/// In-memory provider with failure injection and call accounting.
pub struct MockProvider {
    ty: ProviderType,
    capabilities: ProviderCapabilities,
    messages: Mutex<Vec<Message>>,
    events: Mutex<Vec<CalendarEvent>>,
    contacts: Mutex<Vec<Contact>>,
    /// 小写账户 ID → 注入的错误
    failing_accounts: Mutex<HashMap<String, ProviderError>>,
    failing_items: Mutex<HashMap<String, ProviderError>>,
    delays: Mutex<HashMap<String, Duration>>,
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    writes: Mutex<Vec<String>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockProvider {
    pub fn new(ty: ProviderType, capabilities: ProviderCapabilities) -> Self {
        Self {
            ty,
            capabilities,
            messages: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            contacts: Mutex::new(Vec::new()),
            failing_accounts: Mutex::new(HashMap::new()),
            failing_items: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Read-write mail, calendar and contacts.
    pub fn hosted(ty: ProviderType) -> Self {
        Self::new(ty, ProviderCapabilities::HOSTED)
    }

    pub fn add_message(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }

    pub fn add_event(&self, event: CalendarEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn add_contact(&self, contact: Contact) {
        self.contacts.lock().unwrap().push(contact);
    }

    /// Every call for `account_id` fails with `error`.
    pub fn fail_account(&self, account_id: &str, error: ProviderError) {
        self.failing_accounts
            .lock()
            .unwrap()
            .insert(account_id.to_lowercase(), error);
    }

    /// Every call addressing `item_id` fails with `error`.
    pub fn fail_item(&self, item_id: &str, error: ProviderError) {
        self.failing_items
            .lock()
            .unwrap()
            .insert(item_id.to_string(), error);
    }

    /// Every call for `account_id` sleeps before answering.
    pub fn delay_account(&self, account_id: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(account_id.to_lowercase(), delay);
    }

    /// Provider calls made so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// `(account_id, message)` per successful send.
    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    /// `operation:account:item` per successful mutation.
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn record(&self, operation: &str, account: &Account, item: &str) {
        self.writes
            .lock()
            .unwrap()
            .push(format!("{operation}:{}:{item}", account.id));
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Common prologue of every call: accounting, capability check, delay, injected failures.
    async fn enter(
        &self,
        operation: &str,
        account: &Account,
        capability: Capability,
        write: bool,
        item: Option<&str>,
    ) -> Result<InFlight<'_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let supported = if write {
            self.capabilities.supports_writes(capability)
        } else {
            self.capabilities.supports(capability)
        };
        if !supported {
            return Err(self.unsupported(operation));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let key = account.id.to_lowercase();
        let delay = self.delays.lock().unwrap().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failing_accounts.lock().unwrap().get(&key) {
            return Err(err.clone());
        }
        if let Some(err) = item.and_then(|id| self.failing_items.lock().unwrap().get(id).cloned()) {
            return Err(err);
        }
        Ok(guard)
    }

    fn owned_by<'a, T>(items: &'a [T], account: &Account, owner: impl Fn(&T) -> &str) -> Vec<&'a T> {
        items
            .iter()
            .filter(|i| owner(i).eq_ignore_ascii_case(&account.id))
            .collect()
    }

    fn not_found(&self, resource: &str, id: &str) -> ProviderError {
        ProviderError::not_found(self.ty.as_str(), resource, id)
    }
}

#[async_trait]
impl CapabilityProvider for MockProvider {
    fn provider_type(&self) -> ProviderType {
        self.ty
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Outlook,
            name: "Mock".to_string(),
            description: "In-memory test provider".to_string(),
            aliases: Vec::new(),
            capabilities: ProviderCapabilities::HOSTED,
            config_keys: Vec::new(),
        }
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    async fn list_messages(&self, account: &Account, query: &MessageQuery) -> Result<Vec<Message>> {
        let _guard = self
            .enter("list_messages", account, Capability::Mail, false, None)
            .await?;
        let messages = self.messages.lock().unwrap();
        Ok(Self::owned_by(&messages[..], account, |m| m.account_id.as_str())
            .into_iter()
            .filter(|m| !query.unread_only || !m.is_read)
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn search_messages(&self, account: &Account, text: &str, limit: u32) -> Result<Vec<Message>> {
        let _guard = self
            .enter("search_messages", account, Capability::Mail, false, None)
            .await?;
        let text = text.to_lowercase();
        let messages = self.messages.lock().unwrap();
        Ok(Self::owned_by(&messages[..], account, |m| m.account_id.as_str())
            .into_iter()
            .filter(|m| m.subject.to_lowercase().contains(&text))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_message(&self, account: &Account, message_id: &str) -> Result<Message> {
        let _guard = self
            .enter("get_message", account, Capability::Mail, false, Some(message_id))
            .await?;
        let messages = self.messages.lock().unwrap();
        Self::owned_by(&messages[..], account, |m| m.account_id.as_str())
            .into_iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| self.not_found("message", message_id))
    }

    async fn send_message(&self, account: &Account, message: &OutgoingMessage) -> Result<()> {
        let _guard = self
            .enter("send_message", account, Capability::Mail, true, None)
            .await?;
        self.sent
            .lock()
            .unwrap()
            .push((account.id.clone(), message.clone()));
        Ok(())
    }

    async fn delete_message(&self, account: &Account, message_id: &str) -> Result<()> {
        let _guard = self
            .enter("delete_message", account, Capability::Mail, true, Some(message_id))
            .await?;
        self.record("delete_message", account, message_id);
        Ok(())
    }

    async fn mark_message(&self, account: &Account, message_id: &str, read: bool) -> Result<()> {
        let _guard = self
            .enter("mark_message", account, Capability::Mail, true, Some(message_id))
            .await?;
        self.record(if read { "mark_read" } else { "mark_unread" }, account, message_id);
        Ok(())
    }

    async fn move_message(&self, account: &Account, message_id: &str, folder: &str) -> Result<()> {
        let _guard = self
            .enter("move_message", account, Capability::Mail, true, Some(message_id))
            .await?;
        self.record(&format!("move_message[{folder}]"), account, message_id);
        Ok(())
    }

    async fn list_events(&self, account: &Account, query: &EventQuery) -> Result<Vec<CalendarEvent>> {
        let _guard = self
            .enter("list_events", account, Capability::Calendar, false, None)
            .await?;
        let events = self.events.lock().unwrap();
        Ok(Self::owned_by(&events[..], account, |e| e.account_id.as_str())
            .into_iter()
            .filter(|e| query.overlaps(e))
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn get_event(&self, account: &Account, event_id: &str) -> Result<CalendarEvent> {
        let _guard = self
            .enter("get_event", account, Capability::Calendar, false, Some(event_id))
            .await?;
        let events = self.events.lock().unwrap();
        Self::owned_by(&events[..], account, |e| e.account_id.as_str())
            .into_iter()
            .find(|e| e.id == event_id)
            .cloned()
            .ok_or_else(|| self.not_found("event", event_id))
    }

    async fn create_event(&self, account: &Account, req: &CreateEventRequest) -> Result<CalendarEvent> {
        let _guard = self
            .enter("create_event", account, Capability::Calendar, true, None)
            .await?;
        let mut event = test_event(&account.id, &self.next_id("evt"), 0);
        event.title.clone_from(&req.title);
        event.start = req.start;
        event.end = req.end;
        event.all_day = req.all_day;
        event.description.clone_from(&req.description);
        event.location.clone_from(&req.location);
        self.record("create_event", account, &event.id);
        self.events.lock().unwrap().push(event.clone());
        Ok(event)
    }

    async fn update_event(
        &self,
        account: &Account,
        event_id: &str,
        req: &UpdateEventRequest,
    ) -> Result<CalendarEvent> {
        let _guard = self
            .enter("update_event", account, Capability::Calendar, true, Some(event_id))
            .await?;
        let mut events = self.events.lock().unwrap();
        let event = events
            .iter_mut()
            .find(|e| e.id == event_id && e.account_id.eq_ignore_ascii_case(&account.id))
            .ok_or_else(|| self.not_found("event", event_id))?;
        if let Some(title) = &req.title {
            event.title.clone_from(title);
        }
        if let Some(start) = req.start {
            event.start = start;
        }
        if let Some(end) = req.end {
            event.end = end;
        }
        if req.location.is_some() {
            event.location.clone_from(&req.location);
        }
        Ok(event.clone())
    }

    async fn delete_event(&self, account: &Account, event_id: &str) -> Result<()> {
        let _guard = self
            .enter("delete_event", account, Capability::Calendar, true, Some(event_id))
            .await?;
        self.record("delete_event", account, event_id);
        Ok(())
    }

    async fn respond_to_event(
        &self,
        account: &Account,
        event_id: &str,
        response: EventResponse,
        _comment: Option<&str>,
    ) -> Result<()> {
        let _guard = self
            .enter("respond_to_event", account, Capability::Calendar, true, Some(event_id))
            .await?;
        self.record(&format!("respond[{response}]"), account, event_id);
        Ok(())
    }

    async fn list_contacts(&self, account: &Account, query: &ContactQuery) -> Result<Vec<Contact>> {
        let _guard = self
            .enter("list_contacts", account, Capability::Contacts, false, None)
            .await?;
        let contacts = self.contacts.lock().unwrap();
        Ok(Self::owned_by(&contacts[..], account, |c| c.account_id.as_str())
            .into_iter()
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn search_contacts(&self, account: &Account, text: &str, limit: u32) -> Result<Vec<Contact>> {
        let _guard = self
            .enter("search_contacts", account, Capability::Contacts, false, None)
            .await?;
        let text = text.to_lowercase();
        let contacts = self.contacts.lock().unwrap();
        Ok(Self::owned_by(&contacts[..], account, |c| c.account_id.as_str())
            .into_iter()
            .filter(|c| {
                c.display_name.to_lowercase().contains(&text)
                    || c.emails.iter().any(|e| e.to_lowercase().contains(&text))
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_contact(&self, account: &Account, contact_id: &str) -> Result<Contact> {
        let _guard = self
            .enter("get_contact", account, Capability::Contacts, false, Some(contact_id))
            .await?;
        let contacts = self.contacts.lock().unwrap();
        Self::owned_by(&contacts[..], account, |c| c.account_id.as_str())
            .into_iter()
            .find(|c| c.id == contact_id)
            .cloned()
            .ok_or_else(|| self.not_found("contact", contact_id))
    }

    async fn create_contact(&self, account: &Account, req: &CreateContactRequest) -> Result<Contact> {
        let _guard = self
            .enter("create_contact", account, Capability::Contacts, true, None)
            .await?;
        let contact = Contact {
            id: self.next_id("contact"),
            account_id: account.id.clone(),
            display_name: req.display_name.clone(),
            emails: req.emails.clone(),
            phones: req.phones.clone(),
            company: req.company.clone(),
            job_title: req.job_title.clone(),
        };
        self.record("create_contact", account, &contact.id);
        self.contacts.lock().unwrap().push(contact.clone());
        Ok(contact)
    }

    async fn update_contact(
        &self,
        account: &Account,
        contact_id: &str,
        req: &UpdateContactRequest,
    ) -> Result<Contact> {
        let _guard = self
            .enter("update_contact", account, Capability::Contacts, true, Some(contact_id))
            .await?;
        let mut contacts = self.contacts.lock().unwrap();
        let contact = contacts
            .iter_mut()
            .find(|c| c.id == contact_id && c.account_id.eq_ignore_ascii_case(&account.id))
            .ok_or_else(|| self.not_found("contact", contact_id))?;
        if let Some(name) = &req.display_name {
            contact.display_name.clone_from(name);
        }
        if let Some(emails) = &req.emails {
            contact.emails.clone_from(emails);
        }
        Ok(contact.clone())
    }

    async fn delete_contact(&self, account: &Account, contact_id: &str) -> Result<()> {
        let _guard = self
            .enter("delete_contact", account, Capability::Contacts, true, Some(contact_id))
            .await?;
        self.record("delete_contact", account, contact_id);
        Ok(())
    }
}

// ===== 工厂方法 =====

/// Enabled account with the given domains.
pub fn test_account(id: &str, provider: &str, domains: &[&str]) -> Account {
    Account::new(id, provider).with_domains(domains.iter().copied())
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

/// Unread message received `hours` after a fixed base time.
pub fn test_message(account_id: &str, id: &str, hours: i64) -> Message {
    Message {
        id: id.to_string(),
        account_id: account_id.to_string(),
        thread_id: None,
        subject: format!("Subject {id}"),
        from: Some(EmailAddress::new("sender@example.com")),
        to: vec![EmailAddress::new(format!("{account_id}@example.com"))],
        cc: Vec::new(),
        received_at: Some(base_time() + chrono::Duration::hours(hours)),
        snippet: None,
        body: None,
        is_read: false,
        folder: Some("inbox".to_string()),
        has_attachments: false,
    }
}

/// One-hour event starting `hours` after a fixed base time.
pub fn test_event(account_id: &str, id: &str, hours: i64) -> CalendarEvent {
    let start = base_time() + chrono::Duration::hours(hours);
    CalendarEvent {
        id: id.to_string(),
        account_id: account_id.to_string(),
        title: format!("Event {id}"),
        description: None,
        location: None,
        start,
        end: start + chrono::Duration::hours(1),
        all_day: false,
        organizer: None,
        attendees: Vec::new(),
        status: EventStatus::Confirmed,
        web_link: None,
        read_only: false,
    }
}

/// Window covering every [`test_event`] within a week of the base time.
pub fn test_event_window() -> EventQuery {
    EventQuery {
        start: base_time() - chrono::Duration::days(1),
        end: base_time() + chrono::Duration::days(7),
        limit: 50,
    }
}

pub fn test_contact(account_id: &str, id: &str, name: &str) -> Contact {
    Contact {
        id: id.to_string(),
        account_id: account_id.to_string(),
        display_name: name.to_string(),
        emails: vec![format!("{}@example.com", name.to_lowercase().replace(' ', "."))],
        phones: Vec::new(),
        company: None,
        job_title: None,
    }
}

/// 创建测试用 `ServiceContext`
pub fn create_test_context(
    accounts: Vec<Account>,
    providers: &[(ProviderType, Arc<MockProvider>)],
) -> Arc<ServiceContext> {
    let resolver = providers
        .iter()
        .fold(ProviderResolver::empty(), |resolver, (ty, mock)| {
            resolver.with_provider(*ty, Arc::clone(mock) as Arc<dyn CapabilityProvider>)
        });
    Arc::new(ServiceContext::new(
        Arc::new(AccountRegistry::with_accounts(accounts)),
        Arc::new(resolver),
        OrchestratorConfig::default(),
    ))
}
