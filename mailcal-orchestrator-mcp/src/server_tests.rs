use super::test_mocks::*;
use super::*;

use mailcal_orchestrator_core::OrchestratorConfig;
use mailcal_orchestrator_provider::{ProviderCapabilities, ProviderError, ProviderType};
use rmcp::model::ErrorCode;

use crate::schemas::BatchItemParams;

fn error_kind(error: &McpError) -> Option<String> {
    error
        .data
        .as_ref()
        .and_then(|d| d.get("kind"))
        .and_then(|k| k.as_str())
        .map(str::to_string)
}

fn item(account_id: &str, item_id: &str) -> BatchItemParams {
    BatchItemParams {
        account_id: account_id.to_string(),
        item_id: item_id.to_string(),
    }
}

/// work@acme.com and home@gmail.com are hosted, holidays is a calendar feed.
fn mixed_fixture() -> (
    MailcalOrchestratorMcp,
    Arc<MockProvider>,
    Arc<MockProvider>,
    Arc<MockProvider>,
) {
    let outlook = Arc::new(
        MockProvider::hosted(ProviderType::Outlook)
            .with_message("work", "w1", "Quarterly report")
            .with_event("work", "e1", 2)
            .with_contact("work", "c1", "Bob"),
    );
    let google = Arc::new(
        MockProvider::hosted(ProviderType::Google)
            .with_message("home", "h1", "Dinner")
            .with_event("home", "e2", 1)
            .with_contact("home", "c2", "alice"),
    );
    let feed = Arc::new(
        MockProvider::new(ProviderType::Ics, ProviderCapabilities::CALENDAR_FEED)
            .with_event("holidays", "e3", 3),
    );
    let server = build_server(
        vec![
            test_account("work", "m365", &["acme.com"]).with_priority(10),
            test_account("home", "gmail", &["gmail.com"]),
            test_account("holidays", "webcal", &[]),
        ],
        &[
            (ProviderType::Outlook, Arc::clone(&outlook)),
            (ProviderType::Google, Arc::clone(&google)),
            (ProviderType::Ics, Arc::clone(&feed)),
        ],
    );
    (server, outlook, google, feed)
}

#[test]
fn sanitize_internal_error_hides_error_details() {
    let error = sanitize_internal_error("sensitive: token=123", "List messages");
    let message = error.to_string();
    assert!(message.contains("List messages failed"));
    assert!(!message.contains("token=123"));
}

#[test]
fn clamp_limit_applies_default_and_bounds() {
    assert_eq!(clamp_limit(None, 25), 25);
    assert_eq!(clamp_limit(Some(0), 25), 1);
    assert_eq!(clamp_limit(Some(999), 25), MAX_PAGE_LIMIT);
}

#[test]
fn event_query_defaults_to_a_week_from_start() {
    let params = ListEventsParams {
        account_id: None,
        start: Some("2025-06-01".to_string()),
        end: None,
        days: None,
        limit: Some(500),
    };
    let query = event_query(&params).unwrap();
    assert_eq!(query.end - query.start, Duration::days(7));
    assert_eq!(query.limit, MAX_PAGE_LIMIT);
}

#[test]
fn event_query_rejects_inverted_window() {
    let params = ListEventsParams {
        account_id: None,
        start: Some("2025-06-10T00:00:00Z".to_string()),
        end: Some("2025-06-01T00:00:00Z".to_string()),
        days: None,
        limit: None,
    };
    let error = event_query(&params).unwrap_err();
    assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
}

#[tokio::test]
async fn list_accounts_orders_by_priority() {
    let (server, ..) = mixed_fixture();

    let result = server
        .list_accounts(Parameters(ListAccountsParams {}))
        .await
        .unwrap();

    let json = result_json(&result);
    let ids: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["work", "holidays", "home"]);
}

#[tokio::test]
async fn list_providers_returns_every_backend() {
    let (server, ..) = mixed_fixture();

    let result = server
        .list_providers(Parameters(ListProvidersParams {}))
        .await
        .unwrap();

    assert_eq!(result_json(&result).as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn list_messages_reports_failing_account_as_warning() {
    let outlook = Arc::new(
        MockProvider::hosted(ProviderType::Outlook)
            .with_message("work", "w1", "Hello")
            .with_failure("w", ProviderError::unauthenticated("outlook", "w")),
    );
    let server = build_server(
        vec![
            test_account("work", "outlook", &["acme.com"]),
            test_account("w", "outlook", &[]),
        ],
        &[(ProviderType::Outlook, Arc::clone(&outlook))],
    );

    let result = server
        .list_messages(Parameters(ListMessagesParams {
            account_id: None,
            folder: None,
            unread_only: None,
            limit: Some(999),
        }))
        .await
        .unwrap();

    let json = result_json(&result);
    assert_eq!(json["items"].as_array().unwrap().len(), 1);
    let warnings = json["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["accountId"], "w");
    assert_eq!(warnings[0]["error"]["kind"], "unauthenticated");
}

#[tokio::test]
async fn list_messages_skips_feeds_without_warning() {
    let (server, _, _, feed) = mixed_fixture();

    let result = server
        .list_messages(Parameters(ListMessagesParams {
            account_id: Some("all".to_string()),
            folder: None,
            unread_only: None,
            limit: None,
        }))
        .await
        .unwrap();

    let json = result_json(&result);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert!(json["warnings"].as_array().unwrap().is_empty());
    assert_eq!(feed.calls(), 0);
}

#[tokio::test]
async fn get_message_unknown_account_is_invalid_params() {
    let (server, ..) = mixed_fixture();

    let error = server
        .get_message(Parameters(MessageRefParams {
            account_id: "nope".to_string(),
            message_id: "m1".to_string(),
        }))
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    assert_eq!(error_kind(&error).as_deref(), Some("not_found"));
    assert!(error.message.contains("nope"));
}

#[tokio::test]
async fn backend_failure_carries_kind_and_detail() {
    let outlook = Arc::new(MockProvider::hosted(ProviderType::Outlook).with_failure(
        "work",
        ProviderError::RemoteError {
            provider: "outlook".to_string(),
            status: Some(400),
            raw_code: Some("ErrorInvalidRecipients".to_string()),
            raw_message: "At least one recipient is not valid.".to_string(),
        },
    ));
    let server = build_server(
        vec![test_account("work", "outlook", &["acme.com"])],
        &[(ProviderType::Outlook, outlook)],
    );

    let error = server
        .get_message(Parameters(MessageRefParams {
            account_id: "work".to_string(),
            message_id: "w1".to_string(),
        }))
        .await
        .unwrap_err();

    assert_eq!(error_kind(&error).as_deref(), Some("remote_operation_failure"));
    assert!(error.message.contains("Get message failed"));
    assert!(error.message.contains("recipient is not valid"));
    let data = error.data.unwrap();
    assert_eq!(data["provider"], "outlook");
    assert_eq!(data["status"], 400);
    assert_eq!(data["raw_code"], "ErrorInvalidRecipients");
    assert_eq!(data["raw_message"], "At least one recipient is not valid.");
}

#[tokio::test]
async fn transient_failure_carries_kind() {
    let outlook = Arc::new(MockProvider::hosted(ProviderType::Outlook).with_failure(
        "work",
        ProviderError::Timeout {
            provider: "outlook".to_string(),
            detail: "operation timed out".to_string(),
        },
    ));
    let server = build_server(
        vec![test_account("work", "outlook", &["acme.com"])],
        &[(ProviderType::Outlook, outlook)],
    );

    let error = server
        .delete_event(Parameters(EventRefParams {
            account_id: "work".to_string(),
            event_id: "e1".to_string(),
        }))
        .await
        .unwrap_err();

    assert_eq!(error_kind(&error).as_deref(), Some("transient_fetch_failure"));
    assert!(error.message.contains("timed out"));
}

#[test]
fn configuration_error_is_sanitized_but_keeps_kind() {
    let error = map_core_error(
        &CoreError::ConfigurationError("secret path /home/x".to_string()),
        "List accounts",
    );
    assert_eq!(error.code, ErrorCode::INTERNAL_ERROR);
    assert!(!error.message.contains("/home/x"));
    assert_eq!(error_kind(&error).as_deref(), Some("validation_failure"));
}

#[tokio::test]
async fn send_message_routes_by_recipient_domain() {
    let (server, outlook, google, _) = mixed_fixture();

    let result = server
        .send_message(Parameters(SendMessageParams {
            account_id: None,
            to: vec!["Carol <carol@Gmail.com>".to_string()],
            cc: None,
            bcc: None,
            subject: "Lunch".to_string(),
            body: "Tomorrow?".to_string(),
            html: None,
        }))
        .await
        .unwrap();

    assert_eq!(result_json(&result)["accountId"], "home");
    assert_eq!(google.writes(), vec!["send:home:Lunch".to_string()]);
    assert!(outlook.writes().is_empty());
}

#[tokio::test]
async fn send_message_without_recipient_is_rejected() {
    let (server, outlook, google, _) = mixed_fixture();

    let error = server
        .send_message(Parameters(SendMessageParams {
            account_id: None,
            to: Vec::new(),
            cc: None,
            bcc: None,
            subject: "Nobody".to_string(),
            body: String::new(),
            html: None,
        }))
        .await
        .unwrap_err();

    assert_eq!(error_kind(&error).as_deref(), Some("validation_failure"));
    assert_eq!(outlook.calls() + google.calls(), 0);
}

#[tokio::test]
async fn list_events_merges_feeds_sorted_by_start() {
    let (server, ..) = mixed_fixture();

    let result = server
        .list_events(Parameters(ListEventsParams {
            account_id: None,
            start: None,
            end: None,
            days: Some(1),
            limit: None,
        }))
        .await
        .unwrap();

    let json = result_json(&result);
    let ids: Vec<_> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["e2", "e1", "e3"]);
}

#[tokio::test]
async fn list_events_rejects_unparseable_start() {
    let (server, ..) = mixed_fixture();

    let error = server
        .list_events(Parameters(ListEventsParams {
            account_id: None,
            start: Some("next tuesday".to_string()),
            end: None,
            days: None,
            limit: None,
        }))
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    assert!(error.message.contains("next tuesday"));
}

#[tokio::test]
async fn create_event_on_feed_is_unsupported() {
    let (server, _, _, feed) = mixed_fixture();

    let error = server
        .create_event(Parameters(CreateEventParams {
            account_id: Some("holidays".to_string()),
            title: "Party".to_string(),
            start: "2025-06-01T18:00:00Z".to_string(),
            end: "2025-06-01T20:00:00Z".to_string(),
            all_day: None,
            description: None,
            location: None,
            attendees: None,
        }))
        .await
        .unwrap_err();

    assert_eq!(error_kind(&error).as_deref(), Some("unsupported"));
    assert!(feed.writes().is_empty());
}

#[tokio::test]
async fn respond_to_event_parses_response() {
    let (server, outlook, ..) = mixed_fixture();

    server
        .respond_to_event(Parameters(RespondToEventParams {
            account_id: "work".to_string(),
            event_id: "e1".to_string(),
            response: "Maybe".to_string(),
            comment: None,
        }))
        .await
        .unwrap();
    assert_eq!(outlook.writes(), vec!["respond[tentative]:work:e1".to_string()]);

    let error = server
        .respond_to_event(Parameters(RespondToEventParams {
            account_id: "work".to_string(),
            event_id: "e1".to_string(),
            response: "whenever".to_string(),
            comment: None,
        }))
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    assert_eq!(outlook.writes().len(), 1);
}

#[tokio::test]
async fn batch_delete_events_returns_full_ledger() {
    let (server, outlook, google, _) = mixed_fixture();

    let result = server
        .batch_delete_events(Parameters(BatchItemsParams {
            items: vec![item("work", "e1"), item("work", "missing"), item("home", "e2")],
        }))
        .await
        .unwrap();

    let json = result_json(&result);
    assert_eq!(json["requested"], 3);
    assert_eq!(json["succeeded"], 2);
    assert_eq!(json["failed"], 1);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[1]["itemId"], "missing");
    assert_eq!(results[1]["success"], false);
    assert_eq!(results[1]["error"]["kind"], "not_found");
    assert_eq!(outlook.writes(), vec!["delete_event:work:e1".to_string()]);
    assert_eq!(google.writes(), vec!["delete_event:home:e2".to_string()]);
}

#[tokio::test]
async fn batch_over_limit_is_rejected_without_calls() {
    let outlook = Arc::new(MockProvider::hosted(ProviderType::Outlook));
    let server = build_server_with_config(
        vec![test_account("work", "outlook", &["acme.com"])],
        &[(ProviderType::Outlook, Arc::clone(&outlook))],
        OrchestratorConfig::default().with_batch_max_items(2),
    );

    let error = server
        .batch_delete_messages(Parameters(BatchItemsParams {
            items: vec![item("work", "1"), item("work", "2"), item("work", "3")],
        }))
        .await
        .unwrap_err();

    assert_eq!(error_kind(&error).as_deref(), Some("validation_failure"));
    assert_eq!(outlook.calls(), 0);
}

#[tokio::test]
async fn list_contacts_sorts_across_accounts() {
    let (server, ..) = mixed_fixture();

    let result = server
        .list_contacts(Parameters(ListContactsParams {
            account_id: None,
            limit: None,
        }))
        .await
        .unwrap();

    let json = result_json(&result);
    let names: Vec<_> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["displayName"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["alice", "Bob"]);
    assert!(json["warnings"].as_array().unwrap().is_empty());
}
