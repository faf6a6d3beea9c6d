use super::test_mocks::*;
use super::*;

use mailcal_orchestrator_provider::{Account, ProviderType};
use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParams;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type Client = rmcp::service::RunningService<rmcp::RoleClient, ()>;

/// Spawn a MCP server and connect a client via in-memory duplex transport.
async fn spawn_client_server(
    accounts: Vec<Account>,
    providers: &[(ProviderType, Arc<MockProvider>)],
) -> (Client, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let (server_transport, client_transport) = tokio::io::duplex(4096);

    let server = build_server(accounts, providers);

    let server_handle = tokio::spawn(async move {
        server.serve(server_transport).await?.waiting().await?;
        anyhow::Ok(())
    });

    let client = ().serve(client_transport).await.unwrap();
    (client, server_handle)
}

async fn spawn_default() -> (Client, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let outlook = Arc::new(
        MockProvider::hosted(ProviderType::Outlook)
            .with_message("work", "w1", "Hello")
            .with_event("work", "e1", 1),
    );
    spawn_client_server(
        vec![test_account("work", "outlook", &["acme.com"])],
        &[(ProviderType::Outlook, outlook)],
    )
    .await
}

fn call_params(name: &str, args: &serde_json::Value) -> CallToolRequestParams {
    CallToolRequestParams {
        meta: None,
        name: name.to_string().into(),
        arguments: args.as_object().cloned(),
        task: None,
    }
}

// ===========================================================================
// Scenario 1: initialize handshake
// ===========================================================================

#[tokio::test]
async fn client_connects_and_receives_server_info() -> anyhow::Result<()> {
    let (client, server_handle) = spawn_default().await;

    let server_info = client
        .peer_info()
        .expect("server info should be set after handshake");

    assert_eq!(server_info.protocol_version, ProtocolVersion::LATEST);
    assert!(server_info.capabilities.tools.is_some());
    let instructions = server_info.instructions.as_deref().unwrap_or("");
    assert!(instructions.contains("list_accounts"));

    client.cancel().await?;
    server_handle.await??;
    Ok(())
}

// ===========================================================================
// Scenario 2: tools/list
// ===========================================================================

const EXPECTED_TOOL_NAMES: &[&str] = &[
    "list_accounts",
    "account_status",
    "list_providers",
    "list_messages",
    "search_messages",
    "get_message",
    "send_message",
    "mark_message",
    "move_message",
    "delete_message",
    "batch_delete_messages",
    "batch_mark_messages",
    "batch_move_messages",
    "list_events",
    "get_event",
    "create_event",
    "update_event",
    "delete_event",
    "respond_to_event",
    "batch_delete_events",
    "list_contacts",
    "search_contacts",
    "get_contact",
    "create_contact",
    "update_contact",
    "delete_contact",
    "batch_delete_contacts",
];

#[tokio::test]
async fn tools_list_returns_every_tool() -> anyhow::Result<()> {
    let (client, server_handle) = spawn_default().await;

    let tools = client.list_all_tools().await?;
    assert_eq!(tools.len(), EXPECTED_TOOL_NAMES.len());

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
    for expected in EXPECTED_TOOL_NAMES {
        assert!(names.contains(expected), "missing tool: {expected}");
    }

    client.cancel().await?;
    server_handle.await??;
    Ok(())
}

#[tokio::test]
async fn required_params_are_declared_in_schema() -> anyhow::Result<()> {
    let (client, server_handle) = spawn_default().await;

    let tools = client.list_all_tools().await?;
    let required = |name: &str| -> Vec<String> {
        tools
            .iter()
            .find(|t| t.name == name)
            .and_then(|t| t.input_schema.get("required"))
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };

    // 可选的 account_id 不应出现在 required 中
    assert!(!required("list_messages").contains(&"account_id".to_string()));
    assert!(required("get_message").contains(&"account_id".to_string()));
    assert!(required("get_message").contains(&"message_id".to_string()));
    assert!(required("batch_delete_events").contains(&"items".to_string()));
    assert!(required("respond_to_event").contains(&"response".to_string()));

    client.cancel().await?;
    server_handle.await??;
    Ok(())
}

// ===========================================================================
// Scenario 3: tools/call
// ===========================================================================

#[tokio::test]
async fn call_list_messages_returns_items_and_warnings() -> anyhow::Result<()> {
    let (client, server_handle) = spawn_default().await;

    let result = client
        .call_tool(call_params("list_messages", &serde_json::json!({})))
        .await?;

    assert_ne!(result.is_error, Some(true));
    let parsed = result_json(&result);
    assert_eq!(parsed["items"].as_array().map(Vec::len), Some(1));
    assert!(parsed["warnings"].is_array());

    client.cancel().await?;
    server_handle.await??;
    Ok(())
}

#[tokio::test]
async fn call_with_unknown_account_returns_error() -> anyhow::Result<()> {
    let (client, server_handle) = spawn_default().await;

    let result = client
        .call_tool(call_params(
            "get_event",
            &serde_json::json!({ "account_id": "ghost", "event_id": "e1" }),
        ))
        .await;

    assert!(result.is_err(), "unknown account should be a tool error");

    client.cancel().await?;
    server_handle.await??;
    Ok(())
}
