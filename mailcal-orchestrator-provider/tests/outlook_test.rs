//! Outlook Provider 集成测试
//!
//! 运行方式:
//! ```bash
//! OUTLOOK_ACCESS_TOKEN=xxx \
//!     cargo test -p mailcal-orchestrator-provider --test outlook_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use common::TestContext;
use mailcal_orchestrator_provider::{
    ContactQuery, EventQuery, EventStatus, MessageQuery, ProviderError, UpdateEventRequest,
};

// ============ 读取测试 ============

#[tokio::test]
#[ignore]
async fn test_outlook_list_messages() {
    skip_if_no_credentials!("OUTLOOK_ACCESS_TOKEN");

    let ctx = TestContext::outlook().expect("创建测试上下文失败");
    let query = MessageQuery {
        limit: 5,
        ..MessageQuery::default()
    };
    let messages = require_ok!(ctx.provider.list_messages(&ctx.account, &query).await);

    assert!(messages.len() <= 5);
    assert!(messages.iter().all(|m| m.account_id == ctx.account.id));

    println!("✓ list_messages 测试通过，共 {} 封", messages.len());
}

#[tokio::test]
#[ignore]
async fn test_outlook_get_first_message() {
    skip_if_no_credentials!("OUTLOOK_ACCESS_TOKEN");

    let ctx = TestContext::outlook().expect("创建测试上下文失败");
    let query = MessageQuery {
        limit: 1,
        ..MessageQuery::default()
    };
    let messages = require_ok!(ctx.provider.list_messages(&ctx.account, &query).await);
    let Some(first) = messages.first() else {
        println!("收件箱为空，跳过");
        return;
    };

    let message = require_ok!(ctx.provider.get_message(&ctx.account, &first.id).await);
    assert_eq!(message.id, first.id);

    println!("✓ get_message 测试通过: {}", message.subject);
}

#[tokio::test]
#[ignore]
async fn test_outlook_missing_message_is_not_found() {
    skip_if_no_credentials!("OUTLOOK_ACCESS_TOKEN");

    let ctx = TestContext::outlook().expect("创建测试上下文失败");
    let result = ctx
        .provider
        .get_message(&ctx.account, "_test-does-not-exist")
        .await;

    assert!(
        matches!(result, Err(ProviderError::NotFound { .. } | ProviderError::InvalidParameter { .. })),
        "意外结果: {result:?}"
    );

    println!("✓ 不存在的邮件返回 NotFound");
}

#[tokio::test]
#[ignore]
async fn test_outlook_list_events() {
    skip_if_no_credentials!("OUTLOOK_ACCESS_TOKEN");

    let ctx = TestContext::outlook().expect("创建测试上下文失败");
    let events = require_ok!(
        ctx.provider
            .list_events(&ctx.account, &EventQuery::upcoming(14, 20))
            .await
    );

    assert!(events.windows(2).all(|w| w[0].start <= w[1].start));

    println!("✓ list_events 测试通过，共 {} 个事件", events.len());
}

#[tokio::test]
#[ignore]
async fn test_outlook_list_contacts() {
    skip_if_no_credentials!("OUTLOOK_ACCESS_TOKEN");

    let ctx = TestContext::outlook().expect("创建测试上下文失败");
    let contacts = require_ok!(
        ctx.provider
            .list_contacts(&ctx.account, &ContactQuery::default())
            .await
    );

    println!("✓ list_contacts 测试通过，共 {} 个联系人", contacts.len());
}

// ============ 写入测试 ============

#[tokio::test]
#[ignore]
async fn test_outlook_event_lifecycle() {
    skip_if_no_credentials!("OUTLOOK_ACCESS_TOKEN");

    let ctx = TestContext::outlook().expect("创建测试上下文失败");

    // 1. 创建
    let created = ctx.create_test_event().await.expect("创建测试事件失败");
    assert!(created.title.starts_with("_test-"));

    // 2. 更新
    let update = UpdateEventRequest {
        location: Some("Room 42".to_string()),
        ..UpdateEventRequest::default()
    };
    let updated = ctx
        .provider
        .update_event(&ctx.account, &created.id, &update)
        .await;
    ctx.cleanup_event(&created.id).await;
    let updated = require_ok!(updated, "update_event 调用失败");
    assert_eq!(updated.location.as_deref(), Some("Room 42"));

    // 3. 删除后不可再读取
    let result = ctx.provider.get_event(&ctx.account, &created.id).await;
    // Google 对已删除事件仍返回 status=cancelled
    if let Ok(event) = result {
        assert_eq!(event.status, EventStatus::Cancelled);
    }

    println!("✓ 事件创建/更新/删除测试通过");
}
