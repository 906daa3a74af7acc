//! End-to-end parse runs against a real database with mocked Telegram and LLM.

mod common;

use std::time::Duration;

use common::*;
use freelance_core::chats_config::ChatRef;
use freelance_core::domains::categories::Category;
use freelance_core::domains::parsing::{run_parse_job, ParseJobOutcome};
use freelance_core::domains::requests::{FreelanceRequest, ParseLog, ParseStatus, RequestFilter};
use freelance_core::common::PageRequest;
use freelance_core::kernel::trigger::{
    drain_pending, listen_for_parse_requests, request_parse, PARSE_CHANNEL,
};
use freelance_core::kernel::{MockAI, MockChatSource, TestDependencies};
use sqlx::postgres::PgListener;
use test_context::test_context;

const CHATS: &str = r#"
settings:
  parse_days: 2
categories:
  web_dev:
    name: "Web development"
    chats: ["@web_jobs", "@broken_chat"]
  design:
    name: "Design"
    chats: ["@design_jobs"]
"#;

fn username(name: &str) -> ChatRef {
    ChatRef::Username(name.to_string())
}

fn all_requests(category: Option<&str>) -> RequestFilter {
    RequestFilter {
        category: category.map(String::from),
        days: 7,
        page: PageRequest::new(0, 50),
    }
}

#[test_context(TestHarness)]
#[tokio::test]
async fn run_extracts_and_stores_requests(ctx: &mut TestHarness) {
    let pool = &ctx.db_pool;
    let (_dir, path) = write_chats_config(CHATS).unwrap();

    let chats = MockChatSource::new()
        .with_messages(username("design_jobs"), vec![job_message(1, "Нужен логотип", 30)])
        .with_messages(
            username("web_jobs"),
            vec![
                job_message(10, "Нужен лендинг", 10),
                job_message(11, "Нужен бот", 20),
            ],
        )
        .with_failure(username("broken_chat"), "CHANNEL_PRIVATE");

    // Categories run in slug order: design, then web_dev.
    let ai = MockAI::new()
        .with_response(r#"[{"title": "Logo", "description": "Logo for a bakery", "source_message_id": 1}]"#)
        .with_response(
            "```json\n[\
             {\"title\": \"Landing page\", \"budget\": \"50000 ₽\", \"skills\": [\"HTML\"], \"urgency\": \"urgent\", \"source_message_id\": \"1\"},\
             {\"title\": \"Hallucinated\", \"source_message_id\": 99}\
             ]\n```",
        );

    let test_deps = TestDependencies::new().mock_ai(ai).mock_chat_source(chats);
    let deps = test_deps.into_server_deps(pool.clone(), &path);

    let outcome = run_parse_job(&deps).await.unwrap();
    let ParseJobOutcome::Completed { log_id, report } = outcome else {
        panic!("expected a completed run, got {:?}", outcome);
    };
    assert_eq!(report.categories, 2);
    assert_eq!(report.chats_parsed, 3);
    assert_eq!(report.messages_found, 3);
    assert_eq!(report.requests_extracted, 2);
    assert_eq!(report.requests_saved, 2);

    assert!(test_deps.chat_source.was_requested(&username("broken_chat")));
    assert_eq!(test_deps.ai.prompts().len(), 2);
    assert!(test_deps.ai.prompts()[1].contains("[message_id: 2]"));

    let log = ParseLog::latest(pool).await.unwrap().unwrap();
    assert_eq!(log.id, log_id);
    assert_eq!(log.status(), Some(ParseStatus::Success));
    assert_eq!(log.chats_parsed, 3);
    assert_eq!(log.messages_found, 3);
    assert_eq!(log.requests_extracted, 2);

    let (web, _) = FreelanceRequest::find_page(&all_requests(Some("web_dev")), pool)
        .await
        .unwrap();
    assert_eq!(web.len(), 1);
    assert_eq!(web[0].title, "Landing page");
    assert_eq!(web[0].budget, "50000 ₽");
    assert_eq!(web[0].source_chat, "@web_jobs");
    assert_eq!(web[0].source_message_id, 10);

    let (design, _) = FreelanceRequest::find_page(&all_requests(Some("design")), pool)
        .await
        .unwrap();
    assert_eq!(design.len(), 1);
    assert_eq!(design[0].budget, "Не указан");

    let categories = Category::find_active(pool).await.unwrap();
    assert_eq!(categories.len(), 2);
    assert!(categories.iter().all(|c| c.last_parsed_at.is_some()));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn repost_in_another_category_is_stored_once(ctx: &mut TestHarness) {
    let pool = &ctx.db_pool;
    let (_dir, path) = write_chats_config(CHATS).unwrap();

    let repost = job_message(5, "Нужен дизайн сайта", 5);
    let chats = MockChatSource::new()
        .with_messages(username("design_jobs"), vec![repost.clone()])
        .with_messages(username("web_jobs"), vec![repost]);
    let reply = r#"[{"title": "Site design", "source_message_id": 1}]"#;
    let ai = MockAI::new().with_response(reply).with_response(reply);

    let deps = TestDependencies::new()
        .mock_ai(ai)
        .mock_chat_source(chats)
        .into_server_deps(pool.clone(), &path);

    let ParseJobOutcome::Completed { report, .. } = run_parse_job(&deps).await.unwrap() else {
        panic!("expected a completed run");
    };
    assert_eq!(report.requests_extracted, 2);
    assert_eq!(report.requests_saved, 1);

    let (_, total) = FreelanceRequest::find_page(&all_requests(None), pool)
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn run_removes_expired_requests(ctx: &mut TestHarness) {
    let pool = &ctx.db_pool;
    let (_dir, path) = write_chats_config(CHATS).unwrap();
    FreelanceRequest::save_many(
        &[
            new_request("design", "An expired logo request", 45),
            new_request("design", "A recent logo request", 1),
        ],
        pool,
    )
    .await
    .unwrap();

    let deps = TestDependencies::new().into_server_deps(pool.clone(), &path);

    let ParseJobOutcome::Completed { report, .. } = run_parse_job(&deps).await.unwrap() else {
        panic!("expected a completed run");
    };
    assert_eq!(report.messages_found, 0);
    assert_eq!(report.requests_cleaned_up, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn missing_config_marks_run_failed(ctx: &mut TestHarness) {
    let pool = &ctx.db_pool;
    let dir = tempfile::tempdir().unwrap();
    let deps = TestDependencies::new().into_server_deps(pool.clone(), dir.path().join("nope.yaml"));

    let outcome = run_parse_job(&deps).await.unwrap();
    let ParseJobOutcome::Failed { log_id, error, .. } = outcome else {
        panic!("expected a failed run, got {:?}", outcome);
    };
    assert!(error.contains("Failed to load chats config"));

    let log = ParseLog::latest(pool).await.unwrap().unwrap();
    assert_eq!(log.id, log_id);
    assert_eq!(log.status(), Some(ParseStatus::Failed));
    assert!(log.finished_at.is_some());
    assert_eq!(log.error_message.as_deref(), Some(error.as_str()));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn concurrent_run_is_rejected(ctx: &mut TestHarness) {
    let pool = &ctx.db_pool;
    let (_dir, path) = write_chats_config(CHATS).unwrap();
    let deps = TestDependencies::new().into_server_deps(pool.clone(), &path);

    let held = deps.run_guard.try_acquire().unwrap();
    assert_eq!(run_parse_job(&deps).await.unwrap(), ParseJobOutcome::AlreadyRunning);
    assert!(ParseLog::latest(pool).await.unwrap().is_none());

    drop(held);
    assert!(matches!(
        run_parse_job(&deps).await.unwrap(),
        ParseJobOutcome::Completed { .. }
    ));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn parse_request_notification_starts_a_run(ctx: &mut TestHarness) {
    let pool = &ctx.db_pool;
    let (_dir, path) = write_chats_config(CHATS).unwrap();
    let deps = TestDependencies::new().into_server_deps(pool.clone(), &path);

    let listener = tokio::spawn(listen_for_parse_requests(deps));

    // The listener needs to have issued LISTEN before the notification is sent.
    let finished = tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            request_parse(42, pool).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            if let Some(log) = ParseLog::latest(pool).await.unwrap() {
                if log.status() == Some(ParseStatus::Success) {
                    return log;
                }
            }
        }
    })
    .await
    .expect("no parse run within 30 seconds");

    assert!(finished.finished_at.is_some());
    listener.abort();
}

#[test_context(TestHarness)]
#[tokio::test]
async fn queued_parse_requests_are_drained_together(ctx: &mut TestHarness) {
    let pool = &ctx.db_pool;
    let mut listener = PgListener::connect_with(pool).await.unwrap();
    listener.listen(PARSE_CHANNEL).await.unwrap();

    for admin in [1, 2, 3] {
        request_parse(admin, pool).await.unwrap();
    }

    let first = listener.recv().await.unwrap();
    assert_eq!(first.payload(), "1");
    assert_eq!(drain_pending(&mut listener).await, 2);
    assert_eq!(drain_pending(&mut listener).await, 0);

    request_parse(4, pool).await.unwrap();
    assert_eq!(listener.recv().await.unwrap().payload(), "4");
}
