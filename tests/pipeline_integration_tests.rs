//! End-to-end pipeline tests: source fetch, classification, narrative,
//! delivery and ledger recording, with every external dependency mocked.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use migration::Migrator;
use reports::config::{DispatchConfig, MailConfig, NarrativeConfig};
use reports::dispatch::{DispatchCoordinator, DueReport, RunOutcome};
use reports::fetch::SourceFetcher;
use reports::mail::HttpRelayMailer;
use reports::models::report_history::status;
use reports::models::{connector, report_history, tenant};
use reports::narrative::NarrativeClient;
use reports::repositories::ReportHistoryRepository;

const QUEUE_XML: &str = r#"<?xml version="1.0"?>
    <root><data><report>
        <date__groupsobjects>
            <period>Total</period>
            <type>total</type>
            <incoming_total>120</incoming_total>
            <incoming_answered>100</incoming_answered>
            <incoming_unanswered>20</incoming_unanswered>
            <incoming_answered_average_queue_time>00:45</incoming_answered_average_queue_time>
        </date__groupsobjects>
        <date__groupsobjects>
            <period>2024-01-15</period>
            <type>group</type>
            <name>Support Queue</name>
            <incoming_total>120</incoming_total>
            <incoming_answered>100</incoming_answered>
            <incoming_unanswered>20</incoming_unanswered>
        </date__groupsobjects>
        <time__groupsobjects>
            <period>09:00</period>
            <type>group</type>
            <incoming_total>30</incoming_total>
            <incoming_answered>28</incoming_answered>
            <incoming_unanswered>2</incoming_unanswered>
        </time__groupsobjects>
    </report></data></root>"#;

struct Harness {
    db: DatabaseConnection,
    coordinator: Arc<DispatchCoordinator>,
    tenant_id: Uuid,
}

async fn setup(narrative_server: &MockServer, relay_server: &MockServer) -> Harness {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let tenant_id = Uuid::new_v4();
    tenant::ActiveModel {
        id: Set(tenant_id),
        name: Set(Some("Acme".to_string())),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&db)
    .await
    .expect("insert tenant");

    let narrative_config = NarrativeConfig {
        base_url: narrative_server.uri(),
        api_key: Some("test-key".to_string()),
        model: "gpt-4o-mini".to_string(),
        max_tokens: 512,
        temperature: 0.3,
        timeout_seconds: 2,
        max_chars: 8000,
    };
    let mail_config = MailConfig {
        relay_url: format!("{}/send", relay_server.uri()),
        relay_token: Some("relay-token".to_string()),
    };
    let dispatch_config = DispatchConfig {
        concurrency: 4,
        budget_seconds: 30,
        budget_margin_seconds: 5,
        abandon_rate_threshold: 0.25,
    };

    let coordinator = Arc::new(DispatchCoordinator::new(
        ReportHistoryRepository::new(db.clone(), 90),
        SourceFetcher::new(Duration::from_secs(5), 4096),
        NarrativeClient::new(&narrative_config),
        Arc::new(HttpRelayMailer::new(&mail_config)),
        dispatch_config,
    ));

    Harness {
        db,
        coordinator,
        tenant_id,
    }
}

async fn seed_connector(harness: &Harness, endpoint_url: &str) -> connector::Model {
    let now = Utc::now().fixed_offset();
    connector::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(harness.tenant_id),
        user_id: Set(Uuid::new_v4()),
        name: Set("Support queue".to_string()),
        endpoint_url: Set(endpoint_url.to_string()),
        bearer_token: Set(Some("source-token".to_string())),
        report_email: Set(Some("reports@example.com".to_string())),
        account_email: Set("owner@example.com".to_string()),
        locale: Set("it".to_string()),
        frequency: Set("daily".to_string()),
        send_time: Set("07:30".to_string()),
        day_of_week: Set(None),
        day_of_month: Set(None),
        enabled: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&harness.db)
    .await
    .expect("insert connector")
}

fn occurrence() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 7, 30, 0).unwrap()
}

fn chat_completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

async fn mount_source(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/export.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn happy_path_delivers_and_records_sent() {
    let source = MockServer::start().await;
    let narrative = MockServer::start().await;
    let relay = MockServer::start().await;

    mount_source(&source, QUEUE_XML).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_completion("Andamento positivo della coda."))
        .mount(&narrative)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_string_contains("reports@example.com"))
        .and(body_string_contains("Report Automatico del 15/01/2024"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&relay)
        .await;

    let harness = setup(&narrative, &relay).await;
    let connector = seed_connector(&harness, &format!("{}/export.xml", source.uri())).await;

    let stats = harness
        .coordinator
        .run_batch(vec![DueReport {
            connector: connector.clone(),
            occurrence: occurrence(),
        }])
        .await;

    assert_eq!(stats.sent, 1);
    assert_eq!(stats.failed, 0);

    let rows = report_history::Entity::find()
        .all(&harness.db)
        .await
        .expect("list rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, status::SENT);
    let preview = rows[0].preview.as_deref().expect("preview stored");
    assert!(preview.contains("Report Automatico del 15/01/2024"));
    assert!(preview.chars().count() <= 500);
}

#[tokio::test]
async fn one_failing_recipient_does_not_block_the_others() {
    let source = MockServer::start().await;
    let narrative = MockServer::start().await;
    let relay = MockServer::start().await;

    mount_source(&source, QUEUE_XML).await;
    // Second connector points at a path that only ever errors
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&source)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_completion("Commentary."))
        .mount(&narrative)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&relay)
        .await;

    let harness = setup(&narrative, &relay).await;
    let healthy = seed_connector(&harness, &format!("{}/export.xml", source.uri())).await;
    let broken = seed_connector(&harness, &format!("{}/broken.xml", source.uri())).await;

    let stats = harness
        .coordinator
        .run_batch(vec![
            DueReport {
                connector: broken.clone(),
                occurrence: occurrence(),
            },
            DueReport {
                connector: healthy.clone(),
                occurrence: occurrence(),
            },
        ])
        .await;

    assert_eq!(stats.sent, 1);
    assert_eq!(stats.failed, 1);

    let rows = report_history::Entity::find()
        .all(&harness.db)
        .await
        .expect("list rows");
    let failed = rows
        .iter()
        .find(|r| r.connector_id == broken.id)
        .expect("failed row");
    assert_eq!(failed.status, status::FAILED);
    assert_eq!(failed.error_class.as_deref(), Some("network"));
    let message = failed.error_message.as_deref().expect("message stored");
    assert!(!message.contains("source-token"));

    let sent = rows
        .iter()
        .find(|r| r.connector_id == healthy.id)
        .expect("sent row");
    assert_eq!(sent.status, status::SENT);
}

#[tokio::test]
async fn narrative_outage_degrades_but_still_delivers() {
    let source = MockServer::start().await;
    let narrative = MockServer::start().await;
    let relay = MockServer::start().await;

    mount_source(&source, QUEUE_XML).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&narrative)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&relay)
        .await;

    let harness = setup(&narrative, &relay).await;
    let connector = seed_connector(&harness, &format!("{}/export.xml", source.uri())).await;

    let stats = harness
        .coordinator
        .run_batch(vec![DueReport {
            connector,
            occurrence: occurrence(),
        }])
        .await;

    assert_eq!(stats.sent, 1);

    let rows = report_history::Entity::find()
        .all(&harness.db)
        .await
        .expect("list rows");
    assert_eq!(rows[0].status, status::SENT);
    // Preview carries the deterministic fallback commentary
    let preview = rows[0].preview.as_deref().expect("preview stored");
    assert!(preview.contains("120"));
}

#[tokio::test]
async fn unsupported_document_is_recorded_as_such() {
    let source = MockServer::start().await;
    let narrative = MockServer::start().await;
    let relay = MockServer::start().await;

    mount_source(
        &source,
        "<root><data><report><unknown_counter>1</unknown_counter></report></data></root>",
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&relay)
        .await;

    let harness = setup(&narrative, &relay).await;
    let connector = seed_connector(&harness, &format!("{}/export.xml", source.uri())).await;

    let stats = harness
        .coordinator
        .run_batch(vec![DueReport {
            connector,
            occurrence: occurrence(),
        }])
        .await;

    assert_eq!(stats.failed, 1);
    let rows = report_history::Entity::find()
        .all(&harness.db)
        .await
        .expect("list rows");
    assert_eq!(rows[0].status, status::FAILED);
    assert_eq!(rows[0].error_class.as_deref(), Some("unsupported-format"));
}

#[tokio::test]
async fn repeated_dispatch_of_one_occurrence_sends_exactly_once() {
    let source = MockServer::start().await;
    let narrative = MockServer::start().await;
    let relay = MockServer::start().await;

    mount_source(&source, QUEUE_XML).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_completion("Commentary."))
        .mount(&narrative)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&relay)
        .await;

    let harness = setup(&narrative, &relay).await;
    let connector = seed_connector(&harness, &format!("{}/export.xml", source.uri())).await;

    let first = harness
        .coordinator
        .run_batch(vec![DueReport {
            connector: connector.clone(),
            occurrence: occurrence(),
        }])
        .await;
    let second = harness
        .coordinator
        .run_batch(vec![DueReport {
            connector: connector.clone(),
            occurrence: occurrence(),
        }])
        .await;

    assert_eq!(first.sent, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.sent, 0);

    let rows = report_history::Entity::find()
        .all(&harness.db)
        .await
        .expect("list rows");
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn manual_run_claims_the_same_ledger_key() {
    let source = MockServer::start().await;
    let narrative = MockServer::start().await;
    let relay = MockServer::start().await;

    mount_source(&source, QUEUE_XML).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_completion("Commentary."))
        .mount(&narrative)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&relay)
        .await;

    let harness = setup(&narrative, &relay).await;
    let connector = seed_connector(&harness, &format!("{}/export.xml", source.uri())).await;

    let manual = harness
        .coordinator
        .run_connector(connector.clone(), occurrence())
        .await;
    assert_eq!(manual, RunOutcome::Sent);

    // The scheduled run of the same minute finds the row already claimed
    let scheduled = harness
        .coordinator
        .run_batch(vec![DueReport {
            connector,
            occurrence: occurrence(),
        }])
        .await;
    assert_eq!(scheduled.skipped, 1);
}
