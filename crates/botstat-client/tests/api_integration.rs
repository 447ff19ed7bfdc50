use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use botstat_client::{BotStatClient, BotStatError};

fn client_for(server: &MockServer) -> BotStatClient {
    BotStatClient::new()
        .with_base_url(server.uri())
        .unwrap()
        .with_token("123:ABC")
        .with_access_key("KEY")
}

fn envelope(result: serde_json::Value) -> serde_json::Value {
    json!({ "ok": true, "result": result })
}

#[tokio::test]
async fn get_bot_info_parses_the_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get/examplebot/KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "username": "examplebot",
            "fullname": "Example Bot",
            "users_live": 120,
            "users_die": 30,
            "users_empty": 5,
            "groups_live": 10,
            "groups_die": 2,
            "users_in_groups": 400,
            "arabic": "1%",
            "male": "60%",
            "female": "39%",
            "date": "2023-01-01, 10:00:00"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let info = client.get_bot_info("examplebot").await.unwrap();
    assert_eq!(info.username, "examplebot");
    assert_eq!(info.users_live, 120);
    assert_eq!(info.groups_die, 2);
    // The embedded comma is stripped before date parsing.
    let date = info.date.expect("date should parse");
    assert_eq!(date.to_string(), "2023-01-01 10:00:00");
}

#[tokio::test]
async fn missing_access_key_fails_before_any_network_call() {
    let server = MockServer::start().await;

    let client = BotStatClient::new().with_base_url(server.uri()).unwrap();
    let err = client.get_bot_info("examplebot").await.unwrap_err();
    assert!(matches!(err, BotStatError::Configuration(_)));

    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn create_task_returns_the_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/create/123:ABC/KEY"))
        .and(query_param("notify_id", "777"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({"id": "abc123"}))))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("ids.csv");
    tokio::fs::write(&file, "1\n2\n3\n").await.unwrap();

    let client = client_for(&server);
    let task = client.create_task(file).notify_id(777).send().await.unwrap();
    assert_eq!(task.id, "abc123");

    let received = server.received_requests().await.unwrap();
    let content_type = received[0]
        .headers
        .get("content-type")
        .expect("content-type header")
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn create_task_surfaces_a_string_error_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/create/123:ABC/KEY"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "result": "quota exceeded"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("ids.csv");
    tokio::fs::write(&file, "1\n").await.unwrap();

    let client = client_for(&server);
    let err = client.create_task(file).send().await.unwrap_err();
    match err {
        BotStatError::Api { status, message } => {
            assert_eq!(status, 200);
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn get_bot_info_surfaces_a_message_object_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get/ghostbot/KEY"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "result": {"message": "not found"}})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_bot_info("ghostbot").await.unwrap_err();
    match err {
        BotStatError::Api { message, .. } => assert_eq!(message, "not found"),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_body_falls_back_to_raw_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/abc123"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_task_status("abc123").await.unwrap_err();
    match err {
        BotStatError::Api { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_task_reports_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/cancel/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.cancel_task("abc123").await.unwrap());
}

#[tokio::test]
async fn get_task_status_keeps_service_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "id": "abc123",
            "status": "running",
            "checked": 50,
            "total": 200
        }))))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let status = client.get_task_status("abc123").await.unwrap();
    assert_eq!(status.status, "running");
    assert_eq!(status.extra["total"], 200);
}

#[tokio::test]
async fn send_stat_sends_explicit_zero_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/send-stat/KEY"))
        .and(query_param("username", "examplebot"))
        .and(query_param("users_live", "120"))
        .and(query_param("users_die", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ok = client
        .send_stat("examplebot")
        .users_live(120)
        .users_die(0)
        .send()
        .await
        .unwrap();
    assert!(ok);

    // Unset counts stay off the wire entirely.
    let received = server.received_requests().await.unwrap();
    let query = received[0].url.query().unwrap_or_default();
    assert!(!query.contains("groups_live"));
    assert!(!query.contains("owner"));
}

#[tokio::test]
async fn send_stat_accepts_a_per_call_access_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/send-stat/OTHER"))
        .and(query_param("username", "examplebot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    // No instance access key: the builder override must carry the call.
    let client = BotStatClient::new().with_base_url(server.uri()).unwrap();
    let ok = client
        .send_stat("examplebot")
        .access_key("OTHER")
        .send()
        .await
        .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn check_sub_hits_the_code_and_user_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/checksub/CODE42/555"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.check_sub("CODE42", 555).await.unwrap());
}

#[tokio::test]
async fn send_to_botman_uploads_with_owner_and_flags() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/botman/123:ABC"))
        .and(query_param("owner_id", "999"))
        .and(query_param("show_file_result", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("chats.txt");
    tokio::fs::write(&file, "100\n200\n").await.unwrap();

    let client = client_for(&server);
    let ok = client
        .send_to_botman(999, file)
        .show_file_result(true)
        .send()
        .await
        .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn botman_pause_uses_the_instance_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/botman-pause/123:ABC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.botman_pause().send().await.unwrap());
}

#[tokio::test]
async fn botman_pause_accepts_a_per_call_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/botman-pause/456:DEF"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    // No instance token: the builder override must carry the call.
    let client = BotStatClient::new().with_base_url(server.uri()).unwrap();
    assert!(client.botman_pause().token("456:DEF").send().await.unwrap());
}

#[tokio::test]
async fn session_is_reused_across_calls_and_rebuilt_after_close() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/checksub/CODE/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.check_sub("CODE", 1).await.unwrap());
    assert!(client.check_sub("CODE", 1).await.unwrap());

    // Closing drops the session; the next call transparently rebuilds it.
    client.close().await;
    assert!(client.check_sub("CODE", 1).await.unwrap());
}

#[tokio::test]
async fn upload_from_an_open_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/create/123:ABC/KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({"id": "xyz"}))))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path_buf = dir.path().join("ids.txt");
    tokio::fs::write(&path_buf, "1\n2\n").await.unwrap();
    let open_file = tokio::fs::File::open(&path_buf).await.unwrap();

    let client = client_for(&server);
    let task = client.create_task(open_file).send().await.unwrap();
    assert_eq!(task.id, "xyz");
}
