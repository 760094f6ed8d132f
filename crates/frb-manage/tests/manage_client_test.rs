// Integration tests for `ManageClient` using wiremock.

use std::time::Duration;

use reqwest::Url;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frb_core::{
    errors::Error,
    manage::{client::ManagePort, types::ManageRequest},
};
use frb_manage::{ManageClient, RetryPolicy, DEVICE_LIST_PATH, MANAGE_PATH};

// ── Helpers ─────────────────────────────────────────────────────────

fn client_for(base: &str, attempts: u32, timeout: Duration) -> ManageClient {
    let http = reqwest::Client::builder().timeout(timeout).build().unwrap();
    ManageClient::with_client(
        http,
        Url::parse(base).unwrap(),
        "test-key",
        RetryPolicy::new(attempts),
    )
}

async fn setup(attempts: u32) -> (MockServer, ManageClient) {
    let server = MockServer::start().await;
    let client = client_for(&server.uri(), attempts, Duration::from_secs(5));
    (server, client)
}

fn manage_path() -> String {
    format!("/{MANAGE_PATH}")
}

fn list_path() -> String {
    format!("/{DEVICE_LIST_PATH}")
}

// ── Reboot ──────────────────────────────────────────────────────────

#[tokio::test]
async fn reboot_posts_expected_body_and_api_key() {
    let (server, client) = setup(3).await;

    Mock::given(method("POST"))
        .and(path(manage_path()))
        .and(header("X-API-KEY", "test-key"))
        .and(body_json(json!({
            "club_id": 7,
            "command": "reboot",
            "type": "free",
            "uuids": null,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": { "u1": [true], "u2": [false, true] },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .manage(&ManageRequest::reboot(7, "free"), &CancellationToken::new())
        .await
        .unwrap();

    assert!(resp.status);
    assert_eq!(resp.data["u1"], vec![true]);
    assert_eq!(resp.data["u2"], vec![false, true]);
}

#[tokio::test]
async fn error_status_is_terminal() {
    let (server, client) = setup(3).await;

    Mock::given(method("POST"))
        .and(path(manage_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .manage(&ManageRequest::reboot(1, "free"), &CancellationToken::new())
        .await;

    match result {
        Err(Error::Http { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "internal error");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn long_error_body_is_truncated_to_200_chars() {
    let (server, client) = setup(3).await;

    Mock::given(method("POST"))
        .and(path(manage_path()))
        .respond_with(ResponseTemplate::new(502).set_body_string("e".repeat(500)))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .manage(&ManageRequest::reboot(1, "free"), &CancellationToken::new())
        .await;

    match result {
        Err(Error::Http { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body.chars().count(), 200);
            assert!(body.starts_with("eee"));
            assert!(body.ends_with("..."));
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let (server, client) = setup(6).await;

    Mock::given(method("POST"))
        .and(path(manage_path()))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad api key"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .manage(&ManageRequest::reboot(1, "free"), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(Error::Http { status: 401, .. })));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let (server, client) = setup(3).await;

    Mock::given(method("POST"))
        .and(path(manage_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .manage(&ManageRequest::reboot(1, "free"), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(Error::Decode(_))));
}

#[tokio::test]
async fn timed_out_attempt_is_retried() {
    let server = MockServer::start().await;
    let client = client_for(&server.uri(), 2, Duration::from_millis(200));

    Mock::given(method("POST"))
        .and(path(manage_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": true, "data": {} }))
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(manage_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": { "u1": [true] },
        })))
        .mount(&server)
        .await;

    let resp = client
        .manage(&ManageRequest::reboot(1, "free"), &CancellationToken::new())
        .await
        .unwrap();

    assert!(resp.has_data());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn connection_failure_surfaces_after_retries() {
    // Grab a free port and close it again so nothing listens there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = client_for(
        &format!("http://127.0.0.1:{port}"),
        2,
        Duration::from_secs(1),
    );

    let result = client
        .manage(&ManageRequest::reboot(1, "free"), &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(Error::Transport(_))), "{result:?}");
}

#[tokio::test]
async fn cancellation_aborts_in_flight_request() {
    let (server, client) = setup(3).await;

    Mock::given(method("POST"))
        .and(path(manage_path()))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = client.manage(&ManageRequest::reboot(1, "free"), &cancel).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

// ── Device directory ────────────────────────────────────────────────

#[tokio::test]
async fn device_list_sends_query_and_accepts_wrapped_data() {
    let (server, client) = setup(3).await;

    Mock::given(method("GET"))
        .and(path(list_path()))
        .and(query_param("club_id", "3"))
        .and(query_param("type", "free"))
        .and(header("X-API-KEY", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "DATA": [
                { "uuid": "u1", "name": "Lounge-1" },
                { "uuid": "u2", "name": null },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client
        .list_devices(3, "free", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].display_name(), "Lounge-1");
    assert_eq!(devices[1].display_name(), "u2");
}

#[tokio::test]
async fn device_list_accepts_bare_array() {
    let (server, client) = setup(3).await;

    Mock::given(method("GET"))
        .and(path(list_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "uuid": "u9", "name": "VIP-9" },
        ])))
        .mount(&server)
        .await;

    let devices = client
        .list_devices(1, "free", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(devices[0].uuid, "u9");
}

#[tokio::test]
async fn unexpected_device_list_shape_is_an_error() {
    let (server, client) = setup(3).await;

    Mock::given(method("GET"))
        .and(path(list_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let result = client
        .list_devices(1, "free", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(Error::Decode(_))));
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;
    let client = client_for(
        &format!("{}/gateway", server.uri()),
        1,
        Duration::from_secs(5),
    );

    Mock::given(method("GET"))
        .and(path(format!("/gateway/{DEVICE_LIST_PATH}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client
        .list_devices(1, "free", &CancellationToken::new())
        .await
        .unwrap();
    assert!(devices.is_empty());
}
