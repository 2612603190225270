// Tests for `Client` against a wiremock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hoymiles_cloud_rs::api::{self, Client, Error};

const AUTH: &str = "/iam/pub/0/auth/login";
const STATIONS: &str = "/pvm/api/0/station/select_by_page";
const DTUS: &str = "/pvm/api/0/dev/dtu/select_by_page";
const MICROINVERTERS: &str = "/pvm/api/0/dev/micro/select_by_station";
const STATION_REAL_DATA: &str = "/pvm-data/api/0/station/data/count_station_real_data";
const DTU_DETAIL: &str = "/pvm/api/0/dev/dtu/find";

// ── Helpers ─────────────────────────────────────────────────────────

fn success(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "0",
        "message": "success",
        "data": data,
    }))
}

fn rejection() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "100",
        "message": "token verify error",
        "data": null,
    }))
}

fn client_for(server: &MockServer) -> Client {
    Client::new(api::api(
        server.uri(),
        "user@example.com".to_string(),
        "hunter2".to_string(),
    ))
    .unwrap()
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(AUTH))
        .respond_with(success(json!({ "token": "token-1" })))
        .mount(server)
        .await;
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn authenticate_records_token() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    mount_auth(&server).await;

    assert!(client.authenticate().await.unwrap());
    assert!(!client.session().is_expired());
}

#[tokio::test]
async fn authenticate_sends_digest_not_clear_password() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);

    /* md5("hunter2") */
    Mock::given(method("POST"))
        .and(path(AUTH))
        .and(body_partial_json(json!({
            "user_name": "user@example.com",
            "password": "2ab96390c7dbe3439de74d0c9b0b1767",
        })))
        .respond_with(success(json!({ "token": "token-1" })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.authenticate().await.unwrap());
}

#[tokio::test]
async fn rejected_credentials_report_false() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);

    Mock::given(method("POST"))
        .and(path(AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "2",
            "message": "password error",
            "data": null,
        })))
        .mount(&server)
        .await;

    assert!(!client.authenticate().await.unwrap());
    assert!(client.session().is_expired());
}

#[tokio::test]
async fn rejected_refresh_keeps_prior_token() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);

    Mock::given(method("POST"))
        .and(path(AUTH))
        .respond_with(success(json!({ "token": "token-1" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    assert!(client.authenticate().await.unwrap());

    Mock::given(method("POST"))
        .and(path(AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "2",
            "message": "password error",
            "data": null,
        })))
        .mount(&server)
        .await;

    assert!(!client.authenticate().await.unwrap());
    /* the earlier token survives a rejected refresh */
    assert!(!client.session().is_expired());
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    let mut client = Client::new(api::api(
        "http://127.0.0.1:1".to_string(),
        "user@example.com".to_string(),
        "hunter2".to_string(),
    ))
    .unwrap();

    match client.authenticate().await {
        Err(Error::Transport(_)) => {}
        other => panic!("expected transport error, got {:?}", other),
    }
}

// ── Topology listings ───────────────────────────────────────────────

#[tokio::test]
async fn stations_authenticate_lazily_and_decode() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(STATIONS))
        .and(header("Authorization", "token-1"))
        .and(body_partial_json(json!({ "page_size": 10, "page_num": 1 })))
        .respond_with(success(json!({
            "list": [
                { "id": 1, "name": "Home" },
                { "id": 2, "name": "Cabin" },
            ],
            "total": 2,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stations = client.stations().await.unwrap();
    assert_eq!(2, stations.len());
    assert_eq!("1", stations[0].id);
    assert_eq!("Home", stations[0].name);
    assert_eq!("2", stations[1].id);
}

#[tokio::test]
async fn rejected_station_listing_reads_as_empty() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(STATIONS))
        .respond_with(rejection())
        .mount(&server)
        .await;

    assert!(client.stations().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_json_body_is_a_protocol_error() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(STATIONS))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway error</html>"))
        .mount(&server)
        .await;

    match client.stations().await {
        Err(Error::Protocol(_, body)) => assert!(body.contains("gateway")),
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn device_listings_use_wire_names() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(DTUS))
        .and(body_partial_json(json!({ "sid": 7, "show_warn": 0 })))
        .respond_with(success(json!({
            "list": [{ "id": 101, "model_no": "HMS-800W-2T", "warn_data": { "connect": true } }],
            "total": 1,
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(MICROINVERTERS))
        .and(body_partial_json(json!({ "sid": 7 })))
        .respond_with(success(json!({
            "list": [{ "id": 201, "init_hard_no": "116180000001" }],
            "total": 1,
        })))
        .mount(&server)
        .await;

    let dtus = client.dtus("7").await.unwrap();
    assert_eq!(1, dtus.len());
    assert_eq!("101", dtus[0].id);
    assert_eq!("HMS-800W-2T", dtus[0].name);

    let micros = client.microinverters("7").await.unwrap();
    assert_eq!(1, micros.len());
    assert_eq!("201", micros[0].id);
    assert_eq!("116180000001", micros[0].name);
}

// ── Telemetry ───────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_station_telemetry_reads_as_empty_payload() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(STATION_REAL_DATA))
        .respond_with(rejection())
        .mount(&server)
        .await;

    assert!(client.station_real_data("7").await.unwrap().is_empty());
}

#[tokio::test]
async fn dtu_real_data_merges_listing_fields() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(DTU_DETAIL))
        .and(body_partial_json(json!({ "id": 101, "sid": 7 })))
        .respond_with(success(json!({ "a": "1", "b": "2" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DTUS))
        .and(body_partial_json(json!({ "sid": 7 })))
        .respond_with(success(json!({
            "list": [
                { "id": 999, "model_no": "OTHER", "warn_data": null },
                { "id": 101, "model_no": "HMS-800W-2T", "warn_data": { "connect": true } },
            ],
            "total": 2,
        })))
        .mount(&server)
        .await;

    let data = client.dtu_real_data("7", "101").await.unwrap();
    assert_eq!(4, data.len());
    assert_eq!(json!("1"), data["a"]);
    assert_eq!(json!("2"), data["b"]);
    assert_eq!(json!({ "connect": true }), data["warn_data"]);
    assert_eq!(json!("HMS-800W-2T"), data["model_no"]);
}

#[tokio::test]
async fn rejected_dtu_detail_skips_listing_call() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(DTU_DETAIL))
        .respond_with(rejection())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DTUS))
        .respond_with(success(json!({ "list": [], "total": 0 })))
        .expect(0)
        .mount(&server)
        .await;

    assert!(client.dtu_real_data("7", "101").await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_dtu_listing_keeps_detail_payload() {
    let server = MockServer::start().await;
    let mut client = client_for(&server);
    mount_auth(&server).await;

    Mock::given(method("POST"))
        .and(path(DTU_DETAIL))
        .respond_with(success(json!({ "a": "1" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DTUS))
        .respond_with(rejection())
        .mount(&server)
        .await;

    let data = client.dtu_real_data("7", "101").await.unwrap();
    assert_eq!(1, data.len());
    assert_eq!(json!("1"), data["a"]);
}
