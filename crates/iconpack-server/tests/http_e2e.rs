//! HTTP trigger end-to-end tests.
//!
//! These tests start a real `iconpack-server` in-process on a random port
//! with an in-memory icon service and feed, and drive it with a ureq client.

use iconpack_core::Pipeline;
use iconpack_remote::mock::{MockFeed, MockIconSource};
use iconpack_remote::{IconImage, IconRecord};
use iconpack_server::TestServer;
use std::io::Read;

fn source_with(icons: &[(&str, &str)]) -> MockIconSource {
    let mut source = MockIconSource::new();
    for (name, markup) in icons {
        let path = format!("static/{name}");
        source.insert_markup(&path, markup);
        source.push_icon(IconRecord {
            images: vec![IconImage::new(*name, path)],
        });
    }
    source
}

fn start(source: MockIconSource, feed: MockFeed) -> (TestServer, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(Box::new(source), Box::new(feed), dir.path().join("work"));
    (TestServer::start(pipeline), dir)
}

fn client() -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build();
    ureq::Agent::new_with_config(config)
}

fn read_json(resp: ureq::http::Response<ureq::Body>) -> (u16, serde_json::Value) {
    let status = resp.status().as_u16();
    let mut body = String::new();
    resp.into_body()
        .into_reader()
        .read_to_string(&mut body)
        .unwrap();
    (status, serde_json::from_str(&body).unwrap())
}

fn post_publish(url: &str, body: &str) -> (u16, serde_json::Value) {
    let resp = client()
        .post(&format!("{url}/publish"))
        .header("Content-Type", "application/json")
        .send(body)
        .unwrap();
    read_json(resp)
}

#[test]
fn health_reports_ok() {
    let (server, _dir) = start(MockIconSource::new(), MockFeed::new());
    let resp = client().get(&format!("{}/health", server.url)).call().unwrap();
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let (status, body) = read_json(resp);
    assert_eq!(status, 200);
    assert_eq!(body, serde_json::json!({"status": "ok"}));
}

#[test]
fn publish_succeeds_and_reports_package() {
    let (server, dir) = start(
        source_with(&[
            ("arrow-left.svg", "<svg width=\"4\"><path/></svg>"),
            ("home.svg", "<svg><path/></svg>"),
        ]),
        MockFeed::new(),
    );
    let (status, body) = post_publish(
        &server.url,
        r#"{"projectId": 12, "projectName": "Acme Icons"}"#,
    );
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["succeeded"], true);
    assert!(body.get("error").is_none());
    assert_eq!(body["package"], "acme-icons");
    assert_eq!(body["version"], "1.0.0");
    assert_eq!(body["components"], 2);
    assert!(body["remoteReference"]
        .as_str()
        .unwrap()
        .starts_with("mock://acme-icons/"));
    assert!(body["message"].as_str().unwrap().contains("acme-icons@1.0.0"));

    let residue = std::fs::read_dir(dir.path().join("work")).unwrap().count();
    assert_eq!(residue, 0);
}

#[test]
fn publish_with_zero_icons_succeeds() {
    let (server, _dir) = start(MockIconSource::new(), MockFeed::new());
    let (status, body) = post_publish(&server.url, r#"{"projectId":"7","projectName":"Empty"}"#);
    assert_eq!(status, 200);
    assert_eq!(body["components"], 0);
}

#[test]
fn failed_upload_is_bad_gateway() {
    let (server, _dir) = start(
        source_with(&[("home.svg", "<svg/>")]),
        MockFeed::failing("HTTP 401 for feed"),
    );
    let (status, body) = post_publish(&server.url, r#"{"projectId":"7","projectName":"Acme"}"#);
    assert_eq!(status, 502);
    assert_eq!(body["succeeded"], false);
    assert!(body.get("remoteReference").is_none());
    assert_eq!(body["error"]["class"], "publish");
    assert!(body["error"]["message"].as_str().unwrap().contains("401"));
}

#[test]
fn fetch_failure_is_bad_gateway() {
    let mut source = MockIconSource::new();
    source.fail_listing();
    let (server, _dir) = start(source, MockFeed::new());
    let (status, body) = post_publish(&server.url, r#"{"projectId":"7","projectName":"Acme"}"#);
    assert_eq!(status, 502);
    assert_eq!(body["error"]["class"], "fetch");
}

#[test]
fn collision_is_internal_error() {
    let (server, _dir) = start(
        source_with(&[("arrow-left.svg", "<svg/>"), ("arrow_left.svg", "<svg/>")]),
        MockFeed::new(),
    );
    let (status, body) = post_publish(&server.url, r#"{"projectId":"7","projectName":"Acme"}"#);
    assert_eq!(status, 500);
    assert_eq!(body["error"]["class"], "generation");
}

#[test]
fn malformed_bodies_are_bad_requests() {
    let (server, _dir) = start(MockIconSource::new(), MockFeed::new());
    for body in [
        "not json",
        r#"{"projectName":"Acme"}"#,
        r#"{"projectId":"7","projectName":""}"#,
        r#"{"projectId":"7","projectName":"Acme","perPage":0}"#,
    ] {
        let (status, json) = post_publish(&server.url, body);
        assert_eq!(status, 400, "{body}");
        assert_eq!(json["succeeded"], false);
        assert_eq!(json["error"]["class"], "config");
    }
}

#[test]
fn unknown_route_and_wrong_method() {
    let (server, _dir) = start(MockIconSource::new(), MockFeed::new());
    let resp = client().get(&format!("{}/nope", server.url)).call().unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let resp = client()
        .get(&format!("{}/publish", server.url))
        .call()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 405);
}

#[test]
fn preflight_is_answered() {
    let (server, _dir) = start(MockIconSource::new(), MockFeed::new());
    let resp = client()
        .options(&format!("{}/publish", server.url))
        .call()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
    let methods = resp
        .headers()
        .get("access-control-allow-methods")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(methods.contains("POST"));
}
