//! HTTP client tests against an in-process fake icon service and feed.

use iconpack_remote::{
    fetch_all, ArtifactFeed, FeedConfig, HttpFeed, HttpIconSource, IconServiceConfig, IconSource,
    ListQuery, RemoteError, UploadRequest, DIGEST_HEADER,
};
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server, StatusCode};

#[derive(Debug, Clone)]
struct Captured {
    method: String,
    url: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

struct FakeUpstream {
    url: String,
    server: Arc<Server>,
    requests: Arc<Mutex<Vec<Captured>>>,
}

const LISTING: &str = r#"{"result":{"icons":[
    {"iconImages":[{"imageName":"arrow-left.svg","iconImagePath":"img/arrow-left.svg"}]},
    {"iconImages":[{"imageName":"home.svg","iconImagePath":"img/home.svg"},
                   {"imageName":"home-filled.svg","iconImagePath":"img/home-filled.svg"}]}
]}}"#;

impl FakeUpstream {
    fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let port = server.server_addr().to_ip().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let srv = Arc::clone(&server);
        let reqs = Arc::clone(&requests);
        std::thread::spawn(move || {
            for mut req in srv.incoming_requests() {
                let mut body = Vec::new();
                let _ = req.as_reader().read_to_end(&mut body);
                let headers = req
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string().to_lowercase(), h.value.to_string()))
                    .collect();
                let url = req.url().to_owned();
                reqs.lock().unwrap().push(Captured {
                    method: req.method().to_string(),
                    url: url.clone(),
                    headers,
                    body,
                });

                let response = match (req.method(), url.as_str()) {
                    (Method::Post, "/api/project/7/icons") => Response::from_string(LISTING),
                    (Method::Post, "/api/project/empty/icons") => Response::from_string("{}"),
                    (Method::Post, "/api/project/broken/icons") => {
                        Response::from_string("<html>upstream down</html>")
                    }
                    (Method::Get, "/img/slow.svg") => {
                        std::thread::sleep(Duration::from_millis(2500));
                        Response::from_string("<svg/>")
                    }
                    (Method::Get, path) if path.starts_with("/img/") && !path.contains("missing") => {
                        let name = path.trim_start_matches("/img/");
                        Response::from_string(format!("<svg data-name=\"{name}\"><path/></svg>"))
                    }
                    (Method::Put, path) if path.ends_with("/with-body.tgz") => {
                        Response::from_string("feed://acme-icons/1.0.0").with_status_code(StatusCode(201))
                    }
                    (Method::Put, path) if path.ends_with("/no-body.tgz") => {
                        Response::from_string("")
                            .with_status_code(StatusCode(201))
                            .with_header(
                                Header::from_bytes("Location", "https://feed/pkg/acme-icons")
                                    .unwrap(),
                            )
                    }
                    (Method::Put, path) if path.ends_with("/denied.tgz") => {
                        Response::from_string("unauthorized").with_status_code(StatusCode(401))
                    }
                    _ => Response::from_string("not found").with_status_code(StatusCode(404)),
                };
                let _ = req.respond(response);
            }
        });

        Self {
            url: format!("http://127.0.0.1:{port}"),
            server,
            requests,
        }
    }

    fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeUpstream {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

fn icon_source(url: &str) -> HttpIconSource {
    HttpIconSource::new(IconServiceConfig::new(url))
}

fn feed(url: &str) -> HttpFeed {
    HttpFeed::new(FeedConfig::new(url, "acme", "design", "icons"), "s3cret")
}

fn upload_request(file_name: &str) -> UploadRequest {
    UploadRequest {
        package_name: "acme-icons".to_owned(),
        version: "1.0.0".to_owned(),
        file_name: file_name.to_owned(),
        digest: format!("blake3:{}", blake3::hash(b"tgz-bytes").to_hex()),
        size: 9,
    }
}

#[test]
fn listing_posts_paging_params() {
    let upstream = FakeUpstream::start();
    let source = icon_source(&upstream.url);
    let mut query = ListQuery::new("7");
    query.page = 2;
    query.per_page = 50;

    let icons = source.list_icons(&query).unwrap();
    assert_eq!(icons.len(), 2);
    assert_eq!(icons[1].images[1].name, "home-filled.svg");

    let reqs = upstream.requests();
    assert_eq!(reqs[0].method, "POST");
    assert_eq!(reqs[0].url, "/api/project/7/icons");
    let body: serde_json::Value = serde_json::from_slice(&reqs[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"params": {"page": 2, "perPage": 50, "sort": "-iconId"}})
    );
}

#[test]
fn listing_without_icons_is_empty() {
    let upstream = FakeUpstream::start();
    let icons = icon_source(&upstream.url)
        .list_icons(&ListQuery::new("empty"))
        .unwrap();
    assert!(icons.is_empty());
}

#[test]
fn non_json_listing_is_an_error() {
    let upstream = FakeUpstream::start();
    let err = icon_source(&upstream.url)
        .list_icons(&ListQuery::new("broken"))
        .unwrap_err();
    assert!(matches!(err, RemoteError::Serialization(_)));
}

#[test]
fn missing_image_is_not_found() {
    let upstream = FakeUpstream::start();
    let err = icon_source(&upstream.url)
        .fetch_markup("img/missing.svg")
        .unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)));
}

#[test]
fn slow_image_times_out() {
    let upstream = FakeUpstream::start();
    let mut config = IconServiceConfig::new(&upstream.url);
    config.timeout_secs = 1;
    let err = HttpIconSource::new(config)
        .fetch_markup("img/slow.svg")
        .unwrap_err();
    assert!(matches!(err, RemoteError::Timeout(_)), "got {err:?}");
}

#[test]
fn fetch_all_over_http_keeps_listing_order() {
    let upstream = FakeUpstream::start();
    let source = icon_source(&upstream.url);
    let assets = fetch_all(&source, &ListQuery::new("7"), 3).unwrap();
    let names: Vec<&str> = assets.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["arrow-left.svg", "home.svg", "home-filled.svg"]);
    assert_eq!(
        assets[0].markup,
        "<svg data-name=\"arrow-left.svg\"><path/></svg>"
    );
}

#[test]
fn upload_sends_token_digest_and_body() {
    let upstream = FakeUpstream::start();
    let feed = feed(&upstream.url);
    let req = upload_request("with-body.tgz");

    let reference = feed.upload(&req, &mut &b"tgz-bytes"[..]).unwrap();
    assert_eq!(reference, "feed://acme-icons/1.0.0");

    let captured = upstream.requests();
    let put = &captured[0];
    assert_eq!(put.method, "PUT");
    assert_eq!(
        put.url,
        "/acme/design/_packaging/icons/npm/acme-icons/with-body.tgz"
    );
    assert_eq!(put.headers["authorization"], "Bearer s3cret");
    assert_eq!(put.headers["content-type"], "application/octet-stream");
    assert_eq!(put.headers[&DIGEST_HEADER.to_lowercase()], req.digest);
    assert_eq!(put.body, b"tgz-bytes");
}

#[test]
fn upload_falls_back_to_location_header() {
    let upstream = FakeUpstream::start();
    let reference = feed(&upstream.url)
        .upload(&upload_request("no-body.tgz"), &mut &b"x"[..])
        .unwrap();
    assert_eq!(reference, "https://feed/pkg/acme-icons");
}

#[test]
fn rejected_upload_is_an_error() {
    let upstream = FakeUpstream::start();
    let err = feed(&upstream.url)
        .upload(&upload_request("denied.tgz"), &mut &b"x"[..])
        .unwrap_err();
    assert!(matches!(err, RemoteError::Http(ref m) if m.contains("401")));
}

#[test]
fn unreachable_feed_is_an_error() {
    let err = feed("http://127.0.0.1:9")
        .upload(&upload_request("with-body.tgz"), &mut &b"x"[..])
        .unwrap_err();
    assert!(!matches!(err, RemoteError::NotFound(_)));
}
