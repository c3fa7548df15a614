use crate::listing::{parse_listing, IconRecord, ListQuery};
use crate::{ArtifactFeed, FeedConfig, IconServiceConfig, IconSource, RemoteError, UploadRequest};
use std::io::Read;
use std::time::Duration;
use tracing::debug;
use ureq::{Agent, SendBody};

/// Header carrying the archive digest on uploads.
pub const DIGEST_HEADER: &str = "X-Iconpack-Digest";

fn agent_with_timeout(timeout_secs: u64) -> Agent {
    let config = Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))))
        .build();
    Agent::new_with_config(config)
}

fn map_error(url: &str, e: ureq::Error) -> RemoteError {
    match e {
        ureq::Error::StatusCode(404) => RemoteError::NotFound(url.to_owned()),
        ureq::Error::StatusCode(code) => RemoteError::Http(format!("HTTP {code} for {url}")),
        ureq::Error::Timeout(_) => RemoteError::Timeout(format!("{url}: {e}")),
        other => RemoteError::Http(format!("{url}: {other}")),
    }
}

fn read_text(resp: ureq::http::Response<ureq::Body>, url: &str) -> Result<String, RemoteError> {
    let mut reader = resp.into_body().into_reader();
    let mut body = String::new();
    reader
        .read_to_string(&mut body)
        .map_err(|e| RemoteError::Http(format!("{url}: reading body: {e}")))?;
    Ok(body)
}

/// Icon service client.
///
/// - `POST {url}/api/project/{id}/icons` with `{"params":{...}}` lists icons
/// - `GET  {url}/{iconImagePath}` returns one image's markup
pub struct HttpIconSource {
    config: IconServiceConfig,
    agent: Agent,
}

impl HttpIconSource {
    pub fn new(config: IconServiceConfig) -> Self {
        let agent = agent_with_timeout(config.timeout_secs);
        Self { config, agent }
    }

    pub fn config(&self) -> &IconServiceConfig {
        &self.config
    }

    fn listing_url(&self, project_id: &str) -> String {
        format!("{}/api/project/{project_id}/icons", self.config.url)
    }

    fn image_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.url, path.trim_start_matches('/'))
    }
}

impl IconSource for HttpIconSource {
    fn list_icons(&self, query: &ListQuery) -> Result<Vec<IconRecord>, RemoteError> {
        let url = self.listing_url(&query.project_id);
        let payload = serde_json::to_vec(&query.request_body())
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        debug!("POST {url} (page {}, {} per page)", query.page, query.per_page);
        let resp = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&payload[..])
            .map_err(|e| map_error(&url, e))?;
        let body = read_text(resp, &url)?;
        parse_listing(&body)
    }

    fn fetch_markup(&self, path: &str) -> Result<String, RemoteError> {
        let url = self.image_url(path);
        debug!("GET {url}");
        let resp = self
            .agent
            .get(&url)
            .header("Accept", "image/svg+xml, text/plain")
            .call()
            .map_err(|e| map_error(&url, e))?;
        read_text(resp, &url)
    }
}

/// Artifact feed client.
///
/// `PUT {url}/{organization}/{project}/_packaging/{feed}/npm/{package}/{file}`
/// with a bearer token. The response body, or the `Location` header when the
/// body is empty, is the remote reference.
pub struct HttpFeed {
    config: FeedConfig,
    token: String,
    agent: Agent,
}

impl HttpFeed {
    pub fn new(config: FeedConfig, token: impl Into<String>) -> Self {
        let agent = agent_with_timeout(config.timeout_secs);
        Self {
            config,
            token: token.into(),
            agent,
        }
    }

    /// Build a client with the token read from `config.token_env`.
    pub fn from_env(config: FeedConfig) -> Result<Self, RemoteError> {
        let token = config.resolve_token()?;
        Ok(Self::new(config, token))
    }

    pub fn upload_url(&self, request: &UploadRequest) -> String {
        format!(
            "{}/{}/{}/_packaging/{}/npm/{}/{}",
            self.config.url,
            self.config.organization,
            self.config.project,
            self.config.feed,
            request.package_name,
            request.file_name
        )
    }
}

impl ArtifactFeed for HttpFeed {
    fn upload(&self, request: &UploadRequest, body: &mut dyn Read) -> Result<String, RemoteError> {
        let url = self.upload_url(request);
        debug!("PUT {url} ({} bytes, {})", request.size, request.digest);
        let resp = self
            .agent
            .put(&url)
            .header("Authorization", &format!("Bearer {}", self.token))
            .header("Content-Type", "application/octet-stream")
            .header(DIGEST_HEADER, &request.digest)
            .send(SendBody::from_reader(body))
            .map_err(|e| map_error(&url, e))?;

        let location = resp
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = read_text(resp, &url)?;
        let reference = match text.trim() {
            "" => location.unwrap_or(url),
            body => body.to_owned(),
        };
        Ok(reference)
    }
}
