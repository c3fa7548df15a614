//! In-memory [`IconSource`] and [`ArtifactFeed`] doubles for tests and
//! offline runs.

use crate::listing::{IconRecord, ListQuery};
use crate::{ArtifactFeed, IconSource, RemoteError, UploadRequest};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct MockIconSource {
    icons: Vec<IconRecord>,
    markup: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    listing_fails: bool,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockIconSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_icon(&mut self, icon: IconRecord) {
        self.icons.push(icon);
    }

    pub fn insert_markup(&mut self, path: &str, markup: &str) {
        self.markup.insert(path.to_owned(), markup.to_owned());
    }

    pub fn set_delay(&mut self, path: &str, delay: Duration) {
        self.delays.insert(path.to_owned(), delay);
    }

    /// Make retrieval of `path` fail with `NotFound`.
    pub fn fail_path(&mut self, path: &str) {
        self.failing.insert(path.to_owned());
    }

    pub fn fail_listing(&mut self) {
        self.listing_fails = true;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of retrievals observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl IconSource for MockIconSource {
    fn list_icons(&self, _query: &ListQuery) -> Result<Vec<IconRecord>, RemoteError> {
        if self.listing_fails {
            return Err(RemoteError::Http("HTTP 500 for mock listing".to_owned()));
        }
        Ok(self.icons.clone())
    }

    fn fetch_markup(&self, path: &str) -> Result<String, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(path) {
            std::thread::sleep(*delay);
        }
        let result = if self.failing.contains(path) {
            Err(RemoteError::NotFound(path.to_owned()))
        } else {
            self.markup
                .get(path)
                .cloned()
                .ok_or_else(|| RemoteError::NotFound(path.to_owned()))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Records every upload; optionally fails them.
#[derive(Default)]
pub struct MockFeed {
    uploads: Mutex<Vec<(UploadRequest, Vec<u8>)>>,
    fail_with: Option<String>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed whose every upload fails with `Http(message)`.
    pub fn failing(message: &str) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail_with: Some(message.to_owned()),
        }
    }

    pub fn uploads(&self) -> Vec<(UploadRequest, Vec<u8>)> {
        self.uploads
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }
}

impl ArtifactFeed for MockFeed {
    fn upload(&self, request: &UploadRequest, body: &mut dyn Read) -> Result<String, RemoteError> {
        let mut data = Vec::new();
        body.read_to_end(&mut data)?;
        if let Some(message) = &self.fail_with {
            return Err(RemoteError::Http(message.clone()));
        }
        self.uploads
            .lock()
            .map_err(|e| RemoteError::Http(format!("mutex poisoned: {e}")))?
            .push((request.clone(), data));
        Ok(format!(
            "mock://{}/{}/{}",
            request.package_name, request.version, request.file_name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::IconImage;

    #[test]
    fn mock_source_serves_inserted_markup() {
        let mut source = MockIconSource::new();
        source.push_icon(IconRecord {
            images: vec![IconImage::new("a.svg", "p/a.svg")],
        });
        source.insert_markup("p/a.svg", "<svg/>");
        assert_eq!(source.list_icons(&ListQuery::new("1")).unwrap().len(), 1);
        assert_eq!(source.fetch_markup("p/a.svg").unwrap(), "<svg/>");
        assert!(source.fetch_markup("p/missing.svg").is_err());
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn mock_feed_records_uploads() {
        let feed = MockFeed::new();
        let req = UploadRequest {
            package_name: "acme".to_owned(),
            version: "1.0.0".to_owned(),
            file_name: "acme-1.tgz".to_owned(),
            digest: "blake3:ab".to_owned(),
            size: 3,
        };
        let reference = feed.upload(&req, &mut &b"tgz"[..]).unwrap();
        assert_eq!(reference, "mock://acme/1.0.0/acme-1.tgz");
        let uploads = feed.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1, b"tgz");
    }

    #[test]
    fn failing_feed_rejects_uploads() {
        let feed = MockFeed::failing("HTTP 401");
        let req = UploadRequest {
            package_name: "acme".to_owned(),
            version: "1.0.0".to_owned(),
            file_name: "acme-1.tgz".to_owned(),
            digest: "blake3:ab".to_owned(),
            size: 0,
        };
        assert!(feed.upload(&req, &mut std::io::empty()).is_err());
        assert!(feed.uploads().is_empty());
    }
}
