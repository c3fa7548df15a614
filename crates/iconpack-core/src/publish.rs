use crate::lifecycle::{PublishState, StateTracker};
use crate::CoreError;
use iconpack_package::AssembledPackage;
use iconpack_remote::{ArtifactFeed, RemoteError, UploadRequest};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use tracing::{debug, info, warn};

/// What a successful publication produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub package_name: String,
    pub version: String,
    pub archive_file_name: String,
    pub remote_reference: String,
    pub digest: String,
    pub size: u64,
    pub component_count: usize,
    pub run_id: String,
}

/// Uploads an assembled package and always removes it afterwards.
pub struct Publisher<'a> {
    feed: &'a dyn ArtifactFeed,
}

impl<'a> Publisher<'a> {
    pub fn new(feed: &'a dyn ArtifactFeed) -> Self {
        Self { feed }
    }

    /// Upload the package archive, then tear down its layout.
    ///
    /// | upload | cleanup | result                                   |
    /// |--------|---------|------------------------------------------|
    /// | ok     | ok      | `Ok(outcome)`                            |
    /// | failed | ok      | `Err(Publish)`                           |
    /// | failed | failed  | `Err(CleanupAfterFailure{Publish, ..})`  |
    /// | ok     | failed  | `Err(Cleanup)`                           |
    pub fn publish(&self, package: AssembledPackage) -> Result<PublishOutcome, CoreError> {
        let mut tracker = StateTracker::new();
        tracker.advance(PublishState::Uploading)?;

        let upload = self.upload(&package);
        tracker.advance(match upload {
            Ok(_) => PublishState::Uploaded,
            Err(_) => PublishState::UploadFailed,
        })?;

        let AssembledPackage {
            layout,
            manifest,
            run_id,
            component_count,
        } = package;
        let archive_file_name = layout
            .archive_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let cleanup = layout.teardown();
        tracker.advance(PublishState::CleanedUp)?;
        debug!("publish of {} went through {:?}", manifest.name, tracker.history());

        match (upload, cleanup) {
            (Ok((request, remote_reference)), Ok(())) => {
                info!(
                    "published {}@{} as {remote_reference}",
                    manifest.name, manifest.version
                );
                Ok(PublishOutcome {
                    package_name: manifest.name,
                    version: manifest.version,
                    archive_file_name,
                    remote_reference,
                    digest: request.digest,
                    size: request.size,
                    component_count,
                    run_id: run_id.to_string(),
                })
            }
            (Ok(_), Err(cleanup)) => {
                warn!("uploaded {} but cleanup failed: {cleanup}", manifest.name);
                Err(CoreError::Cleanup(cleanup))
            }
            (Err(primary), cleanup) => Err(CoreError::Publish(primary).with_cleanup(cleanup)),
        }
    }

    fn upload(&self, package: &AssembledPackage) -> Result<(UploadRequest, String), RemoteError> {
        let archive = package.archive_path();
        let request = UploadRequest::for_file(
            package.manifest.name.as_str(),
            package.manifest.version.as_str(),
            archive,
        )?;
        debug!(
            "uploading {} ({} bytes, {})",
            request.file_name, request.size, request.digest
        );
        let mut body = BufReader::new(File::open(archive)?);
        let reference = self.feed.upload(&request, &mut body)?;
        Ok((request, reference))
    }
}
