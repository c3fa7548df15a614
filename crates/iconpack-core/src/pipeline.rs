use crate::config::PipelineConfig;
use crate::publish::{PublishOutcome, Publisher};
use crate::{CoreError, ErrorClass};
use iconpack_codegen::{generate_all, CollisionPolicy};
use iconpack_package::{Archiver, Assembler, PackageSettings, TarGzArchiver};
use iconpack_remote::{
    fetch_all, ArtifactFeed, HttpFeed, HttpIconSource, IconSource, ListQuery,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// One publish trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub project_id: String,
    pub project_name: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_sort")]
    pub sort: String,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    100
}

fn default_sort() -> String {
    "-iconId".to_owned()
}

/// Project ids arrive as JSON strings or numbers depending on the caller.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

impl PublishRequest {
    pub fn new(project_id: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            page: default_page(),
            per_page: default_per_page(),
            sort: default_sort(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let id = self.project_id.trim();
        if id.is_empty() {
            return Err(CoreError::InvalidRequest("projectId must not be empty".to_owned()));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidRequest(format!(
                "projectId '{id}' may only contain letters, digits, '-' and '_'"
            )));
        }
        if self.project_name.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "projectName must not be empty".to_owned(),
            ));
        }
        if self.page == 0 {
            return Err(CoreError::InvalidRequest("page starts at 1".to_owned()));
        }
        if self.per_page == 0 {
            return Err(CoreError::InvalidRequest(
                "perPage must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn list_query(&self) -> ListQuery {
        ListQuery {
            project_id: self.project_id.trim().to_owned(),
            page: self.page,
            per_page: self.per_page,
            sort: self.sort.clone(),
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub message: String,
    pub package: String,
    pub version: String,
    pub remote_reference: String,
    pub components: usize,
    pub archive: String,
    pub digest: String,
    pub run_id: String,
    pub elapsed_ms: u64,
}

impl RunReport {
    fn new(outcome: PublishOutcome, elapsed_ms: u64) -> Self {
        Self {
            message: format!(
                "Published {}@{} with {} components",
                outcome.package_name, outcome.version, outcome.component_count
            ),
            package: outcome.package_name,
            version: outcome.version,
            remote_reference: outcome.remote_reference,
            components: outcome.component_count,
            archive: outcome.archive_file_name,
            digest: outcome.digest,
            run_id: outcome.run_id,
            elapsed_ms,
        }
    }
}

/// User-visible failure: class and message only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub class: ErrorClass,
    pub message: String,
}

impl From<&CoreError> for ErrorInfo {
    fn from(e: &CoreError) -> Self {
        Self {
            class: e.class(),
            message: e.to_string(),
        }
    }
}

/// The single outcome of a run.
///
/// Serializes with a `succeeded` flag: the report fields follow it on
/// success, an `error` object on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    Published(RunReport),
    Failed { error: ErrorInfo },
}

impl PublishResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Published(_))
    }

    pub fn remote_reference(&self) -> Option<&str> {
        match self {
            Self::Published(report) => Some(&report.remote_reference),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            Self::Published(_) => None,
            Self::Failed { error } => Some(error),
        }
    }
}

impl Serialize for PublishResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            succeeded: bool,
            #[serde(flatten)]
            report: Option<&'a RunReport>,
            #[serde(skip_serializing_if = "Option::is_none")]
            error: Option<&'a ErrorInfo>,
        }
        let report = match self {
            Self::Published(report) => Some(report),
            Self::Failed { .. } => None,
        };
        Wire {
            succeeded: self.is_success(),
            report,
            error: self.error(),
        }
        .serialize(serializer)
    }
}

/// Fetch, generate, assemble and publish, with the capabilities injected.
pub struct Pipeline {
    source: Box<dyn IconSource>,
    feed: Box<dyn ArtifactFeed>,
    archiver: Box<dyn Archiver>,
    work_dir: PathBuf,
    settings: PackageSettings,
    collisions: CollisionPolicy,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn IconSource>,
        feed: Box<dyn ArtifactFeed>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            feed,
            archiver: Box::new(TarGzArchiver::default()),
            work_dir: work_dir.into(),
            settings: PackageSettings::default(),
            collisions: CollisionPolicy::default(),
            concurrency: 8,
        }
    }

    /// Build HTTP-backed capabilities from configuration. Fails when the feed
    /// token variable is not set.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, CoreError> {
        let feed = HttpFeed::from_env(config.feed.clone()).map_err(|e| {
            CoreError::Config(crate::ConfigError::Invalid(e.to_string()))
        })?;
        let source = HttpIconSource::new(config.icon_service.clone());
        Ok(Self::new(Box::new(source), Box::new(feed), &config.work_dir)
            .with_settings(config.package.settings())
            .with_collision_policy(config.package.collisions)
            .with_concurrency(config.icon_service.concurrency))
    }

    #[must_use]
    pub fn with_archiver(mut self, archiver: Box<dyn Archiver>) -> Self {
        self.archiver = archiver;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PackageSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collisions = policy;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn run(&self, request: &PublishRequest) -> Result<RunReport, CoreError> {
        let started = Instant::now();
        request.validate()?;
        info!(
            "run for project {} ('{}') started",
            request.project_id, request.project_name
        );

        let assets = fetch_all(&*self.source, &request.list_query(), self.concurrency)
            .map_err(CoreError::Fetch)?;
        let artifacts = generate_all(&assets, self.collisions)?;
        info!("generated {} components", artifacts.len());

        let assembler = Assembler::new(&self.work_dir, self.settings.clone(), &*self.archiver);
        let package = assembler
            .assemble(&request.project_name, &artifacts)
            .map_err(CoreError::from_assembly)?;
        let outcome = Publisher::new(&*self.feed).publish(package)?;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(RunReport::new(outcome, elapsed_ms))
    }

    /// Run and fold the outcome into a [`PublishResult`]. Failures are logged
    /// here with their full chain.
    pub fn execute(&self, request: &PublishRequest) -> PublishResult {
        match self.run(request) {
            Ok(report) => PublishResult::Published(report),
            Err(e) => {
                error!("run for project {} failed ({}): {e}", request.project_id, e.class());
                PublishResult::Failed {
                    error: ErrorInfo::from(&e),
                }
            }
        }
    }
}
