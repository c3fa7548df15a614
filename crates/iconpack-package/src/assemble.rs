use crate::archive::Archiver;
use crate::layout::{PackageLayout, RunId};
use crate::manifest::{
    archive_stem, package_name_from_project, resolve_version, validate_package_name,
    PackageManifest, VersionStrategy,
};
use crate::PackageError;
use chrono::{DateTime, Utc};
use iconpack_codegen::ComponentArtifactSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const UNTYPED_BARREL: &str = "index.js";
const TYPED_BARREL: &str = "index.ts";
const DECLARATION_BARREL: &str = "index.d.ts";

/// Manifest inputs that do not come from the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSettings {
    /// Fixed package name; derived from the project name when unset.
    pub name: Option<String>,
    pub base_version: String,
    pub version_strategy: VersionStrategy,
    pub author: Option<String>,
    pub description: Option<String>,
    pub peer_dependencies: BTreeMap<String, String>,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            name: None,
            base_version: "1.0.0".to_owned(),
            version_strategy: VersionStrategy::Fixed,
            author: None,
            description: None,
            peer_dependencies: BTreeMap::from([
                ("react".to_owned(), ">= 16".to_owned()),
                ("react-dom".to_owned(), ">= 16".to_owned()),
            ]),
        }
    }
}

/// A package tree and archive on disk, ready to upload.
///
/// Owns the layout: whoever holds this value is responsible for tearing it
/// down or persisting it.
#[derive(Debug)]
pub struct AssembledPackage {
    pub layout: PackageLayout,
    pub manifest: PackageManifest,
    pub run_id: RunId,
    pub component_count: usize,
}

impl AssembledPackage {
    pub fn archive_path(&self) -> &Path {
        self.layout.archive_path()
    }

    pub fn archive_file_name(&self) -> String {
        self.layout
            .archive_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub struct Assembler<'a> {
    work_dir: PathBuf,
    settings: PackageSettings,
    archiver: &'a dyn Archiver,
}

impl<'a> Assembler<'a> {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        settings: PackageSettings,
        archiver: &'a dyn Archiver,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            settings,
            archiver,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn settings(&self) -> &PackageSettings {
        &self.settings
    }

    pub fn assemble(
        &self,
        project_name: &str,
        artifacts: &[ComponentArtifactSet],
    ) -> Result<AssembledPackage, PackageError> {
        self.assemble_with_run_id(project_name, artifacts, RunId::generate(), Utc::now())
    }

    /// Build the manifest, write every artifact and barrel under a fresh
    /// output root, and archive it. If anything fails once the output root
    /// exists, the root and archive are removed before the error is returned.
    pub fn assemble_with_run_id(
        &self,
        project_name: &str,
        artifacts: &[ComponentArtifactSet],
        run_id: RunId,
        now: DateTime<Utc>,
    ) -> Result<AssembledPackage, PackageError> {
        let manifest = self.build_manifest(project_name, now)?;
        fs::create_dir_all(&self.work_dir)?;

        let stem = format!("{}-{run_id}", archive_stem(&manifest.name));
        let layout = PackageLayout::new(
            self.work_dir.join(&stem),
            self.work_dir
                .join(format!("{stem}.{}", self.archiver.extension())),
        );
        debug!(
            "assembling {} {} into {}",
            manifest.name,
            manifest.version,
            layout.root().display()
        );

        if let Err(primary) = self.populate(&layout, &manifest, artifacts) {
            warn!("assembly failed, removing {}: {primary}", layout.root().display());
            return Err(match layout.teardown() {
                Ok(()) => primary,
                Err(cleanup) => PackageError::CleanupAfterFailure {
                    primary: Box::new(primary),
                    cleanup: Box::new(cleanup),
                },
            });
        }

        info!(
            "assembled {} {} with {} components",
            manifest.name,
            manifest.version,
            artifacts.len()
        );
        Ok(AssembledPackage {
            layout,
            manifest,
            run_id,
            component_count: artifacts.len(),
        })
    }

    fn build_manifest(
        &self,
        project_name: &str,
        now: DateTime<Utc>,
    ) -> Result<PackageManifest, PackageError> {
        let name = match &self.settings.name {
            Some(name) => name.clone(),
            None => package_name_from_project(project_name),
        };
        validate_package_name(&name)?;
        let version = resolve_version(
            &self.settings.base_version,
            self.settings.version_strategy,
            now,
        )?;
        let mut manifest = PackageManifest::new(name, version);
        manifest.author.clone_from(&self.settings.author);
        manifest.description.clone_from(&self.settings.description);
        manifest
            .peer_dependencies
            .clone_from(&self.settings.peer_dependencies);
        Ok(manifest)
    }

    fn populate(
        &self,
        layout: &PackageLayout,
        manifest: &PackageManifest,
        artifacts: &[ComponentArtifactSet],
    ) -> Result<(), PackageError> {
        layout.initialize()?;
        let untyped_dir = layout.untyped_dir();
        let typed_dir = layout.typed_dir();

        for set in artifacts {
            fs::write(untyped_dir.join(set.untyped_file_name()), &set.untyped_source)?;
            fs::write(typed_dir.join(set.typed_file_name()), &set.typed_source)?;
            fs::write(
                typed_dir.join(set.declaration_file_name()),
                &set.declaration_source,
            )?;
        }

        let untyped_barrel = join_lines(artifacts, |s| &s.untyped_export_line);
        let typed_barrel = join_lines(artifacts, |s| &s.typed_export_line);
        fs::write(untyped_dir.join(UNTYPED_BARREL), &untyped_barrel)?;
        fs::write(typed_dir.join(TYPED_BARREL), &typed_barrel)?;
        fs::write(typed_dir.join(DECLARATION_BARREL), &typed_barrel)?;

        fs::write(layout.manifest_path(), manifest.to_json()?)?;
        self.archiver
            .archive(layout.root(), layout.archive_path())?;
        Ok(())
    }
}

fn join_lines<'s>(
    artifacts: &'s [ComponentArtifactSet],
    line: impl Fn(&'s ComponentArtifactSet) -> &'s String,
) -> String {
    artifacts
        .iter()
        .map(line)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
}
