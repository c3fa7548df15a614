use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use iconpack_codegen::{generate_all, CollisionPolicy, RawAsset};
use iconpack_package::{validate_version, Assembler, PackageSettings, TarGzArchiver};
use std::fs;
use std::path::Path;

/// Every `*.svg` file directly under `dir`, ordered by file name.
fn read_assets(dir: &Path) -> Result<Vec<RawAsset>, String> {
    let entries =
        fs::read_dir(dir).map_err(|e| format!("failed to read {}: {e}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("failed to read {}: {e}", dir.display()))?;
        let path = entry.path();
        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    files
        .into_iter()
        .map(|path| {
            let markup = fs::read_to_string(&path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(RawAsset::new(name, markup))
        })
        .collect()
}

pub fn run(
    dir: &Path,
    project_name: &str,
    out: &Path,
    collisions: CollisionPolicy,
    version: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let mut settings = PackageSettings::default();
    if let Some(v) = version {
        validate_version(v).map_err(|e| format!("config error: {e}"))?;
        v.clone_into(&mut settings.base_version);
    }

    let assets = read_assets(dir)?;
    let artifacts = generate_all(&assets, collisions).map_err(|e| e.to_string())?;

    let pb = if json {
        None
    } else {
        Some(spinner("assembling package..."))
    };
    let archiver = TarGzArchiver::default();
    let package = match Assembler::new(out, settings, &archiver).assemble(project_name, &artifacts)
    {
        Ok(p) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "package assembled");
            }
            p
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "assembly failed");
            }
            return Err(e.to_string());
        }
    };

    let name = package.manifest.name.clone();
    let version = package.manifest.version.clone();
    let components = package.component_count;
    let (root, archive) = package.layout.persist();

    if json {
        let payload = serde_json::json!({
            "package": name,
            "version": version,
            "components": components,
            "root": root,
            "archive": archive,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("generated {name}@{version} with {components} components");
        println!("package: {}", root.display());
        println!("archive: {}", archive.display());
    }
    Ok(EXIT_SUCCESS)
}
