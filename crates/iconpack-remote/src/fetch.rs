use crate::listing::ListQuery;
use crate::{IconSource, RemoteError};
use iconpack_codegen::RawAsset;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Hard ceiling on fetch workers regardless of configuration.
pub const MAX_CONCURRENCY: usize = 64;

struct Job<'a> {
    name: &'a str,
    path: &'a str,
}

/// List a project's icons, then retrieve every image's markup with at most
/// `concurrency` requests in flight.
///
/// The result is in listing order (icons in order, each icon's images in
/// order) whatever order retrievals complete in. The first failed retrieval
/// stops workers from picking up further images; the error of the
/// earliest-listed failed image is returned.
pub fn fetch_all(
    source: &dyn IconSource,
    query: &ListQuery,
    concurrency: usize,
) -> Result<Vec<RawAsset>, RemoteError> {
    let icons = source.list_icons(query)?;
    let jobs: Vec<Job<'_>> = icons
        .iter()
        .flat_map(|icon| icon.images.iter())
        .map(|image| Job {
            name: &image.name,
            path: &image.path,
        })
        .collect();
    info!(
        "project {}: {} icons, {} images",
        query.project_id,
        icons.len(),
        jobs.len()
    );
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    let workers = concurrency.clamp(1, MAX_CONCURRENCY).min(jobs.len());
    let cursor = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let results: Mutex<Vec<(usize, Result<String, RemoteError>)>> =
        Mutex::new(Vec::with_capacity(jobs.len()));

    debug!("fetching {} images with {workers} workers", jobs.len());
    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                if failed.load(Ordering::Acquire) {
                    break;
                }
                let idx = cursor.fetch_add(1, Ordering::AcqRel);
                let Some(job) = jobs.get(idx) else {
                    break;
                };
                let outcome = source.fetch_markup(job.path);
                if let Err(e) = &outcome {
                    warn!("fetching '{}' from {} failed: {e}", job.name, job.path);
                    failed.store(true, Ordering::Release);
                }
                if let Ok(mut guard) = results.lock() {
                    guard.push((idx, outcome));
                }
            });
        }
    });

    let mut results = results
        .into_inner()
        .map_err(|_| RemoteError::Http("fetch worker panicked".to_owned()))?;
    results.sort_by_key(|(idx, _)| *idx);

    let mut assets = Vec::with_capacity(jobs.len());
    for (idx, outcome) in results {
        let markup = outcome?;
        assets.push(RawAsset::new(jobs[idx].name, markup));
    }
    if assets.len() != jobs.len() {
        return Err(RemoteError::Http(format!(
            "fetched {} of {} images",
            assets.len(),
            jobs.len()
        )));
    }
    Ok(assets)
}
