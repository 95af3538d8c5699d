//! Downloads directory scanning.
//!
//! Build artifacts are named `<project>-<channel>-<platform>-<stamp>.<ext>`,
//! where the stamp is the build time as `%Y%m%d%H%M%S` (or just `%Y%m%d`
//! for date-only nightlies).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read downloads directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No build artifacts found in {0}")]
    NoBuilds(PathBuf),
}

pub type Result<T> = std::result::Result<T, ArtifactError>;

/// A packaged build output file, named to encode its creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub timestamp: NaiveDateTime,
    pub filename: String,
}

/// The latest build plus every older build in descending timestamp order.
///
/// `previous` never contains `latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildHistory {
    pub latest: BuildArtifact,
    pub previous: Vec<BuildArtifact>,
}

/// Scan a downloads directory and split its artifacts into the latest build
/// and the remaining history.
///
/// Filenames without a parseable build stamp are skipped. When two files
/// share a stamp, the lexicographically greatest filename wins; entries are
/// sorted by name first so the outcome does not depend on directory order.
pub fn scan_downloads(dir: &Path) -> Result<BuildHistory> {
    let entries = std::fs::read_dir(dir).map_err(|e| ArtifactError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ArtifactError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let mut builds: BTreeMap<NaiveDateTime, String> = BTreeMap::new();
    for name in names {
        let Some(timestamp) = parse_build_timestamp(&name) else {
            warn!(filename = %name, "skipping file without a parseable build timestamp");
            continue;
        };
        if let Some(replaced) = builds.insert(timestamp, name.clone()) {
            warn!(kept = %name, replaced = %replaced, "two artifacts share a build timestamp");
        }
    }

    let mut all: Vec<BuildArtifact> = builds
        .into_iter()
        .map(|(timestamp, filename)| BuildArtifact {
            timestamp,
            filename,
        })
        .collect();

    let latest = all
        .pop()
        .ok_or_else(|| ArtifactError::NoBuilds(dir.to_path_buf()))?;
    all.reverse();

    Ok(BuildHistory {
        latest,
        previous: all,
    })
}

/// Extract the build timestamp from an artifact filename: the fourth
/// `-`-separated segment, up to its first `.`.
fn parse_build_timestamp(filename: &str) -> Option<NaiveDateTime> {
    let segment = filename.split('-').nth(3)?;
    let stamp = segment.split('.').next()?;

    match stamp.len() {
        14 => NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").ok(),
        8 => NaiveDate::parse_from_str(stamp, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        _ => None,
    }
}
