//! Local artifact discovery.
//!
//! State is re-derived from the filesystem on every run: the installed
//! version of a title is whatever its template extracts from the files
//! actually present. No manifest, nothing to drift out of sync.

use std::path::{Path, PathBuf};

use isokeep_version::{FileTemplate, RenderContext, Version, VersionStyle};
use tracing::debug;

use crate::error::TaskError;

/// A file on disk belonging to a managed title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    pub path: PathBuf,
    /// `None` for versionless templates.
    pub version: Option<Version>,
}

/// Find the currently installed artifact for a template in a directory.
///
/// Versioned templates scan the directory and pick the greatest
/// extractable version (stale duplicates can exist after an interrupted
/// run). Versionless templates look for the exact rendered name. A
/// missing directory is a first install, not an error.
pub fn current_artifact(
    dir: &Path,
    template: &FileTemplate,
    ctx: &RenderContext,
    style: &VersionStyle,
) -> Result<Option<LocalArtifact>, TaskError> {
    if !template.has_version() {
        let name = template.render(None, ctx)?;
        let path = dir.join(&name);
        return Ok(path.exists().then_some(LocalArtifact {
            path,
            version: None,
        }));
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TaskError::io(&format!("reading {}", dir.display()), e)),
    };

    let mut best: Option<LocalArtifact> = None;
    for entry in entries {
        let entry = entry.map_err(|e| TaskError::io(&format!("reading {}", dir.display()), e))?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(version) = template.extract_version(name, ctx, style)? else {
            continue;
        };
        debug!(file = name, version = %version, "found local artifact");
        let newer = best
            .as_ref()
            .and_then(|b| b.version.as_ref())
            .is_none_or(|current| version > *current);
        if newer {
            best = Some(LocalArtifact {
                path: entry.path(),
                version: Some(version),
            });
        }
    }
    Ok(best)
}
