//! One update task: resolve, select, compare, download, verify, commit.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use isokeep_fetch::{FetchOptions, Fetcher, HttpClient};
use isokeep_source::{locate, select, Candidate, ChecksumRef, SelectionCriteria};
use isokeep_verify::{parse_checksum_text, verify_detached_signature, verify_file_checksum, ChecksumAlgo};
use isokeep_version::{RenderContext, Version};
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, TaskError};
use crate::local::current_artifact;
use crate::title::{substitute, ChecksumPolicy, TitleSpec};

/// Identifies one unit of work: a title plus the variant axes chosen for
/// it. Multi-valued config axes expand into one task per combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskId {
    pub title: String,
    pub edition: Option<String>,
    pub arch: Option<String>,
    pub lang: Option<String>,
}

impl TaskId {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            edition: None,
            arch: None,
            lang: None,
        }
    }

    fn render_context(&self) -> RenderContext {
        RenderContext {
            edition: self.edition.clone(),
            arch: self.arch.clone(),
            lang: self.lang.clone(),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        let mut tags = Vec::new();
        if let Some(e) = &self.edition {
            tags.push(e.as_str());
        }
        if let Some(a) = &self.arch {
            tags.push(a.as_str());
        }
        if let Some(l) = &self.lang {
            tags.push(l.as_str());
        }
        if !tags.is_empty() {
            write!(f, " [{}]", tags.join("/"))?;
        }
        Ok(())
    }
}

/// How one task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Local artifact already current.
    Skipped { version: Option<String> },
    /// Dry run: an update exists but nothing was downloaded.
    WouldUpdate { version: Option<String> },
    /// A new artifact was verified and moved into place.
    Committed { old: Option<PathBuf>, new: PathBuf },
    Failed { kind: ErrorKind, message: String },
}

impl UpdateOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, UpdateOutcome::Failed { .. })
    }
}

impl From<TaskError> for UpdateOutcome {
    fn from(e: TaskError) -> Self {
        UpdateOutcome::Failed {
            kind: e.kind,
            message: e.message,
        }
    }
}

/// Drive a single task through its stages. Every stage error surfaces
/// here and is handled at the dispatcher boundary; nothing below this
/// function touches the final artifact path before verification passes.
pub(crate) async fn run_task<C: HttpClient>(
    client: Arc<C>,
    spec: &TitleSpec,
    id: &TaskId,
    directory: &Path,
    opts: &FetchOptions,
    dry_run: bool,
) -> Result<UpdateOutcome, TaskError> {
    let ctx = id.render_context();

    info!(task = %id, stage = "resolving", source = spec.source.kind(), "checking for updates");
    let descriptor = spec.descriptor_for(&ctx)?;
    let resolved = locate(client.as_ref(), &descriptor, &spec.style).await?;

    let remote_version = resolved.version.clone();
    if spec.template.has_version() && remote_version.is_none() {
        return Err(TaskError::new(
            ErrorKind::Parse,
            "source did not yield a version for a versioned title",
        ));
    }

    let local = current_artifact(directory, &spec.template, &ctx, &spec.style)?;
    if let (Some(local_version), Some(remote)) = (
        local.as_ref().and_then(|l| l.version.as_ref()),
        remote_version.as_ref(),
    ) {
        if local_version >= remote {
            info!(task = %id, version = %local_version, "up to date");
            return Ok(UpdateOutcome::Skipped {
                version: Some(local_version.to_string()),
            });
        }
        info!(task = %id, local = %local_version, remote = %remote, "update available");
    }

    debug!(task = %id, stage = "selecting", candidates = resolved.candidates.len());
    let candidate = pick_candidate(resolved.candidates, spec, id)?;

    let version_label = remote_version.as_ref().map(Version::to_string);
    if dry_run {
        info!(task = %id, version = ?version_label, url = %candidate.url, "dry run, skipping download");
        return Ok(UpdateOutcome::WouldUpdate {
            version: version_label,
        });
    }

    let rendered = spec.template.render(remote_version.as_ref(), &ctx)?;
    let destination = directory.join(&rendered);
    std::fs::create_dir_all(directory)
        .map_err(|e| TaskError::io(&format!("creating {}", directory.display()), e))?;

    info!(task = %id, stage = "downloading", url = %candidate.url);
    let fetcher = Fetcher::new(client.clone());
    let staged = fetcher.fetch(&candidate.url, &destination, opts).await?;

    info!(task = %id, stage = "verifying");
    verify_staged(
        client.as_ref(),
        spec,
        &ctx,
        remote_version.as_ref(),
        &candidate,
        resolved.checksum.as_ref(),
        staged.path(),
    )
    .await?;

    debug!(task = %id, stage = "committing", path = %destination.display());
    let mut old_path = local.as_ref().map(|l| l.path.clone());
    if !spec.template.has_version() {
        // Versionless titles replace in place; keep the previous image
        // as a `.old` backup beside the new one.
        if destination.exists() {
            let backup = suffixed(&destination, ".old");
            std::fs::rename(&destination, &backup)
                .map_err(|e| TaskError::io(&format!("backing up {}", destination.display()), e))?;
            old_path = Some(backup);
        }
    }
    let new = staged.commit()?;
    if spec.template.has_version() {
        if let Some(old) = &old_path {
            if old != &new {
                if let Err(e) = std::fs::remove_file(old) {
                    warn!(task = %id, path = %old.display(), error = %e, "failed to remove superseded artifact");
                }
            }
        }
    }

    info!(task = %id, new = %new.display(), "updated");
    Ok(UpdateOutcome::Committed { old: old_path, new })
}

fn pick_candidate(
    mut candidates: Vec<Candidate>,
    spec: &TitleSpec,
    id: &TaskId,
) -> Result<Candidate, TaskError> {
    if candidates.is_empty() {
        return Err(TaskError::new(
            ErrorKind::NotFound,
            "source listed no downloadable candidates",
        ));
    }
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }
    let criteria = SelectionCriteria {
        edition: id.edition.clone(),
        arch: id.arch.clone(),
        lang: id.lang.clone(),
    };
    let tagged = candidates
        .into_iter()
        .map(|c| c.infer_tags(&spec.valid_editions, &spec.valid_archs, &spec.valid_langs))
        .collect();
    Ok(select(tagged, &criteria)?)
}

/// Verify the staged file before it may reach its final name.
async fn verify_staged<C: HttpClient>(
    client: &C,
    spec: &TitleSpec,
    ctx: &RenderContext,
    version: Option<&Version>,
    candidate: &Candidate,
    discovered: Option<&ChecksumRef>,
    staged: &Path,
) -> Result<(), TaskError> {
    // A pinned checksum URL on the title wins over whatever the source
    // discovered in its listing.
    let checksum = match &spec.checksum_url {
        Some(raw) => {
            let url = expand_url(raw, ctx, version)?;
            let algo = ChecksumAlgo::from_name_hint(&url).ok_or_else(|| {
                TaskError::new(
                    ErrorKind::Parse,
                    format!("cannot infer digest algorithm from {url:?}"),
                )
            })?;
            Some(ChecksumRef::File { url, algo })
        }
        None => discovered.cloned(),
    };

    match checksum {
        None => match spec.checksum_policy {
            ChecksumPolicy::Require => Err(TaskError::new(
                ErrorKind::ChecksumUnavailable,
                "no checksum published for this artifact",
            )),
            ChecksumPolicy::Accept => {
                warn!(
                    url = %candidate.url,
                    "no checksum published, committing unverified"
                );
                Ok(())
            }
        },
        Some(ChecksumRef::Inline { algo, value }) => {
            if spec.signature.is_some() {
                return Err(TaskError::new(
                    ErrorKind::Parse,
                    "detached signature verification requires a checksum file",
                ));
            }
            verify_file_checksum(staged, algo, &value)?;
            Ok(())
        }
        Some(ChecksumRef::File { url, algo }) => {
            let text = client
                .get_text(&url)
                .await
                .map_err(|e| TaskError::new(ErrorKind::Network, e))?;

            if let Some(sig) = &spec.signature {
                let sig_url = expand_url(&sig.signature_url, ctx, version)?;
                let sig_hex = client
                    .get_text(&sig_url)
                    .await
                    .map_err(|e| TaskError::new(ErrorKind::Network, e))?;
                let signature = hex::decode(sig_hex.trim()).map_err(|_| {
                    TaskError::new(ErrorKind::SignatureInvalid, "signature file is not valid hex")
                })?;
                let key = hex::decode(&sig.public_key_hex).map_err(|_| {
                    TaskError::new(ErrorKind::SignatureInvalid, "pinned public key is not valid hex")
                })?;
                verify_detached_signature(text.as_bytes(), &signature, &key)?;
                debug!(url = %sig_url, "checksum file signature verified");
            }

            let expected = parse_checksum_text(&text, &[candidate.name.as_str()], 0)?;
            verify_file_checksum(staged, algo, &expected)?;
            Ok(())
        }
    }
}

/// Fill edition/arch/lang and `[[VER]]` into a URL template.
fn expand_url(
    raw: &str,
    ctx: &RenderContext,
    version: Option<&Version>,
) -> Result<String, TaskError> {
    let mut url = substitute(raw, ctx)?;
    if url.contains("[[VER]]") {
        let version = version.ok_or_else(|| {
            TaskError::new(
                ErrorKind::Parse,
                format!("{raw:?} needs [[VER]] but the source yielded no version"),
            )
        })?;
        url = url.replace("[[VER]]", &version.to_string());
    }
    Ok(url)
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
