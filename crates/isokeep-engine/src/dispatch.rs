//! Bounded-concurrency fan-out over the configured tasks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use isokeep_fetch::{FetchOptions, HttpClient, ProgressFn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::{ConfigEntry, RunConfig};
use crate::error::{ErrorKind, TaskError};
use crate::task::{run_task, TaskId, UpdateOutcome};
use crate::title::TitleSpec;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Builds a per-task progress callback; the dispatcher calls it once per
/// download with the task it belongs to.
pub type ProgressFactory = Arc<dyn Fn(&TaskId) -> ProgressFn + Send + Sync>;

/// Runs every configured task with failure isolation: one title's error
/// never stops its siblings, except a full disk which aborts the run.
pub struct Dispatcher<C: HttpClient + 'static> {
    client: Arc<C>,
    concurrency: usize,
    cancel: CancellationToken,
    progress: Option<ProgressFactory>,
    dry_run: bool,
}

impl<C: HttpClient + 'static> Dispatcher<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
            cancel: CancellationToken::new(),
            progress: None,
            dry_run: false,
        }
    }

    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    /// Cancelling this token aborts in-flight downloads and reports the
    /// interrupted tasks as failed.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn progress(mut self, factory: ProgressFactory) -> Self {
        self.progress = Some(factory);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run every task the configuration expands to, rooted at `root`.
    pub async fn run_all(
        &self,
        config: &RunConfig,
        catalog: &[TitleSpec],
        root: &Path,
    ) -> BTreeMap<TaskId, UpdateOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join = JoinSet::new();

        for entry in &config.entries {
            let Some(spec) = catalog
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(&entry.title))
            else {
                warn!(title = %entry.title, "configured title is not in the catalog");
                continue;
            };
            for seed in expand(spec, entry) {
                self.spawn(&mut join, spec, seed, root.join(&entry.directory), &semaphore);
            }
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    if let UpdateOutcome::Failed { kind, message } = &outcome {
                        error!(task = %id, kind = %kind, "{message}");
                    }
                    outcomes.insert(id, outcome);
                }
                Err(e) => error!(error = %e, "task panicked"),
            }
        }
        outcomes
    }

    fn spawn(
        &self,
        join: &mut JoinSet<(TaskId, UpdateOutcome)>,
        spec: &TitleSpec,
        seed: Result<TaskId, (TaskId, TaskError)>,
        directory: PathBuf,
        semaphore: &Arc<Semaphore>,
    ) {
        let id = match seed {
            Ok(id) => id,
            Err((id, e)) => {
                join.spawn(async move { (id, e.into()) });
                return;
            }
        };

        let client = self.client.clone();
        let spec = spec.clone();
        let semaphore = semaphore.clone();
        let cancel = self.cancel.clone();
        let dry_run = self.dry_run;
        let opts = FetchOptions {
            cancel: cancel.clone(),
            on_progress: self.progress.as_ref().map(|f| f(&id)),
            ..FetchOptions::default()
        };

        join.spawn(async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return (id, cancelled()),
            };
            if cancel.is_cancelled() {
                return (id, cancelled());
            }
            match run_task(client, &spec, &id, &directory, &opts, dry_run).await {
                Ok(outcome) => (id, outcome),
                Err(e) => {
                    if e.is_fatal() {
                        error!(task = %id, "disk full, aborting the remaining run");
                        cancel.cancel();
                    }
                    (id, e.into())
                }
            }
        });
    }
}

fn cancelled() -> UpdateOutcome {
    UpdateOutcome::Failed {
        kind: ErrorKind::Cancelled,
        message: "run aborted".to_string(),
    }
}

/// Expand a config entry's edition/arch/lang axes into task ids, one per
/// combination. Values are canonicalized against the title's valid
/// lists; a bad value becomes a failed task rather than aborting the
/// whole expansion.
fn expand(spec: &TitleSpec, entry: &ConfigEntry) -> Vec<Result<TaskId, (TaskId, TaskError)>> {
    fn axis(values: &[String]) -> Vec<Option<&String>> {
        if values.is_empty() {
            vec![None]
        } else {
            values.iter().map(Some).collect()
        }
    }

    let mut seeds = Vec::new();
    for edition in axis(&entry.editions) {
        for arch in axis(&entry.archs) {
            for lang in axis(&entry.langs) {
                let mut id = TaskId::new(spec.name.clone());
                id.edition = edition.cloned();
                id.arch = arch.cloned();
                id.lang = lang.cloned();

                let canonical = canonicalize(spec, &mut id);
                seeds.push(match canonical {
                    Ok(()) => Ok(id),
                    Err(e) => Err((id, e)),
                });
            }
        }
    }
    seeds
}

fn canonicalize(spec: &TitleSpec, id: &mut TaskId) -> Result<(), TaskError> {
    if let Some(edition) = &id.edition {
        id.edition = Some(TitleSpec::canonical_value(
            "edition",
            edition,
            &spec.valid_editions,
        )?);
    }
    if let Some(arch) = &id.arch {
        id.arch = Some(TitleSpec::canonical_value(
            "architecture",
            arch,
            &spec.valid_archs,
        )?);
    }
    if let Some(lang) = &id.lang {
        id.lang = Some(TitleSpec::canonical_value(
            "language",
            lang,
            &spec.valid_langs,
        )?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_title;

    fn entry(title: &str, editions: &[&str], langs: &[&str]) -> ConfigEntry {
        ConfigEntry {
            title: title.to_string(),
            directory: PathBuf::new(),
            editions: editions.iter().map(|s| s.to_string()).collect(),
            archs: Vec::new(),
            langs: langs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn expansion_is_a_cross_product() {
        let spec = find_title("Windows11").unwrap();
        let seeds = expand(
            &spec,
            &entry("Windows11", &[], &["English", "EnglishInternational"]),
        );
        assert_eq!(seeds.len(), 2);
        assert!(seeds.iter().all(Result::is_ok));
    }

    #[test]
    fn unknown_edition_becomes_a_failed_seed() {
        let spec = find_title("Debian").unwrap();
        let seeds = expand(&spec, &entry("Debian", &["kde", "plasma6"], &[]));
        assert_eq!(seeds.len(), 2);
        assert!(seeds[0].is_ok());
        let Err((id, e)) = &seeds[1] else {
            panic!("expected a failed seed");
        };
        assert_eq!(id.edition.as_deref(), Some("plasma6"));
        assert_eq!(e.kind, ErrorKind::NoMatch);
    }

    #[test]
    fn undeclared_axes_pass_values_through() {
        let spec = find_title("ArchLinux").unwrap();
        let mut e = entry("ArchLinux", &[], &[]);
        e.archs = vec!["x86_64".to_string()];
        let seeds = expand(&spec, &e);
        let Ok(id) = &seeds[0] else {
            panic!("expected a valid seed");
        };
        assert_eq!(id.arch.as_deref(), Some("x86_64"));
    }

    #[test]
    fn editions_are_canonicalized() {
        let spec = find_title("TempleOS").unwrap();
        let seeds = expand(&spec, &entry("TempleOS", &["lite"], &[]));
        let Ok(id) = &seeds[0] else {
            panic!("expected a valid seed");
        };
        assert_eq!(id.edition.as_deref(), Some("Lite"));
    }
}
