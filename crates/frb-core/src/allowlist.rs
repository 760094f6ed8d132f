//! Chat allowlist with hot reload.
//!
//! - The allowlist lives in a YAML file: a flat sequence of ids, or a mapping
//!   with any of `allowlist` / `allowed_ids` / `ids` (ids are merged).
//! - An empty allowlist allows everyone. Missing or broken files load as empty.
//! - Readers see immutable snapshots; a reload publishes a whole new set at once.
//! - File changes schedule a debounced reload; at most one is pending at a time.

use std::{
    collections::HashSet,
    ffi::{OsStr, OsString},
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use arc_swap::ArcSwap;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_yaml::Mapping;
use tokio::{sync::Notify, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{errors::Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Allowlist {
    ids: HashSet<i64>,
}

impl Allowlist {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn allows(&self, id: i64) -> bool {
        self.ids.is_empty() || self.ids.contains(&id)
    }
}

/// Mapping keys that may hold the id list. Ids under several keys are merged.
const LIST_KEYS: [&str; 3] = ["allowlist", "allowed_ids", "ids"];

pub fn parse_allowlist(text: &str) -> Result<Allowlist> {
    if text.trim().is_empty() {
        return Ok(Allowlist::default());
    }

    if let Ok(list) = serde_yaml::from_str::<Option<Vec<i64>>>(text) {
        return Ok(Allowlist::new(list.unwrap_or_default()));
    }

    let Some(doc) = serde_yaml::from_str::<Option<Mapping>>(text)? else {
        return Ok(Allowlist::default());
    };

    let mut ids = Vec::new();
    for key in LIST_KEYS {
        if let Some(value) = doc.get(key) {
            let list: Option<Vec<i64>> = serde_yaml::from_value(value.clone())?;
            ids.extend(list.unwrap_or_default());
        }
    }
    Ok(Allowlist::new(ids))
}

fn read_allowlist(path: &Path) -> Allowlist {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "allowlist file not found, allowing everyone");
            return Allowlist::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read allowlist, allowing everyone");
            return Allowlist::default();
        }
    };

    match parse_allowlist(&text) {
        Ok(list) => list,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse allowlist, allowing everyone");
            Allowlist::default()
        }
    }
}

/// Shared handle to the current allowlist snapshot.
pub struct AllowlistStore {
    path: PathBuf,
    current: ArcSwap<Allowlist>,
    reload_pending: AtomicBool,
    wake: Notify,
}

impl AllowlistStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = read_allowlist(&path);
        info!(path = %path.display(), ids = initial.len(), "allowlist loaded");

        Self {
            path,
            current: ArcSwap::from_pointee(initial),
            reload_pending: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_allowed(&self, id: i64) -> bool {
        self.current.load().allows(id)
    }

    pub fn snapshot(&self) -> Arc<Allowlist> {
        self.current.load_full()
    }

    /// Re-read the file and publish the result. Returns the number of ids loaded.
    pub fn reload(&self) -> usize {
        let next = read_allowlist(&self.path);
        let len = next.len();
        self.current.store(Arc::new(next));
        info!(path = %self.path.display(), ids = len, "allowlist reloaded");
        len
    }

    /// Ask the reload worker for a debounced reload.
    ///
    /// Returns `false` (and does nothing) while another reload is pending or running.
    pub fn schedule_reload(&self) -> bool {
        if self
            .reload_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.wake.notify_one();
        true
    }

    fn finish_reload(&self) {
        self.reload_pending.store(false, Ordering::Release);
    }
}

pub(crate) fn spawn_reload_worker(
    store: Arc<AllowlistStore>,
    debounce: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = store.wake.notified() => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(debounce) => {}
            }
            store.reload();
            store.finish_reload();
        }
        debug!("allowlist reload worker stopped");
    })
}

/// File watcher + reload worker for an [`AllowlistStore`].
///
/// The parent directory is watched (not the file itself) so editors that save
/// by writing a temp file and renaming it over the original are still seen.
pub struct AllowlistWatcher {
    watcher: RecommendedWatcher,
    worker: JoinHandle<()>,
    cancel: CancellationToken,
}

impl AllowlistWatcher {
    pub fn spawn(
        store: Arc<AllowlistStore>,
        debounce: Duration,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let path = store.path().to_path_buf();
        let file_name = path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| Error::InvalidPath {
                path: path.clone(),
                reason: "allowlist path has no file name".to_string(),
            })?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let events_store = store.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if is_relevant(&event, &file_name) && events_store.schedule_reload() {
                        debug!(kind = ?event.kind, "allowlist change detected, reload scheduled");
                    }
                }
                Err(err) => warn!(error = %err, "allowlist watcher error"),
            })
            .map_err(|e| Error::External(format!("failed to create allowlist watcher: {e}")))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::InvalidPath {
                path: dir.clone(),
                reason: format!("cannot watch directory: {e}"),
            })?;

        let worker = spawn_reload_worker(store, debounce, cancel.clone());
        info!(dir = %dir.display(), "allowlist watcher started");

        Ok(Self {
            watcher,
            worker,
            cancel,
        })
    }

    /// Stop watching and wait for the reload worker to exit.
    pub async fn shutdown(self) {
        let Self {
            watcher,
            worker,
            cancel,
        } = self;
        drop(watcher);
        cancel.cancel();
        if let Err(e) = worker.await {
            warn!(error = %e, "allowlist reload worker panicked");
        }
    }
}

fn is_relevant(event: &notify::Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
}
