//! File-claim ledger: the one piece of state shared across concurrently
//! executing tasks. Guards against two tasks writing the same file at
//! once, while letting any number of readers of the same file coexist.

use crate::error::AoTError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A single file-access intent requested as part of a claim.
///
/// A write claim is exclusive: it conflicts with any other claim (read
/// or write) already held on the same path by a different task. A read
/// claim is shared: it conflicts only with an existing write claim held
/// by a different task, and coexists with other tasks' read claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileClaim {
    /// Non-exclusive read access.
    Read(PathBuf),
    /// Exclusive write access.
    Write(PathBuf),
}

impl FileClaim {
    fn path(&self) -> &PathBuf {
        match self {
            FileClaim::Read(p) | FileClaim::Write(p) => p,
        }
    }

    fn kind(&self) -> ClaimKind {
        match self {
            FileClaim::Read(_) => ClaimKind::Read,
            FileClaim::Write(_) => ClaimKind::Write,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimKind {
    Read,
    Write,
}

/// One task's held claim on a path.
#[derive(Debug, Clone)]
struct Holder {
    task_id: String,
    kind: ClaimKind,
}

/// Shared ledger of which tasks currently hold which paths.
///
/// Cloning is cheap (`Arc` inside) — every worker in a
/// [`crate::pool::SubagentPool`] holds a clone of the same ledger.
#[derive(Debug, Clone, Default)]
pub struct FileClaimLedger {
    claims: Arc<Mutex<HashMap<PathBuf, Vec<Holder>>>>,
}

impl FileClaimLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to take every claim in `claims` for `task_id`, atomically:
    /// either every claim is taken or none are.
    ///
    /// A write claim conflicts with any existing claim on the same path
    /// held by a different task. A read claim conflicts only with an
    /// existing write claim held by a different task; reads held by
    /// different tasks on the same path coexist. A task may always
    /// reclaim a path it already holds.
    ///
    /// Returns a [`ClaimGuard`] that releases every claim it holds when
    /// dropped — on success, failure, timeout, or panic unwind, whichever
    /// comes first.
    ///
    /// # Errors
    /// [`AoTError::FileClaimed`] naming the first contended path if any
    /// claim in `claims` is blocked by another task.
    pub fn claim(&self, task_id: &str, claims: Vec<FileClaim>) -> Result<ClaimGuard, AoTError> {
        let mut guard = self.claims.lock().unwrap();
        for c in &claims {
            if let Some(holders) = guard.get(c.path()) {
                for holder in holders {
                    if holder.task_id == task_id {
                        continue;
                    }
                    if c.kind() == ClaimKind::Write || holder.kind == ClaimKind::Write {
                        return Err(AoTError::FileClaimed {
                            path: c.path().display().to_string(),
                            holder: holder.task_id.clone(),
                        });
                    }
                }
            }
        }
        for c in &claims {
            guard.entry(c.path().clone()).or_default().push(Holder {
                task_id: task_id.to_string(),
                kind: c.kind(),
            });
        }
        drop(guard);
        Ok(ClaimGuard {
            ledger: self.clone(),
            task_id: task_id.to_string(),
            paths: claims.into_iter().map(|c| c.path().clone()).collect(),
        })
    }

    fn release(&self, task_id: &str, paths: &[PathBuf]) {
        let mut guard = self.claims.lock().unwrap();
        for path in paths {
            if let Some(holders) = guard.get_mut(path) {
                holders.retain(|h| h.task_id != task_id);
                if holders.is_empty() {
                    guard.remove(path);
                }
            }
        }
    }

    /// Number of paths with at least one claim currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.lock().unwrap().len()
    }

    /// Whether no path is currently claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.lock().unwrap().is_empty()
    }
}

/// RAII handle on a set of file claims. Releases them on drop, covering
/// every exit path (early return, error, timeout, panic unwind) without
/// the caller needing to remember to release explicitly.
#[must_use = "dropping this immediately releases the claim"]
pub struct ClaimGuard {
    ledger: FileClaimLedger,
    task_id: String,
    paths: Vec<PathBuf>,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.ledger.release(&self.task_id, &self.paths);
    }
}
