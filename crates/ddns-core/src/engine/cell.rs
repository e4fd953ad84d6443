//! Process-wide runner slot
//!
//! Every producer (one per proxy middleware instance, say) asks the
//! application-owned [`RunnerCell`] for the runner. The first caller's
//! configuration builds it; later callers get the same instance whatever
//! configuration they carry. A failed first construction is sticky.

use super::SyncRunner;
use crate::error::{Error, Result};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// First-caller-wins holder for the single [`SyncRunner`]
#[derive(Debug, Default)]
pub struct RunnerCell {
    slot: OnceLock<std::result::Result<Arc<SyncRunner>, String>>,
}

impl RunnerCell {
    /// Create an empty cell
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the runner, building it with `init` if nobody has yet
    ///
    /// Concurrent callers block until the first construction finishes and
    /// then all observe its result. When it failed, every caller gets the
    /// same configuration error.
    pub fn get_or_init<F>(&self, init: F) -> Result<Arc<SyncRunner>>
    where
        F: FnOnce() -> Result<SyncRunner>,
    {
        let mut initialized = false;
        let slot = self.slot.get_or_init(|| {
            initialized = true;
            init().map(Arc::new).map_err(|e| match e {
                Error::Config(message) => message,
                other => other.to_string(),
            })
        });
        if !initialized {
            debug!("Reusing existing sync runner");
        }

        match slot {
            Ok(runner) => Ok(Arc::clone(runner)),
            Err(message) => Err(Error::config(message.clone())),
        }
    }

    /// The runner, if one was built successfully
    pub fn get(&self) -> Option<Arc<SyncRunner>> {
        self.slot.get().and_then(|slot| slot.as_ref().ok().cloned())
    }
}
