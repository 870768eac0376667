//! In-flight run deduplication per source path.
//!
//! When the same image is requested from several places in one build (a
//! hero image reused across pages, say), only one pipeline run may generate
//! it. The first caller to [`InFlightCoordinator::begin`] becomes the
//! *owner* and runs the pipeline; everyone else becomes a *follower* and
//! blocks on [`Waiter::wait`] until the owner publishes its outcome through
//! [`InFlightCoordinator::end`]. Followers observe the owner's result —
//! success or failure — never a silent early return, since a follower that
//! proceeded before the owner finished could read half-written cache files.
//!
//! The registry is generic over the outcome type; only ticket
//! creation/lookup for a single path holds the map lock, so runs for
//! different paths never serialize on each other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use thiserror::Error;

/// Ticket invariant violation — `end` without a live `begin`. Unreachable
/// under correct pipeline locking.
#[derive(Error, Debug)]
#[error("no in-flight ticket for {}", path.display())]
pub struct CoordinationError {
    pub path: PathBuf,
}

/// One in-flight run: the slot the owner's outcome lands in.
struct Ticket<O> {
    outcome: Mutex<Option<O>>,
    done: Condvar,
}

impl<O> Ticket<O> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }
}

/// What `begin` made of this caller.
pub enum Role<O> {
    /// First caller for the path; must run the pipeline and call `end`.
    Owner,
    /// A run is already in flight; wait on the handle for its outcome.
    Follower(Waiter<O>),
}

/// Follower handle onto an owner's ticket.
pub struct Waiter<O> {
    ticket: Arc<Ticket<O>>,
}

impl<O: Clone> Waiter<O> {
    /// Block until the owner calls `end`, then return its outcome.
    pub fn wait(self) -> O {
        let mut outcome = self
            .ticket
            .outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while outcome.is_none() {
            outcome = self
                .ticket
                .done
                .wait(outcome)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        outcome.clone().expect("ticket signalled without outcome")
    }
}

/// Registry of in-flight runs keyed by source path.
pub struct InFlightCoordinator<O> {
    tickets: Mutex<HashMap<PathBuf, Arc<Ticket<O>>>>,
}

impl<O: Clone> InFlightCoordinator<O> {
    pub fn new() -> Self {
        Self {
            tickets: Mutex::new(HashMap::new()),
        }
    }

    /// Claim or join the in-flight run for `path`.
    pub fn begin(&self, path: &Path) -> Role<O> {
        let mut tickets = self
            .tickets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match tickets.get(path) {
            Some(ticket) => Role::Follower(Waiter {
                ticket: Arc::clone(ticket),
            }),
            None => {
                tickets.insert(path.to_path_buf(), Arc::new(Ticket::new()));
                Role::Owner
            }
        }
    }

    /// Publish the owner's outcome, wake all followers, and retire the
    /// ticket. Late `begin` callers after this start a fresh run.
    pub fn end(&self, path: &Path, outcome: O) -> Result<(), CoordinationError> {
        let ticket = {
            let mut tickets = self
                .tickets
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            tickets.remove(path).ok_or_else(|| CoordinationError {
                path: path.to_path_buf(),
            })?
        };
        *ticket
            .outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(outcome);
        ticket.done.notify_all();
        Ok(())
    }
}

impl<O: Clone> Default for InFlightCoordinator<O> {
    fn default() -> Self {
        Self::new()
    }
}
