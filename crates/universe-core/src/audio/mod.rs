pub mod analyzer;
pub mod context;
pub mod graph;
pub mod nodes;
pub mod topology;

pub use analyzer::*;
pub use context::*;
pub use graph::*;
pub use topology::*;

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex shared with the audio callback, recovering from poison.
///
/// A panic on one side must not take the other side down with it.
pub(crate) fn lock_or_recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
