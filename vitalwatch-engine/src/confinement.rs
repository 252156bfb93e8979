//! Thread confinement for the mutable vital graph.
//!
//! The engine and its vitals are mutated from exactly one execution
//! context, the one that created them. Every mutator asserts this before it
//! touches any state; a call from another thread is a contract violation
//! and panics.

use std::thread::{self, ThreadId};

/// Records the thread that owns a piece of model state.
#[derive(Debug, Clone)]
pub struct Confinement {
    owner: ThreadId,
    owner_name: Option<String>,
}

impl Confinement {
    /// Confine to the calling thread.
    pub fn current() -> Self {
        let owner = thread::current();
        Self {
            owner: owner.id(),
            owner_name: owner.name().map(str::to_string),
        }
    }

    /// Check whether the calling thread is the owner.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// The owning thread.
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Panic unless called from the owning thread.
    #[track_caller]
    pub fn assert_current(&self, operation: &str) {
        if !self.is_current() {
            let caller = thread::current();
            panic!(
                "{} must run on the model context (owner {:?} {:?}), called from {:?} {:?}",
                operation,
                self.owner,
                self.owner_name.as_deref().unwrap_or("<unnamed>"),
                caller.id(),
                caller.name().unwrap_or("<unnamed>"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_thread_passes() {
        let confinement = Confinement::current();
        assert!(confinement.is_current());
        confinement.assert_current("test");
    }

    #[test]
    fn other_thread_is_rejected() {
        let confinement = Confinement::current();
        let result = thread::spawn(move || {
            assert!(!confinement.is_current());
            confinement.assert_current("attach");
        })
        .join();

        assert!(result.is_err());
    }
}
