//! Host syscall table
//!
//! Syscalls are host callbacks addressed by a 64-bit id. A handler receives
//! the full machine and may read or write registers, memory, and the
//! syscall table itself; returning an error aborts the current `execute()`
//! call with that error.
//!
//! Handlers are stored behind `Arc` so the interpreter can hold its own
//! reference across the call, which keeps re-entrant table mutation
//! (a handler registering or unregistering syscalls) sound.

use crate::error::Result;
use crate::vm::Vm;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A host callback invoked by the guest's syscall instruction
pub type SyscallHandler = dyn Fn(&mut Vm) -> Result<()> + Send + Sync;

/// Mapping from syscall id to host callback
#[derive(Default, Clone)]
pub struct SyscallTable {
    handlers: HashMap<u64, Arc<SyscallHandler>>,
}

impl SyscallTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `id`, replacing any previous handler.
    ///
    /// Safe only while no `execute()` call is in progress on this machine.
    pub fn register<F>(&mut self, id: u64, handler: F)
    where
        F: Fn(&mut Vm) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.insert(id, Arc::new(handler));
    }

    /// Remove the handler under `id`; returns whether one was present
    pub fn unregister(&mut self, id: u64) -> bool {
        self.handlers.remove(&id).is_some()
    }

    /// Look up a handler, handing out an owned reference
    pub fn get(&self, id: u64) -> Option<Arc<SyscallHandler>> {
        self.handlers.get(&id).cloned()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.handlers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered ids, in no particular order
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.handlers.keys().copied()
    }
}

impl fmt::Debug for SyscallTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<u64> = self.ids().collect();
        ids.sort_unstable();
        f.debug_struct("SyscallTable").field("ids", &ids).finish()
    }
}
