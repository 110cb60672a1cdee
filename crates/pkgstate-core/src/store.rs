//! Package state store.
//!
//! The single owner of the [`PackageStateTable`]. Every write replaces a
//! whole entry while the table lock is held, so readers never observe a
//! half-applied state. The lock is never held across an `.await`.

use pkgstate_schema::{OperationStatus, PackageName, PackageState, PackageStateTable};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A cloneable handle to the shared state table.
///
/// Clones share the same table; the table lives until the last handle is
/// dropped.
#[derive(Clone, Default)]
pub struct StateStore {
    table: Arc<RwLock<PackageStateTable>>,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are whole values, so a writer that panicked mid-operation
    // cannot have left a torn entry behind.
    fn read(&self) -> RwLockReadGuard<'_, PackageStateTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PackageStateTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state of a package, if it has ever been observed.
    pub fn get(&self, id: &str) -> Option<PackageState> {
        self.read().get(id).cloned()
    }

    /// Replace the entry for `id`, creating it if needed.
    pub fn set(&self, id: PackageName, state: PackageState) {
        self.write().insert(id, state);
    }

    /// Replace the entry for `id` only if `check` accepts the current one.
    ///
    /// The check and the write happen under one lock acquisition, so no
    /// other writer can slip in between.
    pub fn set_if<E>(
        &self,
        id: &PackageName,
        state: PackageState,
        check: impl FnOnce(Option<&PackageState>) -> Result<(), E>,
    ) -> Result<(), E> {
        let mut table = self.write();
        check(table.get(id.as_str()))?;
        table.insert(id.clone(), state);
        Ok(())
    }

    /// Edit an existing entry in place. Returns `None` if `id` is absent.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut PackageState) -> R) -> Option<R> {
        self.write().get_mut(id).map(f)
    }

    /// Commit a batch of entries in one step.
    ///
    /// Entries for which `replace` returns `false` (given the current
    /// value) are left as they are. Returns the names that were skipped.
    pub fn apply_batch(
        &self,
        batch: PackageStateTable,
        replace: impl Fn(Option<&PackageState>) -> bool,
    ) -> Vec<PackageName> {
        let mut table = self.write();
        let mut skipped = Vec::new();
        for (id, state) in batch {
            if replace(table.get(id.as_str())) {
                table.insert(id, state);
            } else {
                skipped.push(id);
            }
        }
        skipped.sort();
        skipped
    }

    /// All packages currently in `status`, sorted by name.
    pub fn find_by_status(&self, status: OperationStatus) -> Vec<PackageName> {
        let mut found: Vec<PackageName> = self
            .read()
            .iter()
            .filter(|(_, state)| state.status() == status)
            .map(|(id, _)| id.clone())
            .collect();
        found.sort();
        found
    }

    /// A point-in-time copy of the whole table.
    pub fn snapshot(&self) -> PackageStateTable {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
