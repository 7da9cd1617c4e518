//! Transfer handle registry: per-request bookkeeping owned by the scheduler thread.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::request::{CompletionSink, TransferHandle};

/// Bookkeeping for one live transfer handle. `in_flight` implies `admitted`.
pub struct RegistryEntry<X> {
    pub handle: TransferHandle,
    pub sink: Box<dyn CompletionSink>,
    pub submitted_at: Instant,
    pub admitted: bool,
    pub in_flight: bool,
    /// Prepared transfer waiting for admission; taken when handed to the multiplexer.
    pub transfer: Option<X>,
}

impl<X> RegistryEntry<X> {
    pub fn new(
        handle: TransferHandle,
        sink: Box<dyn CompletionSink>,
        submitted_at: Instant,
        transfer: X,
    ) -> Self {
        Self {
            handle,
            sink,
            submitted_at,
            admitted: false,
            in_flight: false,
            transfer: Some(transfer),
        }
    }
}

/// Exactly one entry per live handle, keyed by handle (creation order).
pub struct Registry<X> {
    entries: BTreeMap<TransferHandle, RegistryEntry<X>>,
}

impl<X> Default for Registry<X> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<X> Registry<X> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry. A handle that is already registered is refused and
    /// the entry handed back.
    pub fn insert(&mut self, entry: RegistryEntry<X>) -> Result<(), RegistryEntry<X>> {
        if self.entries.contains_key(&entry.handle) {
            return Err(entry);
        }
        self.entries.insert(entry.handle, entry);
        Ok(())
    }

    /// Unadmitted entry with the earliest submission time; ties go to the
    /// earlier-created handle.
    pub fn find_oldest_unadmitted(&self) -> Option<TransferHandle> {
        self.entries
            .values()
            .filter(|e| !e.admitted)
            .min_by_key(|e| (e.submitted_at, e.handle))
            .map(|e| e.handle)
    }

    pub fn get_mut(&mut self, handle: TransferHandle) -> Option<&mut RegistryEntry<X>> {
        self.entries.get_mut(&handle)
    }

    /// Remove the entry for `handle`.
    pub fn retire(&mut self, handle: TransferHandle) -> Option<RegistryEntry<X>> {
        self.entries.remove(&handle)
    }

    /// Remove every entry, in handle order.
    pub fn drain(&mut self) -> Vec<RegistryEntry<X>> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn unadmitted_count(&self) -> usize {
        self.entries.values().filter(|e| !e.admitted).count()
    }

    #[cfg(test)]
    pub(crate) fn in_flight_count(&self) -> usize {
        self.entries.values().filter(|e| e.in_flight).count()
    }

    #[cfg(test)]
    pub(crate) fn in_flight_implies_admitted(&self) -> bool {
        self.entries.values().all(|e| !e.in_flight || e.admitted)
    }
}
