use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, range::WindowRef};

/// Index of a store in a machine's [`StoreBank`]. Tables hold handles, never
/// the bytes themselves, so two cpus naming one store see one array.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreHandle(usize);

impl StoreHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ByteStore {
    pub id: String,
    data: Vec<u8>,
}

impl fmt::Display for ByteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} size={:#06X}", self.id, self.data.len())
    }
}

impl ByteStore {
    pub fn new(id: impl Into<String>, size: usize) -> Self {
        ByteStore {
            id: id.into(),
            data: vec![0x00; size],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn read(&self, offset: usize) -> u8 {
        match self.data.get(offset) {
            Some(value) => *value,
            None => {
                tracing::warn!(
                    "Attempt to read out of bounds offset {:#06X} of store {}, returning 0xFF",
                    offset,
                    self.id
                );
                0xFF
            }
        }
    }

    pub fn write(&mut self, offset: usize, value: u8) {
        if let Some(slot) = self.data.get_mut(offset) {
            *slot = value;
        }
    }

    /// Copies `contents` from the start of the store, truncating whatever
    /// does not fit. Returns the number of bytes copied.
    pub fn load(&mut self, contents: &[u8]) -> usize {
        let len = contents.len().min(self.data.len());
        self.data[..len].copy_from_slice(&contents[..len]);
        if len < contents.len() {
            tracing::warn!(
                "Store {} holds {:#06X} bytes, dropped {:#06X} trailing bytes",
                self.id,
                self.data.len(),
                contents.len() - len
            );
        }
        len
    }
}

/// Owner of every byte store in a machine.
#[derive(Debug, Default, Clone)]
pub struct StoreBank {
    stores: Vec<ByteStore>,
}

impl StoreBank {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, store: ByteStore) -> StoreHandle {
        self.stores.push(store);
        StoreHandle(self.stores.len() - 1)
    }

    pub fn get(&self, handle: StoreHandle) -> Option<&ByteStore> {
        self.stores.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: StoreHandle) -> Option<&mut ByteStore> {
        self.stores.get_mut(handle.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ByteStore> {
        self.stores.iter()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn release(&mut self) {
        self.stores.clear();
    }
}

/// A store seen by more than one cpu, with every window mapping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedWindow {
    pub store: String,
    pub windows: Vec<WindowRef>,
}

/// Construction-time registry that turns store ids into handles. Every
/// window naming an id gets the handle of the first declaration; the
/// registry itself holds no bytes.
#[derive(Debug, Default, Clone)]
pub struct SharedWindowRegistry {
    by_id: HashMap<String, StoreHandle>,
    extents: HashMap<String, usize>,
    writable: HashMap<StoreHandle, bool>,
    windows: Vec<(StoreHandle, WindowRef)>,
}

impl SharedWindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the anonymous store behind an unnamed RAM window. Keyed by cpu,
    /// address space and low address, so a cpu's read and write windows over
    /// the same chip meet while memory and port RAM stay apart.
    pub fn private_id(window: &WindowRef) -> String {
        format!(
            "{}:{}@{:04X}",
            window.cpu,
            window.table.space(),
            window.low
        )
    }

    /// Records that `id` must hold at least `needed` bytes. A store created
    /// later takes the largest reservation made for its id.
    pub fn reserve(&mut self, id: &str, needed: usize) {
        let extent = self.extents.entry(id.to_string()).or_insert(0);
        *extent = (*extent).max(needed);
    }

    /// Returns the handle for `id`, creating the store in `bank` on first use.
    /// Its size is the larger of `needed` and any reservation for `id`; later
    /// windows must fit inside it and agree on whether it is writable.
    pub fn declare_shared(
        &mut self,
        bank: &mut StoreBank,
        id: &str,
        needed: usize,
        writable: bool,
        window: WindowRef,
    ) -> Result<StoreHandle, ConfigError> {
        let handle = match self.by_id.get(id) {
            Some(&handle) => {
                let first = self
                    .windows_of(handle)
                    .next()
                    .cloned()
                    .unwrap_or_else(|| window.clone());

                if self.writable.get(&handle).copied() != Some(writable) {
                    return Err(ConfigError::StoreKindConflict {
                        store: id.to_string(),
                        first,
                        second: window,
                    });
                }

                let size = bank.get(handle).map(ByteStore::len).unwrap_or_default();
                if needed > size {
                    return Err(ConfigError::SharedStoreConflict {
                        store: id.to_string(),
                        size,
                        needed,
                        first,
                        second: window,
                    });
                }
                handle
            }
            None => {
                let size = self.extents.get(id).copied().unwrap_or(0).max(needed);
                let handle = bank.insert(ByteStore::new(id, size));
                self.by_id.insert(id.to_string(), handle);
                self.writable.insert(handle, writable);
                handle
            }
        };

        self.windows.push((handle, window));
        Ok(handle)
    }

    /// Storage for a RAM range with no store id, see [`Self::private_id`].
    pub fn declare_private(
        &mut self,
        bank: &mut StoreBank,
        needed: usize,
        window: WindowRef,
    ) -> Result<StoreHandle, ConfigError> {
        let id = Self::private_id(&window);
        self.declare_shared(bank, &id, needed, true, window)
    }

    pub fn handle(&self, id: &str) -> Option<StoreHandle> {
        self.by_id.get(id).copied()
    }

    pub fn windows_of(&self, handle: StoreHandle) -> impl Iterator<Item = &WindowRef> {
        self.windows
            .iter()
            .filter(move |(h, _)| *h == handle)
            .map(|(_, w)| w)
    }

    /// Stores referenced by more than one cpu, in declaration order.
    pub fn shared_windows(&self, bank: &StoreBank) -> Vec<SharedWindow> {
        let mut handles: Vec<StoreHandle> = self.by_id.values().copied().collect();
        handles.sort();

        handles
            .into_iter()
            .filter_map(|handle| {
                let windows: Vec<WindowRef> = self.windows_of(handle).cloned().collect();
                let first_cpu = windows.first()?.cpu;
                if windows.iter().all(|w| w.cpu == first_cpu) {
                    return None;
                }
                Some(SharedWindow {
                    store: bank.get(handle)?.id.clone(),
                    windows,
                })
            })
            .collect()
    }
}
