//! Copy-on-write state layers kept in an index-addressed arena.
//!
//! Every [`StateLayer`] handle points at one slot of a shared [`LayerArena`].
//! A slot holds its parent's index and a pending map of key to value or
//! tombstone. Reads walk the chain of pending maps towards the root and fall
//! through to the durable store.
//!
//! ```text
//!   store  <-  root (slot 0)  <-  block track (slot 1)  <-  tx track (slot 2)
//! ```
//!
//! Slots are reference counted: one count per live handle plus one per child
//! layer naming it as parent. A slot returns to the free list only when the
//! count drops to zero, so a parent index is always valid while a child is
//! alive.
//!
//! The arena sits behind a single `RwLock`. `commit` takes the write lock for
//! the whole merge (and for the store write of a root layer), so concurrent
//! readers see either the pre-commit or the post-commit state.

use {
    crate::{
        error::{Result, StateError},
        store::{KeyValueStore, WriteBatch},
    },
    log::trace,
    parking_lot::RwLock,
    std::{
        collections::{BTreeMap, HashMap},
        fmt,
        sync::Arc,
    },
};

/// Index of a layer slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerId(usize);

impl LayerId {
    pub fn index(self) -> usize {
        self.0
    }
}

type PendingMap = HashMap<Vec<u8>, Option<Vec<u8>>>;

#[derive(Debug)]
struct Layer {
    parent: Option<LayerId>,
    pending: PendingMap,
    refs: usize,
}

pub struct LayerArena {
    store: Arc<dyn KeyValueStore>,
    slots: Vec<Option<Layer>>,
    free: Vec<usize>,
}

impl fmt::Debug for LayerArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerArena")
            .field("slots", &self.slots.len())
            .field("live", &self.live_layers())
            .finish()
    }
}

impl LayerArena {
    fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of slots currently holding a layer.
    pub fn live_layers(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn alloc(&mut self, parent: Option<LayerId>, pending: PendingMap) -> LayerId {
        if let Some(parent) = parent {
            if let Some(layer) = self.slot_mut(parent) {
                layer.refs = layer.refs.saturating_add(1);
            }
        }
        let layer = Layer {
            parent,
            pending,
            refs: 1,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(layer);
                LayerId(idx)
            }
            None => {
                self.slots.push(Some(layer));
                LayerId(self.slots.len().saturating_sub(1))
            }
        }
    }

    /// Drops one reference, recycling the slot and walking up to the parent
    /// when the count reaches zero.
    fn release(&mut self, id: LayerId) {
        let mut cursor = Some(id);
        while let Some(id) = cursor {
            cursor = None;
            let Some(layer) = self.slot_mut(id) else {
                return;
            };
            layer.refs = layer.refs.saturating_sub(1);
            if layer.refs == 0 {
                let parent = layer.parent;
                self.slots[id.0] = None;
                self.free.push(id.0);
                trace!("recycled state layer {}", id.0);
                cursor = parent;
            }
        }
    }

    fn slot(&self, id: LayerId) -> Result<&Layer> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(StateError::MissingLayer(id.0))
    }

    fn slot_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Ancestors of `id`, starting with `id` itself.
    fn lineage(&self, id: LayerId) -> Result<Vec<LayerId>> {
        let mut chain = vec![id];
        let mut cursor = self.slot(id)?.parent;
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.slot(parent)?.parent;
        }
        Ok(chain)
    }

    fn get(&self, id: LayerId, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let layer = self.slot(current)?;
            if let Some(entry) = layer.pending.get(key) {
                return Ok(entry.clone());
            }
            cursor = layer.parent;
        }
        self.store.get(key)
    }

    fn scan_prefix(&self, id: LayerId, prefix: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        let mut merged: BTreeMap<_, _> = self.store.prefix_iter(prefix)?.into_iter().collect();
        for layer_id in self.lineage(id)?.into_iter().rev() {
            for (key, value) in &self.slot(layer_id)?.pending {
                if !key.starts_with(prefix) {
                    continue;
                }
                match value {
                    Some(value) => merged.insert(key.clone(), value.clone()),
                    None => merged.remove(key),
                };
            }
        }
        Ok(merged)
    }

    fn commit(&mut self, id: LayerId) -> Result<usize> {
        let parent = self.slot(id)?.parent;
        match parent {
            None => {
                let layer = self.slot(id)?;
                let count = layer.pending.len();
                let batch: WriteBatch = layer
                    .pending
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                self.store.write_batch(batch)?;
                if let Some(layer) = self.slot_mut(id) {
                    layer.pending.clear();
                }
                Ok(count)
            }
            Some(parent) => {
                let pending = self
                    .slot_mut(id)
                    .map(|layer| std::mem::take(&mut layer.pending))
                    .unwrap_or_default();
                let count = pending.len();
                let parent_layer = self
                    .slot_mut(parent)
                    .ok_or(StateError::MissingLayer(parent.0))?;
                parent_layer.pending.extend(pending);
                Ok(count)
            }
        }
    }

    fn root_slot(&self, id: LayerId) -> Result<&Layer> {
        let layer = self.slot(id)?;
        if layer.parent.is_some() {
            return Err(StateError::NotRoot(id.0));
        }
        Ok(layer)
    }

    /// Root commit that also returns the batch putting back the store's
    /// previous value of every key written.
    fn commit_reversible(&mut self, id: LayerId) -> Result<WriteBatch> {
        let layer = self.root_slot(id)?;
        let mut batch = WriteBatch::new();
        let mut undo = WriteBatch::new();
        for (key, value) in &layer.pending {
            match self.store.get(key)? {
                Some(previous) => undo.put(key.clone(), previous),
                None => undo.delete(key.clone()),
            }
            match value {
                Some(value) => batch.put(key.clone(), value.clone()),
                None => batch.delete(key.clone()),
            }
        }
        self.store.write_batch(batch)?;
        if let Some(layer) = self.slot_mut(id) {
            layer.pending.clear();
        }
        Ok(undo)
    }

    fn restore(&mut self, id: LayerId, undo: WriteBatch) -> Result<()> {
        self.root_slot(id)?;
        trace!("restoring {} store entries", undo.len());
        self.store.write_batch(undo)
    }
}

/// A handle on one layer of a shared arena.
///
/// `Clone` creates a new, independent layer with the same parent and a copy
/// of the pending map.
pub struct StateLayer {
    arena: Arc<RwLock<LayerArena>>,
    id: LayerId,
}

impl fmt::Debug for StateLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateLayer").field("id", &self.id).finish()
    }
}

impl StateLayer {
    /// Creates a fresh arena whose root layer writes through to `store`.
    pub fn root(store: Arc<dyn KeyValueStore>) -> Self {
        let mut arena = LayerArena::new(store);
        let id = arena.alloc(None, PendingMap::new());
        Self {
            arena: Arc::new(RwLock::new(arena)),
            id,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn is_root(&self) -> bool {
        self.arena
            .read()
            .slot(self.id)
            .map(|layer| layer.parent.is_none())
            .unwrap_or(false)
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.arena.read().get(self.id, key)
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        if let Some(layer) = self.arena.write().slot_mut(self.id) {
            layer.pending.insert(key, Some(value));
        }
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        if let Some(layer) = self.arena.write().slot_mut(self.id) {
            layer.pending.insert(key, None);
        }
    }

    /// Merged view of every key under `prefix`, store first, then each
    /// layer from the root down to this one.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        self.arena.read().scan_prefix(self.id, prefix)
    }

    /// Opens a child layer that buffers writes until committed into this one.
    pub fn track(&self) -> StateLayer {
        let id = self.arena.write().alloc(Some(self.id), PendingMap::new());
        StateLayer {
            arena: Arc::clone(&self.arena),
            id,
        }
    }

    /// Publishes pending writes to the parent layer, or to the store for a
    /// root layer. Returns the number of entries moved.
    pub fn commit(&mut self) -> Result<usize> {
        self.arena.write().commit(self.id)
    }

    /// Root-only [`commit`](Self::commit) returning the batch that undoes
    /// the store write, for callers that must keep several stores in step.
    pub fn commit_reversible(&mut self) -> Result<WriteBatch> {
        self.arena.write().commit_reversible(self.id)
    }

    /// Writes an undo batch from [`commit_reversible`](Self::commit_reversible)
    /// back to the store.
    pub fn restore(&mut self, undo: WriteBatch) -> Result<()> {
        self.arena.write().restore(self.id, undo)
    }

    pub fn rollback(&mut self) {
        if let Some(layer) = self.arena.write().slot_mut(self.id) {
            layer.pending.clear();
        }
    }

    pub fn pending_len(&self) -> usize {
        self.arena
            .read()
            .slot(self.id)
            .map(|layer| layer.pending.len())
            .unwrap_or(0)
    }

    /// Number of live layers in the arena this handle belongs to.
    pub fn arena_live_layers(&self) -> usize {
        self.arena.read().live_layers()
    }
}

impl Clone for StateLayer {
    fn clone(&self) -> Self {
        let mut arena = self.arena.write();
        let (parent, pending) = match arena.slot(self.id) {
            Ok(layer) => (layer.parent, layer.pending.clone()),
            Err(_) => (None, PendingMap::new()),
        };
        let id = arena.alloc(parent, pending);
        drop(arena);
        StateLayer {
            arena: Arc::clone(&self.arena),
            id,
        }
    }
}

impl Drop for StateLayer {
    fn drop(&mut self) {
        self.arena.write().release(self.id);
    }
}
