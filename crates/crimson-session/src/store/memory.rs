//! In-memory backend: identity map plus an index-linked recency list.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::SessionStore;
use crate::sid::SessionId;

/// Live session data held in a slot.
#[derive(Debug)]
struct Entry {
    sid: SessionId,
    accessed: Instant,
    values: HashMap<String, Value>,
}

/// Arena slot. Vacant slots sit on the free list with `entry == None`.
#[derive(Debug, Default)]
struct Slot {
    prev: Option<usize>,
    next: Option<usize>,
    entry: Option<Entry>,
}

/// Map and recency list, always mutated together under one lock.
#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    index: HashMap<SessionId, usize>,
    /// Most recently touched.
    head: Option<usize>,
    /// Least recently touched.
    tail: Option<usize>,
}

impl Arena {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    fn alloc(&mut self, entry: Entry) -> usize {
        let slot = Slot {
            prev: None,
            next: None,
            entry: Some(entry),
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = slot;
                idx
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    fn link_front(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.head;
        match self.head {
            Some(old) => self.slots[old].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn entry_mut(&mut self, idx: usize) -> Option<&mut Entry> {
        self.slots.get_mut(idx).and_then(|s| s.entry.as_mut())
    }

    /// Insert a fresh session, or reset an existing one, at the head.
    fn init(&mut self, sid: &SessionId, now: Instant) {
        if let Some(&idx) = self.index.get(sid) {
            if let Some(entry) = self.entry_mut(idx) {
                entry.values.clear();
                entry.accessed = now;
            }
            self.move_to_front(idx);
            return;
        }

        let idx = self.alloc(Entry {
            sid: sid.clone(),
            accessed: now,
            values: HashMap::new(),
        });
        self.link_front(idx);
        self.index.insert(sid.clone(), idx);
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.unlink(idx);
            self.link_front(idx);
        }
    }

    /// Bump `sid` to the head and return its slot index.
    fn touch(&mut self, sid: &SessionId, now: Instant) -> Option<usize> {
        let idx = *self.index.get(sid)?;
        if let Some(entry) = self.entry_mut(idx) {
            entry.accessed = now;
        }
        self.move_to_front(idx);
        Some(idx)
    }

    fn remove(&mut self, idx: usize) -> Option<Entry> {
        self.unlink(idx);
        let entry = self.slots[idx].entry.take()?;
        self.index.remove(&entry.sid);
        self.free.push(idx);
        Some(entry)
    }

    fn sweep(&mut self, max_idle: Duration, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(idx) = self.tail {
            let expired = match &self.slots[idx].entry {
                Some(entry) => now.saturating_duration_since(entry.accessed) > max_idle,
                None => true,
            };
            if !expired {
                break;
            }
            if let Some(entry) = self.remove(idx) {
                trace!(session_id = %entry.sid, "Evicting idle session");
                removed += 1;
            }
        }
        removed
    }

    fn recency(&self) -> Vec<SessionId> {
        let mut order = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            if let Some(entry) = &self.slots[idx].entry {
                order.push(entry.sid.clone());
            }
            cursor = self.slots[idx].next;
        }
        order
    }
}

/// In-memory session backend.
///
/// Sessions live in an arena of slots addressed by index. A hash map
/// resolves identifiers to slots and the slots form a doubly linked list
/// ordered by last access, so touch and destroy are O(1) and a sweep only
/// visits the sessions it evicts. One exclusive lock guards the whole arena.
#[derive(Debug, Default)]
pub struct MemoryStore {
    arena: Mutex<Arena>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with room for `capacity` sessions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Mutex::new(Arena::with_capacity(capacity)),
        }
    }

    /// Live identifiers from most to least recently touched.
    pub fn recency(&self) -> Vec<SessionId> {
        self.arena.lock().recency()
    }

    /// Last access time of `sid` without touching it.
    pub fn last_access(&self, sid: &SessionId) -> Option<Instant> {
        let arena = self.arena.lock();
        let idx = *arena.index.get(sid)?;
        arena.slots[idx].entry.as_ref().map(|e| e.accessed)
    }
}

impl SessionStore for MemoryStore {
    fn init(&self, sid: &SessionId) {
        let mut arena = self.arena.lock();
        arena.init(sid, Instant::now());
        trace!(session_id = %sid, live = arena.index.len(), "Session initialised");
    }

    fn read(&self, sid: &SessionId) -> bool {
        let mut arena = self.arena.lock();
        if arena.index.contains_key(sid) {
            return true;
        }
        arena.init(sid, Instant::now());
        debug!(session_id = %sid, "Unknown session id, created in place");
        false
    }

    fn contains(&self, sid: &SessionId) -> bool {
        self.arena.lock().index.contains_key(sid)
    }

    fn touch(&self, sid: &SessionId) {
        self.arena.lock().touch(sid, Instant::now());
    }

    fn destroy(&self, sid: &SessionId) -> bool {
        let mut arena = self.arena.lock();
        let Some(&idx) = arena.index.get(sid) else {
            return false;
        };
        let removed = arena.remove(idx).is_some();
        if removed {
            debug!(session_id = %sid, "Session destroyed");
        }
        removed
    }

    fn sweep(&self, max_idle: Duration) -> usize {
        let mut arena = self.arena.lock();
        let count = arena.sweep(max_idle, Instant::now());
        if count > 0 {
            debug!(count, live = arena.index.len(), "Swept idle sessions");
        }
        count
    }

    fn get(&self, sid: &SessionId, key: &str) -> Option<Value> {
        let mut arena = self.arena.lock();
        let idx = arena.touch(sid, Instant::now())?;
        arena.entry_mut(idx)?.values.get(key).cloned()
    }

    fn set(&self, sid: &SessionId, key: String, value: Value) -> bool {
        let mut arena = self.arena.lock();
        let Some(idx) = arena.touch(sid, Instant::now()) else {
            trace!(session_id = %sid, key = %key, "Write to dead session dropped");
            return false;
        };
        match arena.entry_mut(idx) {
            Some(entry) => {
                entry.values.insert(key, value);
                true
            }
            None => false,
        }
    }

    fn delete(&self, sid: &SessionId, key: &str) -> Option<Value> {
        let mut arena = self.arena.lock();
        let idx = arena.touch(sid, Instant::now())?;
        arena.entry_mut(idx)?.values.remove(key)
    }

    fn update(
        &self,
        sid: &SessionId,
        key: &str,
        f: &mut dyn FnMut(Option<Value>) -> Value,
    ) -> Option<Value> {
        let mut arena = self.arena.lock();
        let idx = arena.touch(sid, Instant::now())?;
        let entry = arena.entry_mut(idx)?;
        let next = f(entry.values.remove(key));
        entry.values.insert(key.to_string(), next.clone());
        Some(next)
    }

    fn keys(&self, sid: &SessionId) -> Vec<String> {
        let mut arena = self.arena.lock();
        let Some(idx) = arena.touch(sid, Instant::now()) else {
            return Vec::new();
        };
        arena
            .entry_mut(idx)
            .map(|e| e.values.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.arena.lock().index.len()
    }
}
