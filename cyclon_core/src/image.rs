//! Process data: the cyclic fieldbus/logic value buffer.
//!
//! Entries are declared once at configuration time through
//! [`ProcessDataBuilder`] and addressed by [`EntryId`] afterwards. Each cell
//! is an `AtomicU64` holding an `f64` bit pattern (bits are stored as
//! 0.0 / 1.0), so readers and writers in different tasks never lock.
//!
//! Cross-task consistency relies on the static write partition checked at
//! configuration time, not on runtime locking.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SetupError;

/// Where an entry's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntrySource {
    /// Mapped into the fieldbus process image.
    Fieldbus,
    /// Internal logic variable.
    Logic,
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Fieldbus => "fieldbus",
            Self::Logic => "logic",
        })
    }
}

/// Index of an entry in [`ProcessData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u32);

impl EntryId {
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct EntryMeta {
    name: String,
    source: EntrySource,
}

// ─── Builder ────────────────────────────────────────────────────────

/// Collects entry declarations before the buffer is frozen.
#[derive(Debug, Default)]
pub struct ProcessDataBuilder {
    entries: Vec<EntryMeta>,
    index: HashMap<String, EntryId>,
}

impl ProcessDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new entry. Names are unique.
    pub fn entry(&mut self, name: &str, source: EntrySource) -> Result<EntryId, SetupError> {
        if self.index.contains_key(name) {
            return Err(SetupError::DuplicateEntry(name.to_string()));
        }
        let id = EntryId(self.entries.len() as u32);
        self.entries.push(EntryMeta {
            name: name.to_string(),
            source,
        });
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    /// Declare `name` unless it already exists; returns the entry either way.
    pub fn ensure(&mut self, name: &str, source: EntrySource) -> EntryId {
        match self.index.get(name) {
            Some(id) => *id,
            None => {
                let id = EntryId(self.entries.len() as u32);
                self.entries.push(EntryMeta {
                    name: name.to_string(),
                    source,
                });
                self.index.insert(name.to_string(), id);
                id
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<EntryId> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freeze the declarations into a zero-initialised buffer.
    pub fn build(self) -> ProcessData {
        let cells = self.entries.iter().map(|_| AtomicU64::new(0)).collect();
        ProcessData {
            inner: Arc::new(Inner {
                cells,
                meta: self.entries.into_boxed_slice(),
                index: self.index,
            }),
        }
    }
}

// ─── Buffer ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct Inner {
    cells: Box<[AtomicU64]>,
    meta: Box<[EntryMeta]>,
    index: HashMap<String, EntryId>,
}

/// Shared, fixed-size value buffer. Cloning shares the same cells.
#[derive(Debug, Clone)]
pub struct ProcessData {
    inner: Arc<Inner>,
}

impl ProcessData {
    #[inline]
    pub fn read_f64(&self, id: EntryId) -> f64 {
        self.inner
            .cells
            .get(id.index())
            .map_or(0.0, |c| f64::from_bits(c.load(Ordering::Acquire)))
    }

    #[inline]
    pub fn write_f64(&self, id: EntryId, value: f64) {
        if let Some(c) = self.inner.cells.get(id.index()) {
            c.store(value.to_bits(), Ordering::Release);
        }
    }

    /// Non-zero reads as `true`.
    #[inline]
    pub fn read_bit(&self, id: EntryId) -> bool {
        self.read_f64(id) != 0.0
    }

    #[inline]
    pub fn write_bit(&self, id: EntryId, value: bool) {
        self.write_f64(id, if value { 1.0 } else { 0.0 });
    }

    pub fn lookup(&self, name: &str) -> Option<EntryId> {
        self.inner.index.get(name).copied()
    }

    /// Look up `name`, failing with [`SetupError::UnknownEntry`].
    pub fn require(&self, name: &str) -> Result<EntryId, SetupError> {
        self.lookup(name)
            .ok_or_else(|| SetupError::UnknownEntry(name.to_string()))
    }

    pub fn name(&self, id: EntryId) -> &str {
        self.inner
            .meta
            .get(id.index())
            .map_or("", |m| m.name.as_str())
    }

    pub fn source(&self, id: EntryId) -> Option<EntrySource> {
        self.inner.meta.get(id.index()).map(|m| m.source)
    }

    pub fn len(&self) -> usize {
        self.inner.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.cells.is_empty()
    }

    /// All entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (EntryId, &str, EntrySource)> {
        self.inner
            .meta
            .iter()
            .enumerate()
            .map(|(i, m)| (EntryId(i as u32), m.name.as_str(), m.source))
    }
}
