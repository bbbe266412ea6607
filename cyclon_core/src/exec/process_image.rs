//! Declared process image of an execution object.
//!
//! Used for static reporting and for the configuration-time check that no
//! two tasks write the same item.

use crate::image::{EntryId, EntrySource, ProcessData};

/// Direction of access to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    #[inline]
    pub const fn writes(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    #[inline]
    pub const fn reads(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    const fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Read, Self::Read) => Self::Read,
            (Self::Write, Self::Write) => Self::Write,
            _ => Self::ReadWrite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessImageItem {
    pub name: String,
    pub source: EntrySource,
    pub access: Access,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessImage {
    items: Vec<ProcessImageItem>,
}

impl ProcessImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item; declaring the same name twice merges the access.
    pub fn push(&mut self, name: &str, source: EntrySource, access: Access) {
        if let Some(item) = self.items.iter_mut().find(|i| i.name == name) {
            item.access = item.access.merge(access);
            return;
        }
        self.items.push(ProcessImageItem {
            name: name.to_string(),
            source,
            access,
        });
    }

    /// Add a process data entry by id.
    pub fn add_entry(&mut self, data: &ProcessData, id: EntryId, access: Access) {
        let source = data.source(id).unwrap_or(EntrySource::Logic);
        self.push(data.name(id), source, access);
    }

    pub fn extend(&mut self, other: &ProcessImage) {
        for item in &other.items {
            self.push(&item.name, item.source, item.access);
        }
    }

    pub fn items(&self) -> &[ProcessImageItem] {
        &self.items
    }

    pub fn writes(&self) -> impl Iterator<Item = &ProcessImageItem> {
        self.items.iter().filter(|i| i.access.writes())
    }

    /// Names written by both images.
    pub fn write_overlap(&self, other: &ProcessImage) -> Vec<String> {
        self.writes()
            .filter(|a| other.writes().any(|b| b.name == a.name))
            .map(|a| a.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
