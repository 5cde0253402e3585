//! Typed arenas.
//!
//! Everything a compilation produces lives in a [`Arena`] owned by the
//! compilation context and is addressed by a typed [`Id`]. Nothing is freed
//! individually; the arenas are dropped together with the context.

use alloc::vec::Vec;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::Index;
use quill_core::{Error, Result};

/// Index of an entry in an [`Arena<T>`].
pub struct Id<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    /// Returns the raw index.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state)
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Append-only storage with a size ceiling.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
    limit: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl<T> Arena<T> {
    /// Creates an empty arena holding at most `limit` entries.
    pub fn new(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            limit: limit.min(u32::MAX as usize),
        }
    }

    /// Stores an entry and returns its id.
    pub fn alloc(&mut self, item: T) -> Result<Id<T>> {
        let requested = self.items.len() + 1;
        if requested > self.limit {
            return Err(Error::allocation(requested, self.limit));
        }
        self.items
            .try_reserve(1)
            .map_err(|_| Error::allocation(requested, self.limit))?;
        let id = Id::new(self.items.len());
        self.items.push(item);
        Ok(id)
    }

    /// Returns the entry behind `id`.
    #[inline]
    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.items.get(id.index())
    }

    /// Returns a mutable reference to the entry behind `id`.
    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        self.items.get_mut(id.index())
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing has been allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over all entries with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.items.iter().enumerate().map(|(i, item)| (Id::new(i), item))
    }
}

impl<T> Index<Id<T>> for Arena<T> {
    type Output = T;

    fn index(&self, id: Id<T>) -> &T {
        &self.items[id.index()]
    }
}
