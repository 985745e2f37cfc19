//! Dashboard widgets
//!
//! In-memory collections behind the notes, reminders and calendar panels,
//! plus the read-only security, system and music surfaces.

pub mod calendar;
pub mod music;
pub mod notes;
pub mod reminders;
pub mod security;
pub mod system;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Items addressable by id
pub trait Identified {
    fn id(&self) -> &str;
}

/// Ordered item list: new items go first, edits and deletes match by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Identified> Collection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn from_items(items: Vec<T>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Prepend an item
    pub fn insert(&mut self, item: T) {
        self.items.insert(0, item);
    }

    /// Swap in `item` for the entry with the same id
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no entry has this id
    pub fn replace(&mut self, item: T) -> Result<()> {
        let slot = self.get_mut(item.id())?;
        *slot = item;
        Ok(())
    }

    /// Edit the entry with this id in place
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no entry has this id
    pub fn update(&mut self, id: &str, edit: impl FnOnce(&mut T)) -> Result<&T> {
        let item = self.get_mut(id)?;
        edit(item);
        Ok(item)
    }

    /// Remove and return the entry with this id
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no entry has this id
    pub fn remove(&mut self, id: &str) -> Result<T> {
        let index = self
            .items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        Ok(self.items.remove(index))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut T> {
        self.items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Item priority, ordered lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction applied on top of a field's natural order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Case-insensitive substring search over several fields; an empty query matches
pub(crate) fn matches_query<'a>(query: &str, fields: impl IntoIterator<Item = &'a str>) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || fields
            .into_iter()
            .any(|field| field.to_lowercase().contains(&query))
}

/// Split a comma-separated list, dropping blanks
pub(crate) fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
