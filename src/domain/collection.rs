use std::fmt::Display;

use crate::errors::{ClubError, ClubResult};

/// Anything stored in a registry under its own id
pub trait Entity {
    type Id: Clone + PartialEq + Display;
    const KIND: &'static str;

    fn id(&self) -> &Self::Id;
}

/// Registry of entities kept in insertion order
#[derive(Debug, Clone)]
pub struct Collection<T: Entity> {
    items: Vec<T>,
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Insert, replacing any entity with the same id
    pub fn add(&mut self, item: T) {
        match self.position(item.id()) {
            Some(index) => self.items[index] = item,
            None => self.items.push(item),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    pub fn require(&self, id: &T::Id) -> ClubResult<&T> {
        self.get(id).ok_or_else(|| ClubError::not_found(T::KIND, id))
    }

    pub fn require_mut(&mut self, id: &T::Id) -> ClubResult<&mut T> {
        self.get_mut(id).ok_or_else(|| ClubError::not_found(T::KIND, id))
    }

    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        self.position(id).map(|index| self.items.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    fn position(&self, id: &T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}

impl<T: Entity> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}
