// Copyright (c) 2025 knix
// All rights reserved.

use std::num::NonZeroU32;

/// Append-only arena; ids are handed out in insertion order and never invalidated.
pub struct Pool<T, Index: Into<NonZeroU32> + From<NonZeroU32>> {
    vec: Vec<T>,
    name: &'static str,
    _index: std::marker::PhantomData<Index>,
}

impl<T, Index: Into<NonZeroU32> + From<NonZeroU32>> Pool<T, Index> {
    pub fn new(name: &'static str) -> Pool<T, Index> {
        Pool { name, vec: Vec::new(), _index: std::marker::PhantomData }
    }

    pub fn next_id(&self) -> Index {
        let Some(index) = NonZeroU32::new(self.vec.len() as u32 + 1) else {
            panic!("Pool {} is out of ids", self.name)
        };
        Index::from(index)
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn add(&mut self, t: T) -> Index {
        let index = self.next_id();
        self.vec.push(t);
        index
    }

    fn index_to_actual_index(index: Index) -> usize {
        let nz32: NonZeroU32 = index.into();
        nz32.get() as usize - 1
    }

    pub fn get(&self, index: Index) -> &T {
        let index = Self::index_to_actual_index(index);
        &self.vec[index]
    }

    pub fn get_mut(&mut self, index: Index) -> &mut T {
        let index = Self::index_to_actual_index(index);
        &mut self.vec[index]
    }

    pub fn get_checked(&self, index: Index) -> Option<&T> {
        self.vec.get(Self::index_to_actual_index(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.vec.iter()
    }

    pub fn iter_with_ids(&self) -> impl Iterator<Item = (Index, &T)> {
        self.vec.iter().enumerate().map(|(i, t)| {
            // Safety: i + 1 is never zero
            let nz = unsafe { NonZeroU32::new_unchecked(i as u32 + 1) };
            (Index::from(nz), t)
        })
    }
}

impl<T: std::fmt::Debug, Index: Into<NonZeroU32> + From<NonZeroU32>> std::fmt::Debug
    for Pool<T, Index>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("name", &self.name).field("items", &self.vec).finish()
    }
}
