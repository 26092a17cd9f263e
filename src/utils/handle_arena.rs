use slab::Slab;

/// A generation-checked index into an [`Arena`].
///
/// The generation makes handles of removed elements stale: a later element reusing the same
/// slot gets a different generation, so lookups through the old handle fail instead of aliasing
/// the new element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Index {
    index: u32,
    generation: u32,
}

impl Index {
    /// The slot of this index in its arena.
    #[inline]
    pub fn slot(self) -> u32 {
        self.index
    }

    /// The generation of this index.
    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }

    /// An index that never matches any element.
    pub fn invalid() -> Self {
        Self {
            index: u32::MAX,
            generation: u32::MAX,
        }
    }
}

/// Slab-backed storage handing out generation-checked [`Index`]es.
#[derive(Clone, Debug)]
pub struct Arena<T> {
    entries: Slab<(u32, T)>,
    next_generation: u32,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            entries: Slab::new(),
            next_generation: 0,
        }
    }

    /// Inserts a new element and returns its index.
    pub fn insert(&mut self, value: T) -> Index {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let index = self.entries.insert((generation, value));
        Index {
            index: index as u32,
            generation,
        }
    }

    /// Removes the element at `index`, if it exists.
    pub fn remove(&mut self, index: Index) -> Option<T> {
        if self.contains(index) {
            self.entries
                .try_remove(index.index as usize)
                .map(|(_, value)| value)
        } else {
            None
        }
    }

    /// Does this arena contain an element at `index`?
    pub fn contains(&self, index: Index) -> bool {
        self.get(index).is_some()
    }

    /// The element at `index`, if it exists.
    pub fn get(&self, index: Index) -> Option<&T> {
        match self.entries.get(index.index as usize) {
            Some((generation, value)) if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// The element at `index`, if it exists.
    pub fn get_mut(&mut self, index: Index) -> Option<&mut T> {
        match self.entries.get_mut(index.index as usize) {
            Some((generation, value)) if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// Mutable references to the two distinct elements at `a` and `b`.
    ///
    /// Returns `None` if either is missing or if `a == b`.
    pub fn get2_mut(&mut self, a: Index, b: Index) -> Option<(&mut T, &mut T)> {
        if a == b || !self.contains(a) || !self.contains(b) {
            return None;
        }

        self.entries
            .get2_mut(a.index as usize, b.index as usize)
            .map(|(ea, eb)| (&mut ea.1, &mut eb.1))
    }

    /// The number of elements in this arena.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is this arena empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// Iterates through every element and its index.
    pub fn iter(&self) -> impl Iterator<Item = (Index, &T)> {
        self.entries.iter().map(|(i, (generation, value))| {
            (
                Index {
                    index: i as u32,
                    generation: *generation,
                },
                value,
            )
        })
    }

    /// Iterates mutably through every element and its index.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut T)> {
        self.entries.iter_mut().map(|(i, (generation, value))| {
            (
                Index {
                    index: i as u32,
                    generation: *generation,
                },
                value,
            )
        })
    }
}
