use core::cmp::PartialOrd;
use core::ops::Deref;

/// A pair of elements sorted in increasing order.
///
/// `SortedPair::new(a, b)` and `SortedPair::new(b, a)` compare and hash identically, which makes
/// this the canonical key of unordered pairs (e.g. the two colliders of a contact manifold).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SortedPair<T: PartialOrd>([T; 2]);

impl<T: PartialOrd> SortedPair<T> {
    /// Sorts two elements in increasing order into a new pair.
    pub fn new(element1: T, element2: T) -> Self {
        if element1 > element2 {
            SortedPair([element2, element1])
        } else {
            SortedPair([element1, element2])
        }
    }

    /// Does this pair contain `element`?
    pub fn contains(&self, element: &T) -> bool {
        self.0[0] == *element || self.0[1] == *element
    }
}

impl<T: PartialOrd + Copy> SortedPair<T> {
    /// The smallest element of the pair.
    #[inline]
    pub fn first(&self) -> T {
        self.0[0]
    }

    /// The largest element of the pair.
    #[inline]
    pub fn second(&self) -> T {
        self.0[1]
    }

    /// The element of the pair that is not `element`.
    ///
    /// Returns `None` if `element` is not part of the pair.
    pub fn other(&self, element: T) -> Option<T> {
        if self.0[0] == element {
            Some(self.0[1])
        } else if self.0[1] == element {
            Some(self.0[0])
        } else {
            None
        }
    }
}

impl<T: PartialOrd> Deref for SortedPair<T> {
    type Target = [T; 2];

    fn deref(&self) -> &[T; 2] {
        &self.0
    }
}
