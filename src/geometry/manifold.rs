use crate::dynamics::RigidBodyHandle;
use crate::math::{Point, Real, UnitVector};
use crate::utils::SortedPair;
use arrayvec::ArrayVec;

pub use crate::query::Contact;

/// The maximum number of contacts kept by a manifold.
pub const MAX_MANIFOLD_CONTACTS: usize = 4;

bitflags::bitflags! {
    /// The state of a contact manifold during a collision detection update.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
    pub struct ManifoldFlags: u8 {
        /// The two colliders were found touching during the current update.
        const INTERSECTING = 1 << 0;
        /// The manifold went through the current update.
        const UPDATED = 1 << 1;
    }
}

/// The set of contacts between the colliders of two rigid bodies.
///
/// Contact normals point from the collider of [`Manifold::body1`] toward the collider of
/// [`Manifold::body2`]. Every contact is tagged with a slot in `0..MAX_MANIFOLD_CONTACTS` that
/// it keeps from one update to the next as long as it stays within the contact separation
/// distance, so that per-contact solver data (warm starting) can be associated with the slot.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Manifold {
    pair: SortedPair<RigidBodyHandle>,
    contacts: ArrayVec<Contact, MAX_MANIFOLD_CONTACTS>,
    slots: ArrayVec<usize, MAX_MANIFOLD_CONTACTS>,
    flags: ManifoldFlags,
    #[cfg_attr(feature = "serde-serialize", serde(skip))]
    pub(crate) candidate: bool,
}

impl Manifold {
    /// Creates an empty manifold between two bodies.
    pub fn new(pair: SortedPair<RigidBodyHandle>) -> Self {
        Self {
            pair,
            contacts: ArrayVec::new(),
            slots: ArrayVec::new(),
            flags: ManifoldFlags::empty(),
            candidate: false,
        }
    }

    /// The pair of bodies of this manifold.
    #[inline]
    pub fn pair(&self) -> SortedPair<RigidBodyHandle> {
        self.pair
    }

    /// The first body, the one normals point away from.
    #[inline]
    pub fn body1(&self) -> RigidBodyHandle {
        self.pair.first()
    }

    /// The second body.
    #[inline]
    pub fn body2(&self) -> RigidBodyHandle {
        self.pair.second()
    }

    /// The contacts of this manifold, in world-space.
    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// The slot of each contact, in the same order as [`Manifold::contacts`].
    #[inline]
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// The number of contacts of this manifold.
    #[inline]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Does this manifold have no contact?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// The update flags of this manifold.
    #[inline]
    pub fn flags(&self) -> ManifoldFlags {
        self.flags
    }

    /// Were the two colliders touching during the last update?
    #[inline]
    pub fn is_intersecting(&self) -> bool {
        self.flags.contains(ManifoldFlags::INTERSECTING)
    }

    /// The deepest penetration among the contacts of this manifold.
    pub fn max_depth(&self) -> Real {
        self.contacts
            .iter()
            .map(|c| c.depth)
            .fold(0.0, Real::max)
    }

    pub(crate) fn set_flags(&mut self, flags: ManifoldFlags) {
        self.flags = flags;
    }

    pub(crate) fn insert_flags(&mut self, flags: ManifoldFlags) {
        self.flags.insert(flags);
    }

    /// Replaces the contacts of this manifold by `candidates`.
    ///
    /// The candidates are first reduced to at most [`MAX_MANIFOLD_CONTACTS`] points. A reduced
    /// contact closer than `contact_separation` to an existing contact takes over its slot; the
    /// others get the free slots. Matched contacts come first in [`Manifold::contacts`].
    pub fn update_contacts(&mut self, candidates: &[Contact], contact_separation: Real) {
        let reduced = reduce_contacts(candidates);
        let mut taken = [false; MAX_MANIFOLD_CONTACTS];
        let mut used_slots = [false; MAX_MANIFOLD_CONTACTS];
        let mut contacts = ArrayVec::<Contact, MAX_MANIFOLD_CONTACTS>::new();
        let mut slots = ArrayVec::<usize, MAX_MANIFOLD_CONTACTS>::new();
        let max_sq_dist = contact_separation * contact_separation;

        for (old, &slot) in self.contacts.iter().zip(&self.slots) {
            let old_center = old.center();
            let mut best = None;
            let mut best_sq_dist = max_sq_dist;

            for (i, new) in reduced.iter().enumerate() {
                let sq_dist = na::distance_squared(&old_center, &new.center());
                if !taken[i] && sq_dist <= best_sq_dist {
                    best = Some(i);
                    best_sq_dist = sq_dist;
                }
            }

            if let Some(i) = best {
                taken[i] = true;
                used_slots[slot] = true;
                contacts.push(reduced[i]);
                slots.push(slot);
            }
        }

        let mut free_slots = (0..MAX_MANIFOLD_CONTACTS).filter(|slot| !used_slots[*slot]);

        for (i, new) in reduced.iter().enumerate() {
            if !taken[i] {
                if let Some(slot) = free_slots.next() {
                    contacts.push(*new);
                    slots.push(slot);
                }
            }
        }

        self.contacts = contacts;
        self.slots = slots;
    }

    pub(crate) fn clear_contacts(&mut self) {
        self.contacts.clear();
        self.slots.clear();
    }
}

/// Selects at most four contacts spanning the largest area among `contacts`.
///
/// The deepest contact is kept first, then the one furthest from it, then the one maximizing
/// the triangle area with the first two, and finally the one furthest outside that triangle.
pub fn reduce_contacts(contacts: &[Contact]) -> ArrayVec<Contact, MAX_MANIFOLD_CONTACTS> {
    if contacts.len() <= MAX_MANIFOLD_CONTACTS {
        return contacts.iter().copied().collect();
    }

    let normal = contacts[0].normal;
    let pt = |i: usize| contacts[i].point1;

    let Some(a) = argmax(contacts.len(), |i| contacts[i].depth) else {
        return ArrayVec::new();
    };
    let Some(b) = argmax(contacts.len(), |i| na::distance_squared(&pt(a), &pt(i))) else {
        return ArrayVec::new();
    };
    let Some(mut c) = argmax(contacts.len(), |i| {
        signed_area(&normal, &pt(a), &pt(b), &pt(i)).abs()
    }) else {
        return ArrayVec::new();
    };

    let mut b = b;
    if signed_area(&normal, &pt(a), &pt(b), &pt(c)) < 0.0 {
        core::mem::swap(&mut b, &mut c);
    }

    // The point lying the most outside of the ccw triangle `abc`.
    let d = argmax(contacts.len(), |i| {
        if i == a || i == b || i == c {
            return Real::MIN;
        }

        -signed_area(&normal, &pt(a), &pt(b), &pt(i))
            .min(signed_area(&normal, &pt(b), &pt(c), &pt(i)))
            .min(signed_area(&normal, &pt(c), &pt(a), &pt(i)))
    });

    let mut result = ArrayVec::new();
    result.push(contacts[a]);
    result.push(contacts[b]);
    result.push(contacts[c]);
    result.extend(d.map(|d| contacts[d]));
    result
}

fn signed_area(normal: &UnitVector<Real>, a: &Point<Real>, b: &Point<Real>, c: &Point<Real>) -> Real {
    (b - a).cross(&(c - a)).dot(&**normal) * 0.5
}

fn argmax(len: usize, mut score: impl FnMut(usize) -> Real) -> Option<usize> {
    let mut best = None;
    let mut best_score = Real::MIN;

    for i in 0..len {
        let s = score(i);
        if best.is_none() || s > best_score {
            best = Some(i);
            best_score = s;
        }
    }

    best
}
