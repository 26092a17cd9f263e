use crate::geometry::{Collider, Contact, Manifold, ManifoldFlags};
use crate::math::{Isometry, Real};
use crate::query::{self, ContactOptions};
use crate::shape::{ConcaveShape, ConvexPart};
use either::Either;

/// The narrow phase: computes the exact contacts between two colliders.
///
/// Concave shapes are split into the convex parts overlapping the other collider, and every
/// convex pair goes through [`query::contacts_convex_convex`].
#[derive(Copy, Clone, Debug)]
pub struct FineCollisionDetector {
    options: ContactOptions,
    contact_separation: Real,
}

impl Default for FineCollisionDetector {
    fn default() -> Self {
        Self::new(ContactOptions::default(), 0.02)
    }
}

impl FineCollisionDetector {
    /// Creates a fine detector.
    ///
    /// Contacts closer than `contact_separation` from a contact of the previous update are
    /// considered to be the same contact.
    pub fn new(options: ContactOptions, contact_separation: Real) -> Self {
        Self {
            options,
            contact_separation,
        }
    }

    /// The contact generation parameters.
    pub fn options(&self) -> &ContactOptions {
        &self.options
    }

    /// Computes all the contacts between two colliders, in world-space.
    ///
    /// Normals point from `collider1` toward `collider2`. Returns `true` if the colliders
    /// intersect.
    pub fn contacts(&self, collider1: &Collider, collider2: &Collider, out: &mut Vec<Contact>) -> bool {
        let first_new = out.len();
        let pos1 = collider1.position();
        let pos2 = collider2.position();

        match (collider1.shape().classify(), collider2.shape().classify()) {
            (Either::Left(part1), Either::Left(part2)) => {
                let _ = query::contacts_convex_convex(pos1, &part1, pos2, &part2, &self.options, out);
            }
            (Either::Left(part1), Either::Right(concave2)) => {
                self.convex_concave(pos1, &part1, pos2, concave2, out);
            }
            (Either::Right(concave1), Either::Left(part2)) => {
                let start = out.len();
                self.convex_concave(pos2, &part2, pos1, concave1, out);
                for contact in &mut out[start..] {
                    *contact = contact.flipped();
                }
            }
            (Either::Right(concave1), Either::Right(concave2)) => {
                let aabb2 = concave2.local_aabb().transform_by(&pos1.inv_mul(pos2));
                concave1.map_overlapping_parts(&aabb2, &mut |_, sub_pos1, part1| {
                    let part_pos1 = pos1 * sub_pos1;
                    self.convex_concave(&part_pos1, &part1, pos2, concave2, out);
                });
            }
        }

        out.len() > first_new
    }

    /// Re-evaluates `manifold` between two colliders.
    ///
    /// The collider of the manifold's first body must be `collider1`. The manifold's contacts are
    /// merged with the new ones and its `INTERSECTING` flag is raised if any contact exists.
    pub fn evaluate(&self, collider1: &Collider, collider2: &Collider, manifold: &mut Manifold) -> bool {
        let mut candidates = Vec::new();
        let intersecting = self.contacts(collider1, collider2, &mut candidates);

        if intersecting {
            manifold.update_contacts(&candidates, self.contact_separation);
            manifold.insert_flags(ManifoldFlags::INTERSECTING);
        } else {
            manifold.clear_contacts();
        }

        intersecting
    }

    fn convex_concave(
        &self,
        pos1: &Isometry<Real>,
        part1: &ConvexPart,
        pos2: &Isometry<Real>,
        concave2: &dyn ConcaveShape,
        out: &mut Vec<Contact>,
    ) {
        let aabb1 = part1.compute_aabb(&pos2.inv_mul(pos1));
        concave2.map_overlapping_parts(&aabb1, &mut |_, sub_pos2, part2| {
            let part_pos2 = pos2 * sub_pos2;
            let _ = query::contacts_convex_convex(pos1, part1, &part_pos2, &part2, &self.options, out);
        });
    }
}
