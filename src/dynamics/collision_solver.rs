use crate::dynamics::{
    ConstraintHandle, ConstraintSolver, ConstraintSolverOptions, FrictionConstraint,
    NormalConstraint, NormalConstraintParams, RigidBodyHandle, RigidBodySet,
};
use crate::geometry::{CollisionListener, Manifold, MAX_MANIFOLD_CONTACTS};
use crate::math::Real;
use crate::utils::{self, SortedPair};
use hashbrown::HashMap;

/// The parameters of the [`CollisionSolver`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CollisionSolverOptions {
    /// The maximum number of contacts turned into constraints, over all manifolds.
    pub max_contacts: usize,
    /// The parameters of the non-penetration constraints.
    pub normal: NormalConstraintParams,
    /// The gravity used to estimate the normal force bounding friction.
    pub friction_gravity: Real,
}

impl Default for CollisionSolverOptions {
    fn default() -> Self {
        Self {
            max_contacts: 8192,
            normal: NormalConstraintParams::default(),
            friction_gravity: 9.81,
        }
    }
}

/// The constraints generated for one contact.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContactConstraints {
    /// The non-penetration constraint.
    pub normal: ConstraintHandle,
    /// The two friction constraints, along orthogonal tangents.
    pub friction: [ConstraintHandle; 2],
}

/// The constraints of a manifold, indexed by contact slot.
type ContactSlots = [Option<ContactConstraints>; MAX_MANIFOLD_CONTACTS];

/// Turns contact manifolds into constraints of the [`ConstraintSolver`] it owns.
///
/// Each contact slot of a manifold owns one normal and two friction constraints, so that the
/// multipliers of a contact persisting across frames warm-start the next solve.
#[derive(Clone, Debug, Default)]
pub struct CollisionSolver {
    solver: ConstraintSolver,
    contacts: HashMap<SortedPair<RigidBodyHandle>, ContactSlots>,
    num_contacts: usize,
    options: CollisionSolverOptions,
}

impl CollisionSolver {
    /// Creates a collision solver and its constraint solver.
    pub fn new(options: CollisionSolverOptions, solver_options: ConstraintSolverOptions) -> Self {
        Self {
            solver: ConstraintSolver::new(solver_options),
            contacts: HashMap::default(),
            num_contacts: 0,
            options,
        }
    }

    /// The constraint solver fed by this collision solver.
    pub fn constraint_solver(&self) -> &ConstraintSolver {
        &self.solver
    }

    /// The constraint solver fed by this collision solver.
    pub fn constraint_solver_mut(&mut self) -> &mut ConstraintSolver {
        &mut self.solver
    }

    /// The number of contacts currently turned into constraints.
    pub fn num_contacts(&self) -> usize {
        self.num_contacts
    }

    /// The constraints generated for the manifold between two bodies.
    pub fn contact_constraints(
        &self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
    ) -> impl Iterator<Item = &ContactConstraints> {
        self.contacts
            .get(&SortedPair::new(body1, body2))
            .into_iter()
            .flatten()
            .flatten()
    }

    /// The constraints of the manifold contact occupying `slot`, see [`Manifold::slots`].
    pub fn slot_constraints(
        &self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        slot: usize,
    ) -> Option<&ContactConstraints> {
        self.contacts
            .get(&SortedPair::new(body1, body2))?
            .get(slot)?
            .as_ref()
    }

    /// Frees every constraint involving `body`.
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        let pairs: Vec<_> = self
            .contacts
            .keys()
            .filter(|pair| pair.contains(&body))
            .copied()
            .collect();

        for pair in pairs {
            self.free_pair(&pair);
        }

        let _ = self.solver.remove_body(body);
    }

    fn free_pair(&mut self, pair: &SortedPair<RigidBodyHandle>) {
        if let Some(slots) = self.contacts.remove(pair) {
            for slot in slots.into_iter().flatten() {
                self.free_slot(slot);
            }
        }
    }

    fn free_slot(&mut self, slot: ContactConstraints) {
        let _ = self.solver.remove_constraint(slot.normal);
        for friction in slot.friction {
            let _ = self.solver.remove_constraint(friction);
        }
        self.num_contacts -= 1;
    }

    fn alloc_slot(&mut self, bodies: [RigidBodyHandle; 2]) -> ContactConstraints {
        self.num_contacts += 1;
        let normal = self
            .solver
            .add_constraint(NormalConstraint::new(bodies, self.options.normal));
        let friction = [
            self.solver
                .add_constraint(FrictionConstraint::new(bodies, self.options.friction_gravity)),
            self.solver
                .add_constraint(FrictionConstraint::new(bodies, self.options.friction_gravity)),
        ];
        ContactConstraints { normal, friction }
    }
}

impl CollisionListener for CollisionSolver {
    fn manifold_updated(&mut self, manifold: &Manifold, bodies: &RigidBodySet) {
        let pair = manifold.pair();
        let (Some(body1), Some(body2)) = (bodies.get(manifold.body1()), bodies.get(manifold.body2()))
        else {
            self.free_pair(&pair);
            return;
        };
        let handles = [manifold.body1(), manifold.body2()];

        let mut slots = self.contacts.remove(&pair).unwrap_or_default();
        let mut live = [false; MAX_MANIFOLD_CONTACTS];
        for &slot in manifold.slots() {
            live[slot] = true;
        }

        for (slot, is_live) in slots.iter_mut().zip(live) {
            if !is_live {
                if let Some(constraints) = slot.take() {
                    self.free_slot(constraints);
                }
            }
        }

        let mut dropped = 0;
        for &slot in manifold.slots() {
            if slots[slot].is_none() {
                if self.num_contacts >= self.options.max_contacts {
                    dropped += 1;
                } else {
                    slots[slot] = Some(self.alloc_slot(handles));
                }
            }
        }

        if dropped > 0 {
            log::warn!(
                "too many contacts ({}), dropping {} contact(s) between {:?}",
                self.options.max_contacts,
                dropped,
                pair
            );
        }

        let num_slots = slots.iter().flatten().count();
        if num_slots == 0 {
            return;
        }

        let mu1 = body1.properties().friction;
        let mu2 = body2.properties().friction;
        let friction = (0.5 * (mu1 * mu1 + mu2 * mu2)).sqrt();
        let inv_mass_sum = body1.properties().inv_mass + body2.properties().inv_mass;
        let mass_share = if inv_mass_sum > 0.0 {
            Some(1.0 / inv_mass_sum / num_slots as Real)
        } else {
            None
        };

        for (&slot_id, contact) in manifold.slots().iter().zip(manifold.contacts()) {
            let Some(slot) = &slots[slot_id] else {
                continue;
            };
            let normal = contact.normal.into_inner();
            let r1 = contact.point1 - body1.position();
            let r2 = contact.point2 - body2.position();
            let tangents = utils::tangent_basis(&normal);

            if let Some(c) = self
                .solver
                .constraint_mut(slot.normal)
                .and_then(|c| c.as_normal_mut())
            {
                c.normal = normal;
                c.r1 = r1;
                c.r2 = r2;
                c.depth = contact.depth;
            }

            for (handle, tangent) in slot.friction.iter().zip(tangents) {
                if let Some(c) = self
                    .solver
                    .constraint_mut(*handle)
                    .and_then(|c| c.as_friction_mut())
                {
                    c.tangent = tangent;
                    c.r1 = r1;
                    c.r2 = r2;
                    c.friction = friction;
                    c.mass = mass_share;
                }
            }
        }

        let _ = self.contacts.insert(pair, slots);
    }

    fn manifold_removed(&mut self, manifold: &Manifold) {
        self.free_pair(&manifold.pair());
    }
}

#[cfg(test)]
mod test {
    use super::{CollisionSolver, CollisionSolverOptions};
    use crate::dynamics::{
        Constraint, ConstraintBehavior, ConstraintSolverOptions, RigidBody, RigidBodyProperties,
        RigidBodySet,
    };
    use crate::geometry::{CollisionListener, Contact, Manifold};
    use crate::math::{Point, UnitVector, Vector};
    use crate::utils::SortedPair;

    fn manifold_with(bodies: &RigidBodySet, n: usize) -> Manifold {
        let handles: Vec<_> = bodies.iter().map(|(h, _)| h).collect();
        let mut manifold = Manifold::new(SortedPair::new(handles[0], handles[1]));
        let contacts: Vec<_> = (0..n)
            .map(|i| {
                let p = Point::new(i as f32, 0.0, 0.0);
                Contact::new(p, p, UnitVector::new_unchecked(Vector::y()), 0.01)
            })
            .collect();
        manifold.update_contacts(&contacts, 0.02);
        manifold
    }

    fn bodies() -> RigidBodySet {
        let mut set = RigidBodySet::new();
        let props = RigidBodyProperties {
            inv_mass: 0.5,
            friction: 0.3,
            ..RigidBodyProperties::default()
        };
        let _ = set.insert(RigidBody::fixed());
        let _ = set.insert(RigidBody::new(props));
        set
    }

    #[test]
    fn slots_follow_the_manifold_size() {
        let set = bodies();
        let mut solver = CollisionSolver::default();

        solver.manifold_updated(&manifold_with(&set, 4), &set);
        assert_eq!(solver.num_contacts(), 4);
        assert_eq!(solver.constraint_solver().len(), 12);

        solver.manifold_updated(&manifold_with(&set, 2), &set);
        assert_eq!(solver.num_contacts(), 2);
        assert_eq!(solver.constraint_solver().len(), 6);

        solver.manifold_removed(&manifold_with(&set, 0));
        assert_eq!(solver.num_contacts(), 0);
        assert!(solver.constraint_solver().is_empty());
        assert!(solver.constraint_solver().active_bodies().is_empty());
    }

    #[test]
    fn friction_bounds_use_the_mass_share() {
        let set = bodies();
        let mut solver = CollisionSolver::default();
        let manifold = manifold_with(&set, 2);
        solver.manifold_updated(&manifold, &set);

        let slot = solver
            .contact_constraints(manifold.body1(), manifold.body2())
            .next()
            .unwrap();
        let friction = solver.constraint_solver().constraint(slot.friction[0]);
        let Some(Constraint::Friction(friction)) = friction else {
            panic!("expected a friction constraint");
        };

        // μ = sqrt((0.5² + 0.3²) / 2), m = 2 split over two contacts.
        let mu = ((0.25 + 0.09) / 2.0f32).sqrt();
        let (lo, hi) = friction.bounds();
        assert_relative_eq!(hi, mu * 1.0 * 9.81, epsilon = 1.0e-5);
        assert_relative_eq!(lo, -hi);
        assert!(friction.tangent.dot(&Vector::y()).abs() < 1.0e-6);
    }

    #[test]
    fn contact_budget_is_never_exceeded() {
        let set = bodies();
        let options = CollisionSolverOptions {
            max_contacts: 3,
            ..CollisionSolverOptions::default()
        };
        let mut solver = CollisionSolver::new(options, ConstraintSolverOptions::default());
        solver.manifold_updated(&manifold_with(&set, 4), &set);
        assert_eq!(solver.num_contacts(), 3);
    }

    #[test]
    fn surviving_contacts_keep_their_constraints() {
        let set = bodies();
        let mut solver = CollisionSolver::default();
        let mut manifold = manifold_with(&set, 3);
        let (body1, body2) = (manifold.body1(), manifold.body2());
        solver.manifold_updated(&manifold, &set);

        let last = *solver.slot_constraints(body1, body2, 2).unwrap();

        // The middle contact vanishes.
        let p0 = Point::new(0.0, 0.0, 0.0);
        let p2 = Point::new(2.0, 0.0, 0.0);
        let normal = UnitVector::new_unchecked(Vector::y());
        manifold.update_contacts(
            &[Contact::new(p0, p0, normal, 0.01), Contact::new(p2, p2, normal, 0.01)],
            0.02,
        );
        solver.manifold_updated(&manifold, &set);

        assert_eq!(solver.num_contacts(), 2);
        assert_eq!(manifold.slots(), &[0, 2]);
        assert!(solver.slot_constraints(body1, body2, 1).is_none());
        assert_eq!(solver.slot_constraints(body1, body2, 2), Some(&last));

        let Some(Constraint::Normal(normal)) = solver.constraint_solver().constraint(last.normal)
        else {
            panic!("expected a normal constraint");
        };
        assert_relative_eq!(normal.r1.x, 2.0 - set.get(body1).unwrap().position().x);
    }
}
