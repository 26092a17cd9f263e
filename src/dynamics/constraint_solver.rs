use crate::dynamics::{
    Constraint, ConstraintBehavior, ConstraintHandle, JacobianRow, RigidBodyHandle, RigidBodySet,
};
use crate::math::{AngularInertia, Real, Vector};
use crate::utils::Arena;

/// The parameters of the iterative constraint solver.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ConstraintSolverOptions {
    /// The number of Gauss-Seidel sweeps per update.
    pub gauss_seidel_iterations: usize,
    /// The fraction of the previous multipliers used as initial guess.
    pub warmstart_coefficient: Real,
}

impl Default for ConstraintSolverOptions {
    fn default() -> Self {
        Self {
            gauss_seidel_iterations: 10,
            warmstart_coefficient: 0.8,
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct ConstraintEntry {
    constraint: Constraint,
    lambda: Real,
}

#[derive(Copy, Clone, Debug)]
struct BodyVelocities {
    movable: bool,
    inv_mass: Real,
    inv_inertia: AngularInertia<Real>,
    linvel: Vector<Real>,
    angvel: Vector<Real>,
    dlinvel: Vector<Real>,
    dangvel: Vector<Real>,
}

impl BodyVelocities {
    fn immovable() -> Self {
        Self {
            movable: false,
            inv_mass: 0.0,
            inv_inertia: AngularInertia::zeros(),
            linvel: Vector::zeros(),
            angvel: Vector::zeros(),
            dlinvel: Vector::zeros(),
            dangvel: Vector::zeros(),
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct Row {
    handle: ConstraintHandle,
    bodies: [usize; 2],
    jacobian: JacobianRow,
    // M⁻¹·Jᵀ, split per body.
    minv_jt: JacobianRow,
    bias: Real,
    bounds: (Real, Real),
    inv_k: Real,
    lambda: Real,
}

/// A Projected Gauss-Seidel solver over a persistent set of constraints.
///
/// The solver keeps the active set: the sorted handles of every constraint and of every body
/// referenced by at least one constraint, together with per-body reference counts. Bodies
/// enter the active set with their first constraint and leave it with their last one.
///
/// Multipliers are expressed in force units: a multiplier `λ` changes the velocities by
/// `dt·M⁻¹·Jᵀ·λ`.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSolver {
    constraints: Arena<ConstraintEntry>,
    active_constraints: Vec<ConstraintHandle>,
    active_bodies: Vec<RigidBodyHandle>,
    body_refcounts: Vec<u32>,
    structure_changed: bool,
    options: ConstraintSolverOptions,
    rows: Vec<Row>,
    velocities: Vec<BodyVelocities>,
}

impl ConstraintSolver {
    /// Creates a solver without any constraint.
    pub fn new(options: ConstraintSolverOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// The solver parameters.
    pub fn options(&self) -> &ConstraintSolverOptions {
        &self.options
    }

    /// The number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Is there no constraint?
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// The sorted handles of every body referenced by a constraint.
    pub fn active_bodies(&self) -> &[RigidBodyHandle] {
        &self.active_bodies
    }

    /// Is `body` referenced by at least one constraint?
    pub fn contains_body(&self, body: RigidBodyHandle) -> bool {
        self.active_bodies.binary_search(&body).is_ok()
    }

    /// The sorted handles of every constraint.
    pub fn constraint_handles(&self) -> &[ConstraintHandle] {
        &self.active_constraints
    }

    /// The constraint with the given handle.
    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&Constraint> {
        self.constraints.get(handle.0).map(|e| &e.constraint)
    }

    /// The constraint with the given handle.
    ///
    /// The bodies of a constraint must not be changed through this reference.
    pub fn constraint_mut(&mut self, handle: ConstraintHandle) -> Option<&mut Constraint> {
        self.constraints.get_mut(handle.0).map(|e| &mut e.constraint)
    }

    /// The multiplier accumulated by the last update for the given constraint.
    pub fn lambda(&self, handle: ConstraintHandle) -> Option<Real> {
        self.constraints.get(handle.0).map(|e| e.lambda)
    }

    /// Registers a constraint.
    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) -> ConstraintHandle {
        let constraint = constraint.into();
        let bodies = constraint.bodies();
        let handle = ConstraintHandle(self.constraints.insert(ConstraintEntry {
            constraint,
            lambda: 0.0,
        }));

        if let Err(i) = self.active_constraints.binary_search(&handle) {
            self.active_constraints.insert(i, handle);
        }

        for body in bodies {
            match self.active_bodies.binary_search(&body) {
                Ok(i) => self.body_refcounts[i] += 1,
                Err(i) => {
                    self.active_bodies.insert(i, body);
                    self.body_refcounts.insert(i, 1);
                }
            }
        }

        self.structure_changed = true;
        handle
    }

    /// Unregisters a constraint, dropping its bodies from the active set if it was their last
    /// constraint.
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> Option<Constraint> {
        let entry = self.constraints.remove(handle.0)?;

        if let Ok(i) = self.active_constraints.binary_search(&handle) {
            let _ = self.active_constraints.remove(i);
        }

        for body in entry.constraint.bodies() {
            let Ok(i) = self.active_bodies.binary_search(&body) else {
                panic!("constraint body {:?} missing from the active set", body);
            };

            self.body_refcounts[i] -= 1;
            if self.body_refcounts[i] == 0 {
                let _ = self.active_bodies.remove(i);
                let _ = self.body_refcounts.remove(i);
            }
        }

        self.structure_changed = true;
        Some(entry.constraint)
    }

    /// Unregisters every constraint attached to `body`, returning how many were removed.
    pub fn remove_body(&mut self, body: RigidBodyHandle) -> usize {
        if !self.contains_body(body) {
            return 0;
        }

        let to_remove: Vec<_> = self
            .active_constraints
            .iter()
            .copied()
            .filter(|h| {
                self.constraints
                    .get(h.0)
                    .is_some_and(|e| e.constraint.bodies().contains(&body))
            })
            .collect();

        for handle in &to_remove {
            let _ = self.remove_constraint(*handle);
        }

        to_remove.len()
    }

    /// Solves every constraint for a step of length `dt`, then applies the resulting velocity
    /// changes to the bodies and moves them accordingly.
    pub fn update(&mut self, dt: Real, bodies: &mut RigidBodySet) {
        if dt <= 0.0 || self.active_constraints.is_empty() {
            self.structure_changed = false;
            return;
        }

        if !self.structure_changed
            && self.active_bodies.iter().all(|h| {
                bodies
                    .get(*h)
                    .map_or(true, |b| b.is_immovable() || b.is_sleeping())
            })
        {
            return;
        }

        self.snapshot_bodies(bodies);
        self.snapshot_rows(dt);
        self.warmstart(dt);

        for _ in 0..self.options.gauss_seidel_iterations {
            self.sweep(dt);
        }

        for row in &self.rows {
            if let Some(entry) = self.constraints.get_mut(row.handle.0) {
                entry.lambda = row.lambda;
            }
        }

        for (handle, vels) in self.active_bodies.iter().zip(self.velocities.iter()) {
            if !vels.movable {
                continue;
            }

            if let Some(body) = bodies.get_mut(*handle) {
                body.apply_velocity_change(&vels.dlinvel, &vels.dangvel, dt);
            }
        }

        self.structure_changed = false;
    }

    fn snapshot_bodies(&mut self, bodies: &RigidBodySet) {
        self.velocities.clear();
        self.velocities
            .extend(self.active_bodies.iter().map(|h| match bodies.get(*h) {
                Some(body) if !body.is_immovable() && !body.is_sleeping() => BodyVelocities {
                    movable: true,
                    inv_mass: body.properties().inv_mass,
                    inv_inertia: *body.world_inv_inertia(),
                    linvel: *body.linvel(),
                    angvel: *body.angvel(),
                    dlinvel: Vector::zeros(),
                    dangvel: Vector::zeros(),
                },
                _ => BodyVelocities::immovable(),
            }));
    }

    fn snapshot_rows(&mut self, dt: Real) {
        self.rows.clear();

        for handle in &self.active_constraints {
            let Some(entry) = self.constraints.get(handle.0) else {
                continue;
            };
            let [h1, h2] = entry.constraint.bodies();
            let (Ok(i1), Ok(i2)) = (
                self.active_bodies.binary_search(&h1),
                self.active_bodies.binary_search(&h2),
            ) else {
                continue;
            };

            let b1 = &self.velocities[i1];
            let b2 = &self.velocities[i2];
            let jacobian = entry.constraint.jacobian();
            let minv_jt = JacobianRow {
                linear1: jacobian.linear1 * b1.inv_mass,
                angular1: b1.inv_inertia * jacobian.angular1,
                linear2: jacobian.linear2 * b2.inv_mass,
                angular2: b2.inv_inertia * jacobian.angular2,
            };
            let k = jacobian.dot_velocities(
                &minv_jt.linear1,
                &minv_jt.angular1,
                &minv_jt.linear2,
                &minv_jt.angular2,
            );
            let inv_k = if k > Real::EPSILON { 1.0 / k } else { 0.0 };
            let relative_velocity =
                jacobian.dot_velocities(&b1.linvel, &b1.angvel, &b2.linvel, &b2.angvel);
            let bounds = entry.constraint.bounds();
            let lambda =
                (entry.lambda * self.options.warmstart_coefficient).clamp(bounds.0, bounds.1);

            self.rows.push(Row {
                handle: *handle,
                bodies: [i1, i2],
                jacobian,
                minv_jt,
                bias: entry.constraint.bias(dt, relative_velocity),
                bounds,
                inv_k,
                lambda: if inv_k == 0.0 { 0.0 } else { lambda },
            });
        }
    }

    fn warmstart(&mut self, dt: Real) {
        for row in &self.rows {
            apply_impulse(&mut self.velocities, row, row.lambda * dt);
        }
    }

    fn sweep(&mut self, dt: Real) {
        for row in &mut self.rows {
            if row.inv_k == 0.0 {
                continue;
            }

            let [i1, i2] = row.bodies;
            let b1 = &self.velocities[i1];
            let b2 = &self.velocities[i2];
            let jv = row.jacobian.dot_velocities(
                &(b1.linvel + b1.dlinvel),
                &(b1.angvel + b1.dangvel),
                &(b2.linvel + b2.dlinvel),
                &(b2.angvel + b2.dangvel),
            );

            let delta = -(jv + row.bias) * row.inv_k / dt;
            let new_lambda = (row.lambda + delta).clamp(row.bounds.0, row.bounds.1);
            let delta = new_lambda - row.lambda;
            row.lambda = new_lambda;

            apply_impulse(&mut self.velocities, row, delta * dt);
        }
    }
}

fn apply_impulse(velocities: &mut [BodyVelocities], row: &Row, impulse: Real) {
    if impulse == 0.0 {
        return;
    }

    let [i1, i2] = row.bodies;
    let b1 = &mut velocities[i1];
    b1.dlinvel += row.minv_jt.linear1 * impulse;
    b1.dangvel += row.minv_jt.angular1 * impulse;
    let b2 = &mut velocities[i2];
    b2.dlinvel += row.minv_jt.linear2 * impulse;
    b2.dangvel += row.minv_jt.angular2 * impulse;
}
