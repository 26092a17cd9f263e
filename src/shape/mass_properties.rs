use crate::math::{AngularInertia, Isometry, Matrix, Point, Real, Vector};
use crate::shape::{Ball, ConvexPolyhedron};
use crate::utils;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

/// The local mass properties of a shape or a rigid-body.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// The center of mass, in local space.
    pub local_com: Point<Real>,
    /// The mass.
    pub mass: Real,
    /// The inertia tensor expressed relative to the center of mass, in local space.
    pub local_inertia: AngularInertia<Real>,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self::zero()
    }
}

impl MassProperties {
    /// Initializes the mass properties from the given center-of-mass, mass, and inertia tensor.
    pub fn new(local_com: Point<Real>, mass: Real, local_inertia: AngularInertia<Real>) -> Self {
        Self {
            local_com,
            mass,
            local_inertia,
        }
    }

    /// The mass properties of an infinitely light shape.
    pub fn zero() -> Self {
        Self::new(Point::origin(), 0.0, Matrix::zeros())
    }

    /// The mass properties of a ball with the given density.
    pub fn from_ball(density: Real, ball: &Ball) -> Self {
        let r = ball.radius;
        let mass = density * 4.0 / 3.0 * core::f32::consts::PI * r * r * r;
        let i = mass * 0.4 * r * r;
        Self::new(Point::origin(), mass, Matrix::from_diagonal_element(i))
    }

    /// The mass properties of a convex polyhedron with the given density.
    ///
    /// Exact integration over the tetrahedra formed by each face triangle and the origin.
    pub fn from_convex_polyhedron(density: Real, poly: &ConvexPolyhedron) -> Self {
        // Second moment of the canonical tetrahedron (origin and the three unit vectors).
        let canonical = Matrix::new(2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0) / 120.0;
        let points = poly.points();

        let mut volume = 0.0;
        let mut first_moment = Vector::zeros();
        let mut covariance = Matrix::zeros();

        for face in 0..poly.faces().len() as u32 {
            let ids: Vec<u32> = poly.face_vertices(face).collect();
            let a = points[ids[0] as usize].coords;

            for k in 1..ids.len() - 1 {
                let b = points[ids[k] as usize].coords;
                let c = points[ids[k + 1] as usize].coords;
                let mat = Matrix::from_columns(&[a, b, c]);
                let det = mat.determinant();

                volume += det / 6.0;
                first_moment += (a + b + c) * (det / 24.0);
                covariance += mat * canonical * mat.transpose() * det;
            }
        }

        if volume <= 0.0 {
            log::debug!("Computing the mass properties of a polyhedron with a zero volume.");
            return Self::zero();
        }

        let mass = volume * density;
        let com = first_moment / volume;
        let covariance = covariance * density - com * com.transpose() * mass;
        let inertia = Matrix::from_diagonal_element(covariance.trace()) - covariance;

        Self::new(Point::from(com), mass, inertia)
    }

    /// The inverse mass, zero if the mass is zero.
    pub fn inv_mass(&self) -> Real {
        utils::inv(self.mass)
    }

    /// The inverse of the local inertia tensor, zero if it is not invertible.
    pub fn inv_inertia(&self) -> AngularInertia<Real> {
        self.local_inertia
            .try_inverse()
            .unwrap_or_else(AngularInertia::zeros)
    }

    /// The inertia tensor relative to a point shifted by `shift` from the center of mass.
    pub fn shifted_inertia(&self, shift: &Vector<Real>) -> AngularInertia<Real> {
        let diag = Matrix::from_diagonal_element(shift.norm_squared());
        self.local_inertia + (diag - shift * shift.transpose()) * self.mass
    }

    /// Transforms these mass properties by `m`.
    pub fn transform_by(&self, m: &Isometry<Real>) -> Self {
        let rot = m.rotation.to_rotation_matrix().into_inner();
        Self::new(
            m * self.local_com,
            self.mass,
            rot * self.local_inertia * rot.transpose(),
        )
    }
}

impl Add<MassProperties> for MassProperties {
    type Output = Self;

    fn add(self, other: MassProperties) -> Self {
        if self.mass == 0.0 {
            return other;
        }
        if other.mass == 0.0 {
            return self;
        }

        let mass = self.mass + other.mass;
        let local_com =
            Point::from((self.local_com.coords * self.mass + other.local_com.coords * other.mass) / mass);
        let inertia1 = self.shifted_inertia(&(self.local_com - local_com));
        let inertia2 = other.shifted_inertia(&(other.local_com - local_com));

        Self::new(local_com, mass, inertia1 + inertia2)
    }
}

impl AddAssign<MassProperties> for MassProperties {
    fn add_assign(&mut self, rhs: MassProperties) {
        *self = *self + rhs
    }
}

impl Sum<MassProperties> for MassProperties {
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = Self>,
    {
        iter.fold(Self::zero(), |acc, mp| acc + mp)
    }
}
