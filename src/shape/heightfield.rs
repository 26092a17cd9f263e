use crate::bounding_volume::Aabb;
use crate::math::{Isometry, Real, Vector};
use crate::query::Ray;
use crate::shape::{ConcaveShape, ConvexPart, ShapeError, Triangle, TriangularPrism};
use na::{DMatrix, Point3};

/// A 3D heightfield.
///
/// The heights are laid on a regular grid centered at the origin: the row `i` of the heights
/// matrix spans the `z` axis, the column `j` spans the `x` axis, and every height is along `y`.
/// The grid covers `[-scale.x / 2, scale.x / 2] x [-scale.z / 2, scale.z / 2]`.
///
/// Each cell is split into two triangles. A heightfield with a thickness is made of triangular
/// prisms extending below its surface instead.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct HeightField {
    heights: DMatrix<Real>,
    scale: Vector<Real>,
    thickness: Option<Real>,
    aabb: Aabb,
}

impl HeightField {
    /// Initializes a new heightfield with the given heights and scaling factor.
    pub fn new(heights: DMatrix<Real>, scale: Vector<Real>) -> Result<Self, ShapeError> {
        if heights.nrows() < 2 || heights.ncols() < 2 {
            return Err(ShapeError::HeightFieldTooSmall {
                nrows: heights.nrows(),
                ncols: heights.ncols(),
            });
        }

        let max = heights.max();
        let min = heights.min();
        let hscale = scale * 0.5;
        let aabb = Aabb::new(
            Point3::new(-hscale.x, min * scale.y, -hscale.z),
            Point3::new(hscale.x, max * scale.y, hscale.z),
        );

        Ok(HeightField {
            heights,
            scale,
            thickness: None,
            aabb,
        })
    }

    /// Makes every part of this heightfield a prism extending `thickness` below the surface.
    pub fn with_thickness(mut self, thickness: Real) -> Self {
        if thickness > 0.0 {
            self.thickness = Some(thickness);
            self.aabb.mins.y -= thickness;
        } else {
            self.thickness = None;
        }
        self
    }

    /// The thickness of this heightfield, if it is thick.
    pub fn thickness(&self) -> Option<Real> {
        self.thickness
    }

    /// The number of rows of cells of this heightfield.
    pub fn nrows(&self) -> usize {
        self.heights.nrows() - 1
    }

    /// The number of columns of cells of this heightfield.
    pub fn ncols(&self) -> usize {
        self.heights.ncols() - 1
    }

    /// The heights of this heightfield.
    pub fn heights(&self) -> &DMatrix<Real> {
        &self.heights
    }

    /// The scale factor applied to this heightfield.
    pub fn scale(&self) -> &Vector<Real> {
        &self.scale
    }

    fn unit_cell_width(&self) -> Real {
        1.0 / (self.heights.ncols() as Real - 1.0)
    }

    fn unit_cell_height(&self) -> Real {
        1.0 / (self.heights.nrows() as Real - 1.0)
    }

    fn quantize_floor(&self, val: Real, cell_size: Real, num_cells: usize) -> usize {
        na::clamp(
            ((val + 0.5) / cell_size).floor(),
            0.0,
            (num_cells - 1) as Real,
        ) as usize
    }

    fn quantize_ceil(&self, val: Real, cell_size: Real, num_cells: usize) -> usize {
        na::clamp(((val + 0.5) / cell_size).ceil(), 0.0, num_cells as Real) as usize
    }

    fn part_id(&self, i: usize, j: usize, second: bool) -> u32 {
        ((i * self.ncols() + j) * 2 + second as usize) as u32
    }

    /// The two triangles of the cell at row `i` and column `j`.
    pub fn triangles_at(&self, i: usize, j: usize) -> Option<(Triangle, Triangle)> {
        if i >= self.nrows() || j >= self.ncols() {
            return None;
        }

        let cell_width = self.unit_cell_width();
        let cell_height = self.unit_cell_height();

        let z0 = -0.5 + cell_height * (i as Real);
        let z1 = -0.5 + cell_height * ((i + 1) as Real);

        let x0 = -0.5 + cell_width * (j as Real);
        let x1 = -0.5 + cell_width * ((j + 1) as Real);

        let y00 = self.heights[(i, j)];
        let y10 = self.heights[(i + 1, j)];
        let y01 = self.heights[(i, j + 1)];
        let y11 = self.heights[(i + 1, j + 1)];

        let mut p00 = Point3::new(x0, y00, z0);
        let mut p10 = Point3::new(x0, y10, z1);
        let mut p01 = Point3::new(x1, y01, z0);
        let mut p11 = Point3::new(x1, y11, z1);

        // Apply scales:
        p00.coords.component_mul_assign(&self.scale);
        p10.coords.component_mul_assign(&self.scale);
        p01.coords.component_mul_assign(&self.scale);
        p11.coords.component_mul_assign(&self.scale);

        Some((
            Triangle::new(p00, p10, p01),
            Triangle::new(p10, p11, p01),
        ))
    }

    /// The convex part built from the given triangle.
    fn part(&self, tri: Triangle) -> ConvexPart<'static> {
        match self.thickness {
            Some(thickness) => {
                ConvexPart::Prism(TriangularPrism::new(tri, Vector::new(0.0, -thickness, 0.0)))
            }
            None => ConvexPart::Triangle(tri),
        }
    }

    /// Visits the parts of every cell whose vertical projection intersects `aabb`'s.
    fn map_cells_in_aabb(&self, aabb: &Aabb, f: &mut dyn FnMut(u32, ConvexPart<'static>)) {
        let ref_mins = aabb.mins.coords.component_div(&self.scale);
        let ref_maxs = aabb.maxs.coords.component_div(&self.scale);
        let cell_width = self.unit_cell_width();
        let cell_height = self.unit_cell_height();

        if ref_maxs.x < -0.5 || ref_maxs.z < -0.5 || ref_mins.x > 0.5 || ref_mins.z > 0.5 {
            // Outside of the heightfield bounds.
            return;
        }

        let min_x = self.quantize_floor(ref_mins.x, cell_width, self.ncols());
        let min_z = self.quantize_floor(ref_mins.z, cell_height, self.nrows());
        let max_x = self.quantize_ceil(ref_maxs.x, cell_width, self.ncols());
        let max_z = self.quantize_ceil(ref_maxs.z, cell_height, self.nrows());

        for i in min_z..max_z.max(min_z + 1) {
            for j in min_x..max_x.max(min_x + 1) {
                if let Some((tri1, tri2)) = self.triangles_at(i, j) {
                    for (k, tri) in [tri1, tri2].into_iter().enumerate() {
                        let part = self.part(tri);
                        if part.local_aabb().intersects_with_margin(aabb, 0.0) {
                            f(self.part_id(i, j, k == 1), part);
                        }
                    }
                }
            }
        }
    }
}

impl ConcaveShape for HeightField {
    fn local_aabb(&self) -> Aabb {
        self.aabb
    }

    fn map_overlapping_parts(
        &self,
        aabb: &Aabb,
        f: &mut dyn FnMut(u32, &Isometry<Real>, ConvexPart<'_>),
    ) {
        let identity = Isometry::identity();
        self.map_cells_in_aabb(aabb, &mut |id, part| f(id, &identity, part));
    }

    fn map_intersecting_parts(
        &self,
        ray: &Ray,
        max_toi: Real,
        f: &mut dyn FnMut(u32, &Isometry<Real>, ConvexPart<'_>),
    ) {
        let Some((tmin, tmax, _)) = self.aabb.clip_ray_parameters(ray, max_toi) else {
            return;
        };

        let segment_aabb = Aabb::from_points(&[ray.point_at(tmin), ray.point_at(tmax)]);
        let identity = Isometry::identity();
        self.map_cells_in_aabb(&segment_aabb, &mut |id, part| {
            if part.local_aabb().clip_ray_parameters(ray, max_toi).is_some() {
                f(id, &identity, part)
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::HeightField;
    use crate::bounding_volume::Aabb;
    use crate::math::{Point, Vector};
    use crate::query::{Ray, RayCast};
    use crate::shape::{ConcaveShape, ConvexPart, ShapeError};
    use na::DMatrix;

    fn flat(n: usize) -> HeightField {
        HeightField::new(DMatrix::zeros(n, n), Vector::new(10.0, 1.0, 10.0)).unwrap()
    }

    #[test]
    fn heightfield_too_small() {
        assert_eq!(
            HeightField::new(DMatrix::zeros(1, 4), Vector::repeat(1.0)).unwrap_err(),
            ShapeError::HeightFieldTooSmall { nrows: 1, ncols: 4 }
        );
    }

    #[test]
    fn overlapping_parts_of_a_small_box() {
        // 10 cells of size 1 along each axis.
        let hf = flat(11);
        let aabb = Aabb::new(Point::new(0.2, -0.1, 0.2), Point::new(0.8, 0.1, 0.8));
        let mut ids = vec![];
        hf.map_overlapping_parts(&aabb, &mut |id, _, part| {
            assert!(matches!(part, ConvexPart::Triangle(_)));
            ids.push(id)
        });
        ids.sort_unstable();
        assert_eq!(ids, vec![110, 111]);

        let above = Aabb::new(Point::new(0.2, 1.0, 0.2), Point::new(0.8, 2.0, 0.8));
        let mut count = 0;
        hf.map_overlapping_parts(&above, &mut |_, _, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn thick_heightfield_yields_prisms() {
        let hf = flat(11).with_thickness(0.5);
        let below = Aabb::new(Point::new(0.2, -0.4, 0.2), Point::new(0.8, -0.3, 0.8));
        let mut count = 0;
        hf.map_overlapping_parts(&below, &mut |_, _, part| {
            assert!(matches!(part, ConvexPart::Prism(_)));
            count += 1;
        });
        assert_eq!(count, 2);
    }

    #[test]
    fn ray_cast_on_heightfield() {
        let mut heights = DMatrix::zeros(11, 11);
        heights[(5, 5)] = 1.0;
        let hf = HeightField::new(heights, Vector::new(10.0, 1.0, 10.0)).unwrap();

        let ray = Ray::new(Point::new(0.05, 5.0, 0.05), -Vector::y());
        let hit = hf.cast_local_ray_and_get_normal(&ray, 10.0, true).unwrap();
        assert!(hit.time_of_impact > 4.0 && hit.time_of_impact < 4.2);

        let ray = Ray::new(Point::new(-3.3, 5.0, 2.7), -Vector::y());
        let hit = hf.cast_local_ray_and_get_normal(&ray, 10.0, true).unwrap();
        assert_relative_eq!(hit.time_of_impact, 5.0, epsilon = 1.0e-5);
        assert_relative_eq!(hit.normal, Vector::y(), epsilon = 1.0e-5);

        let outside = Ray::new(Point::new(20.0, 5.0, 0.0), -Vector::y());
        assert!(hf.cast_local_ray(&outside, 10.0, true).is_none());
    }
}
