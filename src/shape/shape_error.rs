/// Errors detected while building a shape.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShapeError {
    /// The polyhedron has too few points or faces, a face with less than 3 vertices, a face
    /// with a zero area, or a vertex that no face references.
    #[error("the convex polyhedron is degenerate.")]
    DegeneratePolyhedron,
    /// A polyhedron edge is not shared by exactly two faces with opposite orientations.
    #[error("the polyhedron is not closed: the edge ({0}, {1}) has no opposite half-edge.")]
    OpenPolyhedron(u32, u32),
    /// A polyhedron vertex lies strictly above the plane of one of its faces.
    #[error("the polyhedron is not convex: vertex {vertex} lies above face {face}.")]
    NonConvexPolyhedron {
        /// The offending face.
        face: u32,
        /// The vertex above that face.
        vertex: u32,
    },
    /// A heightfield needs at least two rows and two columns of heights.
    #[error("a heightfield must have at least 2x2 heights, got {nrows}x{ncols}.")]
    HeightFieldTooSmall {
        /// Number of rows of the heights matrix.
        nrows: usize,
        /// Number of columns of the heights matrix.
        ncols: usize,
    },
    /// A triangle or face index refers to a vertex that does not exist.
    #[error("the vertex index {index} is out of range ({len} vertices).")]
    IndexOutOfRange {
        /// The invalid index.
        index: u32,
        /// The number of vertices.
        len: usize,
    },
    /// A triangle mesh must contain at least one triangle.
    #[error("a triangle mesh must contain at least one triangle.")]
    EmptyTriMesh,
    /// A compound shape must contain at least one child.
    #[error("a compound shape must contain at least one child shape.")]
    EmptyCompound,
    /// Compound shapes cannot contain other compound shapes.
    #[error("nested compound shapes are not supported.")]
    NestedCompound,
}
