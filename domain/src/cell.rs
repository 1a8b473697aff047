//! Reference cell types.

/// Reference cell shape of a mesh.
///
/// Simplices and tensor-product cells up to dimension three. The numbering of
/// vertices and edges follows the UFC reference cells: for a tetrahedron the
/// edges `0..6` join the vertex pairs `(2,3), (1,3), (1,2), (0,3), (0,2), (0,1)`,
/// so edge `k` and edge `5 - k` are opposite.
#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::AsRefStr, strum::Display, strum::EnumString)]
#[derive(enumset::EnumSetType)]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
#[strum(serialize_all = "snake_case")]
pub enum CellType {
    Vertex,
    Interval,
    Triangle,
    Tetrahedron,
    Quadrilateral,
    Hexahedron,
}

impl CellType {
    pub const fn topological_dimension(&self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Interval => 1,
            Self::Triangle | Self::Quadrilateral => 2,
            Self::Tetrahedron | Self::Hexahedron => 3,
        }
    }

    pub const fn is_simplex(&self) -> bool {
        matches!(self, Self::Vertex | Self::Interval | Self::Triangle | Self::Tetrahedron)
    }

    pub const fn num_vertices(&self) -> usize {
        match self {
            Self::Vertex => 1,
            Self::Interval => 2,
            Self::Triangle => 3,
            Self::Tetrahedron | Self::Quadrilateral => 4,
            Self::Hexahedron => 8,
        }
    }

    /// Tetrahedron edges are numbered so that edges `k` and `5 - k` are
    /// opposite: (2,3), (1,3), (1,2), (0,3), (0,2), (0,1).
    pub const fn num_edges(&self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Interval => 1,
            Self::Triangle => 3,
            Self::Quadrilateral => 4,
            Self::Tetrahedron => 6,
            Self::Hexahedron => 12,
        }
    }

    pub const fn num_facets(&self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Interval => 2,
            Self::Triangle => 3,
            Self::Tetrahedron | Self::Quadrilateral => 4,
            Self::Hexahedron => 6,
        }
    }

    /// Cell type of the facets, `None` for a vertex.
    pub const fn facet_type(&self) -> Option<CellType> {
        match self {
            Self::Vertex => None,
            Self::Interval => Some(Self::Vertex),
            Self::Triangle | Self::Quadrilateral => Some(Self::Interval),
            Self::Tetrahedron => Some(Self::Triangle),
            Self::Hexahedron => Some(Self::Quadrilateral),
        }
    }

    /// Number of edges of a single facet (zero below dimension three).
    pub const fn num_facet_edges(&self) -> usize {
        match self.facet_type() {
            Some(facet) if self.topological_dimension() >= 3 => facet.num_edges(),
            _ => 0,
        }
    }

    /// Volume of the reference cell.
    pub const fn reference_volume(&self) -> f64 {
        match self {
            Self::Vertex | Self::Interval | Self::Quadrilateral | Self::Hexahedron => 1.0,
            Self::Triangle => 0.5,
            Self::Tetrahedron => 1.0 / 6.0,
        }
    }

    /// Volume of the reference facet; a vertex counts as one.
    pub const fn reference_facet_volume(&self) -> f64 {
        match self.facet_type() {
            Some(facet) => facet.reference_volume(),
            None => 1.0,
        }
    }
}
