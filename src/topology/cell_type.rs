//! Cell type metadata for mesh points.

/// Cell types understood by the geometry and basis layers.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd, serde::Serialize, serde::Deserialize,
)]
pub enum CellType {
    /// 0D vertex.
    #[default]
    Vertex,
    /// 1D segment/edge.
    Segment,
    /// 2D simplex (triangle).
    Triangle,
    /// 2D tensor-product cell (quad).
    Quadrilateral,
}

impl CellType {
    /// Topological dimension of the cell.
    pub const fn dimension(self) -> usize {
        match self {
            CellType::Vertex => 0,
            CellType::Segment => 1,
            CellType::Triangle | CellType::Quadrilateral => 2,
        }
    }

    /// Number of vertices in the closure of the cell.
    pub const fn vertex_count(self) -> usize {
        match self {
            CellType::Vertex => 1,
            CellType::Segment => 2,
            CellType::Triangle => 3,
            CellType::Quadrilateral => 4,
        }
    }

    /// Cell type of the codimension-1 faces.
    pub const fn facet_type(self) -> Option<CellType> {
        match self {
            CellType::Vertex => None,
            CellType::Segment => Some(CellType::Vertex),
            CellType::Triangle | CellType::Quadrilateral => Some(CellType::Segment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_and_facets() {
        assert_eq!(CellType::Quadrilateral.dimension(), 2);
        assert_eq!(CellType::Triangle.vertex_count(), 3);
        assert_eq!(CellType::Segment.facet_type(), Some(CellType::Vertex));
        assert_eq!(CellType::Vertex.facet_type(), None);
    }
}
