//! Integration domains.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::cell::CellType;
use crate::element::CoordinateElement;
use crate::error::Result;

static DOMAIN_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_domain_id() -> u64 {
    DOMAIN_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A mesh described by its coordinate element.
///
/// Two domains are equal only if they are the same mesh: every constructor
/// call allocates a fresh id, even for identical coordinate elements.
#[derive(Debug, Clone, derive_more::Display)]
#[display("Domain#{id}({}, gdim={})", element.cell(), element.geometric_dimension())]
pub struct Domain {
    id: u64,
    element: CoordinateElement,
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Domain {}

impl Hash for Domain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Domain {
    pub fn new(element: CoordinateElement) -> Arc<Self> {
        Arc::new(Self { id: next_domain_id(), element })
    }

    /// Mesh with a continuous Lagrange coordinate field of the given degree.
    pub fn lagrange(cell: CellType, degree: usize, geometric_dimension: usize) -> Result<Arc<Self>> {
        Ok(Self::new(CoordinateElement::lagrange(cell, degree, geometric_dimension)?))
    }

    /// P1/Q1 mesh embedded in its own dimension.
    pub fn linear(cell: CellType) -> Arc<Self> {
        Self::new(CoordinateElement::linear(cell))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn coordinate_element(&self) -> &CoordinateElement {
        &self.element
    }

    pub fn cell_type(&self) -> CellType {
        self.element.cell()
    }

    pub fn topological_dimension(&self) -> usize {
        self.element.cell().topological_dimension()
    }

    pub fn geometric_dimension(&self) -> usize {
        self.element.geometric_dimension()
    }

    /// Geometric minus topological dimension.
    pub fn codimension(&self) -> usize {
        self.geometric_dimension() - self.topological_dimension()
    }

    /// Whether every cell is an affine image of the reference simplex.
    pub fn is_piecewise_linear_simplex_domain(&self) -> bool {
        self.element.embedded_superdegree() <= 1 && self.cell_type().is_simplex()
    }
}
