//! Function spaces of form arguments.

use std::sync::Arc;

use smallvec::smallvec;
use varform_domain::{Domain, SobolevSpace};

use crate::shape::Shape;

/// The space an `Argument` or `Coefficient` lives in.
///
/// Only what the rewriting passes inspect is kept: the domain, the value
/// shape, the Sobolev space of the element and its degree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSpace {
    domain: Arc<Domain>,
    value_shape: Shape,
    sobolev_space: SobolevSpace,
    degree: usize,
}

impl FunctionSpace {
    pub fn new(domain: Arc<Domain>, value_shape: Shape, sobolev_space: SobolevSpace, degree: usize) -> Arc<Self> {
        Arc::new(Self { domain, value_shape, sobolev_space, degree })
    }

    /// Scalar continuous Lagrange space.
    pub fn lagrange(domain: &Arc<Domain>, degree: usize) -> Arc<Self> {
        Self::new(domain.clone(), Shape::new(), SobolevSpace::H1, degree)
    }

    /// Vector-valued continuous Lagrange space with one component per
    /// geometric dimension.
    pub fn vector_lagrange(domain: &Arc<Domain>, degree: usize) -> Arc<Self> {
        Self::new(domain.clone(), smallvec![domain.geometric_dimension()], SobolevSpace::H1, degree)
    }

    /// Scalar discontinuous Lagrange space.
    pub fn discontinuous(domain: &Arc<Domain>, degree: usize) -> Arc<Self> {
        Self::new(domain.clone(), Shape::new(), SobolevSpace::L2, degree)
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    pub fn value_shape(&self) -> &Shape {
        &self.value_shape
    }

    pub fn sobolev_space(&self) -> SobolevSpace {
        self.sobolev_space
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}
