//! Which restriction each kind of terminal receives.

use varform_ir::{Expr, GeometricQuantity as Q, Op};

/// How a node reacts to the side currently being propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Policy {
    /// Same value from both sides, and computable without picking one.
    Ignore,
    /// Discontinuous across the facet; a side must be set.
    Require,
    /// Continuous, but computed from one side; falls back to the default
    /// side when none is set.
    Default,
    /// Evaluated on the default side and negated on the other one.
    Opposite,
}

/// Policy for `node`, or `None` for operators, which rebuild from their
/// restricted operands instead.
///
/// `Grad` counts as a terminal here: after derivative expansion it only wraps
/// form arguments and is restricted as a whole.
pub fn policy(node: &Expr) -> Option<Policy> {
    let policy = match node.op() {
        Op::MultiIndex(_) | Op::Label(_) | Op::Const(_) | Op::Zero { .. } | Op::Constant { .. } => Policy::Ignore,
        Op::Argument { .. } | Op::Grad(_) => Policy::Require,
        Op::Coefficient { space, .. } => {
            if space.sobolev_space().is_h1_conforming() {
                Policy::Default
            } else {
                Policy::Require
            }
        }
        Op::Geometry { quantity, domain } => match quantity {
            Q::FacetCoordinate | Q::QuadratureWeight | Q::ReferenceCellVolume | Q::ReferenceFacetVolume => {
                Policy::Ignore
            }
            Q::SpatialCoordinate
            | Q::FacetJacobian
            | Q::FacetJacobianDeterminant
            | Q::FacetJacobianInverse
            | Q::FacetArea
            | Q::MinFacetEdgeLength
            | Q::MaxFacetEdgeLength
            | Q::FacetOrigin => Policy::Default,
            Q::FacetNormal => {
                let element = domain.coordinate_element();
                let affine_conforming = element.embedded_superdegree() <= 1
                    && element.sobolev_space().is_h1_conforming()
                    && domain.geometric_dimension() == domain.topological_dimension();
                if affine_conforming { Policy::Opposite } else { Policy::Require }
            }
            _ => Policy::Require,
        },
        _ => return None,
    };
    Some(policy)
}
