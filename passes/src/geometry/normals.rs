//! Cell and facet normals.

use std::sync::Arc;

use snafu::ensure;
use varform_domain::Domain;
use varform_ir::compound::cross_expr;
use varform_ir::{Expr, GeometricQuantity as Q, Index, indices};

use super::GeometryLowering;
use crate::error::{CellNormalUndefinedSnafu, CellNormalUnsupportedSnafu, InconsistentDimensionsSnafu, Result};

impl GeometryLowering {
    /// Unit normal of a codimension-one manifold, signed by the cell
    /// orientation.
    ///
    /// Surfaces in 3D use the cross product of the two tangent columns of the
    /// Jacobian; curves in 2D rotate their tangent by 90 degrees, so a line
    /// pointing right has its normal pointing up.
    pub(super) fn cell_normal(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let gdim = domain.geometric_dimension();
        let tdim = domain.topological_dimension();
        ensure!(tdim + 1 == gdim, CellNormalUndefinedSnafu { tdim, gdim });

        let normal = match tdim {
            2 => {
                let j = self.lower(Q::Jacobian, domain)?;
                cross_expr(&j.column(0)?, &j.column(1)?)?
            }
            1 => {
                let j = self.lower(Q::Jacobian, domain)?;
                Expr::list_tensor([j.component(&[1, 0])?.neg()?, j.component(&[0, 0])?])?
            }
            _ => return CellNormalUnsupportedSnafu { tdim, gdim }.fail(),
        };

        let orientation = Expr::geometry(Q::CellOrientation, domain);
        Ok(orientation.try_mul(&normal)?.try_div(&euclidean_norm(&normal)?)?)
    }

    /// Outward unit normal of the current facet.
    ///
    /// Intervals take the direction of the Jacobian column, signed by the
    /// reference normal. Higher dimensions push the reference normal through
    /// the covariant map `K^T`, which keeps it orthogonal to the facet in
    /// physical space.
    pub(super) fn facet_normal(&mut self, domain: &Arc<Domain>, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        let reference_normal = Expr::geometry(Q::ReferenceNormal, domain);

        let normal = if domain.topological_dimension() == 1 {
            let j = self.lower(Q::Jacobian, domain)?;
            let direction = j.column(0)?;
            let length = if domain.geometric_dimension() == 1 {
                direction.component(&[0])?.abs()
            } else {
                euclidean_norm(&direction)?
            };
            reference_normal.component(&[0])?.try_mul(&direction)?.try_div(&length)?
        } else {
            let k = self.lower(Q::JacobianInverse, domain)?;
            let [i, j] = indices::<2>();
            let direction = k
                .try_index(&[j.into(), i.into()])?
                .try_mul(&reference_normal.try_index(&[j.into()])?)?
                .as_tensor(&[i])?;
            direction.try_div(&euclidean_norm(&direction)?)?
        };

        ensure!(
            normal.shape() == node.shape(),
            InconsistentDimensionsSnafu {
                quantity: Q::FacetNormal,
                expected: node.shape().clone(),
                actual: normal.shape().clone(),
            }
        );
        Ok(normal)
    }
}

/// `sqrt(v[i] * v[i])`.
fn euclidean_norm(v: &Arc<Expr>) -> varform_ir::Result<Arc<Expr>> {
    let i = Index::new();
    let vi = v.try_index(&[i.into()])?;
    vi.try_mul(&vi)?.try_sqrt()
}
