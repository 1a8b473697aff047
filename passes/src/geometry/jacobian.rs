//! Jacobians of the coordinate map and of its facet and ridge restrictions,
//! plus the coordinate quantities derived from them.

use std::sync::Arc;

use snafu::ensure;
use varform_domain::Domain;
use varform_ir::compound::{determinant_expr, inverse_expr};
use varform_ir::{Expr, GeometricQuantity as Q, indices};

use super::GeometryLowering;
use crate::error::{FacetCellCoordinateUnsupportedSnafu, PiolaMappedCoordinatesSnafu, Result};

impl GeometryLowering {
    pub(super) fn jacobian(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        require_identity_pullback(Q::Jacobian, domain)?;
        let x = self.lower(Q::SpatialCoordinate, domain)?;
        Ok(x.try_reference_grad()?)
    }

    pub(super) fn jacobian_inverse(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let j = self.lower(Q::Jacobian, domain)?;
        Ok(inverse_expr(&j)?)
    }

    /// `det J`, signed by the cell orientation on immersed meshes where the
    /// pseudo-determinant is always positive.
    pub(super) fn jacobian_determinant(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let j = self.lower(Q::Jacobian, domain)?;
        let det = determinant_expr(&j)?;
        if domain.topological_dimension() < domain.geometric_dimension() {
            return Ok(Expr::geometry(Q::CellOrientation, domain).try_mul(&det)?);
        }
        Ok(det)
    }

    pub(super) fn facet_jacobian(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let j = self.lower(Q::Jacobian, domain)?;
        contract(&j, &Expr::geometry(Q::CellFacetJacobian, domain))
    }

    pub(super) fn facet_jacobian_inverse(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let fj = self.lower(Q::FacetJacobian, domain)?;
        Ok(inverse_expr(&fj)?)
    }

    /// Never signed: the facet orientation is left to the caller.
    pub(super) fn facet_jacobian_determinant(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let fj = self.lower(Q::FacetJacobian, domain)?;
        Ok(determinant_expr(&fj)?)
    }

    pub(super) fn ridge_jacobian(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let j = self.lower(Q::Jacobian, domain)?;
        contract(&j, &Expr::geometry(Q::CellRidgeJacobian, domain))
    }

    pub(super) fn ridge_jacobian_inverse(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let rj = self.lower(Q::RidgeJacobian, domain)?;
        Ok(inverse_expr(&rj)?)
    }

    pub(super) fn ridge_jacobian_determinant(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let rj = self.lower(Q::RidgeJacobian, domain)?;
        Ok(determinant_expr(&rj)?)
    }

    /// Physical coordinates stay a terminal; only the pullback is checked.
    pub(super) fn spatial_coordinate(&mut self, domain: &Arc<Domain>, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        require_identity_pullback(Q::SpatialCoordinate, domain)?;
        Ok(node.clone())
    }

    /// `X = K (x - x0)` through the affine inverse map.
    pub(super) fn cell_coordinate(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let k = self.lower(Q::JacobianInverse, domain)?;
        let x = self.lower(Q::SpatialCoordinate, domain)?;
        let x0 = Expr::geometry(Q::CellOrigin, domain);

        let [i, j] = indices::<2>();
        let offset = x.try_index(&[j.into()])?.try_sub(&x0.try_index(&[j.into()])?)?;
        Ok(k.try_index(&[i.into(), j.into()])?.try_mul(&offset)?.as_tensor(&[i])?)
    }

    pub(super) fn facet_cell_coordinate(&mut self) -> Result<Arc<Expr>> {
        FacetCellCoordinateUnsupportedSnafu.fail()
    }
}

fn require_identity_pullback(quantity: Q, domain: &Domain) -> Result<()> {
    let pullback = domain.coordinate_element().pullback();
    ensure!(pullback.is_identity(), PiolaMappedCoordinatesSnafu { quantity, pullback });
    Ok(())
}

/// `C[i, j] = A[i, k] B[k, j]`.
fn contract(a: &Arc<Expr>, b: &Arc<Expr>) -> Result<Arc<Expr>> {
    let [i, j, k] = indices::<3>();
    let product = a.try_index(&[i.into(), k.into()])?.try_mul(&b.try_index(&[k.into(), j.into()])?)?;
    Ok(product.as_tensor(&[i, j])?)
}
