//! Cell volumes, facet areas, circumradius, edge lengths and diameter.
//!
//! Volume and area formulas are exact only on affine simplices and edge
//! lengths only on P1/Q1 meshes. Outside that range the node is kept as it
//! is and a warning is emitted, leaving the quantity to a later stage. The
//! circumradius has no such fallback and fails instead.

use std::sync::Arc;

use itertools::Itertools;
use smallvec::SmallVec;
use snafu::ensure;
use varform_domain::{CellType, Domain};
use varform_ir::{Expr, GeometricQuantity as Q, Index};

use super::{GeometryLowering, Reduction};
use crate::error::{
    CircumradiusNonAffineSnafu, CircumradiusUnsupportedCellSnafu, FacetEdgeLengthDimensionSnafu, NoEdgesSnafu, Result,
};

impl GeometryLowering {
    /// `|det J * reference volume|`.
    pub(super) fn cell_volume(&mut self, domain: &Arc<Domain>, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        if !domain.is_piecewise_linear_simplex_domain() {
            let reason = "only know how to compute the cell volume of an affine cell";
            return Ok(deferred(node, Q::CellVolume, domain, superdegree(domain), reason));
        }
        let det = self.lower(Q::JacobianDeterminant, domain)?;
        let reference = Expr::geometry(Q::ReferenceCellVolume, domain);
        Ok(det.try_mul(&reference)?.abs())
    }

    /// `|det FJ * reference facet volume|`; a vertex has area one.
    pub(super) fn facet_area(&mut self, domain: &Arc<Domain>, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        if !domain.is_piecewise_linear_simplex_domain() {
            let reason = "only know how to compute the facet area of an affine cell";
            return Ok(deferred(node, Q::FacetArea, domain, superdegree(domain), reason));
        }
        if domain.topological_dimension() == 1 {
            return Ok(Expr::float(1.0));
        }
        let det = self.lower(Q::FacetJacobianDeterminant, domain)?;
        let reference = Expr::geometry(Q::ReferenceFacetVolume, domain);
        Ok(det.try_mul(&reference)?.abs())
    }

    /// Circumradius of an affine simplex.
    ///
    /// For a tetrahedron the products of opposite edge lengths form the
    /// sides of an auxiliary triangle whose area, over six times the volume,
    /// is the circumradius. Opposite edges are paired as `(3, 2)`, `(4, 1)`
    /// and `(5, 0)`, which relies on the reference edge numbering of
    /// [`CellType::Tetrahedron`].
    pub(super) fn circumradius(&mut self, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let cell = domain.cell_type();
        ensure!(
            domain.is_piecewise_linear_simplex_domain(),
            CircumradiusNonAffineSnafu { cell, degree: domain.coordinate_element().embedded_superdegree() }
        );

        let volume = self.lower(Q::CellVolume, domain)?;
        match cell {
            CellType::Interval => Ok(Expr::float(0.5).try_mul(&volume)?),
            CellType::Triangle => {
                let l = edge_lengths(domain)?;
                let numerator = l[0].try_mul(&l[1])?.try_mul(&l[2])?;
                Ok(numerator.try_div(&Expr::float(4.0).try_mul(&volume)?)?)
            }
            CellType::Tetrahedron => {
                let l = edge_lengths(domain)?;
                let la = l[3].try_mul(&l[2])?;
                let lb = l[4].try_mul(&l[1])?;
                let lc = l[5].try_mul(&l[0])?;
                let perimeter = la.try_add(&lb)?.try_add(&lc)?;
                let s = perimeter.try_div(&Expr::int(2))?;
                let heron = s.try_mul(&s.try_sub(&la)?)?.try_mul(&s.try_sub(&lb)?)?.try_mul(&s.try_sub(&lc)?)?;
                let area = heron.try_sqrt()?;
                Ok(area.try_div(&Expr::float(6.0).try_mul(&volume)?)?)
            }
            _ => CircumradiusUnsupportedCellSnafu { cell }.fail(),
        }
    }

    pub(super) fn cell_edge_length(
        &mut self,
        domain: &Arc<Domain>,
        node: &Arc<Expr>,
        reduction: Reduction,
    ) -> Result<Arc<Expr>> {
        let quantity = match reduction {
            Reduction::Max => Q::MaxCellEdgeLength,
            Reduction::Min => Q::MinCellEdgeLength,
        };
        if subdegree(domain) > 1 {
            let reason = "only know how to compute cell edge lengths of P1 or Q1 cells";
            return Ok(deferred(node, quantity, domain, subdegree(domain), reason));
        }
        if domain.cell_type() == CellType::Interval {
            return self.lower(Q::CellVolume, domain);
        }
        let squared = squared_edge_lengths(&Expr::geometry(Q::CellEdgeVectors, domain))?;
        reduce(&squared, reduction, quantity, domain)
    }

    /// Longest edge on simplices, longest vertex-to-vertex distance otherwise.
    pub(super) fn cell_diameter(&mut self, domain: &Arc<Domain>, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        if subdegree(domain) > 1 {
            let reason = "only know how to compute the cell diameter of P1 or Q1 cells";
            return Ok(deferred(node, Q::CellDiameter, domain, subdegree(domain), reason));
        }
        if domain.is_piecewise_linear_simplex_domain() {
            return self.lower(Q::MaxCellEdgeLength, domain);
        }

        let vertices = Expr::geometry(Q::CellVertices, domain);
        let rows = (0..domain.cell_type().num_vertices())
            .map(|v| vertices.row(v))
            .collect::<varform_ir::Result<Vec<_>>>()?;
        let mut squared = SmallVec::<[Arc<Expr>; 28]>::new();
        for (a, b) in rows.iter().tuple_combinations() {
            squared.push(squared_norm(&a.try_sub(b)?)?);
        }
        reduce(&squared, Reduction::Max, Q::CellDiameter, domain)
    }

    pub(super) fn facet_edge_length(
        &mut self,
        domain: &Arc<Domain>,
        node: &Arc<Expr>,
        reduction: Reduction,
    ) -> Result<Arc<Expr>> {
        let tdim = domain.topological_dimension();
        ensure!(tdim >= 3, FacetEdgeLengthDimensionSnafu { tdim });

        let quantity = match reduction {
            Reduction::Max => Q::MaxFacetEdgeLength,
            Reduction::Min => Q::MinFacetEdgeLength,
        };
        if subdegree(domain) > 1 {
            let reason = "only know how to compute facet edge lengths of P1 or Q1 cells";
            return Ok(deferred(node, quantity, domain, subdegree(domain), reason));
        }
        let squared = squared_edge_lengths(&Expr::geometry(Q::FacetEdgeVectors, domain))?;
        reduce(&squared, reduction, quantity, domain)
    }
}

fn subdegree(domain: &Domain) -> usize {
    domain.coordinate_element().embedded_subdegree()
}

fn superdegree(domain: &Domain) -> usize {
    domain.coordinate_element().embedded_superdegree()
}

/// Warn about a quantity left for a later stage; `degree` is the one the
/// lowering condition failed on.
fn deferred(node: &Arc<Expr>, quantity: Q, domain: &Domain, degree: usize, reason: &'static str) -> Arc<Expr> {
    tracing::warn!(%quantity, cell = %domain.cell_type(), degree, "{reason}; leaving it unlowered");
    node.clone()
}

/// `real(v[j] * conj(v[j]))` summed over `j`.
fn squared_norm(v: &Arc<Expr>) -> varform_ir::Result<Arc<Expr>> {
    let j = Index::new();
    let vj = v.try_index(&[j.into()])?;
    Ok(vj.try_mul(&vj.conj())?.real())
}

/// Squared length of row `k` of an edge-vector matrix.
fn squared_edge_length(edges: &Arc<Expr>, k: usize) -> varform_ir::Result<Arc<Expr>> {
    let j = Index::new();
    let ekj = edges.try_index(&[k.into(), j.into()])?;
    Ok(ekj.try_mul(&ekj.conj())?.real())
}

fn edge_lengths(domain: &Arc<Domain>) -> Result<SmallVec<[Arc<Expr>; 6]>> {
    let edges = Expr::geometry(Q::CellEdgeVectors, domain);
    let mut lengths = SmallVec::new();
    for k in 0..domain.cell_type().num_edges() {
        lengths.push(squared_edge_length(&edges, k)?.try_sqrt()?.real());
    }
    Ok(lengths)
}

/// Squared lengths of the rows of `edges`.
fn squared_edge_lengths(edges: &Arc<Expr>) -> varform_ir::Result<SmallVec<[Arc<Expr>; 12]>> {
    let count = edges.shape().first().copied().unwrap_or(0);
    (0..count).map(|k| squared_edge_length(edges, k)).collect()
}

/// `real(sqrt(reduce(max|min, squared)))`; fails on cells without edges.
fn reduce(squared: &[Arc<Expr>], reduction: Reduction, quantity: Q, domain: &Domain) -> Result<Arc<Expr>> {
    let mut terms = squared.iter();
    let Some(first) = terms.next() else {
        return NoEdgesSnafu { quantity, cell: domain.cell_type() }.fail();
    };
    let mut acc = first.clone();
    for term in terms {
        acc = reduction.apply(&acc, term)?;
    }
    Ok(acc.try_sqrt()?.real())
}
