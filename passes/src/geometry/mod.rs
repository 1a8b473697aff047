//! Geometry lowering.
//!
//! Rewrites high-level geometric quantities (cell volume, facet normal,
//! circumradius, edge lengths, ...) into expressions over the Jacobian and
//! reference-cell primitives. Quantities in the preserve set are left alone;
//! everything else is built from closed-form formulas that depend on the
//! cell type and on the codimension of the mesh.
//!
//! Lowered quantities are memoized per domain for the lifetime of a
//! [`GeometryLowering`], so dependencies such as the Jacobian are built once
//! and shared by every formula that needs them.
//!
//! # Module Organization
//!
//! - [`jacobian`] - Jacobians, their inverses and determinants, coordinates
//! - [`measures`] - Volumes, areas, circumradius, edge lengths and diameter
//! - [`normals`] - Cell and facet normals

mod jacobian;
mod measures;
mod normals;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use varform_domain::Domain;
use varform_ir::rewrite::{Rule, RuleSet, RuleTable, map_expr_dag};
use varform_ir::{Expr, GeometricQuantity, IntegralType, MapIntegrands, NodeKind, Op};

use crate::config::{LoweringConfig, PreserveSet};
use crate::error::{Error, Result};

/// Rule set lowering geometric quantities.
#[derive(Debug, Default)]
pub struct GeometryLowering {
    preserve: PreserveSet,
    lowered: HashMap<(GeometricQuantity, u64), Arc<Expr>>,
}

impl GeometryLowering {
    pub fn new(preserve: PreserveSet) -> Self {
        Self { preserve, lowered: HashMap::new() }
    }

    pub fn preserve(&self) -> PreserveSet {
        self.preserve
    }

    /// Lowered form of `quantity` on `domain`.
    ///
    /// A preserved quantity comes back as its own terminal. Preservation
    /// applies to the requested quantity only: lowering `JacobianDeterminant`
    /// with `Jacobian` preserved still builds the determinant, on top of the
    /// unlowered Jacobian.
    pub fn lower(&mut self, quantity: GeometricQuantity, domain: &Arc<Domain>) -> Result<Arc<Expr>> {
        let key = (quantity, domain.id());
        if let Some(done) = self.lowered.get(&key) {
            return Ok(done.clone());
        }

        let node = Expr::geometry(quantity, domain);
        let result = if self.preserve.contains(quantity) { node } else { self.compute(quantity, domain, &node)? };
        tracing::trace!(%quantity, domain = domain.id(), "geometry lowered");
        self.lowered.insert(key, result.clone());
        Ok(result)
    }

    fn compute(&mut self, quantity: GeometricQuantity, domain: &Arc<Domain>, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        use GeometricQuantity as Q;

        match quantity {
            Q::Jacobian => self.jacobian(domain),
            Q::JacobianInverse => self.jacobian_inverse(domain),
            Q::JacobianDeterminant => self.jacobian_determinant(domain),
            Q::FacetJacobian => self.facet_jacobian(domain),
            Q::FacetJacobianInverse => self.facet_jacobian_inverse(domain),
            Q::FacetJacobianDeterminant => self.facet_jacobian_determinant(domain),
            Q::RidgeJacobian => self.ridge_jacobian(domain),
            Q::RidgeJacobianInverse => self.ridge_jacobian_inverse(domain),
            Q::RidgeJacobianDeterminant => self.ridge_jacobian_determinant(domain),
            Q::SpatialCoordinate => self.spatial_coordinate(domain, node),
            Q::CellCoordinate => self.cell_coordinate(domain),
            Q::FacetCellCoordinate => self.facet_cell_coordinate(),
            Q::CellVolume => self.cell_volume(domain, node),
            Q::FacetArea => self.facet_area(domain, node),
            Q::Circumradius => self.circumradius(domain),
            Q::MaxCellEdgeLength => self.cell_edge_length(domain, node, Reduction::Max),
            Q::MinCellEdgeLength => self.cell_edge_length(domain, node, Reduction::Min),
            Q::CellDiameter => self.cell_diameter(domain, node),
            Q::MaxFacetEdgeLength => self.facet_edge_length(domain, node, Reduction::Max),
            Q::MinFacetEdgeLength => self.facet_edge_length(domain, node, Reduction::Min),
            Q::CellNormal => self.cell_normal(domain),
            Q::FacetNormal => self.facet_normal(domain, node),

            // Primitives the formulas are written in.
            Q::FacetCoordinate
            | Q::CellOrigin
            | Q::FacetOrigin
            | Q::CellFacetOrigin
            | Q::CellFacetJacobian
            | Q::CellRidgeJacobian
            | Q::ReferenceCellVolume
            | Q::ReferenceFacetVolume
            | Q::ReferenceNormal
            | Q::CellVertices
            | Q::CellEdgeVectors
            | Q::FacetEdgeVectors
            | Q::CellOrientation
            | Q::FacetOrientation
            | Q::QuadratureWeight => Ok(node.clone()),
        }
    }

    fn geometry(&mut self, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        let Op::Geometry { quantity, domain } = node.op() else {
            return Ok(node.clone());
        };
        if self.preserve.contains(*quantity) {
            return Ok(node.clone());
        }
        let lowered = self.lower(*quantity, domain)?;
        Ok(if lowered.structurally_eq(node) { node.clone() } else { lowered })
    }

    fn keep(&mut self, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        Ok(node.clone())
    }
}

impl RuleSet for GeometryLowering {
    type Error = Error;

    fn rule_table() -> &'static RuleTable<Self> {
        static TABLE: OnceLock<RuleTable<GeometryLowering>> = OnceLock::new();
        TABLE.get_or_init(|| {
            tracing::debug!("building geometry lowering rule table");
            RuleTable::new("geometry-lowering")
                .on(NodeKind::Geometry, Rule::Cutoff(Self::geometry))
                .terminal_fallback(Rule::Cutoff(Self::keep))
                .operator_fallback(Rule::ReuseIfUntouched)
        })
    }
}

/// Max or min over a list of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reduction {
    Max,
    Min,
}

impl Reduction {
    fn apply(self, lhs: &Arc<Expr>, rhs: &Arc<Expr>) -> varform_ir::Result<Arc<Expr>> {
        match self {
            Self::Max => lhs.try_max(rhs),
            Self::Min => lhs.try_min(rhs),
        }
    }
}

/// Quantities every integral of `integral_type` keeps, whatever the caller asks.
pub fn automatic_preserve(integral_type: IntegralType) -> PreserveSet {
    if integral_type.is_custom() || integral_type.is_point() {
        GeometricQuantity::SpatialCoordinate | GeometricQuantity::Jacobian
    } else {
        PreserveSet::only(GeometricQuantity::CellCoordinate)
    }
}

/// Lower the geometric quantities of a form, an integral or an expression.
///
/// Every integral gets its own rule set, with `preserve` extended by
/// [`automatic_preserve`] for its integral type. A bare expression uses
/// `preserve` as given.
#[tracing::instrument(skip_all, fields(preserve = ?preserve))]
pub fn apply_geometry_lowering<T: MapIntegrands>(target: &T, preserve: PreserveSet) -> Result<T> {
    target.try_map_integrands(|integrand, integral| {
        let preserve = match integral {
            Some(integral) => preserve | automatic_preserve(integral.integral_type()),
            None => preserve,
        };
        let mut rules = GeometryLowering::new(preserve);
        map_expr_dag(&mut rules, integrand)
    })
}

/// [`apply_geometry_lowering`] with the preserve set of `config`.
pub fn apply_geometry_lowering_with_config<T: MapIntegrands>(target: &T, config: &LoweringConfig) -> Result<T> {
    apply_geometry_lowering(target, config.preserve)
}
