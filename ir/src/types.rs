//! Leaf payload types shared by the node vocabulary.

use std::hash::{Hash, Hasher};
use std::mem::discriminant;

use smallvec::smallvec;
use varform_domain::Domain;

use crate::shape::Shape;

/// High-level geometric quantity attached to a domain.
///
/// The closed set of quantities the geometry-lowering rules know about. Names
/// parse from and print as snake_case, e.g. `facet_normal`.
#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::AsRefStr, strum::Display, strum::EnumString)]
#[derive(enumset::EnumSetType)]
#[cfg_attr(feature = "testing", derive(proptest_derive::Arbitrary))]
#[strum(serialize_all = "snake_case")]
pub enum GeometricQuantity {
    SpatialCoordinate,
    CellCoordinate,
    FacetCoordinate,
    FacetCellCoordinate,
    CellOrigin,
    FacetOrigin,
    CellFacetOrigin,
    Jacobian,
    JacobianDeterminant,
    JacobianInverse,
    FacetJacobian,
    FacetJacobianDeterminant,
    FacetJacobianInverse,
    CellFacetJacobian,
    RidgeJacobian,
    RidgeJacobianDeterminant,
    RidgeJacobianInverse,
    CellRidgeJacobian,
    ReferenceCellVolume,
    ReferenceFacetVolume,
    ReferenceNormal,
    CellVertices,
    CellEdgeVectors,
    FacetEdgeVectors,
    CellNormal,
    FacetNormal,
    CellOrientation,
    FacetOrientation,
    QuadratureWeight,
    CellVolume,
    Circumradius,
    CellDiameter,
    FacetArea,
    MinCellEdgeLength,
    MaxCellEdgeLength,
    MinFacetEdgeLength,
    MaxFacetEdgeLength,
}

impl GeometricQuantity {
    /// Tensor shape of the quantity on `domain`.
    pub fn shape(&self, domain: &Domain) -> Shape {
        let g = domain.geometric_dimension();
        let t = domain.topological_dimension();
        let cell = domain.cell_type();
        let facet = t.saturating_sub(1);
        let ridge = t.saturating_sub(2);

        match self {
            Self::SpatialCoordinate
            | Self::CellOrigin
            | Self::FacetOrigin
            | Self::CellNormal
            | Self::FacetNormal => smallvec![g],
            Self::CellCoordinate | Self::FacetCellCoordinate | Self::CellFacetOrigin | Self::ReferenceNormal => {
                smallvec![t]
            }
            Self::FacetCoordinate => smallvec![facet],
            Self::Jacobian => smallvec![g, t],
            Self::JacobianInverse => smallvec![t, g],
            Self::FacetJacobian => smallvec![g, facet],
            Self::FacetJacobianInverse => smallvec![facet, g],
            Self::CellFacetJacobian => smallvec![t, facet],
            Self::RidgeJacobian => smallvec![g, ridge],
            Self::RidgeJacobianInverse => smallvec![ridge, g],
            Self::CellRidgeJacobian => smallvec![t, ridge],
            Self::CellVertices => smallvec![cell.num_vertices(), g],
            Self::CellEdgeVectors => smallvec![cell.num_edges(), g],
            Self::FacetEdgeVectors => smallvec![cell.num_facet_edges(), g],
            Self::JacobianDeterminant
            | Self::FacetJacobianDeterminant
            | Self::RidgeJacobianDeterminant
            | Self::ReferenceCellVolume
            | Self::ReferenceFacetVolume
            | Self::CellOrientation
            | Self::FacetOrientation
            | Self::QuadratureWeight
            | Self::CellVolume
            | Self::Circumradius
            | Self::CellDiameter
            | Self::FacetArea
            | Self::MinCellEdgeLength
            | Self::MaxCellEdgeLength
            | Self::MinFacetEdgeLength
            | Self::MaxFacetEdgeLength => Shape::new(),
        }
    }
}

/// Side of an interior facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumIter, strum::AsRefStr, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "testing", derive(proptest_derive::Arbitrary))]
pub enum Side {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
}

impl Side {
    pub const fn opposite(&self) -> Side {
        match self {
            Self::Plus => Self::Minus,
            Self::Minus => Self::Plus,
        }
    }
}

/// Literal value of a `Const` node.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
}

impl ConstValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl std::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
        }
    }
}

/// Bitwise-comparable wrapper so literals can live in hashed payloads.
#[derive(Debug, Clone, Copy)]
pub struct ConstValueHash(pub ConstValue);

impl PartialEq for ConstValueHash {
    fn eq(&self, other: &Self) -> bool {
        match (self.0, other.0) {
            (ConstValue::Int(a), ConstValue::Int(b)) => a == b,
            (ConstValue::Float(a), ConstValue::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for ConstValueHash {}

impl Hash for ConstValueHash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(&self.0).hash(state);
        match self.0 {
            ConstValue::Int(v) => v.hash(state),
            ConstValue::Float(v) => v.to_bits().hash(state),
        }
    }
}
