use snafu::Snafu;
use varform_domain::{CellType, Pullback};
use varform_ir::{GeometricQuantity, Shape, Side};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Piola mapped coordinates are not supported when lowering {quantity} ({pullback} pullback)"))]
    PiolaMappedCoordinates { quantity: GeometricQuantity, pullback: Pullback },

    #[snafu(display("facet reference coordinates cannot be computed from physical coordinates"))]
    FacetCellCoordinateUnsupported,

    #[snafu(display("cell normal undefined for tdim {tdim}, gdim {gdim}"))]
    CellNormalUndefined { tdim: usize, gdim: usize },

    #[snafu(display("cell normal not implemented for tdim {tdim}, gdim {gdim}"))]
    CellNormalUnsupported { tdim: usize, gdim: usize },

    /// A lowered quantity came out with a different shape than the node it replaces.
    #[snafu(display("inconsistent dimensions lowering {quantity} (in={expected:?}, out={actual:?})"))]
    InconsistentDimensions { quantity: GeometricQuantity, expected: Shape, actual: Shape },

    #[snafu(display("circumradius only makes sense for affine simplex cells, got {cell} of degree {degree}"))]
    CircumradiusNonAffine { cell: CellType, degree: usize },

    #[snafu(display("circumradius is not defined for {cell} cells"))]
    CircumradiusUnsupportedCell { cell: CellType },

    #[snafu(display("{quantity} needs at least one edge, {cell} cells have none"))]
    NoEdges { quantity: GeometricQuantity, cell: CellType },

    #[snafu(display("facet edge lengths only make sense for topological dimension >= 3, got {tdim}"))]
    FacetEdgeLengthDimension { tdim: usize },

    /// `Restricted` found below another `Restricted`.
    #[snafu(display("cannot restrict an expression twice (already restricted to '{side}')"))]
    DoubleRestriction { side: Side },

    #[snafu(display("discontinuous {what} must be restricted"))]
    MustBeRestricted { what: String },

    #[snafu(context(false), display("{source}"))]
    Ir { source: varform_ir::Error },
}

/// Coarse classification of pass failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorClass {
    /// The input uses geometry the lowering rules do not implement.
    UnsupportedGeometry,
    /// A node kind without a rule reached the engine.
    MissingRule,
    /// Restrictions are missing or nested.
    ProtocolViolation,
    /// The operation is meaningless for the given cell or degree.
    DegenerateInput,
    /// Building a rewritten node failed shape or index checks.
    Construction,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PiolaMappedCoordinates { .. }
            | Self::FacetCellCoordinateUnsupported
            | Self::CellNormalUndefined { .. }
            | Self::CellNormalUnsupported { .. }
            | Self::InconsistentDimensions { .. } => ErrorClass::UnsupportedGeometry,
            Self::CircumradiusNonAffine { .. }
            | Self::CircumradiusUnsupportedCell { .. }
            | Self::NoEdges { .. }
            | Self::FacetEdgeLengthDimension { .. } => ErrorClass::DegenerateInput,
            Self::DoubleRestriction { .. } | Self::MustBeRestricted { .. } => ErrorClass::ProtocolViolation,
            Self::Ir { source: varform_ir::Error::MissingRule { .. } } => ErrorClass::MissingRule,
            Self::Ir { .. } => ErrorClass::Construction,
        }
    }
}
