//! Coordinate element metadata.
//!
//! Only the properties the rewriting passes query are modelled: embedded
//! polynomial degrees, the pullback convention and the Sobolev space the
//! element conforms to.

use bon::bon;
use snafu::ensure;

use crate::cell::CellType;
use crate::error::{GeometricDimensionTooSmallSnafu, InvalidDegreesSnafu, Result};

/// Sobolev space an element conforms to.
///
/// Containment follows `HInf ⊂ H2 ⊂ H1 ⊂ {HDiv, HCurl} ⊂ L2`.
#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::AsRefStr, strum::Display)]
#[derive(enumset::EnumSetType)]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
pub enum SobolevSpace {
    L2,
    HDiv,
    HCurl,
    H1,
    H2,
    HInf,
}

impl SobolevSpace {
    const fn smoothness(&self) -> u8 {
        match self {
            Self::L2 => 0,
            Self::HDiv | Self::HCurl => 1,
            Self::H1 => 2,
            Self::H2 => 3,
            Self::HInf => 4,
        }
    }

    /// Whether every function in `self` also lies in `other`.
    pub fn is_subspace_of(&self, other: SobolevSpace) -> bool {
        if *self == other {
            return true;
        }
        match (self, other) {
            (Self::HDiv, Self::HCurl) | (Self::HCurl, Self::HDiv) => false,
            _ => self.smoothness() > other.smoothness(),
        }
    }

    /// Shorthand for "continuous across facets".
    pub fn is_h1_conforming(&self) -> bool {
        self.is_subspace_of(Self::H1)
    }
}

/// Map from reference values to physical values.
#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(strum::EnumIter, strum::AsRefStr, strum::Display)]
#[derive(enumset::EnumSetType)]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
#[strum(serialize_all = "snake_case")]
pub enum Pullback {
    Identity,
    CovariantPiola,
    ContravariantPiola,
    DoubleCovariantPiola,
    DoubleContravariantPiola,
    L2Piola,
}

impl Pullback {
    pub const fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }
}

/// Vector-valued element describing the coordinate field of a mesh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoordinateElement {
    cell: CellType,
    geometric_dimension: usize,
    embedded_subdegree: usize,
    embedded_superdegree: usize,
    pullback: Pullback,
    sobolev_space: SobolevSpace,
}

#[bon]
impl CoordinateElement {
    /// Build an element from explicit metadata.
    ///
    /// Fails when the geometric dimension is smaller than the cell's
    /// topological dimension or the subdegree exceeds the superdegree.
    #[builder]
    pub fn new(
        cell: CellType,
        geometric_dimension: usize,
        #[builder(default = 1)] embedded_subdegree: usize,
        embedded_superdegree: Option<usize>,
        #[builder(default = Pullback::Identity)] pullback: Pullback,
        #[builder(default = SobolevSpace::H1)] sobolev_space: SobolevSpace,
    ) -> Result<Self> {
        let tdim = cell.topological_dimension();
        ensure!(geometric_dimension >= tdim, GeometricDimensionTooSmallSnafu { cell, geometric_dimension });
        let embedded_superdegree = embedded_superdegree.unwrap_or(embedded_subdegree);
        ensure!(
            embedded_subdegree <= embedded_superdegree,
            InvalidDegreesSnafu { subdegree: embedded_subdegree, superdegree: embedded_superdegree }
        );

        Ok(Self { cell, geometric_dimension, embedded_subdegree, embedded_superdegree, pullback, sobolev_space })
    }
}

impl CoordinateElement {
    /// Continuous Lagrange (P_k on simplices, Q_k on tensor-product cells).
    ///
    /// A Q_k element contains all monomials up to total degree `k * tdim`,
    /// which is its embedded superdegree.
    pub fn lagrange(cell: CellType, degree: usize, geometric_dimension: usize) -> Result<Self> {
        let superdegree = if cell.is_simplex() { degree } else { degree * cell.topological_dimension().max(1) };
        Self::builder()
            .cell(cell)
            .geometric_dimension(geometric_dimension)
            .embedded_subdegree(degree)
            .embedded_superdegree(superdegree)
            .build()
    }

    /// P1/Q1 coordinates embedded in the cell's own dimension.
    pub fn linear(cell: CellType) -> Self {
        let tdim = cell.topological_dimension();
        Self {
            cell,
            geometric_dimension: tdim,
            embedded_subdegree: 1,
            embedded_superdegree: if cell.is_simplex() { 1 } else { tdim },
            pullback: Pullback::Identity,
            sobolev_space: SobolevSpace::H1,
        }
    }

    pub fn cell(&self) -> CellType {
        self.cell
    }

    pub fn geometric_dimension(&self) -> usize {
        self.geometric_dimension
    }

    /// Highest degree such that all polynomials of that degree are spanned.
    pub fn embedded_subdegree(&self) -> usize {
        self.embedded_subdegree
    }

    /// Lowest degree such that the element is contained in that polynomial space.
    pub fn embedded_superdegree(&self) -> usize {
        self.embedded_superdegree
    }

    pub fn pullback(&self) -> Pullback {
        self.pullback
    }

    pub fn sobolev_space(&self) -> SobolevSpace {
        self.sobolev_space
    }
}
