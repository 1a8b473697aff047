use snafu::Snafu;

use crate::cell::CellType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A cell cannot be embedded in fewer dimensions than it has.
    #[snafu(display("cannot embed a {cell} cell in {geometric_dimension} dimensions"))]
    GeometricDimensionTooSmall { cell: CellType, geometric_dimension: usize },

    #[snafu(display("embedded subdegree {subdegree} exceeds superdegree {superdegree}"))]
    InvalidDegrees { subdegree: usize, superdegree: usize },
}
