use snafu::Snafu;

use crate::index::Index;
use crate::op::NodeKind;
use crate::shape::Shape;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Operands of an elementwise operation disagree in shape.
    #[snafu(display("shape mismatch in {op}: {lhs:?} vs {rhs:?}"))]
    ShapeMismatch { op: NodeKind, lhs: Shape, rhs: Shape },

    /// Operands of a sum carry different free indices.
    #[snafu(display("free index mismatch in {op}"))]
    FreeIndexMismatch { op: NodeKind },

    /// The same free index is bound to two different dimensions.
    #[snafu(display("index {index} used with dimensions {lhs} and {rhs}"))]
    IndexDimensionMismatch { index: Index, lhs: usize, rhs: usize },

    #[snafu(display("{op} expects scalar operands, got shape {shape:?}"))]
    NonScalarOperand { op: NodeKind, shape: Shape },

    #[snafu(display("{op} does not accept operands with free indices"))]
    FreeIndicesNotAllowed { op: NodeKind },

    /// Product of two non-scalar tensors without explicit indices.
    #[snafu(display("cannot multiply tensors of shapes {lhs:?} and {rhs:?} without indices"))]
    InvalidProduct { lhs: Shape, rhs: Shape },

    #[snafu(display("indexing a rank {rank} tensor with {indices} indices"))]
    RankMismatch { rank: usize, indices: usize },

    #[snafu(display("fixed index {index} out of bounds for dimension {dim}"))]
    IndexOutOfBounds { index: usize, dim: usize },

    /// A free index appears twice where it cannot be contracted.
    #[snafu(display("index {index} repeated"))]
    RepeatedIndex { index: Index },

    /// `ComponentTensor`/`IndexSum` over an index the operand does not carry.
    #[snafu(display("index {index} is not free in the operand"))]
    IndexNotFree { index: Index },

    #[snafu(display("{op} expects free indices only"))]
    FixedIndexNotAllowed { op: NodeKind },

    #[snafu(display("expected a {expected} operand, found {found}"))]
    UnexpectedOperandKind { expected: NodeKind, found: NodeKind },

    #[snafu(display("list tensor needs at least one component"))]
    EmptyListTensor,

    /// Derivatives need a domain to take their dimension from.
    #[snafu(display("{op} of an expression without a domain"))]
    NoDomain { op: NodeKind },

    #[snafu(display("expression spans several domains"))]
    MultipleDomains,

    #[snafu(display("reference value of {found}, expected a form argument"))]
    ReferenceValueOfNonFormArgument { found: NodeKind },

    /// Reconstruction was given the wrong number of operands.
    #[snafu(display("{kind} takes {expected} operands, got {actual}"))]
    OperandCount { kind: NodeKind, expected: usize, actual: usize },

    #[snafu(display("expected a matrix, got shape {shape:?}"))]
    NotAMatrix { shape: Shape },

    /// Determinants and inverses need at least as many rows as columns.
    #[snafu(display("matrix of shape {shape:?} has more columns than rows"))]
    WideMatrix { shape: Shape },

    #[snafu(display("cross product needs two 3-vectors, got {lhs:?} and {rhs:?}"))]
    CrossProductShape { lhs: Shape, rhs: Shape },

    /// Integrands must be true scalars.
    #[snafu(display("integrand must be scalar without free indices, got shape {shape:?}"))]
    NonScalarIntegrand { shape: Shape },

    /// An operand reached its parent without a result in the value cache.
    #[snafu(display("operand {operand} of {kind} has no mapped result"))]
    UnmappedOperand { kind: NodeKind, operand: u64 },

    /// The rule table has no entry and no fallback for a node kind.
    #[snafu(display("no rule for {kind} in {table}"))]
    MissingRule { kind: NodeKind, table: &'static str },
}
