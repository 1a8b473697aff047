//! Node vocabulary of the expression DAG.
//!
//! [`Op`] encodes each node kind with its operands inline. Terminals carry
//! payload only; operators hold their operands as `Arc<Expr>`. The derived
//! [`NodeKind`] is the closed, payload-free discriminant used for rule
//! dispatch.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;
use snafu::ensure;
use strum::{AsRefStr, Display, EnumCount, EnumDiscriminants, EnumIter};
use varform_domain::Domain;

use crate::error::{OperandCountSnafu, Result};
use crate::expr::Expr;
use crate::index::IndexItems;
use crate::shape::Shape;
use crate::space::FunctionSpace;
use crate::types::{ConstValueHash, GeometricQuantity, Side};

pub type Operands = SmallVec<[Arc<Expr>; 4]>;

/// Operation with typed operands.
///
/// `Indexed`, `ComponentTensor` and `IndexSum` take their indices as a
/// `MultiIndex` operand, `Variable` takes a `Label` operand, so every piece of
/// an expression is itself a node the rewriting engine can visit.
///
/// PartialEq and Hash are not derived: identity lives on [`Expr::id`], and
/// structural comparison goes through [`Expr::structurally_eq`].
#[derive(Debug, Clone, EnumDiscriminants)]
#[strum_discriminants(name(NodeKind))]
#[strum_discriminants(derive(Hash, PartialOrd, Ord, EnumIter, EnumCount, AsRefStr, Display))]
pub enum Op {
    // Terminals
    Geometry { quantity: GeometricQuantity, domain: Arc<Domain> },
    Const(ConstValueHash),
    Zero { shape: Shape },
    Constant { count: usize, domain: Arc<Domain>, shape: Shape },
    Argument { number: usize, part: Option<usize>, space: Arc<FunctionSpace> },
    Coefficient { count: usize, space: Arc<FunctionSpace> },
    MultiIndex(IndexItems),
    Label(u64),

    // Algebra
    Sum(Arc<Expr>, Arc<Expr>),
    Product(Arc<Expr>, Arc<Expr>),
    Division(Arc<Expr>, Arc<Expr>),
    Power(Arc<Expr>, Arc<Expr>),
    Abs(Arc<Expr>),
    Sqrt(Arc<Expr>),
    Real(Arc<Expr>),
    Conj(Arc<Expr>),
    MaxValue(Arc<Expr>, Arc<Expr>),
    MinValue(Arc<Expr>, Arc<Expr>),

    // Tensor algebra
    Indexed { expr: Arc<Expr>, indices: Arc<Expr> },
    ComponentTensor { expr: Arc<Expr>, indices: Arc<Expr> },
    IndexSum { expr: Arc<Expr>, index: Arc<Expr> },
    ListTensor { components: Operands },

    // Derivatives and wrappers
    Grad(Arc<Expr>),
    ReferenceGrad(Arc<Expr>),
    ReferenceValue(Arc<Expr>),
    Variable { expr: Arc<Expr>, label: Arc<Expr> },
    Restricted { expr: Arc<Expr>, side: Side },
}

impl NodeKind {
    /// Terminals carry no operands.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Geometry
                | Self::Const
                | Self::Zero
                | Self::Constant
                | Self::Argument
                | Self::Coefficient
                | Self::MultiIndex
                | Self::Label
        )
    }

    /// Terminals standing for a function of a finite-element space.
    pub const fn is_form_argument(&self) -> bool {
        matches!(self, Self::Argument | Self::Coefficient)
    }
}

impl Op {
    pub fn kind(&self) -> NodeKind {
        NodeKind::from(self)
    }

    /// Operands in order.
    pub fn children(&self) -> SmallVec<[&Arc<Expr>; 4]> {
        match self {
            Self::Geometry { .. }
            | Self::Const(_)
            | Self::Zero { .. }
            | Self::Constant { .. }
            | Self::Argument { .. }
            | Self::Coefficient { .. }
            | Self::MultiIndex(_)
            | Self::Label(_) => SmallVec::new(),

            Self::Abs(x)
            | Self::Sqrt(x)
            | Self::Real(x)
            | Self::Conj(x)
            | Self::Grad(x)
            | Self::ReferenceGrad(x)
            | Self::ReferenceValue(x)
            | Self::Restricted { expr: x, .. } => SmallVec::from_slice(&[x]),

            Self::Sum(a, b)
            | Self::Product(a, b)
            | Self::Division(a, b)
            | Self::Power(a, b)
            | Self::MaxValue(a, b)
            | Self::MinValue(a, b)
            | Self::Indexed { expr: a, indices: b }
            | Self::ComponentTensor { expr: a, indices: b }
            | Self::IndexSum { expr: a, index: b }
            | Self::Variable { expr: a, label: b } => SmallVec::from_slice(&[a, b]),

            Self::ListTensor { components } => components.iter().collect(),
        }
    }

    /// Same node kind and payload with `operands` substituted.
    ///
    /// Fails when the operand count does not match the kind's arity.
    pub fn with_operands(&self, operands: &[Arc<Expr>]) -> Result<Op> {
        let kind = self.kind();
        if let Self::ListTensor { .. } = self {
            return Ok(Self::ListTensor { components: operands.iter().cloned().collect() });
        }
        let expected = self.children().len();
        ensure!(operands.len() == expected, OperandCountSnafu { kind, expected, actual: operands.len() });

        let a = || operands[0].clone();
        let b = || operands[1].clone();
        Ok(match self {
            Self::Geometry { .. }
            | Self::Const(_)
            | Self::Zero { .. }
            | Self::Constant { .. }
            | Self::Argument { .. }
            | Self::Coefficient { .. }
            | Self::MultiIndex(_)
            | Self::Label(_)
            | Self::ListTensor { .. } => self.clone(),
            Self::Sum(..) => Self::Sum(a(), b()),
            Self::Product(..) => Self::Product(a(), b()),
            Self::Division(..) => Self::Division(a(), b()),
            Self::Power(..) => Self::Power(a(), b()),
            Self::MaxValue(..) => Self::MaxValue(a(), b()),
            Self::MinValue(..) => Self::MinValue(a(), b()),
            Self::Abs(_) => Self::Abs(a()),
            Self::Sqrt(_) => Self::Sqrt(a()),
            Self::Real(_) => Self::Real(a()),
            Self::Conj(_) => Self::Conj(a()),
            Self::Grad(_) => Self::Grad(a()),
            Self::ReferenceGrad(_) => Self::ReferenceGrad(a()),
            Self::ReferenceValue(_) => Self::ReferenceValue(a()),
            Self::Indexed { .. } => Self::Indexed { expr: a(), indices: b() },
            Self::ComponentTensor { .. } => Self::ComponentTensor { expr: a(), indices: b() },
            Self::IndexSum { .. } => Self::IndexSum { expr: a(), index: b() },
            Self::Variable { .. } => Self::Variable { expr: a(), label: b() },
            Self::Restricted { side, .. } => Self::Restricted { expr: a(), side: *side },
        })
    }

    /// Hash the kind and the non-operand payload.
    pub(crate) fn hash_payload<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Self::Geometry { quantity, domain } => {
                quantity.hash(state);
                domain.hash(state);
            }
            Self::Const(value) => value.hash(state),
            Self::Zero { shape } => shape.hash(state),
            Self::Constant { count, domain, shape } => {
                count.hash(state);
                domain.hash(state);
                shape.hash(state);
            }
            Self::Argument { number, part, space } => {
                number.hash(state);
                part.hash(state);
                space.hash(state);
            }
            Self::Coefficient { count, space } => {
                count.hash(state);
                space.hash(state);
            }
            Self::MultiIndex(items) => items.hash(state),
            Self::Label(label) => label.hash(state),
            Self::Restricted { side, .. } => side.hash(state),
            Self::ListTensor { components } => components.len().hash(state),
            _ => {}
        }
    }

    /// Whether kind and non-operand payload agree.
    pub(crate) fn payload_eq(&self, other: &Op) -> bool {
        match (self, other) {
            (Self::Geometry { quantity: qa, domain: da }, Self::Geometry { quantity: qb, domain: db }) => {
                qa == qb && da == db
            }
            (Self::Const(a), Self::Const(b)) => a == b,
            (Self::Zero { shape: a }, Self::Zero { shape: b }) => a == b,
            (
                Self::Constant { count: ca, domain: da, shape: sa },
                Self::Constant { count: cb, domain: db, shape: sb },
            ) => ca == cb && da == db && sa == sb,
            (
                Self::Argument { number: na, part: pa, space: sa },
                Self::Argument { number: nb, part: pb, space: sb },
            ) => na == nb && pa == pb && sa == sb,
            (Self::Coefficient { count: ca, space: sa }, Self::Coefficient { count: cb, space: sb }) => {
                ca == cb && sa == sb
            }
            (Self::MultiIndex(a), Self::MultiIndex(b)) => a == b,
            (Self::Label(a), Self::Label(b)) => a == b,
            (Self::Restricted { side: a, .. }, Self::Restricted { side: b, .. }) => a == b,
            (Self::ListTensor { components: a }, Self::ListTensor { components: b }) => a.len() == b.len(),
            _ => self.kind() == other.kind() && !self.kind().is_terminal(),
        }
    }
}
