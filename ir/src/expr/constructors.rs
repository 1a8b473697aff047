//! Terminal and operator builders.
//!
//! Terminals are infallible. Operators check shapes and free indices and
//! return [`Result`]; the `try_` prefix marks builders whose failure depends
//! on operand shapes rather than on the node kind alone.
//!
//! - Arithmetic: add, sub, mul, div, pow, neg, abs, sqrt, real, conj, max, min
//! - Tensor algebra: index, as_tensor, index_sum, list_tensor, column
//! - Derivatives and wrappers: grad, reference_grad, reference_value, variable, restricted

use std::sync::Arc;

use smallvec::SmallVec;
use snafu::ensure;
use varform_domain::Domain;

use crate::error::{InvalidProductSnafu, NonScalarOperandSnafu, Result};
use crate::expr::Expr;
use crate::index::{Index, IndexItem, next_label};
use crate::op::{NodeKind, Op, Operands};
use crate::shape::Shape;
use crate::space::FunctionSpace;
use crate::types::{ConstValue, ConstValueHash, GeometricQuantity, Side};

// =========================================================================
// Macro Definitions
// =========================================================================

/// Unary operators that keep shape and free indices.
macro_rules! shape_preserving_ops {
    ($($method:ident => $op:ident),+ $(,)?) => {
        $(
            pub fn $method(self: &Arc<Self>) -> Arc<Self> {
                Self::from_parts(Op::$op(self.clone()), self.shape.clone(), self.free_indices.clone())
            }
        )+
    };
}

/// Binary operators on true scalars.
macro_rules! scalar_binary_ops {
    ($($method:ident => $op:ident),+ $(,)?) => {
        $(
            #[track_caller]
            pub fn $method(self: &Arc<Self>, rhs: &Arc<Self>) -> Result<Arc<Self>> {
                Self::new(Op::$op(self.clone(), rhs.clone()))
            }
        )+
    };
}

// =========================================================================
// Terminals
// =========================================================================

impl Expr {
    /// Geometric quantity of `domain`.
    pub fn geometry(quantity: GeometricQuantity, domain: &Arc<Domain>) -> Arc<Self> {
        let shape = quantity.shape(domain);
        Self::from_parts(Op::Geometry { quantity, domain: domain.clone() }, shape, Default::default())
    }

    pub fn const_(value: ConstValue) -> Arc<Self> {
        Self::from_parts(Op::Const(ConstValueHash(value)), Shape::new(), Default::default())
    }

    pub fn float(value: f64) -> Arc<Self> {
        Self::const_(ConstValue::Float(value))
    }

    pub fn int(value: i64) -> Arc<Self> {
        Self::const_(ConstValue::Int(value))
    }

    /// Zero of the given shape.
    pub fn zero(shape: &[usize]) -> Arc<Self> {
        let shape = Shape::from_slice(shape);
        Self::from_parts(Op::Zero { shape: shape.clone() }, shape, Default::default())
    }

    /// Value constant over `domain`, numbered by `count`.
    pub fn constant(count: usize, domain: &Arc<Domain>, shape: &[usize]) -> Arc<Self> {
        let shape = Shape::from_slice(shape);
        let op = Op::Constant { count, domain: domain.clone(), shape: shape.clone() };
        Self::from_parts(op, shape, Default::default())
    }

    /// Test or trial function `number` of `space`.
    pub fn argument(number: usize, space: &Arc<FunctionSpace>) -> Arc<Self> {
        let shape = space.value_shape().clone();
        Self::from_parts(Op::Argument { number, part: None, space: space.clone() }, shape, Default::default())
    }

    /// Known function `count` of `space`.
    pub fn coefficient(count: usize, space: &Arc<FunctionSpace>) -> Arc<Self> {
        let shape = space.value_shape().clone();
        Self::from_parts(Op::Coefficient { count, space: space.clone() }, shape, Default::default())
    }

    pub fn multi_index<I>(items: I) -> Arc<Self>
    where
        I: IntoIterator,
        I::Item: Into<IndexItem>,
    {
        let items = items.into_iter().map(Into::into).collect();
        Self::from_parts(Op::MultiIndex(items), Shape::new(), Default::default())
    }

    /// Fresh label for a `Variable`.
    pub fn label() -> Arc<Self> {
        Self::from_parts(Op::Label(next_label()), Shape::new(), Default::default())
    }
}

// =========================================================================
// Arithmetic
// =========================================================================

impl Expr {
    shape_preserving_ops! {
        abs => Abs,
        real => Real,
        conj => Conj,
    }

    scalar_binary_ops! {
        try_max => MaxValue,
        try_min => MinValue,
        try_pow => Power,
    }

    /// Elementwise sum; shapes and free indices must agree.
    #[track_caller]
    pub fn try_add(self: &Arc<Self>, rhs: &Arc<Self>) -> Result<Arc<Self>> {
        Self::new(Op::Sum(self.clone(), rhs.clone()))
    }

    #[track_caller]
    pub fn try_sub(self: &Arc<Self>, rhs: &Arc<Self>) -> Result<Arc<Self>> {
        self.try_add(&rhs.neg()?)
    }

    /// `-1 * self`.
    pub fn neg(self: &Arc<Self>) -> Result<Arc<Self>> {
        Self::int(-1).try_mul(self)
    }

    /// Product with implicit summation.
    ///
    /// Scalar operands build a `Product`, wrapped in an `IndexSum` for every
    /// free index both operands carry. When one side is a tensor the product
    /// is taken componentwise through fresh indices and a `ComponentTensor`.
    /// Two tensors cannot be multiplied without explicit indices.
    #[track_caller]
    pub fn try_mul(self: &Arc<Self>, rhs: &Arc<Self>) -> Result<Arc<Self>> {
        match (self.rank(), rhs.rank()) {
            (0, 0) => {
                let repeated: SmallVec<[Index; 2]> = self
                    .free_indices
                    .iter()
                    .filter(|(index, _)| rhs.free_indices.iter().any(|(other, _)| other == index))
                    .map(|(index, _)| *index)
                    .collect();
                let mut product = Self::new(Op::Product(self.clone(), rhs.clone()))?;
                for index in repeated {
                    product = product.index_sum(index)?;
                }
                Ok(product)
            }
            (rank, 0) => {
                let ii = fresh(rank);
                self.try_index(&items(&ii))?.try_mul(rhs)?.as_tensor(&ii)
            }
            (0, rank) => {
                let ii = fresh(rank);
                self.try_mul(&rhs.try_index(&items(&ii))?)?.as_tensor(&ii)
            }
            _ => InvalidProductSnafu { lhs: self.shape.clone(), rhs: rhs.shape.clone() }.fail(),
        }
    }

    /// Division by a scalar; tensor numerators divide componentwise.
    #[track_caller]
    pub fn try_div(self: &Arc<Self>, rhs: &Arc<Self>) -> Result<Arc<Self>> {
        ensure!(rhs.rank() == 0, NonScalarOperandSnafu { op: NodeKind::Division, shape: rhs.shape.clone() });
        if self.rank() == 0 {
            return Self::new(Op::Division(self.clone(), rhs.clone()));
        }
        let ii = fresh(self.rank());
        self.try_index(&items(&ii))?.try_div(rhs)?.as_tensor(&ii)
    }

    #[track_caller]
    pub fn try_sqrt(self: &Arc<Self>) -> Result<Arc<Self>> {
        Self::new(Op::Sqrt(self.clone()))
    }
}

// =========================================================================
// Tensor algebra
// =========================================================================

impl Expr {
    /// Index with one item per axis, giving a scalar.
    #[track_caller]
    pub fn try_index(self: &Arc<Self>, indices: &[IndexItem]) -> Result<Arc<Self>> {
        Self::new(Op::Indexed { expr: self.clone(), indices: Self::multi_index(indices.iter().copied()) })
    }

    /// Fixed component `self[c0, c1, ...]`.
    pub fn component(self: &Arc<Self>, indices: &[usize]) -> Result<Arc<Self>> {
        let items: SmallVec<[IndexItem; 4]> = indices.iter().map(|&i| IndexItem::Fixed(i)).collect();
        self.try_index(&items)
    }

    /// Turn free indices of a scalar into tensor axes, in the given order.
    #[track_caller]
    pub fn as_tensor(self: &Arc<Self>, indices: &[Index]) -> Result<Arc<Self>> {
        if indices.is_empty() {
            return Ok(self.clone());
        }
        Self::new(Op::ComponentTensor { expr: self.clone(), indices: Self::multi_index(indices.iter().copied()) })
    }

    /// Sum over a free index.
    #[track_caller]
    pub fn index_sum(self: &Arc<Self>, index: Index) -> Result<Arc<Self>> {
        Self::new(Op::IndexSum { expr: self.clone(), index: Self::multi_index([index]) })
    }

    /// Stack components along a new leading axis.
    pub fn list_tensor(components: impl IntoIterator<Item = Arc<Self>>) -> Result<Arc<Self>> {
        let components: Operands = components.into_iter().collect();
        Self::new(Op::ListTensor { components })
    }

    /// Column `j` of a matrix as a vector.
    pub fn column(self: &Arc<Self>, j: usize) -> Result<Arc<Self>> {
        let i = Index::new();
        self.try_index(&[i.into(), j.into()])?.as_tensor(&[i])
    }

    /// Row `r` of a matrix as a vector.
    pub fn row(self: &Arc<Self>, r: usize) -> Result<Arc<Self>> {
        let j = Index::new();
        self.try_index(&[r.into(), j.into()])?.as_tensor(&[j])
    }
}

// =========================================================================
// Derivatives and wrappers
// =========================================================================

impl Expr {
    /// Gradient in physical coordinates.
    pub fn try_grad(self: &Arc<Self>) -> Result<Arc<Self>> {
        Self::new(Op::Grad(self.clone()))
    }

    /// Gradient in reference coordinates.
    pub fn try_reference_grad(self: &Arc<Self>) -> Result<Arc<Self>> {
        Self::new(Op::ReferenceGrad(self.clone()))
    }

    /// Reference value of a form argument.
    pub fn try_reference_value(self: &Arc<Self>) -> Result<Arc<Self>> {
        Self::new(Op::ReferenceValue(self.clone()))
    }

    /// Name `self` with `label` so it can be differentiated against.
    pub fn variable(self: &Arc<Self>, label: &Arc<Self>) -> Result<Arc<Self>> {
        Self::new(Op::Variable { expr: self.clone(), label: label.clone() })
    }

    /// Evaluate on one side of an interior facet.
    pub fn restricted(self: &Arc<Self>, side: Side) -> Arc<Self> {
        Self::from_parts(Op::Restricted { expr: self.clone(), side }, self.shape.clone(), self.free_indices.clone())
    }
}

fn fresh(rank: usize) -> SmallVec<[Index; 4]> {
    (0..rank).map(|_| Index::new()).collect()
}

fn items(indices: &[Index]) -> SmallVec<[IndexItem; 4]> {
    indices.iter().map(|&i| IndexItem::Free(i)).collect()
}
