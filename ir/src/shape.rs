//! Shape and free-index inference.
//!
//! Every node's shape and free indices are fixed when it is built. Inference
//! runs once per construction (including reconstruction with new operands) and
//! rejects operand combinations the node kind does not accept.

use std::sync::Arc;

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::error::*;
use crate::expr::Expr;
use crate::index::{FreeIndices, IndexItem, IndexItems, free_dim, merge_free, remove_free};
use crate::op::{NodeKind, Op};

/// Tensor dimensions. Scalars have the empty shape.
pub type Shape = SmallVec<[usize; 4]>;

/// Shape and free indices of a node built from `op`.
pub fn infer(op: &Op) -> Result<(Shape, FreeIndices)> {
    let kind = op.kind();
    match op {
        Op::Geometry { quantity, domain } => Ok((quantity.shape(domain), FreeIndices::new())),
        Op::Const(_) | Op::Label(_) | Op::MultiIndex(_) => Ok((Shape::new(), FreeIndices::new())),
        Op::Zero { shape } | Op::Constant { shape, .. } => Ok((shape.clone(), FreeIndices::new())),
        Op::Argument { space, .. } | Op::Coefficient { space, .. } => {
            Ok((space.value_shape().clone(), FreeIndices::new()))
        }

        Op::Sum(a, b) => {
            ensure!(a.shape == b.shape, ShapeMismatchSnafu { op: kind, lhs: a.shape.clone(), rhs: b.shape.clone() });
            ensure!(a.free_indices == b.free_indices, FreeIndexMismatchSnafu { op: kind });
            Ok((a.shape.clone(), a.free_indices.clone()))
        }
        Op::Product(a, b) | Op::Division(a, b) => {
            scalar(kind, a)?;
            scalar(kind, b)?;
            let (free, _) = merge_free(&a.free_indices, &b.free_indices)?;
            Ok((Shape::new(), free))
        }
        Op::Power(base, exponent) => {
            scalar(kind, base)?;
            true_scalar(kind, exponent)?;
            Ok((Shape::new(), base.free_indices.clone()))
        }
        Op::MaxValue(a, b) | Op::MinValue(a, b) => {
            true_scalar(kind, a)?;
            true_scalar(kind, b)?;
            Ok((Shape::new(), FreeIndices::new()))
        }
        Op::Sqrt(x) => {
            scalar(kind, x)?;
            Ok((Shape::new(), x.free_indices.clone()))
        }
        Op::Abs(x) | Op::Real(x) | Op::Conj(x) | Op::Restricted { expr: x, .. } => {
            Ok((x.shape.clone(), x.free_indices.clone()))
        }

        Op::Indexed { expr, indices } => {
            let items = multi_index_items(indices)?;
            ensure!(
                items.len() == expr.shape.len(),
                RankMismatchSnafu { rank: expr.shape.len(), indices: items.len() }
            );
            let mut added = FreeIndices::new();
            for (item, &dim) in items.iter().zip(expr.shape.iter()) {
                match *item {
                    IndexItem::Fixed(index) => ensure!(index < dim, IndexOutOfBoundsSnafu { index, dim }),
                    IndexItem::Free(index) => {
                        ensure!(free_dim(&added, index).is_none(), RepeatedIndexSnafu { index });
                        let pos = added.partition_point(|(i, _)| *i < index);
                        added.insert(pos, (index, dim));
                    }
                }
            }
            let (free, shared) = merge_free(&expr.free_indices, &added)?;
            if let Some(&index) = shared.first() {
                return RepeatedIndexSnafu { index }.fail();
            }
            Ok((Shape::new(), free))
        }
        Op::ComponentTensor { expr, indices } => {
            scalar(kind, expr)?;
            let items = multi_index_items(indices)?;
            let mut shape = Shape::new();
            let mut free = expr.free_indices.clone();
            for item in items {
                let index = item.as_free().context(FixedIndexNotAllowedSnafu { op: kind })?;
                let dim = free_dim(&free, index).context(IndexNotFreeSnafu { index })?;
                shape.push(dim);
                free = remove_free(&free, index);
            }
            Ok((shape, free))
        }
        Op::IndexSum { expr, index } => {
            let items = multi_index_items(index)?;
            ensure!(items.len() == 1, RankMismatchSnafu { rank: 1usize, indices: items.len() });
            let index = items[0].as_free().context(FixedIndexNotAllowedSnafu { op: kind })?;
            free_dim(&expr.free_indices, index).context(IndexNotFreeSnafu { index })?;
            Ok((expr.shape.clone(), remove_free(&expr.free_indices, index)))
        }
        Op::ListTensor { components } => {
            let first = components.first().context(EmptyListTensorSnafu)?;
            for component in components.iter().skip(1) {
                ensure!(
                    component.shape == first.shape,
                    ShapeMismatchSnafu { op: kind, lhs: first.shape.clone(), rhs: component.shape.clone() }
                );
                ensure!(component.free_indices == first.free_indices, FreeIndexMismatchSnafu { op: kind });
            }
            let mut shape = Shape::new();
            shape.push(components.len());
            shape.extend_from_slice(&first.shape);
            Ok((shape, first.free_indices.clone()))
        }

        Op::Grad(f) | Op::ReferenceGrad(f) => {
            let domain = f.unique_domain()?.context(NoDomainSnafu { op: kind })?;
            let dim = match kind {
                NodeKind::Grad => domain.geometric_dimension(),
                _ => domain.topological_dimension(),
            };
            let mut shape = f.shape.clone();
            shape.push(dim);
            Ok((shape, f.free_indices.clone()))
        }
        Op::ReferenceValue(f) => {
            let found = f.kind();
            ensure!(found.is_form_argument(), ReferenceValueOfNonFormArgumentSnafu { found });
            Ok((f.shape.clone(), FreeIndices::new()))
        }
        Op::Variable { expr, label } => {
            ensure!(
                label.kind() == NodeKind::Label,
                UnexpectedOperandKindSnafu { expected: NodeKind::Label, found: label.kind() }
            );
            Ok((expr.shape.clone(), expr.free_indices.clone()))
        }
    }
}

/// Items of a `MultiIndex` operand.
pub(crate) fn multi_index_items(node: &Arc<Expr>) -> Result<&IndexItems> {
    match node.op() {
        Op::MultiIndex(items) => Ok(items),
        other => UnexpectedOperandKindSnafu { expected: NodeKind::MultiIndex, found: other.kind() }.fail(),
    }
}

fn scalar(op: NodeKind, operand: &Arc<Expr>) -> Result<()> {
    ensure!(operand.shape.is_empty(), NonScalarOperandSnafu { op, shape: operand.shape.clone() });
    Ok(())
}

fn true_scalar(op: NodeKind, operand: &Arc<Expr>) -> Result<()> {
    scalar(op, operand)?;
    ensure!(operand.free_indices.is_empty(), FreeIndicesNotAllowedSnafu { op });
    Ok(())
}
