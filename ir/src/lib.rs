//! Expression DAG and rewriting engine for variational forms.
//!
//! Expressions are immutable, `Arc`-shared nodes with a shape and a set of
//! free indices fixed at construction. Passes transform them through rule
//! tables keyed by node kind, with every unique node dispatched once.
//!
//! # Module Organization
//!
//! - [`types`] - Geometric quantities, facet sides and literal values
//! - [`op`] - [`Op`] node vocabulary and its [`NodeKind`] discriminant
//! - [`expr`] - [`Expr`] struct, constructors and rendering
//! - [`index`] - Free and fixed indices
//! - [`shape`] - Shape and free-index inference
//! - [`space`] - Function spaces of form arguments
//! - [`compound`] - Cross product, determinant and inverse builders
//! - [`form`] - Integrals, forms and the [`MapIntegrands`] trait
//! - [`rewrite`] - Rule tables and the memoized dispatch engine
//! - [`error`] - Error types and result handling

pub mod compound;
pub mod error;
pub mod expr;
pub mod form;
pub mod index;
pub mod op;
pub mod prelude;
pub mod rewrite;
pub mod shape;
pub mod space;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod test;

pub use error::{Error, Result};
pub use expr::{Expr, ExprKey};
pub use form::{Form, Integral, IntegralType, MapIntegrands, SubdomainId};
pub use index::{Index, IndexItem, indices};
pub use op::{NodeKind, Op, Operands};
pub use shape::Shape;
pub use space::FunctionSpace;
pub use types::{ConstValue, ConstValueHash, GeometricQuantity, Side};

pub use varform_domain::{CellType, Domain};
