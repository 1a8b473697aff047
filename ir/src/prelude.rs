//! Common imports for building and rewriting expressions.
//!
//! ```rust,ignore
//! use varform_ir::prelude::*;
//! ```

pub use crate::compound::{cross_expr, determinant_expr, inverse_expr};
pub use crate::expr::{Expr, ExprKey};
pub use crate::form::{Form, Integral, IntegralType, MapIntegrands};
pub use crate::index::{Index, IndexItem, indices};
pub use crate::op::{NodeKind, Op, Operands};
pub use crate::rewrite::{MemoCaches, Rule, RuleSet, RuleTable, map_expr_dag, map_expr_dag_with_caches};
pub use crate::space::FunctionSpace;
pub use crate::types::{ConstValue, GeometricQuantity, Side};

pub use varform_domain::{CellType, Domain};
