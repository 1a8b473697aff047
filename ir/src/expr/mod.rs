//! The expression DAG node and its constructors.
//!
//! - [`core`] - [`Expr`] struct, identity keys, traversal and structural comparison
//! - [`constructors`] - terminal and operator builders with shape checking
//! - [`display`] - one-line infix rendering
//! - [`tree`] - ASCII tree rendering through `ptree`

pub mod constructors;
pub mod core;
pub mod display;
pub mod tree;

pub use core::{Expr, ExprKey};
