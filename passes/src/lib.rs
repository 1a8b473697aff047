//! Rewriting passes over varform expressions.
//!
//! Both passes are rule sets for the memoized dispatch engine of
//! `varform_ir::rewrite`, applied to each integrand of a form (or to a bare
//! expression):
//!
//! - geometry lowering rewrites high-level geometric quantities into
//!   expressions over the Jacobian and reference-cell primitives;
//! - restriction propagation pushes interior-facet restrictions down to the
//!   terminals they apply to.
//!
//! # Module Organization
//!
//! - [`geometry`] - [`GeometryLowering`] and [`apply_geometry_lowering`]
//! - [`restrict`] - [`RestrictionPropagator`] and [`apply_restrictions`]
//! - [`config`] - Pass configuration with environment fallbacks
//! - [`error`] - Error types and their coarse classification

pub mod config;
pub mod error;
pub mod geometry;
pub mod restrict;


pub use config::{LoweringConfig, PreserveSet, RestrictionConfig, parse_preserve_list};
pub use error::{Error, ErrorClass, Result};
pub use geometry::{GeometryLowering, apply_geometry_lowering, apply_geometry_lowering_with_config, automatic_preserve};
pub use restrict::{Policy, RestrictionPropagator, apply_restrictions, apply_restrictions_with_config};
