//! Rule-driven DAG transformation with memoization.
//!
//! A rule set implements [`RuleSet`] and exposes a [`RuleTable`]; the engine
//! walks an expression DAG post-order and dispatches each unique node once.

pub mod engine;
pub mod rules;

pub use engine::{MemoCaches, map_expr_dag, map_expr_dag_with_caches, map_expr_dags, reuse_if_untouched};
pub use rules::{CutoffHandler, PostHandler, Rule, RuleSet, RuleTable};
