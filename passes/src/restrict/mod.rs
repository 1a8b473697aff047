//! Restriction propagation.
//!
//! On interior facets every discontinuous quantity must be evaluated on one
//! of the two adjacent cells. Users restrict whole subexpressions; this pass
//! pushes each restriction down to the terminals below it, so that only
//! terminals (and gradients of form arguments) end up wrapped in
//! `Restricted`.
//!
//! A top-level [`RestrictionPropagator`] has no side. On reaching a
//! `Restricted` node it hands the operand to a child propagator bound to
//! that side, together with the child's own memo caches. The caches of the
//! two sides are kept apart and live as long as the top-level propagator, so
//! a subtree shared between both sides is transformed once per side.

mod policy;

pub use policy::{Policy, policy};

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use snafu::OptionExt;
use varform_ir::error::{MissingRuleSnafu, OperandCountSnafu};
use varform_ir::rewrite::{MemoCaches, Rule, RuleSet, RuleTable, map_expr_dag, map_expr_dag_with_caches};
use varform_ir::{Expr, MapIntegrands, NodeKind, Op, Operands, Side};

use crate::config::RestrictionConfig;
use crate::error::{DoubleRestrictionSnafu, Error, MustBeRestrictedSnafu, Result};

/// Propagator bound to one side, with the caches it fills.
#[derive(Debug)]
struct SideScope {
    propagator: RestrictionPropagator,
    caches: MemoCaches,
}

/// Rule set pushing restrictions down to terminals.
#[derive(Debug)]
pub struct RestrictionPropagator {
    side: Option<Side>,
    config: RestrictionConfig,
    scopes: HashMap<Side, SideScope>,
}

impl RestrictionPropagator {
    /// Top-level propagator, outside any restriction.
    pub fn new(config: RestrictionConfig) -> Self {
        Self { side: None, config, scopes: HashMap::new() }
    }

    /// Propagator for the inside of a `Restricted` node.
    pub fn for_side(side: Side, config: RestrictionConfig) -> Self {
        Self { side: Some(side), config, scopes: HashMap::new() }
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    /// Restrict `node` according to `policy`.
    pub fn apply_policy(&self, policy: Policy, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        match (policy, self.side) {
            (Policy::Ignore, _) => Ok(node.clone()),
            (Policy::Require | Policy::Opposite, None) => MustBeRestrictedSnafu { what: describe(node) }.fail(),
            (Policy::Require | Policy::Default, Some(side)) => Ok(node.restricted(side)),
            (Policy::Default, None) if self.config.use_default_side => Ok(node.restricted(self.config.default_side)),
            (Policy::Default, None) => Ok(node.clone()),
            (Policy::Opposite, Some(side)) => {
                let restricted = node.restricted(self.config.default_side);
                if side == self.config.default_side { Ok(restricted) } else { Ok(restricted.neg()?) }
            }
        }
    }

    fn terminal(&mut self, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        let kind = node.kind();
        let policy = policy(node).context(MissingRuleSnafu { kind, table: Self::rule_table().name() })?;
        self.apply_policy(policy, node)
    }

    fn restricted(&mut self, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        let Op::Restricted { expr, side } = node.op() else {
            return Ok(node.clone());
        };
        if let Some(current) = self.side {
            return DoubleRestrictionSnafu { side: current }.fail();
        }

        let config = self.config;
        let scope = self.scopes.entry(*side).or_insert_with(|| {
            tracing::debug!(%side, "opening restriction scope");
            SideScope { propagator: Self::for_side(*side, config), caches: MemoCaches::new() }
        });
        let result = map_expr_dag_with_caches(&mut scope.propagator, expr, &mut scope.caches)?;
        Ok(if result.structurally_eq(node) { node.clone() } else { result })
    }

    /// Reference values follow the restriction of the form argument inside.
    fn reference_value(&mut self, node: &Arc<Expr>) -> Result<Arc<Expr>> {
        let Op::ReferenceValue(argument) = node.op() else {
            return Ok(node.clone());
        };
        match self.terminal(argument)?.op() {
            Op::Restricted { side, .. } => Ok(node.restricted(*side)),
            _ => Ok(node.clone()),
        }
    }

    /// Variables are stripped, keeping the labelled expression.
    fn variable(&mut self, _node: &Arc<Expr>, operands: Operands) -> Result<Arc<Expr>> {
        let expr = operands.first().cloned().context(OperandCountSnafu {
            kind: NodeKind::Variable,
            expected: 2usize,
            actual: operands.len(),
        })?;
        Ok(expr)
    }
}

/// Name of a terminal in error messages, `FacetNormal` or `Argument`.
fn describe(node: &Expr) -> String {
    match node.geometric_quantity() {
        Some(quantity) => format!("{quantity:?}"),
        None => node.kind().to_string(),
    }
}

impl RuleSet for RestrictionPropagator {
    type Error = Error;

    fn rule_table() -> &'static RuleTable<Self> {
        static TABLE: OnceLock<RuleTable<RestrictionPropagator>> = OnceLock::new();
        TABLE.get_or_init(|| {
            tracing::debug!("building restriction rule table");
            RuleTable::new("restriction-propagation")
                .on_all(
                    [
                        NodeKind::Geometry,
                        NodeKind::Const,
                        NodeKind::Zero,
                        NodeKind::Constant,
                        NodeKind::Argument,
                        NodeKind::Coefficient,
                        NodeKind::MultiIndex,
                        NodeKind::Label,
                        NodeKind::Grad,
                    ],
                    Rule::Cutoff(Self::terminal),
                )
                .on(NodeKind::Restricted, Rule::Cutoff(Self::restricted))
                .on(NodeKind::ReferenceValue, Rule::Cutoff(Self::reference_value))
                .on(NodeKind::Variable, Rule::Post(Self::variable))
                .operator_fallback(Rule::ReuseIfUntouched)
        })
    }
}

/// Propagate restrictions in a form, an integral or an expression.
///
/// Within forms only interior-facet integrals are processed; other
/// integrals come back unchanged. A bare expression is always processed.
pub fn apply_restrictions<T: MapIntegrands>(target: &T, use_default_side: bool) -> Result<T> {
    apply_restrictions_with_config(target, &RestrictionConfig::builder().use_default_side(use_default_side).build())
}

#[tracing::instrument(skip_all, fields(use_default_side = config.use_default_side))]
pub fn apply_restrictions_with_config<T: MapIntegrands>(target: &T, config: &RestrictionConfig) -> Result<T> {
    let mut rules = RestrictionPropagator::new(*config);
    target.try_map_integrands(|integrand, integral| {
        if let Some(integral) = integral
            && !integral.integral_type().is_interior_facet()
        {
            tracing::debug!(integral_type = %integral.integral_type(), "not an interior facet integral, skipping");
            return Ok(integrand.clone());
        }
        map_expr_dag(&mut rules, integrand)
    })
}
