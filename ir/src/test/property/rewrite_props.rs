use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use proptest::prelude::*;

use crate::error::Error;
use crate::op::Operands;
use crate::rewrite::{MemoCaches, Rule, RuleSet, RuleTable, map_expr_dag, map_expr_dag_with_caches};
use crate::test::generators::{arb_domain, arb_scalar_expr, arb_shared_expr};
use crate::Expr;

/// Rebuilds every operator from its operands, counting dispatches.
#[derive(Default)]
struct Identity {
    calls: HashMap<u64, usize>,
}

impl Identity {
    fn terminal(&mut self, node: &Arc<Expr>) -> Result<Arc<Expr>, Error> {
        *self.calls.entry(node.id).or_default() += 1;
        Ok(node.clone())
    }

    fn operator(&mut self, node: &Arc<Expr>, operands: Operands) -> Result<Arc<Expr>, Error> {
        *self.calls.entry(node.id).or_default() += 1;
        node.with_operands(&operands)
    }
}

impl RuleSet for Identity {
    type Error = Error;

    fn rule_table() -> &'static RuleTable<Self> {
        static TABLE: OnceLock<RuleTable<Identity>> = OnceLock::new();
        TABLE.get_or_init(|| {
            RuleTable::new("identity")
                .terminal_fallback(Rule::Cutoff(Self::terminal))
                .operator_fallback(Rule::Post(Self::operator))
        })
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// A rule set that changes nothing hands back the root itself.
    #[test]
    fn identity_returns_root(expr in arb_domain().prop_flat_map(arb_scalar_expr)) {
        let mut rules = Identity::default();
        let result = map_expr_dag(&mut rules, &expr).unwrap();
        prop_assert!(Arc::ptr_eq(&result, &expr));
    }

    /// Every unique node is dispatched exactly once, however often it is shared.
    #[test]
    fn each_node_dispatched_once(expr in arb_domain().prop_flat_map(arb_shared_expr)) {
        let mut rules = Identity::default();
        map_expr_dag(&mut rules, &expr).unwrap();
        prop_assert_eq!(rules.calls.len(), expr.node_count());
        prop_assert!(rules.calls.values().all(|&count| count == 1));
    }

    /// Reused caches make a second pass over the same root dispatch nothing.
    #[test]
    fn cached_second_pass_dispatches_nothing(expr in arb_domain().prop_flat_map(arb_scalar_expr)) {
        let mut caches = MemoCaches::new();
        let mut rules = Identity::default();
        let first = map_expr_dag_with_caches(&mut rules, &expr, &mut caches).unwrap();

        let mut again = Identity::default();
        let second = map_expr_dag_with_caches(&mut again, &expr, &mut caches).unwrap();
        prop_assert!(again.calls.is_empty());
        prop_assert!(Arc::ptr_eq(&first, &second));
    }

    /// A fresh node over the same operation is structurally equal and hashes
    /// the same.
    #[test]
    fn rebuilt_nodes_are_structurally_equal(expr in arb_domain().prop_flat_map(arb_scalar_expr)) {
        let rebuilt = Expr::new(expr.op().clone()).unwrap();
        prop_assert!(!Arc::ptr_eq(&rebuilt, &expr));
        prop_assert!(rebuilt.structurally_eq(&expr));
        prop_assert_eq!(rebuilt.content_hash(), expr.content_hash());
    }
}
