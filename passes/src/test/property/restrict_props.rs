use std::sync::Arc;

use proptest::prelude::*;
use varform_ir::test::generators::{arb_domain, arb_scalar_expr};
use varform_ir::{Expr, NodeKind, Op, Side};

use crate::restrict::apply_restrictions;
use crate::test::helpers::nodes_of_kind;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Propagating twice gives the same expression as propagating once.
    #[test]
    fn propagation_is_idempotent(
        expr in arb_domain().prop_flat_map(arb_scalar_expr),
        side in any::<Side>(),
    ) {
        let once = apply_restrictions(&expr.restricted(side), true).unwrap();
        let twice = apply_restrictions(&once, true).unwrap();
        prop_assert!(twice.structurally_eq(&once), "{once} became {twice}");
    }

    /// Only terminals end up restricted, and never below another restriction.
    #[test]
    fn restrictions_reach_terminals(
        expr in arb_domain().prop_flat_map(arb_scalar_expr),
        side in any::<Side>(),
    ) {
        let result = apply_restrictions(&expr.restricted(side), true).unwrap();
        for node in nodes_of_kind(&result, NodeKind::Restricted) {
            let Op::Restricted { expr: inner, .. } = node.op() else { unreachable!() };
            prop_assert!(inner.is_terminal(), "restricted non-terminal {inner}");
        }
    }

    /// Expressions without restrictions are left alone when no default side
    /// is used and nothing requires one.
    #[test]
    fn constants_pass_through(value in 0.5f64..4.0) {
        let expr = Expr::float(value).try_add(&Expr::float(1.0)).unwrap();
        let result = apply_restrictions(&expr, false).unwrap();
        prop_assert!(Arc::ptr_eq(&result, &expr));
    }
}
