//! One-line infix rendering of expressions.

use std::fmt;

use itertools::Itertools;

use crate::expr::Expr;
use crate::op::Op;

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op() {
            Op::Geometry { quantity, .. } => write!(f, "{quantity}"),
            Op::Const(value) => write!(f, "{}", value.0),
            Op::Zero { .. } => write!(f, "0"),
            Op::Constant { count, .. } => write!(f, "c_{count}"),
            Op::Argument { number, .. } => write!(f, "v_{number}"),
            Op::Coefficient { count, .. } => write!(f, "w_{count}"),
            Op::MultiIndex(items) => write!(f, "{}", items.iter().join(", ")),
            Op::Label(label) => write!(f, "l_{label}"),

            Op::Sum(a, b) => write!(f, "({a} + {b})"),
            Op::Product(a, b) => write!(f, "{a} * {b}"),
            Op::Division(a, b) => write!(f, "{a} / {b}"),
            Op::Power(a, b) => write!(f, "{a} ** {b}"),
            Op::Abs(a) => write!(f, "|{a}|"),
            Op::Sqrt(a) => write!(f, "sqrt({a})"),
            Op::Real(a) => write!(f, "real({a})"),
            Op::Conj(a) => write!(f, "conj({a})"),
            Op::MaxValue(a, b) => write!(f, "max_value({a}, {b})"),
            Op::MinValue(a, b) => write!(f, "min_value({a}, {b})"),

            Op::Indexed { expr, indices } => write!(f, "{expr}[{indices}]"),
            Op::ComponentTensor { expr, indices } => write!(f, "as_tensor({expr}, ({indices}))"),
            Op::IndexSum { expr, index } => write!(f, "sum_{{{index}}}({expr})"),
            Op::ListTensor { components } => write!(f, "[{}]", components.iter().join(", ")),

            Op::Grad(a) => write!(f, "grad({a})"),
            Op::ReferenceGrad(a) => write!(f, "reference_grad({a})"),
            Op::ReferenceValue(a) => write!(f, "reference_value({a})"),
            Op::Variable { expr, label } => write!(f, "var_{label}({expr})"),
            Op::Restricted { expr, side } => write!(f, "({expr})('{side}')"),
        }
    }
}
