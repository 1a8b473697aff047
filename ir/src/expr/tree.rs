//! Tree visualization for expression DAGs.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::{borrow::Cow, rc::Rc};

use itertools::Itertools;
use ptree::{Style, TreeItem};

use crate::expr::Expr;
use crate::op::Op;

/// Compact renderer: a node reached a second time prints as
/// `[id] → (see above)` without its operands.
#[derive(Clone)]
pub struct ExprTreeCompact {
    expr: Arc<Expr>,
    visited: Rc<RefCell<HashSet<u64>>>,
    is_backref: RefCell<bool>,
}

impl ExprTreeCompact {
    pub fn new(expr: &Arc<Expr>) -> Self {
        Self { expr: expr.clone(), visited: Rc::new(RefCell::new(HashSet::new())), is_backref: RefCell::new(false) }
    }

    fn from_child(expr: Arc<Expr>, visited: Rc<RefCell<HashSet<u64>>>) -> Self {
        Self { expr, visited, is_backref: RefCell::new(false) }
    }
}

impl TreeItem for ExprTreeCompact {
    type Child = ExprTreeCompact;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        let mut visited = self.visited.borrow_mut();
        if visited.contains(&self.expr.id) {
            *self.is_backref.borrow_mut() = true;
            write!(f, "[{}] → (see above)", self.expr.id)
        } else {
            visited.insert(self.expr.id);
            write!(f, "{}", format_node(&self.expr))
        }
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        if *self.is_backref.borrow() {
            return Cow::Borrowed(&[]);
        }

        let children: Vec<_> = self
            .expr
            .op()
            .children()
            .into_iter()
            .map(|child| ExprTreeCompact::from_child(child.clone(), self.visited.clone()))
            .collect();
        Cow::Owned(children)
    }
}

/// Full renderer: shared nodes are expanded at every occurrence.
#[derive(Clone)]
pub struct ExprTreeFull {
    expr: Arc<Expr>,
}

impl ExprTreeFull {
    pub fn new(expr: &Arc<Expr>) -> Self {
        Self { expr: expr.clone() }
    }
}

impl TreeItem for ExprTreeFull {
    type Child = ExprTreeFull;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &Style) -> io::Result<()> {
        write!(f, "{}", format_node(&self.expr))
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        let children: Vec<_> =
            self.expr.op().children().into_iter().map(|child| ExprTreeFull { expr: child.clone() }).collect();
        Cow::Owned(children)
    }
}

/// `[id] KIND(payload) shape=[..] free=[..]`
fn format_node(expr: &Arc<Expr>) -> String {
    let payload = match expr.op() {
        Op::Geometry { quantity, domain } => format!("({quantity}, domain={})", domain.id()),
        Op::Const(value) => format!("({})", value.0),
        Op::Constant { count, .. } => format!("({count})"),
        Op::Argument { number, part: Some(part), .. } => format!("({number}, part={part})"),
        Op::Argument { number, .. } => format!("({number})"),
        Op::Coefficient { count, space } => format!("({count}, {})", space.sobolev_space()),
        Op::MultiIndex(items) => format!("({})", items.iter().join(", ")),
        Op::Label(label) => format!("({label})"),
        Op::Restricted { side, .. } => format!("({side})"),
        _ => String::new(),
    };

    let mut line = format!("[{}] {}{}", expr.id, expr.kind(), payload);
    if !expr.shape().is_empty() {
        line.push_str(&format!(" shape={:?}", expr.shape().as_slice()));
    }
    if !expr.free_indices().is_empty() {
        line.push_str(&format!(" free=[{}]", expr.free_indices().iter().map(|(i, _)| i).join(", ")));
    }
    line
}

fn render<T: TreeItem>(tree: &T) -> String {
    let mut buf = Vec::new();
    if let Err(err) = ptree::write_tree(tree, &mut buf) {
        tracing::debug!(%err, "tree rendering failed");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Render as a compact ASCII tree with back-references for shared nodes.
pub fn render_tree_compact(expr: &Arc<Expr>) -> String {
    render(&ExprTreeCompact::new(expr))
}

/// Render as a full ASCII tree.
pub fn render_tree_full(expr: &Arc<Expr>) -> String {
    render(&ExprTreeFull::new(expr))
}
