//! Memoized DAG transformation.
//!
//! # Algorithm
//!
//! Each node passes through two stages on an explicit stack:
//! - Stage 0 (Visit): look up the node's rule. `Cutoff` handlers run
//!   immediately on the original node; other rules push a Finalize entry and
//!   then the node's unprocessed operands.
//! - Stage 1 (Finalize): collect the operands' results, run the `Post`
//!   handler or reuse-if-untouched, and link the result.
//!
//! A node is dispatched at most once per [`MemoCaches`]: the value cache maps
//! node ids to results, and any entry found there short-circuits the node.
//! New results that are structurally equal collapse onto the first such
//! instance through the result cache, while results identical to their input
//! are linked as-is so untouched subgraphs keep their sharing.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use snafu::OptionExt;

use crate::error::{MissingRuleSnafu, UnmappedOperandSnafu};
use crate::expr::{Expr, ExprKey};
use crate::op::Operands;

use super::rules::{Rule, RuleSet};

/// Content-keyed wrapper used by the result cache.
#[derive(Clone)]
struct ResultKey(Arc<Expr>);

impl PartialEq for ResultKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.structurally_eq(&other.0)
    }
}

impl Eq for ResultKey {}

impl Hash for ResultKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.content_hash().hash(state);
    }
}

/// Value cache and result cache of one transformation context.
///
/// Reusing the same caches across several calls transforms each node only
/// once, even when it is reachable from several roots.
#[derive(Default)]
pub struct MemoCaches {
    values: HashMap<ExprKey, Arc<Expr>>,
    results: HashMap<ResultKey, Arc<Expr>>,
}

impl MemoCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result previously computed for `node`.
    pub fn get(&self, node: &Arc<Expr>) -> Option<Arc<Expr>> {
        self.values.get(&ExprKey(node.clone())).cloned()
    }

    /// Number of transformed nodes.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of distinct results.
    pub fn distinct_results(&self) -> usize {
        self.results.len()
    }

    /// Results of the operands of `node`, all of which must be linked.
    pub(crate) fn mapped_operands(&self, node: &Arc<Expr>) -> crate::Result<Operands> {
        node.op()
            .children()
            .into_iter()
            .map(|child| self.get(child).context(UnmappedOperandSnafu { kind: node.kind(), operand: child.id }))
            .collect()
    }

    fn link(&mut self, original: &Arc<Expr>, result: Arc<Expr>) -> Arc<Expr> {
        let result = if Arc::ptr_eq(original, &result) {
            self.results.entry(ResultKey(result.clone())).or_insert_with(|| result.clone());
            result
        } else {
            self.results.entry(ResultKey(result.clone())).or_insert(result).clone()
        };
        self.values.insert(ExprKey(original.clone()), result.clone());
        result
    }
}

impl std::fmt::Debug for MemoCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCaches").field("values", &self.values.len()).field("results", &self.results.len()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Visit,
    Finalize,
}

struct StackEntry {
    node: Arc<Expr>,
    stage: Stage,
}

/// Transform the DAG under `root` with fresh caches.
pub fn map_expr_dag<R: RuleSet>(rules: &mut R, root: &Arc<Expr>) -> Result<Arc<Expr>, R::Error> {
    let mut caches = MemoCaches::new();
    map_expr_dag_with_caches(rules, root, &mut caches)
}

/// Transform the DAG under `root`, reusing results already in `caches`.
pub fn map_expr_dag_with_caches<R: RuleSet>(
    rules: &mut R,
    root: &Arc<Expr>,
    caches: &mut MemoCaches,
) -> Result<Arc<Expr>, R::Error> {
    DagMapper { rules, caches, dispatched: 0 }.run(root)
}

/// Transform several roots sharing one pair of caches.
pub fn map_expr_dags<R: RuleSet>(
    rules: &mut R,
    roots: &[Arc<Expr>],
    caches: &mut MemoCaches,
) -> Result<Vec<Arc<Expr>>, R::Error> {
    roots.iter().map(|root| map_expr_dag_with_caches(rules, root, caches)).collect()
}

/// Keep `node` if every operand came back unchanged, otherwise rebuild it.
pub fn reuse_if_untouched(node: &Arc<Expr>, operands: &[Arc<Expr>]) -> crate::Result<Arc<Expr>> {
    node.with_operands(operands)
}

struct DagMapper<'a, R> {
    rules: &'a mut R,
    caches: &'a mut MemoCaches,
    dispatched: usize,
}

impl<R: RuleSet> DagMapper<'_, R> {
    fn run(mut self, root: &Arc<Expr>) -> Result<Arc<Expr>, R::Error> {
        if let Some(result) = self.caches.get(root) {
            return Ok(result);
        }

        let table = R::rule_table();
        let mut stack = vec![StackEntry { node: root.clone(), stage: Stage::Visit }];

        while let Some(StackEntry { node, stage }) = stack.pop() {
            if self.caches.values.contains_key(&ExprKey(node.clone())) {
                continue;
            }

            let kind = node.kind();
            let rule = table.lookup(kind).context(MissingRuleSnafu { kind, table: table.name() })?;

            match (stage, rule) {
                (_, Rule::Cutoff(handler)) => {
                    tracing::trace!(node.id, %kind, "cutoff");
                    self.dispatched += 1;
                    let result = handler(self.rules, &node)?;
                    self.caches.link(&node, result);
                }
                (Stage::Visit, _) => {
                    stack.push(StackEntry { node: node.clone(), stage: Stage::Finalize });
                    for child in node.op().children().into_iter().rev() {
                        if !self.caches.values.contains_key(&ExprKey(child.clone())) {
                            stack.push(StackEntry { node: child.clone(), stage: Stage::Visit });
                        }
                    }
                }
                (Stage::Finalize, rule) => {
                    self.dispatched += 1;
                    let operands = self.caches.mapped_operands(&node)?;
                    let result = match rule {
                        Rule::Post(handler) => {
                            tracing::trace!(node.id, %kind, "post");
                            handler(self.rules, &node, operands)?
                        }
                        _ => reuse_if_untouched(&node, &operands)?,
                    };
                    self.caches.link(&node, result);
                }
            }
        }

        tracing::trace!(root.id, dispatched = self.dispatched, table = table.name(), "dag mapped");
        let result = self.caches.get(root).context(UnmappedOperandSnafu { kind: root.kind(), operand: root.id })?;
        Ok(result)
    }
}
