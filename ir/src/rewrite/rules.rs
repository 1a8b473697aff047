//! Per-kind rule tables with O(1) dispatch.
//!
//! A [`RuleTable`] maps every [`NodeKind`] a rule set handles to a [`Rule`].
//! Kinds without an entry fall back to the table's terminal or operator
//! fallback; kinds with neither are reported by [`RuleTable::uncovered`] and
//! fail at dispatch time with `MissingRule`.

use std::collections::HashMap;
use std::sync::Arc;

use strum::IntoEnumIterator;

use crate::expr::Expr;
use crate::op::{NodeKind, Operands};

/// A rule set: mutable state threaded through handlers, plus its table.
///
/// Tables are built once per rule-set type and shared, usually from a
/// `OnceLock` static inside [`RuleSet::rule_table`].
pub trait RuleSet: Sized + 'static {
    type Error: From<crate::Error>;

    fn rule_table() -> &'static RuleTable<Self>;
}

/// Handler that sees only the original node; operands are not visited.
pub type CutoffHandler<R> = fn(&mut R, &Arc<Expr>) -> Result<Arc<Expr>, <R as RuleSet>::Error>;

/// Handler that sees the original node and its transformed operands.
pub type PostHandler<R> = fn(&mut R, &Arc<Expr>, Operands) -> Result<Arc<Expr>, <R as RuleSet>::Error>;

/// How the engine treats one node kind.
pub enum Rule<R: RuleSet> {
    Cutoff(CutoffHandler<R>),
    Post(PostHandler<R>),
    /// Keep the node if no operand changed, otherwise rebuild it.
    ReuseIfUntouched,
}

impl<R: RuleSet> Clone for Rule<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: RuleSet> Copy for Rule<R> {}

impl<R: RuleSet> std::fmt::Debug for Rule<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cutoff(_) => write!(f, "Cutoff"),
            Self::Post(_) => write!(f, "Post"),
            Self::ReuseIfUntouched => write!(f, "ReuseIfUntouched"),
        }
    }
}

/// Dispatch table from node kind to rule.
pub struct RuleTable<R: RuleSet> {
    name: &'static str,
    rules: HashMap<NodeKind, Rule<R>>,
    terminal_fallback: Option<Rule<R>>,
    operator_fallback: Option<Rule<R>>,
}

impl<R: RuleSet> RuleTable<R> {
    pub fn new(name: &'static str) -> Self {
        Self { name, rules: HashMap::new(), terminal_fallback: None, operator_fallback: None }
    }

    /// Register `rule` for `kind`, replacing any earlier entry.
    pub fn on(mut self, kind: NodeKind, rule: Rule<R>) -> Self {
        if self.rules.insert(kind, rule).is_some() {
            tracing::debug!(table = self.name, %kind, "rule replaced");
        }
        self
    }

    /// Register `rule` for each of `kinds`.
    pub fn on_all(self, kinds: impl IntoIterator<Item = NodeKind>, rule: Rule<R>) -> Self {
        kinds.into_iter().fold(self, |table, kind| table.on(kind, rule))
    }

    /// Rule for terminal kinds without an entry.
    pub fn terminal_fallback(mut self, rule: Rule<R>) -> Self {
        self.terminal_fallback = Some(rule);
        self
    }

    /// Rule for operator kinds without an entry.
    pub fn operator_fallback(mut self, rule: Rule<R>) -> Self {
        self.operator_fallback = Some(rule);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn lookup(&self, kind: NodeKind) -> Option<Rule<R>> {
        let fallback = if kind.is_terminal() { self.terminal_fallback } else { self.operator_fallback };
        self.rules.get(&kind).copied().or(fallback)
    }

    /// Kinds the table cannot dispatch.
    pub fn uncovered(&self) -> Vec<NodeKind> {
        NodeKind::iter().filter(|kind| self.lookup(*kind).is_none()).collect()
    }
}
