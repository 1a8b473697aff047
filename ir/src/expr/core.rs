//! Core [`Expr`] struct and fundamental operations.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use snafu::ensure;
use varform_domain::Domain;

use crate::error::{MultipleDomainsSnafu, Result};
use crate::index::FreeIndices;
use crate::op::{NodeKind, Op};
use crate::shape::{self, Shape};
use crate::types::{ConstValue, GeometricQuantity};

static EXPR_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Wrapper for `Arc<Expr>` that hashes and compares by node id.
///
/// Lets nodes key hash maps without hashing their content.
#[derive(Clone)]
pub struct ExprKey(pub Arc<Expr>);

impl std::fmt::Debug for ExprKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExprKey(id={})", self.0.id)
    }
}

impl PartialEq for ExprKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for ExprKey {}

impl Hash for ExprKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

/// Immutable node of an expression DAG.
///
/// Nodes are never hash-consed: two structurally equal expressions built
/// separately are distinct nodes. The `id` is the identity used for
/// memoization, and [`Expr::structurally_eq`] compares content.
#[derive(derive_more::Debug)]
pub struct Expr {
    /// Unique stable id, drawn from a global counter at construction.
    pub id: u64,
    pub(crate) op: Op,
    pub(crate) shape: Shape,
    pub(crate) free_indices: FreeIndices,
    #[debug(skip)]
    pub(crate) content_hash_cache: OnceLock<u64>,
}

impl Expr {
    /// Build a node, inferring its shape and free indices.
    pub fn new(op: Op) -> Result<Arc<Self>> {
        let (shape, free_indices) = shape::infer(&op)?;
        Ok(Self::from_parts(op, shape, free_indices))
    }

    pub(crate) fn from_parts(op: Op, shape: Shape, free_indices: FreeIndices) -> Arc<Self> {
        Arc::new(Self {
            id: EXPR_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            op,
            shape,
            free_indices,
            content_hash_cache: OnceLock::new(),
        })
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn kind(&self) -> NodeKind {
        self.op.kind()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn free_indices(&self) -> &FreeIndices {
        &self.free_indices
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Scalar shape and no free indices.
    pub fn is_true_scalar(&self) -> bool {
        self.shape.is_empty() && self.free_indices.is_empty()
    }

    pub fn geometric_quantity(&self) -> Option<GeometricQuantity> {
        match &self.op {
            Op::Geometry { quantity, .. } => Some(*quantity),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<ConstValue> {
        match &self.op {
            Op::Const(value) => Some(value.0),
            _ => None,
        }
    }

    /// Rebuild this node with new operands.
    ///
    /// Returns `self` when every operand is the same `Arc` as before;
    /// otherwise shape inference runs again on the new operands.
    pub fn with_operands(self: &Arc<Self>, operands: &[Arc<Self>]) -> Result<Arc<Self>> {
        let current = self.op.children();
        if current.len() == operands.len() && current.iter().zip(operands).all(|(a, b)| Arc::ptr_eq(a, b)) {
            return Ok(self.clone());
        }
        Self::new(self.op.with_operands(operands)?)
    }

    /// Unique nodes reachable from `self`, operands before users.
    pub fn toposort(self: &Arc<Self>) -> Vec<Arc<Self>> {
        self.toposort_filtered(|_| true)
    }

    /// Topological sort that does not descend into nodes failing `gate`.
    pub fn toposort_filtered<F>(self: &Arc<Self>, gate: F) -> Vec<Arc<Self>>
    where
        F: Fn(&Arc<Expr>) -> bool,
    {
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![(self.clone(), false)];

        while let Some((node, processed)) = stack.pop() {
            if visited.contains(&node.id) {
                continue;
            }

            if processed {
                visited.insert(node.id);
                result.push(node);
            } else if gate(&node) {
                stack.push((node.clone(), true));
                for child in node.op.children().into_iter().rev() {
                    if !visited.contains(&child.id) {
                        stack.push((child.clone(), false));
                    }
                }
            }
        }

        result
    }

    /// Number of unique nodes in the DAG.
    pub fn node_count(self: &Arc<Self>) -> usize {
        self.toposort().len()
    }

    /// Domains referenced by terminals, in first-seen order.
    pub fn domains(self: &Arc<Self>) -> Vec<Arc<Domain>> {
        let mut domains: Vec<Arc<Domain>> = Vec::new();
        for node in self.toposort() {
            let domain = match &node.op {
                Op::Geometry { domain, .. } | Op::Constant { domain, .. } => domain,
                Op::Argument { space, .. } | Op::Coefficient { space, .. } => space.domain(),
                _ => continue,
            };
            if !domains.contains(domain) {
                domains.push(domain.clone());
            }
        }
        domains
    }

    /// The single domain of the expression, if any.
    pub fn unique_domain(self: &Arc<Self>) -> Result<Option<Arc<Domain>>> {
        let mut domains = self.domains();
        ensure!(domains.len() <= 1, MultipleDomainsSnafu);
        Ok(domains.pop())
    }

    /// Content hash over kind, payload and operand hashes.
    ///
    /// Stable for structurally equal expressions regardless of node ids.
    pub fn content_hash(self: &Arc<Self>) -> u64 {
        if let Some(&cached) = self.content_hash_cache.get() {
            return cached;
        }

        // Fill operands first so the per-node computation never recurses deeply.
        for node in self.toposort_filtered(|n| n.content_hash_cache.get().is_none()) {
            let _ = node.content_hash_cache.set(node.compute_content_hash());
        }
        self.content_hash_cache.get().copied().unwrap_or_else(|| self.compute_content_hash())
    }

    fn compute_content_hash(self: &Arc<Self>) -> u64 {
        use xxhash_rust::xxh64::Xxh64;

        let mut hasher = Xxh64::new(0);
        self.op.hash_payload(&mut hasher);
        for child in self.op.children() {
            child.content_hash().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Same kinds, payloads and operand structure.
    pub fn structurally_eq(self: &Arc<Self>, other: &Arc<Self>) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![(self.clone(), other.clone())];

        while let Some((a, b)) = stack.pop() {
            if Arc::ptr_eq(&a, &b) || !seen.insert((a.id, b.id)) {
                continue;
            }
            if a.content_hash() != b.content_hash() || !a.op.payload_eq(&b.op) {
                return false;
            }
            let (ca, cb) = (a.op.children(), b.op.children());
            if ca.len() != cb.len() {
                return false;
            }
            stack.extend(ca.into_iter().cloned().zip(cb.into_iter().cloned()));
        }

        true
    }

    /// Render as a compact ASCII tree; shared nodes print once.
    pub fn tree(self: &Arc<Self>) -> String {
        super::tree::render_tree_compact(self)
    }

    /// Render as a full ASCII tree, expanding shared nodes every time.
    pub fn tree_full(self: &Arc<Self>) -> String {
        super::tree::render_tree_full(self)
    }
}
