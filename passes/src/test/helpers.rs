//! Test utilities for pass tests.
//!
//! Numeric bindings for geometric terminals, a warning recorder built on
//! `tracing-subscriber` and small DAG queries.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};
use varform_ir::test::eval::{Evaluator, Tensor};
use varform_ir::{Expr, GeometricQuantity, NodeKind, Op, Side};

/// Values for geometric terminals and for `ReferenceGrad`, which is what a
/// lowered Jacobian becomes.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    geometry: HashMap<GeometricQuantity, Tensor>,
    jacobian: Option<Tensor>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, quantity: GeometricQuantity, value: Tensor) -> Self {
        self.geometry.insert(quantity, value);
        self
    }

    /// Value of `ReferenceGrad(x)`, also bound to an unlowered `Jacobian`.
    pub fn with_jacobian(mut self, value: Tensor) -> Self {
        self.geometry.insert(GeometricQuantity::Jacobian, value.clone());
        self.jacobian = Some(value);
        self
    }

    pub fn lookup(&self, node: &Arc<Expr>, _side: Option<Side>) -> Option<Tensor> {
        match node.op() {
            Op::Geometry { quantity, .. } => self.geometry.get(quantity).cloned(),
            Op::ReferenceGrad(_) => self.jacobian.clone(),
            _ => None,
        }
    }

    pub fn eval(&self, expr: &Arc<Expr>) -> Tensor {
        Evaluator::new(|node: &Arc<Expr>, side: Option<Side>| self.lookup(node, side)).eval(expr)
    }

    pub fn eval_scalar(&self, expr: &Arc<Expr>) -> f64 {
        self.eval(expr).as_scalar()
    }
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-12, "expected {expected}, got {actual}");
}

pub fn assert_all_close(actual: &Tensor, expected: &[f64]) {
    assert_eq!(actual.data.len(), expected.len(), "length mismatch: {:?} vs {expected:?}", actual.data);
    for (a, e) in actual.data.iter().zip(expected) {
        assert_close(*a, *e);
    }
}

/// Unique nodes of `kind` under `root`.
pub fn nodes_of_kind(root: &Arc<Expr>, kind: NodeKind) -> Vec<Arc<Expr>> {
    root.toposort().into_iter().filter(|node| node.kind() == kind).collect()
}

/// Geometric quantities appearing under `root`.
pub fn quantities(root: &Arc<Expr>) -> Vec<GeometricQuantity> {
    root.toposort().iter().filter_map(|node| node.geometric_quantity()).collect()
}

/// Fields of one warning event, rendered with `Debug`.
pub type Warning = HashMap<String, String>;

struct FieldRecorder(Warning);

impl Visit for FieldRecorder {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

struct WarningRecorder(Arc<Mutex<Vec<Warning>>>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarningRecorder {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            let mut fields = FieldRecorder(Warning::new());
            event.record(&mut fields);
            self.0.lock().expect("warning recorder poisoned").push(fields.0);
        }
    }
}

/// Run `f` and collect the warnings it emits on this thread.
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, Vec<Warning>) {
    let warnings = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(WarningRecorder(warnings.clone()));
    let value = tracing::subscriber::with_default(subscriber, f);
    let warnings = std::mem::take(&mut *warnings.lock().expect("warning recorder poisoned"));
    (value, warnings)
}

/// Run `f` and count the warnings it emits on this thread.
pub fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let (value, warnings) = capture_warnings(f);
    (value, warnings.len())
}
