//! Integrals and forms.

use std::collections::BTreeMap;
use std::sync::Arc;

use snafu::ensure;
use varform_domain::Domain;

use crate::error::{NonScalarIntegrandSnafu, Result};
use crate::expr::Expr;

/// Where an integral is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumIter, strum::AsRefStr, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "testing", derive(proptest_derive::Arbitrary))]
#[strum(serialize_all = "snake_case")]
pub enum IntegralType {
    Cell,
    ExteriorFacet,
    ExteriorFacetBottom,
    ExteriorFacetTop,
    ExteriorFacetVert,
    InteriorFacet,
    InteriorFacetHoriz,
    InteriorFacetVert,
    Vertex,
    Custom,
    #[strum(serialize = "cutcell")]
    CutCell,
    Interface,
    Overlap,
}

impl IntegralType {
    /// Integrals over facets shared by two cells.
    pub const fn is_interior_facet(&self) -> bool {
        matches!(self, Self::InteriorFacet | Self::InteriorFacetHoriz | Self::InteriorFacetVert)
    }

    /// Integrals over user-supplied quadrature.
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom | Self::CutCell | Self::Interface | Self::Overlap)
    }

    /// Integrals evaluated at points.
    pub const fn is_point(&self) -> bool {
        matches!(self, Self::Vertex)
    }
}

/// Subdomain an integral is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::Display)]
pub enum SubdomainId {
    #[default]
    #[display("everywhere")]
    Everywhere,
    #[display("{_0}")]
    Id(usize),
}

/// A scalar integrand together with where and how to integrate it.
#[derive(Debug, Clone)]
pub struct Integral {
    integrand: Arc<Expr>,
    integral_type: IntegralType,
    domain: Arc<Domain>,
    subdomain_id: SubdomainId,
    metadata: BTreeMap<String, String>,
}

impl Integral {
    /// Fails unless the integrand is a scalar without free indices.
    pub fn new(integrand: Arc<Expr>, integral_type: IntegralType, domain: Arc<Domain>) -> Result<Self> {
        ensure!(integrand.is_true_scalar(), NonScalarIntegrandSnafu { shape: integrand.shape().clone() });
        Ok(Self { integrand, integral_type, domain, subdomain_id: SubdomainId::Everywhere, metadata: BTreeMap::new() })
    }

    pub fn with_subdomain(mut self, subdomain_id: SubdomainId) -> Self {
        self.subdomain_id = subdomain_id;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Same integral with a new integrand.
    pub fn reconstruct(&self, integrand: Arc<Expr>) -> Self {
        Self { integrand, ..self.clone() }
    }

    pub fn integrand(&self) -> &Arc<Expr> {
        &self.integrand
    }

    pub fn integral_type(&self) -> IntegralType {
        self.integral_type
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    pub fn subdomain_id(&self) -> SubdomainId {
        self.subdomain_id
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

/// Ordered sum of integrals.
#[derive(Debug, Clone, Default)]
pub struct Form {
    integrals: Vec<Integral>,
}

impl Form {
    pub fn new(integrals: Vec<Integral>) -> Self {
        Self { integrals }
    }

    pub fn integrals(&self) -> &[Integral] {
        &self.integrals
    }

    pub fn integrals_by_type(&self, integral_type: IntegralType) -> impl Iterator<Item = &Integral> {
        self.integrals.iter().filter(move |integral| integral.integral_type == integral_type)
    }

    pub fn len(&self) -> usize {
        self.integrals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrals.is_empty()
    }
}

impl FromIterator<Integral> for Form {
    fn from_iter<T: IntoIterator<Item = Integral>>(iter: T) -> Self {
        Self { integrals: iter.into_iter().collect() }
    }
}

/// Targets whose integrands a pass can rewrite: forms, integrals and bare
/// expressions.
///
/// The callback sees each integrand together with its integral, or `None`
/// for a bare expression.
pub trait MapIntegrands: Sized {
    fn try_map_integrands<E, F>(&self, f: F) -> std::result::Result<Self, E>
    where
        F: FnMut(&Arc<Expr>, Option<&Integral>) -> std::result::Result<Arc<Expr>, E>;
}

impl MapIntegrands for Arc<Expr> {
    fn try_map_integrands<E, F>(&self, mut f: F) -> std::result::Result<Self, E>
    where
        F: FnMut(&Arc<Expr>, Option<&Integral>) -> std::result::Result<Arc<Expr>, E>,
    {
        f(self, None)
    }
}

impl MapIntegrands for Integral {
    fn try_map_integrands<E, F>(&self, mut f: F) -> std::result::Result<Self, E>
    where
        F: FnMut(&Arc<Expr>, Option<&Integral>) -> std::result::Result<Arc<Expr>, E>,
    {
        Ok(self.reconstruct(f(&self.integrand, Some(self))?))
    }
}

impl MapIntegrands for Form {
    fn try_map_integrands<E, F>(&self, mut f: F) -> std::result::Result<Self, E>
    where
        F: FnMut(&Arc<Expr>, Option<&Integral>) -> std::result::Result<Arc<Expr>, E>,
    {
        self.integrals.iter().map(|integral| integral.try_map_integrands(&mut f)).collect()
    }
}
