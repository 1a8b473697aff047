//! Free and fixed tensor indices.

use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

static INDEX_COUNTER: AtomicU64 = AtomicU64::new(0);
static LABEL_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A free index. Every call to [`Index::new`] yields a distinct index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("i{_0}")]
pub struct Index(u64);

impl Index {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(INDEX_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn count(&self) -> u64 {
        self.0
    }
}

/// `N` fresh, pairwise distinct indices.
pub fn indices<const N: usize>() -> [Index; N] {
    std::array::from_fn(|_| Index::new())
}

/// One slot of a multi-index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum IndexItem {
    #[display("{_0}")]
    Fixed(usize),
    #[display("{_0}")]
    Free(Index),
}

impl IndexItem {
    pub fn as_free(&self) -> Option<Index> {
        match self {
            Self::Free(index) => Some(*index),
            Self::Fixed(_) => None,
        }
    }
}

impl From<usize> for IndexItem {
    fn from(value: usize) -> Self {
        Self::Fixed(value)
    }
}

impl From<Index> for IndexItem {
    fn from(value: Index) -> Self {
        Self::Free(value)
    }
}

pub type IndexItems = SmallVec<[IndexItem; 4]>;

/// Free indices of an expression with their dimensions, sorted by index.
pub type FreeIndices = SmallVec<[(Index, usize); 2]>;

/// Identifier of a `Label` terminal.
pub(crate) fn next_label() -> u64 {
    LABEL_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Union of two sorted free-index sets.
///
/// Indices present in both must agree on their dimension; the shared ones are
/// reported back so products can contract them.
pub(crate) fn merge_free(a: &FreeIndices, b: &FreeIndices) -> crate::Result<(FreeIndices, SmallVec<[Index; 2]>)> {
    let mut merged = FreeIndices::new();
    let mut shared = SmallVec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (ia, da) = a[i];
        let (ib, db) = b[j];
        match ia.cmp(&ib) {
            std::cmp::Ordering::Less => {
                merged.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                merged.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                snafu::ensure!(da == db, crate::error::IndexDimensionMismatchSnafu { index: ia, lhs: da, rhs: db });
                merged.push(a[i]);
                shared.push(ia);
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    Ok((merged, shared))
}

pub(crate) fn free_dim(free: &FreeIndices, index: Index) -> Option<usize> {
    free.binary_search_by(|(i, _)| i.cmp(&index)).ok().map(|pos| free[pos].1)
}

pub(crate) fn remove_free(free: &FreeIndices, index: Index) -> FreeIndices {
    free.iter().copied().filter(|(i, _)| *i != index).collect()
}
