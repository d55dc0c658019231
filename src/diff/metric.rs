//! Dissimilarity between two clades.

use std::collections::HashSet;

use clap::ValueEnum;
use fixedbitset::FixedBitSet;
use serde::Serialize;

use super::clade::{Clade, CladeCache, LeafAttr, LeafSet};
use super::DiffError;
use crate::tree::Tree;

/// Scores how different two clades are. Implementations are evaluated
/// concurrently and must not hold shared mutable state.
pub trait CladeMetric: Sync {
    /// Cost of matching `reference` with `target`, always non-negative
    fn distance(&self, reference: &Clade<'_>, target: &Clade<'_>) -> Result<f64, DiffError>;
}

impl<F> CladeMetric for F
where
    F: Fn(&Clade<'_>, &Clade<'_>) -> Result<f64, DiffError> + Sync,
{
    fn distance(&self, reference: &Clade<'_>, target: &Clade<'_>) -> Result<f64, DiffError> {
        self(reference, target)
    }
}

/// Built-in clade metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DistanceMetric {
    /// Fraction of leaves missing from the larger clade
    #[default]
    Set,
    /// Normalized Robinson Foulds distance between the clades
    #[value(alias = "rf")]
    RobinsonFoulds,
    /// Set distance plus the pendant length difference of unmatched leaves
    SetBranch,
}

impl CladeMetric for DistanceMetric {
    fn distance(&self, reference: &Clade<'_>, target: &Clade<'_>) -> Result<f64, DiffError> {
        match self {
            Self::Set => set_distance(reference.leaves(), target.leaves()),
            Self::RobinsonFoulds => rf_distance(reference, target),
            Self::SetBranch => set_branch_distance(reference, target),
        }
    }
}

/// Computes `1 - |A ∩ B| / max(|A|, |B|)`
/// ```
/// use phylodiff::diff::{set_distance, LeafSet};
///
/// let a: LeafSet = ["L2", "L3"].into_iter().map(String::from).collect();
/// let b: LeafSet = ["L2", "L4"].into_iter().map(String::from).collect();
///
/// assert_eq!(set_distance(&a, &b).unwrap(), 0.5);
/// assert_eq!(set_distance(&a, &a).unwrap(), 0.0);
/// ```
pub fn set_distance(a: &LeafSet, b: &LeafSet) -> Result<f64, DiffError> {
    let largest = a.len().max(b.len());
    if largest == 0 {
        return Err(DiffError::DegenerateInput("both leaf sets are empty"));
    }
    let shared = a.intersection(b).count();

    Ok(1.0 - (shared as f64) / (largest as f64))
}

/// Set distance plus the absolute difference of pendant branch lengths
/// of the leaves found on one side only.
pub fn set_branch_distance(reference: &Clade<'_>, target: &Clade<'_>) -> Result<f64, DiffError> {
    let set = set_distance(reference.leaves(), target.leaves())?;
    let ref_only = reference.pendant_length_outside(target.leaves())?;
    let target_only = target.pendant_length_outside(reference.leaves())?;

    Ok(set + (ref_only - target_only).abs())
}

/// Normalized Robinson Foulds distance between two clades, restricted to their
/// shared leaves. The clade with more leaves is used as the reference and
/// ties keep the given order. Fewer than 2 shared leaves give a distance of 1.
pub fn rf_distance(a: &Clade<'_>, b: &Clade<'_>) -> Result<f64, DiffError> {
    if a.leaves().intersection(b.leaves()).count() < 2 {
        return Ok(1.0);
    }
    let (reference, target) = if b.len() > a.len() { (b, a) } else { (a, b) };

    Ok(clade_robinson_foulds(reference, target)?.normalized())
}

/// Raw Robinson Foulds distance with its maximal value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RobinsonFoulds {
    /// Number of clusters found in only one of the trees
    pub rf: usize,
    /// Number of non trivial clusters in both trees
    pub rf_max: usize,
}

impl RobinsonFoulds {
    /// `rf / rf_max`, 0 when there are no comparable clusters
    pub fn normalized(&self) -> f64 {
        if self.rf_max == 0 {
            0.0
        } else {
            self.rf as f64 / self.rf_max as f64
        }
    }
}

type Cluster = FixedBitSet;

/// Non trivial clusters of a clade restricted to shared leaves.
/// Singletons and the full shared set are present on both sides and left out.
fn clusters(clade: &Clade<'_>, shared: &[&String]) -> Result<HashSet<Cluster>, DiffError> {
    let mut clusters = HashSet::new();
    for leaves in clade.nested_leaf_sets()? {
        let mut bitset = FixedBitSet::with_capacity(shared.len());
        for leaf in leaves.iter() {
            if let Ok(index) = shared.binary_search(&leaf) {
                bitset.insert(index);
            }
        }
        let size = bitset.count_ones(..);
        if size > 1 && size < shared.len() {
            clusters.insert(bitset);
        }
    }

    Ok(clusters)
}

/// Computes the Robinson Foulds distance between the subtrees of two clades,
/// both pruned to the leaves they share.
pub fn clade_robinson_foulds(
    reference: &Clade<'_>,
    target: &Clade<'_>,
) -> Result<RobinsonFoulds, DiffError> {
    let shared: Vec<_> = reference.leaves().intersection(target.leaves()).collect();

    let clusters_r = clusters(reference, &shared)?;
    let clusters_t = clusters(target, &shared)?;

    let common = clusters_r.intersection(&clusters_t).count();
    let rf = clusters_r.len() + clusters_t.len() - 2 * common;

    Ok(RobinsonFoulds {
        rf,
        rf_max: clusters_r.len() + clusters_t.len(),
    })
}

/// Robinson Foulds distance between two whole trees on their shared leaves
/// ```
/// use phylodiff::diff::{robinson_foulds, LeafAttr};
/// use phylodiff::tree::Tree;
///
/// let a = Tree::from_newick("((A,B),(C,D),E);").unwrap();
/// let b = Tree::from_newick("((A,C),(B,D),E);").unwrap();
/// let rf = robinson_foulds(&a, &b, &LeafAttr::Name, &LeafAttr::Name).unwrap();
///
/// assert_eq!(rf.rf, 4);
/// assert_eq!(rf.rf_max, 4);
/// ```
pub fn robinson_foulds(
    reference: &Tree,
    target: &Tree,
    ref_attr: &LeafAttr,
    target_attr: &LeafAttr,
) -> Result<RobinsonFoulds, DiffError> {
    let ref_cache = CladeCache::build(reference, ref_attr.clone())?;
    let target_cache = CladeCache::build(target, target_attr.clone())?;

    clade_robinson_foulds(&ref_cache.root_clade(), &target_cache.root_clade())
}
