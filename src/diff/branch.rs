//! Branch length based distances between matched clades.
//!
//! Both functions measure lengths up to the root of the whole tree a clade
//! belongs to, not up to the clade root.

use std::collections::{BTreeMap, HashSet};

use accurate::sum::NaiveSum;
use accurate::traits::*;
use clap::ValueEnum;
use itertools::Itertools;
use ndarray::Array2;

use super::clade::Clade;
use super::DiffError;
use crate::tree::{EdgeLength, NodeId};

/// Secondary distances between matched clades
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BranchDistance {
    /// Difference of summed root distances of unmatched leaves
    PathSum,
    /// Norm of the difference of leaf to leaf distance matrices
    Cophenetic,
}

impl BranchDistance {
    /// Computes the distance between two matched clades
    pub fn distance(&self, reference: &Clade<'_>, target: &Clade<'_>) -> Result<f64, DiffError> {
        match self {
            Self::PathSum => path_sum_difference(reference, target),
            Self::Cophenetic => cophenetic_difference(reference, target),
        }
    }
}

/// `(identity, root distance)` of every non root leaf of a clade
fn leaf_root_distances<'a>(clade: &Clade<'a>) -> Result<Vec<(&'a str, EdgeLength)>, DiffError> {
    let tree = clade.tree();
    let mut distances = vec![];
    for leaf in tree.get_subtree_leaves(&clade.node)? {
        if tree.get(&leaf)?.is_root() {
            continue;
        }
        let distance = tree.get_root_distance(&leaf)?;
        for identity in clade.cache().leaf_set(&leaf)?.iter() {
            if !distances.contains(&(identity.as_str(), distance)) {
                distances.push((identity.as_str(), distance));
            }
        }
    }

    Ok(distances)
}

/// Absolute difference between the summed root distances of the leaves
/// that are not found, at the same root distance, in the other clade.
/// ```
/// use phylodiff::diff::{path_sum_difference, CladeCache, LeafAttr};
/// use phylodiff::tree::Tree;
///
/// let a = Tree::from_newick("(A:1,(B:1,C:2):1);").unwrap();
/// let b = Tree::from_newick("(A:1,(B:1,D:0.5):1);").unwrap();
/// let ca = CladeCache::build(&a, LeafAttr::Name).unwrap();
/// let cb = CladeCache::build(&b, LeafAttr::Name).unwrap();
///
/// // C is 3 away from the root and D 1.5
/// let d = path_sum_difference(&ca.root_clade(), &cb.root_clade()).unwrap();
/// assert_eq!(d, 1.5);
/// ```
pub fn path_sum_difference(reference: &Clade<'_>, target: &Clade<'_>) -> Result<f64, DiffError> {
    let ref_leaves = leaf_root_distances(reference)?;
    let target_leaves = leaf_root_distances(target)?;

    let unique_sum = |leaves: &[(&str, f64)], other: &[(&str, f64)]| {
        leaves
            .iter()
            .filter(|leaf| !other.contains(leaf))
            .map(|(_, distance)| *distance)
            .sum_with_accumulator::<NaiveSum<f64>>()
    };

    Ok((unique_sum(&ref_leaves, &target_leaves) - unique_sum(&target_leaves, &ref_leaves)).abs())
}

/// Leaf to leaf distances of a clade over a shared leaf universe.
/// Leaves missing from the clade get rows and columns of zeros.
fn cophenetic_matrix(clade: &Clade<'_>, universe: &[&String]) -> Result<Array2<f64>, DiffError> {
    let tree = clade.tree();

    // Nodes between each leaf and the root, root excluded
    let mut paths: BTreeMap<&str, HashSet<NodeId>> = BTreeMap::new();
    for leaf in tree.get_subtree_leaves(&clade.node)? {
        let path: HashSet<NodeId> = tree
            .get_path_from_root(&leaf)?
            .into_iter()
            .skip(1)
            .collect();
        if path.is_empty() {
            continue;
        }
        for identity in clade.cache().leaf_set(&leaf)?.iter() {
            paths.insert(identity.as_str(), path.clone());
        }
    }

    let n = universe.len();
    let mut matrix = Array2::zeros((n, n));
    for (i, j) in (0..n).tuple_combinations() {
        let (Some(path_i), Some(path_j)) = (
            paths.get(universe[i].as_str()),
            paths.get(universe[j].as_str()),
        ) else {
            continue;
        };
        let mut lengths = vec![];
        for node in path_i.symmetric_difference(path_j) {
            lengths.push(tree.get(node)?.branch_length());
        }
        let distance = lengths.into_iter().sum_with_accumulator::<NaiveSum<f64>>();
        matrix[[i, j]] = distance;
        matrix[[j, i]] = distance;
    }

    Ok(matrix)
}

/// Frobenius norm of the difference between the leaf to leaf distance
/// matrices of both clades, computed over the union of their leaves.
/// ```
/// use phylodiff::diff::{cophenetic_difference, CladeCache, LeafAttr};
/// use phylodiff::tree::Tree;
///
/// let a = Tree::from_newick("(A:1,B:1);").unwrap();
/// let b = Tree::from_newick("(A:1,B:3);").unwrap();
/// let ca = CladeCache::build(&a, LeafAttr::Name).unwrap();
/// let cb = CladeCache::build(&b, LeafAttr::Name).unwrap();
///
/// // A-B is 2 in the first tree and 4 in the second
/// let d = cophenetic_difference(&ca.root_clade(), &cb.root_clade()).unwrap();
/// assert!((d - 8f64.sqrt()).abs() < 1e-12);
/// ```
pub fn cophenetic_difference(reference: &Clade<'_>, target: &Clade<'_>) -> Result<f64, DiffError> {
    let universe: Vec<&String> = reference.leaves().union(target.leaves()).collect();

    let difference =
        cophenetic_matrix(reference, &universe)? - cophenetic_matrix(target, &universe)?;

    Ok(difference.mapv(|v| v * v).sum().sqrt())
}
