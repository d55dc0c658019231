//! Clade level differences between two trees.
//!
//! Every clade of the reference tree is matched to at most one clade of the
//! target tree so that the summed dissimilarity of matched clades is minimal.
//! The steps are:
//!  - leaf sets are cached for every node of both trees ([`CladeCache`]),
//!  - a [`CladeMetric`] is evaluated on every pair of clades ([`CostMatrix`]),
//!  - clades with an exact counterpart are optionally dropped ([`CostMatrix::reduce`]),
//!  - an optimal assignment is found ([`assignment::solve`]),
//!  - matched pairs with a non zero cost are reported as [`DiffEntry`] values.
//!
//! ```
//! use phylodiff::diff::{treediff, DiffOptions, LeafAttr};
//! use phylodiff::tree::Tree;
//!
//! let a = Tree::from_newick("(L1:1,(L2:1,L3:1):1);").unwrap();
//! let b = Tree::from_newick("(L1:1,(L2:1,L4:1):1);").unwrap();
//!
//! let table = treediff(&a, &b, &LeafAttr::Name, &LeafAttr::Name, &DiffOptions::default()).unwrap();
//! let inner = table.iter().find(|entry| entry.ref_leaves.len() == 2).unwrap();
//!
//! assert_eq!(inner.distance, 0.5);
//! assert_eq!(inner.difference.iter().collect::<Vec<_>>(), vec!["L3", "L4"]);
//! ```

pub mod assignment;
mod branch;
mod clade;
mod matrix;
mod metric;

pub use self::assignment::Assignment;
pub use self::branch::{cophenetic_difference, path_sum_difference, BranchDistance};
pub use self::clade::{Clade, CladeCache, LeafAttr, LeafSet};
pub use self::matrix::CostMatrix;
pub use self::metric::{
    clade_robinson_foulds, rf_distance, robinson_foulds, set_branch_distance, set_distance,
    CladeMetric, DistanceMetric, RobinsonFoulds,
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn, Dispatch};

use crate::tree::{NewickParseError, NodeId, Tree, TreeError};

/// Errors that can occur when comparing trees
#[derive(Error, Debug)]
pub enum DiffError {
    /// A leaf has no value for the identity attribute
    #[error("Leaf {node} has no value for attribute '{attribute}'")]
    MissingAttribute { node: NodeId, attribute: String },
    /// A tree or a pair of leaf sets cannot be compared
    #[error("Cannot compare: {0}")]
    DegenerateInput(&'static str),
    /// The cost matrix cannot be solved
    #[error("Invalid cost matrix: {0}")]
    Assignment(String),
    /// The metric failed on a cell of the cost matrix
    #[error("Could not compute the cost of clades ({row}, {col})")]
    MetricEvaluation {
        row: usize,
        col: usize,
        #[source]
        source: Box<DiffError>,
    },
    /// The worker pool could not be started
    #[error("Could not start worker threads")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// The cost matrix does not have the expected shape
    #[error("Cost matrix has the wrong shape")]
    Shape(#[from] ndarray::ShapeError),
    /// There was a [`TreeError`] while walking a tree
    #[error("Problem with a tree")]
    TreeError(#[from] TreeError),
    /// There was a [`NewickParseError`] while copying a subtree
    #[error("Could not copy a subtree")]
    NewickParseError(#[from] NewickParseError),
}

/// Settings of a comparison
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Metric used to build the cost matrix
    pub metric: DistanceMetric,
    /// Drop clades with an exact counterpart before solving the assignment
    pub reduce_matrix: bool,
    /// Secondary distance computed on matched clades
    pub branch_distance: Option<BranchDistance>,
    /// Number of threads of the matrix build, 0 to use every core
    pub jobs: usize,
    /// Show a progress bar while the matrix is built
    pub progress: bool,
    /// Collector of log events, the current default is used when missing
    pub dispatch: Option<Dispatch>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::default(),
            reduce_matrix: false,
            branch_distance: None,
            jobs: 1,
            progress: false,
            dispatch: None,
        }
    }
}

/// A pair of matched clades that differ
#[derive(Debug, Clone)]
pub struct DiffEntry {
    /// Cost of the match
    pub distance: f64,
    /// Secondary branch distance, `None` when not computed
    pub branch_distance: Option<f64>,
    /// Leaves of the reference clade
    pub ref_leaves: LeafSet,
    /// Leaves of the target clade
    pub target_leaves: LeafSet,
    /// Leaves found in only one of the clades
    pub difference: LeafSet,
    /// Copy of the reference clade
    pub ref_subtree: Tree,
    /// Copy of the target clade
    pub target_subtree: Tree,
}

/// Compares two trees with the metric selected in `options`.
/// Entries are returned in increasing reference clade size.
pub fn treediff(
    reference: &Tree,
    target: &Tree,
    ref_attr: &LeafAttr,
    target_attr: &LeafAttr,
    options: &DiffOptions,
) -> Result<Vec<DiffEntry>, DiffError> {
    treediff_with_metric(reference, target, ref_attr, target_attr, &options.metric, options)
}

/// Compares two trees with a custom metric, `options.metric` is ignored
pub fn treediff_with_metric<M: CladeMetric + ?Sized>(
    reference: &Tree,
    target: &Tree,
    ref_attr: &LeafAttr,
    target_attr: &LeafAttr,
    metric: &M,
    options: &DiffOptions,
) -> Result<Vec<DiffEntry>, DiffError> {
    let run = || diff_pipeline(reference, target, ref_attr, target_attr, metric, options);
    match &options.dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, run),
        None => run(),
    }
}

fn progress_bar(options: &DiffOptions, cells: usize) -> ProgressBar {
    if !options.progress {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(cells as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} cells [{elapsed_precise}]")
    {
        bar.set_style(style);
    }
    bar
}

fn diff_pipeline<M: CladeMetric + ?Sized>(
    reference: &Tree,
    target: &Tree,
    ref_attr: &LeafAttr,
    target_attr: &LeafAttr,
    metric: &M,
    options: &DiffOptions,
) -> Result<Vec<DiffEntry>, DiffError> {
    let ref_cache = CladeCache::build(reference, ref_attr.clone())?;
    let target_cache = CladeCache::build(target, target_attr.clone())?;
    let ref_clades = ref_cache.clades()?;
    let target_clades = target_cache.clades()?;

    info!(
        rows = ref_clades.len(),
        cols = target_clades.len(),
        "Computing distance matrix"
    );
    let progress = progress_bar(options, ref_clades.len() * target_clades.len());
    let built = CostMatrix::build(&ref_clades, &target_clades, metric, options.jobs, &progress);
    progress.finish_and_clear();
    let mut matrix = built?;

    if options.reduce_matrix {
        let reduced = matrix.reduce();
        info!(
            "Distance matrix reduced from {:?} to {:?}",
            matrix.shape(),
            reduced.shape()
        );
        matrix = reduced;
    }

    if matrix.rows().is_empty() {
        info!("Every clade has an exact counterpart");
        return Ok(vec![]);
    }
    if matrix.cols().is_empty() {
        warn!(
            rows = matrix.rows().len(),
            "No target clade left to match the remaining reference clades"
        );
        return Ok(vec![]);
    }

    info!("Comparing trees");
    let assignment = assignment::solve(matrix.costs())?;
    debug!(cost = assignment.cost, "Optimal assignment found");

    let mut table = vec![];
    for (row, col) in assignment.pairs() {
        let distance = matrix.costs()[[row, col]];
        if distance == 0.0 {
            continue;
        }
        let ref_clade = &ref_clades[matrix.rows()[row]];
        let target_clade = &target_clades[matrix.cols()[col]];

        let branch_distance = options
            .branch_distance
            .map(|kind| kind.distance(ref_clade, target_clade))
            .transpose()?;

        table.push(DiffEntry {
            distance,
            branch_distance,
            ref_leaves: ref_clade.leaves().clone(),
            target_leaves: target_clade.leaves().clone(),
            difference: ref_clade
                .leaves()
                .symmetric_difference(target_clade.leaves())
                .cloned()
                .collect(),
            ref_subtree: reference.extract_subtree(&ref_clade.node, &ref_attr.newick_format())?,
            target_subtree: target
                .extract_subtree(&target_clade.node, &target_attr.newick_format())?,
        });
    }
    info!(entries = table.len(), "Difference table assembled");

    Ok(table)
}

/// Totals of a difference table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffSummary {
    /// Sum of the costs of every entry
    pub total_distance: f64,
    /// Sum of the branch distances, `None` when they were not computed
    pub total_branch_distance: Option<f64>,
    /// Number of entries
    pub mismatches: usize,
    /// Robinson Foulds distance between the whole trees
    pub rf: usize,
    /// Maximal Robinson Foulds distance between the whole trees
    pub rf_max: usize,
}

impl DiffSummary {
    /// Summarizes a difference table
    /// ```
    /// use phylodiff::diff::{robinson_foulds, treediff, DiffOptions, DiffSummary, LeafAttr};
    /// use phylodiff::tree::Tree;
    ///
    /// let a = Tree::from_newick("((A,B),(C,D),E);").unwrap();
    /// let b = Tree::from_newick("((A,C),(B,D),E);").unwrap();
    /// let attr = LeafAttr::Name;
    ///
    /// let table = treediff(&a, &b, &attr, &attr, &DiffOptions::default()).unwrap();
    /// let summary = DiffSummary::new(&table, robinson_foulds(&a, &b, &attr, &attr).unwrap());
    ///
    /// assert_eq!(summary.mismatches, 2);
    /// assert_eq!(summary.total_distance, 1.0);
    /// assert_eq!(summary.total_branch_distance, None);
    /// assert_eq!((summary.rf, summary.rf_max), (4, 4));
    /// ```
    pub fn new(table: &[DiffEntry], rf: RobinsonFoulds) -> Self {
        let branch_distances: Vec<f64> = table.iter().filter_map(|e| e.branch_distance).collect();
        Self {
            total_distance: table.iter().map(|e| e.distance).sum(),
            total_branch_distance: (!branch_distances.is_empty())
                .then(|| branch_distances.iter().sum()),
            mismatches: table.len(),
            rf: rf.rf,
            rf_max: rf.rf_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    const REF: &str = "(L1:1,(L2:1,L3:1):1);";
    const TARGET: &str = "(L1:1,(L2:1,L4:1):1);";

    fn diff(a: &str, b: &str, options: &DiffOptions) -> Vec<DiffEntry> {
        let a = Tree::from_newick(a).unwrap();
        let b = Tree::from_newick(b).unwrap();
        treediff(&a, &b, &LeafAttr::Name, &LeafAttr::Name, options).unwrap()
    }

    fn leaf_set(names: &[&str]) -> LeafSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn matched_clades() {
        for reduce_matrix in [false, true] {
            let options = DiffOptions {
                reduce_matrix,
                ..Default::default()
            };
            let table = diff(REF, TARGET, &options);

            // L1 and L2 match exactly, L3 pairs with L4 and both
            // remaining clades differ by the same two leaves
            let distances: Vec<_> = table.iter().map(|e| e.distance).collect();
            assert_eq!(distances, vec![1.0, 0.5, 1.0 - 2.0 / 3.0]);
            for entry in table.iter() {
                assert_eq!(entry.difference, leaf_set(&["L3", "L4"]));
                assert_eq!(entry.branch_distance, None);
            }

            let entry = &table[1];
            assert_eq!(entry.ref_leaves, leaf_set(&["L2", "L3"]));
            assert_eq!(entry.target_leaves, leaf_set(&["L2", "L4"]));
            assert_eq!(entry.ref_subtree.to_newick().unwrap(), "(L2:1,L3:1):1;");
            assert_eq!(entry.target_subtree.to_newick().unwrap(), "(L2:1,L4:1):1;");
        }
    }

    #[test]
    fn identical_trees_have_no_entries() {
        let newick = "((A:1,B:2):1,(C:1,(D:3,E:1):2):1);";
        for metric in [DistanceMetric::Set, DistanceMetric::SetBranch] {
            for reduce_matrix in [false, true] {
                let options = DiffOptions {
                    metric,
                    reduce_matrix,
                    jobs: 2,
                    ..Default::default()
                };
                let table = diff(newick, newick, &options);
                assert!(table.is_empty(), "{metric:?} reduce={reduce_matrix}");
            }
        }
    }

    #[test]
    fn branch_distances_are_attached() {
        for kind in [BranchDistance::PathSum, BranchDistance::Cophenetic] {
            let options = DiffOptions {
                branch_distance: Some(kind),
                ..Default::default()
            };
            let table = diff(REF, TARGET, &options);

            assert_eq!(table.len(), 3);
            assert!(table.iter().all(|e| e.branch_distance.is_some()));
        }
    }

    #[test]
    fn subtrees_keep_identity_feature() {
        let a = Tree::from_newick("(a[&&NHX:id=1:x=0],(b[&&NHX:id=2],c[&&NHX:id=3]));").unwrap();
        let b = Tree::from_newick("(a[&&NHX:id=1],(b[&&NHX:id=2],d[&&NHX:id=4]));").unwrap();
        let attr = LeafAttr::Feature("id".into());

        let table = treediff(&a, &b, &attr, &attr, &DiffOptions::default()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table[1].ref_subtree.to_newick().unwrap(),
            "(b[&&NHX:id=2],c[&&NHX:id=3]);"
        );
        assert_eq!(table[1].difference, leaf_set(&["3", "4"]));
    }

    /// `(A,(B,C))` shaped tree with `(name, id)` leaves
    fn cherry_tree(leaves: [(&str, &str); 3]) -> Tree {
        let mut tree = Tree::new();
        let root = tree.add(Node::new());
        let cherry = tree.add_child(Node::new(), root, Some(1.0)).unwrap();
        for (i, (name, id)) in leaves.into_iter().enumerate() {
            let mut leaf = Node::new_named(name);
            leaf.set_feature("id", id);
            let parent = if i == 0 { root } else { cherry };
            tree.add_child(leaf, parent, Some(1.0)).unwrap();
        }
        tree
    }

    fn identities(tree: &Tree, attr: &LeafAttr) -> LeafSet {
        tree.get_leaves()
            .iter()
            .map(|id| attr.value(tree.get(id).unwrap()).unwrap().to_string())
            .collect()
    }

    #[test]
    fn subtree_copies_keep_leaf_identities() {
        let a = cherry_tree([
            ("Homo sapiens", "urn:a"),
            ("Mus musculus", "urn:b"),
            ("A,1", "urn:c"),
        ]);
        let b = cherry_tree([
            ("Homo sapiens", "urn:a"),
            ("Mus musculus", "urn:b"),
            ("Rattus (norvegicus)", "urn:d=x"),
        ]);

        for attr in [LeafAttr::Name, LeafAttr::Feature("id".into())] {
            let table = treediff(&a, &b, &attr, &attr, &DiffOptions::default()).unwrap();
            assert_eq!(table.len(), 3, "{attr}");
            for entry in table.iter() {
                assert_eq!(identities(&entry.ref_subtree, &attr), entry.ref_leaves);
                assert_eq!(identities(&entry.target_subtree, &attr), entry.target_leaves);
            }
        }
    }

    #[test]
    fn custom_metric_errors_propagate() {
        let a = Tree::from_newick(REF).unwrap();
        let b = Tree::from_newick(TARGET).unwrap();
        let failing =
            |_: &Clade<'_>, _: &Clade<'_>| Err::<f64, _>(DiffError::DegenerateInput("failing metric"));

        let err = treediff_with_metric(
            &a,
            &b,
            &LeafAttr::Name,
            &LeafAttr::Name,
            &failing,
            &DiffOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DiffError::MetricEvaluation { .. }));
    }

    #[test]
    fn logs_go_to_injected_dispatch() {
        let options = DiffOptions {
            dispatch: Some(Dispatch::new(tracing::subscriber::NoSubscriber::default())),
            ..Default::default()
        };
        assert_eq!(diff(REF, TARGET, &options).len(), 3);
    }

    #[test]
    fn summary_totals() {
        let options = DiffOptions {
            branch_distance: Some(BranchDistance::PathSum),
            ..Default::default()
        };
        let table = diff(REF, TARGET, &options);
        let summary = DiffSummary::new(&table, RobinsonFoulds { rf: 0, rf_max: 0 });

        assert_eq!(summary.mismatches, 3);
        assert!((summary.total_distance - (1.5 + 1.0 / 3.0)).abs() < 1e-12);
        assert_eq!(summary.total_branch_distance, Some(0.0));
    }
}
