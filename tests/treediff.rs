use phylodiff::diff::{
    robinson_foulds, treediff, BranchDistance, CladeCache, CladeMetric, DiffError, DiffOptions,
    DistanceMetric, LeafAttr, LeafSet,
};
use phylodiff::tree::Tree;
use phylodiff::{generate_caterpillar, generate_tree};

fn leaf_set(names: &[&str]) -> LeafSet {
    names.iter().map(|n| n.to_string()).collect()
}

fn options(metric: DistanceMetric, reduce_matrix: bool) -> DiffOptions {
    DiffOptions {
        metric,
        reduce_matrix,
        ..Default::default()
    }
}

#[test]
fn single_leaf_swap() {
    let a = Tree::from_newick("(L1:1,(L2:1,L3:1):1);").unwrap();
    let b = Tree::from_newick("(L1:1,(L2:1,L4:1):1);").unwrap();
    let table = treediff(
        &a,
        &b,
        &LeafAttr::Name,
        &LeafAttr::Name,
        &options(DistanceMetric::Set, false),
    )
    .unwrap();

    let inner = table
        .iter()
        .find(|e| e.ref_leaves == leaf_set(&["L2", "L3"]))
        .expect("inner clade should be reported");
    assert_eq!(inner.distance, 0.5);
    assert_eq!(inner.target_leaves, leaf_set(&["L2", "L4"]));
    assert_eq!(inner.difference, leaf_set(&["L3", "L4"]));

    // Clades with identical leaves are never reported
    assert!(table.iter().all(|e| e.distance > 0.0));
    assert!(table.iter().all(|e| e.ref_leaves != leaf_set(&["L1"])));
}

#[test]
fn self_comparison_is_empty() {
    for n in [2, 10, 30] {
        let tree = generate_tree(n, true).unwrap();
        for reduce_matrix in [false, true] {
            for metric in [DistanceMetric::Set, DistanceMetric::SetBranch] {
                let table = treediff(
                    &tree,
                    &tree,
                    &LeafAttr::Name,
                    &LeafAttr::Name,
                    &options(metric, reduce_matrix),
                )
                .unwrap();
                assert!(table.is_empty(), "n={n} {metric:?} reduce={reduce_matrix}");
            }
        }
    }
}

#[test]
fn reduction_keeps_results() {
    let a = Tree::from_newick("((A,B),((C,D),(E,F)),(G,H));").unwrap();
    let b = Tree::from_newick("((A,B),((C,E),(D,F)),(G,I));").unwrap();

    let table = |reduce_matrix| {
        treediff(
            &a,
            &b,
            &LeafAttr::Name,
            &LeafAttr::Name,
            &options(DistanceMetric::Set, reduce_matrix),
        )
        .unwrap()
    };

    let full = table(false);
    let reduced = table(true);
    assert!(!full.is_empty());
    assert!(!reduced.is_empty());

    // (A,B) has an exact counterpart and never enters the reduced problem
    assert!(reduced.iter().all(|e| e.ref_leaves != leaf_set(&["A", "B"])));
    for entry in full.iter().chain(reduced.iter()) {
        assert!(entry.distance > 0.0);
        assert!(!entry.difference.is_empty());
    }
}

#[test]
fn rf_root_self_distance() {
    let tree = generate_caterpillar(12, true).unwrap();
    let cache = CladeCache::build(&tree, LeafAttr::Name).unwrap();
    let root = cache.root_clade();

    let d = DistanceMetric::RobinsonFoulds.distance(&root, &root).unwrap();
    assert_eq!(d, 0.0);

    let rf = robinson_foulds(&tree, &tree, &LeafAttr::Name, &LeafAttr::Name).unwrap();
    assert_eq!(rf.rf, 0);
    assert_eq!(rf.rf_max, 2 * (12 - 2));
}

#[test]
fn parallel_and_serial_agree() {
    let a = generate_tree(25, true).unwrap();
    let b = generate_tree(25, true).unwrap();

    let run = |jobs| {
        let options = DiffOptions {
            metric: DistanceMetric::SetBranch,
            branch_distance: Some(BranchDistance::Cophenetic),
            jobs,
            ..Default::default()
        };
        treediff(&a, &b, &LeafAttr::Name, &LeafAttr::Name, &options)
            .unwrap()
            .into_iter()
            .map(|e| (e.distance, e.branch_distance, e.difference))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(1), run(4));
}

#[test]
fn compare_on_features() {
    let a = Tree::from_newick(
        "((x[&&NHX:taxid=9606],y[&&NHX:taxid=9598]),z[&&NHX:taxid=10090]);",
    )
    .unwrap();
    let b = Tree::from_newick("((Human,Chimp),Mouse);").unwrap();
    let b = {
        let mut b = b;
        for (name, taxid) in [("Human", "9606"), ("Chimp", "9598"), ("Mouse", "10090")] {
            let id = b.get_by_name(name).unwrap().id;
            b.get_mut(&id).unwrap().set_feature("taxid", taxid);
        }
        b
    };

    let attr = LeafAttr::Feature("taxid".into());
    let table = treediff(&a, &b, &attr, &attr, &DiffOptions::default()).unwrap();
    assert!(table.is_empty());

    // Names differ everywhere
    let table = treediff(&a, &b, &LeafAttr::Name, &LeafAttr::Name, &DiffOptions::default()).unwrap();
    assert!(!table.is_empty());
}

#[test]
fn missing_identity_fails() {
    let a = Tree::from_newick("((A,B),C);").unwrap();
    let b = Tree::from_newick("((A,B),C);").unwrap();
    let err = treediff(
        &a,
        &b,
        &LeafAttr::Name,
        &LeafAttr::Feature("taxid".into()),
        &DiffOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, DiffError::MissingAttribute { .. }));
}

#[test]
fn unequal_tree_sizes() {
    let small = Tree::from_newick("((A,B),(C,D));").unwrap();
    let large = Tree::from_newick("(((A,B),C),(D,E));").unwrap();

    // More target clades than reference clades, then the other way around.
    // In the second case E and (A,B,C) are left without a partner.
    let cases = [
        (&small, &large, ["C", "D"], ["D", "E"]),
        (&large, &small, ["D", "E"], ["C", "D"]),
    ];
    for (reference, target, ref_cherry, target_cherry) in cases {
        for reduce_matrix in [false, true] {
            let table = treediff(
                reference,
                target,
                &LeafAttr::Name,
                &LeafAttr::Name,
                &options(DistanceMetric::Set, reduce_matrix),
            )
            .unwrap();

            assert_eq!(table.len(), 2, "reduce={reduce_matrix}");

            assert_eq!(table[0].distance, 0.5);
            assert_eq!(table[0].ref_leaves, leaf_set(&ref_cherry));
            assert_eq!(table[0].target_leaves, leaf_set(&target_cherry));
            assert_eq!(table[0].difference, leaf_set(&["C", "E"]));

            assert_eq!(table[1].distance, 1.0 - 4.0 / 5.0);
            assert_eq!(table[1].ref_leaves.len() + table[1].target_leaves.len(), 9);
            assert_eq!(table[1].difference, leaf_set(&["E"]));
        }
    }
}
