//! Structural differences between rooted phylogenetic trees.
//!
//! Trees are read into the arena based [`tree::Tree`] struct, then compared
//! clade by clade with [`diff::treediff`]: every subtree of the reference tree
//! is matched with the most similar subtree of the target tree and the leaves
//! that prevent an exact match are reported.
//!
//! ```
//! use phylodiff::diff::{treediff, DiffOptions, LeafAttr};
//! use phylodiff::tree::Tree;
//!
//! let reference = Tree::from_newick("((A,B),(C,D));").unwrap();
//! let target = Tree::from_newick("((A,B),(C,E));").unwrap();
//!
//! let table = treediff(
//!     &reference,
//!     &target,
//!     &LeafAttr::Name,
//!     &LeafAttr::Name,
//!     &DiffOptions::default(),
//! )
//! .unwrap();
//!
//! assert!(table.iter().all(|entry| entry.difference.contains("D")));
//! ```

use std::collections::VecDeque;

use rand::prelude::*;

use tree::{Node, Tree, TreeError};

pub mod diff;
pub mod tree;

/// Genereates a random binary tree of a given size. Branch lengths are uniformly distributed
pub fn generate_tree(n_leaves: usize, brlens: bool) -> Result<Tree, TreeError> {
    let mut tree = Tree::new();
    let mut rng = thread_rng();
    tree.add(Node::new());

    let mut next_deq = VecDeque::new();
    next_deq.push_back(0);

    for _ in 1..n_leaves {
        let parent_id = if rng.gen_bool(0.5) {
            next_deq.pop_front()
        } else {
            next_deq.pop_back()
        }
        .ok_or(TreeError::IsEmpty)?;
        let l1: Option<f64> = if brlens { Some(rng.gen()) } else { None };
        let l2: Option<f64> = if brlens { Some(rng.gen()) } else { None };
        next_deq.push_back(tree.add_child(Node::new(), parent_id, l1)?);
        next_deq.push_back(tree.add_child(Node::new(), parent_id, l2)?);
    }

    for (i, id) in next_deq.iter().enumerate() {
        tree.get_mut(id)?.set_name(format!("Tip_{i}"));
    }

    Ok(tree)
}

/// Generates a caterpillar tree by adding children to the last node addesd to the tree
/// until we reach the desired numebr of leaves. Branch lengths are uniformly distributed
pub fn generate_caterpillar(n_leaves: usize, brlens: bool) -> Result<Tree, TreeError> {
    let mut tree = Tree::new();
    let mut rng = thread_rng();
    tree.add(Node::new());

    let mut parent = 0;
    for i in 1..n_leaves {
        let parent_bkp = parent;
        let l1: Option<f64> = if brlens { Some(rng.gen()) } else { None };
        let l2: Option<f64> = if brlens { Some(rng.gen()) } else { None };
        if i == n_leaves - 1 {
            // Adding tip
            tree.add_child(Node::new_named(&format!("Tip_{i}")), parent, l1)?;
            tree.add_child(Node::new_named(&format!("Tip_{}", i + 1)), parent, l2)?;
        } else {
            // Adding parent node
            parent = tree.add_child(Node::new(), parent, l1)?;
            tree.add_child(Node::new_named(&format!("Tip_{i}")), parent_bkp, l2)?;
        }
    }

    Ok(tree)
}
