//! Build and read phylogenetic trees.
//!
//! This module defines the two essential structs to represent phylogenetic trees:
//!  - The [`Node`] struct that represents a node of a phylogenetic tree.
//!  - The [`Tree`] struct that holds a collection of [`Node`] objects.
//!

mod node;
mod tree_impl;

pub use self::node::Node;
pub use self::tree_impl::{NewickParseError, Tree, TreeError};

/// A type that represents Identifiers of [`Node`] objects
/// within phylogenetic [`Tree`] object.
pub type NodeId = usize;

/// A type that represents branch lengths between [`Node`] objects
/// within phylogenetic [`Tree`] object.
pub type EdgeLength = f64;

/// Newick output format
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewickFormat {
    /// Output names, branch lengths, comments and every NHX feature
    AllFields,
    /// Output names and branch lengths
    NoComments,
    /// Output node names
    OnlyNames,
    /// Only output topology
    Topology,
    /// Output names, branch lengths and the listed NHX features only
    Features(Vec<String>),
}
