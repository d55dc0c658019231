//! Leaf-set cache over the nodes of a tree.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt::Display;
use std::str::FromStr;

use accurate::sum::NaiveSum;
use accurate::traits::*;

use super::DiffError;
use crate::tree::{EdgeLength, NewickFormat, Node, NodeId, Tree};

/// Set of leaf identities found under a node
pub type LeafSet = BTreeSet<String>;

/// Attribute used to identify leaves when comparing trees
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum LeafAttr {
    /// The node name
    #[default]
    Name,
    /// A named NHX feature
    Feature(String),
}

impl LeafAttr {
    /// Reads the identity of a node
    /// ```
    /// use phylodiff::diff::LeafAttr;
    /// use phylodiff::tree::Node;
    ///
    /// let mut node = Node::new_named("Hsa1");
    /// node.set_feature("taxid", "9606");
    ///
    /// assert_eq!(LeafAttr::Name.value(&node), Some("Hsa1"));
    /// assert_eq!(LeafAttr::Feature("taxid".into()).value(&node), Some("9606"));
    /// assert_eq!(LeafAttr::Feature("flag".into()).value(&node), None);
    /// ```
    pub fn value<'a>(&self, node: &'a Node) -> Option<&'a str> {
        match self {
            Self::Name => node.name.as_deref(),
            Self::Feature(key) => node.get_feature(key),
        }
    }

    /// Newick format that keeps this attribute when copying subtrees
    pub fn newick_format(&self) -> NewickFormat {
        match self {
            Self::Name => NewickFormat::NoComments,
            Self::Feature(key) => NewickFormat::Features(vec![key.clone()]),
        }
    }
}

impl FromStr for LeafAttr {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" => Self::Name,
            key => Self::Feature(key.to_string()),
        })
    }
}

impl Display for LeafAttr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Feature(key) => write!(f, "{key}"),
        }
    }
}

/// Leaf sets of every node of a tree, computed once for a given identity attribute.
/// The tree itself is left untouched so the same tree can be cached under
/// several attributes.
#[derive(Debug)]
pub struct CladeCache<'t> {
    tree: &'t Tree,
    attr: LeafAttr,
    root: NodeId,
    leaf_sets: Vec<LeafSet>,
}

impl<'t> CladeCache<'t> {
    /// Builds leaf sets with a single postorder traversal
    /// ```
    /// use phylodiff::diff::{CladeCache, LeafAttr};
    /// use phylodiff::tree::Tree;
    ///
    /// let tree = Tree::from_newick("(A,(B,C)D)E;").unwrap();
    /// let cache = CladeCache::build(&tree, LeafAttr::Name).unwrap();
    /// let d = tree.get_by_name("D").unwrap().id;
    ///
    /// assert_eq!(cache.leaf_set(&d).unwrap().len(), 2);
    /// assert_eq!(cache.root_leaf_set().len(), 3);
    /// ```
    pub fn build(tree: &'t Tree, attr: LeafAttr) -> Result<Self, DiffError> {
        if tree.size() == 0 {
            return Err(DiffError::DegenerateInput("tree has no leaves"));
        }
        let root = tree.get_root()?;

        let mut leaf_sets = vec![LeafSet::new(); tree.size()];
        for id in tree.postorder(&root)? {
            let node = tree.get(&id)?;
            let mut leaves = LeafSet::new();
            if node.is_tip() {
                let identity = attr.value(node).ok_or_else(|| DiffError::MissingAttribute {
                    node: id,
                    attribute: attr.to_string(),
                })?;
                leaves.insert(identity.to_string());
            } else {
                for child in node.children.iter() {
                    leaves.extend(leaf_sets[*child].iter().cloned());
                }
            }
            leaf_sets[id] = leaves;
        }

        Ok(Self {
            tree,
            attr,
            root,
            leaf_sets,
        })
    }

    /// Tree this cache was built on
    pub fn tree(&self) -> &'t Tree {
        self.tree
    }

    /// Identity attribute of the leaves
    pub fn attr(&self) -> &LeafAttr {
        &self.attr
    }

    /// Leaf set of a node
    pub fn leaf_set(&self, node: &NodeId) -> Result<&LeafSet, DiffError> {
        self.leaf_sets
            .get(*node)
            .ok_or(DiffError::TreeError(crate::tree::TreeError::NodeNotFound(*node)))
    }

    /// Leaf set of the whole tree
    pub fn root_leaf_set(&self) -> &LeafSet {
        &self.leaf_sets[self.root]
    }

    /// Clade rooted at a node
    pub fn clade(&self, node: NodeId) -> Result<Clade<'_>, DiffError> {
        self.leaf_set(&node)?;
        Ok(Clade { cache: self, node })
    }

    /// Clade of the whole tree
    pub fn root_clade(&self) -> Clade<'_> {
        Clade {
            cache: self,
            node: self.root,
        }
    }

    /// All clades of the tree, leaves included, sorted by increasing leaf set size.
    /// Clades of equal size keep their preorder.
    pub fn clades(&self) -> Result<Vec<Clade<'_>>, DiffError> {
        let mut clades: Vec<_> = self
            .tree
            .preorder(&self.root)?
            .into_iter()
            .map(|node| Clade { cache: self, node })
            .collect();
        clades.sort_by_key(|clade| clade.len());

        Ok(clades)
    }
}

/// A node together with the leaf identities found under it
#[derive(Debug, Clone, Copy)]
pub struct Clade<'a> {
    cache: &'a CladeCache<'a>,
    /// Root of the clade
    pub node: NodeId,
}

impl<'a> Clade<'a> {
    /// Leaf identities of the clade
    pub fn leaves(&self) -> &'a LeafSet {
        &self.cache.leaf_sets[self.node]
    }

    /// Number of leaf identities
    pub fn len(&self) -> usize {
        self.leaves().len()
    }

    /// Check if the clade has no leaf identities
    pub fn is_empty(&self) -> bool {
        self.leaves().is_empty()
    }

    /// Tree the clade belongs to
    pub fn tree(&self) -> &'a Tree {
        self.cache.tree
    }

    /// Cache the clade was taken from
    pub fn cache(&self) -> &'a CladeCache<'a> {
        self.cache
    }

    /// Leaf sets of every node of the clade, in preorder
    pub fn nested_leaf_sets(&self) -> Result<Vec<&'a LeafSet>, DiffError> {
        Ok(self
            .tree()
            .preorder(&self.node)?
            .into_iter()
            .map(|id| &self.cache.leaf_sets[id])
            .collect())
    }

    /// Total pendant branch length of the clade leaves whose identity is not in `other`
    pub fn pendant_length_outside(&self, other: &LeafSet) -> Result<EdgeLength, DiffError> {
        let tree = self.tree();
        let mut lengths = vec![];
        for leaf in tree.get_subtree_leaves(&self.node)? {
            let outside = self.cache.leaf_sets[leaf]
                .iter()
                .any(|identity| !other.contains(identity));
            if outside {
                lengths.push(tree.get(&leaf)?.branch_length());
            }
        }

        Ok(lengths.into_iter().sum_with_accumulator::<NaiveSum<f64>>())
    }
}
