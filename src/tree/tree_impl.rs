use ptree::{write_tree, TreeBuilder};
use std::collections::VecDeque;
use std::{fs, path::Path};

use thiserror::Error;

use super::node::Node;
use super::{EdgeLength, NewickFormat, NodeId};

/// Errors that can occur when reading, writing and manipulating [`Tree`] structs.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The tree is empty and we are trying to do something that require at least one node
    #[error("This tree is empty.")]
    IsEmpty,
    /// No root node was found in the tree and we are trying to do something
    /// that requires a root node
    #[error("No root node found")]
    RootNotFound,
    /// The requested node with index [`NodeId`] does not exist in the tree
    #[error("There is no node with index: {0}")]
    NodeNotFound(NodeId),
    /// There was a [`std::io::Error`] when writing the tree to a file or drawing it
    #[error("Error writing tree")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur when parsing newick files.
#[derive(Error, Debug)]
pub enum NewickParseError {
    /// There is an unclosed bracket in the newick String
    #[error("Missing a closing bracket.")]
    UnclosedBracket,
    /// The newick string is missing a final semi-colon
    #[error("The tree is missing a semi colon at the end.")]
    NoClosingSemicolon,
    /// We are trying to close a subtree but have no parent node.
    #[error("Parent node of subtree not found")]
    NoSubtreeParent,
    /// There was a [`TreeError`] when building a tree from the newick string
    #[error("Problem with building the tree.")]
    TreeError(#[from] TreeError),
    /// There was a [`std::num::ParseFloatError`] when parsing branch lengths
    #[error("Could not parse a branch length")]
    FloatError(#[from] std::num::ParseFloatError),
    /// There was a [`std::io::Error`] when reading a newick file
    #[error("Problem reading file")]
    IoError(#[from] std::io::Error),
}

/// A Phylogenetic tree
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

/// Base methods to add and get [`Node`] objects to and from the [`Tree`].
///
/// ----
/// ----
impl Tree {
    /// Create a new empty Tree object
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    // ############################
    // # ADDING AND GETTING NODES #
    // ############################

    /// Add a new node to the tree.
    pub fn add(&mut self, node: Node) -> NodeId {
        let idx = self.nodes.len();
        let mut node = node;
        node.id = idx;
        self.nodes.push(node);

        idx
    }

    /// Add a child to one of the tree's nodes.
    ///
    /// # Example
    /// ```
    /// use phylodiff::tree::{Tree,Node};
    ///
    /// // Create the tree and add a root node
    /// let mut tree = Tree::new();
    /// let root_id = tree.add(Node::new());
    ///
    /// // Add children to the root
    /// let left = tree.add_child(Node::new(), root_id, None).unwrap();
    /// let right = tree.add_child(Node::new(), root_id, Some(0.1)).unwrap();
    ///
    /// assert_eq!(tree.get(&root_id).unwrap().children.len(), 2);
    ///
    /// // The depths of child nodes are derived from the parent node
    /// assert_eq!(tree.get(&left).unwrap().get_depth(), 1);
    /// assert_eq!(tree.get(&right).unwrap().parent_edge, Some(0.1));
    /// ```
    pub fn add_child(
        &mut self,
        node: Node,
        parent: NodeId,
        edge: Option<EdgeLength>,
    ) -> Result<NodeId, TreeError> {
        if parent >= self.nodes.len() {
            return Err(TreeError::NodeNotFound(parent));
        }

        let mut node = node;

        node.set_parent(parent, edge);
        node.set_depth(self.get(&parent)?.depth + 1);

        let id = self.add(node);
        self.get_mut(&parent)?.add_child(id);

        Ok(id)
    }

    /// Get a reference to a specific Node of the tree
    pub fn get(&self, id: &NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(*id).ok_or(TreeError::NodeNotFound(*id))
    }

    /// Get a mutable reference to a specific Node of the tree
    pub fn get_mut(&mut self, id: &NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(*id).ok_or(TreeError::NodeNotFound(*id))
    }

    /// Get a reference to a node in the tree by name.
    /// If several nodes match a name this returns the first match in the tree.
    /// ```
    /// use phylodiff::tree::{Tree, Node};
    ///
    /// let mut tree = Tree::new();
    /// let root_idx = tree.add(Node::new_named("root"));
    /// let child_idx = tree.add_child(Node::new_named("child"), root_idx, None).unwrap();
    ///
    /// assert_eq!(tree.get_by_name("child"), Some(tree.get(&child_idx).unwrap()));
    /// ```
    pub fn get_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|node| node.name.as_deref() == Some(name))
    }

    /// Gets the root node.
    pub fn get_root(&self) -> Result<NodeId, TreeError> {
        if self.nodes.is_empty() {
            return Err(TreeError::IsEmpty);
        }
        self.nodes
            .iter()
            .filter(|&node| node.parent.is_none())
            .map(|node| node.id)
            .next()
            .ok_or(TreeError::RootNotFound)
    }

    /// Returns a [`Vec`] containing the Node IDs of leaf nodes of the tree
    /// ```
    /// use phylodiff::tree::{Tree, Node};
    ///
    /// let mut tree = Tree::new();
    /// let root_idx = tree.add(Node::new());
    /// let left = tree.add_child(Node::new(), root_idx, None).unwrap();
    /// let right = tree.add_child(Node::new(), root_idx, None).unwrap();
    ///
    /// assert_eq!(tree.get_leaves(), vec![left, right]);
    /// ```
    pub fn get_leaves(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|&node| node.is_tip())
            .map(|node| node.id)
            .collect()
    }

    /// Gets the node ids of all the nodes in the subtree rooted at the specified node
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let tree = Tree::from_newick("(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;").unwrap();
    /// let sub_root = tree.get_by_name("E").unwrap();
    /// let subtree: Vec<_> = tree.get_subtree(&sub_root.id)
    ///     .unwrap()
    ///     .iter()
    ///     .flat_map(|id| tree.get(id).unwrap().name.clone())
    ///     .collect();
    ///
    /// assert_eq!(subtree, vec!["E", "C", "D"])
    /// ```
    pub fn get_subtree(&self, root: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        self.preorder(root)
    }

    /// Gets the node ids of all the leaves in the subtree rooted at the specified node
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let tree = Tree::from_newick("(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;").unwrap();
    /// let sub_root = tree.get_by_name("E").unwrap();
    /// let sub_leaves: Vec<_> = tree.get_subtree_leaves(&sub_root.id)
    ///     .unwrap()
    ///     .iter()
    ///     .flat_map(|id| tree.get(id).unwrap().name.clone())
    ///     .collect();
    ///
    /// assert_eq!(sub_leaves, vec!["C", "D"])
    /// ```
    pub fn get_subtree_leaves(&self, root: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut leaves = vec![];
        for id in self.get_subtree(root)? {
            if self.get(&id)?.is_tip() {
                leaves.push(id)
            }
        }

        Ok(leaves)
    }
}

/// Methods to traverse the [`Tree`]
///
/// ----
/// ----
impl Tree {
    // ###################
    // # TREE TRAVERSALS #
    // ###################

    /// Returns a vector containing node ids in the same order as the
    /// [preorder](https://en.wikipedia.org/wiki/Tree_traversal#Pre-order,_NLR) tree traversal
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,(C,E)D)B,((H)I)G)F;").unwrap();
    /// let preorder: Vec<_> = tree.preorder(&tree.get_root().unwrap())
    ///     .unwrap()
    ///     .iter()
    ///     .flat_map(|id| tree.get(id).unwrap().name.clone())
    ///     .collect();
    ///
    /// assert_eq!(preorder, vec!["F", "B", "A", "D", "C", "E", "G", "I", "H"])
    /// ```
    pub fn preorder(&self, root: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut indices = vec![*root];
        for child in self.get(root)?.children.iter() {
            indices.extend(self.preorder(child)?)
        }

        Ok(indices)
    }

    /// Returns a vector containing node ids in the same order as the
    /// [postorder](https://en.wikipedia.org/wiki/Tree_traversal#Post-order,_LRN) tree traversal
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,(C,E)D)B,((H)I)G)F;").unwrap();
    /// let postorder: Vec<_> = tree.postorder(&tree.get_root().unwrap())
    ///     .unwrap()
    ///     .iter()
    ///     .flat_map(|id| tree.get(id).unwrap().name.clone())
    ///     .collect();
    ///
    /// assert_eq!(postorder, vec!["A", "C", "E", "D", "B", "H", "I", "G", "F"])
    /// ```
    pub fn postorder(&self, root: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut indices = vec![];
        for child in self.get(root)?.children.iter() {
            indices.extend(self.postorder(child)?)
        }
        indices.push(*root);

        Ok(indices)
    }

    /// Returns a vector containing node ids in the same order as the
    /// [levelorder](https://en.wikipedia.org/wiki/Tree_traversal#Breadth-first_search) tree traversal
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,(C,E)D)B,((H)I)G)F;").unwrap();
    /// let levelorder: Vec<_> = tree.levelorder(&tree.get_root().unwrap())
    ///     .unwrap()
    ///     .iter()
    ///     .flat_map(|id| tree.get(id).unwrap().name.clone())
    ///     .collect();
    ///
    /// assert_eq!(levelorder, vec!["F", "B", "G", "A", "D", "I", "C", "E", "H"])
    /// ```
    pub fn levelorder(&self, root: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut indices = vec![];
        let mut queue = VecDeque::new();
        queue.push_back(*root);
        while let Some(current) = queue.pop_front() {
            indices.push(current);
            queue.extend(self.get(&current)?.children.iter().copied());
        }

        Ok(indices)
    }
}

/// Methods that compute characteristics and measures to describe the [`Tree`]
///
/// ----
/// ----
impl Tree {
    /// Returns the number of nodes in the tree
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of leaves in the tree
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|&node| node.is_tip()).count()
    }

    /// Returns the path from the root to the node
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,(C,E)D)B,((H)I)G)F;").unwrap();
    /// let path: Vec<_> = tree.get_path_from_root(&5)
    ///     .unwrap()
    ///     .iter()
    ///     .flat_map(|id| tree.get(id).unwrap().name.clone())
    ///     .collect();
    ///
    /// assert_eq!(path, vec!["F", "B", "D", "E"])
    /// ```
    pub fn get_path_from_root(&self, node: &NodeId) -> Result<Vec<NodeId>, TreeError> {
        let mut path = vec![];
        let mut current_node = *node;
        loop {
            path.push(current_node);
            match self.get(&current_node)?.parent {
                Some(parent) => current_node = parent,
                None => break,
            }
        }

        Ok(path.into_iter().rev().collect())
    }

    /// Sum of branch lengths between the root and a node. Missing
    /// branch lengths count as unit length.
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A:0.5,B:1)C:2,D)F;").unwrap();
    /// let a = tree.get_by_name("A").unwrap().id;
    /// let d = tree.get_by_name("D").unwrap().id;
    ///
    /// assert_eq!(tree.get_root_distance(&a).unwrap(), 2.5);
    /// assert_eq!(tree.get_root_distance(&d).unwrap(), 1.0);
    /// ```
    pub fn get_root_distance(&self, node: &NodeId) -> Result<EdgeLength, TreeError> {
        let mut dist = 0.0;
        for id in self.get_path_from_root(node)?.iter().skip(1) {
            dist += self.get(id)?.branch_length();
        }

        Ok(dist)
    }
}

/// Methods to manipulate and alter the [`Tree`] object.
///
/// ----
/// ----
impl Tree {
    // ##################
    // # ALTER THE TREE #
    // ##################

    /// Sort children of a node by number of descendants
    ///
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let mut tree = Tree::from_newick("(A,(((D,(E,F)),C),B));").unwrap();
    /// tree.ladderize().unwrap();
    ///
    /// assert_eq!("(A,(B,(C,(D,(E,F)))));", tree.to_newick().unwrap());
    /// ```
    pub fn ladderize(&mut self) -> Result<(), TreeError> {
        let mut descendant_counter = vec![0; self.nodes.len()];
        let root = self.get_root()?;
        // Go from tips to root
        for node_id in self.levelorder(&root)?.into_iter().rev() {
            let node = self.get_mut(&node_id)?;
            for child in node.children.iter() {
                descendant_counter[node_id] += descendant_counter[*child] + 1;
            }
            node.children.sort_by_key(|v| descendant_counter[*v]);
        }

        Ok(())
    }
}

/// Methods to read and write [`Tree`] objects to and from files or [`String`] objects.
///
/// ----
/// ----
impl Tree {
    // ########################
    // # READ AND WRITE TREES #
    // ########################

    /// Generate newick representation of tree
    fn to_newick_impl(&self, root: &NodeId, format: &NewickFormat) -> Result<String, TreeError> {
        let root = self.get(root)?;
        if root.children.is_empty() {
            Ok(root.to_newick(format))
        } else {
            let children = root
                .children
                .iter()
                .map(|child_idx| self.to_newick_impl(child_idx, format))
                .collect::<Result<Vec<String>, TreeError>>()?;
            Ok(format!("({}){}", children.join(","), root.to_newick(format)))
        }
    }

    /// Writes the tree as a newick formatted string
    /// # Example
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let newick = "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F:0.6;";
    /// let tree = Tree::from_newick(newick).unwrap();
    ///
    /// assert_eq!(tree.to_newick().unwrap(), newick);
    /// ```
    pub fn to_newick(&self) -> Result<String, TreeError> {
        self.to_formatted_newick(&NewickFormat::AllFields)
    }

    /// Writes the tree as a newick formatted string with a specified
    /// output format from [`NewickFormat`].
    /// # Example
    /// ```
    /// use phylodiff::tree::{Tree, NewickFormat};
    ///
    /// let newick = "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F:0.6;";
    /// let tree = Tree::from_newick(newick).unwrap();
    ///
    /// assert_eq!(tree.to_formatted_newick(&NewickFormat::Topology).unwrap(), "(,,(,));");
    /// assert_eq!(
    ///     tree.to_formatted_newick(&NewickFormat::OnlyNames).unwrap(),
    ///     "(A,B,(C,D)E)F;"
    /// );
    /// ```
    pub fn to_formatted_newick(&self, format: &NewickFormat) -> Result<String, TreeError> {
        let root = self.get_root()?;
        self.subtree_to_newick(&root, format)
    }

    /// Writes the subtree rooted at a node as a newick formatted string
    /// ```
    /// use phylodiff::tree::{Tree, NewickFormat};
    ///
    /// let tree = Tree::from_newick("(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;").unwrap();
    /// let e = tree.get_by_name("E").unwrap().id;
    ///
    /// assert_eq!(
    ///     tree.subtree_to_newick(&e, &NewickFormat::NoComments).unwrap(),
    ///     "(C:0.3,D:0.4)E:0.5;"
    /// );
    /// ```
    pub fn subtree_to_newick(&self, root: &NodeId, format: &NewickFormat) -> Result<String, TreeError> {
        Ok(self.to_newick_impl(root, format)? + ";")
    }

    /// Builds an independent copy of the subtree rooted at a node by writing
    /// it in the given format and parsing it back.
    /// ```
    /// use phylodiff::tree::{Tree, NewickFormat};
    ///
    /// let tree = Tree::from_newick("(A:0.1,(C:0.3[&&NHX:taxid=1:flag=x],D:0.4)E:0.5)F;").unwrap();
    /// let e = tree.get_by_name("E").unwrap().id;
    /// let copy = tree
    ///     .extract_subtree(&e, &NewickFormat::Features(vec!["taxid".into()]))
    ///     .unwrap();
    ///
    /// assert_eq!(copy.n_leaves(), 2);
    /// assert_eq!(copy.to_newick().unwrap(), "(C:0.3[&&NHX:taxid=1],D:0.4)E:0.5;");
    /// ```
    pub fn extract_subtree(&self, root: &NodeId, format: &NewickFormat) -> Result<Self, NewickParseError> {
        Self::from_newick(&self.subtree_to_newick(root, format)?)
    }

    /// Sets name, branch length and comment of a node once its newick description is read
    fn finish_node(
        &mut self,
        index: &NodeId,
        name: Option<String>,
        length: Option<String>,
        comment: Option<String>,
    ) -> Result<(), NewickParseError> {
        let node = self.get_mut(index)?;
        if let Some(name) = name {
            node.set_name(name);
        }
        if let Some(length) = length {
            node.parent_edge = Some(length.parse()?);
        }
        if let Some(comment) = comment {
            node.set_comment(comment);
        }

        Ok(())
    }

    /// Read a newick formatted string and build a [`Tree`] struct from it.
    /// NHX comments are read into node features.
    /// # Example
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let newick = "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5[&&NHX:support=0.9])F;";
    /// let tree = Tree::from_newick(newick).unwrap();
    ///
    /// assert_eq!(tree.size(), 6);
    /// assert_eq!(tree.n_leaves(), 4);
    /// assert_eq!(tree.get_by_name("E").unwrap().get_feature("support"), Some("0.9"));
    /// ```
    pub fn from_newick(newick: &str) -> Result<Self, NewickParseError> {
        #[derive(Debug, PartialEq)]
        enum Field {
            Name,
            Length,
            Comment,
        }

        let mut tree = Tree::new();

        let mut parsing = Field::Name;
        let mut current_name: Option<String> = None;
        let mut current_length: Option<String> = None;
        let mut current_comment: Option<String> = None;
        let mut current_index: Option<NodeId> = None;
        let mut parent_stack: Vec<NodeId> = Vec::new();

        let mut open_delimiters = 0;
        // Quote character of the quoted name being read
        let mut quote: Option<char> = None;
        // Quote character that just closed a quoted name, a repeated quote is literal
        let mut closed_quote: Option<char> = None;
        let mut escaped = false;

        for c in newick.chars() {
            // Add character in quotes to name
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                    closed_quote = Some(q);
                } else {
                    current_name.get_or_insert_with(String::new).push(c);
                }
                continue;
            }
            if let Some(q) = closed_quote.take() {
                if c == q {
                    current_name.get_or_insert_with(String::new).push(c);
                    quote = Some(q);
                    continue;
                }
            }

            // Add current character to comment, escaped characters are kept as is
            if parsing == Field::Comment && (escaped || c != ']') {
                escaped = !escaped && c == '\\';
                current_comment.get_or_insert_with(String::new).push(c);
                continue;
            }

            // Skip unquoted whitespace
            if c.is_whitespace() {
                continue;
            }

            match c {
                '"' | '\'' if parsing == Field::Name => {
                    // Enter quoted section (name)
                    quote = Some(c);
                    current_name.get_or_insert_with(String::new);
                }
                '[' => {
                    parsing = Field::Comment;
                }
                ']' => {
                    parsing = Field::Name;
                }
                '(' => {
                    // Start subtree
                    let index = match parent_stack.last() {
                        None => tree.add(Node::new()),
                        Some(parent) => tree.add_child(Node::new(), *parent, None)?,
                    };
                    parent_stack.push(index);
                    open_delimiters += 1;
                }
                ':' => {
                    // Start parsing length
                    parsing = Field::Length;
                }
                ',' | ')' => {
                    // Finish the current node, it is a leaf if it was not opened with '('
                    let index = match current_index {
                        Some(index) => index,
                        None => {
                            let parent = parent_stack
                                .last()
                                .ok_or(NewickParseError::NoSubtreeParent)?;
                            tree.add_child(Node::new(), *parent, None)?
                        }
                    };

                    tree.finish_node(
                        &index,
                        current_name.take(),
                        current_length.take(),
                        current_comment.take(),
                    )?;
                    parsing = Field::Name;

                    if c == ',' {
                        // Add sibling
                        current_index = None;
                    } else {
                        // Close subtree
                        if open_delimiters == 0 {
                            return Err(NewickParseError::NoSubtreeParent);
                        }
                        open_delimiters -= 1;
                        current_index = Some(
                            parent_stack
                                .pop()
                                .ok_or(NewickParseError::NoSubtreeParent)?,
                        );
                    }
                }
                ';' => {
                    // Finish parsing the Tree
                    if open_delimiters != 0 {
                        return Err(NewickParseError::UnclosedBracket);
                    }
                    // Single node trees have no subtree to close
                    let index = match current_index {
                        Some(index) => index,
                        None => tree.add(Node::new()),
                    };
                    tree.finish_node(&index, current_name, current_length, current_comment)?;

                    return Ok(tree);
                }
                _ => {
                    // Parse characters in fields
                    match parsing {
                        Field::Name => current_name.get_or_insert_with(String::new).push(c),
                        Field::Length => current_length.get_or_insert_with(String::new).push(c),
                        Field::Comment => {}
                    };
                }
            }
        }

        Err(NewickParseError::NoClosingSemicolon)
    }

    /// Creates a tree from a newick file
    pub fn from_file(path: &Path) -> Result<Self, NewickParseError> {
        let newick_string = fs::read_to_string(path)?;
        Self::from_newick(&newick_string)
    }

    /// Recursive function that adds node representation to a printable tree builder
    fn render_nodes(
        &self,
        root_idx: &NodeId,
        output_tree: &mut TreeBuilder,
        label: &impl Fn(&Node) -> String,
    ) -> Result<(), TreeError> {
        let root = self.get(root_idx)?;

        if root.children.is_empty() {
            output_tree.add_empty_child(label(root));
        } else {
            output_tree.begin_child(label(root));
            for child_idx in root.children.iter() {
                self.render_nodes(child_idx, output_tree, label)?;
            }
            output_tree.end_child();
        }

        Ok(())
    }

    /// Draws the tree as text, labelling every node with a closure
    /// ```
    /// use phylodiff::tree::Tree;
    ///
    /// let tree = Tree::from_newick("(A,(B,C));").unwrap();
    /// let drawing = tree
    ///     .render_with(|node| node.name.clone().unwrap_or("+".into()))
    ///     .unwrap();
    ///
    /// assert!(drawing.starts_with('+'));
    /// for name in ["A", "B", "C"] {
    ///     assert!(drawing.contains(name));
    /// }
    /// ```
    pub fn render_with(&self, label: impl Fn(&Node) -> String) -> Result<String, TreeError> {
        let root = self.get_root()?;
        let mut builder = TreeBuilder::new(label(self.get(&root)?));
        for child_idx in self.get(&root)?.children.iter() {
            self.render_nodes(child_idx, &mut builder, &label)?;
        }
        let drawing = builder.build();

        let mut out = Vec::new();
        write_tree(&drawing, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Draws the tree as text using the [`std::fmt::Display`] representation of nodes
    pub fn render(&self) -> Result<String, TreeError> {
        self.render_with(|node| format!("{node}"))
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    /// Generates example tree from the tree traversal wikipedia page
    /// https://en.wikipedia.org/wiki/Tree_traversal#Depth-first_search
    /// The difference is that I is the left child of G since this tree structure
    /// cannot represent a right child only.
    fn build_simple_tree() -> Result<Tree, TreeError> {
        let mut tree = Tree::new();
        tree.add(Node::new_named("F")); // 0
        tree.add_child(Node::new_named("B"), 0, None)?; // 1
        tree.add_child(Node::new_named("G"), 0, None)?; // 2
        tree.add_child(Node::new_named("A"), 1, None)?; // 3
        tree.add_child(Node::new_named("D"), 1, None)?; // 4
        tree.add_child(Node::new_named("I"), 2, None)?; // 5
        tree.add_child(Node::new_named("C"), 4, None)?; // 6
        tree.add_child(Node::new_named("E"), 4, None)?; // 7
        tree.add_child(Node::new_named("H"), 5, None)?; // 8

        Ok(tree)
    }

    /// Generates example tree from the newick format wikipedia page
    /// https://en.wikipedia.org/wiki/Newick_format#Examples
    fn build_tree_with_lengths() -> Result<Tree, TreeError> {
        let mut tree = Tree::new();
        tree.add(Node::new_named("F")); // 0
        tree.add_child(Node::new_named("A"), 0, Some(0.1))?; // 1
        tree.add_child(Node::new_named("B"), 0, Some(0.2))?; // 2
        tree.add_child(Node::new_named("E"), 0, Some(0.5))?; // 3
        tree.add_child(Node::new_named("C"), 3, Some(0.3))?; // 4
        tree.add_child(Node::new_named("D"), 3, Some(0.4))?; // 5

        Ok(tree)
    }

    fn get_values(indices: &[usize], tree: &Tree) -> Vec<Option<String>> {
        indices
            .iter()
            .map(|idx| tree.get(idx).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn test_tips() {
        let mut tree = Tree::new();
        tree.add(Node::new_named("root"));
        assert_eq!(tree.get_leaves(), vec![0]);

        tree.add_child(Node::new_named("A"), 0, Some(0.1)).unwrap(); // 1
        tree.add_child(Node::new_named("B"), 0, Some(0.2)).unwrap(); // 2
        tree.add_child(Node::new_named("E"), 0, Some(0.5)).unwrap(); // 3

        assert_eq!(tree.get_leaves(), vec![1, 2, 3]);

        tree.add_child(Node::new_named("C"), 3, Some(0.3)).unwrap(); // 4
        tree.add_child(Node::new_named("D"), 3, Some(0.4)).unwrap(); // 5

        assert_eq!(tree.get_leaves(), vec![1, 2, 4, 5]);
    }

    #[test]
    fn missing_nodes() {
        let tree = build_simple_tree().unwrap();
        assert!(matches!(tree.get(&42), Err(TreeError::NodeNotFound(42))));
        assert!(matches!(Tree::new().get_root(), Err(TreeError::IsEmpty)));
    }

    #[test]
    fn path_from_root() {
        let tree = build_simple_tree().unwrap();
        let values: Vec<_> = get_values(&(tree.get_path_from_root(&7).unwrap()), &tree)
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(values, vec!["F", "B", "D", "E"])
    }

    #[test]
    fn root_distances() {
        let tree = build_tree_with_lengths().unwrap();
        let expected = [("A", 0.1), ("B", 0.2), ("C", 0.8), ("D", 0.9), ("F", 0.0)];
        for (name, dist) in expected {
            let id = tree.get_by_name(name).unwrap().id;
            let found = tree.get_root_distance(&id).unwrap();
            assert!((found - dist).abs() < 1e-12, "{name}: {found} != {dist}");
        }
    }

    #[test]
    fn get_correct_leaves() {
        let tree = build_simple_tree().unwrap();
        let values: Vec<_> = get_values(&(tree.get_leaves()), &tree)
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(values, vec!["A", "H", "C", "E"])
    }

    #[test]
    fn test_subtree_leaves() {
        let tree = Tree::from_newick("((T0,T1)I1,(T2,(T3,T4)I2)I3)I0;").unwrap();
        let cases = [("I0", vec!["T0", "T1", "T2", "T3", "T4"]), ("I3", vec!["T2", "T3", "T4"]), ("T1", vec!["T1"])];

        for (root, expected) in cases {
            let id = tree.get_by_name(root).unwrap().id;
            let leaves: Vec<_> = get_values(&tree.get_subtree_leaves(&id).unwrap(), &tree)
                .into_iter()
                .flatten()
                .collect();
            assert_eq!(leaves, expected);
        }
    }

    #[test]
    fn to_newick() {
        let tree = build_tree_with_lengths().unwrap();
        assert_eq!(
            "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;",
            tree.to_newick().unwrap()
        );
    }

    #[test]
    fn to_formatted_newick() {
        let newick = "(A:0.1[Comment_1],B:0.2,(C:0.3,D:0.4)E:0.5[&&NHX:support=1])F;";
        let tree = Tree::from_newick(newick).unwrap();

        assert_eq!(tree.to_newick().unwrap(), newick);
        assert_eq!(
            tree.to_formatted_newick(&NewickFormat::NoComments).unwrap(),
            "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;"
        );
        assert_eq!(
            tree.to_formatted_newick(&NewickFormat::Features(vec!["support".into()]))
                .unwrap(),
            "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5[&&NHX:support=1])F;"
        );
    }

    #[test]
    fn read_newick() {
        let newick_strings = vec![
            "((D,E)B,(F,G)C)A;",
            "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;",
            "(A:0.1,B:0.2,(C:0.3,D:0.4):0.5);",
            "(dog:20,(elephant:30,horse:60):20):50;",
            "(A,B,(C,D));",
            "(A,B,(C,D)E)F;",
            "(((One:0.2,Two:0.3):0.3,(Three:0.5,Four:0.3):0.2):0.3,Five:0.7):0;",
            "('Name with spaces',B);",
            "('A,1':0.5,'O''Brien':1);",
        ];
        for newick in newick_strings {
            let tree = Tree::from_newick(newick).unwrap();
            assert_eq!(newick, tree.to_newick().unwrap());
        }
    }

    #[test]
    fn read_newick_fails() {
        let newick_strings = vec![
            ("((D,E)B,(F,G,C)A;", "UnclosedBracket"),
            ("((D,E)B,(F,G)C)A", "NoClosingSemicolon"),
            ("(A:0.1,B:xyz);", "FloatError"),
        ];
        for (newick, expected) in newick_strings {
            let error = Tree::from_newick(newick).unwrap_err();
            match (expected, error) {
                ("UnclosedBracket", NewickParseError::UnclosedBracket)
                | ("NoClosingSemicolon", NewickParseError::NoClosingSemicolon)
                | ("FloatError", NewickParseError::FloatError(_)) => {}
                (expected, error) => panic!("Expected {expected}, got: {error}"),
            }
        }
    }

    #[test]
    fn parse_single_node_trees() {
        for newick in ["(hola);", "hola;", "hola:0.5;"] {
            let tree = Tree::from_newick(newick).expect("Could not read tree");
            assert_eq!(newick, tree.to_newick().expect("Could not write tree"));
        }
    }

    #[test]
    fn extract_leaf_subtree() {
        let tree = Tree::from_newick("(A:0.1,(C:0.3,D:0.4)E:0.5)F;").unwrap();
        let c = tree.get_by_name("C").unwrap().id;
        let copy = tree.extract_subtree(&c, &NewickFormat::NoComments).unwrap();

        assert_eq!(copy.size(), 1);
        assert_eq!(copy.get_leaves(), vec![0]);
        assert_eq!(copy.get(&0).unwrap().parent_edge, Some(0.3));
    }

    #[test]
    fn extracted_subtree_is_independent() {
        let tree = Tree::from_newick("(A:0.1,(C:0.3,D:0.4)E:0.5)F;").unwrap();
        let e = tree.get_by_name("E").unwrap().id;
        let mut copy = tree.extract_subtree(&e, &NewickFormat::NoComments).unwrap();

        for leaf in copy.get_leaves() {
            copy.get_mut(&leaf).unwrap().set_name("relabelled".into());
        }

        assert!(tree.get_by_name("C").is_some());
        assert!(tree.get_by_name("relabelled").is_none());
    }

    #[test]
    fn extracted_subtree_keeps_reserved_characters() {
        let mut tree = Tree::new();
        let root = tree.add(Node::new());
        let inner = tree.add_child(Node::new(), root, Some(0.5)).unwrap();
        for (name, parent) in [("Homo sapiens", root), ("A,1", inner), ("O'Brien (x)", inner)] {
            let mut leaf = Node::new_named(name);
            leaf.set_feature("id", &format!("urn:{name}"));
            tree.add_child(leaf, parent, Some(1.0)).unwrap();
        }

        let format = NewickFormat::Features(vec!["id".into()]);
        let copy = tree.extract_subtree(&root, &format).unwrap();
        assert_eq!(copy.size(), tree.size());

        let leaves = |t: &Tree| -> Vec<(Option<String>, Option<String>)> {
            let mut leaves: Vec<_> = t
                .get_leaves()
                .iter()
                .map(|id| {
                    let node = t.get(id).unwrap();
                    (node.name.clone(), node.get_feature("id").map(String::from))
                })
                .collect();
            leaves.sort();
            leaves
        };
        assert_eq!(leaves(&copy), leaves(&tree));
        assert_eq!(copy.to_newick().unwrap(), tree.to_formatted_newick(&format).unwrap());
    }

    #[test]
    fn traversals() {
        let tree = Tree::from_newick("((3,4)2,(6,7)5)1;").unwrap();
        let root = tree.get_root().unwrap();

        let postorder = "3426751";
        let preorder = "1234567";
        let levelorder = "1253467";

        fn get_str(iter: &[usize], tree: &Tree) -> String {
            iter.iter()
                .map(|id| tree.get(id).unwrap().name.clone().unwrap())
                .collect()
        }

        assert_eq!(get_str(&tree.postorder(&root).unwrap(), &tree), postorder);
        assert_eq!(get_str(&tree.preorder(&root).unwrap(), &tree), preorder);
        assert_eq!(get_str(&tree.levelorder(&root).unwrap(), &tree), levelorder);
    }

    #[test]
    fn render_tree() {
        let tree = build_tree_with_lengths().unwrap();
        let drawing = tree.render().unwrap();

        assert_eq!(drawing.lines().count(), tree.size());
        assert!(drawing.lines().next().unwrap().contains('F'));
    }
}
